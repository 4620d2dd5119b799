//! Simulated Adafruit peripheral.
//!
//! Mirrors the behaviour of a Circuit Playground Bluefruit or CLUE board
//! closely enough to drive application code in tests and demos: manufacturer
//! advertisement, instant service discovery, synthetic sensor readings
//! delivered periodically, and a central that scans, connects and
//! disconnects without a radio.
pub mod error;
pub mod manager;
pub mod manufacturer;
pub mod notifier;
pub mod sensors;
pub mod simulated;

pub use error::PeripheralError;
pub use manager::{ManagerEvent, SimulatedBleManager};
pub use manufacturer::{AdafruitManufacturerData, BoardModel, is_manufacturer_adafruit};
pub use notifier::{SensorNotification, spawn_sensor_notifier};
pub use sensors::{Reading, SENSOR_DEFAULT_PERIOD, SensorService, sensor_registry};
pub use simulated::{PeripheralState, SIMULATED_PERIPHERAL_TYPE, SimulatedPeripheral};
