use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PeripheralError {
    #[error("Peripheral error, unknown peripheral (identifier: {0})")]
    UnknownPeripheral(Uuid),

    #[error("Peripheral error, simulated peripheral type not registered (name: {0})")]
    SimulatedPeripheralUnavailable(String),

    #[error("Peripheral error, manufacturer data is not Adafruit")]
    NotManufacturerAdafruit,

    #[error("Peripheral error, invalid manufacturer data (offset: {0})")]
    InvalidManufacturerData(usize),

    #[error("Peripheral error, sensor not supported by board (identifier: {0})")]
    SensorUnsupported(String),

    #[error("Peripheral error, notification period must be non-zero (identifier: {0})")]
    ZeroNotificationPeriod(String),

    #[error("Peripheral error, peripheral already borrowed by this thread (identifier: {0})")]
    PeripheralBusy(Uuid),
}
