use tracing::{debug, info};
use uuid::{Uuid, uuid};

use super::{
    error::PeripheralError,
    manufacturer::{AdafruitManufacturerData, BoardModel},
    sensors::{NeoPixels, Reading, SensorService},
};
use crate::builder::TypeRegistry;

/// Type identifier of [`SimulatedPeripheral`] in the object registry.
pub const SIMULATED_PERIPHERAL_TYPE: &str = "SimulatedPeripheral";

pub const SIMULATED_PERIPHERAL_ID: Uuid = uuid!("E621E1F8-C36C-495A-93FC-0C247A3E6E5F");
pub const SIMULATED_PERIPHERAL_NAME: &str = "Simulated Peripheral";
pub const SIMULATED_RSSI: i8 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralState {
    Disconnected,
    Connected,
}

/// Peripheral that answers like an Adafruit board without any radio.
///
/// It advertises Circuit Playground Bluefruit manufacturer data unless
/// configured otherwise, discovers services instantly and reports synthetic
/// sensor values.
#[derive(Debug)]
pub struct SimulatedPeripheral {
    identifier: Uuid,
    name: String,
    rssi: i8,
    state: PeripheralState,
    manufacturer_data: Vec<u8>,
    sensors: Vec<Box<dyn SensorService>>,
}

impl Default for SimulatedPeripheral {
    fn default() -> Self {
        Self {
            identifier: SIMULATED_PERIPHERAL_ID,
            name: SIMULATED_PERIPHERAL_NAME.to_string(),
            rssi: SIMULATED_RSSI,
            state: PeripheralState::Disconnected,
            manufacturer_data: AdafruitManufacturerData::for_board(
                BoardModel::CircuitPlaygroundBluefruit,
            )
            .to_bytes(),
            sensors: Vec::new(),
        }
    }
}

impl SimulatedPeripheral {
    pub fn identifier(&self) -> Uuid {
        self.identifier
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rssi(&self) -> i8 {
        self.rssi
    }

    pub fn set_rssi(&mut self, rssi: i8) {
        self.rssi = rssi;
    }

    pub fn state(&self) -> PeripheralState {
        self.state
    }

    pub fn manufacturer_data(&self) -> &[u8] {
        &self.manufacturer_data
    }

    /// Replaces the advertised board. Attached services are dropped since
    /// their availability depends on the board.
    pub fn set_board(&mut self, board: BoardModel) {
        self.manufacturer_data = AdafruitManufacturerData::for_board(board).to_bytes();
        self.sensors.clear();
    }

    pub fn board_model(&self) -> Option<BoardModel> {
        AdafruitManufacturerData::parse(&self.manufacturer_data)
            .ok()
            .and_then(|data| data.board_model())
    }

    /// Service discovery completes immediately.
    pub fn discover(&mut self, service_ids: Option<&[&str]>) -> Result<(), PeripheralError> {
        debug!(peripheral = %self.identifier, ?service_ids, "simulated discovery");
        Ok(())
    }

    pub fn simulate_connect(&mut self) {
        self.state = PeripheralState::Connected;
        info!(peripheral = %self.identifier, "simulated peripheral connected");
    }

    /// Back to disconnected with every service disabled.
    pub fn reset(&mut self) {
        self.state = PeripheralState::Disconnected;
        self.sensors.iter_mut().for_each(|sensor| sensor.disable());
    }

    /// Builds and enables the services named in `identifiers`.
    ///
    /// Identifiers with no registered service, or whose service does not
    /// exist on this board, are skipped and returned.
    pub fn attach_sensors<'a>(
        &mut self,
        registry: &TypeRegistry<dyn SensorService>,
        identifiers: &[&'a str],
    ) -> Vec<&'a str> {
        let board = self.board_model();
        let mut skipped = Vec::new();
        for &identifier in identifiers {
            match registry.create_instance(identifier) {
                Some(sensor) if sensor.is_supported(board) => self.attach(sensor),
                Some(_) => {
                    debug!(identifier, ?board, "service not available on board, skipped");
                    skipped.push(identifier);
                }
                None => {
                    debug!(identifier, "unknown service, skipped");
                    skipped.push(identifier);
                }
            }
        }
        skipped
    }

    /// Attaches a single service, failing if the board lacks it.
    pub fn attach_sensor(&mut self, sensor: Box<dyn SensorService>) -> Result<(), PeripheralError> {
        if !sensor.is_supported(self.board_model()) {
            return Err(PeripheralError::SensorUnsupported(sensor.identifier().to_string()));
        }
        self.attach(sensor);
        Ok(())
    }

    fn attach(&mut self, mut sensor: Box<dyn SensorService>) {
        if let Some(pixels) = sensor.as_any_mut().downcast_mut::<NeoPixels>() {
            pixels.configure(self.board_model());
        }
        sensor.enable();
        self.sensors.retain(|existing| existing.identifier() != sensor.identifier());
        self.sensors.push(sensor);
    }

    pub fn sensors(&self) -> impl Iterator<Item = &dyn SensorService> {
        self.sensors.iter().map(|sensor| sensor.as_ref())
    }

    pub fn sensor(&self, identifier: &str) -> Option<&dyn SensorService> {
        self.sensors().find(|sensor| sensor.identifier() == identifier)
    }

    pub fn sensor_mut(&mut self, identifier: &str) -> Option<&mut Box<dyn SensorService>> {
        self.sensors.iter_mut().find(|sensor| sensor.identifier() == identifier)
    }

    /// Detaches a service, handing it back to the caller.
    pub fn detach_sensor(&mut self, identifier: &str) -> Option<Box<dyn SensorService>> {
        let position = self.sensors.iter().position(|sensor| sensor.identifier() == identifier)?;
        Some(self.sensors.remove(position))
    }

    /// Last value of every enabled service that reports one.
    pub fn readings(&self) -> Vec<(&'static str, Reading)> {
        self.sensors
            .iter()
            .filter_map(|sensor| sensor.last_value().map(|reading| (sensor.identifier(), reading)))
            .collect()
    }
}
