//! Parameters of a simulation session.

use std::time::Duration;

use crate::peripheral::{
    BoardModel, SENSOR_DEFAULT_PERIOD,
    sensors::{ADAFRUIT_ACCELEROMETER, ADAFRUIT_LIGHT, CPB_BUTTONS, CPB_TEMPERATURE},
    simulated::SIMULATED_RSSI,
};

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    /// Board advertised by the simulated peripheral
    pub board: BoardModel,
    pub rssi: i8,
    /// Period of sensor notifications
    pub sensor_period: Duration,
    /// Service identifiers to attach after connection
    pub sensors: Vec<String>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            board: BoardModel::CircuitPlaygroundBluefruit,
            rssi: SIMULATED_RSSI,
            sensor_period: SENSOR_DEFAULT_PERIOD,
            sensors: [CPB_TEMPERATURE, ADAFRUIT_LIGHT, ADAFRUIT_ACCELEROMETER, CPB_BUTTONS]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl SimulationConfig {
    /// Parses a comma separated list of service identifiers, ignoring blanks.
    pub fn parse_sensor_list(list: &str) -> Vec<String> {
        list.split(',').map(str::trim).filter(|name| !name.is_empty()).map(String::from).collect()
    }

    pub fn sensor_identifiers(&self) -> Vec<&str> {
        self.sensors.iter().map(String::as_str).collect()
    }
}
