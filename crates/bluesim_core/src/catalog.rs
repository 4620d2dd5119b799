//! Registration of the simulation types on a type-erased registry.

use once_cell::sync::OnceCell;

use crate::{
    builder::{ObjectBuilder, TypeRegistry},
    peripheral::{
        SIMULATED_PERIPHERAL_TYPE, SimulatedPeripheral,
        sensors::{
            ADAFRUIT_ACCELEROMETER, ADAFRUIT_BAROMETRIC_PRESSURE, ADAFRUIT_BUTTONS,
            ADAFRUIT_HUMIDITY, ADAFRUIT_LIGHT, ADAFRUIT_NEOPIXELS, ADAFRUIT_QUATERNION,
            ADAFRUIT_TEMPERATURE, ADAFRUIT_TONE_GENERATOR, AccelerometerSensor,
            BarometricPressureSensor, ButtonsSensor, CPB_BUTTONS, CPB_LIGHT, CPB_TEMPERATURE,
            CpbSensor, HumiditySensor, LightSensor, NeoPixels, QuaternionSensor, TemperatureSensor,
            ToneGenerator,
        },
    },
    register_defaults,
};

/// Registers the simulated peripheral and every sensor service under their
/// identifiers.
pub fn register_simulated_types(registry: &TypeRegistry) {
    register_defaults!(registry, {
        SIMULATED_PERIPHERAL_TYPE => SimulatedPeripheral,
        ADAFRUIT_TEMPERATURE => TemperatureSensor,
        ADAFRUIT_HUMIDITY => HumiditySensor,
        ADAFRUIT_BAROMETRIC_PRESSURE => BarometricPressureSensor,
        ADAFRUIT_LIGHT => LightSensor,
        ADAFRUIT_ACCELEROMETER => AccelerometerSensor,
        ADAFRUIT_QUATERNION => QuaternionSensor,
        ADAFRUIT_BUTTONS => ButtonsSensor,
        ADAFRUIT_NEOPIXELS => NeoPixels,
        ADAFRUIT_TONE_GENERATOR => ToneGenerator,
        CPB_TEMPERATURE => CpbSensor<TemperatureSensor>,
        CPB_LIGHT => CpbSensor<LightSensor>,
        CPB_BUTTONS => CpbSensor<ButtonsSensor>,
    });
}

static GLOBAL_REGISTRATION: OnceCell<()> = OnceCell::new();

/// Registers the simulation types on the global registry, once per process.
pub fn register_global() -> &'static TypeRegistry {
    GLOBAL_REGISTRATION.get_or_init(|| register_simulated_types(ObjectBuilder::registry()));
    ObjectBuilder::registry()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::peripheral::sensor_registry;

    #[test]
    fn catalog_covers_every_sensor() {
        let registry = TypeRegistry::new();
        register_simulated_types(&registry);

        let mut expected = sensor_registry().names();
        expected.push(SIMULATED_PERIPHERAL_TYPE.to_string());
        expected.sort();
        assert_eq!(registry.names(), expected);
        assert_eq!(registry.constructible_names(), expected);
    }

    #[test]
    fn catalog_every_constructible_name_builds() {
        let registry = TypeRegistry::new();
        register_simulated_types(&registry);

        let built: Vec<String> = registry
            .names()
            .into_iter()
            .filter(|name| registry.create_instance(name).is_some())
            .collect();
        assert_eq!(built, registry.constructible_names());
        assert_eq!(built.len(), 13);
    }

    #[test]
    fn catalog_builds_peripheral_by_name() {
        let registry = TypeRegistry::new();
        register_simulated_types(&registry);
        let peripheral =
            registry.create_instance_of::<SimulatedPeripheral>(SIMULATED_PERIPHERAL_TYPE).unwrap();
        assert_eq!(peripheral.name(), "Simulated Peripheral");
        assert!(registry.create_instance_of::<CpbSensor<LightSensor>>(CPB_LIGHT).is_some());
    }

    #[test]
    fn catalog_global_registration() {
        let registry = register_global();
        register_global();
        assert!(registry.contains(SIMULATED_PERIPHERAL_TYPE));
        let sensor = ObjectBuilder::create_instance_of::<TemperatureSensor>(ADAFRUIT_TEMPERATURE);
        assert!(sensor.is_some());
    }
}
