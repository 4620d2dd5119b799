//! Simulated sensor and actuator services.
//!
//! Every service is default-constructible and is registered by identifier in
//! a `TypeRegistry<dyn SensorService>`, so a peripheral can turn the list of
//! service identifiers it advertises into handlers without knowing the
//! concrete types. Values are synthetic: fixed, or drawn uniformly from a
//! narrow range around a plausible reading.

use std::{any::Any, fmt::Debug, ops::Range, time::Duration};

use rand::Rng;

use super::manufacturer::BoardModel;
use crate::builder::TypeRegistry;

/// Period between two notifications of an enabled sensor.
pub const SENSOR_DEFAULT_PERIOD: Duration = Duration::from_millis(500);

pub const ADAFRUIT_TEMPERATURE: &str = "AdafruitTemperature";
pub const ADAFRUIT_HUMIDITY: &str = "AdafruitHumidity";
pub const ADAFRUIT_BAROMETRIC_PRESSURE: &str = "AdafruitBarometricPressure";
pub const ADAFRUIT_LIGHT: &str = "AdafruitLight";
pub const ADAFRUIT_ACCELEROMETER: &str = "AdafruitAccelerometer";
pub const ADAFRUIT_QUATERNION: &str = "AdafruitQuaternion";
pub const ADAFRUIT_BUTTONS: &str = "AdafruitButtons";
pub const ADAFRUIT_NEOPIXELS: &str = "AdafruitNeoPixels";
pub const ADAFRUIT_TONE_GENERATOR: &str = "AdafruitToneGenerator";
pub const CPB_TEMPERATURE: &str = "CPBTemperature";
pub const CPB_LIGHT: &str = "CPBLight";
pub const CPB_BUTTONS: &str = "CPBButtons";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideSwitchState {
    Right,
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Released,
    Pressed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonsState {
    pub slide_switch: SlideSwitchState,
    pub button_a: ButtonState,
    pub button_b: ButtonState,
}

/// One value reported by a sensor service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Degrees Celsius
    Temperature(f32),
    /// Relative humidity, percent
    Humidity(f32),
    /// hPa
    BarometricPressure(f32),
    /// Lux
    Light(f32),
    Acceleration { x: f32, y: f32, z: f32 },
    Quaternion { x: f32, y: f32, z: f32, w: f32 },
    Buttons(ButtonsState),
}

/// A service exposed by a simulated peripheral.
pub trait SensorService: Any + Send + Debug {
    fn identifier(&self) -> &'static str;

    /// Whether the service exists on `board`. Unknown boards only get the
    /// services common to every board.
    fn is_supported(&self, _board: Option<BoardModel>) -> bool {
        true
    }

    fn enable(&mut self);

    fn disable(&mut self);

    fn is_enabled(&self) -> bool;

    /// Current value, `None` for actuators or while disabled.
    fn last_value(&self) -> Option<Reading>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

fn sample(range: Range<f32>) -> f32 {
    rand::thread_rng().gen_range(range)
}

fn clue_only(board: Option<BoardModel>) -> bool {
    board == Some(BoardModel::ClueNrf52840)
}

/// Boilerplate shared by every service: enabled flag and `Any` access.
macro_rules! sensor_service {
    ($ty:ident, $identifier:expr, $supported:expr, |$this:ident| $value:expr) => {
        impl SensorService for $ty {
            fn identifier(&self) -> &'static str {
                $identifier
            }

            fn is_supported(&self, board: Option<BoardModel>) -> bool {
                ($supported)(board)
            }

            fn enable(&mut self) {
                self.enabled = true;
            }

            fn disable(&mut self) {
                self.enabled = false;
            }

            fn is_enabled(&self) -> bool {
                self.enabled
            }

            fn last_value(&self) -> Option<Reading> {
                let $this = self;
                if !$this.enabled {
                    return None;
                }
                $value
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }
    };
}

#[derive(Debug, Default)]
pub struct TemperatureSensor {
    enabled: bool,
}

sensor_service!(TemperatureSensor, ADAFRUIT_TEMPERATURE, |_| true, |_this| Some(
    Reading::Temperature(sample(18.5..19.5))
));

#[derive(Debug, Default)]
pub struct HumiditySensor {
    enabled: bool,
}

sensor_service!(HumiditySensor, ADAFRUIT_HUMIDITY, clue_only, |_this| Some(Reading::Humidity(
    sample(28.5..29.0)
)));

#[derive(Debug, Default)]
pub struct BarometricPressureSensor {
    enabled: bool,
}

sensor_service!(BarometricPressureSensor, ADAFRUIT_BAROMETRIC_PRESSURE, clue_only, |_this| Some(
    Reading::BarometricPressure(sample(1190.0..1191.0))
));

#[derive(Debug, Default)]
pub struct LightSensor {
    enabled: bool,
}

sensor_service!(LightSensor, ADAFRUIT_LIGHT, |_| true, |_this| Some(Reading::Light(sample(
    300.0..400.0
))));

#[derive(Debug, Default)]
pub struct AccelerometerSensor {
    enabled: bool,
}

sensor_service!(AccelerometerSensor, ADAFRUIT_ACCELEROMETER, |_| true, |_this| Some(
    Reading::Acceleration { x: 0.0, y: 0.0, z: 0.0 }
));

#[derive(Debug, Default)]
pub struct QuaternionSensor {
    enabled: bool,
}

sensor_service!(QuaternionSensor, ADAFRUIT_QUATERNION, clue_only, |_this| Some(
    Reading::Quaternion { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
));

#[derive(Debug, Default)]
pub struct ButtonsSensor {
    enabled: bool,
}

sensor_service!(ButtonsSensor, ADAFRUIT_BUTTONS, |_| true, |_this| Some(Reading::Buttons(
    ButtonsState {
        slide_switch: SlideSwitchState::Left,
        button_a: ButtonState::Pressed,
        button_b: ButtonState::Released,
    }
)));

/// RGB strip. Colors are stored, never transmitted.
#[derive(Debug, Default)]
pub struct NeoPixels {
    enabled: bool,
    pixels: Vec<[u8; 3]>,
}

impl NeoPixels {
    /// Sizes the strip for `board`; unknown boards have no pixels.
    pub fn configure(&mut self, board: Option<BoardModel>) {
        let count = board.map(|model| model.neopixel_count()).unwrap_or(0);
        self.pixels = vec![[0, 0, 0]; count];
    }

    pub fn count(&self) -> usize {
        self.pixels.len()
    }

    pub fn set_all_pixels_color(&mut self, color: [u8; 3]) {
        self.pixels.iter_mut().for_each(|pixel| *pixel = color);
    }

    /// Out of range indices are ignored.
    pub fn set_pixel_color(&mut self, index: usize, color: [u8; 3]) {
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = color;
        }
    }

    /// Applies `color` to every pixel whose mask entry is set.
    pub fn set_color_masked(&mut self, color: [u8; 3], pixel_mask: &[bool]) {
        for (pixel, selected) in self.pixels.iter_mut().zip(pixel_mask) {
            if *selected {
                *pixel = color;
            }
        }
    }

    pub fn pixels(&self) -> &[[u8; 3]] {
        &self.pixels
    }
}

sensor_service!(NeoPixels, ADAFRUIT_NEOPIXELS, |_| true, |_this| None);

/// Tone currently requested from the buzzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub frequency: u16,
    /// Milliseconds, 0 plays until stopped
    pub duration: u32,
}

#[derive(Debug, Default)]
pub struct ToneGenerator {
    enabled: bool,
    playing: Option<Tone>,
}

impl ToneGenerator {
    pub fn start_playing(&mut self, frequency: u16, duration: u32) {
        if self.enabled {
            self.playing = Some(Tone { frequency, duration });
        }
    }

    pub fn stop_playing(&mut self) {
        self.playing = None;
    }

    pub fn playing(&self) -> Option<Tone> {
        self.playing
    }
}

sensor_service!(ToneGenerator, ADAFRUIT_TONE_GENERATOR, |_| true, |_this| None);

/// Circuit Playground variants of the common services.
///
/// Same readings as their Adafruit counterparts, only advertised under a
/// different identifier and restricted to the Circuit Playground.
#[derive(Debug, Default)]
pub struct CpbSensor<S> {
    inner: S,
}

impl<S: SensorService> CpbSensor<S> {
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

macro_rules! cpb_service {
    ($inner:ty, $identifier:expr) => {
        impl SensorService for CpbSensor<$inner> {
            fn identifier(&self) -> &'static str {
                $identifier
            }

            fn is_supported(&self, board: Option<BoardModel>) -> bool {
                board == Some(BoardModel::CircuitPlaygroundBluefruit)
            }

            fn enable(&mut self) {
                self.inner.enable();
            }

            fn disable(&mut self) {
                self.inner.disable();
            }

            fn is_enabled(&self) -> bool {
                self.inner.is_enabled()
            }

            fn last_value(&self) -> Option<Reading> {
                self.inner.last_value()
            }

            fn as_any(&self) -> &dyn Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn Any {
                self
            }
        }
    };
}

cpb_service!(TemperatureSensor, CPB_TEMPERATURE);
cpb_service!(LightSensor, CPB_LIGHT);
cpb_service!(ButtonsSensor, CPB_BUTTONS);

/// Registers `S::default()` under `name`.
pub fn register_sensor<S>(registry: &TypeRegistry<dyn SensorService>, name: &str)
where
    S: SensorService + Default,
{
    registry.register_with(name, std::any::type_name::<S>(), || {
        Ok(Box::new(S::default()) as Box<dyn SensorService>)
    });
}

/// Registry of every simulated service, keyed by service identifier.
pub fn sensor_registry() -> TypeRegistry<dyn SensorService> {
    let registry: TypeRegistry<dyn SensorService> = TypeRegistry::new();
    register_sensor::<TemperatureSensor>(&registry, ADAFRUIT_TEMPERATURE);
    register_sensor::<HumiditySensor>(&registry, ADAFRUIT_HUMIDITY);
    register_sensor::<BarometricPressureSensor>(&registry, ADAFRUIT_BAROMETRIC_PRESSURE);
    register_sensor::<LightSensor>(&registry, ADAFRUIT_LIGHT);
    register_sensor::<AccelerometerSensor>(&registry, ADAFRUIT_ACCELEROMETER);
    register_sensor::<QuaternionSensor>(&registry, ADAFRUIT_QUATERNION);
    register_sensor::<ButtonsSensor>(&registry, ADAFRUIT_BUTTONS);
    register_sensor::<NeoPixels>(&registry, ADAFRUIT_NEOPIXELS);
    register_sensor::<ToneGenerator>(&registry, ADAFRUIT_TONE_GENERATOR);
    register_sensor::<CpbSensor<TemperatureSensor>>(&registry, CPB_TEMPERATURE);
    register_sensor::<CpbSensor<LightSensor>>(&registry, CPB_LIGHT);
    register_sensor::<CpbSensor<ButtonsSensor>>(&registry, CPB_BUTTONS);
    registry
}
