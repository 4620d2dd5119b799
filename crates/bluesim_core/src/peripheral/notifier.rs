use std::time::Duration;

use tokio::{sync::mpsc, task::JoinHandle, time};
use tracing::debug;
use uuid::Uuid;

use super::{
    error::PeripheralError,
    sensors::{Reading, SensorService},
};

#[derive(Debug, Clone, PartialEq)]
pub struct SensorNotification {
    pub peripheral_id: Uuid,
    pub identifier: &'static str,
    pub reading: Reading,
}

/// Enables `sensor` and reports its value every `period` until the receiving
/// side of `sender` is dropped.
///
/// The first notification is sent after one full period. Ticks on which the
/// sensor has no value (actuators) are skipped. The task hands the disabled
/// sensor back when it ends.
///
/// A zero `period` is rejected with [`PeripheralError::ZeroNotificationPeriod`]
/// and no task is spawned.
pub fn spawn_sensor_notifier(
    peripheral_id: Uuid,
    mut sensor: Box<dyn SensorService>,
    period: Duration,
    sender: mpsc::Sender<SensorNotification>,
) -> Result<JoinHandle<Box<dyn SensorService>>, PeripheralError> {
    if period.is_zero() {
        return Err(PeripheralError::ZeroNotificationPeriod(sensor.identifier().to_string()));
    }

    Ok(tokio::spawn(async move {
        sensor.enable();
        let identifier = sensor.identifier();
        let mut interval = time::interval_at(time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = sender.closed() => break,
                _ = interval.tick() => {
                    let Some(reading) = sensor.last_value() else {
                        continue;
                    };
                    let notification = SensorNotification { peripheral_id, identifier, reading };
                    if sender.send(notification).await.is_err() {
                        break;
                    }
                }
            }
        }

        debug!(peripheral = %peripheral_id, identifier, "sensor notifications stopped");
        sensor.disable();
        sensor
    }))
}
