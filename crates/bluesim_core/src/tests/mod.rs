use std::{sync::Arc, time::Duration};

use tokio::{sync::mpsc, time};

use crate::{
    builder::TypeRegistry,
    catalog::register_simulated_types,
    config::SimulationConfig,
    peripheral::{
        BoardModel, ManagerEvent, PeripheralError, PeripheralState, Reading, SensorService,
        SimulatedBleManager, SimulatedPeripheral, sensor_registry,
        sensors::{ADAFRUIT_HUMIDITY, ADAFRUIT_NEOPIXELS, ADAFRUIT_TEMPERATURE, CPB_TEMPERATURE},
        simulated::SIMULATED_PERIPHERAL_ID,
        spawn_sensor_notifier,
    },
};

fn simulation_registry() -> TypeRegistry {
    let registry = TypeRegistry::new();
    register_simulated_types(&registry);
    registry
}

#[tokio::test]
async fn integration_scan_connect_disconnect() {
    #[cfg(feature = "bluesim_tracing")]
    crate::bluesim_tracing::init();
    let (manager, mut events) = SimulatedBleManager::new(simulation_registry());

    let id = manager.start_scan().unwrap();
    assert_eq!(id, SIMULATED_PERIPHERAL_ID);
    assert_eq!(events.recv().await, Some(ManagerEvent::DidDiscover(id)));
    assert_eq!(manager.state(id), Ok(PeripheralState::Disconnected));

    manager.connect(id).unwrap();
    assert_eq!(events.recv().await, Some(ManagerEvent::DidConnect(id)));
    assert_eq!(manager.state(id), Ok(PeripheralState::Connected));

    let config = SimulationConfig::default();
    let skipped = manager
        .with_peripheral_mut(id, |peripheral| {
            peripheral.attach_sensors(&sensor_registry(), &config.sensor_identifiers()).len()
        })
        .unwrap();
    assert_eq!(skipped, 0);
    assert_eq!(manager.with_peripheral(id, |peripheral| peripheral.readings().len()).unwrap(), 4);

    manager.disconnect(id).unwrap();
    assert_eq!(events.recv().await, Some(ManagerEvent::WillDisconnect(id)));
    assert_eq!(events.recv().await, Some(ManagerEvent::DidDisconnect(id)));
    assert_eq!(manager.state(id), Ok(PeripheralState::Disconnected));
    assert_eq!(manager.peripheral_ids(), vec![id]);
    assert!(manager.with_peripheral(id, |peripheral| peripheral.readings().is_empty()).unwrap());
}

#[tokio::test]
async fn integration_scan_keeps_known_peripheral() {
    let (manager, _events) = SimulatedBleManager::new(simulation_registry());
    let id = manager.start_scan().unwrap();
    manager.connect(id).unwrap();
    manager.stop_scan();

    assert_eq!(manager.start_scan().unwrap(), id);
    assert_eq!(manager.peripheral_ids().len(), 1);
    assert_eq!(manager.state(id), Ok(PeripheralState::Connected));
    assert!(!manager.reconnect(&[id]));
}

#[tokio::test]
async fn integration_scan_without_registered_peripheral() {
    let (manager, _events) = SimulatedBleManager::new(TypeRegistry::new());
    assert_eq!(
        manager.start_scan(),
        Err(PeripheralError::SimulatedPeripheralUnavailable("SimulatedPeripheral".to_string()))
    );
    assert!(manager.peripheral_ids().is_empty());
}

#[tokio::test]
async fn integration_unknown_peripheral() {
    let (manager, mut events) = SimulatedBleManager::new(simulation_registry());
    let unknown = uuid::Uuid::nil();
    assert_eq!(manager.connect(unknown), Err(PeripheralError::UnknownPeripheral(unknown)));
    assert_eq!(manager.disconnect(unknown), Err(PeripheralError::UnknownPeripheral(unknown)));
    drop(manager);
    assert_eq!(events.recv().await, None);
}

#[tokio::test]
async fn integration_peripheral_setup_hook() {
    let config = SimulationConfig {
        board: BoardModel::ClueNrf52840,
        rssi: -40,
        ..SimulationConfig::default()
    };
    let (manager, mut events) = SimulatedBleManager::new(simulation_registry());
    let manager = manager.with_peripheral_setup(move |peripheral: &mut SimulatedPeripheral| {
        peripheral.set_board(config.board);
        peripheral.set_rssi(config.rssi);
    });
    let id = manager.start_scan().unwrap();
    assert_eq!(events.recv().await, Some(ManagerEvent::DidDiscover(id)));

    let (board, rssi, skipped) = manager
        .with_peripheral_mut(id, |peripheral| {
            let skipped = peripheral
                .attach_sensors(&sensor_registry(), &[ADAFRUIT_HUMIDITY, CPB_TEMPERATURE]);
            (peripheral.board_model(), peripheral.rssi(), skipped)
        })
        .unwrap();
    assert_eq!(board, Some(BoardModel::ClueNrf52840));
    assert_eq!(rssi, -40);
    assert_eq!(skipped, vec![CPB_TEMPERATURE]);
}

#[test]
fn integration_reentrant_peripheral_access() {
    let (manager, _events) = SimulatedBleManager::new(simulation_registry());
    let manager = Arc::new(manager);
    let id = manager.start_scan().unwrap();

    let (sender, receiver) = std::sync::mpsc::channel();
    let inner_manager = Arc::clone(&manager);
    std::thread::spawn(move || {
        let inner = inner_manager
            .with_peripheral_mut(id, |_peripheral| {
                let state = inner_manager.state(id);
                let connect = inner_manager.connect(id);
                (state, connect, inner_manager.peripheral_ids())
            })
            .unwrap();
        sender.send(inner).unwrap();
    });

    let (state, connect, ids) = receiver.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(state, Err(PeripheralError::PeripheralBusy(id)));
    assert_eq!(connect, Err(PeripheralError::PeripheralBusy(id)));
    assert_eq!(ids, vec![id]);

    // Released once the outer call returns
    assert_eq!(manager.state(id), Ok(PeripheralState::Disconnected));
    manager.connect(id).unwrap();
    assert_eq!(manager.state(id), Ok(PeripheralState::Connected));
}

#[test]
fn integration_peripheral_shared_across_threads() {
    let (manager, _events) = SimulatedBleManager::new(simulation_registry());
    let id = manager.start_scan().unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..50 {
                    manager.connect(id).unwrap();
                    manager.with_peripheral(id, |peripheral| peripheral.rssi()).unwrap();
                    manager.disconnect(id).unwrap();
                }
            });
        }
    });
    assert_eq!(manager.state(id), Ok(PeripheralState::Disconnected));
}

#[tokio::test(start_paused = true)]
async fn integration_sensor_notifier_periodic() {
    let (sender, mut receiver) = mpsc::channel(8);
    let sensor = sensor_registry().create_instance(ADAFRUIT_TEMPERATURE).unwrap();
    let handle =
        spawn_sensor_notifier(SIMULATED_PERIPHERAL_ID, sensor, Duration::from_millis(500), sender)
            .unwrap();

    let start = time::Instant::now();
    for _ in 0..3 {
        let notification = receiver.recv().await.unwrap();
        assert_eq!(notification.peripheral_id, SIMULATED_PERIPHERAL_ID);
        assert_eq!(notification.identifier, ADAFRUIT_TEMPERATURE);
        assert!(matches!(
            notification.reading,
            Reading::Temperature(v) if (18.5..19.5).contains(&v)
        ));
    }
    assert!(start.elapsed() >= Duration::from_millis(1500));

    drop(receiver);
    let sensor: Box<dyn SensorService> = handle.await.unwrap();
    assert!(!sensor.is_enabled());
}

#[tokio::test(start_paused = true)]
async fn integration_sensor_notifier_actuator_is_silent() {
    let (sender, mut receiver) = mpsc::channel(8);
    let pixels = sensor_registry().create_instance(ADAFRUIT_NEOPIXELS).unwrap();
    let handle =
        spawn_sensor_notifier(SIMULATED_PERIPHERAL_ID, pixels, Duration::from_millis(500), sender)
            .unwrap();

    assert!(time::timeout(Duration::from_secs(3), receiver.recv()).await.is_err());
    drop(receiver);
    assert!(!handle.await.unwrap().is_enabled());
}

#[tokio::test]
async fn integration_sensor_notifier_rejects_zero_period() {
    let (sender, mut receiver) = mpsc::channel(8);
    let sensor = sensor_registry().create_instance(ADAFRUIT_TEMPERATURE).unwrap();
    let result = spawn_sensor_notifier(SIMULATED_PERIPHERAL_ID, sensor, Duration::ZERO, sender);

    assert_eq!(
        result.err(),
        Some(PeripheralError::ZeroNotificationPeriod(ADAFRUIT_TEMPERATURE.to_string()))
    );
    assert_eq!(receiver.recv().await, None);
}
