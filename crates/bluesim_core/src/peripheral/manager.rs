//! Simulated BLE central.
//!
//! Scanning "discovers" one [`SimulatedPeripheral`] built by name through the
//! object registry, connection and disconnection only flip its state. Every
//! transition is published on an unbounded channel, in the same order a real
//! central would report it.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError},
    thread::{self, ThreadId},
};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    error::PeripheralError,
    simulated::{PeripheralState, SIMULATED_PERIPHERAL_TYPE, SimulatedPeripheral},
};
use crate::builder::TypeRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerEvent {
    DidDiscover(Uuid),
    DidConnect(Uuid),
    WillDisconnect(Uuid),
    DidDisconnect(Uuid),
}

/// Hook run on each newly discovered peripheral.
pub type PeripheralSetup = Box<dyn Fn(&mut SimulatedPeripheral) + Send + Sync>;

/// A known peripheral and the thread currently borrowing it.
#[derive(Debug)]
struct PeripheralSlot {
    peripheral: Mutex<SimulatedPeripheral>,
    holder: Mutex<Option<ThreadId>>,
}

/// Clears the slot holder when the borrow ends, unwinding included.
struct HolderGuard<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for HolderGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl PeripheralSlot {
    fn new(peripheral: SimulatedPeripheral) -> Self {
        Self { peripheral: Mutex::new(peripheral), holder: Mutex::new(None) }
    }

    fn holder(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` on the locked peripheral.
    ///
    /// Other threads wait for the lock. The thread already holding it gets
    /// [`PeripheralError::PeripheralBusy`] instead of deadlocking.
    fn access<R>(
        &self,
        identifier: Uuid,
        f: impl FnOnce(&mut SimulatedPeripheral) -> R,
    ) -> Result<R, PeripheralError> {
        let current = thread::current().id();
        let mut peripheral = match self.peripheral.try_lock() {
            Ok(peripheral) => peripheral,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                if *self.holder() == Some(current) {
                    debug!(peripheral = %identifier, "re-entrant peripheral access refused");
                    return Err(PeripheralError::PeripheralBusy(identifier));
                }
                self.peripheral.lock().unwrap_or_else(PoisonError::into_inner)
            }
        };

        *self.holder() = Some(current);
        let _holder = HolderGuard(&self.holder);
        Ok(f(&mut peripheral))
    }
}

pub struct SimulatedBleManager {
    registry: TypeRegistry,
    peripherals: DashMap<Uuid, Arc<PeripheralSlot>>,
    events: mpsc::UnboundedSender<ManagerEvent>,
    peripheral_setup: Option<PeripheralSetup>,
}

impl fmt::Debug for SimulatedBleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulatedBleManager")
            .field("registry", &self.registry)
            .field("peripherals", &self.peripheral_ids())
            .field("peripheral_setup", &self.peripheral_setup.is_some())
            .finish()
    }
}

impl SimulatedBleManager {
    /// Creates a manager building its peripherals from `registry`.
    pub fn new(registry: TypeRegistry) -> (Self, mpsc::UnboundedReceiver<ManagerEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        (Self { registry, peripherals: DashMap::new(), events, peripheral_setup: None }, receiver)
    }

    /// Hook applied to each newly discovered peripheral, before it is
    /// announced.
    pub fn with_peripheral_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn(&mut SimulatedPeripheral) + Send + Sync + 'static,
    {
        self.peripheral_setup = Some(Box::new(setup));
        self
    }

    fn notify(&self, event: ManagerEvent) {
        if self.events.send(event).is_err() {
            debug!(?event, "no event listener");
        }
    }

    /// Clones the slot out of the map so that no shard lock is held while a
    /// peripheral is borrowed.
    fn slot(&self, identifier: Uuid) -> Result<Arc<PeripheralSlot>, PeripheralError> {
        self.peripherals
            .get(&identifier)
            .map(|slot| Arc::clone(slot.value()))
            .ok_or(PeripheralError::UnknownPeripheral(identifier))
    }

    /// Discovers the simulated peripheral.
    ///
    /// Scanning again while the peripheral is known keeps its current state.
    pub fn start_scan(&self) -> Result<Uuid, PeripheralError> {
        let mut peripheral = self
            .registry
            .create_instance_of::<SimulatedPeripheral>(SIMULATED_PERIPHERAL_TYPE)
            .ok_or_else(|| {
                warn!(name = SIMULATED_PERIPHERAL_TYPE, "unable to build simulated peripheral");
                PeripheralError::SimulatedPeripheralUnavailable(
                    SIMULATED_PERIPHERAL_TYPE.to_string(),
                )
            })?;
        if let Some(setup) = &self.peripheral_setup {
            setup(&mut peripheral);
        }

        let identifier = peripheral.identifier();
        let peripheral = *peripheral;
        self.peripherals
            .entry(identifier)
            .or_insert_with(move || Arc::new(PeripheralSlot::new(peripheral)));
        info!(peripheral = %identifier, "simulated peripheral discovered");
        self.notify(ManagerEvent::DidDiscover(identifier));
        Ok(identifier)
    }

    pub fn stop_scan(&self) {}

    pub fn connect(&self, identifier: Uuid) -> Result<(), PeripheralError> {
        self.with_peripheral_mut(identifier, |peripheral| peripheral.simulate_connect())?;
        self.notify(ManagerEvent::DidConnect(identifier));
        Ok(())
    }

    /// Reconnection by identifier is not simulated.
    pub fn reconnect(&self, _identifiers: &[Uuid]) -> bool {
        false
    }

    /// Disconnects and resets the peripheral. It stays known so that it can
    /// be selected again without scanning.
    pub fn disconnect(&self, identifier: Uuid) -> Result<(), PeripheralError> {
        self.with_peripheral_mut(identifier, |peripheral| {
            self.notify(ManagerEvent::WillDisconnect(identifier));
            peripheral.reset();
        })?;
        info!(peripheral = %identifier, "simulated peripheral disconnected");
        self.notify(ManagerEvent::DidDisconnect(identifier));
        Ok(())
    }

    pub fn peripheral_ids(&self) -> Vec<Uuid> {
        self.peripherals.iter().map(|entry| *entry.key()).collect()
    }

    pub fn state(&self, identifier: Uuid) -> Result<PeripheralState, PeripheralError> {
        self.with_peripheral(identifier, |peripheral| peripheral.state())
    }

    /// Runs `f` on the peripheral `identifier`.
    ///
    /// `f` may call back into the manager. Calls that need the same
    /// peripheral fail with [`PeripheralError::PeripheralBusy`], calls on the
    /// peripheral list or on other peripherals proceed normally.
    pub fn with_peripheral<R>(
        &self,
        identifier: Uuid,
        f: impl FnOnce(&SimulatedPeripheral) -> R,
    ) -> Result<R, PeripheralError> {
        self.slot(identifier)?.access(identifier, |peripheral| f(peripheral))
    }

    /// Mutable counterpart of [`with_peripheral`](Self::with_peripheral),
    /// with the same re-entrancy rules.
    pub fn with_peripheral_mut<R>(
        &self,
        identifier: Uuid,
        f: impl FnOnce(&mut SimulatedPeripheral) -> R,
    ) -> Result<R, PeripheralError> {
        self.slot(identifier)?.access(identifier, f)
    }
}
