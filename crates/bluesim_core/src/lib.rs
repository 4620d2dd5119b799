//! Name-keyed object construction for a simulated Bluetooth LE peripheral kit.
//!
//! The [`builder`] module maps textual type identifiers to factory closures,
//! so that a caller holding only a name (a service identifier discovered on a
//! peripheral, a type named in configuration) can obtain a fresh,
//! default-initialized instance without a hardcoded `match`. An unknown or
//! non-constructible name is an ordinary outcome and yields `None`.
//!
//! The [`peripheral`] module is the main consumer of the builder: a simulated
//! Adafruit peripheral, its sensor services and a simulated BLE manager used
//! to exercise application code without hardware.

#[cfg(test)]
mod tests;

pub mod builder;
pub mod catalog;
pub mod config;
pub mod peripheral;

pub use builder::{BuildError, ObjectBuilder, TypeRegistry};

#[cfg(feature = "bluesim_tracing")]
pub mod bluesim_tracing {
    use std::sync::Once;
    use tracing_subscriber::{EnvFilter, fmt};

    static INIT: Once = Once::new();

    /// Installs a global `fmt` subscriber writing through the test harness.
    ///
    /// Filtering follows `RUST_LOG` (for instance `bluesim_core=debug`) and
    /// stays silent when it is unset. Later calls are no-ops.
    pub fn init() {
        INIT.call_once(|| {
            let filter = EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new("off"))
                .unwrap_or_default();

            fmt()
                .with_target(true)
                .with_thread_names(true)
                .with_test_writer()
                .with_env_filter(filter)
                .init();
        });
    }
}
