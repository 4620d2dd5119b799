use std::time::Duration;

use anyhow::Context;
use bluesim_core::{
    ObjectBuilder,
    catalog::register_global,
    config::SimulationConfig,
    peripheral::{
        BoardModel, SimulatedBleManager, SimulatedPeripheral, sensor_registry,
        simulated::SIMULATED_RSSI, spawn_sensor_notifier,
    },
};
use clap::{Args, Parser, Subcommand};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "bluesim")]
#[command(about = "Simulated Adafruit BLE peripheral and name-keyed object builder")]
struct BluesimArgs {
    /// Log at debug level when RUST_LOG is not set
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered type identifiers
    Types,
    /// Build an instance from its type identifier
    Create {
        /// Type identifier, matched exactly
        name: String,

        /// Print why no instance was produced
        #[arg(long, default_value_t = false)]
        explain: bool,
    },
    /// Scan, connect and print simulated sensor notifications
    Scan(ScanArgs),
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Advertised board (cpb, clue)
    #[arg(long, env = "BLUESIM_BOARD", default_value = "cpb", value_parser = parse_board)]
    board: BoardModel,

    /// Advertised signal strength
    #[arg(
        long,
        env = "BLUESIM_RSSI",
        default_value_t = SIMULATED_RSSI,
        allow_negative_numbers = true
    )]
    rssi: i8,

    /// Notification period in milliseconds, at least 1
    #[arg(
        long,
        env = "BLUESIM_PERIOD_MS",
        default_value_t = 500,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    period_ms: u64,

    /// Comma separated service identifiers
    #[arg(long, env = "BLUESIM_SENSORS")]
    sensors: Option<String>,

    /// Number of notifications to print before disconnecting
    #[arg(short = 'n', long, default_value_t = 8)]
    samples: usize,
}

impl From<&ScanArgs> for SimulationConfig {
    fn from(args: &ScanArgs) -> Self {
        let defaults = SimulationConfig::default();
        Self {
            board: args.board,
            rssi: args.rssi,
            sensor_period: Duration::from_millis(args.period_ms),
            sensors: args
                .sensors
                .as_deref()
                .map(SimulationConfig::parse_sensor_list)
                .unwrap_or(defaults.sensors),
        }
    }
}

fn parse_board(value: &str) -> Result<BoardModel, String> {
    BoardModel::from_short_name(value)
        .ok_or_else(|| format!("unknown board: {value} (expected cpb or clue)"))
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "bluesim_core=debug,bluesim=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default))
        .unwrap_or_default();

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_target(true))
        .init();
}

fn list_types() {
    let registry = register_global();
    let constructible = registry.constructible_names();
    for name in registry.names() {
        let type_name = registry.type_name_of(&name).unwrap_or("?");
        let marker = if constructible.contains(&name) { "" } else { " (no default constructor)" };
        println!("{name:<28} {type_name}{marker}");
    }
}

fn create(name: &str, explain: bool) {
    let registry = register_global();
    if explain {
        match registry.build(name) {
            Ok(_) => println!("{name}: {}", registry.type_name_of(name).unwrap_or("?")),
            Err(error) => println!("{name}: absent ({error})"),
        }
    } else if ObjectBuilder::create_instance(name).is_some() {
        println!("{name}: {}", registry.type_name_of(name).unwrap_or("?"));
    } else {
        println!("{name}: absent");
    }
}

async fn scan(config: SimulationConfig, samples: usize) -> anyhow::Result<()> {
    let (manager, mut events) = SimulatedBleManager::new(register_global().clone());
    let (board, rssi) = (config.board, config.rssi);
    let manager = manager.with_peripheral_setup(move |peripheral: &mut SimulatedPeripheral| {
        peripheral.set_board(board);
        peripheral.set_rssi(rssi);
    });

    let id = manager.start_scan().context("scan failed")?;
    manager.connect(id)?;
    while let Ok(event) = events.try_recv() {
        println!("{event:?}");
    }

    let identifiers = config.sensor_identifiers();
    let skipped = manager.with_peripheral_mut(id, |peripheral| {
        peripheral.attach_sensors(&sensor_registry(), &identifiers)
    })?;
    for identifier in skipped {
        println!("skipped unsupported service {identifier}");
    }

    let attached: Vec<&'static str> = manager.with_peripheral(id, |peripheral| {
        peripheral.sensors().map(|sensor| sensor.identifier()).collect()
    })?;
    let (sender, mut receiver) = mpsc::channel(32);
    let mut notifiers = Vec::new();
    for identifier in attached {
        let detached =
            manager.with_peripheral_mut(id, |peripheral| peripheral.detach_sensor(identifier))?;
        if let Some(sensor) = detached {
            let notifier = spawn_sensor_notifier(id, sensor, config.sensor_period, sender.clone())?;
            notifiers.push(notifier);
        }
    }
    drop(sender);

    let mut received = 0;
    while received < samples {
        let Some(notification) = receiver.recv().await else {
            break;
        };
        println!("{:<24} {:?}", notification.identifier, notification.reading);
        received += 1;
    }
    drop(receiver);

    for notifier in notifiers {
        let sensor = notifier.await?;
        manager.with_peripheral_mut(id, |peripheral| peripheral.attach_sensor(sensor))??;
    }

    manager.disconnect(id)?;
    while let Ok(event) = events.try_recv() {
        println!("{event:?}");
    }
    tracing::info!(peripheral = %id, received, "scan session finished");
    Ok(())
}

#[cfg(not(tarpaulin_include))]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = BluesimArgs::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Types => list_types(),
        Command::Create { name, explain } => create(&name, explain),
        Command::Scan(scan_args) => {
            scan(SimulationConfig::from(&scan_args), scan_args.samples).await?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_args_reject_zero_period() {
        let parsed = BluesimArgs::try_parse_from(["bluesim", "scan", "--period-ms", "0"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn scan_args_into_config() {
        let args = BluesimArgs::try_parse_from([
            "bluesim",
            "scan",
            "--board",
            "clue",
            "--rssi",
            "-40",
            "--period-ms",
            "250",
            "--sensors",
            "AdafruitHumidity,AdafruitQuaternion",
        ])
        .unwrap();
        let Command::Scan(scan_args) = args.command else {
            panic!("expected scan command");
        };

        let config = SimulationConfig::from(&scan_args);
        assert_eq!(config.board, BoardModel::ClueNrf52840);
        assert_eq!(config.rssi, -40);
        assert_eq!(config.sensor_period, Duration::from_millis(250));
        assert_eq!(config.sensor_identifiers(), vec!["AdafruitHumidity", "AdafruitQuaternion"]);
    }
}
