use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use cmps_compass::config::{self, parse_i2c_address};
use cmps_compass::registers;
use cmps_compass::service::CompassService;
use cmps_compass::transport::open_i2c;
use cmps_compass::{Compass, FileStore, RegisterLink};

/// Reads the CMPS14 and prints the boat heading after the compass card.
#[derive(Parser, Debug)]
#[command(name = "cmps-compass", about = "CMPS14 heading monitor")]
struct Args {
    /// I2C bus number (/dev/i2c-N)
    #[arg(long, default_value_t = config::DEFAULT_I2C_BUS)]
    bus: u8,

    /// Compass I2C address
    #[arg(long, default_value_t = registers::CMPS14_I2C_ADDRESS, value_parser = parse_i2c_address)]
    address: u16,

    /// Settings file holding the compass card
    #[arg(long, default_value = config::DEFAULT_STORE_PATH)]
    store: PathBuf,

    /// Milliseconds between heading readings
    #[arg(long, default_value_t = config::HEADING_INTERVAL_MS)]
    interval_ms: u64,

    /// Stop after this many readings
    #[arg(long)]
    count: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let i2c = open_i2c(args.bus, args.address)?;
    let mut compass = Compass::new(RegisterLink::new(i2c));
    let store = FileStore::new(&args.store);
    if !compass.load_card(&store)? {
        println!("No compass card in {}; showing raw sensor headings.", args.store.display());
    }

    let (handle, worker) = CompassService::spawn(compass, store)?;

    match handle.version() {
        Ok(version) => println!("✓ CMPS14 software version v{version}"),
        Err(e) => warn!("could not read CMPS14 version: {e}"),
    }
    match handle.quality() {
        Ok(quality) => println!("  Calibration: {quality}"),
        Err(e) => warn!("could not read calibration quality: {e}"),
    }

    let interval = Duration::from_millis(args.interval_ms);
    let mut readings = 0u64;
    while args.count.is_none_or(|count| readings < count) {
        match handle.heading()? {
            Some(heading) => println!("Heading: {heading}"),
            None => println!("Heading: N/A (no sensor reading)"),
        }
        readings += 1;
        thread::sleep(interval);
    }

    drop(handle);
    if worker.join().is_err() {
        anyhow::bail!("compass bus thread panicked");
    }
    info!("stopped after {readings} readings");
    Ok(())
}
