use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cmps_compass::config::{self, parse_i2c_address};
use cmps_compass::registers;
use cmps_compass::direction::Cardinal;
use cmps_compass::transport::open_i2c;
use cmps_compass::{CalibrationKind, CardStore, Cardinals, Compass, FileStore, RegisterLink};
use rppal::i2c::I2c;

/// Interactive CMPS14 calibration and compass card setup.
#[derive(Parser, Debug)]
#[command(name = "calibrate", about = "Calibrate the CMPS14 and build a compass card")]
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
}

const MENU: &str = "
Enter command;
 - 'h' to print this menu
 - 'c' to see current calibration levels
 - 'g' to calibrate the gyroscope
 - 'a' to calibrate accelerometer
 - 'm' to calibrate magnetometer
 - 's' to save current CMPS calibration
 - 'e' to erase the saved CMPS calibration
 - 'p' to enable periodic auto-save
 - 'x' to stop auto-calibration
 - 'b' to generate a boat compass card
 - 'd' to display the compass card
 - 'z' to zero (erase) the compass card
 - 'n' to save the compass card
 - 'q' to quit";

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let i2c = open_i2c(args.bus, args.address)?;
    let mut compass = Compass::new(RegisterLink::new(i2c));
    let mut store = FileStore::new(&args.store);
    compass.load_card(&store)?;

    println!("----------------------");
    println!("   Calibrate CMPS14");
    println!("----------------------");
    println!("CMPS14 software version v{}", compass.calibration().query_version()?);
    show_quality(&mut compass);
    println!("{MENU}");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("->? ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else { break };
        let Some(key) = line?.trim().chars().next() else {
            continue;
        };

        let kind = match key {
            'm' => Some(CalibrationKind::Magnetometer),
            'a' => Some(CalibrationKind::Accelerometer),
            'g' => Some(CalibrationKind::Gyroscope),
            'p' => Some(CalibrationKind::Autosave),
            'x' => Some(CalibrationKind::Stop),
            _ => None,
        };
        if let Some(kind) = kind {
            run_calibration(&mut compass, kind);
            continue;
        }

        match key {
            'h' | '?' => println!("{MENU}"),
            'c' => show_quality(&mut compass),
            's' => match compass.calibration().save_profile() {
                Ok(()) => println!("Calibration profile saved"),
                Err(e) => println!("Communication error: {e}"),
            },
            'e' => match compass.calibration().erase_profile() {
                Ok(()) => println!("Saved calibration erased, factory defaults apply"),
                Err(e) => println!("Communication error: {e}"),
            },
            'b' => build_card(&mut compass, &mut lines),
            'd' => {
                println!("compassCard;");
                for (raw, offset) in compass.card().entries() {
                    println!("compassCard[{raw}] = {offset}");
                }
            }
            'z' => {
                compass.reset_card();
                println!("Compass card zeroed");
            }
            'n' => save_card(&compass, &mut store),
            'q' => break,
            other => println!("Unknown command '{other}'"),
        }
    }
    Ok(())
}

fn show_quality(compass: &mut Compass<I2c>) {
    match compass.calibration().query_quality() {
        Ok(quality) => println!("Calibration {quality}"),
        Err(e) => println!("Could not read calibration quality: {e}"),
    }
}

fn run_calibration(compass: &mut Compass<I2c>, kind: CalibrationKind) {
    println!("Starting {kind}...");
    if let Err(e) = compass.calibration().begin_calibration(kind) {
        println!("Communication error: {e}");
        return;
    }
    println!("{}", kind.instructions());
    if let Some(period) = kind.advisory_period() {
        countdown(period);
    }
    show_quality(compass);
}

fn countdown(period: Duration) {
    for remaining in (1..=period.as_secs()).rev() {
        print!("{remaining} ");
        io::stdout().flush().ok();
        thread::sleep(Duration::from_secs(1));
    }
    println!("OK");
}

fn build_card(
    compass: &mut Compass<I2c>,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) {
    let mut readings = [0u16; 4];
    for (slot, cardinal) in readings.iter_mut().zip(Cardinal::ALL) {
        println!(
            "Steer the boat due {cardinal}. Hit enter when the boat compass reads {:03} degrees.",
            cardinal.true_heading()
        );
        if !matches!(lines.next(), Some(Ok(_))) {
            println!("Compass card cancelled");
            return;
        }
        match compass.sensor().try_read_bearing() {
            Ok(bearing) => {
                println!("CMPS reading for {cardinal} is {bearing:03} degrees\n");
                *slot = bearing;
            }
            Err(e) => {
                println!("No sensor reading ({e}), compass card unchanged");
                return;
            }
        }
    }

    let [north, east, south, west] = readings;
    match compass.build_card(Cardinals::new(north, east, south, west)) {
        Ok(fits) => {
            for fit in fits {
                println!("{fit}");
            }
            println!("Compass card built; use 'n' to keep it.");
        }
        Err(e) => println!("Compass card unchanged: {e}"),
    }
}

fn save_card(compass: &Compass<I2c>, store: &mut impl CardStore) {
    match compass.save_card(store) {
        Ok(()) => println!("compassCard saved"),
        Err(e) => println!("Could not save compass card: {e}"),
    }
}
