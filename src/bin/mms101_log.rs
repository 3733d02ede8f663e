//! Log measurements to a CSV file.
//!
//! One row per sensor per measurement cycle: wall-clock timestamp, seconds
//! since acquisition start, sample index, sensor index, then the six axis
//! values. The default output path is date/time-nested so repeated bench
//! runs never clobber each other. The file is flushed on interrupt so a
//! truncated run still yields usable data.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use clap::Parser;
use log::{error, info};

use mms101::{Config, Mms101Controller};

#[derive(Parser, Debug)]
#[command(name = "mms101_log", about = "Record force/torque readings to CSV")]
struct Args {
    /// JSON config file; built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device IP, overriding the config file.
    #[arg(long)]
    ip: Option<IpAddr>,

    /// Comma-separated 1-based sensor slots, overriding the config file.
    #[arg(long, value_delimiter = ',')]
    sensors: Option<Vec<u8>>,

    /// Samples to acquire (0 = until interrupted), overriding the config.
    #[arg(short = 'n', long)]
    count: Option<u64>,

    /// Stop after this many seconds (0 = no time cap).
    #[arg(long, default_value_t = 0)]
    duration_s: u64,

    /// Output CSV path; defaults to
    /// outputs/YYYY-MM-DD/HH-MM-SS/mms101_log.csv.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Append to an existing file instead of writing a fresh header.
    #[arg(long)]
    append: bool,
}

fn arg_err(e: impl std::fmt::Display) -> mms101::Error {
    mms101::Error::Argument(e.to_string())
}

fn run(args: Args) -> mms101::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(ip) = args.ip {
        config.dest_ip = ip;
    }
    if let Some(sensors) = args.sensors {
        config.sensors = sensors;
    }
    if let Some(count) = args.count {
        config.measure_max = count;
    }
    config.validate()?;

    let output = args.output.unwrap_or_else(|| {
        let now = Local::now();
        PathBuf::from("outputs")
            .join(now.format("%Y-%m-%d").to_string())
            .join(now.format("%H-%M-%S").to_string())
            .join("mms101_log.csv")
    });
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)).map_err(arg_err)?;
    }

    let fresh = !args.append || !output.exists();
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(args.append)
        .write(!args.append)
        .truncate(!args.append)
        .open(&output)?;
    let mut writer = csv::Writer::from_writer(file);
    if fresh {
        writer
            .write_record([
                "time_iso",
                "t_elapsed_s",
                "sample_index",
                "sensor_index",
                "fx",
                "fy",
                "fz",
                "tx",
                "ty",
                "tz",
            ])
            .map_err(arg_err)?;
    }

    let mut controller = Mms101Controller::connect(&config)?;
    controller.start_streaming()?;
    info!("recording to {}", output.display());

    let started = Instant::now();
    let mut sample: u64 = 0;
    while running.load(Ordering::SeqCst) {
        let m = controller.read_cycle()?;
        let time_iso = Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();
        let elapsed = started.elapsed().as_secs_f64();

        for (index, reading) in m.readings.iter().enumerate() {
            let mut record = vec![
                time_iso.clone(),
                format!("{elapsed:.6}"),
                sample.to_string(),
                config.sensors[index].to_string(),
            ];
            for value in reading.as_array() {
                record.push(format!("{value:.6}"));
            }
            writer.write_record(&record).map_err(arg_err)?;
        }

        sample += 1;
        if config.measure_max != 0 && sample >= config.measure_max {
            break;
        }
        if args.duration_s != 0 && elapsed >= args.duration_s as f64 {
            break;
        }
    }

    writer.flush()?;
    info!("{sample} samples written to {}", output.display());
    controller.shutdown()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run(Args::parse()) {
        error!("{e}");
        std::process::exit(1);
    }
}
