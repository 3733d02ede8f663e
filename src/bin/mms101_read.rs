//! Stream measurements to stdout.
//!
//! Connects to one board, runs the boot sequence, then prints one line per
//! measurement cycle until the sample budget is exhausted or the process is
//! interrupted. Ctrl-C is trapped so the board always receives Stop.

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::error;

use mms101::{Config, Mms101Controller};

#[derive(Parser, Debug)]
#[command(name = "mms101_read", about = "Stream force/torque readings to stdout")]
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

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || running.store(false, Ordering::SeqCst))
            .map_err(|e| mms101::Error::Argument(format!("signal handler: {e}")))?;
    }

    let mut controller = Mms101Controller::connect(&config)?;
    controller.start_streaming()?;

    let mut taken = 0u64;
    while running.load(Ordering::SeqCst) {
        let m = controller.read_cycle()?;
        print!("{:5} {:8}", m.counter, m.interval_us);
        for reading in &m.readings {
            print!(
                "  {:9.4} {:9.4} {:9.4} {:9.5} {:9.5} {:9.5}",
                reading.fx, reading.fy, reading.fz, reading.tx, reading.ty, reading.tz
            );
        }
        println!();

        taken += 1;
        if config.measure_max != 0 && taken >= config.measure_max {
            break;
        }
    }

    controller.shutdown()
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run(Args::parse()) {
        error!("{e}");
        std::process::exit(1);
    }
}
