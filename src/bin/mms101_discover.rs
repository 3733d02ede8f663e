//! Enumerate boards on the local network segments.

use std::net::IpAddr;
use std::time::Duration;

use clap::Parser;
use log::error;

use mms101::{discover, DiscoveryConfig};

#[derive(Parser, Debug)]
#[command(name = "mms101_discover", about = "Find boards by broadcast probe")]
struct Args {
    /// Extra addresses to probe, on top of the default broadcast targets.
    #[arg(long, value_delimiter = ',')]
    target: Vec<IpAddr>,

    /// Milliseconds to listen for replies after each probe round.
    #[arg(long, default_value_t = 500)]
    window_ms: u64,

    /// Probe rounds.
    #[arg(long, default_value_t = 3)]
    attempts: u32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = DiscoveryConfig {
        listen_window: Duration::from_millis(args.window_ms),
        attempts: args.attempts,
        ..DiscoveryConfig::default()
    };
    config.targets.extend(args.target);

    match discover(&config) {
        Ok(boards) if boards.is_empty() => {
            println!("no boards found");
            std::process::exit(1);
        }
        Ok(boards) => {
            for board in boards {
                println!("{board}");
            }
        }
        Err(e) => {
            error!("discovery failed: {e}");
            std::process::exit(1);
        }
    }
}
