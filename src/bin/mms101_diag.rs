//! Bench bring-up diagnostic.
//!
//! Fires each command once, in boot order, straight over the transport, and
//! hex-dumps whatever comes back. No state machine, no validation beyond
//! printing; useful when a board answers something unexpected and the
//! driver's own error messages are not enough.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::Parser;
use log::error;

use mms101::protocol::PROTOCOL_SPI;
use mms101::{Command, Config, Transport, UdpTransport};

#[derive(Parser, Debug)]
#[command(name = "mms101_diag", about = "Fire each command once and dump the replies")]
struct Args {
    /// JSON config file; built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Device IP, overriding the config file.
    #[arg(long)]
    ip: Option<IpAddr>,
}

fn run(args: Args) -> mms101::Result<()> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(ip) = args.ip {
        config.dest_ip = ip;
    }

    println!("device   {}", config.device_addr());
    println!(
        "sensors  {:?} (mask {:#04x})",
        config.sensors,
        config.sensor_mask()
    );

    let mut transport = UdpTransport::bind(
        config.src_port,
        config.device_addr(),
        config.recv_timeout(),
    )?;

    let probes = [
        Command::Status,
        Command::Version,
        Command::Reset,
        Command::Select {
            protocol: PROTOCOL_SPI,
            sensor_mask: config.sensor_mask(),
        },
        Command::Boot,
        Command::Status,
        Command::Start,
        Command::Data,
        Command::Stop,
    ];

    let mut replies = 0;
    let mut buf = [0u8; 256];
    for command in probes {
        transport.send(&command.encode())?;
        match transport.recv(&mut buf)? {
            Some(len) => {
                replies += 1;
                println!(
                    "{:<8} {:3} bytes  {}",
                    command.name(),
                    len,
                    hex::encode(&buf[..len])
                );
            }
            None => println!("{:<8} no reply", command.name()),
        }
    }

    if replies == 0 {
        return Err(mms101::Error::Argument(
            "board never answered; check address and cabling".into(),
        ));
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run(Args::parse()) {
        error!("{e}");
        std::process::exit(1);
    }
}
