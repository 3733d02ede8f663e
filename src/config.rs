//! Typed acquisition configuration.
//!
//! All knobs are validated once, up front, at controller construction. The
//! file format is JSON via serde; the binaries layer CLI overrides on top so
//! a bench setup does not require editing the config file.

use std::fs;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::frame::MAX_SENSORS;
use crate::protocol::{self, DEFAULT_SOURCE_PORT, DEVICE_PORT};

fn default_dest_ip() -> IpAddr {
    // Factory default of the evaluation board.
    IpAddr::V4(Ipv4Addr::new(192, 168, 0, 200))
}

fn default_dest_port() -> u16 {
    DEVICE_PORT
}

fn default_src_port() -> u16 {
    DEFAULT_SOURCE_PORT
}

fn default_sensors() -> Vec<u8> {
    vec![1]
}

fn default_recv_timeout_ms() -> u64 {
    crate::transport::DEFAULT_RECV_TIMEOUT.as_millis() as u64
}

/// Connection and sensor-selection settings for one evaluation board.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Device IP address.
    #[serde(default = "default_dest_ip")]
    pub dest_ip: IpAddr,

    /// Device UDP port.
    #[serde(default = "default_dest_port")]
    pub dest_port: u16,

    /// Fixed host-side source port, so replies target a known port.
    #[serde(default = "default_src_port")]
    pub src_port: u16,

    /// 1-based sensor slots to activate (board sockets 1..=5).
    #[serde(default = "default_sensors")]
    pub sensors: Vec<u8>,

    /// Receive timeout per command exchange, in milliseconds.
    #[serde(default = "default_recv_timeout_ms")]
    pub recv_timeout_ms: u64,

    /// Samples to acquire before the acquisition binaries stop (0 = run
    /// until interrupted).
    #[serde(default)]
    pub measure_max: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dest_ip: default_dest_ip(),
            dest_port: default_dest_port(),
            src_port: default_src_port(),
            sensors: default_sensors(),
            recv_timeout_ms: default_recv_timeout_ms(),
            measure_max: 0,
        }
    }
}

impl Config {
    /// Load a config file, validating it before returning.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| Error::Argument(format!("{}: {e}", path.as_ref().display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the protocol or frame layout cannot serve.
    pub fn validate(&self) -> Result<()> {
        if self.sensors.is_empty() {
            return Err(Error::Argument("no sensor slots selected".into()));
        }
        if self.sensors.len() > MAX_SENSORS {
            return Err(Error::Argument(format!(
                "{} sensors selected; the 100-byte data frame holds at most {MAX_SENSORS}",
                self.sensors.len()
            )));
        }
        for &slot in &self.sensors {
            if !(1..=MAX_SENSORS as u8).contains(&slot) {
                return Err(Error::Argument(format!(
                    "sensor slot {slot} outside 1..={MAX_SENSORS}"
                )));
            }
        }
        let mut seen = [false; MAX_SENSORS];
        for &slot in &self.sensors {
            let index = usize::from(slot - 1);
            if seen[index] {
                return Err(Error::Argument(format!("sensor slot {slot} listed twice")));
            }
            seen[index] = true;
        }
        Ok(())
    }

    /// Number of configured sensors.
    pub fn n_sensors(&self) -> usize {
        self.sensors.len()
    }

    /// Select-command bitmask for the configured slots.
    pub fn sensor_mask(&self) -> u8 {
        protocol::sensor_mask(&self.sensors)
    }

    /// Device socket address.
    pub fn device_addr(&self) -> SocketAddr {
        SocketAddr::new(self.dest_ip, self.dest_port)
    }

    /// Per-exchange receive timeout.
    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}
