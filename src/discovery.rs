//! Board discovery by broadcast Status probe.
//!
//! The evaluation board has no announcement mechanism, but it answers a
//! Status request from any source. Broadcasting Status on the device port
//! and collecting the responders is enough to enumerate boards on the local
//! segments. Probes are repeated a few times because a single broadcast
//! datagram is easily lost; responders are deduplicated across attempts.

use std::collections::HashSet;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::protocol::{Command, DEVICE_PORT};

/// Settings for one discovery sweep.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Addresses to probe. Defaults to the limited broadcast plus the
    /// directed broadcasts of the subnets the board ships configured for.
    pub targets: Vec<IpAddr>,
    /// Port the boards listen on.
    pub device_port: u16,
    /// How long to collect replies after each probe round.
    pub listen_window: Duration,
    /// Probe rounds before giving up on further responders.
    pub attempts: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            targets: vec![
                IpAddr::V4(Ipv4Addr::BROADCAST),
                IpAddr::V4(Ipv4Addr::new(192, 168, 1, 255)),
                IpAddr::V4(Ipv4Addr::new(192, 168, 0, 255)),
            ],
            device_port: DEVICE_PORT,
            listen_window: Duration::from_millis(500),
            attempts: 3,
        }
    }
}

/// Broadcast Status probes and return every board that answered.
///
/// The result is sorted for stable output; an empty vec means no board
/// answered within the configured attempts, which is not an error.
pub fn discover(config: &DiscoveryConfig) -> io::Result<Vec<SocketAddr>> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.set_broadcast(true)?;
    // Short poll interval; the listen window is enforced per round below.
    socket.set_read_timeout(Some(Duration::from_millis(50)))?;

    let probe = Command::Status.encode();
    let mut found = HashSet::new();
    let mut buf = [0u8; 64];

    for attempt in 0..config.attempts {
        for target in &config.targets {
            let dest = SocketAddr::new(*target, config.device_port);
            debug!("probe {} (attempt {})", dest, attempt + 1);
            socket.send_to(&probe, dest)?;
        }

        let round_ends = Instant::now() + config.listen_window;
        while Instant::now() < round_ends {
            match socket.recv_from(&mut buf) {
                Ok((len, source)) => {
                    debug!("reply from {source}: {}", hex::encode(&buf[..len]));
                    if len == Command::Status.response_len() && found.insert(source) {
                        info!("board at {source}");
                    }
                }
                Err(e) if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) => {}
                Err(e) => return Err(e),
            }
        }
    }

    let mut boards: Vec<SocketAddr> = found.into_iter().collect();
    boards.sort();
    Ok(boards)
}
