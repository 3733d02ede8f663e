//! UDP transport with a bounded receive timeout.
//!
//! The board answers every request with a single datagram, so the transport
//! is a plain bound socket: send one datagram to the fixed device address,
//! then block on receive for at most the configured timeout. A timeout is
//! reported as `Ok(None)` so it stays distinguishable from a short (but
//! present) reply.

use std::io::{self, ErrorKind};
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use log::trace;

/// Default receive timeout, matching the board's observed reply latency
/// with generous headroom.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_millis(800);

/// Blocking datagram exchange with the device.
///
/// The controller holds exactly one transport and never pipelines: the next
/// `send` is only issued after the previous `recv` (or its timeout) resolved.
pub trait Transport {
    /// Send one datagram to the device.
    fn send(&mut self, payload: &[u8]) -> io::Result<()>;

    /// Receive one datagram, or `Ok(None)` if the timeout elapsed first.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>>;
}

/// UDP socket bound to a fixed source port, targeting one device address.
pub struct UdpTransport {
    socket: UdpSocket,
    device: SocketAddr,
}

impl UdpTransport {
    /// Bind a socket on `source_port` aimed at `device`.
    ///
    /// The source port is fixed (rather than ephemeral) so the board's
    /// replies land on a port the host knows about. Pass port 0 to let the
    /// OS pick, which is what the loopback tests do.
    pub fn bind(source_port: u16, device: SocketAddr, timeout: Duration) -> io::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, source_port))?;
        socket.set_read_timeout(Some(timeout))?;
        Ok(Self { socket, device })
    }

    /// The local address this transport is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// The device address this transport targets.
    pub fn device_addr(&self) -> SocketAddr {
        self.device
    }
}

impl Transport for UdpTransport {
    fn send(&mut self, payload: &[u8]) -> io::Result<()> {
        let sent = self.socket.send_to(payload, self.device)?;
        if sent != payload.len() {
            return Err(io::Error::new(
                ErrorKind::WriteZero,
                format!("short send: {sent} of {} bytes", payload.len()),
            ));
        }
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.socket.recv(buf) {
            Ok(len) => {
                trace!("recv {len} bytes: {}", hex::encode(&buf[..len]));
                Ok(Some(len))
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                trace!("recv timed out");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_not_an_error() {
        let device = "127.0.0.1:1".parse().unwrap();
        let mut transport = UdpTransport::bind(0, device, Duration::from_millis(20)).unwrap();
        let mut buf = [0u8; 16];
        assert!(matches!(transport.recv(&mut buf), Ok(None)));
    }

    #[test]
    fn round_trip_on_loopback() {
        let peer = UdpSocket::bind("127.0.0.1:0").unwrap();
        let device = peer.local_addr().unwrap();

        let mut transport = UdpTransport::bind(0, device, Duration::from_millis(200)).unwrap();
        transport.send(&[0x80]).unwrap();

        let mut request = [0u8; 4];
        let (len, source) = peer.recv_from(&mut request).unwrap();
        assert_eq!(&request[..len], &[0x80]);

        peer.send_to(&[0x00, 0x00], source).unwrap();
        let mut reply = [0u8; 16];
        assert_eq!(transport.recv(&mut reply).unwrap(), Some(2));
        assert_eq!(&reply[..2], &[0x00, 0x00]);
    }
}
