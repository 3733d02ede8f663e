//! End-to-end lifecycle against a simulated board on loopback UDP.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use mms101::{Config, DeviceState, Mms101Controller};

const FRAME_LEN: usize = 100;

/// Shared counters observed by the tests after the board thread exits.
#[derive(Default)]
struct BoardStats {
    boots: AtomicU32,
    starts: AtomicU32,
    stops: AtomicU32,
}

/// Simulated evaluation board: answers each opcode on a loopback socket
/// until it has seen Stop.
struct FakeBoard {
    addr: SocketAddr,
    stats: Arc<BoardStats>,
    handle: JoinHandle<()>,
}

impl FakeBoard {
    fn spawn(wait_polls: u32) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(100)))
            .unwrap();
        let addr = socket.local_addr().unwrap();
        let stats = Arc::new(BoardStats::default());

        let thread_stats = Arc::clone(&stats);
        let handle = thread::spawn(move || {
            let mut waits_left = wait_polls;
            let mut counter: u16 = 0;
            let deadline = Instant::now() + Duration::from_secs(10);
            let mut buf = [0u8; 16];

            while Instant::now() < deadline {
                let (len, source) = match socket.recv_from(&mut buf) {
                    Ok(received) => received,
                    Err(_) => continue,
                };
                let reply: Vec<u8> = match buf[..len][0] {
                    0x80 => {
                        let substate = if waits_left > 0 {
                            waits_left -= 1;
                            0x02
                        } else {
                            0x03
                        };
                        vec![0, 0, 0, 0, substate, 0]
                    }
                    0xB4 | 0xA0 => vec![0, 0],
                    0xB0 => {
                        thread_stats.boots.fetch_add(1, Ordering::SeqCst);
                        vec![0u8; FRAME_LEN]
                    }
                    0xF0 => {
                        thread_stats.starts.fetch_add(1, Ordering::SeqCst);
                        vec![0, 0]
                    }
                    0xE0 => {
                        counter = counter.wrapping_add(1);
                        data_frame(counter)
                    }
                    0xA2 => vec![0, 0, 1, 2, 3, 4, 5, 6],
                    0xB2 => {
                        thread_stats.stops.fetch_add(1, Ordering::SeqCst);
                        socket.send_to(&[0, 0], source).unwrap();
                        return;
                    }
                    _ => vec![0, 0],
                };
                socket.send_to(&reply, source).unwrap();
            }
        });

        Self {
            addr,
            stats,
            handle,
        }
    }

    fn config(&self) -> Config {
        Config {
            dest_ip: self.addr.ip(),
            dest_port: self.addr.port(),
            // Ephemeral source port so parallel tests never collide.
            src_port: 0,
            sensors: vec![1, 2],
            recv_timeout_ms: 500,
            measure_max: 0,
        }
    }

    fn join(self) -> Arc<BoardStats> {
        self.handle.join().unwrap();
        self.stats
    }
}

/// A frame carrying 1.5 N on sensor 0 Fx and 2 N-m on sensor 1 Tz.
fn data_frame(counter: u16) -> Vec<u8> {
    let mut frame = vec![0u8; FRAME_LEN];
    frame[4..6].copy_from_slice(&counter.to_be_bytes());
    frame[6..10].copy_from_slice(&6000u32.to_be_bytes());
    // Sensor 0 Fx at byte 10: 1500 mN.
    frame[10..13].copy_from_slice(&[0x00, 0x05, 0xDC]);
    // Sensor 1 Tz at byte 18*1 + 5*3 + 10 = 43: 200000 uN-m.
    frame[43..46].copy_from_slice(&[0x03, 0x0D, 0x40]);
    frame
}

#[test]
fn full_lifecycle_over_udp() {
    let board = FakeBoard::spawn(2);
    let config = board.config();

    let mut controller = Mms101Controller::connect(&config).unwrap();
    assert_eq!(controller.state(), DeviceState::Ready);
    assert_eq!(controller.n_sensors(), 2);

    let version = controller.version().unwrap();
    assert_eq!(version.len(), 8);

    controller.start_streaming().unwrap();
    let mut last_counter = 0;
    for _ in 0..5 {
        let m = controller.read_cycle().unwrap();
        assert!(m.counter > last_counter);
        last_counter = m.counter;
        assert_eq!(m.interval_us, 6000);
        assert_eq!(m.readings.len(), 2);
        assert!((m.readings[0].fx - 1.5).abs() < 1e-9);
        assert!((m.readings[1].tz - 2.0).abs() < 1e-9);
    }

    controller.shutdown().unwrap();

    let stats = board.join();
    assert_eq!(stats.boots.load(Ordering::SeqCst), 1);
    assert_eq!(stats.starts.load(Ordering::SeqCst), 1);
    assert_eq!(stats.stops.load(Ordering::SeqCst), 1);
}

#[test]
fn drop_without_shutdown_still_stops_board() {
    let board = FakeBoard::spawn(0);
    let config = board.config();

    {
        let mut controller = Mms101Controller::connect(&config).unwrap();
        controller.start_streaming().unwrap();
        controller.read_cycle().unwrap();
        // Scope exit without an explicit shutdown.
    }

    let stats = board.join();
    assert_eq!(stats.stops.load(Ordering::SeqCst), 1);
}
