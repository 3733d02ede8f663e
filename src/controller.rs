//! Device state machine and measurement loop.
//!
//! The controller owns the transport and drives the board through its
//! lifecycle: Reset → Select → Boot, a bounded poll until the READY
//! substate, then Start once and a caller-paced Data cycle. Commands are
//! strictly serialized; at most one request is in flight at any time.
//!
//! Teardown is a scoped-resource discipline: `Drop` issues Stop before the
//! transport is released, on every exit path including unwinding. Call
//! [`Mms101Controller::shutdown`] instead when the Stop ack matters.
//!
//! # Example
//!
//! ```no_run
//! use mms101::{Config, Mms101Controller};
//!
//! # fn example() -> mms101::Result<()> {
//! let config = Config::default();
//! let mut controller = Mms101Controller::connect(&config)?;
//! controller.start_streaming()?;
//! for _ in 0..100 {
//!     let measurement = controller.read_cycle()?;
//!     println!("{:?}", measurement.readings);
//! }
//! controller.shutdown()?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use log::{debug, info, warn};

use crate::calibration::ZeroOffset;
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame::{MeasurementFrame, SensorReading, MAX_SENSORS};
use crate::protocol::{self, Command, PROTOCOL_SPI};
use crate::transport::{Transport, UdpTransport};

/// Wall-clock budget for the whole initialization sequence.
pub const INIT_DEADLINE: Duration = Duration::from_secs(5);

/// Backoff between Status polls while the device boots.
const STATUS_POLL_BACKOFF: Duration = Duration::from_millis(10);

/// Status substate: coefficients loaded, device ready to measure.
const SUBSTATE_READY: u8 = 0x03;
/// Status substate: still booting, keep polling.
const SUBSTATE_WAIT: u8 = 0x02;

/// Lifecycle state of one controller instance. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceState {
    Uninitialized,
    Resetting,
    Selecting,
    Booting,
    AwaitingReady,
    Ready,
    Streaming,
    Faulted,
}

/// One measurement cycle's output: the offset-corrected readings plus the
/// frame metadata consumers log alongside them.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Corrected readings, one per configured sensor.
    pub readings: Vec<SensorReading>,
    /// Measurement status word from the frame header.
    pub status: u16,
    /// Device-side update counter.
    pub counter: u16,
    /// Microseconds since the previous frame.
    pub interval_us: u32,
}

impl Measurement {
    /// Zero-filled result for a missed or invalid cycle.
    pub fn zeroed(n_sensors: usize) -> Self {
        Self {
            readings: vec![SensorReading::default(); n_sensors],
            status: 0,
            counter: 0,
            interval_us: 0,
        }
    }
}

/// Driver for one MMS101 evaluation board.
pub struct Mms101Controller<T: Transport, C: Clock> {
    transport: T,
    clock: C,
    state: DeviceState,
    sensor_mask: u8,
    n_sensors: usize,
    calibration: ZeroOffset,
    stopped: bool,
}

impl Mms101Controller<UdpTransport, SystemClock> {
    /// Bind a UDP transport per the config and run device initialization.
    ///
    /// Returns once the board reports READY, or fails with
    /// [`Error::InitTimeout`] after the 5-second budget.
    pub fn connect(config: &Config) -> Result<Self> {
        config.validate()?;
        let transport = UdpTransport::bind(
            config.src_port,
            config.device_addr(),
            config.recv_timeout(),
        )?;
        info!(
            "connecting to board at {} from {}",
            config.device_addr(),
            transport.local_addr()?
        );
        Self::with_parts(
            transport,
            SystemClock,
            config.sensor_mask(),
            config.n_sensors(),
        )
    }
}

impl<T: Transport, C: Clock> Mms101Controller<T, C> {
    /// Build a controller over an arbitrary transport and clock, then run
    /// device initialization. This is the seam the tests drive.
    pub fn with_parts(transport: T, clock: C, sensor_mask: u8, n_sensors: usize) -> Result<Self> {
        if n_sensors == 0 || n_sensors > MAX_SENSORS {
            return Err(Error::Argument(format!(
                "sensor count {n_sensors} outside 1..={MAX_SENSORS}"
            )));
        }
        if sensor_mask == 0 {
            return Err(Error::Argument("empty sensor bitmask".into()));
        }
        let mut controller = Self {
            transport,
            clock,
            state: DeviceState::Uninitialized,
            sensor_mask,
            n_sensors,
            calibration: ZeroOffset::new(n_sensors),
            stopped: false,
        };
        controller.initialize()?;
        Ok(controller)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DeviceState {
        self.state
    }

    /// Number of configured sensors.
    pub fn n_sensors(&self) -> usize {
        self.n_sensors
    }

    /// The calibration engine's committed offset matrix.
    pub fn offset(&self) -> &[[f64; 6]] {
        self.calibration.offset()
    }

    /// Whether the last cycle's contact heuristic fired.
    pub fn contact(&self) -> bool {
        self.calibration.contact()
    }

    /// One strictly serialized request/response exchange.
    fn exchange(&mut self, command: Command) -> Result<Vec<u8>> {
        self.transport.send(&command.encode())?;
        // Receive room beyond the largest expected frame, so an over-length
        // reply fails validation instead of being silently truncated.
        let mut buf = [0u8; protocol::MAX_RESPONSE_LEN + 32];
        let response = match self.transport.recv(&mut buf)? {
            Some(len) => buf[..len].to_vec(),
            None => Vec::new(),
        };
        debug!("{} -> {}", command.name(), hex::encode(&response));
        protocol::validate_response(command, &response)?;
        Ok(response)
    }

    /// Issue a command whose ack may be dropped by the network. A rejected
    /// or missing response is logged and tolerated; whether the device
    /// actually progressed is decided by the Status poll.
    fn exchange_lenient(&mut self, command: Command) -> Result<()> {
        match self.exchange(command) {
            Ok(_) => Ok(()),
            Err(e @ Error::Protocol { .. }) => {
                debug!("ignoring dropped ack: {e}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Reset → Select → Boot.
    fn boot_sequence(&mut self) -> Result<()> {
        self.state = DeviceState::Resetting;
        self.exchange_lenient(Command::Reset)?;
        self.state = DeviceState::Selecting;
        self.exchange_lenient(Command::Select {
            protocol: PROTOCOL_SPI,
            sensor_mask: self.sensor_mask,
        })?;
        self.state = DeviceState::Booting;
        self.exchange_lenient(Command::Boot)?;
        Ok(())
    }

    /// Drive the board to READY within [`INIT_DEADLINE`].
    ///
    /// A fault substate restarts the boot sequence; transport hiccups are
    /// retried with backoff. Only the deadline makes a failure fatal.
    fn initialize(&mut self) -> Result<()> {
        let deadline = self.clock.now() + INIT_DEADLINE;
        let mut need_boot = true;

        while self.clock.now() < deadline {
            if need_boot {
                if let Err(e) = self.boot_sequence() {
                    warn!("boot sequence failed: {e}");
                    self.clock.sleep(STATUS_POLL_BACKOFF);
                    continue;
                }
                need_boot = false;
                self.state = DeviceState::AwaitingReady;
            }

            let substate = match self.exchange(Command::Status) {
                Ok(status) => status[4],
                Err(e) => {
                    debug!("status poll failed: {e}");
                    self.clock.sleep(STATUS_POLL_BACKOFF);
                    continue;
                }
            };

            match substate {
                SUBSTATE_READY => {
                    info!("device READY");
                    self.state = DeviceState::Ready;
                    return Ok(());
                }
                SUBSTATE_WAIT => self.clock.sleep(STATUS_POLL_BACKOFF),
                other => {
                    warn!("device fault substate {other:#04x}, re-running boot sequence");
                    self.state = DeviceState::Faulted;
                    need_boot = true;
                    self.clock.sleep(STATUS_POLL_BACKOFF);
                }
            }
        }

        self.state = DeviceState::Faulted;
        Err(Error::InitTimeout(INIT_DEADLINE))
    }

    /// Issue Start and enter the streaming state. Start is sent exactly
    /// once; calling this again while streaming is an error.
    pub fn start_streaming(&mut self) -> Result<()> {
        match self.state {
            DeviceState::Ready => {
                self.exchange_lenient(Command::Start)?;
                self.state = DeviceState::Streaming;
                Ok(())
            }
            other => Err(Error::Argument(format!(
                "cannot start streaming from {other:?}"
            ))),
        }
    }

    /// One measurement cycle: Data request → decode → calibrate.
    ///
    /// A dropped, short, or garbled frame yields a zero-filled measurement
    /// and a warning; the acquisition loop never stalls on one bad datagram.
    pub fn read_cycle(&mut self) -> Result<Measurement> {
        if self.state != DeviceState::Streaming {
            return Err(Error::Argument(format!(
                "read_cycle in state {:?}; call start_streaming first",
                self.state
            )));
        }

        let raw = match self.exchange(Command::Data) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("measurement cycle dropped: {e}");
                return Ok(Measurement::zeroed(self.n_sensors));
            }
        };

        let frame = MeasurementFrame::decode(&raw, self.n_sensors)?;
        let readings = self.calibration.apply(&frame.readings, frame.interval_us);
        Ok(Measurement {
            readings,
            status: frame.status,
            counter: frame.counter,
            interval_us: frame.interval_us,
        })
    }

    /// Query the firmware version (raw 8-byte response).
    pub fn version(&mut self) -> Result<Vec<u8>> {
        self.exchange(Command::Version)
    }

    /// Restart a stopped measurement without re-running initialization.
    pub fn restart(&mut self) -> Result<()> {
        self.exchange(Command::Restart)?;
        self.state = DeviceState::Streaming;
        Ok(())
    }

    /// Stop the measurement and consume the controller.
    ///
    /// `Drop` covers abnormal exits; use this on the normal path to observe
    /// a Stop failure instead of having it swallowed.
    pub fn shutdown(mut self) -> Result<()> {
        self.stop_device()
    }

    fn stop_device(&mut self) -> Result<()> {
        if self.stopped {
            return Ok(());
        }
        // Mark first so Drop never double-sends on an ack failure.
        self.stopped = true;
        self.state = DeviceState::Uninitialized;
        self.exchange(Command::Stop).map(|_| ())
    }
}

impl<T: Transport, C: Clock> Drop for Mms101Controller<T, C> {
    fn drop(&mut self) {
        if !self.stopped {
            if let Err(e) = self.stop_device() {
                warn!("stop on teardown failed: {e}");
            }
        }
    }
}
