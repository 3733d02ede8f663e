//! Driver for the MMS101 6-axis force/torque sensor evaluation board.
//!
//! The board exposes up to five 6-axis sensors over a single-opcode UDP
//! protocol on port 1366. This crate drives one board end to end:
//!
//! - [`protocol`]: the command codec and response validation
//! - [`transport`]: a bounded-timeout UDP exchange behind a [`Transport`]
//!   trait seam
//! - [`frame`]: the 100-byte measurement frame decoder (24-bit big-endian
//!   axes, SI scaling)
//! - [`calibration`]: contact-aware online zero-offset estimation
//! - [`controller`]: the device state machine, from Reset through READY to
//!   the caller-paced Data cycle, with Stop guaranteed on teardown
//! - [`discovery`]: broadcast enumeration of boards on the local segments
//!
//! Typical use is [`Config`] → [`Mms101Controller::connect`] →
//! [`Mms101Controller::start_streaming`] → repeated
//! [`Mms101Controller::read_cycle`] → [`Mms101Controller::shutdown`].

pub mod calibration;
pub mod clock;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod transport;

pub use calibration::ZeroOffset;
pub use clock::{Clock, SystemClock};
pub use config::Config;
pub use controller::{DeviceState, Measurement, Mms101Controller};
pub use discovery::{discover, DiscoveryConfig};
pub use error::{Error, Result};
pub use frame::{MeasurementFrame, SensorReading};
pub use protocol::Command;
pub use transport::{Transport, UdpTransport};
