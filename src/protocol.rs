//! Wire-level command codec for the evaluation board.
//!
//! The board speaks a minimal request/response protocol over UDP: every
//! command is a single opcode byte, optionally followed by parameter bytes
//! (only Select carries any), and every response has a fixed length known
//! ahead of time. There is no framing beyond the datagram boundary itself.
//!
//! # Command Table
//!
//! | Command | Opcode | Params                      | Response |
//! |---------|--------|-----------------------------|----------|
//! | Status  | 0x80   | —                           | 6 bytes  |
//! | Reset   | 0xB4   | —                           | 2 bytes  |
//! | Select  | 0xA0   | protocol id, sensor bitmask | 2 bytes  |
//! | Boot    | 0xB0   | —                           | 100 bytes|
//! | Start   | 0xF0   | —                           | 2 bytes  |
//! | Stop    | 0xB2   | —                           | 2 bytes  |
//! | Restart | 0xC0   | —                           | 2 bytes  |
//! | Data    | 0xE0   | —                           | 100 bytes|
//! | Version | 0xA2   | —                           | 8 bytes  |
//!
//! A response is accepted iff its length matches the table and, for
//! length-≥2 frames other than Status, the first two bytes are zero. Status
//! acceptance is instead governed by its substate byte (index 4), which the
//! device state machine consumes directly.

use crate::error::{Error, Result};

/// UDP port the evaluation board listens on.
pub const DEVICE_PORT: u16 = 1366;

/// Default host-side source port. Binding a fixed source port means device
/// replies target a known host port.
pub const DEFAULT_SOURCE_PORT: u16 = 2000;

/// Protocol identifier for the on-board SPI sensor bus, sent with Select.
pub const PROTOCOL_SPI: u8 = 0x01;

/// Largest response the board ever sends (Boot and Data frames).
pub const MAX_RESPONSE_LEN: usize = 100;

/// A command frame: an opcode plus zero to two parameter bytes.
///
/// Constructed per call and encoded with [`Command::encode`]; the expected
/// response shape comes from [`Command::response_len`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Query boot/measurement status; byte 4 of the reply is the substate.
    Status,
    /// Reset the measurement controller.
    Reset,
    /// Select the sensor bus protocol and the active sensor bitmask.
    Select {
        /// Bus protocol identifier ([`PROTOCOL_SPI`]).
        protocol: u8,
        /// Bit-per-sensor selection value (bit 0 = sensor slot 1).
        sensor_mask: u8,
    },
    /// Load sensor coefficients; the board replies with a 100-byte frame.
    Boot,
    /// Begin a measurement.
    Start,
    /// Stop measuring.
    Stop,
    /// Restart after a Stop.
    Restart,
    /// Fetch one measurement frame.
    Data,
    /// Query firmware version (8-byte reply).
    Version,
}

impl Command {
    /// The opcode byte for this command.
    pub fn opcode(&self) -> u8 {
        match self {
            Command::Status => 0x80,
            Command::Reset => 0xB4,
            Command::Select { .. } => 0xA0,
            Command::Boot => 0xB0,
            Command::Start => 0xF0,
            Command::Stop => 0xB2,
            Command::Restart => 0xC0,
            Command::Data => 0xE0,
            Command::Version => 0xA2,
        }
    }

    /// Command name for diagnostics and error reports.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Status => "Status",
            Command::Reset => "Reset",
            Command::Select { .. } => "Select",
            Command::Boot => "Boot",
            Command::Start => "Start",
            Command::Stop => "Stop",
            Command::Restart => "Restart",
            Command::Data => "Data",
            Command::Version => "Version",
        }
    }

    /// Exact response length the board sends for this command.
    pub fn response_len(&self) -> usize {
        match self {
            Command::Status => 6,
            Command::Reset
            | Command::Select { .. }
            | Command::Start
            | Command::Stop
            | Command::Restart => 2,
            Command::Boot | Command::Data => 100,
            Command::Version => 8,
        }
    }

    /// Encode the command into its wire bytes.
    pub fn encode(&self) -> Vec<u8> {
        match *self {
            Command::Select {
                protocol,
                sensor_mask,
            } => vec![self.opcode(), protocol, sensor_mask],
            _ => vec![self.opcode()],
        }
    }
}

/// Validate a raw response against the command's expected shape.
///
/// Returns [`Error::Protocol`] on a length mismatch (including an empty
/// timeout read) or on non-zero leading status bytes where those apply.
pub fn validate_response(command: Command, response: &[u8]) -> Result<()> {
    if response.len() != command.response_len() {
        return Err(Error::protocol(command.name(), response));
    }
    // Status frames are judged by their substate byte, not the leading pair.
    if !matches!(command, Command::Status) && (response[0] != 0 || response[1] != 0) {
        return Err(Error::protocol(command.name(), response));
    }
    Ok(())
}

/// Build a Select bitmask from 1-based sensor slot numbers.
///
/// Slot `n` maps to bit `n - 1`, so slots `[1, 3]` yield `0b0000_0101`.
/// Slots outside `1..=5` are ignored, matching the board's five sockets.
pub fn sensor_mask(slots: &[u8]) -> u8 {
    slots
        .iter()
        .filter(|&&s| (1..=5).contains(&s))
        .fold(0, |mask, &s| mask | (1 << (s - 1)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_table() {
        assert_eq!(Command::Status.opcode(), 0x80);
        assert_eq!(Command::Reset.opcode(), 0xB4);
        assert_eq!(Command::Boot.opcode(), 0xB0);
        assert_eq!(Command::Start.opcode(), 0xF0);
        assert_eq!(Command::Stop.opcode(), 0xB2);
        assert_eq!(Command::Restart.opcode(), 0xC0);
        assert_eq!(Command::Data.opcode(), 0xE0);
        assert_eq!(Command::Version.opcode(), 0xA2);
    }

    #[test]
    fn response_lengths() {
        assert_eq!(Command::Status.response_len(), 6);
        assert_eq!(Command::Reset.response_len(), 2);
        assert_eq!(Command::Boot.response_len(), 100);
        assert_eq!(Command::Data.response_len(), 100);
        assert_eq!(Command::Version.response_len(), 8);
    }

    #[test]
    fn select_encodes_params() {
        let cmd = Command::Select {
            protocol: PROTOCOL_SPI,
            sensor_mask: 0x05,
        };
        assert_eq!(cmd.encode(), vec![0xA0, 0x01, 0x05]);
        assert_eq!(cmd.response_len(), 2);
    }

    #[test]
    fn single_byte_commands() {
        assert_eq!(Command::Data.encode(), vec![0xE0]);
        assert_eq!(Command::Status.encode(), vec![0x80]);
    }

    #[test]
    fn validate_accepts_clean_ack() {
        assert!(validate_response(Command::Reset, &[0x00, 0x00]).is_ok());
    }

    #[test]
    fn validate_rejects_length_mismatch() {
        // One byte short of the expected 6 — degraded Status frame.
        let err = validate_response(Command::Status, &[0, 0, 0, 0, 0x03]).unwrap_err();
        match err {
            crate::error::Error::Protocol { command, response } => {
                assert_eq!(command, "Status");
                assert_eq!(response.len(), 5);
            }
            other => panic!("expected Protocol error, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_empty_timeout_read() {
        assert!(validate_response(Command::Data, &[]).is_err());
    }

    #[test]
    fn validate_rejects_nonzero_status_bytes() {
        assert!(validate_response(Command::Reset, &[0x01, 0x00]).is_err());
        let mut frame = [0u8; 100];
        frame[1] = 0xFF;
        assert!(validate_response(Command::Data, &frame).is_err());
    }

    #[test]
    fn validate_status_ignores_substate_bytes() {
        // Status frames carry the substate at index 4; the leading pair is
        // not checked by the codec.
        assert!(validate_response(Command::Status, &[0, 0, 0, 0, 0x02, 0]).is_ok());
        assert!(validate_response(Command::Status, &[0x12, 0x34, 0, 0, 0x03, 0]).is_ok());
    }

    #[test]
    fn sensor_mask_from_slots() {
        assert_eq!(sensor_mask(&[1]), 0x01);
        assert_eq!(sensor_mask(&[1, 2, 3, 4, 5]), 0x1F);
        assert_eq!(sensor_mask(&[2, 4]), 0x0A);
        assert_eq!(sensor_mask(&[0, 6, 9]), 0x00);
    }
}
