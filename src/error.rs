//! Error taxonomy for the driver.
//!
//! Transient per-cycle faults ([`Error::Protocol`]) are absorbed by the
//! streaming loop so a single dropped datagram never stalls acquisition.
//! Structural faults ([`Error::InitTimeout`], [`Error::Argument`]) propagate
//! to the caller and should terminate the process with a non-zero outcome.

use std::time::Duration;

use thiserror::Error;

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the driver.
#[derive(Error, Debug)]
pub enum Error {
    /// Send/receive failure at the socket layer.
    ///
    /// Non-fatal during steady streaming (the cycle is skipped); fatal if it
    /// persists through the initialization deadline.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Response length or status-byte mismatch for a command.
    ///
    /// Carries the command name and the raw bytes observed, which are empty
    /// when the receive timed out. Logged and absorbed during streaming.
    #[error("{command}: unexpected response ({} bytes: {})", response.len(), hex::encode(response))]
    Protocol {
        /// Name of the command whose response was rejected.
        command: &'static str,
        /// Raw bytes received, possibly empty on timeout.
        response: Vec<u8>,
    },

    /// The device never reached the READY substate within the bounded
    /// initialization deadline. Fatal; never retried further.
    #[error("device not READY within {0:?}")]
    InitTimeout(Duration),

    /// Programming-contract violation: a frame of the wrong length handed to
    /// the decoder, or a configuration the frame layout cannot support.
    #[error("invalid argument: {0}")]
    Argument(String),
}

impl Error {
    /// Shorthand for a [`Error::Protocol`] carrying the observed bytes.
    pub fn protocol(command: &'static str, response: &[u8]) -> Self {
        Error::Protocol {
            command,
            response: response.to_vec(),
        }
    }
}
