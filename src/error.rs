//! Error types for slot-file IPC
//!
//! Transport failures are almost always recoverable: the polling layer
//! treats a failed read as a transient condition and retries under the same
//! budget as a failed predicate check. The only fatal transport error is
//! failing to open the slot file at startup, which both binaries surface as
//! a non-zero exit.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while driving the slot protocol
#[derive(Debug, Error)]
pub enum IpcError {
    /// Seek/read/write/flush failure on the slot file
    #[error("slot file I/O error: {0}")]
    Transport(#[from] io::Error),

    /// The slot file held fewer bytes than one record (but more than zero)
    #[error("short read on slot file: {got} of {expected} bytes")]
    ShortRead { got: usize, expected: usize },

    /// The status word held a value outside the protocol's three states
    #[error("corrupt slot record: unknown status {0}")]
    CorruptRecord(u32),

    /// The slot never went FREE within the sender's attempt budget
    #[error("server busy: slot not free after {attempts} attempts")]
    Busy { attempts: u32 },

    /// No response observed within the wait budget
    #[error("timed out after {0:?} waiting for a response")]
    Timeout(Duration),

    /// A shutdown request interrupted the operation
    #[error("cancelled by shutdown request")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, IpcError>;
