//! Fixed-layout message record
//!
//! Wire format, persisted at offset 0 of the slot file:
//!
//! ```text
//! ┌──────────────┬──────────────┬─────────────────────────┐
//! │    status    │  client_id   │        payload          │
//! │  (4 bytes)   │  (4 bytes)   │  (256 bytes, NUL-term)  │
//! └──────────────┴──────────────┴─────────────────────────┘
//! ```
//!
//! Integers are little-endian. The payload carries NUL-terminated text;
//! bytes beyond the terminator are always zeroed on construction so a
//! reader can never observe stale content from a previous exchange.

use crate::error::{IpcError, Result};
use std::fmt;

/// Payload capacity in bytes (one reserved for the NUL terminator)
pub const PAYLOAD_SIZE: usize = 256;

/// Total record size: status + client_id + payload
pub const RECORD_SIZE: usize = 8 + PAYLOAD_SIZE;

/// The three-valued tag that arbitrates which side may act next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum Status {
    /// No outstanding work; a client may claim the slot
    Free = 0,
    /// A client has written a request; the server may consume it
    Pending = 1,
    /// The server has written a response; the requesting client may consume it
    Ready = 2,
}

impl Status {
    fn from_u32(raw: u32) -> Result<Self> {
        match raw {
            0 => Ok(Status::Free),
            1 => Ok(Status::Pending),
            2 => Ok(Status::Ready),
            other => Err(IpcError::CorruptRecord(other)),
        }
    }
}

/// One in-flight message; the slot holds exactly one at any instant
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Message {
    pub status: Status,
    pub client_id: u32,
    payload: [u8; PAYLOAD_SIZE],
}

impl Message {
    /// Build a record carrying `text`, truncated to the payload capacity.
    /// The remainder of the buffer is zeroed.
    pub fn with_text(status: Status, client_id: u32, text: &str) -> Self {
        let mut payload = [0u8; PAYLOAD_SIZE];
        let bytes = text.as_bytes();
        let len = bytes.len().min(PAYLOAD_SIZE - 1);
        payload[..len].copy_from_slice(&bytes[..len]);
        Self {
            status,
            client_id,
            payload,
        }
    }

    /// A FREE record with a cleared payload, releasing the slot
    pub fn free(client_id: u32) -> Self {
        Self::with_text(Status::Free, client_id, "")
    }

    /// The all-zero record an empty slot file decodes to
    pub fn zeroed() -> Self {
        Self::free(0)
    }

    /// Payload text up to the first NUL (lossy on invalid UTF-8)
    pub fn text(&self) -> String {
        let end = self
            .payload
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(PAYLOAD_SIZE);
        String::from_utf8_lossy(&self.payload[..end]).into_owned()
    }

    pub fn encode(&self) -> [u8; RECORD_SIZE] {
        let mut buf = [0u8; RECORD_SIZE];
        buf[0..4].copy_from_slice(&(self.status as u32).to_le_bytes());
        buf[4..8].copy_from_slice(&self.client_id.to_le_bytes());
        buf[8..].copy_from_slice(&self.payload);
        buf
    }

    pub fn decode(buf: &[u8; RECORD_SIZE]) -> Result<Self> {
        let status = Status::from_u32(read_u32(&buf[0..4]))?;
        let client_id = read_u32(&buf[4..8]);
        let mut payload = [0u8; PAYLOAD_SIZE];
        payload.copy_from_slice(&buf[8..]);
        Ok(Self {
            status,
            client_id,
            payload,
        })
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(bytes);
    u32::from_le_bytes(word)
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("status", &self.status)
            .field("client_id", &self.client_id)
            .field("payload", &self.text())
            .finish()
    }
}
