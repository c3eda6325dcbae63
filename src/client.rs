//! Client side of the slot protocol
//!
//! A connection pairs an open slot-file handle with the locally remembered
//! identity (0 until the server assigns one in a READY response). Each
//! exchange is driven sequentially: wait for FREE, write PENDING, wait for
//! READY, release with FREE. A response that never arrives is recovered by
//! unilaterally resetting the slot to FREE, since the server has no
//! liveness signal toward the client.

use crate::cancel::CancelToken;
use crate::error::{IpcError, Result};
use crate::poll::{wait_until, PollBudget, WaitOutcome};
use crate::slot::{Message, SlotFile, Status};
use std::path::Path;
use std::time::Duration;

/// Timing budgets for one exchange
#[derive(Debug, Clone, Copy)]
pub struct ClientConfig {
    /// Interval between polls while awaiting a FREE slot
    pub free_poll_interval: Duration,
    /// Attempt budget for the FREE wait; exhausting it means "server busy"
    pub max_free_attempts: u32,
    /// Interval between polls while awaiting READY
    pub ready_poll_interval: Duration,
    /// Wall-clock budget for the READY wait; exhausting it triggers the
    /// timeout-recovery reset
    pub ready_timeout: Duration,
    /// Interval between polls during a liveness probe
    pub probe_poll_interval: Duration,
    /// Wall-clock budget for a liveness probe
    pub probe_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            free_poll_interval: Duration::from_millis(100),
            max_free_attempts: 5,
            ready_poll_interval: Duration::from_millis(100),
            ready_timeout: Duration::from_secs(5),
            probe_poll_interval: Duration::from_millis(50),
            probe_timeout: Duration::from_millis(500),
        }
    }
}

/// A successful response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerReply {
    Text(String),
    /// READY arrived with an empty payload; "no content", not an error
    NoContent,
}

/// An open connection to one server slot file
#[derive(Debug)]
pub struct Connection {
    slot: SlotFile,
    client_id: u32,
    config: ClientConfig,
    cancel: CancelToken,
}

impl Connection {
    pub fn open(path: &Path, config: ClientConfig, cancel: CancelToken) -> Result<Self> {
        let slot = SlotFile::open(path)?;
        Ok(Self {
            slot,
            client_id: 0,
            config,
            cancel,
        })
    }

    pub fn path(&self) -> &Path {
        self.slot.path()
    }

    /// The identity assigned by the server, or 0 before first contact
    pub fn client_id(&self) -> u32 {
        self.client_id
    }

    /// Run one full exchange for `body`.
    ///
    /// The first READY carrying a non-zero client id is adopted as this
    /// connection's identity; it stays sticky until the connection closes.
    pub fn send(&mut self, body: &str) -> Result<ServerReply> {
        match wait_until(
            &mut self.slot,
            |m| m.status == Status::Free,
            self.config.free_poll_interval,
            PollBudget::Attempts(self.config.max_free_attempts),
            &self.cancel,
        ) {
            WaitOutcome::Satisfied(_) => {}
            WaitOutcome::TimedOut => {
                return Err(IpcError::Busy {
                    attempts: self.config.max_free_attempts,
                })
            }
            WaitOutcome::Cancelled => return Err(IpcError::Cancelled),
        }

        self.slot
            .write(&Message::with_text(Status::Pending, self.client_id, body))?;

        match wait_until(
            &mut self.slot,
            |m| m.status == Status::Ready,
            self.config.ready_poll_interval,
            PollBudget::Duration(self.config.ready_timeout),
            &self.cancel,
        ) {
            WaitOutcome::Satisfied(reply) => {
                if reply.client_id > 0 && self.client_id == 0 {
                    self.client_id = reply.client_id;
                }
                let text = reply.text();
                self.slot.write(&Message::free(self.client_id))?;
                if text.is_empty() {
                    Ok(ServerReply::NoContent)
                } else {
                    Ok(ServerReply::Text(text))
                }
            }
            WaitOutcome::TimedOut => {
                // Recovery: don't leave the slot PENDING forever
                self.slot.write(&Message::free(self.client_id))?;
                Err(IpcError::Timeout(self.config.ready_timeout))
            }
            WaitOutcome::Cancelled => {
                self.slot.write(&Message::free(self.client_id))?;
                Err(IpcError::Cancelled)
            }
        }
    }

    /// Short-budget liveness check: only attempted when the slot is
    /// currently FREE, via a throwaway ping exchange that releases the slot
    /// afterwards.
    pub fn probe_alive(&mut self) -> bool {
        let msg = match self.slot.read() {
            Ok(msg) => msg,
            Err(_) => return false,
        };
        if msg.status != Status::Free {
            return false;
        }
        if self
            .slot
            .write(&Message::with_text(Status::Pending, self.client_id, "ping"))
            .is_err()
        {
            return false;
        }
        match wait_until(
            &mut self.slot,
            |m| m.status == Status::Ready,
            self.config.probe_poll_interval,
            PollBudget::Duration(self.config.probe_timeout),
            &self.cancel,
        ) {
            WaitOutcome::Satisfied(_) => {
                let _ = self.slot.write(&Message::free(self.client_id));
                true
            }
            _ => false,
        }
    }

    /// Release the slot, echoing this connection's identity, and close.
    pub fn close(mut self) -> Result<()> {
        self.slot.write(&Message::free(self.client_id))
    }
}
