//! Server side of the slot protocol
//!
//! One server process owns one slot file and drives the PENDING → READY leg
//! of the handshake: wait for a request, screen it, settle the client's
//! identity, compute a response, write it back. Requests are handled one at
//! a time by construction; the identity registry still sits behind a mutex
//! scoped to its read-modify-write.
//!
//! - `registry`: identity assignment and the connected set
//! - `handler`: the validation/response seam, plus the ping handler

pub mod handler;
pub mod registry;

pub use handler::{ParsedRequest, PingHandler, Reply, RequestHandler};
pub use registry::{ClientRegistry, Observation};

use crate::cancel::CancelToken;
use crate::discovery::{SLOT_FILE_EXT, SLOT_FILE_PREFIX};
use crate::error::{IpcError, Result};
use crate::log::log_event;
use crate::poll::{wait_until, PollBudget, WaitOutcome};
use crate::slot::{Message, SlotFile, Status};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Payload text of the final record written at clean shutdown
pub const SHUTDOWN_MARKER: &str = "SERVER_SHUTDOWN";

/// What happens to the slot file at clean shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// Unlink the slot file (multi-server variant)
    RemoveFile,
    /// Leave the file in place, marked FREE (single-file variant)
    MarkFree,
}

/// Timing and shutdown policy for the server loop
#[derive(Debug, Clone, Copy)]
pub struct ServerConfig {
    /// Interval between polls while awaiting a request
    pub poll_interval: Duration,
    /// Pause after writing a response before polling again
    pub post_reply_pause: Duration,
    pub cleanup: CleanupPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            post_reply_pause: Duration::from_millis(50),
            cleanup: CleanupPolicy::RemoveFile,
        }
    }
}

/// A running server instance bound to one slot file
pub struct Server<H: RequestHandler> {
    slot: SlotFile,
    instance: u32,
    handler: H,
    registry: Mutex<ClientRegistry>,
    config: ServerConfig,
    cancel: CancelToken,
}

impl Server<PingHandler> {
    /// Multi-server variant: claim the next instance number in `dir` and
    /// create the matching slot file, serving `ping` requests.
    pub fn bind(dir: &Path, config: ServerConfig, cancel: CancelToken) -> Result<Self> {
        let instance = crate::discovery::highest_instance(dir)? + 1;
        let path = dir.join(format!("{}{}{}", SLOT_FILE_PREFIX, instance, SLOT_FILE_EXT));
        log_event(&format!(
            "server: starting server #{} with file: {}",
            instance,
            path.display()
        ));
        let slot = create_or_open(&path)?;
        Ok(Self {
            slot,
            instance,
            handler: PingHandler::new(instance),
            registry: Mutex::new(ClientRegistry::new()),
            config,
            cancel,
        })
    }
}

impl<H: RequestHandler> Server<H> {
    /// Single-file variant: serve `handler` on a fixed slot file path.
    pub fn attach(
        path: &Path,
        handler: H,
        config: ServerConfig,
        cancel: CancelToken,
    ) -> Result<Self> {
        let slot = create_or_open(path)?;
        Ok(Self {
            slot,
            instance: 0,
            handler,
            registry: Mutex::new(ClientRegistry::new()),
            config,
            cancel,
        })
    }

    pub fn slot_path(&self) -> &Path {
        self.slot.path()
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    /// Number of distinct client identities seen so far
    pub fn connected_clients(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .connected()
    }

    /// Serve requests until the cancellation token trips, then write the
    /// shutdown marker and clean up per the configured policy.
    pub fn run(&mut self) -> Result<()> {
        log_event(&format!(
            "server: listening on {}",
            self.slot.path().display()
        ));

        loop {
            let msg = match wait_until(
                &mut self.slot,
                |m| m.status == Status::Pending,
                self.config.poll_interval,
                PollBudget::Unbounded,
                &self.cancel,
            ) {
                WaitOutcome::Satisfied(msg) => msg,
                _ => break,
            };

            let raw = msg.text();
            let request = match self.handler.validate(&raw) {
                Ok(request) => request,
                Err(error_text) => {
                    log_event(&format!(
                        "server: invalid message from client #{}: \"{}\"",
                        msg.client_id, raw
                    ));
                    // Identity preserved, counters untouched
                    if let Err(e) = self
                        .slot
                        .write(&Message::with_text(Status::Ready, msg.client_id, &error_text))
                    {
                        log_event(&format!("server: failed to write rejection: {}", e));
                    }
                    continue;
                }
            };

            let observation = {
                let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
                registry.observe(msg.client_id)
            };
            if observation.is_new {
                log_event(&format!(
                    "server: client #{} connected ({} total)",
                    observation.client_id, observation.total_connected
                ));
            }

            match self.handler.respond(observation.client_id, request) {
                Reply::Text(text) => {
                    if let Err(e) = self
                        .slot
                        .write(&Message::with_text(Status::Ready, observation.client_id, &text))
                    {
                        log_event(&format!("server: failed to write response: {}", e));
                        continue;
                    }
                    log_event(&format!(
                        "server: replied to client #{}",
                        observation.client_id
                    ));
                }
                Reply::Empty => {
                    if let Err(e) = self
                        .slot
                        .write(&Message::with_text(Status::Ready, observation.client_id, ""))
                    {
                        log_event(&format!("server: failed to write response: {}", e));
                        continue;
                    }
                }
                Reply::Silent => {
                    // Simulated crash: the slot stays PENDING until the
                    // requester times out and reclaims it.
                    match wait_until(
                        &mut self.slot,
                        |m| m.status != Status::Pending,
                        self.config.poll_interval,
                        PollBudget::Unbounded,
                        &self.cancel,
                    ) {
                        WaitOutcome::Cancelled => break,
                        _ => continue,
                    }
                }
            }

            std::thread::sleep(self.config.post_reply_pause);
        }

        self.shutdown();
        Ok(())
    }

    fn shutdown(&mut self) {
        log_event("server: shutting down");
        if let Err(e) = self
            .slot
            .write(&Message::with_text(Status::Free, 0, SHUTDOWN_MARKER))
        {
            log_event(&format!("server: failed to write shutdown marker: {}", e));
        }
        if self.config.cleanup == CleanupPolicy::RemoveFile {
            match self.slot.unlink() {
                Ok(()) => log_event(&format!(
                    "server: removed slot file: {}",
                    self.slot.path().display()
                )),
                Err(e) => log_event(&format!("server: failed to remove slot file: {}", e)),
            }
        }
        log_event(&format!(
            "server: stopped; unique clients served: {}",
            self.connected_clients()
        ));
    }
}

/// Create the slot file exclusively, falling back to an existing one, and
/// make sure it holds at least one record.
fn create_or_open(path: &Path) -> Result<SlotFile> {
    let mut slot = match SlotFile::create_exclusive(path) {
        Ok(slot) => slot,
        Err(IpcError::Transport(ref e)) if e.kind() == ErrorKind::AlreadyExists => {
            log_event("server: using existing slot file");
            SlotFile::open(path)?
        }
        Err(e) => return Err(e),
    };
    slot.ensure_initialized()?;
    Ok(slot)
}
