// Library interface for fipc
// This allows integration tests to drive the server and client in-process

pub mod cancel;
pub mod client;
pub mod discovery;
pub mod error;
pub mod log;
pub mod poll;
pub mod router;
pub mod server;
pub mod signal;
pub mod slot;

pub use error::{IpcError, Result};
