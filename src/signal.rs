//! Wires SIGINT and SIGTERM into a cancellation token

use crate::cancel::CancelToken;
use anyhow::Result;
use signal_hook::consts::{SIGINT, SIGTERM};

/// Register shutdown signals so they trip the given token.
///
/// Both the server and the client register the same pair; the signal only
/// sets a flag, and the polling loops notice it at the next boundary.
pub fn register_shutdown(token: &CancelToken) -> Result<()> {
    signal_hook::flag::register(SIGTERM, token.flag())?;
    signal_hook::flag::register(SIGINT, token.flag())?;
    Ok(())
}
