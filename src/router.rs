//! Single-server variant: envelope parsing and request routing
//!
//! Requests carry an envelope of the form `[<sequence>]<space><free-text>`.
//! A malformed envelope is rejected before the handler runs. Valid bodies
//! dispatch on a few reserved words that exercise the failure paths of the
//! protocol; everything else gets a short-delay acknowledgement echoing the
//! sequence number.

use crate::server::handler::{ParsedRequest, Reply, RequestHandler};
use std::time::Duration;

/// Body that produces an error response without altering protocol state
pub const BODY_ERROR: &str = "error";
/// Body that delays the response past the client's patience
pub const BODY_TIMEOUT: &str = "timeout";
/// Body that never gets a response
pub const BODY_CRASH: &str = "crash";
/// Body answered with an empty payload
pub const BODY_EMPTY: &str = "empty";

/// Wrap a request body in the wire envelope.
pub fn format_envelope(seq: u64, body: &str) -> String {
    format!("[{}] {}", seq, body)
}

/// Split an envelope into its sequence number and body.
pub fn parse_envelope(raw: &str) -> Result<(u64, &str), String> {
    let rest = raw
        .strip_prefix('[')
        .ok_or_else(|| "missing opening bracket".to_string())?;
    let close = rest
        .find(']')
        .ok_or_else(|| "missing closing bracket".to_string())?;
    let seq: u64 = rest[..close]
        .parse()
        .map_err(|_| "non-numeric sequence".to_string())?;
    let body = rest[close + 1..]
        .strip_prefix(' ')
        .ok_or_else(|| "missing separator".to_string())?;
    Ok((seq, body))
}

/// Delays applied by the router's simulated behaviors
#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    /// Pause before an ordinary acknowledgement
    pub ack_delay: Duration,
    /// Pause before answering a `timeout` body; must exceed the client's
    /// response wait budget to exercise the recovery path
    pub timeout_delay: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            ack_delay: Duration::from_millis(50),
            timeout_delay: Duration::from_secs(8),
        }
    }
}

/// Envelope-based handler for the single-server variant
#[derive(Debug)]
pub struct RouterHandler {
    config: RouterConfig,
}

impl RouterHandler {
    pub fn new(config: RouterConfig) -> Self {
        Self { config }
    }
}

impl RequestHandler for RouterHandler {
    fn validate<'a>(&self, raw: &'a str) -> Result<ParsedRequest<'a>, String> {
        match parse_envelope(raw) {
            Ok((seq, body)) => Ok(ParsedRequest {
                seq: Some(seq),
                body,
            }),
            Err(reason) => Err(format!("ERROR: malformed request: {}", reason)),
        }
    }

    fn respond(&mut self, _client_id: u32, request: ParsedRequest<'_>) -> Reply {
        let seq = request.seq.unwrap_or(0);
        match request.body {
            BODY_ERROR => Reply::Text(format!("[{}] ERROR: simulated failure", seq)),
            BODY_TIMEOUT => {
                std::thread::sleep(self.config.timeout_delay);
                Reply::Text(format!("[{}] ack: {}", seq, BODY_TIMEOUT))
            }
            BODY_CRASH => Reply::Silent,
            BODY_EMPTY => Reply::Empty,
            body => {
                std::thread::sleep(self.config.ack_delay);
                Reply::Text(format!("[{}] ack: {}", seq, body))
            }
        }
    }
}
