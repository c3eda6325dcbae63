//! Request validation and response computation
//!
//! The server loop separates the two phases: `validate` screens the raw
//! payload before any identity is assigned (a rejected request must not
//! touch the connected-identity set), and `respond` runs only for requests
//! that passed.

/// A request that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedRequest<'a> {
    /// Envelope sequence number, when the grammar carries one
    pub seq: Option<u64>,
    /// Free-text request body
    pub body: &'a str,
}

/// What the server writes back (or doesn't)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// READY with this payload text
    Text(String),
    /// READY with an empty payload; the client treats it as "no content"
    Empty,
    /// Never respond; the slot stays PENDING until the client times out
    /// and reclaims it
    Silent,
}

/// Application behavior layered over the slot protocol
pub trait RequestHandler {
    /// Screen the raw payload. `Err` carries the error-tagged response text
    /// written back with the client's identity preserved.
    fn validate<'a>(&self, raw: &'a str) -> Result<ParsedRequest<'a>, String>;

    /// Compute the response for a validated request, under the identity the
    /// registry settled on.
    fn respond(&mut self, client_id: u32, request: ParsedRequest<'_>) -> Reply;
}

/// Multi-server variant handler: accepts exactly `ping`
#[derive(Debug)]
pub struct PingHandler {
    instance: u32,
}

impl PingHandler {
    pub fn new(instance: u32) -> Self {
        Self { instance }
    }
}

impl RequestHandler for PingHandler {
    fn validate<'a>(&self, raw: &'a str) -> Result<ParsedRequest<'a>, String> {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("ping") {
            Ok(ParsedRequest {
                seq: None,
                body: trimmed,
            })
        } else {
            Err("ERROR: Only 'ping' is accepted".to_string())
        }
    }

    fn respond(&mut self, client_id: u32, _request: ParsedRequest<'_>) -> Reply {
        Reply::Text(format!(
            "pong from server #{} to client #{}",
            self.instance, client_id
        ))
    }
}
