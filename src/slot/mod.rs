//! The shared slot: one fixed-size message record persisted in a file
//!
//! - `message`: the 264-byte wire record and its three-valued status tag
//! - `store`: dumb fixed-slot file accessor (seek to 0, read or
//!   write-then-flush one record; no locking)

pub mod message;
pub mod store;

pub use message::{Message, Status, PAYLOAD_SIZE, RECORD_SIZE};
pub use store::SlotFile;
