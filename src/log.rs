//! Timestamped event lines for the server and client binaries

use chrono::Local;

/// Print a timestamped event line to stdout.
pub fn log_event(event: &str) {
    println!("[{}] {}", Local::now().format("%Y-%m-%d %H:%M:%S"), event);
}
