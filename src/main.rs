//! Interactive client for the slot-file IPC server
//!
//! Line-oriented prompt with five commands: `ping`, `status`, `connect`,
//! `disconnect`, `exit`. Auto-connects to the newest available server in
//! the current directory on startup.

use anyhow::Result;
use fipc::cancel::CancelToken;
use fipc::client::{ClientConfig, Connection, ServerReply};
use fipc::discovery;
use fipc::error::IpcError;
use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal};
use std::path::Path;

fn main() -> Result<()> {
    let cancel = CancelToken::new();
    fipc::signal::register_shutdown(&cancel)?;

    let dir = std::env::current_dir()?;
    let mut connection = try_auto_connect(&dir, &cancel);

    let mut line_editor = Reedline::create();
    let prompt = DefaultPrompt::new(
        DefaultPromptSegment::Basic("fipc".to_string()),
        DefaultPromptSegment::Empty,
    );

    while !cancel.is_cancelled() {
        let line = match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => line,
            Ok(Signal::CtrlC) | Ok(Signal::CtrlD) => break,
            Err(e) => {
                eprintln!("Error reading input: {}", e);
                break;
            }
        };

        match line.trim().to_lowercase().as_str() {
            "" => continue,
            "exit" => break,
            "status" => show_status(&mut connection),
            "connect" => {
                if let Some(old) = connection.take() {
                    let _ = old.close();
                }
                connection = try_auto_connect(&dir, &cancel);
            }
            "disconnect" => match connection.take() {
                Some(conn) => {
                    let _ = conn.close();
                    println!("Disconnected.");
                }
                None => println!("Not connected to any server."),
            },
            "ping" => match connection.as_mut() {
                Some(conn) => {
                    if send_ping(conn) == PingOutcome::Cancelled {
                        break;
                    }
                }
                None => println!("Error: Not connected to server."),
            },
            _ => println!("Error: Only 'ping' is accepted."),
        }
    }

    if let Some(conn) = connection {
        let _ = conn.close();
    }
    println!("Client stopped.");
    Ok(())
}

fn try_auto_connect(dir: &Path, cancel: &CancelToken) -> Option<Connection> {
    let path = match discovery::auto_connect(dir) {
        Ok(Some(path)) => path,
        Ok(None) => {
            println!("No servers available.");
            return None;
        }
        Err(e) => {
            println!("Discovery failed: {}", e);
            return None;
        }
    };
    match Connection::open(&path, ClientConfig::default(), cancel.clone()) {
        Ok(conn) => {
            println!("Connected to: {}", path.display());
            Some(conn)
        }
        Err(e) => {
            println!("Failed to connect: {}", e);
            None
        }
    }
}

#[derive(PartialEq)]
enum PingOutcome {
    Done,
    Cancelled,
}

fn send_ping(conn: &mut Connection) -> PingOutcome {
    let id_before = conn.client_id();
    match conn.send("ping") {
        Ok(reply) => {
            if conn.client_id() != id_before {
                println!("Server assigned client id: {}", conn.client_id());
            }
            match reply {
                ServerReply::Text(text) => println!("Response: {}", text),
                ServerReply::NoContent => println!("(no content)"),
            }
            PingOutcome::Done
        }
        Err(IpcError::Busy { .. }) => {
            println!("Server is busy.");
            PingOutcome::Done
        }
        Err(IpcError::Timeout(_)) => {
            println!("Timeout waiting for response.");
            PingOutcome::Done
        }
        Err(IpcError::Cancelled) => PingOutcome::Cancelled,
        Err(e) => {
            println!("Failed to send ping: {}", e);
            PingOutcome::Done
        }
    }
}

fn show_status(connection: &mut Option<Connection>) {
    match connection.as_mut() {
        None => println!("Not connected to any server."),
        Some(conn) => {
            println!("Connected to: {}", conn.path().display());
            if conn.client_id() > 0 {
                println!("Client id: {}", conn.client_id());
            } else {
                println!("Client id: not assigned");
            }
            if !conn.probe_alive() {
                println!("Server is not responding.");
            }
        }
    }
}
