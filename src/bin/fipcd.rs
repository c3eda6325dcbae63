//! Slot-file IPC server binary
//!
//! Default mode claims the next instance number in the working directory
//! and serves `ping` requests; `--router` serves the envelope router on a
//! single fixed slot file instead.

use anyhow::{anyhow, Result};
use fipc::cancel::CancelToken;
use fipc::discovery::SINGLE_SLOT_FILE;
use fipc::router::{RouterConfig, RouterHandler};
use fipc::server::{CleanupPolicy, Server, ServerConfig};
use std::path::PathBuf;
use std::process;

fn main() -> Result<()> {
    let mut router = false;
    let mut dir = std::env::current_dir()?;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--router" => router = true,
            "--dir" => {
                dir = PathBuf::from(
                    args.next().ok_or_else(|| anyhow!("--dir requires a path"))?,
                );
            }
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            other => {
                eprintln!("Error: unknown option '{}'", other);
                print_usage();
                process::exit(1);
            }
        }
    }

    let cancel = CancelToken::new();
    fipc::signal::register_shutdown(&cancel)?;

    if router {
        let path = dir.join(SINGLE_SLOT_FILE);
        let config = ServerConfig {
            cleanup: CleanupPolicy::MarkFree,
            ..ServerConfig::default()
        };
        let mut server = Server::attach(
            &path,
            RouterHandler::new(RouterConfig::default()),
            config,
            cancel,
        )?;
        server.run()?;
    } else {
        let mut server = Server::bind(&dir, ServerConfig::default(), cancel)?;
        server.run()?;
    }

    Ok(())
}

fn print_usage() {
    println!("Usage: fipcd [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --router      Serve the request router on a single fixed slot file");
    println!("  --dir <PATH>  Directory for slot files (default: current directory)");
    println!("  -h, --help    Show this help");
    println!();
    println!("Press Ctrl-C to stop the server.");
}
