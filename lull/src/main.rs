//! # Lull Daemon
//!
//! Voice-driven bed control: listens for intents over MQTT, drives the
//! bed's actuators through GPIO-controlled relays, and runs user-defined
//! routines.
//!
//! # Usage
//!
//! ```bash
//! # Run with simulated GPIO lines (the default without the
//! # `hardware` build feature)
//! lull --simulate
//!
//! # Verbose logging, custom base directory
//! lull --base-dir /tmp/lull -s -v
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

mod app;
mod mqtt;

use app::App;

/// Lull - voice-driven bed control daemon
#[derive(Parser, Debug)]
#[command(name = "lull")]
#[command(version)]
#[command(about = "Voice-driven bed control daemon")]
#[command(long_about = None)]
struct Args {
    /// Base directory for settings, controls, routines and reports.
    /// Defaults to ~/.lull
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Simulate GPIO lines instead of driving real hardware
    #[arg(short = 's', long)]
    simulate: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("Lull startup failed: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    setup_tracing(&args);

    info!("Lull v{} starting...", env!("CARGO_PKG_VERSION"));

    let base_dir = match args.base_dir {
        Some(base_dir) => base_dir,
        None => default_base_dir(),
    };

    let mut app = App::new(&base_dir, args.simulate)?;
    app.run()?;

    info!("Lull shutdown complete");
    Ok(())
}

fn default_base_dir() -> PathBuf {
    let home = std::env::var_os("HOME").map_or_else(|| PathBuf::from("."), PathBuf::from);
    home.join(".lull")
}

/// Setup tracing subscriber based on CLI arguments.
fn setup_tracing(args: &Args) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
