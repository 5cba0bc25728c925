// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! sbg2txt CLI
//!
//! Log SBG navigation samples to timestamped CSV files.
//!
//! # Usage
//!
//! ```bash
//! # Log into the current directory, listening on 0.0.0.0:7480
//! sbg2txt
//!
//! # Write somewhere else and listen on a specific port
//! sbg2txt --output-dir /data/runs --listen 127.0.0.1:9000
//!
//! # Start from a TOML configuration file
//! sbg2txt --config sbg2txt.toml
//! ```

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use sbg2txt::{
    Bus, LogFileNames, LogFiles, LoggerConfig, LoggerNode, SampleKind, StopHandle, UdpBridge,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "sbg2txt")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Log SBG inertial/GPS samples to timestamped CSV files")]
#[command(long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory to create the log files in
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// UDP address to receive samples on
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Receive queue depth per channel
    #[arg(short, long)]
    queue_depth: Option<usize>,

    /// Verbose mode (show debug logs)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("sbg2txt=debug")
    } else {
        EnvFilter::new("sbg2txt=info")
    };

    fmt().with_env_filter(filter).with_target(false).init();

    let config = build_config(&cli)?;

    let names = LogFileNames::for_start(Local::now().naive_local());
    let files = LogFiles::create(&config.output_dir, &names, config.file_mode)
        .context("Failed to create log files")?;

    tracing::info!(
        prefix = names.prefix(),
        output_dir = %config.output_dir.display(),
        listen = %config.listen,
        queue_depth = config.queue_depth,
        "Starting sbg2txt"
    );

    let bus = Bus::new();
    let mut node = LoggerNode::new(files, &bus, &config.channels, config.queue_depth);

    ctrlc_handler(node.stop_handle()).context("Failed to install Ctrl+C handler")?;

    let mut bridge = UdpBridge::spawn(config.listen, bus.clone())
        .with_context(|| format!("Failed to listen on {}", config.listen))?;

    node.run();

    bridge.stop();
    let stats = node.shutdown().context("Failed to close log files")?;

    for kind in SampleKind::ALL {
        let channel = stats.channel(kind);
        tracing::info!(
            channel = kind.suffix(),
            received = channel.received,
            written = channel.written,
            dropped = bus.dropped(config.channels.topic(kind)),
            decode_errors = channel.decode_errors,
            write_errors = channel.write_errors,
            "Channel summary"
        );
    }
    tracing::info!(
        frames_received = bridge.stats().frames_received.load(Ordering::Relaxed),
        frames_invalid = bridge.stats().frames_invalid.load(Ordering::Relaxed),
        frames_unrouted = bridge.stats().frames_unrouted.load(Ordering::Relaxed),
        "Logger shutdown complete"
    );

    Ok(())
}

fn build_config(cli: &Cli) -> Result<LoggerConfig> {
    let mut config = match &cli.config {
        Some(path) => LoggerConfig::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => LoggerConfig::default(),
    };

    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(listen) = cli.listen {
        config.listen = listen;
    }
    if let Some(depth) = cli.queue_depth {
        config.queue_depth = depth;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Setup Ctrl+C handler.
fn ctrlc_handler(stop_handle: StopHandle) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        stop_handle.stop();
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_overrides_defaults() {
        let cli = Cli::parse_from([
            "sbg2txt",
            "--output-dir",
            "/tmp/runs",
            "--listen",
            "127.0.0.1:9000",
            "--queue-depth",
            "50",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/runs"));
        assert_eq!(config.listen, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());
        assert_eq!(config.queue_depth, 50);
        assert_eq!(config.channels.gps_pos, "sbg/gps_pos");
    }

    #[test]
    fn test_cli_rejects_zero_depth() {
        let cli = Cli::parse_from(["sbg2txt", "--queue-depth", "0"]);
        assert!(build_config(&cli).is_err());
    }
}
