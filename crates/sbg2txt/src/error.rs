// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error types for the logger node.

use crate::transport::FrameError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while starting, running or stopping the logger.
#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write header to {}: {source}", .path.display())]
    Header {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to close {channel} log: {source}")]
    Close {
        channel: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Transport error: {0}")]
    Transport(String),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, LoggerError>;
