// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logger configuration.
//!
//! Defaults reproduce the stock setup; a TOML file may override any field.

use crate::output::DEFAULT_FILE_MODE;
use crate::sample::SampleKind;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Names of the subscribed channels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    #[serde(default = "default_imu_data")]
    pub imu_data: String,

    #[serde(default = "default_gps_pos")]
    pub gps_pos: String,

    #[serde(default = "default_gps_vel")]
    pub gps_vel: String,
}

fn default_imu_data() -> String {
    "sbg/imu_data".to_string()
}

fn default_gps_pos() -> String {
    "sbg/gps_pos".to_string()
}

fn default_gps_vel() -> String {
    "sbg/gps_vel".to_string()
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            imu_data: default_imu_data(),
            gps_pos: default_gps_pos(),
            gps_vel: default_gps_vel(),
        }
    }
}

impl ChannelConfig {
    /// Channel name carrying `kind`.
    pub fn topic(&self, kind: SampleKind) -> &str {
        match kind {
            SampleKind::Inertial => &self.imu_data,
            SampleKind::Position => &self.gps_pos,
            SampleKind::Velocity => &self.gps_vel,
        }
    }
}

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggerConfig {
    /// Directory the log files are created in.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// UDP address the bridge listens on.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// Receive queue depth per channel.
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,

    /// Permission bits for newly created log files.
    #[serde(default = "default_file_mode")]
    pub file_mode: u32,

    #[serde(default)]
    pub channels: ChannelConfig,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 7480))
}

fn default_queue_depth() -> usize {
    1000
}

fn default_file_mode() -> u32 {
    DEFAULT_FILE_MODE
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            listen: default_listen(),
            queue_depth: default_queue_depth(),
            file_mode: default_file_mode(),
            channels: ChannelConfig::default(),
        }
    }
}

impl LoggerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.queue_depth == 0 {
            return Err(ConfigError::Invalid("queue_depth must be at least 1".into()));
        }

        if self.file_mode & !0o777 != 0 {
            return Err(ConfigError::Invalid(format!(
                "file_mode {:o} has bits outside 0o777",
                self.file_mode
            )));
        }

        let topics: Vec<&str> = SampleKind::ALL
            .iter()
            .map(|kind| self.channels.topic(*kind))
            .collect();

        for (i, topic) in topics.iter().enumerate() {
            if topic.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "channel for {} is empty",
                    SampleKind::ALL[i]
                )));
            }
            if topics[..i].contains(topic) {
                return Err(ConfigError::Invalid(format!(
                    "channel {} is used twice",
                    topic
                )));
            }
        }

        Ok(())
    }
}
