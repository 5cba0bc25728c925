// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SBG navigation logger
//!
//! Subscribe to the SBG driver's `imu_data`, `gps_pos` and `gps_vel`
//! channels and append every sample to a per-run CSV file.
//!
//! # Output
//!
//! Each run creates three files named after the local start time:
//!
//! ```text
//! 2024-01-02-03:04:05.imu_data.log   timestamp,accel.x,accel.y,accel.z,gyro.x,gyro.y,gyro.z
//! 2024-01-02-03:04:05.gps_pos.log    timestamp,pos.x,pos.y,pos.z
//! 2024-01-02-03:04:05.gps_vel.log    timestamp,vel.x,vel.y,vel.z
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use sbg2txt::{Bus, LogFileNames, LogFiles, LoggerConfig, LoggerNode, UdpBridge};
//!
//! let config = LoggerConfig::default();
//! let bus = Bus::new();
//! let names = LogFileNames::for_start(chrono::Local::now().naive_local());
//! let files = LogFiles::create(&config.output_dir, &names, config.file_mode)?;
//!
//! let mut node = LoggerNode::new(files, &bus, &config.channels, config.queue_depth);
//! let _bridge = UdpBridge::spawn(config.listen, bus)?;
//!
//! node.run();
//! node.shutdown()?;
//! ```

pub mod cdr;
pub mod config;
mod error;
mod node;
mod output;
mod sample;
mod subscription;
pub mod transport;

pub use cdr::{decode_sample, encode_sample, DecodeError, MessageHeader};
pub use config::{ChannelConfig, ConfigError, LoggerConfig};
pub use error::{LoggerError, Result};
pub use node::{ChannelStats, Dispatch, LoggerNode, NodeStats, StopHandle, POLL_INTERVAL};
pub use output::{LogFileNames, LogFiles, DEFAULT_FILE_MODE, RUN_PREFIX_FORMAT};
pub use sample::{InertialSample, PositionSample, Sample, SampleKind, Vector3, VelocitySample};
pub use subscription::{Bus, Payload, PublishOutcome, Subscriber};
pub use transport::{FrameError, UdpBridge, UdpPublisher};
