// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logger node: subscribes to the three channels and appends every sample
//! to its file until stopped.

use crate::cdr::decode_sample;
use crate::config::ChannelConfig;
use crate::error::Result;
use crate::output::LogFiles;
use crate::sample::SampleKind;
use crate::subscription::{Payload, Subscriber};
use crossbeam::channel::{Receiver, RecvError, Select};
use std::fs::File;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Upper bound on how long a stop request can go unnoticed while idle.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Per-channel counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelStats {
    /// Payloads taken from the queue.
    pub received: u64,
    /// Lines appended to the file.
    pub written: u64,
    /// Payloads that failed to decode.
    pub decode_errors: u64,
    /// Appends that failed.
    pub write_errors: u64,
}

/// Node statistics, one entry per channel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NodeStats {
    pub imu_data: ChannelStats,
    pub gps_pos: ChannelStats,
    pub gps_vel: ChannelStats,
}

impl NodeStats {
    pub fn channel(&self, kind: SampleKind) -> &ChannelStats {
        match kind {
            SampleKind::Inertial => &self.imu_data,
            SampleKind::Position => &self.gps_pos,
            SampleKind::Velocity => &self.gps_vel,
        }
    }

    fn channel_mut(&mut self, kind: SampleKind) -> &mut ChannelStats {
        match kind {
            SampleKind::Inertial => &mut self.imu_data,
            SampleKind::Position => &mut self.gps_pos,
            SampleKind::Velocity => &mut self.gps_vel,
        }
    }
}

/// Outcome of one dispatch step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A message was handled on this channel.
    Handled(SampleKind),
    /// Nothing arrived before the timeout.
    Idle,
    /// Every channel has been closed by its publisher.
    Closed,
}

struct Subscription {
    kind: SampleKind,
    topic: String,
    receiver: Receiver<Payload>,
    open: bool,
}

/// Handle to stop a running node from another thread or a signal handler.
#[derive(Clone)]
pub struct StopHandle {
    running: Arc<AtomicBool>,
}

impl StopHandle {
    /// Request a stop. Only stores a flag.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

/// The logger node.
pub struct LoggerNode<W: Write = File> {
    files: LogFiles<W>,
    subscriptions: Vec<Subscription>,
    running: Arc<AtomicBool>,
    stats: NodeStats,
}

impl<W: Write> LoggerNode<W> {
    /// Subscribe to the configured channels and bind them to `files`.
    pub fn new(
        files: LogFiles<W>,
        subscriber: &impl Subscriber,
        channels: &ChannelConfig,
        queue_depth: usize,
    ) -> Self {
        let subscriptions = SampleKind::ALL
            .iter()
            .map(|&kind| {
                let topic = channels.topic(kind).to_string();
                let receiver = subscriber.subscribe(&topic, queue_depth);
                Subscription {
                    kind,
                    topic,
                    receiver,
                    open: true,
                }
            })
            .collect();

        Self {
            files,
            subscriptions,
            running: Arc::new(AtomicBool::new(true)),
            stats: NodeStats::default(),
        }
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Get a handle to stop the node from elsewhere.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            running: self.running.clone(),
        }
    }

    /// Topic subscribed for `kind`.
    pub fn topic(&self, kind: SampleKind) -> &str {
        self.subscriptions
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.topic.as_str())
            .unwrap_or_default()
    }

    /// Dispatch messages until a stop is requested or every channel closes.
    ///
    /// Messages still queued when the stop is observed are not written.
    pub fn run(&mut self) {
        tracing::info!("Running...");

        while self.is_running() {
            if self.dispatch_once(POLL_INTERVAL) == Dispatch::Closed {
                tracing::info!("All channels closed");
                break;
            }
        }
    }

    /// Wait up to `timeout` for one message and hand it to its handler.
    pub fn dispatch_once(&mut self, timeout: Duration) -> Dispatch {
        let received = {
            let open: Vec<usize> = (0..self.subscriptions.len())
                .filter(|&i| self.subscriptions[i].open)
                .collect();
            if open.is_empty() {
                return Dispatch::Closed;
            }

            let mut select = Select::new();
            for &i in &open {
                select.recv(&self.subscriptions[i].receiver);
            }

            match select.select_timeout(timeout) {
                Ok(op) => {
                    let index = open[op.index()];
                    let result = op.recv(&self.subscriptions[index].receiver);
                    Some((index, result))
                }
                Err(_) => None,
            }
        };

        match received {
            None => Dispatch::Idle,
            Some((index, Ok(payload))) => {
                let kind = self.subscriptions[index].kind;
                self.handle(kind, &payload);
                Dispatch::Handled(kind)
            }
            Some((index, Err(RecvError))) => {
                let sub = &mut self.subscriptions[index];
                sub.open = false;
                tracing::warn!(topic = %sub.topic, "Channel closed by publisher");
                Dispatch::Idle
            }
        }
    }

    /// Decode a payload received for `kind` and append it.
    ///
    /// Failures are logged and counted, never propagated.
    pub fn handle(&mut self, kind: SampleKind, payload: &[u8]) {
        let stats = self.stats.channel_mut(kind);
        stats.received += 1;

        let sample = match decode_sample(kind, payload) {
            Ok(sample) => sample,
            Err(e) => {
                stats.decode_errors += 1;
                tracing::warn!(channel = kind.suffix(), "Dropping undecodable message: {}", e);
                return;
            }
        };

        match self.files.append(&sample) {
            Ok(()) => stats.written += 1,
            Err(e) => {
                stats.write_errors += 1;
                tracing::warn!(channel = kind.suffix(), "Failed to write sample: {}", e);
            }
        }
    }

    /// Close the files in order and return the final statistics.
    pub fn shutdown(self) -> Result<NodeStats> {
        tracing::info!("Closing...");
        let Self { files, stats, .. } = self;
        files.close()?;
        Ok(stats)
    }

    /// Borrow the log files.
    pub fn files(&self) -> &LogFiles<W> {
        &self.files
    }
}
