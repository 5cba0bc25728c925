// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! UDP bridge carrying channel payloads.
//!
//! One datagram carries one message:
//!
//! ```text
//!   message_type: u8   (0x08 = DATA)
//!   flags:        u8
//!   topic_len:    u16 (LE)
//!   sequence_nr:  u32 (LE)
//!   topic:        topic_len bytes (UTF-8)
//!   payload:      remaining bytes (CDR, encapsulated)
//! ```

use crate::error::{LoggerError, Result};
use crate::subscription::{Bus, Payload, PublishOutcome};
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;

pub const MSG_DATA: u8 = 0x08;

/// Size of the fixed frame header in bytes.
pub const HEADER_SIZE: usize = 8;

/// Largest datagram accepted.
pub const MAX_DATAGRAM: usize = 65_507;

/// How often the receive thread checks for shutdown.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Framing errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame too short: expected {expected} bytes, got {actual}")]
    TooShort { expected: usize, actual: usize },

    #[error("unknown message type 0x{0:02X}")]
    UnknownMessageType(u8),

    #[error("topic name is not valid UTF-8")]
    InvalidTopic,

    #[error("frame of {0} bytes exceeds datagram limit")]
    TooLarge(usize),
}

/// A decoded DATA frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub sequence_nr: u32,
    pub topic: String,
    pub payload: Payload,
}

/// Encode a DATA frame.
pub fn encode_frame(
    topic: &str,
    sequence_nr: u32,
    payload: &[u8],
) -> std::result::Result<Vec<u8>, FrameError> {
    let name = topic.as_bytes();
    let total = HEADER_SIZE + name.len() + payload.len();
    if name.len() > u16::MAX as usize || total > MAX_DATAGRAM {
        return Err(FrameError::TooLarge(total));
    }

    let mut msg = Vec::with_capacity(total);
    msg.push(MSG_DATA);
    msg.push(0);
    msg.extend_from_slice(&(name.len() as u16).to_le_bytes());
    msg.extend_from_slice(&sequence_nr.to_le_bytes());
    msg.extend_from_slice(name);
    msg.extend_from_slice(payload);
    Ok(msg)
}

/// Decode a DATA frame.
pub fn decode_frame(data: &[u8]) -> std::result::Result<Frame, FrameError> {
    if data.len() < HEADER_SIZE {
        return Err(FrameError::TooShort {
            expected: HEADER_SIZE,
            actual: data.len(),
        });
    }
    if data[0] != MSG_DATA {
        return Err(FrameError::UnknownMessageType(data[0]));
    }

    let topic_len = u16::from_le_bytes([data[2], data[3]]) as usize;
    let sequence_nr = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);

    let topic_end = HEADER_SIZE + topic_len;
    if data.len() < topic_end {
        return Err(FrameError::TooShort {
            expected: topic_end,
            actual: data.len(),
        });
    }
    let topic = std::str::from_utf8(&data[HEADER_SIZE..topic_end])
        .map_err(|_| FrameError::InvalidTopic)?
        .to_string();

    Ok(Frame {
        sequence_nr,
        topic,
        payload: data[topic_end..].to_vec(),
    })
}

/// Receive-side counters.
#[derive(Debug, Default)]
pub struct BridgeStats {
    pub frames_received: AtomicU64,
    pub frames_invalid: AtomicU64,
    pub frames_unrouted: AtomicU64,
}

/// Receives frames on a UDP socket and publishes them on a [`Bus`].
pub struct UdpBridge {
    local_addr: SocketAddr,
    running: Arc<AtomicBool>,
    stats: Arc<BridgeStats>,
    handle: Option<JoinHandle<()>>,
}

impl UdpBridge {
    /// Bind `addr` and start the receive thread.
    pub fn spawn(addr: impl ToSocketAddrs, bus: Bus) -> Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;
        let local_addr = socket.local_addr()?;

        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(BridgeStats::default());

        let handle = std::thread::Builder::new()
            .name("sbg2txt-udp".to_string())
            .spawn({
                let running = running.clone();
                let stats = stats.clone();
                move || receive_loop(socket, bus, running, stats)
            })
            .map_err(|e| LoggerError::Transport(e.to_string()))?;

        tracing::info!(%local_addr, "UDP bridge listening");

        Ok(Self {
            local_addr,
            running,
            stats,
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn stats(&self) -> &BridgeStats {
        &self.stats
    }

    /// Stop the receive thread and wait for it.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("UDP receive thread panicked");
            }
        }
    }
}

impl Drop for UdpBridge {
    fn drop(&mut self) {
        self.stop();
    }
}

fn receive_loop(socket: UdpSocket, bus: Bus, running: Arc<AtomicBool>, stats: Arc<BridgeStats>) {
    let mut buf = vec![0u8; MAX_DATAGRAM];

    while running.load(Ordering::SeqCst) {
        let (len, peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                continue;
            }
            Err(e) => {
                tracing::warn!("UDP receive failed: {}", e);
                continue;
            }
        };

        stats.frames_received.fetch_add(1, Ordering::Relaxed);

        let frame = match decode_frame(&buf[..len]) {
            Ok(frame) => frame,
            Err(e) => {
                stats.frames_invalid.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(%peer, "Discarding malformed frame: {}", e);
                continue;
            }
        };

        match bus.publish(&frame.topic, frame.payload) {
            PublishOutcome::Delivered => {}
            PublishOutcome::Dropped => {
                tracing::debug!(
                    topic = %frame.topic,
                    seq = frame.sequence_nr,
                    "Queue full, frame dropped"
                );
            }
            PublishOutcome::NoSubscriber => {
                stats.frames_unrouted.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(topic = %frame.topic, "No subscriber for frame");
            }
        }
    }

    tracing::debug!("UDP receive loop stopped");
}

/// Sends frames to a [`UdpBridge`].
pub struct UdpPublisher {
    socket: UdpSocket,
    sequence_nr: AtomicU32,
}

impl UdpPublisher {
    /// Create a publisher sending to `target`.
    pub fn connect(target: impl ToSocketAddrs) -> Result<Self> {
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.connect(target)?;
        Ok(Self {
            socket,
            sequence_nr: AtomicU32::new(0),
        })
    }

    /// Send one payload on `topic`.
    pub fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        let seq = self.sequence_nr.fetch_add(1, Ordering::Relaxed);
        let frame = encode_frame(topic, seq, payload)?;
        self.socket.send(&frame)?;
        Ok(())
    }
}
