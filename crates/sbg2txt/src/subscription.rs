// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Channel subscriptions.
//!
//! A [`Subscriber`] hands out one bounded receive queue per channel. The
//! in-process [`Bus`] is the stock implementation: transports publish raw
//! payloads into it and the node drains the queues.

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Raw payload as received from a channel.
pub type Payload = Vec<u8>;

/// Something that can open a receive queue on a named channel.
pub trait Subscriber {
    /// Subscribe to `topic` with a queue holding at most `depth` messages.
    fn subscribe(&self, topic: &str, depth: usize) -> Receiver<Payload>;
}

/// What happened to a published payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Queued for every subscriber.
    Delivered,
    /// At least one subscriber queue was full; the payload was dropped there.
    Dropped,
    /// Nobody subscribes to this topic.
    NoSubscriber,
}

struct TopicQueue {
    sender: Sender<Payload>,
    dropped: Arc<AtomicU64>,
    /// Set once a send finds the receiver gone.
    closed: AtomicBool,
}

/// In-process publish/subscribe bus with bounded, drop-newest queues.
#[derive(Clone, Default)]
pub struct Bus {
    topics: Arc<RwLock<HashMap<String, Vec<TopicQueue>>>>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `payload` for every subscriber of `topic`.
    pub fn publish(&self, topic: &str, payload: Payload) -> PublishOutcome {
        let topics = match self.topics.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let Some(queues) = topics.get(topic) else {
            return PublishOutcome::NoSubscriber;
        };

        let mut outcome = PublishOutcome::NoSubscriber;
        for queue in queues {
            match queue.sender.try_send(payload.clone()) {
                Ok(()) => {
                    if outcome == PublishOutcome::NoSubscriber {
                        outcome = PublishOutcome::Delivered;
                    }
                }
                Err(TrySendError::Full(_)) => {
                    queue.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(topic, "Receive queue full, dropping message");
                    outcome = PublishOutcome::Dropped;
                }
                Err(TrySendError::Disconnected(_)) => {
                    queue.closed.store(true, Ordering::Relaxed);
                }
            }
        }
        outcome
    }

    /// Messages dropped on `topic` because a queue was full.
    pub fn dropped(&self, topic: &str) -> u64 {
        let topics = match self.topics.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        topics
            .get(topic)
            .map(|queues| {
                queues
                    .iter()
                    .map(|q| q.dropped.load(Ordering::Relaxed))
                    .sum()
            })
            .unwrap_or(0)
    }
}

impl Subscriber for Bus {
    fn subscribe(&self, topic: &str, depth: usize) -> Receiver<Payload> {
        let (sender, receiver) = channel::bounded(depth.max(1));
        let mut topics = match self.topics.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let queues = topics.entry(topic.to_string()).or_default();
        queues.retain(|q| !q.closed.load(Ordering::Relaxed));
        queues.push(TopicQueue {
            sender,
            dropped: Arc::new(AtomicU64::new(0)),
            closed: AtomicBool::new(false),
        });
        tracing::debug!(topic, depth, "Subscribed");
        receiver
    }
}
