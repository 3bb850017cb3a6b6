// Notification hub.
//
// Request handlers publish `Content` into a wide queue; a relay task forwards it into a
// narrow delivery queue drained by a single worker that owns the chat transport. The
// narrow second stage throttles bursts to the pace of the transport.
//
//   publish ──► [hub queue, cap 5] ──► relay ──► [delivery queue, cap 1] ──► worker ──► chat
//
// Every blocking channel operation races the process cancellation token.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use gravity_shared::clients::telegram::ChatTransport;
use gravity_shared::types::event::Content;

/// Lifecycle of the hub. States only move forward, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HubState {
    Idle,
    Running,
    /// Held only while the relay discards what is left in the hub queue. Without
    /// queued events it lasts no longer than one watch update, so a subscriber may
    /// observe Running → Closed directly.
    Draining,
    Closed,
}

/// Result of a publish attempt. Publishing never fails the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    Queued,
    /// The hub queue stayed full for the whole publish timeout; the event was discarded.
    Dropped,
    /// The hub is shutting down or gone.
    Closed,
}

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub capacity: usize,
    pub delivery_capacity: usize,
    pub publish_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            delivery_capacity: 1,
            publish_timeout: Duration::from_millis(250),
        }
    }
}

/// Producer side of the hub. Cheap to clone into every handler.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<Content>,
    publish_timeout: Duration,
    cancel: CancellationToken,
    state: watch::Receiver<HubState>,
}

impl HubHandle {
    /// Enqueues `content`, waiting at most the publish timeout for room.
    /// A full queue drops the newest event.
    pub async fn publish(&self, content: Content) -> PublishOutcome {
        if self.cancel.is_cancelled() {
            return PublishOutcome::Closed;
        }

        let chat_id = content.chat_id;
        let kind = content.kind;
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => PublishOutcome::Closed,
            sent = tokio::time::timeout(self.publish_timeout, self.tx.send(content)) => match sent {
                Ok(Ok(())) => PublishOutcome::Queued,
                Ok(Err(_)) => PublishOutcome::Closed,
                Err(_) => PublishOutcome::Dropped,
            },
        };

        match outcome {
            PublishOutcome::Queued => {
                counter!("hub_events_published_total", "kind" => kind.to_string()).increment(1);
            }
            PublishOutcome::Dropped => {
                counter!("hub_events_dropped_total", "kind" => kind.to_string()).increment(1);
                tracing::warn!(chat_id, %kind, "hub queue full, notification dropped");
            }
            PublishOutcome::Closed => {
                tracing::debug!(chat_id, %kind, "hub closed, notification discarded");
            }
        }
        outcome
    }

    pub fn state(&self) -> HubState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<HubState> {
        self.state.clone()
    }
}

/// Consumer side of the hub, before it is started.
pub struct NotificationHub {
    rx: mpsc::Receiver<Content>,
    delivery_capacity: usize,
    cancel: CancellationToken,
    state: watch::Sender<HubState>,
}

pub struct HubWorkers {
    pub relay: JoinHandle<()>,
    pub delivery: JoinHandle<()>,
}

impl HubWorkers {
    pub async fn join(self) {
        if let Err(e) = self.relay.await {
            tracing::error!(error = %e, "hub relay task panicked");
        }
        if let Err(e) = self.delivery.await {
            tracing::error!(error = %e, "hub delivery task panicked");
        }
    }
}

impl NotificationHub {
    pub fn new(config: &HubConfig, cancel: CancellationToken) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(config.capacity.max(1));
        let (state_tx, state_rx) = watch::channel(HubState::Idle);

        let handle = HubHandle {
            tx,
            publish_timeout: config.publish_timeout,
            cancel: cancel.clone(),
            state: state_rx,
        };
        let hub = Self {
            rx,
            delivery_capacity: config.delivery_capacity.max(1),
            cancel,
            state: state_tx,
        };
        (hub, handle)
    }

    /// Idle → Running. Spawns the relay and the delivery worker, which owns `transport`.
    pub fn start(self, transport: Arc<dyn ChatTransport>) -> HubWorkers {
        let (delivery_tx, delivery_rx) = mpsc::channel(self.delivery_capacity);
        self.state.send_replace(HubState::Running);
        tracing::info!(delivery_capacity = self.delivery_capacity, "notification hub running");

        let delivery = tokio::spawn(run_delivery(delivery_rx, transport, self.cancel.clone()));
        let relay = tokio::spawn(run_relay(self.rx, delivery_tx, self.cancel, self.state));
        HubWorkers { relay, delivery }
    }
}

async fn run_relay(
    mut rx: mpsc::Receiver<Content>,
    delivery: mpsc::Sender<Content>,
    cancel: CancellationToken,
    state: watch::Sender<HubState>,
) {
    loop {
        let content = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(content) => content,
                None => break,
            },
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = delivery.send(content) => {
                if sent.is_err() {
                    tracing::warn!("delivery worker gone, stopping relay");
                    break;
                }
            }
        }
    }

    state.send_replace(HubState::Draining);
    rx.close();
    let mut discarded = 0usize;
    while rx.try_recv().is_ok() {
        discarded += 1;
    }
    drop(rx);
    if discarded > 0 {
        counter!("hub_events_dropped_total", "kind" => "shutdown").increment(discarded as u64);
    }

    state.send_replace(HubState::Closed);
    tracing::info!(discarded, "notification hub closed");
}

async fn run_delivery(
    mut rx: mpsc::Receiver<Content>,
    transport: Arc<dyn ChatTransport>,
    cancel: CancellationToken,
) {
    loop {
        let content = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = rx.recv() => match next {
                Some(content) => content,
                None => break,
            },
        };

        let text = content.render();
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = transport.send(content.chat_id, &text) => match result {
                Ok(()) => tracing::debug!(chat_id = content.chat_id, kind = %content.kind, "notification delivered"),
                Err(e) => {
                    counter!("hub_deliveries_failed_total").increment(1);
                    tracing::error!(chat_id = content.chat_id, kind = %content.kind, error = %e, "notification delivery failed");
                }
            },
        }
    }
    tracing::debug!("delivery worker stopped");
}

// ─── Tests ───
