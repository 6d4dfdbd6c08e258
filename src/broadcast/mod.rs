//! 观众广播：事件经 broadcast 通道扇出，在线人数经 watch 通道发布。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::orchestrator::traits::BroadcastChannel;
use crate::orchestrator::types::BroadcastEvent;

const DEFAULT_EVENT_CAPACITY: usize = 64;

pub struct ViewerHub {
    events_tx: broadcast::Sender<BroadcastEvent>,
    viewers_tx: Arc<watch::Sender<usize>>,
    next_id: AtomicU64,
}

impl ViewerHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (events_tx, _) = broadcast::channel(capacity.max(1));
        let (viewers_tx, _) = watch::channel(0);
        Self {
            events_tx,
            viewers_tx: Arc::new(viewers_tx),
            next_id: AtomicU64::new(1),
        }
    }

    /// 新观众接入；会话对象被丢弃即视为断开。
    pub fn connect(&self) -> ViewerSession {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let events = self.events_tx.subscribe();
        self.viewers_tx.send_modify(|count| *count += 1);
        info!(
            target: "viewer_hub",
            viewer = id,
            viewers = *self.viewers_tx.borrow(),
            "viewer connected"
        );

        ViewerSession {
            id,
            events,
            viewers: Arc::clone(&self.viewers_tx),
        }
    }
}

impl Default for ViewerHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastChannel for ViewerHub {
    fn publish(&self, event: BroadcastEvent) {
        let name = event.name();
        match self.events_tx.send(event) {
            Ok(receivers) => debug!(target: "viewer_hub", event = name, receivers, "event published"),
            Err(_) => debug!(target: "viewer_hub", event = name, "no viewers, event dropped"),
        }
    }

    fn viewer_count(&self) -> usize {
        *self.viewers_tx.borrow()
    }

    fn watch_viewers(&self) -> watch::Receiver<usize> {
        self.viewers_tx.subscribe()
    }
}

pub struct ViewerSession {
    id: u64,
    events: broadcast::Receiver<BroadcastEvent>,
    viewers: Arc<watch::Sender<usize>>,
}

impl ViewerSession {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 接收下一条事件；落后过多时跳过丢失的事件继续接收。
    pub async fn recv(&mut self) -> Option<BroadcastEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        target: "viewer_hub",
                        viewer = self.id,
                        skipped,
                        "viewer lagged behind, events skipped"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for ViewerSession {
    fn drop(&mut self) {
        self.viewers
            .send_modify(|count| *count = count.saturating_sub(1));
        info!(
            target: "viewer_hub",
            viewer = self.id,
            viewers = *self.viewers.borrow(),
            "viewer disconnected"
        );
    }
}
