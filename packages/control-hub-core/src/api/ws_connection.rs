//! WebSocket connection tracking and event fan-out.
//!
//! This module provides tracking of WebSocket connections with force-close capability:
//!
//! - `WsConnectionManager`: Tracks active connections in registration order and
//!   fans out encoded events to each connection's bounded outbound queue
//! - `ConnectionGuard`: RAII guard for automatic cleanup on disconnect

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

/// Encoded event shared by every outbound queue.
pub type OutboundMessage = Arc<str>;

struct ConnectionEntry {
    id: String,
    tx: mpsc::Sender<OutboundMessage>,
}

/// Manages all active WebSocket connections.
///
/// Thread-safe and designed for concurrent access from multiple
/// WebSocket handlers. Uses hierarchical cancellation tokens for
/// efficient force-close of all connections.
pub struct WsConnectionManager {
    /// Active connections, oldest first.
    connections: RwLock<Vec<ConnectionEntry>>,
    /// Outbound queue capacity per connection.
    capacity: usize,
    next_id: AtomicU64,
    /// Global cancellation token - when cancelled, all connections close.
    /// Wrapped in RwLock so it can be replaced after close_all().
    global_cancel: RwLock<CancellationToken>,
}

impl WsConnectionManager {
    /// Creates a manager whose connections buffer up to `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            connections: RwLock::new(Vec::new()),
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
            global_cancel: RwLock::new(CancellationToken::new()),
        }
    }

    /// Registers a new connection and returns its guard and outbound queue.
    ///
    /// `initial` is queued before the connection becomes visible to
    /// [`broadcast`](Self::broadcast), so it is always the first message the
    /// client receives.
    pub fn register(
        self: &Arc<Self>,
        initial: OutboundMessage,
    ) -> (ConnectionGuard, mpsc::Receiver<OutboundMessage>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let conn_id = format!("ws-{}", id);
        let cancel_token = self.global_cancel.read().child_token();

        let (tx, rx) = mpsc::channel(self.capacity);
        // Fresh channel with capacity >= 1, cannot be full or closed.
        let _ = tx.try_send(initial);

        let total = {
            let mut connections = self.connections.write();
            connections.push(ConnectionEntry {
                id: conn_id.clone(),
                tx,
            });
            connections.len()
        };
        log::info!("[WS] Connection registered: {} (total: {})", conn_id, total);

        let guard = ConnectionGuard {
            id: conn_id,
            manager: Arc::clone(self),
            cancel_token,
        };
        (guard, rx)
    }

    /// Unregisters a connection by ID.
    fn unregister(&self, id: &str) {
        let mut connections = self.connections.write();
        if let Some(pos) = connections.iter().position(|entry| entry.id == id) {
            connections.remove(pos);
            log::info!(
                "[WS] Connection unregistered: {} (remaining: {})",
                id,
                connections.len()
            );
        }
    }

    /// Queues `message` on every connection, in registration order.
    ///
    /// Never blocks. A connection whose queue is full misses this message;
    /// a connection that is already shutting down is skipped.
    pub fn broadcast(&self, message: &OutboundMessage) {
        let connections = self.connections.read();
        for entry in connections.iter() {
            match entry.tx.try_send(Arc::clone(message)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log::warn!(
                        "[WS] Outbound queue full for {}, dropping message",
                        entry.id
                    );
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }

    /// Returns the number of active connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Force-closes all connections.
    ///
    /// This cancels the global token, which signals all connection handlers
    /// to terminate. After cancellation, a fresh token is created so new
    /// connections can still be accepted.
    ///
    /// Returns the number of connections that were signaled to close.
    pub fn close_all(&self) -> usize {
        let count = self.connection_count();
        let mut guard = self.global_cancel.write();
        guard.cancel();
        *guard = CancellationToken::new();
        if count > 0 {
            log::info!("[WS] Force-closing {} connection(s)", count);
        }
        count
    }
}

/// RAII guard that unregisters a connection when dropped.
///
/// This ensures connections are always cleaned up, even if the handler
/// panics or exits early.
pub struct ConnectionGuard {
    id: String,
    manager: Arc<WsConnectionManager>,
    /// Token for this specific connection - cancelled on force-close.
    cancel_token: CancellationToken,
}

impl ConnectionGuard {
    /// Returns the connection ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the cancellation token for this connection.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel_token
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.manager.unregister(&self.id);
    }
}
