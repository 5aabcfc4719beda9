//! Server lifecycle: binding, serving, announcing and tearing down.
//!
//! Activation and deactivation are serialized by an async mutex, so
//! concurrent `set_active` calls settle in call order and repeated calls with
//! the same value are no-ops.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::{create_router, AppState, ServerError};
use crate::error::{HubError, HubResult};
use crate::hub::ControlHub;

struct RunningServer {
    port: u16,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the listener task of a [`ControlHub`].
pub struct ServerLifecycle {
    slot: Mutex<Option<RunningServer>>,
    /// Mirrors `slot.is_some()` for lock-free reads from notification paths.
    running: AtomicBool,
    port: AtomicU16,
}

impl ServerLifecycle {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            running: AtomicBool::new(false),
            port: AtomicU16::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn port(&self) -> Option<u16> {
        match self.port.load(Ordering::SeqCst) {
            0 => None,
            port => Some(port),
        }
    }

    /// Binds, starts serving and announces. Returns the bound port.
    pub async fn activate(&self, hub: &Arc<ControlHub>) -> HubResult<u16> {
        let mut slot = self.slot.lock().await;
        if let Some(running) = slot.as_ref() {
            log::debug!("[Lifecycle] Already running on port {}", running.port);
            return Ok(running.port);
        }

        let (listener, port) = match bind(hub.config().preferred_port).await {
            Ok(bound) => bound,
            Err(e) => {
                let err = HubError::Server(e.to_string());
                log::error!("[Lifecycle] {}", err);
                hub.controller().report_error(&err);
                return Err(err);
            }
        };

        let shutdown = CancellationToken::new();
        let app = create_router(AppState::new(hub));
        let controller = Arc::clone(hub.controller());
        let server_shutdown = shutdown.clone();

        self.running.store(true, Ordering::SeqCst);
        self.port.store(port, Ordering::SeqCst);

        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(server_shutdown.cancelled_owned())
                .await;
            if let Err(e) = result {
                let err = HubError::Server(e.to_string());
                log::error!("[Lifecycle] {}", err);
                controller.report_error(&err);
            }
        });

        if hub.config().announce {
            hub.announcer().start(port);
        }

        log::info!("[Lifecycle] Control hub listening on http://0.0.0.0:{}", port);
        *slot = Some(RunningServer {
            port,
            shutdown,
            task,
        });
        Ok(port)
    }

    /// Stops announcing, stops the listener and closes every connection.
    pub async fn deactivate(&self, hub: &ControlHub) {
        let mut slot = self.slot.lock().await;
        let Some(running) = slot.take() else {
            log::debug!("[Lifecycle] Not running");
            return;
        };

        self.running.store(false, Ordering::SeqCst);
        if let Some(announcer) = hub.existing_announcer() {
            announcer.stop();
        }

        running.shutdown.cancel();
        hub.connections().close_all();
        if let Err(e) = running.task.await {
            log::warn!("[Lifecycle] Server task ended abnormally: {}", e);
        }

        self.port.store(0, Ordering::SeqCst);
        log::info!("[Lifecycle] Control hub on port {} stopped", running.port);
    }
}

impl ServerLifecycle {
    /// Signals the listener to stop without waiting for it. Used when the
    /// owning hub is dropped while active. Returns whether a server was running.
    pub(crate) fn abandon(&mut self) -> bool {
        let Some(running) = self.slot.get_mut().take() else {
            return false;
        };
        self.running.store(false, Ordering::SeqCst);
        self.port.store(0, Ordering::SeqCst);
        running.shutdown.cancel();
        log::info!("[Lifecycle] Control hub on port {} abandoned", running.port);
        true
    }
}

impl Default for ServerLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Binds all interfaces on `preferred_port` (0 = ephemeral).
async fn bind(preferred_port: u16) -> Result<(TcpListener, u16), ServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], preferred_port));
    let listener = TcpListener::bind(addr).await?;
    let port = listener.local_addr()?.port();
    Ok((listener, port))
}
