//! HTTP/WebSocket API layer.
//!
//! This module contains thin handlers that delegate to the [`ControlHub`].
//! It provides the router construction used by the lifecycle controller.

use std::sync::{Arc, Weak};

use thiserror::Error;

use crate::error::{HubError, HubResult};
use crate::hub::ControlHub;

pub mod http;
pub mod ws;
pub mod ws_connection;

pub use http::create_router;
pub use ws_connection::WsConnectionManager;

/// Errors that can occur when starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),
}

/// Shared application state for the API layer.
///
/// Holds the hub weakly so a running server never keeps it alive.
#[derive(Clone)]
pub struct AppState {
    hub: Weak<ControlHub>,
}

impl AppState {
    pub fn new(hub: &Arc<ControlHub>) -> Self {
        Self {
            hub: Arc::downgrade(hub),
        }
    }

    /// The hub, or [`HubError::Unavailable`] once it has been dropped.
    pub fn hub(&self) -> HubResult<Arc<ControlHub>> {
        self.hub.upgrade().ok_or(HubError::Unavailable)
    }

    pub(crate) fn weak_hub(&self) -> Weak<ControlHub> {
        self.hub.clone()
    }
}
