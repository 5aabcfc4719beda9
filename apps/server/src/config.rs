//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides.

use std::path::Path;

use anyhow::{Context, Result};
use control_hub_core::HubConfig;
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Start serving right away.
    /// Override: `CONTROL_HUB_ACTIVE`
    pub active: bool,

    /// Let remote clients add, insert, select, remove and clear queue items.
    /// Override: `CONTROL_HUB_QUEUE_CONTROLLABLE`
    pub queue_controllable: bool,

    /// Advertise the hub over mDNS.
    /// Override: `CONTROL_HUB_ANNOUNCE`
    pub announce: bool,

    /// Port to bind the HTTP/WS server to (0 = ephemeral).
    /// Override: `CONTROL_HUB_PORT`
    pub port: u16,

    /// Program name published over mDNS. Defaults to the executable name.
    pub app_name: Option<String>,

    /// DNS-SD service type. Defaults to `_clapper._tcp.local.`.
    pub service_type: Option<String>,

    /// Per-connection outbound queue capacity (events).
    pub connection_queue_capacity: Option<usize>,

    /// URIs loaded into the loopback player's queue at startup.
    pub initial_queue: Vec<String>,

    /// Loopback player position tick (milliseconds).
    pub tick_interval_ms: u64,

    /// Simulated duration of every loopback item (seconds).
    pub item_duration_secs: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            active: true,
            queue_controllable: false,
            announce: true,
            port: 0,
            app_name: None,
            service_type: None,
            connection_queue_capacity: None,
            initial_queue: Vec::new(),
            tick_interval_ms: 250,
            item_duration_secs: 180.0,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Some(active) = env_bool("CONTROL_HUB_ACTIVE") {
            self.active = active;
        }

        if let Some(controllable) = env_bool("CONTROL_HUB_QUEUE_CONTROLLABLE") {
            self.queue_controllable = controllable;
        }

        if let Some(announce) = env_bool("CONTROL_HUB_ANNOUNCE") {
            self.announce = announce;
        }

        if let Ok(val) = std::env::var("CONTROL_HUB_PORT") {
            if let Ok(port) = val.parse() {
                self.port = port;
            }
        }

        // Note: CONTROL_HUB_LOG_LEVEL is handled by clap via #[arg(env = ...)] in main.rs
    }

    /// Converts to control-hub-core's HubConfig type.
    pub fn to_hub_config(&self) -> HubConfig {
        let defaults = HubConfig::default();
        HubConfig {
            active: self.active,
            queue_controllable: self.queue_controllable,
            announce: self.announce,
            preferred_port: self.port,
            app_name: self.app_name.clone().unwrap_or(defaults.app_name),
            service_type: self.service_type.clone().unwrap_or(defaults.service_type),
            connection_queue_capacity: self
                .connection_queue_capacity
                .unwrap_or(defaults.connection_queue_capacity),
        }
    }
}

fn env_bool(name: &str) -> Option<bool> {
    parse_bool(&std::env::var(name).ok()?)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
