//! mDNS service advertisement for network discovery.
//!
//! The announcer runs as a background task owning the mDNS daemon. Callers
//! send `start`/`stop` commands and never block on network I/O. The daemon
//! itself answers PTR/SRV/TXT/A/AAAA queries, picking addresses per interface
//! and per family.
//!
//! This is best-effort - failure is reported to the player but doesn't
//! prevent the server from running.

use std::collections::HashMap;
use std::sync::Arc;

use mdns_sd::{ServiceDaemon, ServiceInfo};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::HubError;
use crate::player::PlayerController;
use crate::protocol_constants::{TXT_APP, TXT_HUB_VERSION, TXT_ID, TXT_PLAYER_VERSION};

/// Who is being announced. Records are derived from this on first start.
#[derive(Debug, Clone)]
pub struct AnnouncerIdentity {
    /// Machine hostname, as reported by the OS.
    pub host: String,
    /// Program name of the hosting application.
    pub program: String,
    /// Hub object name (`controlhubN`).
    pub hub_name: String,
    pub player_version: String,
    pub service_type: String,
}

impl AnnouncerIdentity {
    pub fn new(
        program: &str,
        hub_name: &str,
        player_version: String,
        service_type: &str,
    ) -> Self {
        let host = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        Self {
            host,
            program: program.to_string(),
            hub_name: hub_name.to_string(),
            player_version,
            service_type: service_type.to_string(),
        }
    }
}

/// DNS-SD records for one hub, computed once per announcer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncerRecords {
    pub service_type: String,
    /// `<host> <program> <hub-name>`
    pub instance_name: String,
    /// `<sanitized-host>.local.`
    pub host_name: String,
    pub properties: HashMap<String, String>,
}

impl AnnouncerRecords {
    pub fn build(identity: &AnnouncerIdentity) -> Self {
        let instance_name = format!(
            "{} {} {}",
            identity.host, identity.program, identity.hub_name
        );

        let mut properties = HashMap::new();
        properties.insert(TXT_APP.to_string(), identity.program.clone());
        properties.insert(
            TXT_PLAYER_VERSION.to_string(),
            identity.player_version.clone(),
        );
        properties.insert(
            TXT_HUB_VERSION.to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        properties.insert(
            TXT_ID.to_string(),
            format!(
                "{}-{}-{}",
                identity.host, identity.program, identity.hub_name
            ),
        );

        Self {
            service_type: identity.service_type.clone(),
            instance_name,
            host_name: format!("{}.local.", sanitize_hostname(&identity.host)),
            properties,
        }
    }

    /// Service description for `port`, with addresses resolved by the daemon.
    ///
    /// Records carry mdns-sd's default TTLs (120 s host, 4500 s PTR/SRV/TXT);
    /// the crate does not expose setters for them.
    fn service_info(&self, port: u16) -> Result<ServiceInfo, mdns_sd::Error> {
        let info = ServiceInfo::new(
            &self.service_type,
            &self.instance_name,
            &self.host_name,
            "",
            port,
            Some(self.properties.clone()),
        )?;
        Ok(info.enable_addr_auto())
    }
}

/// Sanitize hostname for DNS (lowercase, no spaces).
fn sanitize_hostname(host: &str) -> String {
    let sanitized: String = host
        .to_lowercase()
        .replace(' ', "-")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if sanitized.is_empty() {
        "localhost".to_string()
    } else {
        sanitized
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Registry
// ─────────────────────────────────────────────────────────────────────────────

/// The part of an mDNS responder the announcer drives.
trait ServiceRegistry: Send {
    fn register(&self, service: ServiceInfo) -> Result<(), HubError>;

    fn unregister(&self, fullname: &str) -> Result<(), HubError>;

    fn shutdown(&self) -> Result<(), HubError>;
}

impl ServiceRegistry for ServiceDaemon {
    fn register(&self, service: ServiceInfo) -> Result<(), HubError> {
        ServiceDaemon::register(self, service).map_err(|e| HubError::Announcer(e.to_string()))
    }

    fn unregister(&self, fullname: &str) -> Result<(), HubError> {
        ServiceDaemon::unregister(self, fullname)
            .map(|_| ())
            .map_err(|e| HubError::Announcer(e.to_string()))
    }

    fn shutdown(&self) -> Result<(), HubError> {
        ServiceDaemon::shutdown(self)
            .map(|_| ())
            .map_err(|e| HubError::Announcer(e.to_string()))
    }
}

/// Opens the registry on first registration.
type RegistryFactory = Box<dyn FnMut() -> Result<Box<dyn ServiceRegistry>, HubError> + Send>;

fn open_daemon() -> Result<Box<dyn ServiceRegistry>, HubError> {
    let daemon = ServiceDaemon::new()
        .map_err(|e| HubError::Announcer(format!("mDNS daemon unavailable: {}", e)))?;
    Ok(Box::new(daemon))
}

// ─────────────────────────────────────────────────────────────────────────────
// Announcer Task
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
enum AnnouncerCommand {
    Start { port: u16 },
    Stop,
}

/// Handle to the background announcer task.
///
/// Dropping the handle unregisters the service and shuts the daemon down.
pub struct Announcer {
    tx: mpsc::UnboundedSender<AnnouncerCommand>,
    cancel: CancellationToken,
}

impl Announcer {
    /// Spawns the announcer task. Must be called from within a Tokio runtime.
    pub fn spawn(identity: AnnouncerIdentity, controller: Arc<dyn PlayerController>) -> Self {
        Self::spawn_with(AnnouncerTask::new(identity, controller, Box::new(open_daemon)))
    }

    fn spawn_with(task: AnnouncerTask) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        tokio::spawn(task.run(rx, cancel.clone()));
        Self { tx, cancel }
    }

    /// Announces the service on `port`, replacing an announcement on another port.
    pub fn start(&self, port: u16) {
        if self.tx.send(AnnouncerCommand::Start { port }).is_err() {
            log::warn!("[mDNS] Announcer task gone, cannot start");
        }
    }

    /// Withdraws the announcement (goodbye packets are sent by the daemon).
    pub fn stop(&self) {
        if self.tx.send(AnnouncerCommand::Stop).is_err() {
            log::debug!("[mDNS] Announcer task gone, nothing to stop");
        }
    }
}

impl Drop for Announcer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Registration {
    port: u16,
    fullname: String,
}

struct AnnouncerTask {
    identity: AnnouncerIdentity,
    controller: Arc<dyn PlayerController>,
    records: Option<AnnouncerRecords>,
    open_registry: RegistryFactory,
    daemon: Option<Box<dyn ServiceRegistry>>,
    registered: Option<Registration>,
}

impl AnnouncerTask {
    fn new(
        identity: AnnouncerIdentity,
        controller: Arc<dyn PlayerController>,
        open_registry: RegistryFactory,
    ) -> Self {
        Self {
            identity,
            controller,
            records: None,
            open_registry,
            daemon: None,
            registered: None,
        }
    }

    async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<AnnouncerCommand>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                command = rx.recv() => match command {
                    Some(AnnouncerCommand::Start { port }) => self.start(port),
                    Some(AnnouncerCommand::Stop) => self.unregister(),
                    None => break,
                },
            }
        }
        self.shutdown();
    }

    fn start(&mut self, port: u16) {
        if let Some(registration) = &self.registered {
            if registration.port == port {
                log::debug!("[mDNS] Already announcing on port {}", port);
                return;
            }
            self.unregister();
        }

        if let Err(e) = self.register(port) {
            log::warn!("[mDNS] Announcement failed: {}", e);
            self.controller.report_error(&e);
        }
    }

    fn register(&mut self, port: u16) -> Result<(), HubError> {
        if self.daemon.is_none() {
            self.daemon = Some((self.open_registry)()?);
        }
        let daemon = self
            .daemon
            .as_ref()
            .ok_or_else(|| HubError::Announcer("mDNS daemon unavailable".into()))?;

        let records = self
            .records
            .get_or_insert_with(|| AnnouncerRecords::build(&self.identity));
        let service = records
            .service_info(port)
            .map_err(|e| HubError::Announcer(e.to_string()))?;
        let fullname = service.get_fullname().to_string();
        daemon.register(service)?;

        log::info!(
            "[mDNS] Advertising '{}' on port {}",
            records.instance_name,
            port
        );
        self.registered = Some(Registration { port, fullname });
        Ok(())
    }

    fn unregister(&mut self) {
        let (Some(registration), Some(daemon)) = (self.registered.take(), &self.daemon) else {
            return;
        };
        match daemon.unregister(&registration.fullname) {
            Ok(()) => log::info!("[mDNS] Withdrew announcement on port {}", registration.port),
            Err(e) => log::warn!("[mDNS] Failed to unregister service: {}", e),
        }
    }

    fn shutdown(&mut self) {
        self.unregister();
        if let Some(daemon) = self.daemon.take() {
            if let Err(e) = daemon.shutdown() {
                log::debug!("[mDNS] Daemon shutdown failed: {}", e);
            }
        }
    }
}
