// ── Unified facade ──
//
// One `UnifiedFireplace` per appliance, owning one poller per transport.
// Reads go through whichever poller `read_mode` selects, commands through
// `control_mode`; the two are independent and may differ. Switching the
// read transport carries the last snapshot over so readers see continuity,
// never a reset to defaults.

use std::sync::atomic::AtomicU16;
use std::sync::Arc;
use std::time::Duration;

use intellifire_api::{
    CloudClient, CloudPollMode, FireplaceCommand, FireplaceCredentials, LocalClient,
    PollData, TransportConfig, TransportMode, CLOUD_BASE_URL,
};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::api::ApiRef;
use crate::error::CoreError;
use crate::poller::{
    CloudPoller, LocalPoller, DEFAULT_CLOUD_INTERVAL, DEFAULT_LOCAL_INTERVAL,
};

/// Initial remembered thermostat setpoint (21.00 °C), used when the
/// thermostat is turned back on before any explicit setpoint was issued.
pub(crate) const DEFAULT_REMEMBERED_SETPOINT: u16 = 2100;

/// Construction-time knobs for [`UnifiedFireplace`].
#[derive(Debug, Clone)]
pub struct FireplaceOptions {
    pub transport: TransportConfig,
    /// Relay base URL; tests point this at a mock server.
    pub cloud_base_url: String,
    pub local_interval: Duration,
    pub cloud_interval: Duration,
    pub cloud_poll_mode: CloudPollMode,
    /// Per-transport timeout of the connectivity probe.
    pub probe_timeout: Duration,
}

impl Default for FireplaceOptions {
    fn default() -> Self {
        Self {
            transport: TransportConfig::default(),
            cloud_base_url: CLOUD_BASE_URL.to_owned(),
            local_interval: DEFAULT_LOCAL_INTERVAL,
            cloud_interval: DEFAULT_CLOUD_INTERVAL,
            cloud_poll_mode: CloudPollMode::default(),
            probe_timeout: Duration::from_secs(10),
        }
    }
}

/// Facade over one fireplace reachable through both transports.
#[derive(Debug)]
pub struct UnifiedFireplace {
    credentials: FireplaceCredentials,
    local: LocalPoller,
    cloud: CloudPoller,
    read_mode: watch::Sender<TransportMode>,
    control_mode: watch::Sender<TransportMode>,
    pub(crate) remembered_setpoint: AtomicU16,
}

impl UnifiedFireplace {
    /// Build the facade without touching the network. Background polling
    /// starts on the first `start_background_polling` /
    /// [`connect`](Self::connect) call.
    pub fn new(
        credentials: FireplaceCredentials,
        options: &FireplaceOptions,
    ) -> Result<Self, CoreError> {
        let local_client = LocalClient::from_credentials(&credentials, &options.transport)?;
        let cloud_client = CloudClient::new(
            &options.cloud_base_url,
            credentials.serial.clone(),
            &credentials.cookies,
            &options.transport,
        )?;

        let (read_mode, _) = watch::channel(credentials.read_mode);
        let (control_mode, _) = watch::channel(credentials.control_mode);

        Ok(Self {
            credentials,
            local: LocalPoller::new(local_client, options.local_interval),
            cloud: CloudPoller::new(
                cloud_client,
                options.cloud_interval,
                options.cloud_poll_mode,
            ),
            read_mode,
            control_mode,
            remembered_setpoint: AtomicU16::new(DEFAULT_REMEMBERED_SETPOINT),
        })
    }

    /// Build, probe both transports, pick working modes, and start
    /// background polling on the read transport.
    ///
    /// When only one transport answers, both modes fall back to it
    /// regardless of what the credentials requested. When neither answers,
    /// fails with [`CoreError::NoConnectivity`].
    pub async fn connect(
        credentials: FireplaceCredentials,
        options: &FireplaceOptions,
    ) -> Result<Self, CoreError> {
        let fireplace = Self::new(credentials, options)?;
        let (local_ok, cloud_ok) =
            fireplace.validate_connectivity(options.probe_timeout).await;

        let (read, control) = match (local_ok, cloud_ok) {
            (false, false) => return Err(CoreError::NoConnectivity),
            (true, false) => (TransportMode::Local, TransportMode::Local),
            (false, true) => (TransportMode::Cloud, TransportMode::Cloud),
            (true, true) => (
                fireplace.credentials.read_mode,
                fireplace.credentials.control_mode,
            ),
        };
        info!(serial = fireplace.credentials.serial, local_ok, cloud_ok,
              read_mode = %read, control_mode = %control, "fireplace connected");
        fireplace.read_mode.send_replace(read);
        fireplace.control_mode.send_replace(control);

        if read != TransportMode::None {
            fireplace.read_api().start_background_polling().await;
        }
        Ok(fireplace)
    }

    pub fn credentials(&self) -> &FireplaceCredentials {
        &self.credentials
    }

    pub fn serial(&self) -> &str {
        &self.credentials.serial
    }

    pub fn read_mode(&self) -> TransportMode {
        *self.read_mode.borrow()
    }

    pub fn control_mode(&self) -> TransportMode {
        *self.control_mode.borrow()
    }

    /// Watch for read-mode changes.
    pub fn subscribe_read_mode(&self) -> watch::Receiver<TransportMode> {
        self.read_mode.subscribe()
    }

    /// Watch for control-mode changes.
    pub fn subscribe_control_mode(&self) -> watch::Receiver<TransportMode> {
        self.control_mode.subscribe()
    }

    fn poller_for(&self, mode: TransportMode) -> Option<ApiRef<'_>> {
        match mode {
            TransportMode::Local => Some(ApiRef::Local(&self.local)),
            TransportMode::Cloud => Some(ApiRef::Cloud(&self.cloud)),
            TransportMode::None => None,
        }
    }

    /// The poller backing reads. When `read_mode` is `None`, the local
    /// poller's snapshot is served by convention.
    pub fn read_api(&self) -> ApiRef<'_> {
        self.poller_for(self.read_mode())
            .unwrap_or(ApiRef::Local(&self.local))
    }

    /// The poller commands are sent through, independent of `read_mode`.
    pub fn control_api(&self) -> ApiRef<'_> {
        self.poller_for(self.control_mode())
            .unwrap_or(ApiRef::Local(&self.local))
    }

    /// Last-known state snapshot from the read transport.
    pub fn data(&self) -> Arc<PollData> {
        let data = self.read_api().data();
        if !data.is_initialized() {
            warn!(
                serial = self.credentials.serial,
                "reading fireplace state before the first successful poll"
            );
        }
        data
    }

    /// Switch which transport backs reads.
    ///
    /// A no-op when the mode is unchanged. Otherwise the active poller is
    /// stopped, its last snapshot is copied into the new poller, and the
    /// new poller's background loop is started before the mode flips.
    pub async fn set_read_mode(&self, mode: TransportMode) {
        let current = self.read_mode();
        if current == mode {
            debug!(%mode, "read mode unchanged");
            return;
        }

        let snapshot = (*self.read_api().data()).clone();
        if let Some(old) = self.poller_for(current) {
            old.stop_background_polling().await;
        }
        if let Some(new) = self.poller_for(mode) {
            new.set_data(snapshot);
            new.start_background_polling().await;
        }
        self.read_mode.send_replace(mode);
        info!(from = %current, to = %mode, "read transport switched");
    }

    /// Switch which transport commands go through. Pure metadata, takes
    /// effect for the next command.
    pub fn set_control_mode(&self, mode: TransportMode) {
        let current = self.control_mode();
        if current == mode {
            return;
        }
        self.control_mode.send_replace(mode);
        info!(from = %current, to = %mode, "control transport switched");
    }

    /// Send one command through the control transport.
    pub async fn send_command(
        &self,
        command: FireplaceCommand,
        value: u16,
    ) -> Result<(), CoreError> {
        self.control_api().send_command(command, value).await
    }

    /// Probe both transports concurrently with independent timeouts.
    ///
    /// Never fails: every error mode (timeout, connection refused, HTTP
    /// error) collapses to `false` for that transport. A successful probe
    /// also refreshes that poller's snapshot.
    pub async fn validate_connectivity(&self, probe_timeout: Duration) -> (bool, bool) {
        let local_probe = async {
            matches!(timeout(probe_timeout, self.local.poll_once()).await, Ok(Ok(_)))
        };
        let cloud_probe = async {
            matches!(timeout(probe_timeout, self.cloud.poll_once()).await, Ok(Ok(_)))
        };
        let (local_ok, cloud_ok) = tokio::join!(local_probe, cloud_probe);
        debug!(local_ok, cloud_ok, "connectivity probe finished");
        (local_ok, cloud_ok)
    }

    /// Start background polling on the read transport. No-op if already
    /// running.
    pub async fn start_background_polling(&self) -> bool {
        self.read_api().start_background_polling().await
    }

    /// Stop background polling on the read transport.
    pub async fn stop_background_polling(&self) -> bool {
        self.read_api().stop_background_polling().await
    }

    pub fn is_polling_in_background(&self) -> bool {
        self.read_api().is_polling_in_background()
    }

    /// Stop every background task on both transports.
    pub async fn shutdown(&self) {
        self.local.stop_background_polling().await;
        self.cloud.stop_background_polling().await;
    }
}
