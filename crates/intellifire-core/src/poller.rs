// ── Background pollers ──
//
// One poller per transport. Each owns its client, its own last-known
// snapshot, and at most one background task. The loops follow the same
// cadence contract: `t0 = now; poll; sleep(max(0, interval - elapsed))`,
// and a failed iteration increments a counter and keeps looping. Only
// `stop_background_polling` (or dropping the runtime) ends a loop.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, Utc};
use intellifire_api::{
    CloudClient, CloudPollMode, FireplaceCommand, LocalClient, PollData,
};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::CoreError;

/// Default cadence of the local background loop.
pub const DEFAULT_LOCAL_INTERVAL: Duration = Duration::from_secs(15);
/// Default cadence of the cloud background loop (short-poll mode).
pub const DEFAULT_CLOUD_INTERVAL: Duration = Duration::from_secs(10);

/// State shared between a poller and its background task.
#[derive(Debug)]
struct PollerState {
    data: ArcSwap<PollData>,
    last_poll: ArcSwapOption<DateTime<Utc>>,
    failed_polls: AtomicU32,
    should_run: AtomicBool,
}

impl PollerState {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            data: ArcSwap::from_pointee(PollData::default()),
            last_poll: ArcSwapOption::empty(),
            failed_polls: AtomicU32::new(0),
            should_run: AtomicBool::new(false),
        })
    }

    fn record_success(&self, data: PollData) {
        self.data.store(Arc::new(data));
        self.last_poll.store(Some(Arc::new(Utc::now())));
        self.failed_polls.store(0, Ordering::Relaxed);
    }

    fn record_failure(&self) -> u32 {
        self.failed_polls.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[derive(Debug)]
struct PollTask {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

async fn stop_task(state: &PollerState, task: &Mutex<Option<PollTask>>) -> bool {
    let mut slot = task.lock().await;
    state.should_run.store(false, Ordering::SeqCst);
    let Some(PollTask { handle, cancel }) = slot.take() else {
        return false;
    };
    cancel.cancel();
    if let Err(err) = handle.await {
        if !err.is_cancelled() {
            warn!(%err, "background poll task did not shut down cleanly");
        }
    }
    true
}

// ── Local ───────────────────────────────────────────────────────────

/// Background poller for the LAN transport.
///
/// Command sends pause the background loop first and resume it after: the
/// device firmware cannot reliably serve a poll and the challenge handshake
/// at the same time.
#[derive(Debug)]
pub struct LocalPoller {
    client: LocalClient,
    interval: Duration,
    state: Arc<PollerState>,
    task: Mutex<Option<PollTask>>,
}

impl LocalPoller {
    pub fn new(client: LocalClient, interval: Duration) -> Self {
        Self {
            client,
            interval,
            state: PollerState::new(),
            task: Mutex::new(None),
        }
    }

    /// Last-known snapshot (the default sentinel before the first
    /// successful poll).
    pub fn data(&self) -> Arc<PollData> {
        self.state.data.load_full()
    }

    /// Replace the visible snapshot, used for carry-over when the facade
    /// switches read transports.
    pub fn set_data(&self, data: PollData) {
        self.state.data.store(Arc::new(data));
    }

    pub fn failed_poll_attempts(&self) -> u32 {
        self.state.failed_polls.load(Ordering::Relaxed)
    }

    /// When the last successful poll happened, if any.
    pub fn last_poll_at(&self) -> Option<DateTime<Utc>> {
        self.state.last_poll.load_full().map(|ts| *ts)
    }

    pub fn is_polling_in_background(&self) -> bool {
        self.state.should_run.load(Ordering::SeqCst)
    }

    /// One-shot poll that also refreshes the stored snapshot.
    pub async fn poll_once(&self) -> Result<PollData, CoreError> {
        let data = self.client.poll(true).await?;
        self.state.record_success(data.clone());
        Ok(data)
    }

    /// Start the background loop. Returns `false` (and does nothing) if it
    /// is already running.
    pub async fn start_background_polling(&self) -> bool {
        let mut slot = self.task.lock().await;
        if slot.is_some() {
            debug!("local background polling already running");
            return false;
        }
        self.state.should_run.store(true, Ordering::SeqCst);

        let client = self.client.clone();
        let state = Arc::clone(&self.state);
        let interval = self.interval;
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        info!(interval_s = interval.as_secs(), "starting local background polling");
        let handle = tokio::spawn(async move {
            while state.should_run.load(Ordering::SeqCst) {
                let started = Instant::now();
                match client.poll(true).await {
                    Ok(data) => state.record_success(data),
                    Err(err) => {
                        let failed = state.record_failure();
                        warn!(%err, failed, "local poll failed");
                    }
                }
                if !state.should_run.load(Ordering::SeqCst) {
                    break;
                }
                let delay = interval.saturating_sub(started.elapsed());
                tokio::select! {
                    () = token.cancelled() => break,
                    () = sleep(delay) => {}
                }
            }
            debug!("local polling loop exited");
        });

        *slot = Some(PollTask { handle, cancel });
        true
    }

    /// Stop the background loop and wait for it to exit. Returns `false`
    /// if it was not running.
    pub async fn stop_background_polling(&self) -> bool {
        stop_task(&self.state, &self.task).await
    }

    /// Send one command, pausing background polling around the handshake.
    ///
    /// Polling is only resumed after a successful send; the handshake
    /// itself retries transparently inside the client.
    pub async fn send_command(
        &self,
        command: FireplaceCommand,
        value: u16,
    ) -> Result<(), CoreError> {
        command.range_check(value)?;

        let was_polling = self.stop_background_polling().await;
        self.client.send_command(command, value).await?;

        // Credential-less sends are dropped inside the client; a snapshot
        // patch would then show state the device never saw.
        if !self.client.needs_login() {
            let patched = self.state.data.load().with_command_applied(command, value);
            self.state.data.store(Arc::new(patched));
        }

        if was_polling {
            self.start_background_polling().await;
        }
        Ok(())
    }
}

// ── Cloud ───────────────────────────────────────────────────────────

/// Background poller for the cloud relay.
///
/// [`CloudPollMode::Short`] runs a fixed cadence; [`CloudPollMode::Long`]
/// chains long polls back to back and only backs off after a failure.
/// Sends need no pause: the relay serves reads and writes concurrently.
#[derive(Debug)]
pub struct CloudPoller {
    client: CloudClient,
    interval: Duration,
    mode: CloudPollMode,
    state: Arc<PollerState>,
    task: Mutex<Option<PollTask>>,
}

impl CloudPoller {
    pub fn new(client: CloudClient, interval: Duration, mode: CloudPollMode) -> Self {
        Self {
            client,
            interval,
            mode,
            state: PollerState::new(),
            task: Mutex::new(None),
        }
    }

    pub fn data(&self) -> Arc<PollData> {
        self.state.data.load_full()
    }

    pub fn set_data(&self, data: PollData) {
        self.state.data.store(Arc::new(data));
    }

    pub fn failed_poll_attempts(&self) -> u32 {
        self.state.failed_polls.load(Ordering::Relaxed)
    }

    pub fn last_poll_at(&self) -> Option<DateTime<Utc>> {
        self.state.last_poll.load_full().map(|ts| *ts)
    }

    pub fn is_polling_in_background(&self) -> bool {
        self.state.should_run.load(Ordering::SeqCst)
    }

    pub async fn poll_once(&self) -> Result<PollData, CoreError> {
        let data = self.client.poll().await?;
        self.state.record_success(data.clone());
        Ok(data)
    }

    pub async fn start_background_polling(&self) -> bool {
        let mut slot = self.task.lock().await;
        if slot.is_some() {
            debug!("cloud background polling already running");
            return false;
        }
        self.state.should_run.store(true, Ordering::SeqCst);

        let client = self.client.clone();
        let state = Arc::clone(&self.state);
        let interval = self.interval;
        let mode = self.mode;
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        info!(%mode, interval_s = interval.as_secs(), "starting cloud background polling");
        let handle = tokio::spawn(async move {
            while state.should_run.load(Ordering::SeqCst) {
                let started = Instant::now();
                let outcome = match mode {
                    CloudPollMode::Short => client.poll().await.map(Some),
                    CloudPollMode::Long => client.long_poll().await,
                };
                let failed = match outcome {
                    Ok(Some(data)) => {
                        state.record_success(data);
                        false
                    }
                    // Long poll window elapsed with no state change.
                    Ok(None) => false,
                    Err(err) => {
                        let failed = state.record_failure();
                        warn!(%err, failed, "cloud poll failed");
                        true
                    }
                };
                if !state.should_run.load(Ordering::SeqCst) {
                    break;
                }
                let delay = match mode {
                    CloudPollMode::Short => interval.saturating_sub(started.elapsed()),
                    // Long polls block server-side; re-issue immediately
                    // unless the last one errored.
                    CloudPollMode::Long if failed => interval,
                    CloudPollMode::Long => Duration::ZERO,
                };
                tokio::select! {
                    () = token.cancelled() => break,
                    () = sleep(delay) => {}
                }
            }
            debug!("cloud polling loop exited");
        });

        *slot = Some(PollTask { handle, cancel });
        true
    }

    pub async fn stop_background_polling(&self) -> bool {
        stop_task(&self.state, &self.task).await
    }

    /// Send one command through the relay; polling keeps running.
    pub async fn send_command(
        &self,
        command: FireplaceCommand,
        value: u16,
    ) -> Result<(), CoreError> {
        command.range_check(value)?;
        self.client.send_command(command, value).await?;

        if !self.client.needs_login() {
            let patched = self.state.data.load().with_command_applied(command, value);
            self.state.data.store(Arc::new(patched));
        }
        Ok(())
    }
}
