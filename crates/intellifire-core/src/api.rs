// ── Transport capability surface ──
//
// The two pollers have identical shapes but concrete types. `ApiRef` is a
// tagged reference over them so the facade (and callers that do not care
// which transport they are on) can poll, send, and manage background
// polling through one surface instead of matching on the transport
// everywhere.

use std::sync::Arc;

use intellifire_api::{FireplaceCommand, PollData};

use crate::error::CoreError;
use crate::poller::{CloudPoller, LocalPoller};

/// Reference to whichever poller currently backs an operation.
#[derive(Clone, Copy)]
pub enum ApiRef<'a> {
    Local(&'a LocalPoller),
    Cloud(&'a CloudPoller),
}

impl ApiRef<'_> {
    /// One-shot poll refreshing the poller's stored snapshot.
    pub async fn poll_once(&self) -> Result<PollData, CoreError> {
        match self {
            Self::Local(poller) => poller.poll_once().await,
            Self::Cloud(poller) => poller.poll_once().await,
        }
    }

    /// Send one command through this transport.
    pub async fn send_command(
        &self,
        command: FireplaceCommand,
        value: u16,
    ) -> Result<(), CoreError> {
        match self {
            Self::Local(poller) => poller.send_command(command, value).await,
            Self::Cloud(poller) => poller.send_command(command, value).await,
        }
    }

    /// Last-known snapshot of this transport.
    pub fn data(&self) -> Arc<PollData> {
        match self {
            Self::Local(poller) => poller.data(),
            Self::Cloud(poller) => poller.data(),
        }
    }

    /// Replace this transport's visible snapshot (read-mode carry-over).
    pub fn set_data(&self, data: PollData) {
        match self {
            Self::Local(poller) => poller.set_data(data),
            Self::Cloud(poller) => poller.set_data(data),
        }
    }

    pub async fn start_background_polling(&self) -> bool {
        match self {
            Self::Local(poller) => poller.start_background_polling().await,
            Self::Cloud(poller) => poller.start_background_polling().await,
        }
    }

    pub async fn stop_background_polling(&self) -> bool {
        match self {
            Self::Local(poller) => poller.stop_background_polling().await,
            Self::Cloud(poller) => poller.stop_background_polling().await,
        }
    }

    pub fn is_polling_in_background(&self) -> bool {
        match self {
            Self::Local(poller) => poller.is_polling_in_background(),
            Self::Cloud(poller) => poller.is_polling_in_background(),
        }
    }

    pub fn failed_poll_attempts(&self) -> u32 {
        match self {
            Self::Local(poller) => poller.failed_poll_attempts(),
            Self::Cloud(poller) => poller.failed_poll_attempts(),
        }
    }
}
