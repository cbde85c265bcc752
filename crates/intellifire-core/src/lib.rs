//! Stateful layer on top of `intellifire-api`: background polling per
//! transport and a unified facade over the local and cloud paths.
//!
//! - **[`LocalPoller`] / [`CloudPoller`]**: each owns one transport client,
//!   the last-known [`PollData`] snapshot, and at most one background
//!   polling task. Poll failures are counted and logged, never fatal; only
//!   an explicit stop ends the loop.
//! - **[`ApiRef`]**: tagged reference to either poller, one capability
//!   surface (poll, send, snapshot, start/stop polling) for code that does
//!   not care which transport it is on.
//! - **[`UnifiedFireplace`]**: the facade. Independent read and control
//!   transport selectors, atomic read-mode migration with snapshot
//!   carry-over, connectivity probing, and the high-level command helpers
//!   (`flame_on`, `set_thermostat_c`, …).

pub mod api;
mod control;
pub mod error;
pub mod fireplace;
pub mod poller;

pub use api::ApiRef;
pub use error::CoreError;
pub use fireplace::{FireplaceOptions, UnifiedFireplace};
pub use poller::{CloudPoller, LocalPoller};

// The facade's vocabulary comes from the api crate; re-export the types
// callers need so most of them depend on this crate alone.
pub use intellifire_api::{
    CloudPollMode, ErrorCode, FireplaceCommand, FireplaceCredentials, PollData,
    SessionCookies, TransportConfig, TransportMode,
};
