//! Async HTTP clients for IntelliFire fireplaces.
//!
//! A fireplace is reachable two ways, and this crate speaks both protocols:
//!
//! - **[`LocalClient`]**: device-hosted HTTP endpoints on the LAN. Reads are
//!   an unauthenticated `GET /poll`; control commands require the vendor's
//!   challenge/response handshake (`GET /get_challenge`, then a double-SHA256
//!   signed `POST /post`, see [`sign`]).
//! - **[`CloudClient`]**: the vendor cloud relay (`iftapi.net`), cookie
//!   authenticated, with both fixed-cadence polling (`apppoll`) and a
//!   server-side blocking long poll (`applongpoll`).
//!
//! [`CloudSession`] handles login and fireplace enumeration, producing the
//! [`FireplaceCredentials`] both clients are built from. The clients here are
//! stateless request/response wrappers; `intellifire-core` layers background
//! polling and the unified local/cloud facade on top.

pub mod cloud;
pub mod command;
pub mod error;
pub mod local;
pub mod model;
pub mod session;
pub mod sign;
pub mod transport;

pub use cloud::CloudClient;
pub use command::FireplaceCommand;
pub use error::Error;
pub use local::LocalClient;
pub use model::{
    CloudFireplace, CloudPollMode, ErrorCode, FireplaceCredentials, Location, PollData,
    SessionCookies, TransportMode,
};
pub use session::CloudSession;
pub use transport::TransportConfig;

/// User agent sent on every request.
pub const USER_AGENT: &str = concat!("intellifire-rs/", env!("CARGO_PKG_VERSION"));

/// Default base URL of the vendor cloud relay.
pub const CLOUD_BASE_URL: &str = "https://iftapi.net/";
