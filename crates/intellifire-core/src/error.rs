use thiserror::Error;

/// Errors surfaced by the stateful layer.
///
/// Background poll failures never appear here; they are counted and logged
/// inside the polling loops. What reaches the caller is either a transport
/// error from a synchronous operation (one-shot poll, command send) or the
/// facade finding the fireplace unreachable everywhere.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Neither transport answered the connectivity probe.
    #[error("fireplace unreachable over both local and cloud transports")]
    NoConnectivity,

    /// An underlying transport or protocol error.
    #[error(transparent)]
    Api(#[from] intellifire_api::Error),
}

impl CoreError {
    /// Returns `true` if retrying later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::NoConnectivity => true,
            Self::Api(err) => err.is_transient(),
        }
    }
}
