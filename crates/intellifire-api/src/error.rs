use thiserror::Error;

/// Top-level error type for the `intellifire-api` crate.
///
/// Covers every failure mode across both transports: client-side range
/// checking, the local challenge handshake, local/cloud HTTP status mapping,
/// and cloud login. `intellifire-core` maps these into its own error type.
#[derive(Debug, Error)]
pub enum Error {
    // ── Client-side (pre-flight, never reaches the network) ─────────
    /// Command value outside its documented bounds.
    #[error("{field} is out of bounds: valid values [{min}:{max}]")]
    OutOfRange {
        field: &'static str,
        min: u16,
        max: u16,
    },

    /// API key or challenge is not valid hex.
    #[error("invalid hex in key or challenge: {0}")]
    InvalidKeyFormat(#[from] hex::FromHexError),

    // ── Local device HTTP mapping ───────────────────────────────────
    /// Device reachable but the endpoint returned 404 (firmware path
    /// mismatch).
    #[error("local endpoint not found (HTTP 404)")]
    EndpointNotFound,

    /// Response body did not parse as the expected schema.
    #[error("malformed response: {message}")]
    MalformedResponse { message: String, body: String },

    /// HTTP transport failure (connection refused, timeout, non-2xx).
    #[error("transport unavailable: {0}")]
    TransportUnavailable(#[from] reqwest::Error),

    // ── Cloud relay HTTP mapping ────────────────────────────────────
    /// 403: bad email address or authorization cookie.
    #[error("not authorized")]
    NotAuthorized,

    /// 404: fireplace not found (bad serial number).
    #[error("fireplace not found (bad serial number)")]
    DeviceNotFound,

    /// 422: invalid command id or command value.
    #[error("invalid parameter (invalid command id or command value)")]
    InvalidParameter,

    /// Any other unexpected status code.
    #[error("unexpected status code {0}")]
    UnexpectedStatus(u16),

    // ── Cloud session ───────────────────────────────────────────────
    /// Login to the cloud relay failed.
    #[error("cloud login failed (HTTP {status})")]
    LoginFailed { status: u16 },

    /// URL parsing error.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TransportUnavailable(e) => e.is_timeout() || e.is_connect(),
            Self::UnexpectedStatus(status) => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if this error indicates bad or expired credentials.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::NotAuthorized | Self::LoginFailed { .. })
    }

    /// Returns `true` if this is a "not found" error on either transport.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EndpointNotFound | Self::DeviceNotFound)
    }
}
