// Shared transport configuration for building reqwest::Client instances.
//
// The local and cloud clients share timeout and TLS settings through this
// module, avoiding duplicated builder logic.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;

use crate::error::Error;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout applied to the built client. Individual calls
    /// (challenge fetch, long poll) override this per request.
    pub timeout: Duration,
    /// Verify TLS certificates when talking to the cloud relay. Disable only
    /// on networks that intercept TLS.
    pub verify_ssl: bool,
    pub cookie_jar: Option<Arc<Jar>>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            verify_ssl: true,
            cookie_jar: None,
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(crate::USER_AGENT);

        if !self.verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ref jar) = self.cookie_jar {
            builder = builder.cookie_provider(Arc::clone(jar));
        }

        builder.build().map_err(Error::TransportUnavailable)
    }

    /// Create a config with a fresh cookie jar (for session auth).
    pub fn with_cookie_jar(mut self) -> Self {
        self.cookie_jar = Some(Arc::new(Jar::default()));
        self
    }

    /// Replace the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
