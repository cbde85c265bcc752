// ── Local (LAN) transport ──
//
// Talks HTTP directly to the fireplace module on the home network:
//
//   GET  /poll           full state snapshot, no auth
//   GET  /get_challenge  short-lived hex nonce for signing
//   POST /post           signed control command
//
// The firmware is slow and single-threaded; challenges expire after a few
// seconds and a mid-handshake 403 just means "sign against a fresh nonce".
// Command delivery therefore retries until the device accepts, it never
// gives up on a transient failure.

use std::time::Duration;

use reqwest::StatusCode;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};
use url::Url;

use crate::command::FireplaceCommand;
use crate::error::Error;
use crate::model::{FireplaceCredentials, PollData};
use crate::sign;
use crate::transport::TransportConfig;

/// The firmware answers `/get_challenge` fast or not at all.
const CHALLENGE_TIMEOUT: Duration = Duration::from_secs(3);
/// Per-attempt cap on the signed POST.
const POST_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);
/// How long a fetched challenge is worth retrying against before signing a
/// fresh one.
const CHALLENGE_BUDGET: Duration = Duration::from_secs(5);
const POST_RETRY_DELAY: Duration = Duration::from_millis(200);
const CHALLENGE_RETRY_DELAY: Duration = Duration::from_secs(1);

fn is_unset(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("unset")
}

enum PostOutcome {
    Accepted,
    /// 403: the challenge we signed against has expired.
    StaleChallenge,
    Rejected(u16),
    Transient(reqwest::Error),
}

/// Stateless client for one fireplace's LAN endpoint.
///
/// Polling needs only the IP; control additionally needs the per-fireplace
/// API key and cloud user id for the signed handshake.
#[derive(Debug, Clone)]
pub struct LocalClient {
    base: Url,
    api_key: String,
    user_id: String,
    client: reqwest::Client,
}

impl LocalClient {
    pub fn new(
        ip_address: &str,
        api_key: impl Into<String>,
        user_id: impl Into<String>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            base: Url::parse(&format!("http://{ip_address}/"))?,
            api_key: api_key.into(),
            user_id: user_id.into(),
            client: transport.build_client()?,
        })
    }

    pub fn from_credentials(
        credentials: &FireplaceCredentials,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        Self::new(
            &credentials.ip_address,
            credentials.api_key.clone(),
            credentials.cookies.user_id.clone(),
            transport,
        )
    }

    /// Whether control is unusable because the API key or user id was never
    /// provisioned. Polling still works.
    pub fn needs_login(&self) -> bool {
        is_unset(&self.api_key) || is_unset(&self.user_id)
    }

    /// Fetch one state snapshot from `GET /poll`.
    ///
    /// `suppress_warnings` downgrades the endpoint-missing log to debug,
    /// used by callers that probe for local availability on a cadence.
    pub async fn poll(&self, suppress_warnings: bool) -> Result<PollData, Error> {
        let url = self.base.join("poll")?;
        debug!(%url, "polling local endpoint");

        let response = self.client.get(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            if suppress_warnings {
                debug!(host = %self.base, "local poll endpoint not found");
            } else {
                warn!(host = %self.base, "local poll endpoint not found");
            }
            return Err(Error::EndpointNotFound);
        }
        let body = response.error_for_status()?.text().await?;

        serde_json::from_str(&body).map_err(|err| Error::MalformedResponse {
            message: err.to_string(),
            body,
        })
    }

    /// Fetch a fresh signing nonce from `GET /get_challenge`.
    pub async fn get_challenge(&self) -> Result<String, Error> {
        let url = self.base.join("get_challenge")?;
        let response = self
            .client
            .get(url)
            .timeout(CHALLENGE_TIMEOUT)
            .send()
            .await?
            .error_for_status()?;

        let challenge = response.text().await?.trim().to_owned();
        if challenge.is_empty() || hex::decode(&challenge).is_err() {
            return Err(Error::MalformedResponse {
                message: "challenge is not a hex string".into(),
                body: challenge,
            });
        }
        debug!(%challenge, "got local challenge");
        Ok(challenge)
    }

    /// Send one control command through the signed handshake, retrying until
    /// the device accepts it.
    ///
    /// Unprovisioned control credentials log a warning and drop the command
    /// without error, matching the vendor apps. Out-of-range values fail
    /// before any network traffic.
    pub async fn send_command(
        &self,
        command: FireplaceCommand,
        value: u16,
    ) -> Result<(), Error> {
        command.range_check(value)?;

        if self.needs_login() {
            warn!(
                command = command.name(),
                "local control credentials missing, dropping command"
            );
            return Ok(());
        }
        // Surface a bad key before entering the retry loop.
        hex::decode(&self.api_key)?;

        let url = self.base.join("post")?;
        loop {
            let challenge = match self.get_challenge().await {
                Ok(challenge) => challenge,
                Err(err) => {
                    warn!(%err, "challenge fetch failed, retrying");
                    sleep(CHALLENGE_RETRY_DELAY).await;
                    continue;
                }
            };

            let body = sign::signed_body(
                &self.api_key,
                &challenge,
                command.local_name(),
                value,
                &self.user_id,
            )?;

            let deadline = Instant::now() + CHALLENGE_BUDGET;
            while Instant::now() < deadline {
                match self.post_once(url.clone(), body.clone()).await {
                    PostOutcome::Accepted => {
                        debug!(command = command.name(), value, "local command accepted");
                        return Ok(());
                    }
                    PostOutcome::StaleChallenge => {
                        debug!("challenge expired, fetching a new one");
                        break;
                    }
                    PostOutcome::Rejected(status) => {
                        warn!(status, command = command.name(), "device rejected command, retrying");
                    }
                    PostOutcome::Transient(err) => {
                        debug!(%err, "post attempt failed, retrying");
                    }
                }
                sleep(POST_RETRY_DELAY).await;
            }
        }
    }

    async fn post_once(&self, url: Url, body: String) -> PostOutcome {
        let result = self
            .client
            .post(url)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .timeout(POST_ATTEMPT_TIMEOUT)
            .body(body)
            .send()
            .await;

        match result {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    PostOutcome::Accepted
                } else if status == StatusCode::FORBIDDEN {
                    PostOutcome::StaleChallenge
                } else {
                    PostOutcome::Rejected(status.as_u16())
                }
            }
            Err(err) => PostOutcome::Transient(err),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn transport() -> TransportConfig {
        TransportConfig::default()
    }

    #[test]
    fn login_detection() {
        let ready =
            LocalClient::new("192.168.1.80", "12345678deadbeef", "user1", &transport())
                .unwrap();
        assert!(!ready.needs_login());

        let no_key = LocalClient::new("192.168.1.80", "UNSET", "user1", &transport()).unwrap();
        assert!(no_key.needs_login());

        let no_user = LocalClient::new("192.168.1.80", "12345678deadbeef", "", &transport())
            .unwrap();
        assert!(no_user.needs_login());
    }

    #[test]
    fn base_url_from_ip() {
        let client =
            LocalClient::new("192.168.1.80", "key", "user", &transport()).unwrap();
        assert_eq!(client.base.as_str(), "http://192.168.1.80/");
    }
}
