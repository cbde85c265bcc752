// ── Cloud relay transport ──
//
// Talks to the vendor relay (iftapi.net) on behalf of one fireplace:
//
//   GET  /a/{serial}//apppoll     state snapshot
//   GET  /a/{serial}/applongpoll  blocks server-side until state changes
//   POST /a/{serial}//apppost     control command, form encoded
//
// The doubled slash in `apppoll`/`apppost` (but not `applongpoll`) is what
// the relay actually routes; normalizing it breaks the API. Auth rides on
// the session cookie triple from [`crate::session::CloudSession`].

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::StatusCode;
use tracing::{debug, warn};
use url::Url;

use crate::command::FireplaceCommand;
use crate::error::Error;
use crate::model::{PollData, SessionCookies};
use crate::transport::TransportConfig;

/// The relay holds a long poll open for up to 60 seconds; give the client a
/// second of slack on top before treating the request as dead.
const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(61);

fn map_status(status: StatusCode) -> Error {
    match status.as_u16() {
        403 => Error::NotAuthorized,
        404 => Error::DeviceNotFound,
        422 => Error::InvalidParameter,
        other => Error::UnexpectedStatus(other),
    }
}

fn parse_poll(body: String) -> Result<PollData, Error> {
    serde_json::from_str(&body).map_err(|err| Error::MalformedResponse {
        message: err.to_string(),
        body,
    })
}

/// Stateless client for one fireplace on the cloud relay.
#[derive(Debug, Clone)]
pub struct CloudClient {
    base: Url,
    serial: String,
    client: reqwest::Client,
    logged_in: bool,
}

impl CloudClient {
    /// Build a client for `serial` against `base_url` (normally
    /// [`crate::CLOUD_BASE_URL`]; tests point it at a mock server). The
    /// session cookies are loaded into the client's jar and sent on every
    /// request.
    pub fn new(
        base_url: &str,
        serial: impl Into<String>,
        cookies: &SessionCookies,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base = Url::parse(base_url)?;

        let jar = Arc::new(Jar::default());
        for (name, value) in cookies.pairs() {
            jar.add_cookie_str(&format!("{name}={value}"), &base);
        }

        let transport = TransportConfig {
            cookie_jar: Some(jar),
            ..transport.clone()
        };

        Ok(Self {
            base,
            serial: serial.into(),
            client: transport.build_client()?,
            logged_in: cookies.is_set(),
        })
    }

    /// Whether control is unusable because no session cookies were provided.
    pub fn needs_login(&self) -> bool {
        !self.logged_in
    }

    fn poll_url(&self) -> Result<Url, Error> {
        Ok(self.base.join(&format!("a/{}//apppoll", self.serial))?)
    }

    fn long_poll_url(&self) -> Result<Url, Error> {
        Ok(self.base.join(&format!("a/{}/applongpoll", self.serial))?)
    }

    fn post_url(&self) -> Result<Url, Error> {
        Ok(self.base.join(&format!("a/{}//apppost", self.serial))?)
    }

    /// Fetch one state snapshot from `apppoll`.
    pub async fn poll(&self) -> Result<PollData, Error> {
        let url = self.poll_url()?;
        debug!(%url, "polling cloud endpoint");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(map_status(status));
        }
        parse_poll(response.text().await?)
    }

    /// Block on `applongpoll` until the relay reports a state change.
    ///
    /// Returns `Ok(Some(data))` when the relay pushed a fresh snapshot and
    /// `Ok(None)` when it timed out server-side (HTTP 408) with nothing new,
    /// in which case the caller simply long-polls again.
    pub async fn long_poll(&self) -> Result<Option<PollData>, Error> {
        let url = self.long_poll_url()?;
        debug!(%url, "starting cloud long poll");

        let response = self
            .client
            .get(url)
            .timeout(LONG_POLL_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if status == StatusCode::REQUEST_TIMEOUT {
            debug!("long poll timed out with no state change");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(map_status(status));
        }
        parse_poll(response.text().await?).map(Some)
    }

    /// Send one control command through `apppost`.
    ///
    /// A missing session logs a warning and drops the command without error,
    /// matching the vendor apps. Out-of-range values fail before any network
    /// traffic.
    pub async fn send_command(
        &self,
        command: FireplaceCommand,
        value: u16,
    ) -> Result<(), Error> {
        command.range_check(value)?;

        if self.needs_login() {
            warn!(
                command = command.name(),
                "cloud session cookies missing, dropping command"
            );
            return Ok(());
        }

        let url = self.post_url()?;
        debug!(%url, command = command.name(), value, "sending cloud command");

        let response = self
            .client
            .post(url)
            .form(&[(command.cloud_name(), value.to_string())])
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            debug!(command = command.name(), "cloud command accepted");
            Ok(())
        } else {
            Err(map_status(status))
        }
    }
}
