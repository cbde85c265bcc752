// ── Cloud session and discovery ──
//
// One-time flow against the relay that turns an account login into the
// [`FireplaceCredentials`] the transport clients are built from:
//
//   POST /a/login                       204 + Set-Cookie triple
//   GET  /a/enumlocations               locations on the account
//   GET  /a/enumfireplaces?location_id= fireplaces (serial + API key) per
//                                       location

use reqwest::header::{HeaderMap, SET_COOKIE};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};
use url::Url;

use crate::error::Error;
use crate::model::{
    CloudFireplace, FireplaceCredentials, FireplaceList, Location, Locations,
    SessionCookies, TransportMode,
};
use crate::transport::TransportConfig;
use crate::CLOUD_BASE_URL;

/// Pull the session cookie triple out of a login response's `Set-Cookie`
/// headers. Cookies the relay does not send stay at their "UNSET" default.
fn cookies_from_headers(headers: &HeaderMap) -> SessionCookies {
    let mut cookies = SessionCookies::default();
    for header in headers.get_all(SET_COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        let Some(pair) = raw.split(';').next() else {
            continue;
        };
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        match name.trim() {
            "user" => cookies.user_id = value.trim().to_owned(),
            "auth_cookie" => cookies.auth_cookie = value.trim().to_owned(),
            "web_client_id" => cookies.web_client_id = value.trim().to_owned(),
            _ => {}
        }
    }
    cookies
}

/// Authenticated session with the cloud relay.
///
/// Holds a cookie jar shared with its HTTP client, so a successful
/// [`login`](Self::login) authenticates every later enumeration call on the
/// same session.
#[derive(Debug)]
pub struct CloudSession {
    base: Url,
    client: reqwest::Client,
}

impl CloudSession {
    /// Session against the production relay.
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        Self::with_base_url(CLOUD_BASE_URL, transport)
    }

    /// Session against an alternate relay base URL (tests point this at a
    /// mock server).
    pub fn with_base_url(base_url: &str, transport: &TransportConfig) -> Result<Self, Error> {
        let transport = transport.clone().with_cookie_jar();
        Ok(Self {
            base: Url::parse(base_url)?,
            client: transport.build_client()?,
        })
    }

    /// Log in with account credentials.
    ///
    /// The relay answers 204 with the session cookie triple; anything else
    /// is [`Error::LoginFailed`]. The cookies also land in this session's
    /// jar, so enumeration calls made afterwards are authenticated.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionCookies, Error> {
        let url = self.base.join("a/login")?;
        debug!(%url, username, "logging in to cloud relay");

        let response = self
            .client
            .post(url)
            .form(&[("username", username), ("password", password.expose_secret())])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            return Err(Error::LoginFailed {
                status: status.as_u16(),
            });
        }

        let cookies = cookies_from_headers(response.headers());
        if !cookies.is_set() {
            return Err(Error::MalformedResponse {
                message: "login response did not set session cookies".into(),
                body: String::new(),
            });
        }
        info!(username, "cloud login succeeded");
        Ok(cookies)
    }

    /// Enumerate the locations on the logged-in account.
    pub async fn locations(&self) -> Result<Vec<Location>, Error> {
        let url = self.base.join("a/enumlocations")?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(Error::NotAuthorized);
        }
        if !status.is_success() {
            return Err(Error::UnexpectedStatus(status.as_u16()));
        }

        let body = response.text().await?;
        let locations: Locations =
            serde_json::from_str(&body).map_err(|err| Error::MalformedResponse {
                message: err.to_string(),
                body,
            })?;
        Ok(locations.locations)
    }

    /// Enumerate the fireplaces at one location.
    pub async fn fireplaces(&self, location_id: &str) -> Result<Vec<CloudFireplace>, Error> {
        let mut url = self.base.join("a/enumfireplaces")?;
        url.query_pairs_mut().append_pair("location_id", location_id);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            return Err(Error::NotAuthorized);
        }
        if !status.is_success() {
            return Err(Error::UnexpectedStatus(status.as_u16()));
        }

        let body = response.text().await?;
        let list: FireplaceList =
            serde_json::from_str(&body).map_err(|err| Error::MalformedResponse {
                message: err.to_string(),
                body,
            })?;
        Ok(list.fireplaces)
    }

    /// Full discovery flow: log in, walk every location, and return
    /// credentials for `serial` (or the first fireplace on the account when
    /// `serial` is `None`).
    ///
    /// The relay knows nothing about LAN addresses, so `ip_address` comes
    /// back unset; fill it in before building a
    /// [`crate::LocalClient`](crate::local::LocalClient).
    pub async fn discover_credentials(
        &self,
        username: &str,
        password: &SecretString,
        serial: Option<&str>,
    ) -> Result<FireplaceCredentials, Error> {
        let cookies = self.login(username, password).await?;

        for location in self.locations().await? {
            for fireplace in self.fireplaces(&location.location_id).await? {
                let matches = serial.is_none_or(|s| s == fireplace.serial);
                if matches {
                    info!(
                        serial = fireplace.serial,
                        location = location.location_name,
                        "discovered fireplace"
                    );
                    return Ok(FireplaceCredentials {
                        ip_address: "UNSET".into(),
                        api_key: fireplace.apikey,
                        serial: fireplace.serial,
                        cookies,
                        read_mode: TransportMode::default(),
                        control_mode: TransportMode::default(),
                    });
                }
            }
        }
        Err(Error::DeviceNotFound)
    }
}
