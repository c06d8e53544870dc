// Session-authenticated HTTP client for the FRITZ!Box
//
// Owns the session ID and the credentials needed to renew it. The client is
// single-owner: login and renewal take `&mut self`, so whoever drives the
// polling loop is the only one who can mutate the session.

use reqwest::StatusCode;
use secrecy::SecretString;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::auth::{SessionId, challenge_response};
use crate::error::Error;
use crate::models::{DeviceList, SessionInfo, from_xml};
use crate::transport::TransportConfig;

const LOGIN_PATH: &str = "login_sid.lua";
const HOMEAUTO_PATH: &str = "webservices/homeautoswitch.lua";

/// Client for the router's `login_sid.lua` / `homeautoswitch.lua` pair.
///
/// Two states: unauthenticated (SID is the all-zero sentinel) and
/// authenticated. [`login()`](Self::login) moves from the first to the
/// second; the router silently moves us back when the SID expires, which
/// the caller notices as a request returning no body.
pub struct SessionClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
    sid: SessionId,
    /// Set by the first successful login, never cleared. Decides whether a
    /// connectivity failure is an outage or a misconfiguration.
    authenticated_once: bool,
}

impl SessionClient {
    /// Create a client from a router URL such as `http://fritz.box/`.
    ///
    /// Does not contact the router; call [`login()`](Self::login).
    pub fn new(
        base_url: &str,
        username: impl Into<String>,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let base_url = Url::parse(base_url)?;
        let http = transport.build_client()?;
        Ok(Self::with_client(http, base_url, username, password))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            base_url: with_trailing_slash(base_url),
            username: username.into(),
            password,
            sid: SessionId::invalid(),
            authenticated_once: false,
        }
    }

    /// The router base URL (always ends in `/`).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// The current session ID (possibly the sentinel).
    pub fn sid(&self) -> &SessionId {
        &self.sid
    }

    /// `true` while the local SID is not the sentinel.
    pub fn is_authenticated(&self) -> bool {
        self.sid.is_valid()
    }

    /// `true` once any login has succeeded during this client's lifetime.
    pub fn has_authenticated(&self) -> bool {
        self.authenticated_once
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `login_sid.lua?sid=<sid>`: session status check.
    pub fn login_status_url(&self) -> Result<Url, Error> {
        let mut url = self.base_url.join(LOGIN_PATH)?;
        url.query_pairs_mut().append_pair("sid", self.sid.as_str());
        Ok(url)
    }

    /// `login_sid.lua?username=<u>&response=<r>`: authenticate.
    fn login_url(&self, response: &str) -> Result<Url, Error> {
        let mut url = self.base_url.join(LOGIN_PATH)?;
        url.query_pairs_mut()
            .append_pair("username", &self.username)
            .append_pair("response", response);
        Ok(url)
    }

    /// `webservices/homeautoswitch.lua?switchcmd=<cmd>&sid=<sid>`.
    pub fn switch_command_url(&self, cmd: &str) -> Result<Url, Error> {
        let mut url = self.base_url.join(HOMEAUTO_PATH)?;
        url.query_pairs_mut()
            .append_pair("switchcmd", cmd)
            .append_pair("sid", self.sid.as_str());
        Ok(url)
    }

    /// `<base>?logout=1&sid=<sid>`.
    fn logout_url(&self) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("logout", "1")
            .append_pair("sid", self.sid.as_str());
        url
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Make sure the client holds a valid session ID.
    ///
    /// Asks the router whether the current SID is still good. If the router
    /// answers with the sentinel it also sends a challenge, which is answered
    /// with [`challenge_response`] in a second round trip.
    pub async fn login(&mut self) -> Result<(), Error> {
        let url = self.login_status_url()?;
        let body = self.send_request(url).await?.ok_or_else(|| Error::Login {
            message: "no response to session status request".into(),
        })?;
        let status: SessionInfo = from_xml(&body)?;

        let current = SessionId::new(status.sid.as_str());
        if current.is_valid() {
            debug!("session ID still accepted by router");
            self.sid = current;
            self.authenticated_once = true;
            return Ok(());
        }

        let Some(challenge) = status.challenge() else {
            self.sid = SessionId::invalid();
            return Err(Error::Login {
                message: "router returned no challenge".into(),
            });
        };

        let response = challenge_response(challenge, &self.password);
        let url = self.login_url(&response)?;
        let body = self.send_request(url).await?.ok_or_else(|| Error::Login {
            message: "no usable response to login request".into(),
        })?;
        let answer: SessionInfo = from_xml(&body)?;

        let sid = SessionId::new(answer.sid.as_str());
        if !sid.is_valid() {
            self.sid = SessionId::invalid();
            let message = match answer.block_time_secs() {
                Some(secs) if secs > 0 => format!(
                    "credentials for user '{}' rejected, logins blocked for {secs}s",
                    self.username
                ),
                _ => format!("credentials for user '{}' rejected", self.username),
            };
            return Err(Error::Login { message });
        }

        self.sid = sid;
        self.authenticated_once = true;
        info!(user = %self.username, "logged in to FRITZ!Box");
        Ok(())
    }

    /// End the session on the router. Best effort: failures are logged,
    /// never returned.
    pub async fn logoff(&self) {
        if !self.sid.is_valid() {
            debug!("no session to log off");
            return;
        }
        match self.send_request(self.logout_url()).await {
            Ok(_) => debug!("logged off from FRITZ!Box"),
            Err(e) => warn!(error = %e, "logoff failed"),
        }
    }

    // ── Requests ─────────────────────────────────────────────────────

    /// Send a GET and return the trimmed body.
    ///
    /// `Ok(None)` means the router answered with a non-200 status or an
    /// empty body; callers treat that as a soft failure (usually an
    /// expired SID). Connect and timeout failures become
    /// [`Error::Connection`] once a login has ever succeeded, and stay a
    /// plain [`Error::Transport`] before that.
    pub async fn send_request(&self, url: Url) -> Result<Option<String>, Error> {
        debug!(path = url.path(), "GET");

        let resp = match self.http.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => return Err(self.classify(e)),
        };

        let status = resp.status();
        if status != StatusCode::OK {
            error!(
                path = resp.url().path(),
                status = status.as_u16(),
                reason = status.canonical_reason().unwrap_or(""),
                "HTTP request failed"
            );
            return Ok(None);
        }

        let body = resp.text().await.map_err(|e| self.classify(e))?;
        let body = body.trim();
        if body.is_empty() {
            return Ok(None);
        }
        debug!(bytes = body.len(), "response received");
        Ok(Some(body.to_owned()))
    }

    /// Fetch and parse `getdevicelistinfos` with the current SID.
    ///
    /// `Ok(None)` when the router gave no body (see
    /// [`send_request`](Self::send_request)).
    pub async fn get_device_list(&self) -> Result<Option<DeviceList>, Error> {
        let url = self.switch_command_url("getdevicelistinfos")?;
        match self.send_request(url).await? {
            Some(body) => Ok(Some(from_xml(&body)?)),
            None => Ok(None),
        }
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        // reqwest errors carry the full URL, SID included.
        let err = err.without_url();
        if self.authenticated_once && Error::is_unreachable(&err) {
            Error::Connection {
                url: self.base_url.to_string(),
                source: err,
            }
        } else {
            Error::Transport(err)
        }
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
