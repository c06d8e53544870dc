use thiserror::Error;

/// Top-level error type for the `fritzha-api` crate.
///
/// `fritzha-core` maps these into domain errors and decides which of them
/// a running poller may shrug off.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The login handshake did not produce a usable session ID.
    #[error("FRITZ!Box login failed: {message}")]
    Login { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// The router became unreachable after the session had been
    /// established at least once (connection refused, connect or read
    /// timeout). Expected to clear up on its own.
    #[error("FRITZ!Box at {url} is unreachable: {source}")]
    Connection {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Any other HTTP transport error, including connectivity failures
    /// that happen before the first successful login.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// XML deserialization failed, with the raw body for debugging.
    #[error("XML parse error: {message}")]
    Xml { message: String, body: String },
}

impl Error {
    /// Returns `true` for the recoverable connectivity case.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Returns `true` if this is a login protocol failure.
    pub fn is_login(&self) -> bool {
        matches!(self, Self::Login { .. })
    }

    /// Low-level failures that may be reclassified as [`Error::Connection`]
    /// once a session exists.
    pub(crate) fn is_unreachable(err: &reqwest::Error) -> bool {
        err.is_connect() || err.is_timeout()
    }
}
