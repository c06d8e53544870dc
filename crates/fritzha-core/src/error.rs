// ── Core error types ──
//
// Domain errors for the polling engine. Consumers never see reqwest or XML
// errors directly; the `From<fritzha_api::Error>` impl translates them.
// Each variant is either ignorable (the loop logs it, counts it and retries
// soon) or fatal (the loop tears down the session and sinks and stops).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // ── Router ───────────────────────────────────────────────────────
    #[error("FRITZ!Box login failed: {message}")]
    Login { message: String },

    /// Router unreachable after a session had been established.
    #[error("FRITZ!Box at {url} is unreachable: {reason}")]
    Connection { url: String, reason: String },

    #[error("No smart home devices registered on the FRITZ!Box")]
    NoDevices,

    #[error("Measurement cycle failed: {message}")]
    CycleFailed { message: String },

    #[error("Router API error: {message}")]
    Api { message: String },

    // ── Sinks ────────────────────────────────────────────────────────
    #[error("{sink} sink write failed: {message}")]
    Sink { sink: String, message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Whether the polling loop may carry on after this error.
    ///
    /// Connectivity losses after login and sink write failures are
    /// ignorable. Everything else ends the process.
    pub fn is_ignorable(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::Sink { .. } => true,
            Self::Login { .. }
            | Self::NoDevices
            | Self::CycleFailed { .. }
            | Self::Api { .. }
            | Self::Config { .. } => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<fritzha_api::Error> for CoreError {
    fn from(err: fritzha_api::Error) -> Self {
        match err {
            fritzha_api::Error::Login { message } => Self::Login { message },
            fritzha_api::Error::Connection { url, source } => Self::Connection {
                url,
                reason: source.to_string(),
            },
            fritzha_api::Error::Transport(e) => Self::Api {
                message: format!("HTTP transport error: {e}"),
            },
            fritzha_api::Error::InvalidUrl(e) => Self::Config {
                message: format!("invalid router URL: {e}"),
            },
            fritzha_api::Error::Tls(msg) => Self::Config {
                message: format!("TLS setup failed: {msg}"),
            },
            fritzha_api::Error::Xml { message, body: _ } => Self::Api {
                message: format!("unexpected response: {message}"),
            },
        }
    }
}
