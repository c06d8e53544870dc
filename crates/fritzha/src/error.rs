//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with help
//! text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use fritzha_config::ConfigError;
use fritzha_core::CoreError;

/// Process exit codes. Clap exits with `USAGE` on its own for bad arguments.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const CONFIG: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Router ───────────────────────────────────────────────────────
    #[error("Could not reach the FRITZ!Box at {url}")]
    #[diagnostic(
        code(fritzha::connection_failed),
        help(
            "Check that the router is up and reachable from this host.\n\
             Reason: {reason}"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("FRITZ!Box login failed: {message}")]
    #[diagnostic(
        code(fritzha::auth_failed),
        help(
            "Verify FritzBoxUser and FritzBoxPassword. The user needs the\n\
             'Smart Home' permission in the FRITZ!Box user settings."
        )
    )]
    AuthFailed { message: String },

    #[error("No smart home devices registered on the FRITZ!Box")]
    #[diagnostic(
        code(fritzha::no_devices),
        help("Pair at least one FRITZ!DECT device with the router first.")
    )]
    NoDevices,

    #[error("{message}")]
    #[diagnostic(code(fritzha::router))]
    Router { message: String },

    #[error("{sink} output failed: {message}")]
    #[diagnostic(code(fritzha::sink))]
    Sink { sink: String, message: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration file not found: {path}")]
    #[diagnostic(
        code(fritzha::no_config),
        help("Pass an existing file with --config, or omit it to use the search path.")
    )]
    NoConfig { path: String },

    #[error("Invalid configuration value {field}: {reason}")]
    #[diagnostic(code(fritzha::invalid_config))]
    InvalidConfig { field: String, reason: String },

    #[error(transparent)]
    #[diagnostic(code(fritzha::config))]
    Config(Box<figment::Error>),

    // ── Usage ────────────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fritzha::validation))]
    Validation { field: String, reason: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON rendering failed: {0}")]
    #[diagnostic(code(fritzha::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NoConfig { .. } | Self::InvalidConfig { .. } | Self::Config(_) => {
                exit_code::CONFIG
            }
            Self::Validation { .. } => exit_code::USAGE,
            Self::NoDevices
            | Self::Router { .. }
            | Self::Sink { .. }
            | Self::Io(_)
            | Self::Json(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Login { message } => Self::AuthFailed { message },
            CoreError::Connection { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::NoDevices => Self::NoDevices,
            CoreError::Sink { sink, message } => Self::Sink { sink, message },
            CoreError::Config { message } => Self::InvalidConfig {
                field: "router".into(),
                reason: message,
            },
            err @ (CoreError::CycleFailed { .. } | CoreError::Api { .. }) => Self::Router {
                message: err.to_string(),
            },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::InvalidConfig { field, reason },
            ConfigError::NotFound { path } => Self::NoConfig {
                path: path.display().to_string(),
            },
            ConfigError::Figment(e) => Self::Config(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let login: CliError = CoreError::Login {
            message: "rejected".into(),
        }
        .into();
        assert_eq!(login.exit_code(), exit_code::AUTH);

        let conn: CliError = CoreError::Connection {
            url: "http://fritz.box/".into(),
            reason: "timed out".into(),
        }
        .into();
        assert_eq!(conn.exit_code(), exit_code::CONNECTION);

        let missing: CliError = ConfigError::NotFound {
            path: "/nope.json".into(),
        }
        .into();
        assert_eq!(missing.exit_code(), exit_code::CONFIG);

        let cycle: CliError = CoreError::CycleFailed {
            message: "no list".into(),
        }
        .into();
        assert_eq!(cycle.exit_code(), exit_code::GENERAL);
        assert!(cycle.to_string().contains("no list"));
    }
}
