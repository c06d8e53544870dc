// ── Runtime polling configuration ──
//
// Immutable settings handed to the `Poller` by reference. They carry
// credential data and tuning, but never touch disk; `fritzha-config`
// builds them from the configuration file.

use std::collections::BTreeSet;

use secrecy::SecretString;
use url::Url;

use fritzha_api::TransportConfig;

use crate::model::MeasurementKind;

/// How to reach and authenticate with the router.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Router URL, e.g. `http://fritz.box/`.
    pub url: Url,
    pub username: String,
    pub password: SecretString,
    pub transport: TransportConfig,
}

/// Expected device entry: where it lives and what to record from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConfig {
    /// AIN, whitespace already stripped.
    pub ain: String,
    pub location: Option<String>,
    pub sublocation: Option<String>,
    /// `None` when the entry names no measurements at all; such a device
    /// is located but not monitored.
    pub monitored: Option<BTreeSet<MeasurementKind>>,
}

impl DeviceConfig {
    pub fn new(ain: &str) -> Self {
        Self {
            ain: ain.chars().filter(|c| !c.is_whitespace()).collect(),
            location: None,
            sublocation: None,
            monitored: None,
        }
    }

    pub fn with_location(mut self, location: &str, sublocation: &str) -> Self {
        self.location = Some(location.to_owned());
        self.sublocation = Some(sublocation.to_owned());
        self
    }

    pub fn monitoring(mut self, kinds: impl IntoIterator<Item = MeasurementKind>) -> Self {
        self.monitored = Some(kinds.into_iter().collect());
        self
    }
}

/// Configuration for the polling loop.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub router: RouterConfig,
    /// Seconds between cycles.
    pub interval_secs: u64,
    pub devices: Vec<DeviceConfig>,
}
