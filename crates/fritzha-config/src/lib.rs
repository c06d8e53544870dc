//! Configuration for the fritzha poller.
//!
//! One JSON (or TOML) file, found on a short search path, layered over
//! built-in defaults and `FRITZHA_*` environment variables. The file keys
//! are the ones `fritzToInfluxHA.json` has always used, so existing files
//! keep working. [`FileConfig`] translates into the immutable
//! `fritzha_core` structs the poller is built from.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized, Toml},
    value::Uncased,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use fritzha_core::{
    DeviceConfig, InfluxConfig, MeasurementKind, PollerConfig, RouterConfig, SinkSettings,
    TlsMode, TransportConfig,
};

/// File name looked for on the search path.
pub const CONFIG_FILE_NAME: &str = "fritzToInfluxHA.json";

/// Prefix of environment variables overriding file keys.
pub const ENV_PREFIX: &str = "FRITZHA_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("configuration file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── File structs ────────────────────────────────────────────────────

/// Top-level configuration file. Missing keys take their defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FileConfig {
    /// Seconds between measurement cycles.
    #[serde(rename = "measurementInterval")]
    pub measurement_interval: u64,

    #[serde(rename = "FritzBoxURL")]
    pub fritzbox_url: String,

    #[serde(rename = "FritzBoxUser")]
    pub fritzbox_user: Option<String>,

    /// Plaintext; prefer `FRITZHA_FRITZBOXPASSWORD`.
    #[serde(rename = "FritzBoxPassword")]
    pub fritzbox_password: Option<String>,

    #[serde(rename = "InfluxOutput")]
    pub influx_output: bool,

    #[serde(rename = "InfluxURL")]
    pub influx_url: Option<String>,

    #[serde(rename = "InfluxOrg")]
    pub influx_org: Option<String>,

    #[serde(rename = "InfluxToken")]
    pub influx_token: Option<String>,

    #[serde(rename = "InfluxBucket")]
    pub influx_bucket: Option<String>,

    #[serde(rename = "csvOutput")]
    pub csv_output: bool,

    /// An empty path switches CSV output off.
    #[serde(rename = "csvFile")]
    pub csv_file: String,

    /// Per-request timeout in seconds, router and InfluxDB alike.
    #[serde(rename = "requestTimeout")]
    pub request_timeout: u64,

    /// Accept the router's self-signed certificate on https URLs.
    pub insecure: bool,

    /// PEM file with the CA that signed the router certificate.
    #[serde(rename = "caCert")]
    pub ca_cert: Option<PathBuf>,

    pub devices: Vec<FileDevice>,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            measurement_interval: 120,
            fritzbox_url: "http://fritz.box/".into(),
            fritzbox_user: None,
            fritzbox_password: None,
            influx_output: false,
            influx_url: None,
            influx_org: None,
            influx_token: None,
            influx_bucket: None,
            csv_output: false,
            csv_file: String::new(),
            request_timeout: 10,
            insecure: false,
            ca_cert: None,
            devices: Vec::new(),
        }
    }
}

/// A `devices[]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileDevice {
    pub ain: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub sublocation: Option<String>,
    /// Absent: the device is located but not monitored.
    #[serde(default)]
    pub measurements: Option<FileMeasurements>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FileMeasurements {
    #[serde(default)]
    pub voltage: bool,
    #[serde(default)]
    pub power: bool,
    #[serde(default)]
    pub energy: bool,
    #[serde(default)]
    pub temperature: bool,
}

impl FileMeasurements {
    pub fn kinds(self) -> BTreeSet<MeasurementKind> {
        [
            (self.voltage, MeasurementKind::Voltage),
            (self.power, MeasurementKind::Power),
            (self.energy, MeasurementKind::Energy),
            (self.temperature, MeasurementKind::Temperature),
        ]
        .into_iter()
        .filter_map(|(on, kind)| on.then_some(kind))
        .collect()
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Candidate files in search order: the per-user config directory, then
/// `/etc`.
pub fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(2);
    if let Some(dirs) = ProjectDirs::from("", "", "fritzha") {
        paths.push(dirs.config_dir().join(CONFIG_FILE_NAME));
    }
    paths.push(Path::new("/etc").join(CONFIG_FILE_NAME));
    paths
}

/// Pick the configuration file.
///
/// An explicit path must exist. Otherwise the first existing candidate
/// wins; `None` means run on defaults.
pub fn find_config_file(
    explicit: Option<&Path>,
    candidates: &[PathBuf],
) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        return Ok(Some(path.to_path_buf()));
    }
    for candidate in candidates {
        if candidate.is_file() {
            return Ok(Some(candidate.clone()));
        }
        debug!(path = %candidate.display(), "config file not found");
    }
    Ok(None)
}

// ── Config loading ──────────────────────────────────────────────────

/// A parsed configuration and the file it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub path: Option<PathBuf>,
    pub config: FileConfig,
}

/// Defaults, then the file (TOML when it ends in `.toml`, JSON otherwise),
/// then the environment.
pub fn figment_for(path: Option<&Path>) -> Figment {
    let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));
    if let Some(path) = path {
        let is_toml = path.extension().is_some_and(|ext| ext == "toml");
        figment = if is_toml {
            figment.merge(Toml::file(path))
        } else {
            figment.merge(Json::file(path))
        };
    }
    figment.merge(env_provider())
}

/// `FRITZHA_<KEY>` for any top-level file key, matched case-insensitively.
fn env_provider() -> Env {
    const KEYS: [&str; 14] = [
        "measurementInterval",
        "FritzBoxURL",
        "FritzBoxUser",
        "FritzBoxPassword",
        "InfluxOutput",
        "InfluxURL",
        "InfluxOrg",
        "InfluxToken",
        "InfluxBucket",
        "csvOutput",
        "csvFile",
        "requestTimeout",
        "insecure",
        "caCert",
    ];
    // `map` resets the lowercase flag, so it has to come first.
    Env::prefixed(ENV_PREFIX)
        .map(|key| {
            KEYS.iter()
                .find(|k| key.as_str().eq_ignore_ascii_case(k))
                .map_or_else(
                    || Uncased::from(key.as_str().to_owned()),
                    |k| Uncased::from(*k),
                )
        })
        .lowercase(false)
}

/// Find, load and validate the configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let path = find_config_file(explicit, &config_search_paths())?;
    match &path {
        Some(p) => info!(path = %p.display(), "using config file"),
        None => info!("no config file available, using defaults"),
    }
    let config: FileConfig = figment_for(path.as_deref()).extract()?;
    config.validate()?;
    Ok(LoadedConfig { path, config })
}

// ── Validation & translation ────────────────────────────────────────

impl FileConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.measurement_interval == 0 {
            return Err(invalid("measurementInterval", "must be greater than 0"));
        }
        self.router_url()?;
        if self.influx_output {
            self.influx_config()?;
        }
        for (i, device) in self.devices.iter().enumerate() {
            if device.ain.trim().is_empty() {
                return Err(invalid(&format!("devices[{i}].ain"), "must not be empty"));
            }
        }
        Ok(())
    }

    fn router_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.fritzbox_url)
            .map_err(|e| invalid("FritzBoxURL", format!("'{}': {e}", self.fritzbox_url)))
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    fn tls_mode(&self) -> TlsMode {
        if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else if let Some(ca) = &self.ca_cert {
            TlsMode::CustomCa(ca.clone())
        } else {
            TlsMode::System
        }
    }

    /// Devices as the inventory expects them. AINs lose their whitespace.
    pub fn device_configs(&self) -> Vec<DeviceConfig> {
        self.devices
            .iter()
            .map(|d| {
                let mut cfg = DeviceConfig::new(&d.ain);
                cfg.location.clone_from(&d.location);
                cfg.sublocation.clone_from(&d.sublocation);
                cfg.monitored = d.measurements.map(FileMeasurements::kinds);
                cfg
            })
            .collect()
    }

    /// Settings for the poller. Requires a router password.
    pub fn poller_config(&self) -> Result<PollerConfig, ConfigError> {
        let password = self
            .fritzbox_password
            .clone()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| invalid("FritzBoxPassword", "not configured"))?;

        Ok(PollerConfig {
            router: RouterConfig {
                url: self.router_url()?,
                username: self.fritzbox_user.clone().unwrap_or_default(),
                password: SecretString::from(password),
                transport: TransportConfig {
                    tls: self.tls_mode(),
                    timeout: self.timeout(),
                },
            },
            interval_secs: self.measurement_interval,
            devices: self.device_configs(),
        })
    }

    fn influx_config(&self) -> Result<InfluxConfig, ConfigError> {
        fn required(value: Option<&String>, field: &str) -> Result<String, ConfigError> {
            value
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| invalid(field, "required when InfluxOutput is enabled"))
        }

        let url = required(self.influx_url.as_ref(), "InfluxURL")?;
        let url = Url::parse(&url).map_err(|e| invalid("InfluxURL", format!("'{url}': {e}")))?;
        Ok(InfluxConfig {
            url,
            org: required(self.influx_org.as_ref(), "InfluxOrg")?,
            bucket: required(self.influx_bucket.as_ref(), "InfluxBucket")?,
            token: SecretString::from(required(self.influx_token.as_ref(), "InfluxToken")?),
            timeout: self.timeout(),
        })
    }

    /// Which sinks to open.
    pub fn sink_settings(&self) -> Result<SinkSettings, ConfigError> {
        let csv = (self.csv_output && !self.csv_file.is_empty())
            .then(|| PathBuf::from(&self.csv_file));
        let influx = if self.influx_output {
            Some(self.influx_config()?)
        } else {
            None
        };
        Ok(SinkSettings { csv, influx })
    }

    /// Log the effective configuration at info level, secrets redacted.
    pub fn log_summary(&self) {
        fn secret(value: Option<&String>) -> &'static str {
            match value {
                Some(v) if !v.is_empty() => "<redacted>",
                _ => "<unset>",
            }
        }
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();

        info!(
            measurement_interval = self.measurement_interval,
            fritzbox_url = %self.fritzbox_url,
            fritzbox_user = %opt(&self.fritzbox_user),
            fritzbox_password = secret(self.fritzbox_password.as_ref()),
            request_timeout = self.request_timeout,
            insecure = self.insecure,
            "router configuration"
        );
        info!(
            influx_output = self.influx_output,
            influx_url = %opt(&self.influx_url),
            influx_org = %opt(&self.influx_org),
            influx_token = secret(self.influx_token.as_ref()),
            influx_bucket = %opt(&self.influx_bucket),
            csv_output = self.csv_output,
            csv_file = %self.csv_file,
            "output configuration"
        );
        info!(devices = self.devices.len(), "configured devices");
        for device in &self.devices {
            info!(
                ain = %device.ain,
                location = device.location.as_deref().unwrap_or(""),
                sublocation = device.sublocation.as_deref().unwrap_or(""),
                "configured device"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn with_influx() -> FileConfig {
        FileConfig {
            influx_output: true,
            influx_url: Some("http://influx.local:8086".into()),
            influx_org: Some("home".into()),
            influx_token: Some("t0ken".into()),
            influx_bucket: Some("fritz".into()),
            ..FileConfig::default()
        }
    }

    #[test]
    fn defaults_match_historic_values() {
        let cfg = FileConfig::default();
        assert_eq!(cfg.measurement_interval, 120);
        assert_eq!(cfg.fritzbox_url, "http://fritz.box/");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_interval_rejected() {
        let cfg = FileConfig {
            measurement_interval: 0,
            ..FileConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "measurementInterval"));
    }

    #[test]
    fn bad_router_url_rejected() {
        let cfg = FileConfig {
            fritzbox_url: "fritz box".into(),
            ..FileConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn influx_output_requires_every_field() {
        assert!(with_influx().validate().is_ok());

        let cfg = FileConfig {
            influx_token: None,
            ..with_influx()
        };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "InfluxToken"));

        let cfg = FileConfig {
            influx_bucket: Some(String::new()),
            ..with_influx()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_csv_file_disables_csv_output() {
        let cfg = FileConfig {
            csv_output: true,
            ..FileConfig::default()
        };
        assert!(cfg.sink_settings().unwrap().csv.is_none());

        let cfg = FileConfig {
            csv_output: true,
            csv_file: "/var/log/fritz.csv".into(),
            ..FileConfig::default()
        };
        assert_eq!(
            cfg.sink_settings().unwrap().csv,
            Some(PathBuf::from("/var/log/fritz.csv"))
        );
    }

    #[test]
    fn device_measurements_become_monitored_kinds() {
        let cfg = FileConfig {
            devices: vec![
                FileDevice {
                    ain: "08761 0000434".into(),
                    location: Some("Keller".into()),
                    sublocation: None,
                    measurements: Some(FileMeasurements {
                        power: true,
                        energy: true,
                        ..FileMeasurements::default()
                    }),
                },
                FileDevice {
                    ain: "11657 0272633".into(),
                    ..FileDevice::default()
                },
            ],
            ..FileConfig::default()
        };

        let devices = cfg.device_configs();
        assert_eq!(devices[0].ain, "087610000434");
        assert_eq!(devices[0].location.as_deref(), Some("Keller"));
        assert_eq!(
            devices[0].monitored,
            Some([MeasurementKind::Power, MeasurementKind::Energy].into())
        );
        assert_eq!(devices[1].monitored, None);
    }

    #[test]
    fn poller_config_needs_password() {
        assert!(FileConfig::default().poller_config().is_err());

        let cfg = FileConfig {
            fritzbox_user: Some("smarthome".into()),
            fritzbox_password: Some("geheim".into()),
            insecure: true,
            request_timeout: 4,
            ..FileConfig::default()
        };
        let poller = cfg.poller_config().unwrap();
        assert_eq!(poller.router.username, "smarthome");
        assert_eq!(poller.router.url.as_str(), "http://fritz.box/");
        assert_eq!(poller.router.transport.timeout, Duration::from_secs(4));
        assert!(matches!(
            poller.router.transport.tls,
            TlsMode::DangerAcceptInvalid
        ));
        assert_eq!(poller.interval_secs, 120);
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = find_config_file(Some(&missing), &[]).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }

    #[test]
    fn first_existing_candidate_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("user.json");
        let second = dir.path().join("etc.json");
        std::fs::write(&second, "{}").unwrap();

        let found = find_config_file(None, &[first.clone(), second.clone()]).unwrap();
        assert_eq!(found, Some(second));

        std::fs::write(&first, "{}").unwrap();
        let found = find_config_file(None, &[first.clone(), dir.path().join("etc.json")]).unwrap();
        assert_eq!(found, Some(first));

        assert_eq!(find_config_file(None, &[dir.path().join("x.json")]).unwrap(), None);
    }
}
