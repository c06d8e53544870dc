// ── InfluxDB v2 sink ──
//
// Writes points through the HTTP write API in line protocol, one request
// per device. A rejected write does not stop the remaining devices; the
// cycle reports a single ignorable sink error afterwards.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};
use url::Url;

use super::{MeasurementPoint, MeasurementSink, points_for};
use crate::error::CoreError;
use crate::model::Device;

/// Connection settings for an InfluxDB v2 bucket.
#[derive(Debug, Clone)]
pub struct InfluxConfig {
    pub url: Url,
    pub org: String,
    pub bucket: String,
    pub token: SecretString,
    pub timeout: Duration,
}

pub struct InfluxSink {
    http: reqwest::Client,
    write_url: Url,
    token: SecretString,
}

impl InfluxSink {
    pub fn new(config: &InfluxConfig) -> Result<Self, CoreError> {
        let mut write_url = config.url.join("api/v2/write").map_err(|e| CoreError::Config {
            message: format!("invalid InfluxDB URL: {e}"),
        })?;
        write_url
            .query_pairs_mut()
            .append_pair("org", &config.org)
            .append_pair("bucket", &config.bucket)
            .append_pair("precision", "ns");

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CoreError::Config {
                message: format!("failed to build InfluxDB client: {e}"),
            })?;

        Ok(Self {
            http,
            write_url,
            token: config.token.clone(),
        })
    }

    async fn write(&self, body: String) -> Result<(), String> {
        let resp = self
            .http
            .post(self.write_url.clone())
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Token {}", self.token.expose_secret()),
            )
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(body)
            .send()
            .await
            .map_err(|e| e.without_url().to_string())?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let text = resp.text().await.unwrap_or_default();
        let preview: String = text.chars().take(200).collect();
        Err(format!("HTTP {status}: {preview}"))
    }
}

#[async_trait]
impl MeasurementSink for InfluxSink {
    fn name(&self) -> &'static str {
        "influxdb"
    }

    async fn publish(
        &mut self,
        _cycle_time: DateTime<Utc>,
        devices: &[&Device],
    ) -> Result<(), CoreError> {
        let mut attempted = 0_usize;
        let mut failures = Vec::new();

        for device in devices {
            let points = points_for(device);
            if points.is_empty() {
                continue;
            }
            attempted += 1;
            let body = points.iter().map(line).collect::<Vec<_>>().join("\n");
            match self.write(body).await {
                Ok(()) => debug!(ain = %device.ain, points = points.len(), "written to InfluxDB"),
                Err(reason) => {
                    warn!(ain = %device.ain, %reason, "InfluxDB write rejected");
                    failures.push(format!("{}: {reason}", device.ain));
                }
            }
        }

        if failures.is_empty() {
            return Ok(());
        }
        Err(CoreError::Sink {
            sink: self.name().into(),
            message: format!(
                "{} of {attempted} device writes failed ({})",
                failures.len(),
                failures.join("; ")
            ),
        })
    }
}

/// Render a point in line protocol. Tags are sorted by key; empty tags
/// are left out because line protocol cannot express them.
pub fn line(point: &MeasurementPoint) -> String {
    let mut out = point.kind.to_string();
    let tags = [
        ("ain", Some(point.ain.as_str())),
        ("location", point.location.as_deref()),
        ("state", point.state.as_deref()),
        ("sublocation", point.sublocation.as_deref()),
    ];
    for (key, value) in tags {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            out.push(',');
            out.push_str(key);
            out.push('=');
            out.push_str(&escape_tag(value));
        }
    }
    let nanos = point.time.timestamp_nanos_opt().unwrap_or_default();
    out.push_str(&format!(" value={} {nanos}", point.value));
    out
}

fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, ',' | '=' | ' ') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
