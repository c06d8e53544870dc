// ── Measurement sinks ──
//
// A sink receives the monitored, up-to-date devices at the end of each
// cycle. What a device contributes is decided here, once, so every sink
// agrees on which readings exist.

pub mod csv;
pub mod influx;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use strum::IntoEnumIterator;
use tracing::debug;

use crate::error::CoreError;
use crate::model::{Device, MeasurementKind};

pub use self::csv::CsvSink;
pub use self::influx::{InfluxConfig, InfluxSink};

/// Destination for cycle results.
#[async_trait]
pub trait MeasurementSink: Send {
    /// Short name for logs and errors.
    fn name(&self) -> &'static str;

    /// Deliver one cycle. `devices` only holds monitored devices updated
    /// during the cycle that ended at `cycle_time`.
    ///
    /// Failures come back as [`CoreError::Sink`].
    async fn publish(&mut self, cycle_time: DateTime<Utc>, devices: &[&Device])
    -> Result<(), CoreError>;

    /// Release held resources.
    async fn close(&mut self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// One reading in sink-neutral form.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementPoint {
    pub kind: MeasurementKind,
    pub ain: String,
    pub location: Option<String>,
    pub sublocation: Option<String>,
    pub state: Option<String>,
    pub value: f64,
    pub time: DateTime<Utc>,
}

/// The readings `device` contributes this cycle.
///
/// Empty unless the device is monitored and up to date. A kind is emitted
/// only when it is configured and the device currently has a value for it.
/// Temperature points without a switch state carry state `"1"`, since
/// repeaters have no switch.
pub fn points_for(device: &Device) -> Vec<MeasurementPoint> {
    if !device.is_publishable() {
        return Vec::new();
    }
    let Some(time) = device.measured_at else {
        return Vec::new();
    };

    MeasurementKind::iter()
        .filter(|&kind| device.wants(kind))
        .filter_map(|kind| {
            let value = device.measurements.get(kind)?;
            let state = match kind {
                MeasurementKind::Temperature => {
                    Some(device.state.clone().unwrap_or_else(|| "1".to_owned()))
                }
                _ => device.state.clone(),
            };
            Some(MeasurementPoint {
                kind,
                ain: device.ain.clone(),
                location: device.location.clone(),
                sublocation: device.sublocation.clone(),
                state,
                value,
                time,
            })
        })
        .collect()
}

/// Which sinks to open.
#[derive(Debug, Clone, Default)]
pub struct SinkSettings {
    pub csv: Option<PathBuf>,
    pub influx: Option<InfluxConfig>,
}

/// Open every configured sink, CSV first.
pub fn open_sinks(settings: &SinkSettings) -> Result<Vec<Box<dyn MeasurementSink>>, CoreError> {
    let mut sinks: Vec<Box<dyn MeasurementSink>> = Vec::new();
    if let Some(path) = &settings.csv {
        debug!(path = %path.display(), "CSV output enabled");
        sinks.push(Box::new(CsvSink::new(path.clone())));
    }
    if let Some(influx) = &settings.influx {
        debug!(url = %influx.url, bucket = %influx.bucket, "InfluxDB output enabled");
        sinks.push(Box::new(InfluxSink::new(influx)?));
    }
    Ok(sinks)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::DeviceType;

    fn measured_switch() -> Device {
        let mut d = Device::new("087610000434", DeviceType::Switch);
        d.state = Some("1".into());
        d.location = Some("Keller".into());
        d.sublocation = Some("Waschraum".into());
        d.measurements.voltage = Some(230.0);
        d.measurements.power = Some(4.82);
        d.measured_at = Some(Utc::now());
        d.up_to_date = true;
        d
    }

    #[test]
    fn unmonitored_device_yields_nothing() {
        let mut d = measured_switch();
        d.monitored = [MeasurementKind::Voltage, MeasurementKind::Power].into();
        d.is_monitored = false;
        assert!(points_for(&d).is_empty());
    }

    #[test]
    fn stale_device_yields_nothing() {
        let mut d = measured_switch();
        d.monitored = [MeasurementKind::Power].into();
        d.is_monitored = true;
        d.up_to_date = false;
        assert!(points_for(&d).is_empty());
    }

    #[test]
    fn gated_by_configuration_and_presence() {
        let mut d = measured_switch();
        // energy configured but never reported; voltage reported but not configured
        d.monitored = [MeasurementKind::Power, MeasurementKind::Energy].into();
        d.is_monitored = true;

        let points = points_for(&d);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].kind, MeasurementKind::Power);
        assert_eq!(points[0].value, 4.82);
        assert_eq!(points[0].state.as_deref(), Some("1"));
        assert_eq!(points[0].location.as_deref(), Some("Keller"));
        assert_eq!(Some(points[0].time), d.measured_at);
    }

    #[test]
    fn temperature_without_state_is_tagged_one() {
        let mut d = Device::new("116570272633", DeviceType::Repeater);
        d.measurements.temperature = Some(21.5);
        d.measured_at = Some(Utc::now());
        d.up_to_date = true;
        d.monitored = [MeasurementKind::Temperature, MeasurementKind::Power].into();
        d.is_monitored = true;

        let points = points_for(&d);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].kind, MeasurementKind::Temperature);
        assert_eq!(points[0].state.as_deref(), Some("1"));
    }

    #[test]
    fn zero_reading_is_still_a_reading() {
        let mut d = measured_switch();
        d.measurements.power = Some(0.0);
        d.monitored = [MeasurementKind::Power].into();
        d.is_monitored = true;
        assert_eq!(points_for(&d).len(), 1);
    }

    #[test]
    fn no_sinks_when_nothing_configured() {
        assert!(open_sinks(&SinkSettings::default()).unwrap().is_empty());
    }
}
