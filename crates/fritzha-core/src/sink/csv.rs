// ── CSV file sink ──
//
// Appends one row per device and cycle. The header goes in only when the
// sink creates the file, so an existing history keeps growing. File I/O
// runs on the blocking pool; rows are rendered before handing off.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use tracing::debug;

use super::MeasurementSink;
use crate::error::CoreError;
use crate::model::Device;

const HEADER: [&str; 12] = [
    "Time",
    "AIN",
    "Type",
    "Name",
    "Location",
    "Sublocation",
    "State",
    "Present",
    "Voltage",
    "Power",
    "Energy",
    "Temperature",
];

pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl MeasurementSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn publish(
        &mut self,
        _cycle_time: DateTime<Utc>,
        devices: &[&Device],
    ) -> Result<(), CoreError> {
        if devices.is_empty() {
            return Ok(());
        }
        let rows: Vec<_> = devices.iter().map(|d| row(d)).collect();
        let path = self.path.clone();
        let written = match tokio::task::spawn_blocking(move || append(&path, &rows)).await {
            Ok(result) => result,
            Err(e) => Err(std::io::Error::other(e)),
        };
        written.map_err(|e| CoreError::Sink {
            sink: self.name().into(),
            message: format!("{}: {e}", self.path.display()),
        })
    }
}

fn append(path: &Path, rows: &[[String; 12]]) -> Result<(), std::io::Error> {
    let new_file = !path.exists();
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    debug!(path = %path.display(), new_file, "CSV file opened");

    let mut writer = ::csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    if new_file {
        writer.write_record(HEADER)?;
    }
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()
}

fn row(device: &Device) -> [String; 12] {
    let time = device
        .measured_at
        .map(|t| {
            t.with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S%.6f")
                .to_string()
        })
        .unwrap_or_default();
    let text = |v: &Option<String>| v.clone().unwrap_or_default();
    let number = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();

    [
        time,
        device.ain.clone(),
        device.device_type.to_string(),
        text(&device.name),
        text(&device.location),
        text(&device.sublocation),
        text(&device.state),
        text(&device.present),
        number(device.measurements.voltage),
        number(device.measurements.power),
        number(device.measurements.energy),
        number(device.measurements.temperature),
    ]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::DeviceType;

    fn plug() -> Device {
        let mut d = Device::new("087610000434", DeviceType::Switch);
        d.name = Some("Waschmaschine, Keller".into());
        d.location = Some("Keller".into());
        d.state = Some("1".into());
        d.present = Some("1".into());
        d.measurements.voltage = Some(230.051);
        d.measurements.power = Some(4.82);
        d.measured_at = Some(Utc::now());
        d.up_to_date = true;
        d
    }

    #[tokio::test]
    async fn header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fritz.csv");
        let mut sink = CsvSink::new(path.clone());
        let d = plug();

        sink.publish(Utc::now(), &[&d]).await.unwrap();
        sink.publish(Utc::now(), &[&d]).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "Time,AIN,Type,Name,Location,Sublocation,State,Present,Voltage,Power,Energy,Temperature"
        );
        assert!(lines[1].contains(",087610000434,SWITCH,\"Waschmaschine, Keller\",Keller,,1,1,230.051,4.82,,"));
    }

    #[tokio::test]
    async fn existing_file_gets_no_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fritz.csv");
        std::fs::write(&path, "previous\n").unwrap();

        let mut sink = CsvSink::new(path.clone());
        sink.publish(Utc::now(), &[&plug()]).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("previous\n"));
        assert!(!content.contains("Time,AIN"));
    }

    #[tokio::test]
    async fn unwritable_path_is_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path().join("missing").join("fritz.csv"));

        let err = sink.publish(Utc::now(), &[&plug()]).await.unwrap_err();
        assert!(err.is_ignorable());
        assert!(matches!(err, CoreError::Sink { ref sink, .. } if sink == "csv"));
    }
}
