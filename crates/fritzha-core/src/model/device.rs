// ── Device domain types ──

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Device family, derived from the router's product name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum DeviceType {
    Switch,
    Repeater,
    Lamp,
    Unknown,
}

/// Kinds of reading a device can be configured to record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MeasurementKind {
    Voltage,
    Power,
    Energy,
    Temperature,
}

/// What the device can report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    pub has_state: bool,
    pub has_power: bool,
    pub has_temperature: bool,
}

/// Readings from the most recent cycle that reported them, in SI units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Measurements {
    /// Volts.
    pub voltage: Option<f64>,
    /// Watts.
    pub power: Option<f64>,
    /// Router's energy counter divided by 1000 (see `convert`).
    pub energy: Option<f64>,
    /// Degrees Celsius.
    pub temperature: Option<f64>,
}

impl Measurements {
    pub fn get(&self, kind: MeasurementKind) -> Option<f64> {
        match kind {
            MeasurementKind::Voltage => self.voltage,
            MeasurementKind::Power => self.power,
            MeasurementKind::Energy => self.energy,
            MeasurementKind::Temperature => self.temperature,
        }
    }
}

/// A smart home device known to the router.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    /// AIN without whitespace; unique within the inventory.
    pub ain: String,
    pub device_type: DeviceType,
    pub product_name: String,
    pub name: Option<String>,
    /// `"1"` when the router currently reaches the device.
    pub present: Option<String>,
    /// Switch state `"0"`/`"1"`, switches only.
    pub state: Option<String>,
    pub capabilities: Capabilities,

    // From configuration
    pub location: Option<String>,
    pub sublocation: Option<String>,
    pub monitored: BTreeSet<MeasurementKind>,
    pub is_monitored: bool,

    // Cycle state
    pub measurements: Measurements,
    pub measured_at: Option<DateTime<Utc>>,
    pub up_to_date: bool,
}

impl Device {
    pub fn new(ain: impl Into<String>, device_type: DeviceType) -> Self {
        Self {
            ain: ain.into(),
            device_type,
            product_name: String::new(),
            name: None,
            present: None,
            state: None,
            capabilities: Capabilities::default(),
            location: None,
            sublocation: None,
            monitored: BTreeSet::new(),
            is_monitored: false,
            measurements: Measurements::default(),
            measured_at: None,
            up_to_date: false,
        }
    }

    /// Whether the device should reach the sinks this cycle.
    pub fn is_publishable(&self) -> bool {
        self.is_monitored && self.up_to_date
    }

    /// Whether `kind` is both configured and currently has a value.
    pub fn wants(&self, kind: MeasurementKind) -> bool {
        self.monitored.contains(&kind) && self.measurements.get(kind).is_some()
    }
}
