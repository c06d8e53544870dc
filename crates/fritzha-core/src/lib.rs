//! Polling engine between `fritzha-api` and the measurement sinks.
//!
//! - **[`Poller`]**: Owns the router session and the device inventory.
//!   [`start()`](Poller::start) logs in, builds the inventory and matches it
//!   against the configured devices; [`run()`](Poller::run) drives the
//!   measurement cycles until cancelled; [`close()`](Poller::close) logs off
//!   and releases the sinks.
//!
//! - **[`Inventory`]**: The router's smart home devices keyed by AIN,
//!   rebuilt from scratch on every start and updated in place each cycle.
//!
//! - **[`MeasurementSink`]**: Where readings go. [`CsvSink`] appends rows to
//!   a file, [`InfluxSink`] writes points through the InfluxDB v2 HTTP API.
//!
//! - **[`CoreError`]**: Every failure carries an explicit
//!   [`is_ignorable()`](CoreError::is_ignorable) verdict that the polling
//!   loop uses to decide between retrying and shutting down.

pub mod config;
pub mod convert;
pub mod error;
pub mod inventory;
pub mod model;
pub mod poller;
pub mod schedule;
pub mod sink;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DeviceConfig, PollerConfig, RouterConfig};
pub use error::CoreError;
pub use inventory::{Inventory, ReconcileReport};
pub use model::{Capabilities, Device, DeviceType, MeasurementKind, Measurements};
pub use poller::{CycleReport, NextCycle, PollStats, Poller, RunOptions};
pub use sink::{
    CsvSink, InfluxConfig, InfluxSink, MeasurementPoint, MeasurementSink, SinkSettings,
    open_sinks, points_for,
};

pub use fritzha_api::{TlsMode, TransportConfig};
