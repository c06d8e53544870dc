// ── Domain model ──

pub mod device;

pub use device::{Capabilities, Device, DeviceType, MeasurementKind, Measurements};
