// fritzha-api: Async Rust client for the FRITZ!Box home automation interface

pub mod auth;
pub mod error;
pub mod models;
pub mod session;
pub mod transport;

pub use auth::{SessionId, challenge_response};
pub use error::Error;
pub use models::{DeviceEntry, DeviceList, PowerMeter, SessionInfo, SwitchInfo, TemperatureInfo};
pub use session::SessionClient;
pub use transport::{TlsMode, TransportConfig};
