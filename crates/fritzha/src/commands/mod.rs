//! Subcommand handlers.

pub mod devices;
pub mod response;
pub mod run;

use std::path::Path;

use fritzha_config::{LoadedConfig, load_config};
use fritzha_core::PollerConfig;

use crate::error::CliError;

/// Load the configuration file and derive the poller settings from it.
fn load(explicit: Option<&Path>) -> Result<(LoadedConfig, PollerConfig), CliError> {
    let loaded = load_config(explicit)?;
    loaded.config.log_summary();
    let poller = loaded.config.poller_config()?;
    Ok((loaded, poller))
}
