//! Clap derive structures for the `fritzha` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// fritzha -- FRITZ!Box smart home measurements into InfluxDB and CSV
#[derive(Debug, Parser)]
#[command(
    name = "fritzha",
    version,
    about = "Record FRITZ!Box smart home measurements",
    long_about = "Periodically reads voltage, power, energy and temperature from\n\
        FRITZ!DECT devices through the FRITZ!Box home automation interface\n\
        and stores them in InfluxDB and/or a CSV file.\n\n\
        Without --config, fritzToInfluxHA.json is looked up in the user\n\
        configuration directory and then in /etc.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(long, short = 'c', env = "FRITZHA_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per line (journald, log shippers)
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// One AIN per line (scripting)
    Plain,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Poll the devices and write measurements until interrupted
    Run(RunArgs),

    /// Show the devices known to the FRITZ!Box with their current readings
    #[command(alias = "dev")]
    Devices(DevicesArgs),

    /// Compute the login response for a challenge and password
    Response(ResponseArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Test run: a single cycle without waiting
    #[arg(long, short = 't')]
    pub test: bool,

    /// Running as a service: per-cycle progress only at debug level
    #[arg(long, short = 's')]
    pub service: bool,
}

#[derive(Debug, Args)]
pub struct DevicesArgs {
    /// Output format
    #[arg(long, short = 'o', default_value = "table")]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ResponseArgs {
    /// Challenge as sent by login_sid.lua
    #[arg(long, short = 'c')]
    pub challenge: String,

    /// FRITZ!Box password
    #[arg(long, short = 'p', env = "FRITZHA_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
