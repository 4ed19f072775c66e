//! Command-line interface definitions for fobreader.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Configuration file read when `--config` is not given, if it exists.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fobreader.toml";

/// Access-control terminal driver.
#[derive(Parser)]
#[command(name = "fobreader", version, about)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (TOML).
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Command {
    /// Open the terminal and poll for credentials until interrupted.
    Run,
    /// Print the resolved platform profile.
    Detect,
    /// Drive the relay bus to a code, hold it, then return to idle.
    Emit(EmitArgs),
    /// Fire one countdown warning, then return to idle.
    Warn(WarnArgs),
}

/// Arguments for the `emit` subcommand.
#[derive(Parser)]
pub struct EmitArgs {
    /// Access code, 0-255.
    pub code: u8,

    /// How long to hold the code before logging out, in milliseconds.
    #[arg(long, default_value_t = 500)]
    pub hold_ms: u64,
}

/// Arguments for the `warn` subcommand.
#[derive(Parser)]
pub struct WarnArgs {
    /// Seconds remaining before the deadline.
    #[arg(allow_negative_numbers = true)]
    pub seconds: i32,
}
