//! fobreader: drives an access-control fob reader terminal.
//!
//! Detects the board, opens the reader, relay bus and screen, and polls for
//! credentials. Bring-up subcommands exercise the relay bus and the warning
//! beeper on their own.
//!
//! Logs go to stderr. On the simulated platform the terminal window is drawn
//! on stdout, so redirect stderr when running there.

mod cli;
mod console;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use fobreader_core::constants::VTCONSOLE_BIND_PATH;
use fobreader_hardware::{PlatformProfile, ReaderConfig, Terminal};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, DEFAULT_CONFIG_PATH, EmitArgs, WarnArgs};
use crate::console::ConsoleGuard;

/// Pause between empty polls of a non-blocking reader.
const IDLE_POLL: Duration = Duration::from_millis(10);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.log_level);

    let profile = config.resolve_profile();
    match cli.command {
        Command::Run => cmd_run(profile, &config).await,
        Command::Detect => cmd_detect(&profile),
        Command::Emit(ref args) => cmd_emit(profile, &config, args).await,
        Command::Warn(ref args) => cmd_warn(profile, &config, args).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<ReaderConfig> {
    match path {
        Some(path) => ReaderConfig::load(path)
            .with_context(|| format!("Failed to load configuration {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            ReaderConfig::load(Path::new(DEFAULT_CONFIG_PATH))
                .context("Failed to load default configuration")
        }
        None => Ok(ReaderConfig::default()),
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn open_terminal(profile: PlatformProfile, config: &ReaderConfig) -> Result<Terminal> {
    let kind = profile.kind;
    Terminal::open(profile, config).with_context(|| format!("Failed to open {kind} terminal"))
}

/// Poll for credentials until Ctrl-C, then return the bus to idle.
async fn cmd_run(profile: PlatformProfile, config: &ReaderConfig) -> Result<()> {
    let _console = if profile.is_physical() && config.display.take_over_console {
        Some(ConsoleGuard::take_over(Path::new(VTCONSOLE_BIND_PATH))?)
    } else {
        None
    };

    let mut terminal = open_terminal(profile, config)?;
    info!("Polling for credentials");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
            read = terminal.read() => match read {
                Ok(credential) if credential.is_empty() => tokio::time::sleep(IDLE_POLL).await,
                Ok(credential) => info!("Credential: {}", credential),
                Err(e) => {
                    warn!("Input read failed: {}", e);
                    tokio::time::sleep(IDLE_POLL).await;
                }
            },
        }
    }

    terminal.shutdown().await.context("Failed to return bus to idle")
}

fn cmd_detect(profile: &PlatformProfile) -> Result<()> {
    let rendered = serde_json::to_string_pretty(profile).context("Failed to render profile")?;
    println!("{rendered}");
    Ok(())
}

async fn cmd_emit(profile: PlatformProfile, config: &ReaderConfig, args: &EmitArgs) -> Result<()> {
    let terminal = open_terminal(profile, config)?;
    terminal.emit(args.code).context("Failed to emit code")?;
    debug!("Holding code {} for {}ms", args.code, args.hold_ms);
    tokio::time::sleep(Duration::from_millis(args.hold_ms)).await;
    terminal.shutdown().await.context("Failed to return bus to idle")
}

async fn cmd_warn(profile: PlatformProfile, config: &ReaderConfig, args: &WarnArgs) -> Result<()> {
    let terminal = open_terminal(profile, config)?;
    match terminal.warn(args.seconds).context("Failed to signal warning")? {
        Some(duration) => info!("Beeping {}ms", duration.as_millis()),
        None => info!("No beep for {} seconds remaining", args.seconds),
    }
    terminal.shutdown().await.context("Failed to return bus to idle")
}
