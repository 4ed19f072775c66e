//! Reader configuration.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration that relies on platform detection.
//!
//! ```toml
//! platform = "raspberry-pi"
//! log_level = "debug"
//!
//! [serial]
//! baud_rate = 9600
//!
//! [wiegand]
//! pipe = "/run/wiegand.fifo"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use fobreader_core::PlatformKind;
use fobreader_core::constants::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{HardwareError, Result};
use crate::platform::{DisplayTarget, InputTransport, PlatformProfile};

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReaderConfig {
    /// Board identification file.
    pub model_path: PathBuf,
    /// Skip detection and use this platform.
    pub platform: Option<PlatformKind>,
    pub serial: SerialConfig,
    pub gpio: GpioConfig,
    pub wiegand: WiegandConfig,
    pub display: DisplayConfig,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SerialConfig {
    pub baud_rate: u32,
    /// Upper bound on a single serial read.
    pub read_timeout_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GpioConfig {
    pub chip: PathBuf,
    /// Label shown for claimed lines in `gpioinfo`.
    pub consumer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WiegandConfig {
    /// Named pipe written by the Wiegand decoder, one credential per line.
    pub pipe: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// Override the platform's framebuffer device.
    pub framebuffer: Option<PathBuf>,
    /// Unbind the kernel console while the screen is in use.
    pub take_over_console: bool,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEVICE_TREE_MODEL_PATH),
            platform: None,
            serial: SerialConfig::default(),
            gpio: GpioConfig::default(),
            wiegand: WiegandConfig::default(),
            display: DisplayConfig::default(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: SERIAL_BAUD_RATE,
            read_timeout_ms: DEFAULT_SERIAL_TIMEOUT_MS,
        }
    }
}

impl Default for GpioConfig {
    fn default() -> Self {
        Self {
            chip: PathBuf::from(DEFAULT_GPIO_CHIP),
            consumer: GPIO_CONSUMER.to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            framebuffer: None,
            take_over_console: true,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl ReaderConfig {
    /// Load and validate a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::ConfigurationError` if the file cannot be read,
    /// does not parse, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HardwareError::configuration(format!("Cannot read {}: {e}", path.display()))
        })?;
        let config = Self::parse(&content)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::ConfigurationError` on a parse or validation failure.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| HardwareError::configuration(format!("Invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `HardwareError::ConfigurationError` naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.serial.baud_rate == 0 {
            return Err(HardwareError::configuration("serial.baud_rate must be non-zero"));
        }
        if self.gpio.chip.as_os_str().is_empty() {
            return Err(HardwareError::configuration("gpio.chip must not be empty"));
        }
        Ok(())
    }

    /// The platform profile after detection and configured overrides.
    pub fn resolve_profile(&self) -> PlatformProfile {
        let mut profile = match self.platform {
            Some(kind) => {
                debug!("Platform forced to {} by configuration", kind);
                PlatformProfile::for_kind(kind)
            }
            None => PlatformProfile::detect_from(&self.model_path),
        };

        if let InputTransport::Serial { baud_rate, .. } = &mut profile.transport {
            *baud_rate = self.serial.baud_rate;
        }
        if let (Some(path), DisplayTarget::Framebuffer(current)) =
            (&self.display.framebuffer, &mut profile.display)
        {
            *current = path.clone();
        }
        profile
    }
}
