//! Platform detection and per-board profiles.
//!
//! The terminal runs on one of two single-board computers, or on a desktop
//! for development. The board is identified once at startup from the
//! device-tree model string and mapped to an immutable [`PlatformProfile`]
//! describing its pin assignments, input transport and display target.
//!
//! Detection is a pure classification with three outcomes. Anything that is
//! not positively identified as a supported board, including a missing or
//! unreadable model file, selects the simulated profile.
//!
//! # Examples
//!
//! ```
//! use fobreader_core::PlatformKind;
//! use fobreader_hardware::platform::PlatformProfile;
//!
//! let kind = PlatformProfile::classify(Some("Raspberry Pi 4 Model B Rev 1.4\0"));
//! assert_eq!(kind, PlatformKind::RaspberryPi);
//!
//! let profile = PlatformProfile::for_kind(kind);
//! assert_eq!(profile.pins.trigger, 13);
//! ```

use std::path::{Path, PathBuf};

use fobreader_core::PinRole;
use fobreader_core::PlatformKind;
use fobreader_core::constants::*;
use serde::Serialize;
use tracing::{debug, info};

/// Logical GPIO line numbers for the eleven output roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PinMap {
    /// Address lines, bit 0 first.
    pub address: [u32; ADDRESS_LINES],
    pub trigger: u32,
    pub led: u32,
    pub beeper: u32,
}

impl PinMap {
    pub const ORANGE_PI: Self = Self {
        address: ORANGE_PI_ADDRESS_PINS,
        trigger: ORANGE_PI_TRIGGER_PIN,
        led: ORANGE_PI_LED_PIN,
        beeper: ORANGE_PI_BEEPER_PIN,
    };

    pub const RASPBERRY_PI: Self = Self {
        address: RASPBERRY_PI_ADDRESS_PINS,
        trigger: RASPBERRY_PI_TRIGGER_PIN,
        led: RASPBERRY_PI_LED_PIN,
        beeper: RASPBERRY_PI_BEEPER_PIN,
    };

    pub const SIMULATED: Self = Self {
        address: SIMULATED_ADDRESS_PINS,
        trigger: SIMULATED_TRIGGER_PIN,
        led: SIMULATED_LED_PIN,
        beeper: SIMULATED_BEEPER_PIN,
    };

    /// Line number assigned to `role`, or `None` for an address bit outside 0-7.
    pub fn line(&self, role: PinRole) -> Option<u32> {
        match role {
            PinRole::Address(bit) => self.address.get(usize::from(bit)).copied(),
            PinRole::Trigger => Some(self.trigger),
            PinRole::Led => Some(self.led),
            PinRole::Beeper => Some(self.beeper),
        }
    }

    /// Reverse lookup of a line number.
    pub fn role(&self, line: u32) -> Option<PinRole> {
        PinRole::all().find(|role| self.line(*role) == Some(line))
    }

    /// All `(role, line)` pairs in role order.
    pub fn lines(&self) -> impl Iterator<Item = (PinRole, u32)> + '_ {
        PinRole::all().filter_map(|role| self.line(role).map(|line| (role, line)))
    }
}

/// Where credentials come from on this platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InputTransport {
    /// Serial reader at 8N1, plus the optional Wiegand pulse decoder.
    Serial { path: String, baud_rate: u32 },
    /// Desktop keyboard.
    Simulated,
}

/// Where rendered frames go on this platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "kebab-case")]
pub enum DisplayTarget {
    /// Linux framebuffer device, written by a background writer.
    Framebuffer(PathBuf),
    /// Terminal window blitted synchronously.
    Window,
}

/// Immutable description of the board the terminal runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    pub kind: PlatformKind,
    pub transport: InputTransport,
    pub pins: PinMap,
    pub display: DisplayTarget,
}

impl PlatformProfile {
    /// Identify the board from the well-known device-tree model file.
    pub fn detect() -> Self {
        Self::detect_from(Path::new(DEVICE_TREE_MODEL_PATH))
    }

    /// Identify the board from a model file at `path`.
    ///
    /// A missing or unreadable file selects the simulated profile.
    pub fn detect_from(path: &Path) -> Self {
        let model = match std::fs::read(path) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                debug!("No board model at {}: {}", path.display(), e);
                None
            }
        };

        let kind = Self::classify(model.as_deref());
        info!(
            "Detected platform {} (model: {:?})",
            kind,
            model.as_deref().map(|m| m.trim_end_matches('\0').trim())
        );
        Self::for_kind(kind)
    }

    /// Classify a model string. Matching is by case-sensitive substring.
    pub fn classify(model: Option<&str>) -> PlatformKind {
        match model {
            Some(model) if model.contains(ORANGE_PI_MODEL) => PlatformKind::OrangePi,
            Some(model) if model.contains(RASPBERRY_PI_MODEL) => PlatformKind::RaspberryPi,
            _ => PlatformKind::Simulated,
        }
    }

    /// The hard-coded profile for a platform kind.
    pub fn for_kind(kind: PlatformKind) -> Self {
        match kind {
            PlatformKind::OrangePi => Self {
                kind,
                transport: InputTransport::Serial {
                    path: ORANGE_PI_SERIAL_PATH.to_string(),
                    baud_rate: SERIAL_BAUD_RATE,
                },
                pins: PinMap::ORANGE_PI,
                display: DisplayTarget::Framebuffer(PathBuf::from(ORANGE_PI_FRAMEBUFFER)),
            },
            PlatformKind::RaspberryPi => Self {
                kind,
                transport: InputTransport::Serial {
                    path: RASPBERRY_PI_SERIAL_PATH.to_string(),
                    baud_rate: SERIAL_BAUD_RATE,
                },
                pins: PinMap::RASPBERRY_PI,
                display: DisplayTarget::Framebuffer(PathBuf::from(RASPBERRY_PI_FRAMEBUFFER)),
            },
            PlatformKind::Simulated => Self {
                kind,
                transport: InputTransport::Simulated,
                pins: PinMap::SIMULATED,
                display: DisplayTarget::Window,
            },
        }
    }

    pub fn is_physical(&self) -> bool {
        self.kind.is_physical()
    }
}
