use crate::{
    Result,
    constants::{ADDRESS_LINES, CANCEL_TOKEN, CONFIRM_TOKEN},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Board family the terminal is running on.
///
/// Selected once at startup and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformKind {
    /// Orange Pi board with serial reader and relay bus.
    OrangePi,
    /// Raspberry Pi board with serial reader and relay bus.
    RaspberryPi,
    /// Desktop development mode: keyboard input, terminal display, no bus.
    Simulated,
}

impl PlatformKind {
    /// Whether this platform drives real GPIO lines and a serial reader.
    #[must_use]
    pub fn is_physical(&self) -> bool {
        !matches!(self, Self::Simulated)
    }

    /// Stable kebab-case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrangePi => "orange-pi",
            Self::RaspberryPi => "raspberry-pi",
            Self::Simulated => "simulated",
        }
    }
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PlatformKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "orange-pi" | "orangepi" => Ok(Self::OrangePi),
            "raspberry-pi" | "raspberrypi" => Ok(Self::RaspberryPi),
            "simulated" | "sim" => Ok(Self::Simulated),
            other => Err(Error::InvalidPlatform(other.to_string())),
        }
    }
}

/// Logical level of an output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Level {
    #[default]
    Low,
    High,
}

impl Level {
    #[must_use]
    pub fn is_high(&self) -> bool {
        matches!(self, Self::High)
    }

    /// Raw line value as expected by GPIO drivers.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Low => 0,
            Self::High => 1,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

/// Logical role of one of the eleven output lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinRole {
    /// Address bus line for bit `n` (0-7).
    Address(u8),
    /// Strobe telling the relay hardware the address is valid.
    Trigger,
    /// Status LED.
    Led,
    /// Audible beeper.
    Beeper,
}

impl PinRole {
    /// Create an address role with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidPinRole` if `bit` is not in 0-7.
    pub fn address(bit: u8) -> Result<Self> {
        if usize::from(bit) >= ADDRESS_LINES {
            return Err(Error::InvalidPinRole(format!(
                "Address bit must be 0-{}, got {bit}",
                ADDRESS_LINES - 1
            )));
        }
        Ok(Self::Address(bit))
    }

    /// All eleven roles: address 0..7, trigger, LED, beeper.
    pub fn all() -> impl Iterator<Item = PinRole> {
        (0..ADDRESS_LINES as u8)
            .map(PinRole::Address)
            .chain([PinRole::Trigger, PinRole::Led, PinRole::Beeper])
    }

    /// Dense index of the role (0-10), matching [`PinRole::all`] order.
    ///
    /// `None` for an address bit outside 0-7.
    #[must_use]
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::Address(bit) if usize::from(*bit) >= ADDRESS_LINES => None,
            Self::Address(bit) => Some(usize::from(*bit)),
            Self::Trigger => Some(ADDRESS_LINES),
            Self::Led => Some(ADDRESS_LINES + 1),
            Self::Beeper => Some(ADDRESS_LINES + 2),
        }
    }
}

impl fmt::Display for PinRole {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Address(bit) => write!(f, "address{bit}"),
            Self::Trigger => write!(f, "trigger"),
            Self::Led => write!(f, "led"),
            Self::Beeper => write!(f, "beeper"),
        }
    }
}

/// One normalized read event from an input source.
///
/// Can hold a single digit, a control token or a whole decoded card payload.
/// An empty credential means nothing was available on this poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The "nothing this poll" credential.
    #[must_use]
    pub fn empty() -> Self {
        Self(String::new())
    }

    #[must_use]
    pub fn confirm() -> Self {
        Self::new(CONFIRM_TOKEN)
    }

    #[must_use]
    pub fn cancel() -> Self {
        Self::new(CANCEL_TOKEN)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn is_confirm(&self) -> bool {
        self.0 == CONFIRM_TOKEN
    }

    #[must_use]
    pub fn is_cancel(&self) -> bool {
        self.0 == CANCEL_TOKEN
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}
