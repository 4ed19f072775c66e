//! Output line drivers and the owned signal bus.
//!
//! A [`PinDriver`] knows how to set raw GPIO lines. The [`SignalBus`] wraps a
//! driver together with the board's [`PinMap`] and the live logical
//! [`PinState`], and is the only path through which line levels change. The
//! output bus and the warning signaler share one `SignalBus`; nothing else
//! holds it.
//!
//! Every call to [`SignalBus::drive`] runs under the bus lock, so a batch of
//! transitions is applied in slice order and never interleaves with another
//! batch.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use fobreader_core::constants::OUTPUT_LINES;
use fobreader_core::{Level, PinRole};
use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use tracing::{debug, info, trace};

use crate::devices::AnyPinDriver;
use crate::error::{HardwareError, Result};
use crate::platform::PinMap;

/// Raw line driver.
pub trait PinDriver: Send + Sync {
    /// Drive each line to its level, strictly in slice order.
    ///
    /// # Errors
    ///
    /// Returns an error if a line was never claimed or the write fails.
    fn write(&self, writes: &[(u32, Level)]) -> Result<()>;
}

/// Live logical level of every output role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PinState {
    levels: [Level; OUTPUT_LINES],
}

impl PinState {
    /// Level of `role`; an unmapped role reads low.
    pub fn level(&self, role: PinRole) -> Level {
        role.index().map_or(Level::Low, |index| self.levels[index])
    }

    pub fn is_high(&self, role: PinRole) -> bool {
        self.level(role).is_high()
    }

    /// Record `level` for `role`. Unmapped roles are ignored.
    pub fn set(&mut self, role: PinRole, level: Level) {
        if let Some(index) = role.index() {
            self.levels[index] = level;
        }
    }

    /// The code currently presented on the address lines.
    pub fn address_code(&self) -> u8 {
        (0..8u8)
            .filter(|bit| self.is_high(PinRole::Address(*bit)))
            .fold(0, |code, bit| code | (1 << bit))
    }

    /// Whether every line is low.
    pub fn is_idle(&self) -> bool {
        self.levels.iter().all(|level| !level.is_high())
    }
}

/// The terminal's output lines: pin map, driver and logical state.
#[derive(Debug)]
pub struct SignalBus {
    pins: PinMap,
    driver: AnyPinDriver,
    state: Mutex<PinState>,
}

impl SignalBus {
    pub fn new(pins: PinMap, driver: AnyPinDriver) -> Self {
        Self {
            pins,
            driver,
            state: Mutex::new(PinState::default()),
        }
    }

    pub fn pins(&self) -> &PinMap {
        &self.pins
    }

    pub fn driver(&self) -> &AnyPinDriver {
        &self.driver
    }

    /// Snapshot of the logical pin state.
    pub fn state(&self) -> PinState {
        *self.lock()
    }

    /// Apply a batch of transitions in order.
    ///
    /// The logical state only records transitions the driver accepted.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InvalidData` for a role with no line, or the
    /// driver's error. Transitions before the failing one stay applied.
    pub fn drive(&self, writes: &[(PinRole, Level)]) -> Result<()> {
        let mut state = self.lock();
        for &(role, level) in writes {
            let line = self
                .pins
                .line(role)
                .ok_or_else(|| HardwareError::invalid_data(format!("No line mapped for {role}")))?;
            trace!("{} (line {}) -> {:?}", role, line, level);
            self.driver.write(&[(line, level)])?;
            state.set(role, level);
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, PinState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// GPIO character-device driver with every line claimed as an output.
#[derive(Debug)]
pub struct GpioPinDriver {
    chip_path: PathBuf,
    handles: HashMap<u32, LineHandle>,
}

impl GpioPinDriver {
    /// Open `chip_path` and claim every line in `pins` as an output, initially low.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` if the chip cannot be
    /// opened or any line cannot be claimed.
    pub fn open(chip_path: &Path, pins: &PinMap, consumer: &str) -> Result<Self> {
        let mut chip = Chip::new(chip_path).map_err(|e| {
            HardwareError::initialization_failed(format!(
                "Cannot open GPIO chip {}: {}",
                chip_path.display(),
                e
            ))
        })?;

        let mut handles = HashMap::with_capacity(OUTPUT_LINES);
        for (role, line) in pins.lines() {
            let handle = chip
                .get_line(line)
                .and_then(|l| l.request(LineRequestFlags::OUTPUT, 0, consumer))
                .map_err(|e| {
                    HardwareError::initialization_failed(format!(
                        "Cannot claim GPIO line {line} ({role}) as output: {e}"
                    ))
                })?;
            handles.insert(line, handle);
        }

        info!(
            "Claimed {} GPIO lines on {}",
            handles.len(),
            chip_path.display()
        );

        Ok(Self {
            chip_path: chip_path.to_path_buf(),
            handles,
        })
    }

    pub fn chip_path(&self) -> &Path {
        &self.chip_path
    }
}

impl PinDriver for GpioPinDriver {
    fn write(&self, writes: &[(u32, Level)]) -> Result<()> {
        for &(line, level) in writes {
            let handle = self.handles.get(&line).ok_or_else(|| {
                HardwareError::invalid_data(format!("GPIO line {line} was not claimed"))
            })?;
            handle.set_value(level.as_u8())?;
        }
        Ok(())
    }
}

/// In-memory driver used on the simulated platform.
///
/// Nothing physical is driven; the driver keeps the level of every line it
/// has seen and the full transition history, so the bus can be inspected.
#[derive(Debug, Default)]
pub struct SimulatedPinDriver {
    inner: Mutex<SimulatedLines>,
}

#[derive(Debug, Default)]
struct SimulatedLines {
    levels: HashMap<u32, Level>,
    history: Vec<(u32, Level)>,
    fail_writes: bool,
}

impl SimulatedPinDriver {
    pub fn new() -> Self {
        debug!("Using simulated pin driver");
        Self::default()
    }

    /// Current level of `line` (low if never written).
    pub fn level(&self, line: u32) -> Level {
        self.lock().levels.get(&line).copied().unwrap_or_default()
    }

    /// Every transition applied so far, oldest first.
    pub fn history(&self) -> Vec<(u32, Level)> {
        self.lock().history.clone()
    }

    pub fn clear_history(&self) {
        self.lock().history.clear();
    }

    /// Make every following write fail until switched off again.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedLines> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PinDriver for SimulatedPinDriver {
    fn write(&self, writes: &[(u32, Level)]) -> Result<()> {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(HardwareError::communication("Simulated line write failure"));
        }
        for &(line, level) in writes {
            inner.levels.insert(line, level);
            inner.history.push((line, level));
        }
        Ok(())
    }
}
