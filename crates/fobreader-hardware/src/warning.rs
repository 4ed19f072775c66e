//! Countdown warning signaler.
//!
//! As a session deadline approaches the terminal blinks its LED once per
//! second and pulses the beeper. The beep length is a function of the
//! seconds remaining:
//!
//! | Seconds remaining | LED            | Beep                                |
//! |-------------------|----------------|-------------------------------------|
//! | 46..=59           | on if odd      | none                                |
//! | 31..=45           | on if odd      | 15 ms                               |
//! | 2..=30            | on if odd      | `510 - floor(ln(s) * 147)` ms       |
//! | 1                 | unchanged      | 510 ms                              |
//! | anything else     | unchanged      | none                                |
//!
//! Each beep runs as its own task: beeper high, sleep, beeper low. Pulses are
//! not cancelled or serialized against each other; [`WarningSignaler::join_pending`]
//! waits for all of them and is called before the bus is returned to idle.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use fobreader_core::constants::*;
use fobreader_core::{Level, PinRole};
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

use crate::error::{HardwareError, Result};
use crate::pins::SignalBus;

/// LED level for a countdown value, if the LED should change.
pub fn led_level(seconds: i32) -> Option<Level> {
    (seconds > 1 && seconds < WARN_MAX_SECONDS).then(|| Level::from(seconds % 2 == 1))
}

/// Beep length for a countdown value, if a beep should fire.
pub fn beep_duration(seconds: i32) -> Option<Duration> {
    if seconds > WARN_SILENT_ABOVE_SECONDS || seconds < 1 {
        return None;
    }

    if seconds > WARN_SHORT_ABOVE_SECONDS {
        return Some(Duration::from_millis(WARN_SHORT_BEEP_MS));
    }

    let ramp = (f64::from(seconds).ln() * WARN_RAMP_SLOPE).floor() as i64;
    let millis = (WARN_RAMP_OFFSET_MS - ramp).max(0) as u64;
    Some(Duration::from_millis(millis))
}

/// Drives the LED blink and beeper pulses for a countdown.
#[derive(Debug)]
pub struct WarningSignaler {
    bus: Arc<SignalBus>,
    runtime: Handle,
    pulses: Mutex<JoinSet<Result<()>>>,
}

impl WarningSignaler {
    /// Create a signaler whose pulses run on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` when called outside a runtime.
    pub fn new(bus: Arc<SignalBus>) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            HardwareError::initialization_failed(format!("Warning signaler needs a runtime: {e}"))
        })?;
        Ok(Self::with_runtime(bus, runtime))
    }

    pub fn with_runtime(bus: Arc<SignalBus>, runtime: Handle) -> Self {
        Self {
            bus,
            runtime,
            pulses: Mutex::new(JoinSet::new()),
        }
    }

    /// Signal `seconds` remaining.
    ///
    /// Returns the length of the scheduled beep, or `None` when the value is
    /// outside the beeping range. Out-of-range values are ignored silently.
    ///
    /// # Errors
    ///
    /// Returns an error if the LED write fails.
    pub fn warn(&self, seconds: i32) -> Result<Option<Duration>> {
        if let Some(level) = led_level(seconds) {
            self.bus.drive(&[(PinRole::Led, level)])?;
        }

        let Some(duration) = beep_duration(seconds) else {
            trace!("No beep for {} seconds remaining", seconds);
            return Ok(None);
        };

        let bus = Arc::clone(&self.bus);
        let mut pulses = self.lock();
        while let Some(finished) = pulses.try_join_next() {
            log_pulse_result(finished);
        }
        pulses.spawn_on(
            async move {
                bus.drive(&[(PinRole::Beeper, Level::High)])?;
                tokio::time::sleep(duration).await;
                bus.drive(&[(PinRole::Beeper, Level::Low)])
            },
            &self.runtime,
        );

        debug!("Beep {}ms for {} seconds remaining", duration.as_millis(), seconds);
        Ok(Some(duration))
    }

    /// Number of pulses started and not yet reaped.
    pub fn pending(&self) -> usize {
        self.lock().len()
    }

    /// Wait for every in-flight pulse to finish.
    pub async fn join_pending(&self) {
        let mut pulses = std::mem::take(&mut *self.lock());
        while let Some(finished) = pulses.join_next().await {
            log_pulse_result(finished);
        }
    }

    fn lock(&self) -> MutexGuard<'_, JoinSet<Result<()>>> {
        self.pulses.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn log_pulse_result(result: std::result::Result<Result<()>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Beep pulse failed: {}", e),
        Err(e) => warn!("Beep pulse task aborted: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::AnyPinDriver;
    use crate::pins::SimulatedPinDriver;
    use crate::platform::PinMap;
    use proptest::prelude::*;
    use rstest::rstest;

    fn signal_bus() -> Arc<SignalBus> {
        Arc::new(SignalBus::new(
            PinMap::SIMULATED,
            AnyPinDriver::Simulated(SimulatedPinDriver::new()),
        ))
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    #[case(46)]
    #[case(50)]
    #[case(59)]
    #[case(60)]
    #[case(61)]
    fn test_no_beep(#[case] seconds: i32) {
        assert_eq!(beep_duration(seconds), None);
    }

    #[rstest]
    #[case(31)]
    #[case(35)]
    #[case(45)]
    fn test_short_beep_band(#[case] seconds: i32) {
        assert_eq!(beep_duration(seconds), Some(Duration::from_millis(15)));
    }

    #[rstest]
    #[case(1, 510)]
    #[case(2, 409)]
    #[case(10, 172)]
    #[case(30, 11)]
    fn test_logarithmic_ramp(#[case] seconds: i32, #[case] millis: u64) {
        assert_eq!(beep_duration(seconds), Some(Duration::from_millis(millis)));
    }

    #[test]
    fn test_ramp_matches_formula_at_ten() {
        let expected = 510 - (10f64.ln() * 147.0).floor() as u64;
        assert_eq!(beep_duration(10), Some(Duration::from_millis(expected)));
    }

    #[rstest]
    #[case(2, Some(Level::Low))]
    #[case(3, Some(Level::High))]
    #[case(50, Some(Level::Low))]
    #[case(59, Some(Level::High))]
    #[case(1, None)]
    #[case(0, None)]
    #[case(60, None)]
    #[case(-1, None)]
    fn test_led_parity(#[case] seconds: i32, #[case] expected: Option<Level>) {
        assert_eq!(led_level(seconds), expected);
    }

    proptest! {
        #[test]
        fn test_ramp_never_lengthens_toward_deadline(seconds in 2i32..=30) {
            let closer = beep_duration(seconds - 1).unwrap();
            let farther = beep_duration(seconds).unwrap();
            prop_assert!(closer >= farther);
        }
    }

    #[tokio::test]
    async fn test_out_of_policy_values_touch_nothing() {
        let bus = signal_bus();
        let signaler = WarningSignaler::new(Arc::clone(&bus)).unwrap();

        for seconds in [0, 60, 61, -1] {
            assert_eq!(signaler.warn(seconds).unwrap(), None);
        }

        assert!(bus.state().is_idle());
        assert_eq!(signaler.pending(), 0);
    }

    #[tokio::test]
    async fn test_silent_band_blinks_without_beep() {
        let bus = signal_bus();
        let signaler = WarningSignaler::new(Arc::clone(&bus)).unwrap();

        bus.drive(&[(PinRole::Led, Level::High)]).unwrap();
        assert_eq!(signaler.warn(50).unwrap(), None);

        assert!(!bus.state().is_high(PinRole::Led));
        assert_eq!(signaler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pulse_holds_beeper_for_exact_duration() {
        let bus = signal_bus();
        let signaler = WarningSignaler::new(Arc::clone(&bus)).unwrap();

        let duration = signaler.warn(35).unwrap().unwrap();
        assert_eq!(duration, Duration::from_millis(15));
        assert!(bus.state().is_high(PinRole::Led));

        tokio::time::sleep(Duration::from_millis(14)).await;
        assert!(bus.state().is_high(PinRole::Beeper));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(!bus.state().is_high(PinRole::Beeper));
    }

    #[tokio::test(start_paused = true)]
    async fn test_join_pending_waits_for_pulse() {
        let bus = signal_bus();
        let signaler = WarningSignaler::new(Arc::clone(&bus)).unwrap();

        let start = tokio::time::Instant::now();
        signaler.warn(10).unwrap();
        signaler.join_pending().await;

        assert!(start.elapsed() >= beep_duration(10).unwrap());
        assert!(!bus.state().is_high(PinRole::Beeper));
        assert_eq!(signaler.pending(), 0);
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let result = WarningSignaler::new(signal_bus());
        assert!(result.unwrap_err().is_startup_failure());
    }
}
