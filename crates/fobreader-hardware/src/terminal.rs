//! The access-control terminal as one object.
//!
//! [`Terminal`] owns every device of a resolved [`PlatformProfile`]: the
//! input source, the signal bus shared by the relay encoder and the warning
//! signaler, and the screen. The caller drives it from a poll loop:
//!
//! ```text
//!  read() ──► credential ──► (access decision) ──► emit(code) / login()
//!                                                   warn(seconds)
//!  logout() / shutdown(): join beeps, emit(0)
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use fobreader_hardware::config::ReaderConfig;
//! use fobreader_hardware::terminal::Terminal;
//!
//! #[tokio::main]
//! async fn main() -> fobreader_hardware::Result<()> {
//!     let config = ReaderConfig::default();
//!     let mut terminal = Terminal::open(config.resolve_profile(), &config)?;
//!
//!     loop {
//!         let credential = terminal.read().await?;
//!         if credential.is_confirm() {
//!             terminal.emit(1)?;
//!             break;
//!         }
//!     }
//!
//!     terminal.shutdown().await
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use fobreader_core::Credential;
use tracing::{debug, info};

use crate::channel::{FrameChannel, FrameStats};
use crate::config::ReaderConfig;
use crate::devices::{AnyFrameSink, AnyInputSource, AnyPinDriver};
use crate::error::{HardwareError, Result};
use crate::frame::{FileFrameSink, Frame, FrameGeometry};
use crate::input::{
    ByteTransport, InputSource, PipeWiegandDecoder, SerialWiegandSource, SimulatedKeySource,
    WiegandDecoder, open_serial,
};
use crate::output::OutputBus;
use crate::pins::{GpioPinDriver, PinState, SignalBus, SimulatedPinDriver};
use crate::platform::{DisplayTarget, InputTransport, PlatformProfile};
use crate::screen::Screen;
use crate::surface::TerminalSurface;
use crate::warning::WarningSignaler;

/// A running terminal.
#[derive(Debug)]
pub struct Terminal {
    profile: PlatformProfile,
    input: AnyInputSource,
    output: OutputBus,
    warning: WarningSignaler,
    screen: Option<Screen>,
}

impl Terminal {
    /// Open every device of `profile` and put the bus in its idle state.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` if the GPIO lines, the
    /// serial port, the Wiegand pipe or the screen cannot be opened.
    pub fn open(profile: PlatformProfile, config: &ReaderConfig) -> Result<Self> {
        info!("Opening {} terminal", profile.kind);

        let driver = if profile.is_physical() {
            AnyPinDriver::Gpio(GpioPinDriver::open(
                &config.gpio.chip,
                &profile.pins,
                &config.gpio.consumer,
            )?)
        } else {
            AnyPinDriver::Simulated(SimulatedPinDriver::new())
        };
        let bus = Arc::new(SignalBus::new(profile.pins, driver));

        let input = match &profile.transport {
            InputTransport::Serial { path, baud_rate } => {
                let port = open_serial(path, *baud_rate, config.serial.read_timeout())?;
                let transport: Box<dyn ByteTransport> = Box::new(port);
                let decoder = match &config.wiegand.pipe {
                    Some(pipe) => {
                        let mut decoder = PipeWiegandDecoder::fifo(pipe.clone())?;
                        decoder.initialize()?;
                        Some(Box::new(decoder) as Box<dyn WiegandDecoder>)
                    }
                    None => None,
                };
                AnyInputSource::Serial(SerialWiegandSource::new(transport, decoder))
            }
            InputTransport::Simulated => AnyInputSource::Simulated(SimulatedKeySource::new()),
        };

        let screen = match &profile.display {
            DisplayTarget::Framebuffer(path) => {
                let sink = AnyFrameSink::File(FileFrameSink::open(path)?);
                Screen::framebuffer(FrameGeometry::SCREEN, FrameChannel::new(sink)?)
            }
            DisplayTarget::Window => Screen::window(FrameGeometry::SCREEN, TerminalSurface::open()?),
        };

        Self::from_parts(profile, bus, input, Some(screen))
    }

    /// Assemble a terminal from already-open devices and emit the idle code.
    ///
    /// # Errors
    ///
    /// Returns an error outside a Tokio runtime or if the idle code cannot be driven.
    pub fn from_parts(
        profile: PlatformProfile,
        bus: Arc<SignalBus>,
        input: AnyInputSource,
        screen: Option<Screen>,
    ) -> Result<Self> {
        let warning = WarningSignaler::new(Arc::clone(&bus))?;
        let output = OutputBus::new(bus);
        output.emit(0)?;

        Ok(Self {
            profile,
            input,
            output,
            warning,
            screen,
        })
    }

    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    /// Poll for a credential; empty when nothing arrived.
    ///
    /// # Errors
    ///
    /// Returns an error only if the input transport fails.
    pub async fn read(&mut self) -> Result<Credential> {
        self.input.read().await
    }

    /// Present `code` on the relay bus.
    ///
    /// # Errors
    ///
    /// Returns an error if a line write fails.
    pub fn emit(&self, code: u8) -> Result<()> {
        self.output.emit(code)
    }

    /// Signal a logged-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if a line write fails.
    pub fn login(&self) -> Result<()> {
        self.output.login()
    }

    /// Blink and beep for `seconds` remaining. See [`WarningSignaler::warn`].
    ///
    /// # Errors
    ///
    /// Returns an error if the LED write fails.
    pub fn warn(&self, seconds: i32) -> Result<Option<Duration>> {
        self.warning.warn(seconds)
    }

    /// Wait for in-flight beeps, then return the bus to idle.
    ///
    /// # Errors
    ///
    /// Returns an error if the idle code cannot be driven.
    pub async fn logout(&self) -> Result<()> {
        self.warning.join_pending().await;
        self.output.emit(0)?;
        debug!("Logged out");
        Ok(())
    }

    /// Show a frame on the status screen.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal has no screen or the frame does not fit it.
    pub fn present(&mut self, frame: Frame) -> Result<()> {
        match &mut self.screen {
            Some(screen) => screen.present(frame),
            None => Err(HardwareError::unsupported("present without a screen")),
        }
    }

    /// Live logical pin levels.
    pub fn pin_state(&self) -> PinState {
        self.output.signal_bus().state()
    }

    pub fn frame_stats(&self) -> Option<FrameStats> {
        self.screen.as_ref().and_then(Screen::stats)
    }

    /// Log out and wait for the screen writer to finish.
    ///
    /// The screen is flushed even when logging out fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the idle code cannot be driven.
    pub async fn shutdown(self) -> Result<()> {
        let logout = self.logout().await;
        if let Some(screen) = &self.screen {
            screen.flush().await;
        }
        logout?;
        info!("Terminal shut down");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MemoryFrameSink, MockSerialTransport};
    use fobreader_core::{Level, PinRole, PlatformKind};

    fn simulated_terminal(screen: Option<Screen>) -> (Terminal, crate::mock::MockSerialHandle) {
        let profile = PlatformProfile::for_kind(PlatformKind::Simulated);
        let bus = Arc::new(SignalBus::new(
            profile.pins,
            AnyPinDriver::Simulated(SimulatedPinDriver::new()),
        ));
        let (transport, serial) = MockSerialTransport::new();
        let input = AnyInputSource::Serial(SerialWiegandSource::new(Box::new(transport), None));
        let terminal = Terminal::from_parts(profile, bus, input, screen).unwrap();
        (terminal, serial)
    }

    #[tokio::test]
    async fn test_starts_idle() {
        let (terminal, _serial) = simulated_terminal(None);
        assert!(terminal.pin_state().is_idle());
    }

    #[tokio::test]
    async fn test_read_and_emit() {
        let (mut terminal, serial) = simulated_terminal(None);
        serial.push(b"B");

        assert!(terminal.read().await.unwrap().is_confirm());
        terminal.emit(0b1000_0001).unwrap();

        let state = terminal.pin_state();
        assert_eq!(state.address_code(), 0b1000_0001);
        assert!(state.is_high(PinRole::Trigger));
    }

    #[tokio::test]
    async fn test_login_sets_quirk_lines() {
        let (terminal, _serial) = simulated_terminal(None);
        terminal.login().unwrap();

        let state = terminal.pin_state();
        assert_eq!(state.level(PinRole::Address(5)), Level::High);
        assert!(state.is_high(PinRole::Trigger));
        assert!(state.is_high(PinRole::Led));
        assert!(!state.is_high(PinRole::Beeper));
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_waits_for_beep() {
        let (terminal, _serial) = simulated_terminal(None);
        terminal.emit(42).unwrap();
        let duration = terminal.warn(10).unwrap().unwrap();

        tokio::task::yield_now().await;
        assert!(terminal.pin_state().is_high(PinRole::Beeper));

        let start = tokio::time::Instant::now();
        terminal.logout().await.unwrap();

        assert!(start.elapsed() >= duration);
        assert!(terminal.pin_state().is_idle());
    }

    #[tokio::test]
    async fn test_present_without_screen_is_unsupported() {
        let (mut terminal, _serial) = simulated_terminal(None);
        let result = terminal.present(Frame::filled(FrameGeometry::SCREEN, 0));
        assert!(matches!(result, Err(HardwareError::Unsupported { .. })));
        assert!(terminal.frame_stats().is_none());
    }

    #[tokio::test]
    async fn test_shutdown_flushes_screen() {
        let (sink, handle) = MemoryFrameSink::new();
        let channel = FrameChannel::new(AnyFrameSink::Memory(sink)).unwrap();
        let screen = Screen::framebuffer(FrameGeometry::SCREEN, channel);
        let (mut terminal, _serial) = simulated_terminal(Some(screen));

        terminal.present(Frame::filled(FrameGeometry::SCREEN, 0xFFFF)).unwrap();
        terminal.shutdown().await.unwrap();

        assert_eq!(handle.frames().len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_screen_when_logout_fails() {
        let (sink, handle) = MemoryFrameSink::new();
        let channel = FrameChannel::new(AnyFrameSink::Memory(sink)).unwrap();
        let screen = Screen::framebuffer(FrameGeometry::SCREEN, channel);
        let (mut terminal, _serial) = simulated_terminal(Some(screen));

        terminal.present(Frame::filled(FrameGeometry::SCREEN, 0x07E0)).unwrap();
        let AnyPinDriver::Simulated(driver) = terminal.output.signal_bus().driver() else {
            panic!("expected simulated driver");
        };
        driver.set_fail_writes(true);

        let result = terminal.shutdown().await;
        assert!(matches!(result, Err(HardwareError::CommunicationError { .. })));
        assert_eq!(handle.frames().len(), 1);
    }
}
