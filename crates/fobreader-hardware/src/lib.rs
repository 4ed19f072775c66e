//! Hardware layer for the fob reader access-control terminal.
//!
//! This crate reads credentials from the terminal's reader, signals the
//! result on the relay bus, the LED and the beeper, and delivers status
//! screen frames to the display without stalling the input loop.
//!
//! # Platforms
//!
//! The board is identified once at startup from the device-tree model
//! string ([`PlatformProfile::detect`]):
//!
//! - **Orange Pi / Raspberry Pi**: serial reader (with an optional Wiegand
//!   decoder pipe), eleven GPIO output lines, framebuffer panel.
//! - **Simulated**: anything else. Keyboard input, terminal display, and
//!   in-memory pin state that tests can inspect.
//!
//! # Signaling
//!
//! [`OutputBus`] and [`WarningSignaler`] are the only writers of the pin
//! state; both go through one [`SignalBus`](pins::SignalBus) that applies
//! transitions in order under a lock.
//!
//! ```no_run
//! use std::sync::Arc;
//! use fobreader_hardware::devices::AnyPinDriver;
//! use fobreader_hardware::pins::{SignalBus, SimulatedPinDriver};
//! use fobreader_hardware::platform::PinMap;
//! use fobreader_hardware::{OutputBus, WarningSignaler};
//!
//! #[tokio::main]
//! async fn main() -> fobreader_hardware::Result<()> {
//!     let bus = Arc::new(SignalBus::new(
//!         PinMap::SIMULATED,
//!         AnyPinDriver::Simulated(SimulatedPinDriver::new()),
//!     ));
//!     let output = OutputBus::new(Arc::clone(&bus));
//!     let warning = WarningSignaler::new(Arc::clone(&bus))?;
//!
//!     output.emit(3)?;
//!     warning.warn(10)?;
//!
//!     warning.join_pending().await;
//!     output.emit(0)?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result] with a [`HardwareError`].
//! A read with nothing available is an empty [`Credential`](fobreader_core::Credential),
//! never an error. Device failures at startup are
//! [`HardwareError::InitializationFailed`] and leave no device claimed.
//!
//! # Mock Implementations
//!
//! The [`mock`] module provides a scripted serial transport, Wiegand decoder,
//! key event queue and an in-memory frame sink for tests.

pub mod channel;
pub mod config;
pub mod devices;
pub mod error;
pub mod frame;
pub mod input;
pub mod mock;
pub mod output;
pub mod pins;
pub mod platform;
pub mod screen;
pub mod surface;
pub mod terminal;
pub mod warning;

// Re-export commonly used types for convenience
pub use channel::{FrameChannel, FrameStats, WriterState};
pub use config::ReaderConfig;
pub use error::{HardwareError, Result};
pub use frame::{Frame, FrameGeometry, FrameSink};
pub use input::InputSource;
pub use output::OutputBus;
pub use platform::{PinMap, PlatformProfile};
pub use terminal::Terminal;
pub use warning::WarningSignaler;
