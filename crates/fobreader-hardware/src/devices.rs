//! Enum wrappers for hardware device dispatch.
//!
//! Native `async fn` in traits (RPITIT, Rust Edition 2024) is not object-safe,
//! so `Box<dyn InputSource>` is not available. The enums in this module give
//! the terminal one concrete type per device role and dispatch to the
//! platform's implementation with a `match`.
//!
//! The synchronous traits ([`PinDriver`], [`FrameSink`]) get the same
//! treatment so every device role is selected the same way.
//!
//! # Examples
//!
//! ```
//! use fobreader_hardware::devices::AnyFrameSink;
//! use fobreader_hardware::frame::{Frame, FrameGeometry, FrameSink};
//! use fobreader_hardware::mock::MemoryFrameSink;
//!
//! let (sink, handle) = MemoryFrameSink::new();
//! let mut any_sink = AnyFrameSink::Memory(sink);
//!
//! any_sink.write_frame(&Frame::filled(FrameGeometry::new(1, 1), 0)).unwrap();
//! assert_eq!(handle.frames().len(), 1);
//! ```

use fobreader_core::{Credential, Level};

use crate::error::Result;
use crate::frame::{FileFrameSink, Frame, FrameSink};
use crate::input::{InputSource, SerialWiegandSource, SimulatedKeySource};
use crate::mock::MemoryFrameSink;
use crate::pins::{GpioPinDriver, PinDriver, SimulatedPinDriver};

/// Enum wrapper for pin driver dispatch.
#[derive(Debug)]
pub enum AnyPinDriver {
    /// GPIO character device on a physical board.
    Gpio(GpioPinDriver),
    /// In-memory lines for the simulated platform and tests.
    Simulated(SimulatedPinDriver),
}

impl PinDriver for AnyPinDriver {
    fn write(&self, writes: &[(u32, Level)]) -> Result<()> {
        match self {
            Self::Gpio(driver) => driver.write(writes),
            Self::Simulated(driver) => driver.write(writes),
        }
    }
}

/// Enum wrapper for input source dispatch.
///
/// # Examples
///
/// ```
/// use fobreader_hardware::devices::AnyInputSource;
/// use fobreader_hardware::input::{InputSource, SerialWiegandSource};
/// use fobreader_hardware::mock::MockSerialTransport;
///
/// #[tokio::main]
/// async fn main() -> fobreader_hardware::Result<()> {
///     let (transport, handle) = MockSerialTransport::new();
///     let mut input = AnyInputSource::Serial(SerialWiegandSource::new(Box::new(transport), None));
///
///     handle.push(b"5");
///     assert_eq!(input.read().await?.as_str(), "5");
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub enum AnyInputSource {
    /// Serial reader with optional Wiegand decoder.
    Serial(SerialWiegandSource),
    /// Desktop keyboard.
    Simulated(SimulatedKeySource),
}

impl InputSource for AnyInputSource {
    async fn read(&mut self) -> Result<Credential> {
        match self {
            Self::Serial(source) => source.read().await,
            Self::Simulated(source) => source.read().await,
        }
    }
}

/// Enum wrapper for frame sink dispatch.
#[derive(Debug)]
pub enum AnyFrameSink {
    /// Framebuffer device node.
    File(FileFrameSink),
    /// In-memory sink for tests and headless runs.
    Memory(MemoryFrameSink),
}

impl FrameSink for AnyFrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        match self {
            Self::File(sink) => sink.write_frame(frame),
            Self::Memory(sink) => sink.write_frame(frame),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameGeometry;
    use crate::mock::MockSerialTransport;

    #[test]
    fn test_pin_driver_dispatch() {
        let driver = AnyPinDriver::Simulated(SimulatedPinDriver::new());
        driver.write(&[(3, Level::High)]).unwrap();

        let AnyPinDriver::Simulated(inner) = &driver else {
            panic!("expected simulated driver");
        };
        assert_eq!(inner.level(3), Level::High);
    }

    #[tokio::test]
    async fn test_input_source_dispatch() {
        let (transport, handle) = MockSerialTransport::new();
        let mut input = AnyInputSource::Serial(SerialWiegandSource::new(Box::new(transport), None));

        assert!(input.read().await.unwrap().is_empty());
        handle.push(b"9");
        assert_eq!(input.read().await.unwrap().as_str(), "9");
    }

    #[test]
    fn test_frame_sink_dispatch() {
        let (sink, handle) = MemoryFrameSink::new();
        let mut sink = AnyFrameSink::Memory(sink);
        let frame = Frame::filled(FrameGeometry::new(2, 1), 0x1234);

        sink.write_frame(&frame).unwrap();
        assert_eq!(handle.frames(), vec![frame]);
    }
}
