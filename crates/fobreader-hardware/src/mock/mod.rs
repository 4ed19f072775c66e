//! Mock device implementations for testing and development.
//!
//! This module provides simulated devices that can be controlled
//! programmatically without requiring physical hardware. Each mock comes
//! with a cloneable handle used to feed it input or inspect what it saw.

pub mod frame_sink;
pub mod keyboard;
pub mod serial;
pub mod wiegand;

// Re-export commonly used types
pub use frame_sink::{MemoryFrameSink, MemoryFrameSinkHandle};
pub use keyboard::ScriptedKeyEvents;
pub use serial::{MockSerialHandle, MockSerialTransport};
pub use wiegand::{MockWiegandDecoder, MockWiegandHandle};
