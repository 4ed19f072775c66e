//! Credential input sources.
//!
//! Every transport normalizes its input to a [`Credential`]: a digit, a
//! control token or a whole decoded card payload. The caller polls
//! [`InputSource::read`] in a loop; an empty credential means nothing arrived
//! this poll and is not an error.
//!
//! - [`SerialWiegandSource`]: physical boards. The Wiegand pulse decoder is
//!   consulted first; raw bytes buffered on the serial port are the fallback.
//! - [`SimulatedKeySource`]: desktop keyboard standing in for the keypad.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT).
//! Use [`AnyInputSource`](crate::devices::AnyInputSource) where a single
//! concrete type is needed.

#![allow(async_fn_in_trait)]

pub mod keyboard;
pub mod serial;
pub mod wiegand;

use fobreader_core::Credential;

use crate::error::Result;

pub use keyboard::{CrosstermEvents, KeyAction, KeyEvents, SimulatedKeySource, map_key_event};
pub use serial::{ByteTransport, SerialWiegandSource, open_serial};
pub use wiegand::{PipeWiegandDecoder, WiegandDecoder};

/// Producer of raw credential reads.
pub trait InputSource: Send {
    /// Read whatever credential is available right now.
    ///
    /// Returns an empty credential when there is nothing to read. Blocks at
    /// most for a short, bounded poll delay.
    ///
    /// # Errors
    ///
    /// Returns an error only for a transport failure, never for a miss.
    async fn read(&mut self) -> Result<Credential>;
}
