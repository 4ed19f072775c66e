//! Mock serial transport for testing and development.
//!
//! Bytes pushed through a [`MockSerialHandle`] become visible to the next
//! [`ByteTransport::read_available`] call on the transport, exactly like
//! bytes buffered by a UART.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{HardwareError, Result};
use crate::input::ByteTransport;

#[derive(Debug, Default)]
struct Buffer {
    bytes: Vec<u8>,
    fail_next: bool,
}

/// Serial transport fed programmatically.
///
/// # Examples
///
/// ```
/// use fobreader_hardware::input::ByteTransport;
/// use fobreader_hardware::mock::MockSerialTransport;
///
/// let (mut transport, handle) = MockSerialTransport::new();
/// handle.push(b"12");
///
/// assert_eq!(transport.read_available().unwrap(), b"12");
/// assert!(transport.read_available().unwrap().is_empty());
/// ```
#[derive(Debug)]
pub struct MockSerialTransport {
    buffer: Arc<Mutex<Buffer>>,
}

impl MockSerialTransport {
    /// Create a transport and the handle that feeds it.
    pub fn new() -> (Self, MockSerialHandle) {
        let buffer = Arc::new(Mutex::new(Buffer::default()));
        let transport = Self {
            buffer: Arc::clone(&buffer),
        };
        (transport, MockSerialHandle { buffer })
    }
}

impl ByteTransport for MockSerialTransport {
    fn read_available(&mut self) -> Result<Vec<u8>> {
        let mut buffer = lock(&self.buffer);
        if buffer.fail_next {
            buffer.fail_next = false;
            return Err(HardwareError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "Injected serial read failure",
            )));
        }
        Ok(std::mem::take(&mut buffer.bytes))
    }
}

/// Handle for feeding a [`MockSerialTransport`].
#[derive(Debug, Clone)]
pub struct MockSerialHandle {
    buffer: Arc<Mutex<Buffer>>,
}

impl MockSerialHandle {
    /// Append bytes to the receive buffer.
    pub fn push(&self, bytes: &[u8]) {
        lock(&self.buffer).bytes.extend_from_slice(bytes);
    }

    /// Make the next read fail once.
    pub fn fail_next_read(&self) {
        lock(&self.buffer).fail_next = true;
    }

    /// Number of bytes not yet read.
    pub fn buffered(&self) -> usize {
        lock(&self.buffer).bytes.len()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
