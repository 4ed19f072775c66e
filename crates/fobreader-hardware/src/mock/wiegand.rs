//! Mock Wiegand decoder for testing and development.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Result;
use crate::input::WiegandDecoder;

#[derive(Debug, Default)]
struct Queue {
    decoded: VecDeque<String>,
    initialized: bool,
}

/// Wiegand decoder whose output is scripted by a [`MockWiegandHandle`].
#[derive(Debug)]
pub struct MockWiegandDecoder {
    queue: Arc<Mutex<Queue>>,
}

impl MockWiegandDecoder {
    /// Create a decoder and the handle that feeds it.
    pub fn new() -> (Self, MockWiegandHandle) {
        let queue = Arc::new(Mutex::new(Queue::default()));
        let decoder = Self {
            queue: Arc::clone(&queue),
        };
        (decoder, MockWiegandHandle { queue })
    }
}

impl WiegandDecoder for MockWiegandDecoder {
    fn initialize(&mut self) -> Result<()> {
        lock(&self.queue).initialized = true;
        Ok(())
    }

    fn read(&mut self) -> Option<String> {
        lock(&self.queue).decoded.pop_front()
    }
}

/// Handle for scripting a [`MockWiegandDecoder`].
#[derive(Debug, Clone)]
pub struct MockWiegandHandle {
    queue: Arc<Mutex<Queue>>,
}

impl MockWiegandHandle {
    /// Queue a decoded card value.
    pub fn push(&self, decoded: &str) {
        lock(&self.queue).decoded.push_back(decoded.to_string());
    }

    /// Whether `initialize` has been called on the decoder.
    pub fn is_initialized(&self) -> bool {
        lock(&self.queue).initialized
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
