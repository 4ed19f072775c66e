//! In-memory frame sink.
//!
//! Records every frame it accepts. A gated sink additionally blocks each
//! write until the test releases it, which lets a test hold the writer busy
//! while more frames are submitted.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{HardwareError, Result};
use crate::frame::{Frame, FrameSink};

#[derive(Debug, Default)]
struct Record {
    frames: Vec<Frame>,
    fail_next: usize,
    active: usize,
    max_active: usize,
}

#[derive(Debug)]
struct Gate {
    started_tx: Sender<()>,
    permits_rx: Receiver<()>,
}

/// Frame sink that keeps written frames in memory.
///
/// # Examples
///
/// ```
/// use fobreader_hardware::frame::{Frame, FrameGeometry, FrameSink};
/// use fobreader_hardware::mock::MemoryFrameSink;
///
/// let (mut sink, handle) = MemoryFrameSink::new();
/// let frame = Frame::filled(FrameGeometry::new(2, 2), 0xFFFF);
///
/// sink.write_frame(&frame).unwrap();
/// assert_eq!(handle.frames(), vec![frame]);
/// ```
#[derive(Debug)]
pub struct MemoryFrameSink {
    record: Arc<Mutex<Record>>,
    gate: Option<Gate>,
}

impl MemoryFrameSink {
    /// Create a sink that accepts writes immediately.
    pub fn new() -> (Self, MemoryFrameSinkHandle) {
        let record = Arc::new(Mutex::new(Record::default()));
        let sink = Self {
            record: Arc::clone(&record),
            gate: None,
        };
        let handle = MemoryFrameSinkHandle {
            record,
            started_rx: None,
            permits_tx: None,
        };
        (sink, handle)
    }

    /// Create a sink whose writes each wait for [`MemoryFrameSinkHandle::release`].
    pub fn gated() -> (Self, MemoryFrameSinkHandle) {
        let (started_tx, started_rx) = mpsc::channel();
        let (permits_tx, permits_rx) = mpsc::channel();
        let record = Arc::new(Mutex::new(Record::default()));
        let sink = Self {
            record: Arc::clone(&record),
            gate: Some(Gate {
                started_tx,
                permits_rx,
            }),
        };
        let handle = MemoryFrameSinkHandle {
            record,
            started_rx: Some(Arc::new(Mutex::new(started_rx))),
            permits_tx: Some(permits_tx),
        };
        (sink, handle)
    }
}

impl FrameSink for MemoryFrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        {
            let mut record = lock(&self.record);
            record.active += 1;
            record.max_active = record.max_active.max(record.active);
        }

        if let Some(gate) = &self.gate {
            // The test may have stopped listening; that is not an error here.
            let _ = gate.started_tx.send(());
            gate.permits_rx
                .recv()
                .map_err(|_| HardwareError::disconnected("Frame sink gate closed"))?;
        }

        let mut record = lock(&self.record);
        record.active -= 1;
        if record.fail_next > 0 {
            record.fail_next -= 1;
            return Err(HardwareError::communication("Injected frame write failure"));
        }
        record.frames.push(frame.clone());
        Ok(())
    }
}

/// Handle for inspecting and controlling a [`MemoryFrameSink`].
#[derive(Debug, Clone)]
pub struct MemoryFrameSinkHandle {
    record: Arc<Mutex<Record>>,
    started_rx: Option<Arc<Mutex<Receiver<()>>>>,
    permits_tx: Option<Sender<()>>,
}

impl MemoryFrameSinkHandle {
    /// Frames written so far, oldest first.
    pub fn frames(&self) -> Vec<Frame> {
        lock(&self.record).frames.clone()
    }

    /// Make the next `count` writes fail.
    pub fn fail_next_writes(&self, count: usize) {
        lock(&self.record).fail_next = count;
    }

    /// Highest number of writes ever in progress at once.
    pub fn max_concurrent_writes(&self) -> usize {
        lock(&self.record).max_active
    }

    /// Block until a gated write has started, up to `timeout`.
    ///
    /// Always returns `false` for an ungated sink.
    pub fn wait_write_started(&self, timeout: Duration) -> bool {
        match &self.started_rx {
            Some(rx) => lock(rx).recv_timeout(timeout).is_ok(),
            None => false,
        }
    }

    /// Let `count` gated writes complete.
    pub fn release(&self, count: usize) {
        if let Some(tx) = &self.permits_tx {
            for _ in 0..count {
                let _ = tx.send(());
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
