//! Double-buffered frame delivery to a slow device.
//!
//! Rendering can produce frames much faster than a small SPI panel can
//! absorb them. [`FrameChannel`] decouples the two with two slots:
//!
//! - *current*: the frame the writer is pushing to the device
//! - *pending*: the newest frame submitted since then
//!
//! ```text
//!             submit(f)                      writer finishes
//!   Idle ───────────────► Writing ◄──────┐  pending → current
//!    ▲    f → current      │  submit(f)  │
//!    │    spawn writer     │  f → pending (older pending dropped)
//!    └─────────────────────┘
//!      writer finishes, no pending
//! ```
//!
//! Only the newest pending frame is kept; intermediate frames are dropped.
//! The sink itself is moved into the writer task while it runs and handed
//! back when the writer exits, so there is never more than one writer and
//! "idle" is exactly "the channel holds the sink". Every slot transition
//! happens under one lock.
//!
//! # Examples
//!
//! ```no_run
//! use fobreader_hardware::channel::FrameChannel;
//! use fobreader_hardware::frame::{FileFrameSink, Frame, FrameGeometry};
//!
//! # async fn example() -> fobreader_hardware::Result<()> {
//! let sink = FileFrameSink::open("/dev/fb1".as_ref())?;
//! let channel = FrameChannel::new(sink)?;
//!
//! channel.submit(Frame::filled(FrameGeometry::SCREEN, 0x0000));
//! channel.flush().await;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{trace, warn};

use crate::error::{HardwareError, Result};
use crate::frame::{Frame, FrameSink};

/// Whether a writer task is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Idle,
    Writing,
}

/// Frame delivery counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameStats {
    /// Frames passed to `submit`.
    pub submitted: u64,
    /// Frames the sink accepted.
    pub written: u64,
    /// Pending frames replaced by a newer one before being written.
    pub dropped: u64,
    /// Frames the sink rejected.
    pub failed: u64,
}

#[derive(Debug)]
struct Slots<S> {
    current: Option<Frame>,
    pending: Option<Frame>,
    /// Present exactly when no writer is running.
    sink: Option<S>,
    writer: Option<JoinHandle<()>>,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    written: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug)]
struct Shared<S> {
    slots: Mutex<Slots<S>>,
    counters: Counters,
}

impl<S> Shared<S> {
    fn lock(&self) -> MutexGuard<'_, Slots<S>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Latest-wins frame handoff from renderers to a single device writer.
#[derive(Debug)]
pub struct FrameChannel<S: FrameSink> {
    shared: Arc<Shared<S>>,
    runtime: Handle,
}

impl<S: FrameSink> FrameChannel<S> {
    /// Create a channel whose writer runs on the current Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` when called outside a runtime.
    pub fn new(sink: S) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            HardwareError::initialization_failed(format!("Frame channel needs a runtime: {e}"))
        })?;
        Ok(Self::with_runtime(sink, runtime))
    }

    pub fn with_runtime(sink: S, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                slots: Mutex::new(Slots {
                    current: None,
                    pending: None,
                    sink: Some(sink),
                    writer: None,
                }),
                counters: Counters::default(),
            }),
            runtime,
        }
    }

    /// Hand a frame to the device.
    ///
    /// Starts the writer when idle; otherwise replaces any pending frame.
    /// Never blocks on the device.
    pub fn submit(&self, frame: Frame) {
        let counters = &self.shared.counters;
        counters.submitted.fetch_add(1, Ordering::Relaxed);

        let mut slots = self.shared.lock();
        match slots.sink.take() {
            Some(sink) => {
                slots.current = Some(frame);
                let shared = Arc::clone(&self.shared);
                slots.writer = Some(
                    self.runtime
                        .spawn_blocking(move || run_writer(shared, sink)),
                );
                trace!("Frame writer started");
            }
            None => {
                if slots.pending.replace(frame).is_some() {
                    counters.dropped.fetch_add(1, Ordering::Relaxed);
                    trace!("Dropped superseded pending frame");
                }
            }
        }
    }

    pub fn state(&self) -> WriterState {
        if self.shared.lock().sink.is_some() {
            WriterState::Idle
        } else {
            WriterState::Writing
        }
    }

    pub fn stats(&self) -> FrameStats {
        let counters = &self.shared.counters;
        FrameStats {
            submitted: counters.submitted.load(Ordering::Relaxed),
            written: counters.written.load(Ordering::Relaxed),
            dropped: counters.dropped.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Wait until every submitted frame has been written or dropped.
    pub async fn flush(&self) {
        loop {
            let writer = self.shared.lock().writer.take();
            let Some(writer) = writer else {
                return;
            };
            if let Err(e) = writer.await {
                warn!("Frame writer task failed: {}", e);
            }
        }
    }
}

fn run_writer<S: FrameSink>(shared: Arc<Shared<S>>, mut sink: S) {
    loop {
        let next = shared.lock().current.clone();
        let Some(frame) = next else {
            shared.lock().sink = Some(sink);
            return;
        };

        match sink.write_frame(&frame) {
            Ok(()) => {
                shared.counters.written.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                shared.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Frame write failed: {}", e);
            }
        }

        let mut slots = shared.lock();
        slots.current = slots.pending.take();
        if slots.current.is_none() {
            slots.sink = Some(sink);
            trace!("Frame writer idle");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameGeometry;
    use crate::mock::MemoryFrameSink;
    use std::time::Duration;

    fn frame(value: u16) -> Frame {
        Frame::filled(FrameGeometry::new(4, 4), value)
    }

    #[tokio::test]
    async fn test_single_frame_is_written() {
        let (sink, handle) = MemoryFrameSink::new();
        let channel = FrameChannel::new(sink).unwrap();

        channel.submit(frame(1));
        channel.flush().await;

        assert_eq!(handle.frames(), vec![frame(1)]);
        assert_eq!(channel.state(), WriterState::Idle);
        assert_eq!(channel.stats().written, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_latest_wins_while_writer_busy() {
        let (sink, handle) = MemoryFrameSink::gated();
        let channel = FrameChannel::new(sink).unwrap();

        channel.submit(frame(1));
        assert!(handle.wait_write_started(Duration::from_secs(5)));
        assert_eq!(channel.state(), WriterState::Writing);

        channel.submit(frame(2));
        channel.submit(frame(3));
        handle.release(2);
        channel.flush().await;

        assert_eq!(handle.frames(), vec![frame(1), frame(3)]);
        assert_eq!(
            channel.stats(),
            FrameStats {
                submitted: 3,
                written: 2,
                dropped: 1,
                failed: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_writer_restarts_after_idle() {
        let (sink, handle) = MemoryFrameSink::new();
        let channel = FrameChannel::new(sink).unwrap();

        channel.submit(frame(1));
        channel.flush().await;
        channel.submit(frame(2));
        channel.flush().await;

        assert_eq!(handle.frames(), vec![frame(1), frame(2)]);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_wedge_channel() {
        let (sink, handle) = MemoryFrameSink::new();
        handle.fail_next_writes(1);
        let channel = FrameChannel::new(sink).unwrap();

        channel.submit(frame(1));
        channel.flush().await;
        channel.submit(frame(2));
        channel.flush().await;

        assert_eq!(handle.frames(), vec![frame(2)]);
        assert_eq!(channel.stats().failed, 1);
        assert_eq!(channel.state(), WriterState::Idle);
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let (sink, _handle) = MemoryFrameSink::new();
        assert!(FrameChannel::new(sink).unwrap_err().is_startup_failure());
    }
}
