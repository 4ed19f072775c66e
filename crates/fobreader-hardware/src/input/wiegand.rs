//! Wiegand pulse decoder interface.
//!
//! Bit-level Wiegand framing is handled by a separate decoder process; this
//! crate only consumes its output. [`PipeWiegandDecoder`] reads that output
//! from a named pipe, one decoded credential per line, on a background task
//! and queues it for non-blocking [`WiegandDecoder::read`] calls.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fobreader_core::constants::WIEGAND_QUEUE_CAPACITY;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{HardwareError, Result};

/// Delay before reopening the pipe after an open failure.
const REOPEN_DELAY: Duration = Duration::from_secs(1);

/// Upstream decoder of Wiegand pulse trains.
pub trait WiegandDecoder: Send {
    /// Prepare the decoder. Called once before the first `read`.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder cannot be started.
    fn initialize(&mut self) -> Result<()>;

    /// The oldest decoded credential not yet read, without blocking.
    fn read(&mut self) -> Option<String>;
}

enum Source {
    Fifo(PathBuf),
    Stream(Option<Box<dyn AsyncRead + Send + Unpin>>),
}

/// Line-oriented decoder output read from a pipe.
pub struct PipeWiegandDecoder {
    source: Source,
    runtime: Handle,
    rx: Option<mpsc::Receiver<String>>,
    reader: Option<JoinHandle<()>>,
}

impl PipeWiegandDecoder {
    /// Read from the named pipe at `path`, reopening it whenever the writer goes away.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` when called outside a runtime.
    pub fn fifo(path: impl Into<PathBuf>) -> Result<Self> {
        Self::with_source(Source::Fifo(path.into()))
    }

    /// Read from an arbitrary stream until it ends.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` when called outside a runtime.
    pub fn from_reader(reader: impl AsyncRead + Send + Unpin + 'static) -> Result<Self> {
        Self::with_source(Source::Stream(Some(Box::new(reader))))
    }

    fn with_source(source: Source) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            HardwareError::initialization_failed(format!("Wiegand decoder needs a runtime: {e}"))
        })?;
        Ok(Self {
            source,
            runtime,
            rx: None,
            reader: None,
        })
    }

    pub fn is_initialized(&self) -> bool {
        self.rx.is_some()
    }
}

impl WiegandDecoder for PipeWiegandDecoder {
    fn initialize(&mut self) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }

        let (tx, rx) = mpsc::channel(WIEGAND_QUEUE_CAPACITY);
        let reader = match &mut self.source {
            Source::Fifo(path) => {
                info!("Reading Wiegand decoder output from {}", path.display());
                self.runtime.spawn(read_fifo(path.clone(), tx))
            }
            Source::Stream(stream) => {
                let stream = stream.take().ok_or_else(|| {
                    HardwareError::initialization_failed("Wiegand stream already consumed")
                })?;
                self.runtime.spawn(async move {
                    pump_lines(stream, &tx).await;
                })
            }
        };

        self.rx = Some(rx);
        self.reader = Some(reader);
        Ok(())
    }

    fn read(&mut self) -> Option<String> {
        self.rx.as_mut()?.try_recv().ok()
    }
}

impl Drop for PipeWiegandDecoder {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

impl std::fmt::Debug for PipeWiegandDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match &self.source {
            Source::Fifo(path) => path.display().to_string(),
            Source::Stream(_) => "<stream>".to_string(),
        };
        f.debug_struct("PipeWiegandDecoder")
            .field("source", &source)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

async fn read_fifo(path: PathBuf, tx: mpsc::Sender<String>) {
    while !tx.is_closed() {
        match open_fifo(&path).await {
            Ok(file) => {
                if !pump_lines(file, &tx).await {
                    return;
                }
                debug!("Wiegand pipe writer closed, reopening");
            }
            Err(e) => {
                warn!("Cannot open Wiegand pipe {}: {}", path.display(), e);
                tokio::time::sleep(REOPEN_DELAY).await;
            }
        }
    }
}

async fn open_fifo(path: &Path) -> std::io::Result<tokio::fs::File> {
    tokio::fs::File::open(path).await
}

/// Forward non-empty trimmed lines. Returns `false` once the receiver is gone.
async fn pump_lines(reader: impl AsyncRead + Unpin, tx: &mpsc::Sender<String>) -> bool {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match tx.try_send(line.to_string()) {
                    Ok(()) => {}
                    Err(TrySendError::Full(dropped)) => {
                        warn!("Wiegand queue full, dropping {}", dropped);
                    }
                    Err(TrySendError::Closed(_)) => return false,
                }
            }
            Ok(None) => return true,
            Err(e) => {
                warn!("Wiegand pipe read failed: {}", e);
                return true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    async fn next_read(decoder: &mut PipeWiegandDecoder) -> Option<String> {
        for _ in 0..200 {
            if let Some(value) = decoder.read() {
                return Some(value);
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        None
    }

    #[tokio::test]
    async fn test_reads_one_credential_per_line() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut decoder = PipeWiegandDecoder::from_reader(reader).unwrap();
        decoder.initialize().unwrap();

        writer.write_all(b"0012345678\n\n  42 \n").await.unwrap();

        assert_eq!(next_read(&mut decoder).await.as_deref(), Some("0012345678"));
        assert_eq!(next_read(&mut decoder).await.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn test_read_before_initialize_is_empty() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut decoder = PipeWiegandDecoder::from_reader(reader).unwrap();
        assert_eq!(decoder.read(), None);
        assert!(!decoder.is_initialized());
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let (_writer, reader) = tokio::io::duplex(64);
        let mut decoder = PipeWiegandDecoder::from_reader(reader).unwrap();
        decoder.initialize().unwrap();
        decoder.initialize().unwrap();
        assert!(decoder.is_initialized());
    }

    #[test]
    fn test_requires_runtime() {
        let error = PipeWiegandDecoder::fifo("/tmp/w26").unwrap_err();
        assert!(error.is_startup_failure());
    }
}
