//! Screen frames and frame sinks.
//!
//! A [`Frame`] is one complete screen image in the display's native RGB565
//! encoding, densely packed (no row padding). Frames are immutable and cheap
//! to clone, so a frame handed to the writer can never be observed half
//! written.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fobreader_core::constants::{BYTES_PER_PIXEL, SCREEN_HEIGHT, SCREEN_WIDTH};
use tracing::info;

use crate::error::{HardwareError, Result};

/// Pixel dimensions of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameGeometry {
    pub width: usize,
    pub height: usize,
}

impl FrameGeometry {
    /// The terminal's 480x320 panel.
    pub const SCREEN: Self = Self {
        width: SCREEN_WIDTH,
        height: SCREEN_HEIGHT,
    };

    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Bytes per row.
    pub const fn stride(&self) -> usize {
        self.width * BYTES_PER_PIXEL
    }

    /// Bytes per frame.
    pub const fn byte_len(&self) -> usize {
        self.stride() * self.height
    }
}

impl Default for FrameGeometry {
    fn default() -> Self {
        Self::SCREEN
    }
}

/// One rendered screen image.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    geometry: FrameGeometry,
    data: Arc<[u8]>,
}

impl Frame {
    /// Wrap a rendered buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is not exactly `geometry.byte_len()` bytes.
    pub fn new(geometry: FrameGeometry, data: Vec<u8>) -> Result<Self> {
        if data.len() != geometry.byte_len() {
            return Err(fobreader_core::Error::InvalidFrameSize {
                expected: geometry.byte_len(),
                actual: data.len(),
            }
            .into());
        }
        Ok(Self {
            geometry,
            data: data.into(),
        })
    }

    /// A frame with every pixel set to one RGB565 colour.
    pub fn filled(geometry: FrameGeometry, rgb565: u16) -> Self {
        let pixel = rgb565.to_le_bytes();
        let data: Vec<u8> = pixel
            .iter()
            .copied()
            .cycle()
            .take(geometry.byte_len())
            .collect();
        Self {
            geometry,
            data: data.into(),
        }
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// RGB565 value at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u16> {
        if x >= self.geometry.width || y >= self.geometry.height {
            return None;
        }
        let offset = y * self.geometry.stride() + x * BYTES_PER_PIXEL;
        Some(u16::from_le_bytes([self.data[offset], self.data[offset + 1]]))
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.geometry.width)
            .field("height", &self.geometry.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Split an RGB565 pixel into 8-bit channels.
pub fn rgb565_to_rgb888(pixel: u16) -> (u8, u8, u8) {
    let r = ((pixel >> 11) & 0x1F) as u8;
    let g = ((pixel >> 5) & 0x3F) as u8;
    let b = (pixel & 0x1F) as u8;
    ((r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2))
}

/// Pack 8-bit channels into an RGB565 pixel.
pub fn rgb888_to_rgb565(r: u8, g: u8, b: u8) -> u16 {
    (u16::from(r >> 3) << 11) | (u16::from(g >> 2) << 5) | u16::from(b >> 3)
}

/// Slow output device that accepts whole frames.
pub trait FrameSink: Send + 'static {
    /// Write one complete frame. May block for as long as the device needs.
    ///
    /// # Errors
    ///
    /// Returns an error if the device rejects the write.
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;
}

/// Linux framebuffer device, rewritten from offset 0 on every frame.
#[derive(Debug)]
pub struct FileFrameSink {
    path: PathBuf,
    file: File,
}

impl FileFrameSink {
    /// Open the framebuffer for writing.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` if the device cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().write(true).open(path).map_err(|e| {
            HardwareError::initialization_failed(format!(
                "Cannot open framebuffer {}: {}",
                path.display(),
                e
            ))
        })?;
        info!("Opened framebuffer {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSink for FileFrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(frame.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }
}
