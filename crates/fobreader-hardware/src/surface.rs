//! Terminal window standing in for the panel on the simulated platform.
//!
//! Frames are downscaled to the terminal size and drawn with upper-half
//! block characters, two pixel rows per text row: the foreground colour is
//! the upper pixel and the background colour the lower one.

use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{ExecutableCommand, QueueableCommand};
use tracing::{debug, warn};

use crate::error::{HardwareError, Result};
use crate::frame::{Frame, rgb565_to_rgb888};

const UPPER_HALF_BLOCK: char = '\u{2580}';

static ACTIVE: AtomicBool = AtomicBool::new(false);

/// One text cell: the colours of its upper and lower pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfBlock {
    pub top: (u8, u8, u8),
    pub bottom: (u8, u8, u8),
}

/// Sample `frame` onto a `cols` x `rows` cell grid, row-major.
///
/// Uses nearest-neighbour sampling. The grid is never larger than the frame.
pub fn half_blocks(frame: &Frame, cols: usize, rows: usize) -> Vec<HalfBlock> {
    let geometry = frame.geometry();
    let cols = cols.min(geometry.width);
    let rows = rows.min(geometry.height.div_ceil(2));
    if cols == 0 || rows == 0 {
        return Vec::new();
    }

    let sample = |x: usize, y: usize| {
        let px = x * geometry.width / cols;
        let py = (y * geometry.height / (rows * 2)).min(geometry.height - 1);
        rgb565_to_rgb888(frame.pixel(px, py).unwrap_or_default())
    };

    let mut cells = Vec::with_capacity(cols * rows);
    for row in 0..rows {
        for col in 0..cols {
            cells.push(HalfBlock {
                top: sample(col, row * 2),
                bottom: sample(col, row * 2 + 1),
            });
        }
    }
    cells
}

/// The process terminal, switched to a raw alternate screen.
#[derive(Debug)]
pub struct TerminalSurface {
    out: Stdout,
}

impl TerminalSurface {
    /// Take over the terminal.
    ///
    /// # Errors
    ///
    /// Returns `HardwareError::InitializationFailed` if the terminal cannot
    /// enter raw mode.
    pub fn open() -> Result<Self> {
        terminal::enable_raw_mode().map_err(|e| {
            HardwareError::initialization_failed(format!("Cannot open terminal surface: {e}"))
        })?;
        ACTIVE.store(true, Ordering::SeqCst);

        let mut out = io::stdout();
        out.execute(EnterAlternateScreen)?;
        out.execute(Hide)?;
        debug!("Terminal surface opened");
        Ok(Self { out })
    }

    /// Draw a frame scaled to the current terminal size.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be written.
    pub fn blit(&mut self, frame: &Frame) -> Result<()> {
        let (cols, rows) = terminal::size()?;
        let cols = usize::from(cols).min(frame.geometry().width);
        let cells = half_blocks(frame, cols, usize::from(rows));
        if cells.is_empty() {
            return Ok(());
        }

        for (row, line) in cells.chunks(cols).enumerate() {
            // Bounded by the terminal height, which is a u16.
            self.out.queue(MoveTo(0, row as u16))?;
            for cell in line {
                self.out
                    .queue(SetForegroundColor(rgb(cell.top)))?
                    .queue(SetBackgroundColor(rgb(cell.bottom)))?
                    .queue(Print(UPPER_HALF_BLOCK))?;
            }
        }
        self.out.queue(ResetColor)?;
        self.out.flush()?;
        Ok(())
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        restore_terminal();
    }
}

/// Leave raw mode and the alternate screen if a surface took them over.
///
/// Safe to call more than once.
pub fn restore_terminal() {
    if !ACTIVE.swap(false, Ordering::SeqCst) {
        return;
    }

    let mut out = io::stdout();
    let restored = out
        .execute(ResetColor)
        .and_then(|out| out.execute(Show))
        .and_then(|out| out.execute(LeaveAlternateScreen))
        .and_then(|_| terminal::disable_raw_mode());
    if let Err(e) = restored {
        warn!("Failed to restore terminal: {}", e);
    }
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb { r, g, b }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameGeometry;

    fn two_tone(geometry: FrameGeometry, top: u16, bottom: u16) -> Frame {
        let mut data = Vec::with_capacity(geometry.byte_len());
        for y in 0..geometry.height {
            let colour = if y % 2 == 0 { top } else { bottom };
            for _ in 0..geometry.width {
                data.extend_from_slice(&colour.to_le_bytes());
            }
        }
        Frame::new(geometry, data).unwrap()
    }

    #[test]
    fn test_half_blocks_pair_rows() {
        let frame = two_tone(FrameGeometry::new(4, 4), 0xF800, 0x001F);
        let cells = half_blocks(&frame, 4, 2);

        assert_eq!(cells.len(), 8);
        for cell in cells {
            assert_eq!(cell.top, (255, 0, 0));
            assert_eq!(cell.bottom, (0, 0, 255));
        }
    }

    #[test]
    fn test_half_blocks_never_upscale() {
        let frame = Frame::filled(FrameGeometry::new(2, 2), 0xFFFF);
        let cells = half_blocks(&frame, 80, 24);
        assert_eq!(cells.len(), 2);
        assert!(cells.iter().all(|c| c.top == (255, 255, 255)));
    }

    #[test]
    fn test_half_blocks_downscale() {
        let frame = Frame::filled(FrameGeometry::SCREEN, 0x07E0);
        let cells = half_blocks(&frame, 80, 24);
        assert_eq!(cells.len(), 80 * 24);
        assert!(cells.iter().all(|c| c.bottom == (0, 255, 0)));
    }

    #[test]
    fn test_half_blocks_empty_grid() {
        let frame = Frame::filled(FrameGeometry::new(2, 2), 0);
        assert!(half_blocks(&frame, 0, 10).is_empty());
    }

    #[test]
    fn test_restore_without_open_is_noop() {
        restore_terminal();
    }
}
