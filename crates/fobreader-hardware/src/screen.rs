//! Status screen output.
//!
//! Physical boards push frames through a [`FrameChannel`] to the framebuffer
//! so rendering never waits on the panel. The simulated platform has no slow
//! device and blits straight to the terminal surface instead.

use tracing::debug;

use crate::channel::{FrameChannel, FrameStats};
use crate::devices::AnyFrameSink;
use crate::error::Result;
use crate::frame::{Frame, FrameGeometry};
use crate::surface::TerminalSurface;

#[derive(Debug)]
enum Output {
    Framebuffer(FrameChannel<AnyFrameSink>),
    Window(TerminalSurface),
}

/// The terminal's screen.
#[derive(Debug)]
pub struct Screen {
    geometry: FrameGeometry,
    output: Output,
}

impl Screen {
    /// A screen backed by a frame sink and its background writer.
    pub fn framebuffer(geometry: FrameGeometry, channel: FrameChannel<AnyFrameSink>) -> Self {
        Self {
            geometry,
            output: Output::Framebuffer(channel),
        }
    }

    /// A screen drawn synchronously onto a terminal window.
    pub fn window(geometry: FrameGeometry, surface: TerminalSurface) -> Self {
        Self {
            geometry,
            output: Output::Window(surface),
        }
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Show a frame.
    ///
    /// On a framebuffer this only hands the frame to the writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame does not match the screen geometry, or
    /// if the window cannot be drawn.
    pub fn present(&mut self, frame: Frame) -> Result<()> {
        let geometry = frame.geometry();
        if geometry != self.geometry {
            return Err(fobreader_core::Error::InvalidFrameSize {
                expected: self.geometry.byte_len(),
                actual: geometry.byte_len(),
            }
            .into());
        }

        match &mut self.output {
            Output::Framebuffer(channel) => {
                channel.submit(frame);
                Ok(())
            }
            Output::Window(surface) => surface.blit(&frame),
        }
    }

    /// Delivery counters, for framebuffer screens.
    pub fn stats(&self) -> Option<FrameStats> {
        match &self.output {
            Output::Framebuffer(channel) => Some(channel.stats()),
            Output::Window(_) => None,
        }
    }

    /// Wait for the framebuffer writer to go idle.
    pub async fn flush(&self) {
        if let Output::Framebuffer(channel) = &self.output {
            channel.flush().await;
            debug!("Screen flushed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MemoryFrameSink;

    #[tokio::test]
    async fn test_present_delivers_to_framebuffer() {
        let geometry = FrameGeometry::new(4, 2);
        let (sink, handle) = MemoryFrameSink::new();
        let channel = FrameChannel::new(AnyFrameSink::Memory(sink)).unwrap();
        let mut screen = Screen::framebuffer(geometry, channel);

        let frame = Frame::filled(geometry, 0xABCD);
        screen.present(frame.clone()).unwrap();
        screen.flush().await;

        assert_eq!(handle.frames(), vec![frame]);
        assert_eq!(screen.stats().unwrap().written, 1);
    }

    #[tokio::test]
    async fn test_present_rejects_wrong_geometry() {
        let (sink, handle) = MemoryFrameSink::new();
        let channel = FrameChannel::new(AnyFrameSink::Memory(sink)).unwrap();
        let mut screen = Screen::framebuffer(FrameGeometry::new(4, 2), channel);

        let result = screen.present(Frame::filled(FrameGeometry::new(2, 2), 0));
        assert!(result.is_err());
        screen.flush().await;
        assert!(handle.frames().is_empty());
    }
}
