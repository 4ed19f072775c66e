//! Kernel console takeover.
//!
//! On a physical board the framebuffer is shared with the kernel's virtual
//! console. While the terminal owns the screen the console is unbound so its
//! text does not scribble over rendered frames; dropping the guard binds it
//! again and reloads the console font.

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

/// Unbinds the virtual console for as long as it lives.
#[derive(Debug)]
pub struct ConsoleGuard {
    bind_path: PathBuf,
    reload_font: bool,
}

impl ConsoleGuard {
    /// Unbind the console behind `bind_path`.
    pub fn take_over(bind_path: &Path) -> Result<Self> {
        write_bind(bind_path, "0")
            .with_context(|| format!("Failed to unbind console at {}", bind_path.display()))?;
        info!("Unbound virtual console {}", bind_path.display());
        Ok(Self {
            bind_path: bind_path.to_path_buf(),
            reload_font: true,
        })
    }

    /// Whether to run `setupcon` after rebinding.
    pub fn with_font_reload(mut self, reload_font: bool) -> Self {
        self.reload_font = reload_font;
        self
    }
}

impl Drop for ConsoleGuard {
    fn drop(&mut self) {
        if let Err(e) = write_bind(&self.bind_path, "1") {
            warn!("Failed to rebind console {}: {}", self.bind_path.display(), e);
            return;
        }
        if !self.reload_font {
            return;
        }

        match Command::new("setupcon").status() {
            Ok(status) if status.success() => debug!("Console font restored"),
            Ok(status) => warn!("setupcon exited with {}", status),
            Err(e) => debug!("setupcon unavailable: {}", e),
        }
    }
}

fn write_bind(path: &Path, value: &str) -> std::io::Result<()> {
    std::fs::write(path, value)
}
