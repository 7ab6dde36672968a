use std::io::{IsTerminal, Write};

use owo_colors::{OwoColorize, Stream};

/// Single-line progress indicator on stderr.
///
/// Only draws when stderr is a terminal, so piped runs and tests see nothing.
pub struct StatusLine {
    enabled: bool,
    visible: bool,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::with_enabled(std::io::stderr().is_terminal())
    }

    pub fn with_enabled(enabled: bool) -> Self {
        Self {
            enabled,
            visible: false,
        }
    }

    pub fn set(&mut self, message: &str) {
        if !self.enabled {
            return;
        }
        let text = format!("\r\x1b[2K{}", message);
        let mut stderr = std::io::stderr().lock();
        let _ = write!(
            stderr,
            "{}",
            text.if_supports_color(Stream::Stderr, |s| s.cyan())
        );
        let _ = stderr.flush();
        self.visible = true;
    }

    pub fn clear(&mut self) {
        if !self.visible {
            return;
        }
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r\x1b[2K");
        let _ = stderr.flush();
        self.visible = false;
    }

    #[cfg(test)]
    fn is_visible(&self) -> bool {
        self.visible
    }
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StatusLine {
    fn drop(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_status_line_never_becomes_visible() {
        let mut status = StatusLine::with_enabled(false);
        status.set("waiting for the function to be ready...");
        assert!(!status.is_visible());
        status.clear();
        assert!(!status.is_visible());
    }

    #[test]
    fn clear_hides_enabled_status_line() {
        let mut status = StatusLine::with_enabled(true);
        status.set("retrieving X-Ray trace...");
        assert!(status.is_visible());
        status.clear();
        assert!(!status.is_visible());
    }
}
