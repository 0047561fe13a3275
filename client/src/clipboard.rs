use arboard::Clipboard;

use crate::error::ClipboardError;

/// Somewhere copied text can go.
pub trait ClipboardSink {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The desktop clipboard.
pub struct SystemClipboard {
    inner: Clipboard,
}

impl SystemClipboard {
    pub fn new() -> Result<Self, ClipboardError> {
        match Clipboard::new() {
            Ok(inner) => Ok(Self { inner }),
            Err(e) => {
                log::error!("failed to initialize clipboard: {e}");
                Err(ClipboardError(e.to_string()))
            }
        }
    }
}

impl ClipboardSink for SystemClipboard {
    fn set_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.inner.set_text(text).map_err(|e| {
            log::error!("failed to set clipboard text: {e}");
            ClipboardError(e.to_string())
        })
    }
}
