//! Clipboard copy with a manual-paste fallback.

use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    /// The value landed on the OS clipboard.
    Clipboard,
    /// No clipboard was available (headless session, missing display); the
    /// caller should surface the value for manual copying instead.
    Fallback,
}

/// Copy `text` to the system clipboard if one is reachable.
pub fn copy_value(text: &str) -> CopyOutcome {
    match arboard::Clipboard::new() {
        Ok(mut clipboard) => match clipboard.set_text(text.to_string()) {
            Ok(()) => CopyOutcome::Clipboard,
            Err(err) => {
                debug!("clipboard write failed: {err}");
                CopyOutcome::Fallback
            }
        },
        Err(err) => {
            debug!("clipboard unavailable: {err}");
            CopyOutcome::Fallback
        }
    }
}
