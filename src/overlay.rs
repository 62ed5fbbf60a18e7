//! One-line text overlay with change detection.
//!
//! The overlay keeps the current text next to a shadow copy of whatever was
//! last rendered. Redrawing a text band on the panel costs far more than a
//! pixel rectangle, so the swap path only redraws when the two differ.

use core::fmt::Write;

use heapless::String;

/// Maximum overlay length in bytes. Appends that would exceed it are dropped
/// whole; nothing is truncated.
pub const MAX_TEXT_LEN: usize = 32;

pub struct Overlay {
    text: String<MAX_TEXT_LEN>,
    rendered: String<MAX_TEXT_LEN>,
}

impl Overlay {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            rendered: String::new(),
        }
    }

    pub fn set(&mut self, s: &str) {
        self.text.clear();
        let _ = self.text.push_str(s);
    }

    /// Append to the current text. A no-op if the result would not fit.
    pub fn append(&mut self, s: &str) {
        let _ = self.text.push_str(s);
    }

    /// Append a formatted number. Formatted into a scratch buffer first so an
    /// overflowing number is dropped whole like any other append.
    pub fn append_number(&mut self, n: i32) {
        let mut scratch: String<12> = String::new();
        if write!(scratch, "{}", n).is_ok() {
            self.append(&scratch);
        }
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when the current text differs from what was last rendered.
    #[inline]
    pub fn changed(&self) -> bool {
        self.text != self.rendered
    }

    /// Record the current text as rendered.
    pub fn mark_rendered(&mut self) {
        self.rendered.clear();
        let _ = self.rendered.push_str(&self.text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_that_would_overflow_is_dropped_whole() {
        let mut overlay = Overlay::new();
        overlay.set("score ");
        overlay.append_number(1234);
        assert_eq!(overlay.text(), "score 1234");

        // 23 more bytes would blow the 32-byte cap: buffer stays unchanged
        overlay.append("xxxxxxxxxxxxxxxxxxxxxxx");
        assert_eq!(overlay.text(), "score 1234");
    }

    #[test]
    fn changed_tracks_the_shadow_copy() {
        let mut overlay = Overlay::new();
        assert!(!overlay.changed());

        overlay.set("lives 3");
        assert!(overlay.changed());
        overlay.mark_rendered();
        assert!(!overlay.changed());

        // setting identical text again is not a change
        overlay.set("lives 3");
        assert!(!overlay.changed());

        overlay.clear();
        assert!(overlay.changed());
    }

    #[test]
    fn negative_numbers_format_with_sign() {
        let mut overlay = Overlay::new();
        overlay.append_number(-42);
        assert_eq!(overlay.text(), "-42");
    }
}
