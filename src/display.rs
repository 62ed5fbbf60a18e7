//! The rendering seam between the scheduler and the two display backends.
//
// - `ShiftRegister` (shiftreg.rs) drives the LED matrix boards.
// - `Panel` (panel.rs) drives a TFT through embedded-graphics.
// - The backend is picked once at construction and never switched.

/// One scan row's worth of output. Implemented by both backends; the
/// scheduler calls `row` once per tick with the packed front-grid row word
/// (2 bits per column, column 0 in the low bits).
pub trait Render {
    /// Display one row. Must come back well inside a tick period; errors from
    /// the underlying port are swallowed, a failed row simply shows stale
    /// pixels until the next pass.
    fn row(&mut self, y: usize, pixels: u16);

    /// Hold the last row briefly, then stop driving it. Only meaningful for
    /// the matrix backend after a manual full refresh, where no timer tick
    /// will come along to overwrite the final row.
    fn blank(&mut self) {}

    /// Redraw the text overlay band. The matrix boards have nowhere to put
    /// text, so the default does nothing.
    fn overlay_text(&mut self, _text: &str) {}
}
