#![cfg_attr(not(test), no_std)]

//! Driver for the 8x8 bicolor LED game shield.
//!
//! The display is double buffered: draw into the back grid with [`Shield::clear`]
//! and [`Shield::set`], then call [`Shield::swap`] to publish the frame. A
//! fixed-rate timer interrupt scans one row and debounces one button per
//! tick, so the matrix stays lit and button state stays fresh no matter how
//! slowly the application loop runs. Button edges and levels are snapshotted
//! per swap: read them with [`Shield::went_down`] / [`Shield::pressed`]
//! between swaps.
//!
//! The driver core is generic over `embedded-hal` pins and an
//! `embedded-graphics` draw target, so it runs under host tests; the
//! `esp32s3` feature adds the board wiring and the hardware timer in
//! [`wiring`].

#[cfg(feature = "esp32s3")]
extern crate alloc;

pub mod display;
pub mod frame;
pub mod input;
pub mod overlay;
pub mod panel;
pub mod shield;
pub mod shiftreg;

#[cfg(feature = "esp32s3")]
pub mod wiring;

pub use display::Render;
pub use frame::{Color, PixelGrid, GRID_SIZE};
pub use input::{Button, BUTTON_COUNT, DEBOUNCE_TICKS};
pub use panel::Panel;
pub use shield::{Shield, SWAP_SETTLE_TICKS};
pub use shiftreg::ShiftRegister;

/// Crate version, for the startup banner.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
