//! The driver context tying frames, buttons, overlay and backend together.
//!
//! This module provides:
//! - `Shield`, the one-per-process driver object
//! - the tick path run from the timer interrupt (`tick`)
//! - the application-side frame cycle (`clear` / `set` / `swap`)
//!
//! Every piece of state both contexts touch sits in a
//! `critical_section::Mutex`, so all methods take `&self` and are safe to
//! call from the interrupt handler and the main thread alike. The interrupt
//! never waits on the application; the application only ever blocks inside
//! `swap`, and does so outside the critical section so ticks keep coming.

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicBool, Ordering};

use critical_section::Mutex;
use embedded_hal::digital::InputPin;

use crate::display::Render;
use crate::frame::{Color, FrameStore, GRID_SIZE};
use crate::input::{Button, ButtonBank, BUTTON_COUNT};
use crate::overlay::Overlay;

/// Ticks `swap` waits for after flipping the grids. Two ticks prove the
/// scanner has moved on from the moment of the flip; a full pass over all
/// eight rows takes eight ticks, but the flip itself is atomic and the
/// scanner re-reads the front grid every row, so two is enough to keep a
/// fast caller from flipping twice within one scan step.
pub const SWAP_SETTLE_TICKS: u32 = 2;

/// Driver context for one shield. `B` is the display backend, `I` the button
/// input pin type; five pins are handed over in `Button` order (up, down,
/// left, right, fire). The shield is designed as a process-wide singleton:
/// construct exactly one and share it by reference.
pub struct Shield<B, I> {
    frames: Mutex<RefCell<FrameStore>>,
    buttons: Mutex<RefCell<ButtonBank>>,
    keys: Mutex<RefCell<[I; BUTTON_COUNT]>>,
    backend: Mutex<RefCell<B>>,
    overlay: Mutex<RefCell<Overlay>>,
    scan: Mutex<Cell<u8>>,
    key_cursor: Mutex<Cell<u8>>,
    since_swap: Mutex<Cell<u32>>,
    loop_ticks: Mutex<Cell<u32>>,
    ticker_running: AtomicBool,
}

impl<B, I> Shield<B, I>
where
    B: Render,
    I: InputPin,
{
    pub fn new(backend: B, keys: [I; BUTTON_COUNT]) -> Self {
        Self {
            frames: Mutex::new(RefCell::new(FrameStore::new())),
            buttons: Mutex::new(RefCell::new(ButtonBank::new())),
            keys: Mutex::new(RefCell::new(keys)),
            backend: Mutex::new(RefCell::new(backend)),
            overlay: Mutex::new(RefCell::new(Overlay::new())),
            scan: Mutex::new(Cell::new(0)),
            key_cursor: Mutex::new(Cell::new(0)),
            since_swap: Mutex::new(Cell::new(0)),
            loop_ticks: Mutex::new(Cell::new(0)),
            ticker_running: AtomicBool::new(false),
        }
    }

    /// Record that a periodic interrupt is about to start driving `tick`.
    /// Makes `swap` wait for the scanner; without it `swap` returns
    /// immediately and the caller is responsible for calling `refresh`
    /// often.
    pub fn start_ticker(&self) {
        self.ticker_running.store(true, Ordering::Relaxed);
    }

    pub fn ticker_started(&self) -> bool {
        self.ticker_running.load(Ordering::Relaxed)
    }

    /// One scheduler step: display the row under the scan cursor from the
    /// front grid, then feed one button's raw level into the debounce
    /// filter, round-robin. Runs from the timer interrupt.
    pub fn tick(&self) {
        critical_section::with(|cs| {
            let ticks = self.since_swap.borrow(cs);
            ticks.set(ticks.get().wrapping_add(1));

            let row = self.scan.borrow(cs).get();
            let pixels = self.frames.borrow_ref(cs).front_row(row as usize);
            self.backend.borrow_ref_mut(cs).row(row as usize, pixels);
            self.scan.borrow(cs).set((row + 1) % GRID_SIZE as u8);

            let index = self.key_cursor.borrow(cs).get();
            // buttons are wired active-low with pull-ups
            let pressed = {
                let mut keys = self.keys.borrow_ref_mut(cs);
                matches!(keys[index as usize].is_low(), Ok(true))
            };
            self.buttons.borrow_ref_mut(cs).sample(index as usize, pressed);
            self.key_cursor.borrow(cs).set((index + 1) % BUTTON_COUNT as u8);
        });
    }

    /// Write one pixel into the back grid. Out-of-range coordinates are
    /// ignored.
    pub fn set(&self, x: i32, y: i32, color: Color) {
        critical_section::with(|cs| {
            self.frames.borrow_ref_mut(cs).back_mut().set(x, y, color);
        });
    }

    /// Zero the back grid.
    pub fn clear(&self) {
        critical_section::with(|cs| {
            self.frames.borrow_ref_mut(cs).back_mut().clear();
        });
    }

    /// Run `f` over the back grid's packed row words, for bulk writes. The
    /// closure runs inside the critical section: keep it short and do not
    /// call back into the shield from it.
    pub fn with_buffer<R>(&self, f: impl FnOnce(&mut [u16; GRID_SIZE]) -> R) -> R {
        critical_section::with(|cs| f(self.frames.borrow_ref_mut(cs).back_mut().rows_mut()))
    }

    /// Copy of the back grid's packed row words.
    pub fn buffer(&self) -> [u16; GRID_SIZE] {
        critical_section::with(|cs| *self.frames.borrow_ref(cs).back().rows())
    }

    /// Finish the frame: commit button state, capture the tick count, flip
    /// the grids and redraw the overlay if its text changed, all atomically
    /// with respect to the scheduler. When the ticker is running, blocks
    /// until the scanner has run [`SWAP_SETTLE_TICKS`] ticks against the new
    /// front grid. Never call this from interrupt context or from inside a
    /// critical section.
    pub fn swap(&self) {
        critical_section::with(|cs| {
            self.buttons.borrow_ref_mut(cs).commit();

            let since = self.since_swap.borrow(cs);
            self.loop_ticks.borrow(cs).set(since.replace(0));

            self.frames.borrow_ref_mut(cs).flip();

            let mut overlay = self.overlay.borrow_ref_mut(cs);
            if overlay.changed() {
                self.backend.borrow_ref_mut(cs).overlay_text(overlay.text());
                overlay.mark_rendered();
            }
        });

        if self.ticker_running.load(Ordering::Relaxed) {
            while critical_section::with(|cs| self.since_swap.borrow(cs).get()) < SWAP_SETTLE_TICKS
            {
                core::hint::spin_loop();
            }
        }
    }

    /// Display all eight rows of the front grid in one synchronous pass,
    /// for running without the timer interrupt. Resets the scan cursor so
    /// the row registers stay in step, and blanks afterwards since no tick
    /// will come along to do it.
    pub fn refresh(&self) {
        critical_section::with(|cs| {
            self.scan.borrow(cs).set(0);
            let frames = self.frames.borrow_ref(cs);
            let mut backend = self.backend.borrow_ref_mut(cs);
            for y in 0..GRID_SIZE {
                backend.row(y, frames.front_row(y));
            }
            backend.blank();
        });
    }

    /// Debounced level of a button, as of the last `swap`.
    pub fn pressed(&self, button: Button) -> bool {
        critical_section::with(|cs| self.buttons.borrow_ref(cs).pressed(button))
    }

    /// True if the button went down during the previous swap-to-swap
    /// interval.
    pub fn went_down(&self, button: Button) -> bool {
        critical_section::with(|cs| self.buttons.borrow_ref(cs).went_down(button))
    }

    /// Scheduler ticks that elapsed during the previous swap-to-swap
    /// interval.
    pub fn ticks(&self) -> u32 {
        critical_section::with(|cs| self.loop_ticks.borrow(cs).get())
    }

    /// Replace the overlay text.
    pub fn set_text(&self, s: &str) {
        critical_section::with(|cs| self.overlay.borrow_ref_mut(cs).set(s));
    }

    /// Append to the overlay text; dropped whole if it would not fit.
    pub fn append_text(&self, s: &str) {
        critical_section::with(|cs| self.overlay.borrow_ref_mut(cs).append(s));
    }

    /// Append a number to the overlay text.
    pub fn append_number(&self, n: i32) {
        critical_section::with(|cs| self.overlay.borrow_ref_mut(cs).append_number(n));
    }

    /// Clear the overlay text.
    pub fn clear_text(&self) {
        critical_section::with(|cs| self.overlay.borrow_ref_mut(cs).clear());
    }
}
