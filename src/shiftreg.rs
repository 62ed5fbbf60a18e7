//! Bit-serial shift-register backend for the LED matrix boards.
//!
//! The board carries two daisy-chained register chains: an 8-bit chain
//! selecting the active row (one-hot, active-high) and a 16-bit chain driving
//! the column lines (active-low, two lines per pixel for the two LED dies).
//! Rather than reshifting the whole row register every scan line, a single
//! high bit is injected at row 0 and clocked one position further on each
//! row, the same trick the shield's original firmware used to keep the tick
//! handler short.

use embedded_hal::digital::OutputPin;

use crate::display::Render;

// Spin iterations holding the final row after a manual full refresh, so the
// last row gets roughly the same visible duration as the others.
const HOLD_SPINS: u32 = 30;

/// The six control lines, in wiring order.
pub struct ShiftRegister<O> {
    row_data: O,
    row_clock: O,
    row_latch: O,
    col_data: O,
    col_clock: O,
    col_latch: O,
}

impl<O: OutputPin> ShiftRegister<O> {
    /// Take ownership of the six lines and clear both register chains.
    pub fn new(row_data: O, row_clock: O, row_latch: O, col_data: O, col_clock: O, col_latch: O) -> Self {
        let mut this = Self {
            row_data,
            row_clock,
            row_latch,
            col_data,
            col_clock,
            col_latch,
        };

        let _ = this.row_latch.set_low();
        this.shift_rows(0);
        let _ = this.row_latch.set_high();

        let _ = this.col_latch.set_low();
        this.shift_cols(0);
        let _ = this.col_latch.set_high();
        this
    }

    // Shift 8 bits into the row chain, most significant first. The data line
    // is dropped after every clock edge so a bit cannot bleed into the next
    // position.
    fn shift_rows(&mut self, bits: u8) {
        let _ = self.row_data.set_low();
        for i in (0..8).rev() {
            let _ = self.row_clock.set_low();
            if bits & (1 << i) != 0 {
                let _ = self.row_data.set_high();
            } else {
                let _ = self.row_data.set_low();
            }
            let _ = self.row_clock.set_high();
            let _ = self.row_data.set_low();
        }
        let _ = self.row_clock.set_low();
    }

    // Shift 16 bits into the column chain, most significant first, same
    // data-off discipline as the row chain.
    fn shift_cols(&mut self, bits: u16) {
        let _ = self.col_data.set_low();
        for i in (0..16).rev() {
            let _ = self.col_clock.set_low();
            if bits & (1 << i) != 0 {
                let _ = self.col_data.set_high();
            } else {
                let _ = self.col_data.set_low();
            }
            let _ = self.col_clock.set_high();
            let _ = self.col_data.set_low();
        }
        let _ = self.col_clock.set_low();
    }
}

impl<O: OutputPin> Render for ShiftRegister<O> {
    fn row(&mut self, y: usize, pixels: u16) {
        // row 0 injects the one-hot bit that the row clock walks along
        if y == 0 {
            let _ = self.row_data.set_high();
        }

        let _ = self.row_latch.set_low();
        let _ = self.col_latch.set_low();

        // advance the row selection by one position
        let _ = self.row_clock.set_high();
        let _ = self.row_clock.set_low();
        let _ = self.row_data.set_low();

        // columns are active-low: invert the pixel bits
        self.shift_cols(!pixels);

        let _ = self.row_latch.set_high();
        let _ = self.col_latch.set_high();
    }

    fn blank(&mut self) {
        // hold the last line for a little while
        for _ in 0..HOLD_SPINS {
            core::hint::spin_loop();
        }

        // then latch all columns off so the final row is not left bright
        let _ = self.row_latch.set_low();
        let _ = self.col_latch.set_low();
        self.shift_cols(0xffff);
        let _ = self.row_latch.set_high();
        let _ = self.col_latch.set_high();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use embedded_hal::digital::ErrorType;

    use super::*;

    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    enum Line {
        RowData,
        RowClock,
        RowLatch,
        ColData,
        ColClock,
        ColLatch,
    }

    type Log = Rc<RefCell<Vec<(Line, bool)>>>;

    // OutputPin writing every transition into a shared ordered log.
    struct LogPin {
        line: Line,
        log: Log,
    }

    impl ErrorType for LogPin {
        type Error = core::convert::Infallible;
    }

    impl OutputPin for LogPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.log.borrow_mut().push((self.line, false));
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.log.borrow_mut().push((self.line, true));
            Ok(())
        }
    }

    fn rig() -> (ShiftRegister<LogPin>, Log) {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        let pin = |line| LogPin {
            line,
            log: Rc::clone(&log),
        };
        let sr = ShiftRegister::new(
            pin(Line::RowData),
            pin(Line::RowClock),
            pin(Line::RowLatch),
            pin(Line::ColData),
            pin(Line::ColClock),
            pin(Line::ColLatch),
        );
        log.borrow_mut().clear();
        (sr, log)
    }

    // Replay the log: the level of `data` at each rising edge of `clock`,
    // oldest bit shifted deepest (so first-shifted ends up most significant).
    fn shifted_word(log: &Log, data: Line, clock: Line, width: u32) -> u16 {
        let mut level = false;
        let mut word: u32 = 0;
        let mut bits = 0;
        for &(line, high) in log.borrow().iter() {
            if line == data {
                level = high;
            } else if line == clock && high {
                word = (word << 1) | level as u32;
                bits += 1;
            }
        }
        assert_eq!(bits, width);
        word as u16
    }

    #[test]
    fn columns_shift_the_inverted_pixel_word() {
        let (mut sr, log) = rig();
        sr.row(3, 0b0000_0000_1101_0010);
        assert_eq!(
            shifted_word(&log, Line::ColData, Line::ColClock, 16),
            !0b0000_0000_1101_0010
        );
    }

    #[test]
    fn row_zero_injects_the_one_hot_bit() {
        let (mut sr, log) = rig();
        sr.row(0, 0);
        // exactly one row-clock pulse, with the data line high going into it
        let events = log.borrow();
        let clock_pulses = events
            .iter()
            .filter(|&&(l, h)| l == Line::RowClock && h)
            .count();
        assert_eq!(clock_pulses, 1);

        let mut data_level = false;
        let mut level_at_pulse = None;
        for &(line, high) in events.iter() {
            if line == Line::RowData {
                data_level = high;
            } else if line == Line::RowClock && high {
                level_at_pulse = Some(data_level);
            }
        }
        assert_eq!(level_at_pulse, Some(true));
    }

    #[test]
    fn later_rows_clock_a_zero_along() {
        let (mut sr, log) = rig();
        sr.row(0, 0);
        log.borrow_mut().clear();

        sr.row(1, 0);
        let events = log.borrow();
        let mut data_level = false;
        for &(line, high) in events.iter() {
            if line == Line::RowData {
                data_level = high;
            } else if line == Line::RowClock && high {
                // the injected bit moves along, nothing new goes in
                assert!(!data_level);
            }
        }
    }

    #[test]
    fn latches_drop_before_shifting_and_rise_after() {
        let (mut sr, log) = rig();
        sr.row(2, 0xffff);
        let events = log.borrow();

        let first_col_clock = events
            .iter()
            .position(|&(l, h)| l == Line::ColClock && h)
            .unwrap();
        let col_latch_low = events
            .iter()
            .position(|&(l, h)| l == Line::ColLatch && !h)
            .unwrap();
        let col_latch_high = events
            .iter()
            .rposition(|&(l, h)| l == Line::ColLatch && h)
            .unwrap();

        assert!(col_latch_low < first_col_clock);
        assert!(events
            .iter()
            .skip(col_latch_high)
            .all(|&(l, h)| l != Line::ColClock || !h));
    }

    #[test]
    fn blank_turns_every_column_off() {
        let (mut sr, log) = rig();
        sr.blank();
        assert_eq!(shifted_word(&log, Line::ColData, Line::ColClock, 16), 0xffff);
    }
}
