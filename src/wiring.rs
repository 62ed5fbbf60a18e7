// Board-specific pin mapping, timer setup and singleton plumbing for the
// shield on an ESP32-S3.
//! The following wiring is assumed for the LED matrix boards:
//! - Row shift register: DATA => GPIO4, CLOCK => GPIO5, LATCH => GPIO6
//! - Column shift registers: DATA => GPIO7, CLOCK => GPIO15, LATCH => GPIO16
//! - Buttons S1..S5 (up/down/left/right/fire) => GPIO9/10/11/12/13,
//!   closing to GND when pressed (internal pull-ups are enabled here)
//!
//! `begin` leaks the driver into a `'static` singleton, so the application
//! must install a heap first (`esp_alloc::heap_allocator!`); the shield
//! itself only needs a few hundred bytes.

use esp_backtrace as _;

use core::cell::{Cell, RefCell};

use alloc::boxed::Box;
use critical_section::Mutex;
use esp_hal::{
    gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull},
    handler,
    peripherals::{Peripherals, TIMG0},
    ram,
    time::Duration,
    timer::{timg::TimerGroup, PeriodicTimer},
    Blocking,
};
use esp_println::println;

use crate::shield::Shield;
use crate::shiftreg::ShiftRegister;

/// Shield driven through the bit-serial shift registers.
pub type MatrixShield = Shield<ShiftRegister<Output<'static>>, Input<'static>>;

// The tick handler reaches the singleton through these; the application goes
// through the reference `begin` hands back.
static MATRIX: Mutex<Cell<Option<&'static MatrixShield>>> = Mutex::new(Cell::new(None));
static TICKER: Mutex<RefCell<Option<PeriodicTimer<'static, Blocking>>>> =
    Mutex::new(RefCell::new(None));

pub struct ShieldPins<'a> {
    pub row_data: Output<'a>,
    pub row_clock: Output<'a>,
    pub row_latch: Output<'a>,
    pub col_data: Output<'a>,
    pub col_clock: Output<'a>,
    pub col_latch: Output<'a>,
    pub up: Input<'a>,
    pub down: Input<'a>,
    pub left: Input<'a>,
    pub right: Input<'a>,
    pub fire: Input<'a>,
}

/// Claim the shield's pins out of the peripheral set. Hands `TIMG0` back so
/// the caller can pass it on to `begin`.
pub fn init_shield_pins(p: Peripherals) -> (ShieldPins<'static>, TIMG0<'static>) {
    let row_data = Output::new(p.GPIO4, Level::Low, OutputConfig::default());
    let row_clock = Output::new(p.GPIO5, Level::Low, OutputConfig::default());
    let row_latch = Output::new(p.GPIO6, Level::Low, OutputConfig::default());
    let col_data = Output::new(p.GPIO7, Level::Low, OutputConfig::default());
    let col_clock = Output::new(p.GPIO15, Level::Low, OutputConfig::default());
    let col_latch = Output::new(p.GPIO16, Level::Low, OutputConfig::default());

    let up = Input::new(p.GPIO9, InputConfig::default().with_pull(Pull::Up));
    let down = Input::new(p.GPIO10, InputConfig::default().with_pull(Pull::Up));
    let left = Input::new(p.GPIO11, InputConfig::default().with_pull(Pull::Up));
    let right = Input::new(p.GPIO12, InputConfig::default().with_pull(Pull::Up));
    let fire = Input::new(p.GPIO13, InputConfig::default().with_pull(Pull::Up));

    (
        ShieldPins {
            row_data,
            row_clock,
            row_latch,
            col_data,
            col_clock,
            col_latch,
            up,
            down,
            left,
            right,
            fire,
        },
        p.TIMG0,
    )
}

// One tick: clear the timer interrupt, then run the scheduler step of
// whichever shield singleton exists.
#[handler]
#[ram]
fn tick_handler() {
    critical_section::with(|cs| {
        if let Some(ticker) = TICKER.borrow_ref_mut(cs).as_mut() {
            ticker.clear_interrupt();
        }
        if let Some(shield) = MATRIX.borrow(cs).get() {
            shield.tick();
        }
        #[cfg(feature = "tft")]
        if let Some(shield) = tft::PANEL.borrow(cs).get() {
            shield.tick();
        }
    });
}

fn start_ticker(timg0: TIMG0<'static>, period: Duration) {
    let timg = TimerGroup::new(timg0);
    let mut timer = timg.timer0;
    timer.set_interrupt_handler(tick_handler);

    let mut ticker = PeriodicTimer::new(timer);
    let _ = ticker.start(period);
    ticker.enable_interrupt(true);

    critical_section::with(|cs| {
        TICKER.borrow_ref_mut(cs).replace(ticker);
    });
}

/// Bring up the LED matrix shield with the 500 Hz refresh tick. The matrix
/// multiplexes one row at a time, so it has to rescan quickly to keep the
/// rows evenly bright.
pub fn begin(pins: ShieldPins<'static>, timg0: TIMG0<'static>) -> &'static MatrixShield {
    println!("matrix-shield {}", crate::version());

    let shield = leak_matrix(pins);
    shield.start_ticker();
    critical_section::with(|cs| MATRIX.borrow(cs).set(Some(shield)));
    start_ticker(timg0, Duration::from_micros(2_000));
    shield
}

/// Bring up the LED matrix shield without the timer tick. The caller owns
/// the scan loop and must call `refresh` frequently; `swap` will not block.
pub fn begin_no_ticker(pins: ShieldPins<'static>) -> &'static MatrixShield {
    println!("matrix-shield {} (manual refresh)", crate::version());
    leak_matrix(pins)
}

fn leak_matrix(pins: ShieldPins<'static>) -> &'static MatrixShield {
    let backend = ShiftRegister::new(
        pins.row_data,
        pins.row_clock,
        pins.row_latch,
        pins.col_data,
        pins.col_clock,
        pins.col_latch,
    );
    let keys = [pins.up, pins.down, pins.left, pins.right, pins.fire];
    Box::leak(Box::new(Shield::new(backend, keys)))
}

// ==================================================================
// TFT shield boards — feature: tft
// ==================================================================
#[cfg(feature = "tft")]
pub mod tft {
    use super::*;

    use embedded_hal_bus::spi::{ExclusiveDevice, NoDelay};
    use esp_hal::{
        delay::Delay,
        peripherals::SPI2,
        spi::master::{Config as SpiConfig, Spi},
        spi::Mode,
        time::Rate,
    };
    use mipidsi::interface::SpiInterface;
    use mipidsi::{models::ST7735s, Builder};

    use crate::panel::Panel;

    pub type TftDisplay = mipidsi::Display<
        SpiInterface<
            'static,
            ExclusiveDevice<Spi<'static, Blocking>, Output<'static>, NoDelay>,
            Output<'static>,
        >,
        ST7735s,
        Output<'static>,
    >;

    /// Shield driven through rectangle fills on the TFT.
    pub type PanelShield = Shield<Panel<TftDisplay>, Input<'static>>;

    pub(super) static PANEL: Mutex<Cell<Option<&'static PanelShield>>> =
        Mutex::new(Cell::new(None));

    pub struct TftPins<'a> {
        pub spi2: SPI2<'a>,
        pub sck: esp_hal::peripherals::GPIO36<'a>,
        pub mosi: esp_hal::peripherals::GPIO35<'a>,
        pub cs: Output<'a>,
        pub dc: Output<'a>,
        pub rst: Output<'a>,
        pub up: Input<'a>,
        pub down: Input<'a>,
        pub left: Input<'a>,
        pub right: Input<'a>,
        pub fire: Input<'a>,
    }

    /// Bring up the TFT shield with the 200 Hz refresh tick (rectangle fills
    /// hold their pixels, so the panel does not need the matrix's fast
    /// rescan). `colour_map` remaps the four pixel colours; each entry is an
    /// 8-bit RGB triplet.
    pub fn begin_panel(
        pins: TftPins<'static>,
        timg0: TIMG0<'static>,
        colour_map: Option<&[[u8; 3]; 4]>,
    ) -> &'static PanelShield {
        println!("matrix-shield {} (tft)", crate::version());

        // SPI @ 40 MHz, Mode 0
        let spi = Spi::new(
            pins.spi2,
            SpiConfig::default()
                .with_frequency(Rate::from_hz(40_000_000))
                .with_mode(Mode::_0),
        )
        .unwrap()
        .with_sck(pins.sck)
        .with_mosi(pins.mosi);

        let spi_dev = ExclusiveDevice::new(spi, pins.cs, NoDelay).unwrap();
        let buf: &'static mut [u8] = Box::leak(alloc::vec![0u8; 512].into_boxed_slice());
        let di = SpiInterface::new(spi_dev, pins.dc, buf);

        let mut delay = Delay::new();
        let display = Builder::new(ST7735s, di)
            .display_size(128, 160)
            .reset_pin(pins.rst)
            .init(&mut delay)
            .unwrap();

        let backend = match colour_map {
            Some(map) => Panel::with_palette(display, map),
            None => Panel::new(display),
        };
        let keys = [pins.up, pins.down, pins.left, pins.right, pins.fire];
        let shield: &'static PanelShield = Box::leak(Box::new(Shield::new(backend, keys)));

        shield.start_ticker();
        critical_section::with(|cs| PANEL.borrow(cs).set(Some(shield)));
        start_ticker(timg0, Duration::from_micros(5_000));
        shield
    }
}
