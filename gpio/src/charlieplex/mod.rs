//! Charlieplexed LED board: six LEDs on three tri-state pins.
//!
//! Each LED sits between a pair of pins, in one of the two possible orientations. Driving one
//! pin of the pair high, the other low and leaving the third pin floating lights exactly that LED.
//! Only one LED can be lit at a time, so anything showing several LEDs at once cycles through
//! them quickly enough for the eye to blend them together.

mod animation;

use std::fmt::{Debug, Formatter};
use std::time::Duration;
use log::trace;
use crate::delay::Delay;
use crate::{GpioBusTristate, GpioError, GpioResult, PinState};
pub use animation::*;

/// The amount of LEDs that three pins can drive.
pub const LED_COUNT: usize = 6;

/// Every LED of the board, in index order.
pub const ALL_LEDS: [usize; LED_COUNT] = [0, 1, 2, 3, 4, 5];

/// Pin configuration with every LED dark.
pub const DARK_PIN_STATES: [PinState; 3] = [PinState::Floating; 3];

/// Pin configuration lighting each LED.
pub const LED_PIN_STATES: [[PinState; 3]; LED_COUNT] = {
    use PinState::*;
    [
        [High, Low, Floating],
        [Low, High, Floating],
        [Floating, High, Low],
        [Floating, Low, High],
        [High, Floating, Low],
        [Low, Floating, High],
    ]
};

/// The `LedBoard` trait defines the interface of an LED indicator board.
///
/// All the animations block until finished and leave every LED dark.
pub trait LedBoard: Debug {
    /// Lights the LED at `led` and only that one, or none at all when `led` is `None`.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if there's no LED at the index.
    fn light_only(&mut self, led: Option<usize>) -> GpioResult<()>;

    /// Turns every LED off.
    fn go_dark(&mut self) -> GpioResult<()> {
        self.light_only(None)
    }

    /// Keeps a single LED lit for `duration`.
    fn light_for(&mut self, led: usize, duration: Duration) -> GpioResult<()>;

    /// Alternates between all the `enabled` LEDs lit and all dark.
    fn flash(&mut self, enabled: &[usize], duration: Duration) -> GpioResult<()>;

    /// Lights LED pairs in turn, moving outward or inward.
    fn twinkle(&mut self, duration: Duration, outward: bool) -> GpioResult<()>;

    fn power_up(&mut self) -> GpioResult<()>;
    fn power_down(&mut self) -> GpioResult<()>;

    /// Signals a successful operation.
    fn correct(&mut self) -> GpioResult<()>;
    /// Signals a failed operation.
    fn wrong(&mut self) -> GpioResult<()>;
}

/// LED board driving six LEDs through a 3-pin tri-state bus.
pub struct Charlieplex<'a> {
    pins: &'a dyn GpioBusTristate<3>,
    delay: &'a dyn Delay,
    timing: AnimationTiming,
    lit: Option<usize>,
}

impl Debug for Charlieplex<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Charlieplex({:?})", self.pins)
    }
}

impl<'a> Charlieplex<'a> {
    /// Creates the board and makes sure it starts dark.
    pub fn new(pins: &'a dyn GpioBusTristate<3>, delay: &'a dyn Delay) -> GpioResult<Self> {
        let mut board = Self {
            pins,
            delay,
            timing: AnimationTiming::default(),
            lit: None,
        };
        board.go_dark()?;
        Ok(board)
    }

    pub fn with_timing(mut self, timing: AnimationTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn timing(&self) -> &AnimationTiming {
        &self.timing
    }

    /// The LED currently lit, if any.
    pub fn lit(&self) -> Option<usize> {
        self.lit
    }

    /// Lights one LED for a single dwell period and returns the time spent.
    fn dwell(&mut self, led: Option<usize>) -> GpioResult<Duration> {
        // A zero dwell would never advance the animation clock.
        let dwell = self.timing.dwell.max(Duration::from_micros(1));
        self.light_only(led)?;
        self.delay.sleep(dwell);
        Ok(dwell)
    }

    /// Cycles through `leds` once, one dwell period each. Returns the time spent.
    fn cycle(&mut self, leds: &[usize]) -> GpioResult<Duration> {
        if leds.is_empty() {
            return self.dwell(None);
        }

        let mut spent = Duration::ZERO;
        for &led in leds {
            spent += self.dwell(Some(led))?;
        }
        Ok(spent)
    }
}

impl LedBoard for Charlieplex<'_> {
    fn light_only(&mut self, led: Option<usize>) -> GpioResult<()> {
        let states = match led {
            Some(led) => *LED_PIN_STATES.get(led).ok_or(GpioError::InvalidArgument)?,
            None => DARK_PIN_STATES,
        };

        self.pins.set(&states)?;
        self.lit = led;
        Ok(())
    }

    fn light_for(&mut self, led: usize, duration: Duration) -> GpioResult<()> {
        trace!("Lighting LED {} for {:?}.", led, duration);
        self.light_only(Some(led))?;
        self.delay.sleep(duration);
        self.go_dark()
    }

    fn flash(&mut self, enabled: &[usize], duration: Duration) -> GpioResult<()> {
        trace!("Flashing LEDs {:?} for {:?}.", enabled, duration);
        let period = self.timing.flash_period;
        let mut elapsed = Duration::ZERO;

        while elapsed < duration {
            elapsed += if phase(elapsed, period, 2) == 0 {
                self.cycle(enabled)?
            } else {
                self.dwell(None)?
            };
        }

        self.go_dark()
    }

    fn twinkle(&mut self, duration: Duration, outward: bool) -> GpioResult<()> {
        trace!("Twinkling {} for {:?}.", if outward { "outward" } else { "inward" }, duration);
        let period = self.timing.flash_period;
        let mut elapsed = Duration::ZERO;

        while elapsed < duration {
            let step = phase(elapsed, period, TWINKLE_GROUPS.len());
            let group = if outward { step } else { TWINKLE_GROUPS.len() - 1 - step };
            elapsed += self.cycle(&TWINKLE_GROUPS[group])?;
        }

        self.go_dark()
    }

    fn power_up(&mut self) -> GpioResult<()> {
        self.twinkle(self.timing.power_up, true)
    }

    fn power_down(&mut self) -> GpioResult<()> {
        self.twinkle(self.timing.power_down, false)
    }

    fn correct(&mut self) -> GpioResult<()> {
        trace!("Playing the correct animation.");
        let step = self.timing.correct_step;

        for group in CORRECT_SWEEP {
            let mut elapsed = Duration::ZERO;
            while elapsed < step {
                elapsed += self.cycle(&group)?;
            }
        }

        self.go_dark()
    }

    fn wrong(&mut self) -> GpioResult<()> {
        trace!("Playing the wrong animation.");
        self.flash(&ALL_LEDS, self.timing.wrong)
    }
}

#[cfg(test)]
mod tests;
