use std::time::Duration;

/// LED pairs lit together by the twinkle animation, from the first group outward.
pub const TWINKLE_GROUPS: [[usize; 2]; 3] = [[0, 1], [4, 5], [2, 3]];

/// LED pairs lit in turn by the correct animation.
pub const CORRECT_SWEEP: [[usize; 2]; 3] = [[0, 1], [2, 3], [4, 5]];

/// Dwells must stay below this for the cycled LEDs to blend together without flicker.
pub const FLICKER_FREE_DWELL: Duration = Duration::from_millis(5);

/// Timings of the LED board animations.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct AnimationTiming {
    /// How long each LED stays lit while cycling. Must stay well below the flicker threshold.
    pub dwell: Duration,
    /// Length of one flash phase and of one twinkle step.
    pub flash_period: Duration,
    pub power_up: Duration,
    pub power_down: Duration,
    /// How long each pair stays lit in the correct animation.
    pub correct_step: Duration,
    /// Length of the wrong animation.
    pub wrong: Duration,
}

impl Default for AnimationTiming {
    fn default() -> Self {
        Self {
            dwell: Duration::from_millis(3),
            flash_period: Duration::from_millis(200),
            power_up: Duration::from_secs(2),
            power_down: Duration::from_secs(2),
            correct_step: Duration::from_millis(300),
            wrong: Duration::from_millis(1200),
        }
    }
}

/// Which of `phases` consecutive periods of length `period` the `elapsed` time falls in,
/// repeating forever.
pub(crate) fn phase(elapsed: Duration, period: Duration, phases: usize) -> usize {
    let period = period.as_micros().max(1);
    ((elapsed.as_micros() / period) % phases as u128) as usize
}
