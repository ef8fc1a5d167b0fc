use std::time::Duration;
use crate::delay::Delay;
use crate::GpioResult;

/// Measure-wait-measure debouncing of a contact.
///
/// A contact only counts as active if every one of `samples` readings, spaced by `interval`,
/// reads active. A single bouncing sample rejects it.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SampledDebounce {
    pub samples: u32,
    pub interval: Duration,
}

impl Default for SampledDebounce {
    fn default() -> Self {
        Self {
            samples: 20,
            interval: Duration::from_millis(5),
        }
    }
}

impl SampledDebounce {
    pub fn new(samples: u32, interval: Duration) -> Self {
        Self { samples, interval }
    }

    /// Samples the contact until it either reads inactive once or stays active for the whole window.
    ///
    /// Gives up on the first inactive reading without waiting out the window.
    pub fn confirm(
        &self,
        delay: &dyn Delay,
        mut sample: impl FnMut() -> GpioResult<bool>,
    ) -> GpioResult<bool> {
        let samples = self.samples.max(1);

        for i in 0..samples {
            if !sample()? {
                return Ok(false);
            }
            if i + 1 < samples {
                delay.sleep(self.interval);
            }
        }

        Ok(true)
    }
}
