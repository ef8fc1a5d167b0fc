pub mod raw;
pub mod delay;
pub mod debounce;
pub mod keypad;
pub mod charlieplex;
pub mod utils;

use std::fmt::Debug;
use thiserror::Error;

#[derive(Debug, Error, Eq, PartialEq, Clone)]
pub enum GpioError {
    #[error("pin already in use")]
    AlreadyInUse,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("the feature is not supported on this backend")]
    NotSupported,
    #[error("IO error: {0}")]
    Io(std::io::ErrorKind),
    #[error("error: {0}")]
    Other(String),
}

impl From<std::io::Error> for GpioError {
    fn from(err: std::io::Error) -> Self {
        GpioError::Io(err.kind())
    }
}

pub type GpioResult<T> = Result<T, GpioError>;

pub trait GpioDriver: Debug {
    /// Gets the amount of GPIO pins available.
    fn count(&self) -> GpioResult<usize>;

    /// Acquires the GPIO pins at the specific indices as a bus.
    ///
    /// The pins are reset to floating inputs on acquisition and returned to that state
    /// when the bus is dropped.
    fn get_pin_bus<const N: usize>(
        &self,
        indices: [usize; N],
    ) -> GpioResult<Box<dyn GpioBus<N> + '_>>;
}

/// Specifies the bias of the GPIO pin.
///
/// You can use this to enable pull-up or pull-down resistors.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum GpioBias {
    #[default] None,
    PullUp,
    PullDown,
}

/// The direction a GPIO pin is configured for.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum PinMode {
    Input,
    Output,
}

/// The drive of a single pin in tri-state use.
///
/// Charlieplexed LEDs need all three: one pin sourcing current, one sinking it,
/// and the rest disconnected so no other path conducts.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum PinState {
    /// Output, driven high.
    High,
    /// Output, driven low.
    Low,
    /// Input with no bias, effectively disconnected.
    #[default] Floating,
}

impl PinState {
    /// Gets the level the pin is driven to, or `None` if it's left floating.
    pub fn level(self) -> Option<bool> {
        match self {
            PinState::High => Some(true),
            PinState::Low => Some(false),
            PinState::Floating => None,
        }
    }
}

pub trait GpioBus<const N: usize>: Debug {
    /// Sets all pins of the bus to input, allowing reading their state.
    fn as_input(&mut self) -> GpioResult<Box<dyn GpioBusInput<N> + '_>>;
    /// Sets all pins of the bus to output, allowing writing their state.
    fn as_output(&mut self) -> GpioResult<Box<dyn GpioBusOutput<N> + '_>>;
    /// Allows switching every pin of the bus between driven high, driven low and floating.
    ///
    /// # Errors
    /// - `GpioError::NotSupported` if the backend can't switch pin direction on the fly.
    fn as_tristate(&mut self) -> GpioResult<Box<dyn GpioBusTristate<N> + '_>> {
        Err(GpioError::NotSupported)
    }

    fn set_bias(&mut self, _bias: GpioBias) -> GpioResult<()> {
        Err(GpioError::NotSupported)
    }
}

pub trait GpioBusInput<const N: usize>: Debug {
    fn read(&self) -> GpioResult<[bool; N]>;
}

pub trait GpioBusOutput<const N: usize>: Debug {
    fn write(&self, values: &[bool; N]) -> GpioResult<()>;
}

impl<const N: usize> dyn GpioBusOutput<N> + '_ {
    /// Drives exactly one pin of the bus active, or none when `index` is `None`.
    pub fn write_one_hot(&self, index: Option<usize>) -> GpioResult<()> {
        if index.is_some_and(|index| index >= N) {
            return Err(GpioError::InvalidArgument);
        }

        let mut values = [false; N];
        if let Some(index) = index {
            values[index] = true;
        }
        self.write(&values)
    }
}

pub trait GpioBusTristate<const N: usize>: Debug {
    /// Reconfigures every pin of the bus at once.
    fn set(&self, states: &[PinState; N]) -> GpioResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Debug, Default)]
    struct RecordingBus {
        writes: RefCell<Vec<[bool; 4]>>,
    }

    impl GpioBusOutput<4> for RecordingBus {
        fn write(&self, values: &[bool; 4]) -> GpioResult<()> {
            self.writes.borrow_mut().push(*values);
            Ok(())
        }
    }

    #[test]
    fn one_hot_drives_a_single_pin() {
        let bus = RecordingBus::default();
        let output: &dyn GpioBusOutput<4> = &bus;

        output.write_one_hot(Some(2)).unwrap();
        output.write_one_hot(None).unwrap();

        assert_eq!(
            *bus.writes.borrow(),
            vec![[false, false, true, false], [false; 4]],
        );
    }

    #[test]
    fn one_hot_rejects_out_of_range_pins() {
        let bus = RecordingBus::default();
        let output: &dyn GpioBusOutput<4> = &bus;

        assert_eq!(output.write_one_hot(Some(4)), Err(GpioError::InvalidArgument));
        assert!(bus.writes.borrow().is_empty());
    }

    #[test]
    fn pin_state_maps_to_drive_level() {
        assert_eq!(PinState::High.level(), Some(true));
        assert_eq!(PinState::Low.level(), Some(false));
        assert_eq!(PinState::Floating.level(), None);
    }
}
