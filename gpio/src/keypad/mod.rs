mod gpio;
mod scanner;

use std::fmt::Debug;
use crate::GpioResult;
pub use gpio::*;
pub use scanner::*;

/// The `Keypad` trait defines the interface for keypad input devices.
pub trait Keypad: Debug {
    type Key;

    /// Performs one full scan and returns every key confirmed as pressed, in scan order.
    fn read(&self) -> GpioResult<Vec<Self::Key>>;
}

/// A blocking, never-ending stream of key presses.
pub trait KeyStream: Debug {
    type Key;

    /// Blocks until the next key press and returns it.
    fn next_key(&mut self) -> GpioResult<Self::Key>;
}
