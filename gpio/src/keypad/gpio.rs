use std::fmt::{Debug, Formatter};
use crate::{GpioBusInput, GpioBusOutput, GpioResult};
use crate::debounce::SampledDebounce;
use crate::delay::Delay;
use crate::keypad::Keypad;

/// Represents the keys on a 4x3 keypad.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum KeypadKey {
    /// The `1` key.
    Key1,
    /// The `2` key.
    Key2,
    /// The `3` key.
    Key3,
    /// The `4` key.
    Key4,
    /// The `5` key.
    Key5,
    /// The `6` key.
    Key6,
    /// The `7` key.
    Key7,
    /// The `8` key.
    Key8,
    /// The `9` key.
    Key9,
    /// The `0` key.
    Key0,
    /// The `*` key.
    KeyAsterisk,
    /// The `#` key.
    KeyHash,
}

impl KeypadKey {
    pub const ROWS: usize = 4;
    pub const COLS: usize = 3;

    /// Converts a position tuple (row, column) to a [KeypadKey].
    pub fn from_position(pos: (usize, usize)) -> Option<KeypadKey> {
        use KeypadKey::*;

        const KEYS: [[KeypadKey; KeypadKey::COLS]; KeypadKey::ROWS] = [
            [ Key1, Key2, Key3, ],
            [ Key4, Key5, Key6, ],
            [ Key7, Key8, Key9, ],
            [ KeyAsterisk, Key0, KeyHash, ],
        ];

        KEYS.get(pos.0)?.get(pos.1).copied()
    }

    /// Converts the [KeypadKey] to its corresponding character.
    pub fn to_char(self) -> char {
        use KeypadKey::*;

        match self {
            Key1 => '1',
            Key2 => '2',
            Key3 => '3',
            Key4 => '4',
            Key5 => '5',
            Key6 => '6',
            Key7 => '7',
            Key8 => '8',
            Key9 => '9',
            Key0 => '0',
            KeyAsterisk => '*',
            KeyHash => '#',
        }
    }

    /// Converts a character back to its [KeypadKey], if the keypad has such a key.
    pub fn from_char(c: char) -> Option<KeypadKey> {
        use KeypadKey::*;

        Some(match c {
            '1' => Key1,
            '2' => Key2,
            '3' => Key3,
            '4' => Key4,
            '5' => Key5,
            '6' => Key6,
            '7' => Key7,
            '8' => Key8,
            '9' => Key9,
            '0' => Key0,
            '*' => KeyAsterisk,
            '#' => KeyHash,
            _ => return None,
        })
    }
}

/// The `GpioKeypad` struct represents a GPIO-based keypad with 4 rows and 3 columns.
///
/// Rows are driven active one at a time, and every column is debounced while its row is driven.
pub struct GpioKeypad<'a> {
    rows: &'a dyn GpioBusOutput<4>,
    cols: &'a dyn GpioBusInput<3>,
    delay: &'a dyn Delay,
    debounce: SampledDebounce,
}

impl Debug for GpioKeypad<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "GpioKeypad({:?}, {:?})", self.rows, self.cols)
    }
}

impl<'a> GpioKeypad<'a> {
    /// Creates a new `GpioKeypad` instance with the specified GPIO bus outputs for rows and inputs for columns.
    ///
    /// The rows are used to write the active state, and the columns are used to read the pressed keys
    /// in the active row.
    pub fn new(
        rows: &'a dyn GpioBusOutput<4>,
        cols: &'a dyn GpioBusInput<3>,
        delay: &'a dyn Delay,
    ) -> Self {
        GpioKeypad {
            rows,
            cols,
            delay,
            debounce: SampledDebounce::default(),
        }
    }

    pub fn with_debounce(mut self, debounce: SampledDebounce) -> Self {
        self.debounce = debounce;
        self
    }

    fn scan_row(&self, row: usize, pressed: &mut Vec<KeypadKey>) -> GpioResult<()> {
        self.rows.write_one_hot(Some(row))?;

        for col in 0..KeypadKey::COLS {
            let confirmed = self.debounce.confirm(self.delay, || Ok(self.cols.read()?[col]))?;
            if confirmed {
                if let Some(key) = KeypadKey::from_position((row, col)) {
                    pressed.push(key);
                }
            }
        }

        Ok(())
    }
}

impl Keypad for GpioKeypad<'_> {
    type Key = KeypadKey;

    fn read(&self) -> GpioResult<Vec<Self::Key>> {
        let mut pressed = Vec::new();

        let scan = (0..KeypadKey::ROWS).try_for_each(|row| self.scan_row(row, &mut pressed));
        // Never leave a row driven, even when a read failed halfway.
        let idle = self.rows.write_one_hot(None);
        scan?;
        idle?;

        Ok(pressed)
    }
}
