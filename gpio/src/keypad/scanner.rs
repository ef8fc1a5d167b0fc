use std::fmt::{Debug, Formatter};
use std::time::Duration;
use log::trace;
use crate::delay::Delay;
use crate::GpioResult;
use crate::keypad::{KeyStream, Keypad};
use crate::utils::{CollectionExt, TryGetSingleError};

/// Turns raw keypad scans into a stream of key presses.
///
/// A key is reported once, when the keypad state changes to it. Holding it down doesn't repeat it;
/// it has to be released (or another key pressed alone) before it's reported again.
/// A release only counts after `release_scans` empty scans in a row, so a held key that drops
/// out of a single scan isn't reported twice.
/// Scans where several keys read as pressed are ambiguous: they report nothing and don't
/// change which key is held.
pub struct KeypadScanner<'a, K> {
    keypad: &'a dyn Keypad<Key = K>,
    delay: &'a dyn Delay,
    poll_interval: Duration,
    release_scans: u32,
    last: Option<K>,
    empty_scans: u32,
}

impl<K> Debug for KeypadScanner<'_, K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeypadScanner({:?})", self.keypad)
    }
}

impl<'a, K: Copy + Eq + Debug> KeypadScanner<'a, K> {
    pub fn new(keypad: &'a dyn Keypad<Key = K>, delay: &'a dyn Delay) -> Self {
        Self {
            keypad,
            delay,
            poll_interval: Duration::from_millis(20),
            release_scans: 3,
            last: None,
            empty_scans: 0,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets how many empty scans in a row release the held key. Zero counts as one.
    pub fn with_release_scans(mut self, release_scans: u32) -> Self {
        self.release_scans = release_scans;
        self
    }

    /// Scans the keypad once.
    ///
    /// Returns the key if it's newly pressed since the previous poll, `None` otherwise.
    pub fn poll(&mut self) -> GpioResult<Option<K>> {
        let pressed = self.keypad.read()?;
        match pressed.try_get_single() {
            Ok(&key) => {
                self.empty_scans = 0;
                let previous = self.last.replace(key);
                Ok(Some(key).filter(|_| previous != Some(key)))
            }
            Err(TryGetSingleError::Empty) => {
                if self.last.is_some() {
                    self.empty_scans += 1;
                    if self.empty_scans >= self.release_scans.max(1) {
                        trace!("Key {:?} released.", self.last);
                        self.last = None;
                        self.empty_scans = 0;
                    }
                }
                Ok(None)
            }
            Err(TryGetSingleError::MoreThanOne) => {
                trace!("Ambiguous scan {:?}, ignoring.", pressed);
                if self.last.is_some_and(|last| pressed.contains(&last)) {
                    self.empty_scans = 0;
                }
                Ok(None)
            }
        }
    }
}

impl<K: Copy + Eq + Debug> KeyStream for KeypadScanner<'_, K> {
    type Key = K;

    fn next_key(&mut self) -> GpioResult<K> {
        loop {
            if let Some(key) = self.poll()? {
                trace!("Key {:?} pressed.", key);
                return Ok(key);
            }
            self.delay.sleep(self.poll_interval);
        }
    }
}
