//! The controller: session data and every action of the rule table.

use std::ops::ControlFlow;
use std::time::Duration;
use log::{debug, error, info, trace, warn};
use thiserror::Error;
use kpc_gpio::charlieplex::{LedBoard, LED_COUNT};
use kpc_gpio::keypad::{KeyStream, KeypadKey};
use kpc_gpio::GpioError;
use crate::fsm::{Action, Agent, Signal};
use crate::store::{PasswordStore, StoreError};

/// The shortest access code accepted when changing it.
pub const MIN_CODE_LENGTH: usize = 4;

/// Verdict signals synthesized by the login check.
pub const SIGNAL_CORRECT: Signal = 'Y';
pub const SIGNAL_WRONG: Signal = 'N';

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] GpioError),
    #[error("password store error: {0}")]
    Store(#[from] StoreError),
}

/// Data collected while the user works through the menus.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Session {
    /// Digits of the code being entered.
    pub entry: String,
    /// Signal to feed the state machine next instead of reading the keypad.
    pub override_signal: Option<Signal>,
    pub led_index: Option<usize>,
    /// Seconds to keep the selected LED lit.
    pub led_duration: Option<u64>,
}

impl Session {
    pub fn clear(&mut self) {
        *self = Session::default();
    }
}

fn is_valid_code(code: &str) -> bool {
    code.len() >= MIN_CODE_LENGTH && code.chars().all(|c| c.is_ascii_digit())
}

/// Bridges the state machine to the keypad, the LED board and the password store.
pub struct Controller<'a> {
    keys: &'a mut dyn KeyStream<Key = KeypadKey>,
    leds: &'a mut dyn LedBoard,
    store: &'a mut dyn PasswordStore,
    session: Session,
}

impl<'a> Controller<'a> {
    pub fn new(
        keys: &'a mut dyn KeyStream<Key = KeypadKey>,
        leds: &'a mut dyn LedBoard,
        store: &'a mut dyn PasswordStore,
    ) -> Self {
        Controller {
            keys,
            leds,
            store,
            session: Session::default(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Turns every LED off, e.g. before giving up on a fatal error.
    pub fn go_dark(&mut self) -> Result<(), ControllerError> {
        Ok(self.leds.go_dark()?)
    }

    fn enter_code_entry(&mut self, signal: Signal) -> Result<(), ControllerError> {
        self.session.clear();
        self.leds.power_up()?;
        // The key that woke the device up counts as the first digit.
        self.append_digit(signal);
        Ok(())
    }

    fn append_digit(&mut self, signal: Signal) {
        if signal.is_ascii_digit() {
            self.session.entry.push(signal);
        }
    }

    fn verify_login(&mut self) -> Result<(), ControllerError> {
        let stored = self.store.read()?;

        if self.session.entry == stored {
            info!("Correct code entered, logged in.");
            self.leds.correct()?;
            self.session.override_signal = Some(SIGNAL_CORRECT);
        } else {
            warn!("Wrong code entered ({} digits).", self.session.entry.len());
            self.leds.wrong()?;
            self.session.clear();
            self.session.override_signal = Some(SIGNAL_WRONG);
        }

        Ok(())
    }

    fn validate_and_store_new_code(&mut self) -> Result<(), ControllerError> {
        let candidate = std::mem::take(&mut self.session.entry);

        if !is_valid_code(&candidate) {
            warn!(
                "Rejected new code: needs at least {} digits, got {} characters.",
                MIN_CODE_LENGTH,
                candidate.len(),
            );
            self.leds.wrong()?;
        } else if let Err(err) = self.store.write(&candidate) {
            error!("Couldn't store the new code: {}", err);
            self.leds.wrong()?;
        } else {
            info!("Access code changed.");
            self.leds.correct()?;
        }

        self.session.clear();
        Ok(())
    }

    fn record_led_index(&mut self, signal: Signal) {
        match signal.to_digit(10).map(|digit| digit as usize) {
            Some(index) if index < LED_COUNT => self.session.led_index = Some(index),
            _ => debug!("Ignoring LED index {:?}.", signal),
        }
    }

    fn append_led_duration(&mut self, signal: Signal) {
        if let Some(digit) = signal.to_digit(10) {
            let seconds = self.session.led_duration.unwrap_or(0);
            self.session.led_duration = Some(seconds.saturating_mul(10).saturating_add(digit.into()));
        }
    }

    fn light_selected_led(&mut self) -> Result<(), ControllerError> {
        match self.session.led_index {
            Some(index) => {
                let seconds = self.session.led_duration.unwrap_or(0);
                info!("Lighting LED {} for {} s.", index, seconds);
                self.leds.light_for(index, Duration::from_secs(seconds))?;
            }
            None => warn!("No LED selected, nothing to light."),
        }

        self.session.clear();
        Ok(())
    }

    fn power_down(&mut self) -> Result<(), ControllerError> {
        self.leds.power_down()?;
        self.session.clear();
        Ok(())
    }
}

impl Agent for Controller<'_> {
    type Error = ControllerError;

    fn next_signal(&mut self) -> Result<Signal, ControllerError> {
        if let Some(signal) = self.session.override_signal.take() {
            trace!("Using synthesized signal {:?}.", signal);
            return Ok(signal);
        }

        Ok(self.keys.next_key()?.to_char())
    }

    fn perform(&mut self, action: Action, signal: Signal) -> Result<ControlFlow<()>, ControllerError> {
        match action {
            Action::EnterCodeEntry => self.enter_code_entry(signal)?,
            Action::AppendDigit => self.append_digit(signal),
            Action::VerifyLogin => self.verify_login()?,
            Action::AcceptLogin | Action::Noop => {}
            Action::ResetSession => self.session.clear(),
            Action::ValidateAndStoreNewCode => self.validate_and_store_new_code()?,
            Action::RecordLedIndex => self.record_led_index(signal),
            Action::AppendLedDuration => self.append_led_duration(signal),
            Action::LightSelectedLed => self.light_selected_led()?,
            Action::Logout => {
                info!("Logged out.");
                self.power_down()?;
            }
            Action::Shutdown => {
                info!("Shutting down.");
                self.power_down()?;
                return Ok(ControlFlow::Break(()));
            }
        }

        Ok(ControlFlow::Continue(()))
    }
}
