//! The rule-driven state machine at the heart of the controller.
//!
//! Rules are plain data, checked in declaration order: the first rule leaving the current
//! state whose signal matches wins. Specific matches therefore have to come before the
//! catch-all of the same state.

use std::ops::ControlFlow;
use log::{debug, info, trace};

/// A single input symbol: a key (`0`-`9`, `*`, `#`) or a synthesized verdict (`Y`, `N`).
pub type Signal = char;

/// States of the controller.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum State {
    /// Idle, waiting for any key to wake up.
    #[default]
    Init,
    /// Collecting the access code.
    ReadCode,
    /// Waiting for the verdict on the entered code.
    Verify,
    /// Logged in, at the main menu.
    Active,
    /// Collecting a replacement access code.
    ReadNewCode,
    /// Waiting for the index of the LED to light.
    LedSelect,
    /// Collecting how many seconds to keep the LED lit.
    LedDuration,
    /// Waiting for the logout confirmation.
    Logout,
    /// Shut down. No rule leaves it.
    Done,
}

/// Classifies signals for a rule.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SignalMatch {
    /// Matches every signal.
    Any,
    /// Matches the given signal only.
    Exact(Signal),
    /// Matches signals within the inclusive range.
    Range(Signal, Signal),
}

impl SignalMatch {
    pub const DIGIT: SignalMatch = SignalMatch::Range('0', '9');
    pub const LED_DIGIT: SignalMatch = SignalMatch::Range('0', '5');
    pub const ASTERISK: SignalMatch = SignalMatch::Exact('*');
    pub const HASH: SignalMatch = SignalMatch::Exact('#');
    pub const CORRECT: SignalMatch = SignalMatch::Exact('Y');
    pub const WRONG: SignalMatch = SignalMatch::Exact('N');

    pub fn matches(&self, signal: Signal) -> bool {
        match *self {
            SignalMatch::Any => true,
            SignalMatch::Exact(expected) => signal == expected,
            SignalMatch::Range(low, high) => (low..=high).contains(&signal),
        }
    }
}

/// Side effects a rule can fire.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Action {
    EnterCodeEntry,
    AppendDigit,
    VerifyLogin,
    AcceptLogin,
    ResetSession,
    ValidateAndStoreNewCode,
    RecordLedIndex,
    AppendLedDuration,
    LightSelectedLed,
    Logout,
    Shutdown,
    Noop,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Rule {
    pub from: State,
    pub to: State,
    pub signal: SignalMatch,
    pub action: Action,
}

impl Rule {
    pub const fn new(from: State, to: State, signal: SignalMatch, action: Action) -> Self {
        Rule { from, to, signal, action }
    }

    pub fn applies(&self, state: State, signal: Signal) -> bool {
        self.from == state && self.signal.matches(signal)
    }
}

/// The rule table of the keypad controller.
pub fn default_rules() -> Vec<Rule> {
    use State::*;

    vec![
        Rule::new(Init, Done, SignalMatch::HASH, Action::Shutdown),
        Rule::new(Init, ReadCode, SignalMatch::Any, Action::EnterCodeEntry),

        Rule::new(ReadCode, ReadCode, SignalMatch::DIGIT, Action::AppendDigit),
        Rule::new(ReadCode, Verify, SignalMatch::ASTERISK, Action::VerifyLogin),
        Rule::new(ReadCode, Init, SignalMatch::Any, Action::ResetSession),

        Rule::new(Verify, Active, SignalMatch::CORRECT, Action::AcceptLogin),
        Rule::new(Verify, ReadCode, SignalMatch::WRONG, Action::Noop),
        Rule::new(Verify, Init, SignalMatch::Any, Action::ResetSession),

        Rule::new(Active, ReadNewCode, SignalMatch::ASTERISK, Action::ResetSession),
        Rule::new(Active, Logout, SignalMatch::HASH, Action::Noop),
        Rule::new(Active, LedDuration, SignalMatch::LED_DIGIT, Action::RecordLedIndex),
        Rule::new(Active, LedSelect, SignalMatch::Any, Action::Noop),

        Rule::new(ReadNewCode, ReadNewCode, SignalMatch::DIGIT, Action::AppendDigit),
        Rule::new(ReadNewCode, Active, SignalMatch::ASTERISK, Action::ValidateAndStoreNewCode),
        Rule::new(ReadNewCode, Active, SignalMatch::Any, Action::ResetSession),

        Rule::new(LedSelect, LedDuration, SignalMatch::LED_DIGIT, Action::RecordLedIndex),
        Rule::new(LedSelect, Active, SignalMatch::Any, Action::ResetSession),

        Rule::new(LedDuration, LedDuration, SignalMatch::DIGIT, Action::AppendLedDuration),
        Rule::new(LedDuration, Active, SignalMatch::ASTERISK, Action::LightSelectedLed),
        Rule::new(LedDuration, Active, SignalMatch::Any, Action::ResetSession),

        Rule::new(Logout, Init, SignalMatch::HASH, Action::Logout),
        Rule::new(Logout, Active, SignalMatch::Any, Action::ResetSession),
    ]
}

/// The `Agent` trait is what the state machine drives: the source of its signals and the
/// performer of its actions.
pub trait Agent {
    type Error;

    /// Blocks until the next signal is available.
    fn next_signal(&mut self) -> Result<Signal, Self::Error>;

    /// Performs the action of the rule that fired on `signal`.
    ///
    /// Returns [ControlFlow::Break] to end the run.
    fn perform(&mut self, action: Action, signal: Signal) -> Result<ControlFlow<()>, Self::Error>;
}

#[derive(Debug)]
pub struct Fsm {
    state: State,
    rules: Vec<Rule>,
}

impl Fsm {
    pub fn new(rules: Vec<Rule>) -> Self {
        Fsm {
            state: State::default(),
            rules,
        }
    }

    pub fn with_state(mut self, state: State) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The first rule applying to `signal` in `state`, if any.
    pub fn find_rule(&self, state: State, signal: Signal) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.applies(state, signal))
    }

    /// Resolves the next state and the action to run.
    ///
    /// Without an applicable rule the machine stays where it is and does nothing.
    pub fn dispatch(&self, state: State, signal: Signal) -> (State, Action) {
        match self.find_rule(state, signal) {
            Some(rule) => (rule.to, rule.action),
            None => (state, Action::Noop),
        }
    }

    /// Reads one signal, transitions and performs the matching action.
    pub fn step<A: Agent>(&mut self, agent: &mut A) -> Result<ControlFlow<()>, A::Error> {
        let signal = agent.next_signal()?;
        trace!("Signal {:?} in {:?}.", signal, self.state);

        let (next, action) = self.dispatch(self.state, signal);
        if next != self.state {
            debug!("{:?} -> {:?} ({:?}).", self.state, next, action);
        }
        self.state = next;

        agent.perform(action, signal)
    }

    /// Runs the machine until an action ends it or fails.
    pub fn run<A: Agent>(&mut self, agent: &mut A) -> Result<(), A::Error> {
        info!("State machine running in {:?}.", self.state);
        while self.step(agent)?.is_continue() {}
        info!("State machine stopped in {:?}.", self.state);
        Ok(())
    }
}
