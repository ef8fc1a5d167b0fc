use super::*;
use std::cell::{Cell, RefCell};

/// Anode and cathode pin of each LED as soldered on the board.
const WIRING: [(usize, usize); LED_COUNT] = [(0, 1), (1, 0), (1, 2), (2, 1), (0, 2), (2, 0)];

/// LEDs with current flowing through them for the given pin configuration.
fn conducting(states: &[PinState; 3]) -> Vec<usize> {
    WIRING
        .iter()
        .enumerate()
        .filter(|&(_, &(anode, cathode))| {
            states[anode] == PinState::High && states[cathode] == PinState::Low
        })
        .map(|(led, _)| led)
        .collect()
}

#[derive(Debug, Default)]
struct RecordingPins {
    history: RefCell<Vec<[PinState; 3]>>,
    fail: Cell<bool>,
}

impl RecordingPins {
    fn last(&self) -> [PinState; 3] {
        *self.history.borrow().last().unwrap()
    }

    /// The LED lit by each configuration, `None` for dark ones.
    fn lit_sequence(&self) -> Vec<Option<usize>> {
        self.history
            .borrow()
            .iter()
            .map(|states| conducting(states).first().copied())
            .collect()
    }
}

impl GpioBusTristate<3> for RecordingPins {
    fn set(&self, states: &[PinState; 3]) -> GpioResult<()> {
        if self.fail.get() {
            return Err(GpioError::Io(std::io::ErrorKind::PermissionDenied));
        }
        self.history.borrow_mut().push(*states);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct RecordingDelay {
    total: Cell<Duration>,
}

impl Delay for RecordingDelay {
    fn sleep(&self, duration: Duration) {
        self.total.set(self.total.get() + duration);
    }
}

#[test]
fn board_starts_dark() {
    let pins = RecordingPins::default();
    let delay = RecordingDelay::default();
    let board = Charlieplex::new(&pins, &delay).unwrap();

    assert_eq!(pins.last(), DARK_PIN_STATES);
    assert_eq!(board.lit(), None);
}

#[test]
fn each_led_lights_alone() {
    let pins = RecordingPins::default();
    let delay = RecordingDelay::default();
    let mut board = Charlieplex::new(&pins, &delay).unwrap();

    for led in ALL_LEDS {
        board.light_only(Some(led)).unwrap();
        assert_eq!(conducting(&pins.last()), vec![led], "LED {}", led);
        assert_eq!(pins.last().iter().filter(|&&s| s == PinState::Floating).count(), 1);
        assert_eq!(board.lit(), Some(led));
    }
}

#[test]
fn no_led_leaves_everything_floating() {
    let pins = RecordingPins::default();
    let delay = RecordingDelay::default();
    let mut board = Charlieplex::new(&pins, &delay).unwrap();

    board.light_only(Some(3)).unwrap();
    board.light_only(None).unwrap();

    assert_eq!(pins.last(), [PinState::Floating; 3]);
    assert!(conducting(&pins.last()).is_empty());
}

#[test]
fn missing_led_is_rejected() {
    let pins = RecordingPins::default();
    let delay = RecordingDelay::default();
    let mut board = Charlieplex::new(&pins, &delay).unwrap();
    let writes = pins.history.borrow().len();

    assert_eq!(board.light_only(Some(6)), Err(GpioError::InvalidArgument));
    assert_eq!(pins.history.borrow().len(), writes);
}

#[test]
fn pin_faults_propagate() {
    let pins = RecordingPins::default();
    let delay = RecordingDelay::default();
    let mut board = Charlieplex::new(&pins, &delay).unwrap();
    pins.fail.set(true);

    assert!(board.power_up().is_err());
}

#[test]
fn light_for_holds_then_goes_dark() {
    let pins = RecordingPins::default();
    let delay = RecordingDelay::default();
    let mut board = Charlieplex::new(&pins, &delay).unwrap();

    board.light_for(3, Duration::from_secs(5)).unwrap();

    assert_eq!(pins.lit_sequence(), vec![None, Some(3), None]);
    assert_eq!(delay.total.get(), Duration::from_secs(5));
}

#[test]
fn flash_alternates_lit_and_dark_phases() {
    let pins = RecordingPins::default();
    let delay = RecordingDelay::default();
    let timing = AnimationTiming {
        dwell: Duration::from_millis(10),
        flash_period: Duration::from_millis(20),
        ..AnimationTiming::default()
    };
    let mut board = Charlieplex::new(&pins, &delay).unwrap().with_timing(timing);

    board.flash(&[1, 4], Duration::from_millis(80)).unwrap();

    // 0-20 ms lit (1, 4), 20-40 ms dark, 40-60 ms lit, 60-80 ms dark, then dark at the end.
    assert_eq!(
        pins.lit_sequence()[1..],
        [Some(1), Some(4), None, None, Some(1), Some(4), None, None, None],
    );
    assert_eq!(delay.total.get(), Duration::from_millis(80));
}

#[test]
fn flash_with_nothing_enabled_stays_dark() {
    let pins = RecordingPins::default();
    let delay = RecordingDelay::default();
    let mut board = Charlieplex::new(&pins, &delay).unwrap();

    board.flash(&[], Duration::from_millis(50)).unwrap();

    assert!(pins.lit_sequence().iter().all(Option::is_none));
    assert!(delay.total.get() >= Duration::from_millis(50));
}

#[test]
fn animations_run_for_the_requested_time() {
    let pins = RecordingPins::default();
    let delay = RecordingDelay::default();
    let mut board = Charlieplex::new(&pins, &delay).unwrap();
    let dwell = board.timing().dwell;

    board.twinkle(Duration::from_secs(1), true).unwrap();

    let total = delay.total.get();
    assert!(total >= Duration::from_secs(1));
    assert!(total < Duration::from_secs(1) + 2 * dwell);
    assert_eq!(pins.last(), DARK_PIN_STATES);
}

fn distinct_groups(sequence: &[Option<usize>]) -> Vec<[usize; 2]> {
    let mut groups: Vec<[usize; 2]> = Vec::new();
    for pair in sequence.chunks(2) {
        if let [Some(a), Some(b)] = *pair {
            if groups.last() != Some(&[a, b]) {
                groups.push([a, b]);
            }
        }
    }
    groups
}

#[test]
fn twinkle_outward_walks_the_groups_in_order() {
    let pins = RecordingPins::default();
    let delay = RecordingDelay::default();
    let timing = AnimationTiming {
        dwell: Duration::from_millis(10),
        flash_period: Duration::from_millis(20),
        ..AnimationTiming::default()
    };
    let mut board = Charlieplex::new(&pins, &delay).unwrap().with_timing(timing);

    board.twinkle(Duration::from_millis(60), true).unwrap();

    let sequence = pins.lit_sequence();
    assert_eq!(
        distinct_groups(&sequence[1..sequence.len() - 1]),
        vec![[0, 1], [4, 5], [2, 3]],
    );
}

#[test]
fn twinkle_inward_walks_the_groups_backwards() {
    let pins = RecordingPins::default();
    let delay = RecordingDelay::default();
    let timing = AnimationTiming {
        dwell: Duration::from_millis(10),
        flash_period: Duration::from_millis(20),
        ..AnimationTiming::default()
    };
    let mut board = Charlieplex::new(&pins, &delay).unwrap().with_timing(timing);

    board.twinkle(Duration::from_millis(60), false).unwrap();

    let sequence = pins.lit_sequence();
    assert_eq!(
        distinct_groups(&sequence[1..sequence.len() - 1]),
        vec![[2, 3], [4, 5], [0, 1]],
    );
}

#[test]
fn power_animations_use_configured_durations() {
    let pins = RecordingPins::default();
    let delay = RecordingDelay::default();
    let timing = AnimationTiming {
        power_up: Duration::from_millis(300),
        power_down: Duration::from_millis(600),
        ..AnimationTiming::default()
    };
    let mut board = Charlieplex::new(&pins, &delay).unwrap().with_timing(timing);

    board.power_up().unwrap();
    let up = delay.total.get();
    board.power_down().unwrap();
    let down = delay.total.get() - up;

    assert!(up >= Duration::from_millis(300) && up < Duration::from_millis(310));
    assert!(down >= Duration::from_millis(600) && down < Duration::from_millis(610));
}

#[test]
fn correct_and_wrong_are_distinguishable() {
    let timing = AnimationTiming::default();

    let correct_pins = RecordingPins::default();
    let correct_delay = RecordingDelay::default();
    let mut board = Charlieplex::new(&correct_pins, &correct_delay).unwrap();
    board.correct().unwrap();

    let wrong_pins = RecordingPins::default();
    let wrong_delay = RecordingDelay::default();
    let mut board = Charlieplex::new(&wrong_pins, &wrong_delay).unwrap();
    board.wrong().unwrap();

    let correct_sequence = correct_pins.lit_sequence();
    let wrong_sequence = wrong_pins.lit_sequence();

    // The sweep never goes dark in the middle; the flash does.
    let inner = &correct_sequence[1..correct_sequence.len() - 1];
    assert!(inner.iter().all(Option::is_some));
    assert!(wrong_sequence[1..wrong_sequence.len() - 1].iter().any(Option::is_none));

    assert_eq!(
        distinct_groups(inner),
        vec![[0, 1], [2, 3], [4, 5]],
    );
    assert!(correct_delay.total.get() >= 3 * timing.correct_step);
    assert!(wrong_delay.total.get() >= timing.wrong);
    assert_ne!(
        correct_delay.total.get().as_millis() / 100,
        wrong_delay.total.get().as_millis() / 100,
    );
}

#[test]
fn wrong_lights_every_led() {
    let pins = RecordingPins::default();
    let delay = RecordingDelay::default();
    let mut board = Charlieplex::new(&pins, &delay).unwrap();

    board.wrong().unwrap();

    let mut lit: Vec<usize> = pins.lit_sequence().into_iter().flatten().collect();
    lit.sort_unstable();
    lit.dedup();
    assert_eq!(lit, ALL_LEDS.to_vec());
    assert_eq!(pins.last(), DARK_PIN_STATES);
}
