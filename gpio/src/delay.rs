use std::fmt::Debug;
use std::thread;
use std::time::Duration;

/// A blocking delay provider.
///
/// Everything time-based in this crate (debouncing, keypad polling, LED animations) measures
/// time only by the delays it requests, so a fake implementation makes them instant in tests.
pub trait Delay: Debug {
    fn sleep(&self, duration: Duration);
}

/// Delays by sleeping the current thread.
#[derive(Copy, Clone, Debug, Default)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}
