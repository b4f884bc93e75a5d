//! Press-and-hold repeat timer.
//!
//! Models the hold-to-repeat behavior of the increment/decrement controls as
//! an explicit cancellable task handle: one immediate fire is the caller's
//! responsibility, then after an initial delay the action repeats at a fixed
//! rate until stopped. Starting always cancels any previous run first, so a
//! handle can never double-fire or leak a pending repeat.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub const HOLD_INITIAL_DELAY: Duration = Duration::from_millis(300);
pub const HOLD_REPEAT_RATE: Duration = Duration::from_millis(100);

/// Granularity of the cancellation check while sleeping.
const POLL_STEP: Duration = Duration::from_millis(10);

pub struct RepeatTimer {
    active: Option<ActiveRepeat>,
}

struct ActiveRepeat {
    cancel: Arc<AtomicBool>,
    thread: thread::JoinHandle<()>,
}

impl RepeatTimer {
    pub fn new() -> Self {
        Self { active: None }
    }

    /// Begin repeating `action`: first fire after `initial_delay`, then every
    /// `repeat_every` until [`stop`](Self::stop) is called. Any run already
    /// in progress is cancelled first.
    pub fn start<F>(&mut self, initial_delay: Duration, repeat_every: Duration, mut action: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.stop();

        let cancel = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancel);
        let thread = thread::spawn(move || {
            if sleep_cancellable(&flag, initial_delay) {
                return;
            }
            loop {
                action();
                if sleep_cancellable(&flag, repeat_every) {
                    return;
                }
            }
        });

        self.active = Some(ActiveRepeat { cancel, thread });
    }

    /// Cancel the pending repeat, waiting for the worker to wind down. Safe
    /// to call at any time, including when nothing is running.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.store(true, Ordering::SeqCst);
            let _ = active.thread.join();
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }
}

impl Default for RepeatTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RepeatTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleep for `duration` in short steps; returns true if cancelled meanwhile.
fn sleep_cancellable(cancel: &AtomicBool, duration: Duration) -> bool {
    let mut remaining = duration;
    while !remaining.is_zero() {
        if cancel.load(Ordering::SeqCst) {
            return true;
        }
        let step = remaining.min(POLL_STEP);
        thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
    cancel.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn fires_repeatedly_after_initial_delay() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        let mut timer = RepeatTimer::new();
        timer.start(
            Duration::from_millis(20),
            Duration::from_millis(20),
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        thread::sleep(Duration::from_millis(150));
        timer.stop();

        let fired = count.load(Ordering::SeqCst);
        assert!(fired >= 2, "expected repeated fires, got {fired}");
    }

    #[test]
    fn stop_before_initial_delay_means_no_fire() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);

        let mut timer = RepeatTimer::new();
        timer.start(Duration::from_millis(200), HOLD_REPEAT_RATE, move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        thread::sleep(Duration::from_millis(30));
        timer.stop();

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert!(!timer.is_running());
    }

    #[test]
    fn restart_cancels_the_previous_run() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let mut timer = RepeatTimer::new();
        let counter = Arc::clone(&first);
        timer.start(Duration::from_millis(10), Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        thread::sleep(Duration::from_millis(40));

        let counter = Arc::clone(&second);
        timer.start(Duration::from_millis(10), Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let first_after_restart = first.load(Ordering::SeqCst);
        thread::sleep(Duration::from_millis(60));
        timer.stop();

        // The first action must not have fired again once replaced.
        assert_eq!(first.load(Ordering::SeqCst), first_after_restart);
        assert!(second.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut timer = RepeatTimer::new();
        timer.stop();
        timer.start(Duration::from_millis(5), Duration::from_millis(5), || {});
        timer.stop();
        timer.stop();
        assert!(!timer.is_running());
    }
}
