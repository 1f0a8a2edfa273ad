//! Predicate-polling primitives for eventually-consistent UIs
//!
//! Virtualized tree widgets re-render in asynchronous batches: a click takes
//! effect "soon", a scroll extends the scrollable area "eventually". Rather
//! than scattering ad hoc sleeps through the controller, every such wait goes
//! through one of the two primitives here. Both are deadline-bounded and never
//! fail; a timeout is reported as `false` and left to the caller's next rescan.

use std::thread;
use std::time::{Duration, Instant};

/// Poll `predicate` at `poll_interval` until it returns true or `max_wait`
/// elapses. Returns `false` on timeout, never panics or errors.
pub fn wait_for_condition<F>(mut predicate: F, max_wait: Duration, poll_interval: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + max_wait;

    loop {
        if predicate() {
            return true;
        }

        let now = Instant::now();
        if now >= deadline {
            return false;
        }

        thread::sleep(poll_interval.min(deadline - now));
    }
}

/// Sample a numeric `measure` at `poll_interval` and return `true` once
/// `required_stable_checks` consecutive samples come back unchanged.
///
/// This absorbs batched re-renders: a virtualized list grows its scrollable
/// extent in several steps after a scroll, and reading the row set between
/// steps would observe a half-updated view. Returns `false` if the measure
/// never settles within `max_wait`.
pub fn wait_for_stable<F>(
    mut measure: F,
    max_wait: Duration,
    poll_interval: Duration,
    required_stable_checks: u32,
) -> bool
where
    F: FnMut() -> f64,
{
    let deadline = Instant::now() + max_wait;
    let mut last = measure();
    let mut stable_checks = 0u32;

    loop {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }

        thread::sleep(poll_interval.min(deadline - now));

        let current = measure();
        if (current - last).abs() < f64::EPSILON {
            stable_checks += 1;
            if stable_checks >= required_stable_checks {
                return true;
            }
        } else {
            stable_checks = 0;
            last = current;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLL: Duration = Duration::from_millis(1);

    #[test]
    fn test_condition_already_true() {
        let result = wait_for_condition(|| true, Duration::from_millis(50), POLL);
        assert!(result);
    }

    #[test]
    fn test_condition_never_true_times_out() {
        let started = Instant::now();
        let result = wait_for_condition(|| false, Duration::from_millis(20), POLL);
        assert!(!result);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_condition_becomes_true_after_polls() {
        let mut calls = 0;
        let result = wait_for_condition(
            || {
                calls += 1;
                calls >= 3
            },
            Duration::from_millis(200),
            POLL,
        );
        assert!(result);
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_stable_constant_measure() {
        let result = wait_for_stable(|| 480.0, Duration::from_millis(100), POLL, 3);
        assert!(result);
    }

    #[test]
    fn test_stable_growing_measure_times_out() {
        let mut height = 0.0;
        let result = wait_for_stable(
            || {
                height += 24.0;
                height
            },
            Duration::from_millis(20),
            POLL,
            3,
        );
        assert!(!result);
    }

    #[test]
    fn test_stable_settles_after_growth() {
        let mut samples = vec![96.0, 96.0, 96.0, 72.0, 48.0, 24.0];
        let result = wait_for_stable(
            move || samples.pop().unwrap_or(96.0),
            Duration::from_millis(200),
            POLL,
            2,
        );
        assert!(result);
    }
}
