//! Sleep abstraction for retry delays and inter-chapter pacing.
//!
//! Production code sleeps the thread; tests inject [RecordingSleep] so no real
//! wall-clock time passes.

use std::cell::RefCell;
use std::time::Duration;

/// Something that can block for a duration.
pub trait Sleep {
    fn sleep(&self, duration: Duration);
}

/// Sleeps the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Records requested sleeps without blocking.
#[derive(Debug, Default)]
pub struct RecordingSleep {
    calls: RefCell<Vec<Duration>>,
}

impl RecordingSleep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Durations requested so far, in call order.
    pub fn calls(&self) -> Vec<Duration> {
        self.calls.borrow().clone()
    }

    pub fn total(&self) -> Duration {
        self.calls.borrow().iter().sum()
    }
}

impl Sleep for RecordingSleep {
    fn sleep(&self, duration: Duration) {
        self.calls.borrow_mut().push(duration);
    }
}

impl<S: Sleep + ?Sized> Sleep for &S {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

impl<S: Sleep + ?Sized> Sleep for std::rc::Rc<S> {
    fn sleep(&self, duration: Duration) {
        (**self).sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn recording_sleep_keeps_call_order() {
        let s = RecordingSleep::new();
        s.sleep(Duration::from_millis(2000));
        s.sleep(Duration::from_millis(500));
        assert_eq!(
            s.calls(),
            vec![Duration::from_millis(2000), Duration::from_millis(500)]
        );
        assert_eq!(s.total(), Duration::from_millis(2500));
    }

    #[test]
    fn shared_recording_sleep_sees_calls_through_rc() {
        let s = Rc::new(RecordingSleep::new());
        let boxed: Box<dyn Sleep> = Box::new(Rc::clone(&s));
        boxed.sleep(Duration::from_secs(1));
        assert_eq!(s.calls(), vec![Duration::from_secs(1)]);
    }

    #[test]
    fn thread_sleep_zero_returns_immediately() {
        ThreadSleep.sleep(Duration::ZERO);
    }
}
