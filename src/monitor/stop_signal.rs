//! Run state shared between the monitor loop and whoever stops it.

use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Running flag plus a condvar so a sleeping loop wakes as soon as it is stopped.
#[derive(Debug, Default)]
pub struct StopSignal {
    running: Mutex<bool>,
    changed: Condvar,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self) {
        *self.lock() = true;
        self.changed.notify_all();
    }

    /// Clear the running flag and wake any waiter.
    pub fn stop(&self) {
        *self.lock() = false;
        self.changed.notify_all();
    }

    pub fn is_running(&self) -> bool {
        *self.lock()
    }

    /// Sleep up to `timeout` while running. Returns whether still running.
    pub fn wait(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _timeout) = self
            .changed
            .wait_timeout_while(guard, timeout, |running| *running)
            .unwrap_or_else(|err| err.into_inner());
        *guard
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.running.lock().unwrap_or_else(|err| err.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn wait_times_out_while_running() {
        let signal = StopSignal::new();
        signal.start();
        assert!(signal.wait(Duration::from_millis(20)));
        assert!(signal.is_running());
    }

    #[test]
    fn stop_wakes_a_waiter_early() {
        let signal = Arc::new(StopSignal::new());
        signal.start();
        let stopper = Arc::clone(&signal);
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            stopper.stop();
        });
        let started = Instant::now();
        assert!(!signal.wait(Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(10));
        handle.join().unwrap();
    }

    #[test]
    fn wait_returns_immediately_when_stopped() {
        let signal = StopSignal::new();
        let started = Instant::now();
        assert!(!signal.wait(Duration::from_secs(30)));
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
