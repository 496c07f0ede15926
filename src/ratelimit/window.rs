//! Single-window gate.
//!
//! A [`WindowGate`] remembers the admission instants of the last `limit`
//! operations in a fixed ring. The slot the cursor points at is always the
//! oldest one, so the next admission may not happen earlier than
//! `oldest + interval`.

use std::time::Duration;

/// Tracks the last `limit` admissions for one `(interval, limit)` rule.
///
/// Timestamps are elapsed milliseconds since the owning limiter was created.
/// An empty slot (`None`) stands for "infinitely in the past", which is why
/// the first `limit` admissions never wait.
#[derive(Debug, Clone)]
pub struct WindowGate {
    /// Window length in whole milliseconds
    interval_ms: i64,
    /// Ring of admission instants, oldest at `cursor`
    slots: Box<[Option<i64>]>,
    /// Next slot to overwrite
    cursor: usize,
}

impl WindowGate {
    /// Create a gate admitting at most `limit` operations per `interval`.
    ///
    /// The interval is truncated to whole milliseconds.
    pub fn new(interval: Duration, limit: usize) -> Self {
        let interval_ms = i64::try_from(interval.as_millis()).unwrap_or(i64::MAX);
        Self {
            interval_ms,
            slots: vec![None; limit].into_boxed_slice(),
            cursor: 0,
        }
    }

    /// Window length.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms as u64)
    }

    /// Admissions allowed per window.
    pub fn limit(&self) -> usize {
        self.slots.len()
    }

    /// Milliseconds a new operation arriving at `now_ms` must wait.
    ///
    /// Returns `None` when the gate can never admit (a limit of zero).
    pub fn required_wait(&self, now_ms: i64) -> Option<u64> {
        let oldest = self.slots.get(self.cursor)?;
        let wait = match *oldest {
            None => 0,
            Some(oldest) => oldest
                .saturating_add(self.interval_ms)
                .saturating_sub(now_ms)
                .max(0),
        };
        Some(wait as u64)
    }

    /// Record an admission at `at_ms`, evicting the oldest slot.
    ///
    /// A zero-limit gate has nothing to record.
    pub fn record(&mut self, at_ms: i64) {
        let len = self.slots.len();
        if len == 0 {
            return;
        }
        self.slots[self.cursor] = Some(at_ms);
        self.cursor = (self.cursor + 1) % len;
    }

    /// Single-gate round: wait for `now_ms`, recorded at `now_ms + wait`.
    #[cfg(test)]
    pub(crate) fn wait_and_record(&mut self, now_ms: i64) -> Option<u64> {
        let wait = self.required_wait(now_ms)?;
        self.record(now_ms.saturating_add(wait as i64));
        Some(wait)
    }

    /// Recorded admissions inside the window ending at `now_ms`, including
    /// ones scheduled after it.
    #[cfg(test)]
    pub(crate) fn admitted_within(&self, now_ms: i64) -> usize {
        let window_start = now_ms.saturating_sub(self.interval_ms);
        self.slots
            .iter()
            .flatten()
            .filter(|&&at| at > window_start)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_limit_admissions_are_free() {
        let mut gate = WindowGate::new(Duration::from_secs(1), 3);

        for _ in 0..3 {
            assert_eq!(gate.wait_and_record(0), Some(0));
        }
        assert_eq!(gate.wait_and_record(0), Some(1000));
    }

    #[test]
    fn test_wait_shrinks_as_time_passes() {
        let mut gate = WindowGate::new(Duration::from_secs(1), 1);

        assert_eq!(gate.wait_and_record(100), Some(0));
        assert_eq!(gate.required_wait(100), Some(1000));
        assert_eq!(gate.required_wait(700), Some(400));
        assert_eq!(gate.required_wait(1100), Some(0));
        assert_eq!(gate.required_wait(5000), Some(0));
    }

    #[test]
    fn test_delayed_admissions_are_staggered() {
        let mut gate = WindowGate::new(Duration::from_secs(1), 2);

        let waits: Vec<_> = (0..6).map(|_| gate.wait_and_record(0)).collect();
        assert_eq!(
            waits,
            vec![Some(0), Some(0), Some(1000), Some(1000), Some(2000), Some(2000)]
        );
    }

    #[test]
    fn test_required_wait_does_not_record() {
        let gate = WindowGate::new(Duration::from_secs(1), 1);

        assert_eq!(gate.required_wait(0), Some(0));
        assert_eq!(gate.required_wait(0), Some(0));
        assert_eq!(gate.admitted_within(0), 0);
    }

    #[test]
    fn test_zero_limit_never_admits() {
        let mut gate = WindowGate::new(Duration::from_secs(1), 0);

        assert_eq!(gate.limit(), 0);
        assert_eq!(gate.required_wait(0), None);
        assert_eq!(gate.wait_and_record(10_000), None);
        gate.record(5);
        assert_eq!(gate.admitted_within(5), 0);
    }

    #[test]
    fn test_interval_truncated_to_millis() {
        let gate = WindowGate::new(Duration::from_micros(1_999), 1);
        assert_eq!(gate.interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_admitted_within_window() {
        let mut gate = WindowGate::new(Duration::from_millis(500), 4);
        gate.record(0);
        gate.record(200);
        gate.record(450);

        assert_eq!(gate.admitted_within(450), 3);
        assert_eq!(gate.admitted_within(600), 2);
        assert_eq!(gate.admitted_within(1000), 0);
    }

    #[test]
    fn test_huge_interval_does_not_overflow() {
        let mut gate = WindowGate::new(Duration::MAX, 1);
        assert_eq!(gate.wait_and_record(0), Some(0));
        assert_eq!(gate.required_wait(1), Some(i64::MAX as u64 - 1));
    }
}
