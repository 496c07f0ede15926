//! Composite rate limiter.

use parking_lot::Mutex;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::clock::{Clock, MonotonicClock};
use super::rules::{Constraint, LimiterConfig};
use super::window::WindowGate;
use crate::error::{Result, TandemError};

/// Outcome of recording one admission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reservation {
    /// Every window has room; proceed immediately
    Ready,
    /// Proceed once this much time has passed
    Delay(Duration),
    /// A zero-limit window will never admit
    Never,
}

impl Reservation {
    /// The delay before admission, or `None` if admission never happens.
    pub fn delay(&self) -> Option<Duration> {
        match self {
            Reservation::Ready => Some(Duration::ZERO),
            Reservation::Delay(d) => Some(*d),
            Reservation::Never => None,
        }
    }
}

/// Mutable state guarded by the limiter's lock.
#[derive(Debug)]
struct LimiterState {
    gates: Vec<WindowGate>,
    /// Latest elapsed time observed under the lock
    last_elapsed: Duration,
}

/// Gates callers so that every configured window admits them.
///
/// Each call to [`acquire`](Self::acquire) reads the clock once, asks every
/// window how long the caller must wait and suspends for the longest of those
/// waits. Only the read-and-record step holds the lock; the wait happens
/// outside it, so concurrent callers are charged staggered delays instead of
/// queueing behind the longest sleeper.
///
/// ```rust,no_run
/// # use tandem::ratelimit::{CompositeLimiter, Constraint};
/// # async fn run() -> tandem::error::Result<()> {
/// // At most 2 per second and 5 per 5 seconds.
/// let limiter = CompositeLimiter::new([
///     Constraint::per_secs(1, 2),
///     Constraint::per_secs(5, 5),
/// ])?;
///
/// for _ in 0..10 {
///     limiter.acquire().await;
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CompositeLimiter<C: Clock = MonotonicClock> {
    constraints: Vec<Constraint>,
    state: Mutex<LimiterState>,
    clock: C,
    start: Instant,
}

impl CompositeLimiter<MonotonicClock> {
    /// Create a limiter on the monotonic clock.
    ///
    /// Fails with [`TandemError::InvalidConfiguration`] if `constraints` is
    /// empty or any limit is negative.
    pub fn new<I>(constraints: I) -> Result<Self>
    where
        I: IntoIterator<Item = Constraint>,
    {
        Self::with_clock(constraints, MonotonicClock::new())
    }

    /// Create a limiter from a parsed configuration.
    pub fn from_config(config: &LimiterConfig) -> Result<Self> {
        Self::new(config.to_constraints())
    }
}

impl<C: Clock> CompositeLimiter<C> {
    /// Create a limiter reading time from `clock`.
    pub fn with_clock<I>(constraints: I, clock: C) -> Result<Self>
    where
        I: IntoIterator<Item = Constraint>,
    {
        let constraints: Vec<Constraint> = constraints.into_iter().collect();
        let gates = build_gates(&constraints)?;

        info!(
            constraints = constraints.len(),
            "Composite rate limiter initialized"
        );

        let start = clock.now();
        Ok(Self {
            constraints,
            state: Mutex::new(LimiterState {
                gates,
                last_elapsed: Duration::ZERO,
            }),
            clock,
            start,
        })
    }

    /// The configured constraints, in construction order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Time elapsed since the limiter was created.
    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.start)
    }

    /// Record one admission and report how long the caller must wait.
    ///
    /// This is the critical section: the clock is read once under the lock,
    /// every window computes its wait against that instant, and every window
    /// records the shared admission instant `now + max(wait)`. The slot stays
    /// consumed even if the caller never waits it out.
    pub fn reserve(&self) -> Reservation {
        let mut state = self.state.lock();

        let elapsed = self.elapsed().max(state.last_elapsed);
        state.last_elapsed = elapsed;
        // Round up so a recorded admission is never earlier than the real one.
        let now_ms = i64::try_from(ceil_millis(elapsed)).unwrap_or(i64::MAX);

        let mut wait_ms = 0u64;
        for gate in &state.gates {
            match gate.required_wait(now_ms) {
                Some(wait) => wait_ms = wait_ms.max(wait),
                None => {
                    trace!(now_ms = now_ms, "Zero-limit window refuses admission");
                    return Reservation::Never;
                }
            }
        }

        let admitted_at = now_ms.saturating_add(i64::try_from(wait_ms).unwrap_or(i64::MAX));
        for gate in state.gates.iter_mut() {
            gate.record(admitted_at);
        }

        trace!(now_ms = now_ms, wait_ms = wait_ms, "Admission recorded");

        if wait_ms == 0 {
            Reservation::Ready
        } else {
            debug!(now_ms = now_ms, wait_ms = wait_ms, "Admission delayed");
            Reservation::Delay(Duration::from_millis(admitted_at as u64).saturating_sub(elapsed))
        }
    }

    /// Wait until every window admits the caller.
    ///
    /// Dropping the returned future abandons the wait; the admission it
    /// recorded is not rolled back. A limiter with a zero-limit window never
    /// completes this future.
    pub async fn acquire(&self) {
        match self.reserve() {
            Reservation::Ready => {}
            Reservation::Delay(delay) => tokio::time::sleep(delay).await,
            Reservation::Never => std::future::pending::<()>().await,
        }
    }

    /// Like [`acquire`](Self::acquire), but gives up when `cancel` resolves.
    ///
    /// Returns [`TandemError::Cancelled`] if the signal fires first.
    pub async fn acquire_or_cancel<F>(&self, cancel: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            _ = self.acquire() => Ok(()),
            _ = cancel => {
                debug!("Acquisition cancelled before admission");
                Err(TandemError::Cancelled)
            }
        }
    }

    /// Blocking variant of [`acquire`](Self::acquire) for plain threads.
    ///
    /// Must not be called from inside an async runtime worker.
    pub fn acquire_blocking(&self) {
        match self.reserve() {
            Reservation::Ready => {}
            Reservation::Delay(delay) => std::thread::sleep(delay),
            Reservation::Never => loop {
                std::thread::park();
            },
        }
    }
}

fn ceil_millis(elapsed: Duration) -> u128 {
    let millis = elapsed.as_millis();
    if elapsed.subsec_nanos() % 1_000_000 == 0 {
        millis
    } else {
        millis + 1
    }
}

fn build_gates(constraints: &[Constraint]) -> Result<Vec<WindowGate>> {
    if constraints.is_empty() {
        return Err(TandemError::InvalidConfiguration(
            "No constraints configured".to_string(),
        ));
    }

    constraints
        .iter()
        .map(|constraint| {
            let limit = usize::try_from(constraint.limit).map_err(|_| {
                TandemError::InvalidConfiguration(format!(
                    "Limit for interval {:?} is negative: {}",
                    constraint.interval, constraint.limit
                ))
            })?;
            if limit == 0 {
                warn!(
                    interval_ms = constraint.interval.as_millis() as u64,
                    "Constraint with zero limit will never admit"
                );
            }
            Ok(WindowGate::new(constraint.interval, limit))
        })
        .collect()
}
