//! Construction validation, zero-limit windows, cancellation and blocking callers.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tandem::error::TandemError;
use tandem::ratelimit::{Acquire, CompositeLimiter, Constraint, LimiterConfig, Reservation};
use tokio::time::{timeout, Instant};

#[test]
fn test_empty_constraint_list_fails() {
    let err = CompositeLimiter::new(Vec::<Constraint>::new()).unwrap_err();
    assert!(matches!(err, TandemError::InvalidConfiguration(_)));
    assert!(err.to_string().contains("No constraints"));
}

#[test]
fn test_negative_limit_from_config_fails() {
    let config = LimiterConfig::from_yaml(
        r#"
constraints:
  - interval_ms: 1000
    limit: 2
  - interval_ms: 5000
    limit: -5
"#,
    )
    .unwrap();

    let err = CompositeLimiter::from_config(&config).unwrap_err();
    assert!(matches!(err, TandemError::InvalidConfiguration(_)));
}

#[tokio::test(start_paused = true)]
async fn test_zero_limit_never_admits() {
    let limiter = CompositeLimiter::new([Constraint::per_secs(1, 0)]).unwrap();

    let result = timeout(Duration::from_secs(3600), limiter.acquire()).await;
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_zero_limit_alongside_other_windows_never_admits() {
    let limiter =
        CompositeLimiter::new([Constraint::per_secs(1, 100), Constraint::per_secs(60, 0)]).unwrap();

    assert_eq!(limiter.reserve(), Reservation::Never);
    let result = timeout(Duration::from_secs(120), limiter.acquire()).await;
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_wait_keeps_its_slot() {
    let limiter = CompositeLimiter::new([Constraint::per_secs(1, 1)]).unwrap();
    limiter.acquire().await;

    // Scheduled for t=1000, abandoned at t=10.
    let abandoned = timeout(Duration::from_millis(10), limiter.acquire()).await;
    assert!(abandoned.is_err());

    // The next caller queues behind the abandoned slot rather than taking it.
    let start = Instant::now();
    limiter.acquire().await;
    assert_eq!(start.elapsed(), Duration::from_millis(1990));
}

#[tokio::test(start_paused = true)]
async fn test_acquire_or_cancel_with_signal() {
    let limiter = CompositeLimiter::new([Constraint::per_secs(60, 1)]).unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    limiter.acquire().await;

    let waiter = limiter.acquire_or_cancel(async {
        let _ = rx.await;
    });
    let trigger = async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let _ = tx.send(());
    };

    let (result, ()) = tokio::join!(waiter, trigger);
    assert!(matches!(result, Err(TandemError::Cancelled)));
}

#[tokio::test(start_paused = true)]
async fn test_acquire_trait_object() {
    let limiter: Arc<dyn Acquire> =
        Arc::new(CompositeLimiter::new([Constraint::per_secs(1, 2)]).unwrap());
    let start = Instant::now();

    for _ in 0..3 {
        limiter.acquire().await;
    }
    assert_eq!(start.elapsed(), Duration::from_secs(1));
}

#[test]
fn test_blocking_threads_respect_window() {
    let constraint = Constraint::new(Duration::from_millis(100), 2);
    let limiter = Arc::new(CompositeLimiter::new([constraint]).unwrap());

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            thread::spawn(move || {
                limiter.acquire_blocking();
                limiter.elapsed()
            })
        })
        .collect();

    let mut times: Vec<Duration> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    times.sort();

    // Six threads through a 2-per-100ms window need at least two full windows.
    assert!(times[5] >= Duration::from_millis(200));
    assert!(times[2] >= Duration::from_millis(99));
}
