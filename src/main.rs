use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tandem::config::TandemConfig;
use tandem::error::TandemError;
use tandem::ratelimit::CompositeLimiter;

/// Drive a composite rate limiter and print when each operation is admitted.
#[derive(Debug, Parser)]
#[command(name = "tandem", version, about)]
struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Total acquisitions (overrides the configuration file)
    #[arg(short = 'n', long)]
    iterations: Option<usize>,

    /// Concurrent tasks sharing the acquisitions (overrides the configuration file)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .init();
    }

    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = match &args.config {
        Some(path) => TandemConfig::from_file(path)?,
        None => TandemConfig::default(),
    };
    if let Some(iterations) = args.iterations {
        config.demo.iterations = iterations;
    }
    if let Some(workers) = args.workers {
        config.demo.workers = workers;
    }
    let workers = config.demo.workers.max(1);

    for constraint in config.limiter.to_constraints() {
        info!(constraint = %constraint, "Configured constraint");
    }

    let limiter = Arc::new(CompositeLimiter::from_config(&config.limiter)?);
    let remaining = Arc::new(AtomicUsize::new(config.demo.iterations));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    info!(
        iterations = config.demo.iterations,
        workers = workers,
        "Starting acquisitions"
    );

    let tasks = (0..workers).map(|worker| {
        let limiter = Arc::clone(&limiter);
        let remaining = Arc::clone(&remaining);
        let mut shutdown = shutdown_rx.clone();

        tokio::spawn(async move {
            let mut admitted = 0usize;
            while take_one(&remaining) {
                let cancel = async {
                    let _ = shutdown.wait_for(|stop| *stop).await;
                };
                match limiter.acquire_or_cancel(cancel).await {
                    Ok(()) => {
                        admitted += 1;
                        println!(
                            "{} worker={} elapsed_ms={}",
                            chrono::Local::now().format("%H:%M:%S%.3f"),
                            worker,
                            limiter.elapsed().as_millis()
                        );
                    }
                    Err(TandemError::Cancelled) => break,
                    Err(e) => return Err(e),
                }
            }
            Ok(admitted)
        })
    });

    let mut total = 0;
    for result in futures::future::join_all(tasks).await {
        match result? {
            Ok(admitted) => total += admitted,
            Err(e) => warn!(error = %e, "Worker failed"),
        }
    }

    info!(
        admitted = total,
        elapsed_ms = limiter.elapsed().as_millis() as u64,
        "Finished"
    );
    Ok(())
}

/// Claim one acquisition from the shared budget.
fn take_one(remaining: &AtomicUsize) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, stopping");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping");
        }
    }
}
