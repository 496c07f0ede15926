//! Admission trait for abstracting over limiter instances.

use async_trait::async_trait;
use std::sync::Arc;

use super::clock::Clock;
use super::limiter::CompositeLimiter;

/// Something callers can wait on before performing an operation.
///
/// Drivers take `impl Acquire` so they work with a bare limiter, a shared
/// `Arc` of one, or a test double.
#[async_trait]
pub trait Acquire: Send + Sync {
    /// Suspend until the operation is admitted.
    async fn acquire(&self);
}

#[async_trait]
impl<C: Clock + 'static> Acquire for CompositeLimiter<C> {
    async fn acquire(&self) {
        CompositeLimiter::acquire(self).await
    }
}

#[async_trait]
impl<T: Acquire + ?Sized> Acquire for Arc<T> {
    async fn acquire(&self) {
        (**self).acquire().await
    }
}
