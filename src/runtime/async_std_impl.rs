//! async-std backend.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use super::TimedOut;

pub(super) type ClockInstant = std::time::Instant;

/// Handle to a task spawned on async-std.
pub struct JoinHandle<T>(async_std::task::JoinHandle<T>);

impl<T> JoinHandle<T> {
    /// async-std can only cancel asynchronously, so this does nothing; the
    /// sync loop also exits on its stop signal.
    pub fn abort(&self) {}
}

impl<T> Future for JoinHandle<T> {
    type Output = T;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        Pin::new(&mut self.0).poll(cx)
    }
}

pub fn spawn<F>(future: F) -> JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    JoinHandle(async_std::task::spawn(future))
}

pub fn spawn_blocking<F, T>(f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    JoinHandle(async_std::task::spawn_blocking(f))
}

pub async fn sleep(duration: Duration) {
    async_std::task::sleep(duration).await
}

pub async fn timeout<F: Future>(duration: Duration, future: F) -> Result<F::Output, TimedOut> {
    async_std::future::timeout(duration, future)
        .await
        .map_err(|_| TimedOut)
}
