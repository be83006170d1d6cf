//! smol backend.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::future::{Either, select};

use super::TimedOut;

pub(super) type ClockInstant = std::time::Instant;

/// Handle to a task spawned on smol's global executor.
///
/// smol cancels a task when its handle is dropped, so the handle has to be
/// kept for as long as the task should run.
pub struct JoinHandle<T>(smol::Task<T>);

impl<T> JoinHandle<T> {
    /// Cancellation happens when the handle is dropped.
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
    JoinHandle(smol::spawn(future))
}

/// Run blocking code on smol's thread pool.
pub fn spawn_blocking<F, T>(f: F) -> JoinHandle<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    spawn(smol::unblock(f))
}

pub async fn sleep(duration: Duration) {
    smol::Timer::after(duration).await;
}

pub async fn timeout<F: Future>(duration: Duration, future: F) -> Result<F::Output, TimedOut> {
    let future = std::pin::pin!(future);
    match select(future, smol::Timer::after(duration)).await {
        Either::Left((output, _)) => Ok(output),
        Either::Right(_) => Err(TimedOut),
    }
}
