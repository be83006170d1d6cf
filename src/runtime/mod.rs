//! Executor facade.
//!
//! The cache, the sync loops and the variation fan-out need very little from
//! the executor: sleeping, bounding a future by a timeout, spawning a
//! background task, moving blocking file IO off the executor, a monotonic
//! clock and an async mutex. Exactly one backend
//! provides them, selected by feature:
//!
//! - `runtime-tokio` (default)
//! - `runtime-async-std`
//! - `runtime-smol`
//!
//! ```toml
//! [dependencies]
//! hue-lights-rs = { version = "0.1", default-features = false, features = ["runtime-smol"] }
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

#[cfg(feature = "runtime-tokio")]
#[path = "tokio_impl.rs"]
mod backend;

#[cfg(feature = "runtime-async-std")]
#[path = "async_std_impl.rs"]
mod backend;

#[cfg(feature = "runtime-smol")]
#[path = "smol_impl.rs"]
mod backend;

pub use backend::{JoinHandle, sleep, spawn, spawn_blocking, timeout};

#[cfg(feature = "runtime-tokio")]
pub use tokio::sync::Mutex;

#[cfg(feature = "runtime-async-std")]
pub use async_std::sync::Mutex;

#[cfg(feature = "runtime-smol")]
pub use async_lock::Mutex;

/// A boxed, sendable future.
///
/// [`DeviceTransport`](crate::DeviceTransport) methods return these so the
/// trait stays object safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The deadline passed to [`timeout`] expired first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut;

impl fmt::Display for TimedOut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation timed out")
    }
}

impl std::error::Error for TimedOut {}

/// A point on the executor's monotonic clock.
///
/// Under tokio this is tokio's clock, so tests with a paused clock can age
/// cache entries with `tokio::time::advance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant(backend::ClockInstant);

impl Instant {
    pub fn now() -> Self {
        Instant(backend::ClockInstant::now())
    }

    pub fn elapsed(&self) -> Duration {
        self.0.elapsed()
    }
}

#[cfg(not(any(
    feature = "runtime-tokio",
    feature = "runtime-async-std",
    feature = "runtime-smol"
)))]
compile_error!(
    "One of \"runtime-tokio\", \"runtime-async-std\", or \"runtime-smol\" features must be enabled"
);

#[cfg(all(feature = "runtime-tokio", feature = "runtime-async-std"))]
compile_error!("Features \"runtime-tokio\" and \"runtime-async-std\" are mutually exclusive");

#[cfg(all(feature = "runtime-tokio", feature = "runtime-smol"))]
compile_error!("Features \"runtime-tokio\" and \"runtime-smol\" are mutually exclusive");

#[cfg(all(feature = "runtime-async-std", feature = "runtime-smol"))]
compile_error!("Features \"runtime-async-std\" and \"runtime-smol\" are mutually exclusive");

#[cfg(all(test, feature = "runtime-tokio"))]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_instant_follows_paused_clock() {
        let start = Instant::now();
        tokio::time::advance(Duration::from_secs(42)).await;
        assert!(start.elapsed() >= Duration::from_secs(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_reports_expiry() {
        let result = timeout(Duration::from_millis(10), sleep(Duration::from_secs(1))).await;
        assert_eq!(result, Err(TimedOut));
    }

    #[tokio::test]
    async fn test_spawned_task_yields_value() {
        assert_eq!(spawn(async { 7 }).await, 7);
    }

    #[tokio::test]
    async fn test_blocking_closure_yields_value() {
        assert_eq!(spawn_blocking(|| 6 * 7).await, 42);
    }

    #[tokio::test]
    async fn test_mutex_serializes_access() {
        let mutex = Mutex::new(0);
        *mutex.lock().await += 1;
        assert_eq!(*mutex.lock().await, 1);
    }
}
