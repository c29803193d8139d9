// Clock abstraction for dependency injection and testing

use std::time::{Duration, Instant};

/// Time source for campaigns, probes and the retry wrapper.
///
/// Production code uses [`SystemClock`]; tests inject a manual clock so
/// campaigns run without wall-clock sleeps.
#[async_trait::async_trait]
pub trait Clock: Send + Sync {
    /// Get current monotonic time
    fn now(&self) -> Instant;

    /// Suspend the calling task for the given duration
    async fn sleep(&self, duration: Duration);

    /// Get local timezone ISO-8601 timestamp
    fn local_timestamp(&self) -> String;
}

/// Production clock implementation using system time
#[derive(Default)]
pub struct SystemClock;

#[async_trait::async_trait]
impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn local_timestamp(&self) -> String {
        chrono::Local::now().to_rfc3339()
    }
}
