//! Minimum spacing between outgoing catalog requests.
//!
//! The catalog service asks clients to stay well below one request per
//! second. One throttle is shared by every request made during a run,
//! retries included, so the spacing holds no matter how many entries are in
//! flight.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub struct RequestThrottle {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// A throttle that never waits.
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until the next request may be sent, then claim the slot.
    ///
    /// The lock is held while sleeping: concurrent callers get consecutive
    /// slots in lock order.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_first_acquire_does_not_wait() {
        let throttle = RequestThrottle::new(Duration::from_secs(60));
        let start = Instant::now();
        throttle.acquire().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_acquires_are_spaced() {
        let throttle = RequestThrottle::new(Duration::from_millis(500));
        let start = Instant::now();

        throttle.acquire().await;
        throttle.acquire().await;
        throttle.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_spacing() {
        let throttle = Arc::new(RequestThrottle::new(Duration::from_millis(200)));
        let start = Instant::now();

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let throttle = throttle.clone();
                tokio::spawn(async move { throttle.acquire().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        // Four slots -> three gaps
        assert!(start.elapsed() >= Duration::from_millis(600));
    }

    #[tokio::test]
    async fn test_disabled_never_waits() {
        let throttle = RequestThrottle::disabled();
        let start = Instant::now();
        for _ in 0..100 {
            throttle.acquire().await;
        }
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(throttle.min_interval(), Duration::ZERO);
    }
}
