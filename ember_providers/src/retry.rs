use std::fmt::Display;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Backoff schedule for transient request failures.
///
/// The first attempts back off along `base_delays`; once those are used up,
/// `final_retries` further attempts wait `final_delay` each.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub base_delays: Vec<Duration>,
    pub final_retries: usize,
    pub final_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delays: [2, 4, 6, 8].map(Duration::from_secs).to_vec(),
            final_retries: 3,
            final_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    fn total_attempts(&self) -> usize {
        (self.base_delays.len() + self.final_retries).max(1)
    }

    fn delay_after(&self, attempt: usize) -> Duration {
        self.base_delays
            .get(attempt - 1)
            .copied()
            .unwrap_or(self.final_delay)
    }
}

/// Retry an async operation according to `policy`, returning the first
/// success or the last error once every attempt is spent.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let total = policy.total_attempts();
    let mut attempt = 0_usize;

    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if attempt >= total {
                    return Err(e);
                }
                let delay = policy.delay_after(attempt);
                warn!(
                    "Request failed (attempt {attempt}/{total}): {e}. Retrying in {:.1}s...",
                    delay.as_secs_f64()
                );
                sleep(delay).await;
            }
        }
    }
}
