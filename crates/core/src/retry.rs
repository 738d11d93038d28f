use std::future::Future;
use std::time::Duration;

use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, delay: Duration::from_secs(5) }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self { max_attempts: max_attempts.max(1), delay }
    }

    /// Runs `operation` until it succeeds or the attempt budget is spent,
    /// sleeping a fixed delay between attempts. Returns the last error.
    ///
    /// Errors are not logged here; callers decide what is safe to print.
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(error) if attempt >= max_attempts => return Err(error),
                Err(_) => {
                    warn!(
                        event_name = "pipeline.retry.scheduled",
                        attempt,
                        max_attempts,
                        delay_ms = self.delay.as_millis() as u64,
                        "attempt failed; retrying after fixed delay"
                    );
                    if !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::time::Duration;

    use super::RetryPolicy;

    #[tokio::test]
    async fn stops_after_first_success() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let result: Result<&str, &str> = policy
            .run(|_| {
                calls.set(calls.get() + 1);
                async { Ok("quote") }
            })
            .await;

        assert_eq!(result, Ok("quote"));
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn retries_until_success_within_budget() {
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let result: Result<u32, String> = policy
            .run(|attempt| async move {
                if attempt < 3 {
                    Err(format!("attempt {attempt} failed"))
                } else {
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result, Ok(3));
    }

    #[tokio::test]
    async fn returns_last_error_when_budget_exhausted() {
        let calls = Cell::new(0);
        let policy = RetryPolicy::new(3, Duration::ZERO);

        let result: Result<(), String> = policy
            .run(|attempt| {
                calls.set(calls.get() + 1);
                async move { Err(format!("failure #{attempt}")) }
            })
            .await;

        assert_eq!(result, Err("failure #3".to_string()));
        assert_eq!(calls.get(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn waits_fixed_delay_between_attempts() {
        let policy = RetryPolicy::new(3, Duration::from_secs(5));
        let started = tokio::time::Instant::now();

        let _: Result<(), ()> = policy.run(|_| async { Err(()) }).await;

        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
