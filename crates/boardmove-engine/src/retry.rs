use std::future::Future;
use std::time::Duration;

use boardmove_core::config::ms;
use boardmove_core::{MigrationResult, RetryConfig};

use crate::settle::SettleWaiter;

/// Bounded retry for a control click whose effect was not observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: ms(config.backoff_ms),
        }
    }
}

impl RetryPolicy {
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    /// Run `attempt` until it yields a value, at most `max_attempts` times,
    /// pausing `backoff` between attempts. The attempt number starts at 1.
    pub async fn run<T, F, Fut>(
        &self,
        waiter: &SettleWaiter,
        mut attempt: F,
    ) -> MigrationResult<Option<T>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = MigrationResult<Option<T>>>,
    {
        for n in 1..=self.max_attempts.max(1) {
            if n > 1 {
                tracing::debug!("Retrying control click, attempt {}/{}", n, self.max_attempts);
                waiter.pause(self.backoff).await?;
            }
            if let Some(value) = attempt(n).await? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_stops_at_first_success() {
        let policy = RetryPolicy {
            max_attempts: 3,
            backoff: Duration::from_millis(400),
        };
        let calls = AtomicU32::new(0);
        let result = policy
            .run(&SettleWaiter::new(), |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok((n == 2).then_some(n)) }
            })
            .await
            .unwrap();

        assert_eq!(result, Some(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_attempts: 2,
            backoff_ms: 10,
        });
        let calls = AtomicU32::new(0);
        let result: Option<()> = policy
            .run(&SettleWaiter::new(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(None) }
            })
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_attempts_clamped() {
        let policy = RetryPolicy::from(&RetryConfig {
            max_attempts: 0,
            backoff_ms: 0,
        });
        assert_eq!(policy.max_attempts, 1);
    }
}
