//! Bounded polling. Every suspension in the engine goes through here.

use std::future::Future;
use std::time::Duration;

use boardmove_core::{MigrationError, MigrationResult};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Polls a probe until it yields a value or a deadline passes.
///
/// A timeout is an expected outcome and comes back as `Ok(None)`. When the
/// waiter carries a cancellation token, a cancelled token ends the wait with
/// [`MigrationError::Cancelled`].
#[derive(Debug, Clone, Default)]
pub struct SettleWaiter {
    token: Option<CancellationToken>,
}

impl SettleWaiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: CancellationToken) -> Self {
        Self { token: Some(token) }
    }

    /// A waiter that ignores cancellation, for use inside a step that must
    /// run to completion once started.
    pub fn shielded(&self) -> Self {
        Self { token: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Fail with `Cancelled` if the token has fired.
    pub fn check(&self) -> MigrationResult<()> {
        if self.is_cancelled() {
            Err(MigrationError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Evaluate `probe` every `interval` until it returns `Some` or
    /// `timeout` elapses. The probe always runs at least once.
    pub async fn until<T, F, Fut>(
        &self,
        mut probe: F,
        timeout: Duration,
        interval: Duration,
    ) -> MigrationResult<Option<T>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = MigrationResult<Option<T>>>,
    {
        let interval = interval.max(MIN_INTERVAL);
        let start = Instant::now();
        loop {
            self.check()?;
            if let Some(value) = probe().await? {
                return Ok(Some(value));
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok(None);
            }
            self.pause(interval.min(timeout - elapsed)).await?;
        }
    }

    /// Sleep for `duration`, waking early if cancelled.
    pub async fn pause(&self, duration: Duration) -> MigrationResult<()> {
        if duration.is_zero() {
            return self.check();
        }
        match &self.token {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(MigrationError::Cancelled),
                    _ = tokio::time::sleep(duration) => Ok(()),
                }
            }
            None => {
                tokio::time::sleep(duration).await;
                Ok(())
            }
        }
    }
}
