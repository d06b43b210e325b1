use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use crate::ChainError;

pub struct ExponentialBackoff {
    initial: Duration,
    max: Duration,
    multiplier: f64,
    current_attempt: u32,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            multiplier: 2.0,
            current_attempt: 0,
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = if self.current_attempt == 0 {
            self.initial.min(self.max)
        } else {
            let factor = self.multiplier.powi(self.current_attempt as i32);
            let delay_ms = (self.initial.as_millis() as f64 * factor).min(self.max.as_millis() as f64);
            Duration::from_millis(delay_ms as u64)
        };

        self.current_attempt = self.current_attempt.saturating_add(1);
        delay
    }

    pub fn current_attempt(&self) -> u32 {
        self.current_attempt
    }
}

/// How long and how often to poll for transaction inclusion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationPolicy {
    pub initial_poll: Duration,
    pub max_poll: Duration,
    pub timeout: Duration,
}

impl ConfirmationPolicy {
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.initial_poll, self.max_poll)
    }
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            initial_poll: Duration::from_millis(500),
            max_poll: Duration::from_secs(5),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Poll until `check` reports completion, backing off between polls
///
/// Connection failures while polling are retried; any other error ends the
/// wait. Gives up with [`ChainError::Timeout`] once the next poll would land
/// past the policy timeout.
pub async fn wait_until<F, Fut>(
    policy: &ConfirmationPolicy,
    what: &str,
    mut check: F,
) -> Result<(), ChainError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, ChainError>>,
{
    let deadline = tokio::time::Instant::now() + policy.timeout;
    let mut backoff = policy.backoff();

    loop {
        match check().await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) if e.is_transient() => {
                tracing::warn!(what = %what, error = %e, "Confirmation poll failed, retrying");
            }
            Err(e) => return Err(e),
        }

        let delay = backoff.next_delay();
        if tokio::time::Instant::now() + delay > deadline {
            return Err(ChainError::Timeout(format!(
                "{what} not confirmed after {} polls",
                backoff.current_attempt()
            )));
        }

        tracing::debug!(what = %what, delay_ms = delay.as_millis() as u64, "Awaiting confirmation");
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> ConfirmationPolicy {
        ConfirmationPolicy {
            initial_poll: Duration::from_millis(1),
            max_poll: Duration::from_millis(4),
            timeout: Duration::from_millis(200),
        }
    }

    #[test]
    fn test_backoff_progression_and_cap() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_millis(500));

        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(400));
        assert_eq!(backoff.next_delay(), Duration::from_millis(500));
        assert_eq!(backoff.current_attempt(), 4);
    }

    #[test]
    fn test_backoff_custom_multiplier() {
        let mut backoff =
            ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(10))
                .with_multiplier(3.0);

        backoff.next_delay();
        assert_eq!(backoff.next_delay(), Duration::from_millis(300));
        assert_eq!(backoff.next_delay(), Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_wait_until_completes() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        wait_until(&fast_policy(), "tx", move || {
            let counter = counter.clone();
            async move { Ok(counter.fetch_add(1, Ordering::SeqCst) >= 2) }
        })
        .await
        .unwrap();

        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_wait_until_times_out() {
        let err = wait_until(&fast_policy(), "tx", || async { Ok(false) })
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let polls = Arc::new(AtomicU32::new(0));
        let counter = polls.clone();

        wait_until(&fast_policy(), "tx", move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ChainError::ConnectionFailed("reset".to_string()))
                } else {
                    Ok(true)
                }
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_revert_ends_wait() {
        let err = wait_until(&fast_policy(), "tx", || async {
            Err(ChainError::Reverted("0x1".to_string()))
        })
        .await
        .unwrap_err();
        assert_eq!(err, ChainError::Reverted("0x1".to_string()));
    }
}
