/// Caller-side retry for store connects.
///
/// `LifecycleManager::connect` never retries on its own; process bootstrap decides how
/// persistent to be and calls [`connect_with_retry`].
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::warn;

use crate::error::StoreError;
use crate::lifecycle::{LifecycleManager, StoreConnector};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first one. Zero disables retry.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_millis(5_000),
        }
    }
}

pub async fn connect_with_retry<C>(
    manager: &LifecycleManager<C>,
    policy: &RetryPolicy,
) -> Result<C::Handle, StoreError>
where
    C: StoreConnector,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match manager.connect().await {
            Ok(handle) => return Ok(handle),
            Err(e) => {
                if attempt > policy.max_retries || !e.is_retryable() {
                    return Err(e);
                }
                let delay = backoff_delay(policy.initial_backoff, policy.max_backoff, attempt - 1);
                warn!(
                    attempt,
                    delay_ms = delay.as_millis(),
                    error = %e,
                    "store connect failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn backoff_delay(initial: Duration, max: Duration, exponent: u32) -> Duration {
    let mult = 1u128.checked_shl(exponent).unwrap_or(u128::MAX);
    let base_ms = initial.as_millis().saturating_mul(mult);
    let capped_ms = std::cmp::min(base_ms, max.as_millis()) as u64;
    let jitter_cap = std::cmp::max(1, capped_ms / 4);
    Duration::from_millis(capped_ms.saturating_add(pseudo_jitter_ms(jitter_cap)))
}

fn pseudo_jitter_ms(max_inclusive: u64) -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    (now.subsec_nanos() as u64) % (max_inclusive + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ConnectionState;
    use crate::testing::{FakeStore, test_config};

    #[test]
    fn backoff_grows_and_caps() {
        let initial = Duration::from_millis(100);
        let max = Duration::from_millis(1_000);

        let first = backoff_delay(initial, max, 0);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(125));

        let third = backoff_delay(initial, max, 2);
        assert!(third >= Duration::from_millis(400) && third <= Duration::from_millis(500));

        let capped = backoff_delay(initial, max, 40);
        assert!(capped >= max && capped <= Duration::from_millis(1_250));
    }

    #[test]
    fn huge_exponent_does_not_overflow() {
        let delay = backoff_delay(Duration::from_millis(200), Duration::from_secs(5), u32::MAX);
        assert!(delay <= Duration::from_millis(6_250));
    }

    #[tokio::test]
    async fn retries_until_connected() {
        let config = test_config(Duration::from_secs(1));
        let manager = LifecycleManager::new(FakeStore::new().with_failing_connects(2), &config);

        connect_with_retry(&manager, &config.retry).await.unwrap();
        assert_eq!(manager.state(), ConnectionState::Connected);
        assert_eq!(manager.connector().connects(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let mut config = test_config(Duration::from_secs(1));
        config.retry.max_retries = 1;
        let manager = LifecycleManager::new(FakeStore::new().with_failing_connects(5), &config);

        let err = connect_with_retry(&manager, &config.retry).await.unwrap_err();
        assert!(matches!(err, StoreError::Connection { .. }), "got {err:?}");
        assert_eq!(manager.connector().connects(), 2);
        assert_eq!(manager.state(), ConnectionState::Unconnected);
    }

    #[tokio::test]
    async fn closed_manager_is_not_retried() {
        let config = test_config(Duration::from_secs(1));
        let manager = LifecycleManager::new(FakeStore::new(), &config);
        manager.close().await.unwrap();

        let err = connect_with_retry(&manager, &config.retry).await.unwrap_err();
        assert!(matches!(err, StoreError::Lifecycle));
        assert_eq!(manager.connector().connects(), 0);
    }
}
