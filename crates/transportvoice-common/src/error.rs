/// Error types for the store connection lifecycle.
///
/// `StoreError` is `Clone` because a single in-flight connect attempt hands the same
/// outcome to every caller waiting on it. Driver errors are carried as a shared [`Cause`].
/// Application-specific errors should be defined in each binary crate and wrap
/// `StoreError` via `#[from]`.
use std::sync::Arc;
use std::time::Duration;

use crate::lifecycle::ConnectionState;

pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Wrap a driver error as a shareable [`Cause`].
pub fn cause<E>(err: E) -> Cause
where
    E: std::error::Error + Send + Sync + 'static,
{
    Arc::new(err)
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("connection to {target} failed: {source}")]
    Connection {
        target: String,
        #[source]
        source: Cause,
    },

    #[error("health check (PING) against {target} failed: {source}")]
    Ping {
        target: String,
        #[source]
        source: Cause,
    },

    #[error("connection to {target} timed out after {timeout:?}")]
    Timeout { target: String, timeout: Duration },

    #[error("store connection is closed, construct a new manager to reconnect")]
    Lifecycle,

    #[error("store is not connected (state: {0})")]
    NotConnected(ConnectionState),

    #[error("failed to release connection to {target}: {source}")]
    Release {
        target: String,
        #[source]
        source: Cause,
    },

    #[error("store config error: {0}")]
    Config(String),
}

impl StoreError {
    /// Connect, ping and timeout failures leave the manager `Unconnected`; a later
    /// `connect()` may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Connection { .. } | StoreError::Ping { .. } | StoreError::Timeout { .. }
        )
    }
}
