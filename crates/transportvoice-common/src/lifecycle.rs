/// Single-connection lifecycle manager for the planning store.
///
/// States: `Unconnected -> Connecting -> Connected -> Closed`, with `Connecting` falling
/// back to `Unconnected` when the connect or its health ping fails. `Closed` is terminal;
/// reconnecting requires a new manager.
///
/// Concurrent `connect()` calls share one in-flight attempt. The attempt runs on its own
/// task, so a caller that stops waiting does not abort it; the task itself settles the
/// state when it finishes.
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::error::{Cause, StoreError, cause};

/// The store-specific half of the lifecycle: open a link, ping it, release it.
#[async_trait]
pub trait StoreConnector: Send + Sync + 'static {
    type Handle: Clone + Send + Sync + 'static;

    async fn connect(&self, uri: &str) -> Result<Self::Handle, Cause>;

    /// Minimal round trip with no parameters, e.g. `PING`.
    async fn ping(&self, handle: &Self::Handle) -> Result<(), Cause>;

    async fn release(&self, handle: Self::Handle) -> Result<(), Cause>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Unconnected,
    Connecting,
    Connected,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Unconnected => "unconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Closed => "closed",
        };
        f.write_str(s)
    }
}

type Attempt<H> = Shared<BoxFuture<'static, Result<H, StoreError>>>;

enum Slot<H> {
    Unconnected,
    Connecting(Attempt<H>),
    Connected(H),
    Closed,
}

impl<H> Slot<H> {
    fn state(&self) -> ConnectionState {
        match self {
            Slot::Unconnected => ConnectionState::Unconnected,
            Slot::Connecting(_) => ConnectionState::Connecting,
            Slot::Connected(_) => ConnectionState::Connected,
            Slot::Closed => ConnectionState::Closed,
        }
    }
}

enum Settled<H> {
    Connected(H),
    Failed(StoreError),
    ClosedMeanwhile(Option<H>),
}

struct Inner<C: StoreConnector> {
    connector: C,
    uri: String,
    redacted_uri: String,
    connect_timeout: Duration,
    slot: Mutex<Slot<C::Handle>>,
}

impl<C: StoreConnector> Inner<C> {
    fn lock_slot(&self) -> MutexGuard<'_, Slot<C::Handle>> {
        // Slot transitions are single assignments, so a poisoned lock still holds a valid state.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Connect, then ping, both under one deadline. A handle that was opened but not
    /// proven healthy in time is released before returning.
    async fn establish(&self) -> Result<C::Handle, StoreError> {
        let deadline = Instant::now() + self.connect_timeout;

        let handle = match timeout_at(deadline, self.connector.connect(&self.uri)).await {
            Ok(Ok(handle)) => handle,
            Ok(Err(source)) => {
                return Err(StoreError::Connection {
                    target: self.redacted_uri.clone(),
                    source,
                });
            }
            Err(_) => return Err(self.timed_out()),
        };

        let failure = match timeout_at(deadline, self.connector.ping(&handle)).await {
            Ok(Ok(())) => return Ok(handle),
            Ok(Err(source)) => StoreError::Ping {
                target: self.redacted_uri.clone(),
                source,
            },
            Err(_) => self.timed_out(),
        };
        if let Err(e) = self.connector.release(handle).await {
            warn!(uri = %self.redacted_uri, error = %e, "failed to release connection after failed ping");
        }
        Err(failure)
    }

    fn timed_out(&self) -> StoreError {
        StoreError::Timeout {
            target: self.redacted_uri.clone(),
            timeout: self.connect_timeout,
        }
    }

    async fn run_attempt(self: Arc<Self>) -> Result<C::Handle, StoreError> {
        info!(uri = %self.redacted_uri, "connecting to store");
        let outcome = self.establish().await;

        match self.settle(outcome) {
            Settled::Connected(handle) => {
                info!(uri = %self.redacted_uri, "store connected, ping ok");
                Ok(handle)
            }
            Settled::Failed(e) => {
                warn!(uri = %self.redacted_uri, error = %e, "store connect failed");
                Err(e)
            }
            Settled::ClosedMeanwhile(late) => {
                if let Some(handle) = late {
                    info!(uri = %self.redacted_uri, "manager closed during connect, releasing late connection");
                    if let Err(e) = self.connector.release(handle).await {
                        warn!(uri = %self.redacted_uri, error = %e, "failed to release late connection");
                    }
                }
                Err(StoreError::Lifecycle)
            }
        }
    }

    fn settle(&self, outcome: Result<C::Handle, StoreError>) -> Settled<C::Handle> {
        let mut slot = self.lock_slot();
        if matches!(*slot, Slot::Closed) {
            return Settled::ClosedMeanwhile(outcome.ok());
        }
        match outcome {
            Ok(handle) => {
                *slot = Slot::Connected(handle.clone());
                Settled::Connected(handle)
            }
            Err(e) => {
                *slot = Slot::Unconnected;
                Settled::Failed(e)
            }
        }
    }

    fn reset_after_abort(&self) {
        let mut slot = self.lock_slot();
        if matches!(*slot, Slot::Connecting(_)) {
            *slot = Slot::Unconnected;
        }
    }
}

/// Owns at most one live store connection. Cheap to clone; clones share the same state.
pub struct LifecycleManager<C: StoreConnector> {
    inner: Arc<Inner<C>>,
}

impl<C: StoreConnector> Clone for LifecycleManager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: StoreConnector> LifecycleManager<C> {
    pub fn new(connector: C, config: &StoreConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                uri: config.connection_uri(),
                redacted_uri: config.redacted_uri(),
                connect_timeout: config.connect_timeout,
                slot: Mutex::new(Slot::Unconnected),
            }),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.lock_slot().state()
    }

    /// The live handle when `Connected`, `None` in every other state. Never blocks on
    /// an in-flight connect.
    pub fn get_handle(&self) -> Option<C::Handle> {
        match &*self.inner.lock_slot() {
            Slot::Connected(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    pub fn uri(&self) -> &str {
        &self.inner.uri
    }

    pub fn redacted_uri(&self) -> &str {
        &self.inner.redacted_uri
    }

    pub fn connector(&self) -> &C {
        &self.inner.connector
    }

    /// Connect and ping, or join the attempt already in flight.
    ///
    /// Returns the existing handle when already connected and `StoreError::Lifecycle`
    /// once closed. Failures return the manager to `Unconnected` without retrying.
    pub async fn connect(&self) -> Result<C::Handle, StoreError> {
        let attempt = {
            let mut slot = self.inner.lock_slot();
            match &*slot {
                Slot::Closed => return Err(StoreError::Lifecycle),
                Slot::Connected(handle) => return Ok(handle.clone()),
                Slot::Connecting(attempt) => {
                    debug!(uri = %self.inner.redacted_uri, "joining in-flight store connect");
                    attempt.clone()
                }
                Slot::Unconnected => {
                    let attempt = self.start_attempt();
                    *slot = Slot::Connecting(attempt.clone());
                    attempt
                }
            }
        };
        attempt.await
    }

    fn start_attempt(&self) -> Attempt<C::Handle> {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(Arc::clone(&inner).run_attempt());
        async move {
            match task.await {
                Ok(result) => result,
                Err(join_err) => {
                    inner.reset_after_abort();
                    Err(StoreError::Connection {
                        target: inner.redacted_uri.clone(),
                        source: cause(join_err),
                    })
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Ping the live connection without changing state.
    pub async fn health_check(&self) -> Result<(), StoreError> {
        let handle = {
            let slot = self.inner.lock_slot();
            match &*slot {
                Slot::Connected(handle) => handle.clone(),
                Slot::Closed => return Err(StoreError::Lifecycle),
                other => return Err(StoreError::NotConnected(other.state())),
            }
        };
        self.inner
            .connector
            .ping(&handle)
            .await
            .map_err(|source| StoreError::Ping {
                target: self.inner.redacted_uri.clone(),
                source,
            })
    }

    /// Release the connection and move to `Closed`. The state advances even when the
    /// release fails; the failure is still returned. Closing twice is a no-op.
    ///
    /// With a connect in flight, the state flips to `Closed` at once and `close` then waits
    /// (up to the connect timeout) for the attempt to finish releasing its late handle.
    pub async fn close(&self) -> Result<(), StoreError> {
        let previous = {
            let mut slot = self.inner.lock_slot();
            std::mem::replace(&mut *slot, Slot::Closed)
        };

        match previous {
            Slot::Closed => {
                debug!(uri = %self.inner.redacted_uri, "store already closed");
                Ok(())
            }
            Slot::Unconnected => {
                info!(uri = %self.inner.redacted_uri, "store closed before connecting");
                Ok(())
            }
            Slot::Connecting(attempt) => {
                info!(uri = %self.inner.redacted_uri, "store closed with connect in flight, waiting for it to wind down");
                if timeout(self.inner.connect_timeout, attempt).await.is_err() {
                    warn!(
                        uri = %self.inner.redacted_uri,
                        timeout_ms = self.inner.connect_timeout.as_millis(),
                        "in-flight connect still running at close, it will release its connection when done"
                    );
                }
                Ok(())
            }
            Slot::Connected(handle) => match self.inner.connector.release(handle).await {
                Ok(()) => {
                    info!(uri = %self.inner.redacted_uri, "store connection closed");
                    Ok(())
                }
                Err(source) => {
                    warn!(uri = %self.inner.redacted_uri, error = %source, "error closing store connection");
                    Err(StoreError::Release {
                        target: self.inner.redacted_uri.clone(),
                        source,
                    })
                }
            },
        }
    }
}
