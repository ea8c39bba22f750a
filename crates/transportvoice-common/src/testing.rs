//! In-memory store used by the lifecycle and retry tests.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::StoreConfig;
use crate::error::{Cause, cause};
use crate::lifecycle::StoreConnector;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeHandle(pub usize);

#[derive(Default)]
pub struct FakeStore {
    connects: AtomicUsize,
    pings: AtomicUsize,
    releases: AtomicUsize,
    failing_connects: AtomicUsize,
    failing_pings: AtomicUsize,
    slow_connects: AtomicUsize,
    connect_delay: Duration,
    slow_pings: AtomicUsize,
    ping_delay: Duration,
    fail_releases: AtomicBool,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` connects fail with "connection refused".
    pub fn with_failing_connects(self, count: usize) -> Self {
        self.failing_connects.store(count, Ordering::SeqCst);
        self
    }

    pub fn with_failing_pings(self, count: usize) -> Self {
        self.failing_pings.store(count, Ordering::SeqCst);
        self
    }

    /// The next `count` connects sleep for `delay` before answering.
    pub fn with_slow_connects(mut self, count: usize, delay: Duration) -> Self {
        self.slow_connects.store(count, Ordering::SeqCst);
        self.connect_delay = delay;
        self
    }

    /// The next `count` pings sleep for `delay` before answering.
    pub fn with_slow_pings(mut self, count: usize, delay: Duration) -> Self {
        self.slow_pings.store(count, Ordering::SeqCst);
        self.ping_delay = delay;
        self
    }

    pub fn with_failing_releases(self) -> Self {
        self.fail_releases.store(true, Ordering::SeqCst);
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn pings(&self) -> usize {
        self.pings.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl StoreConnector for FakeStore {
    type Handle = FakeHandle;

    async fn connect(&self, _uri: &str) -> Result<FakeHandle, Cause> {
        let ordinal = self.connects.fetch_add(1, Ordering::SeqCst) + 1;
        if take_one(&self.slow_connects) {
            tokio::time::sleep(self.connect_delay).await;
        }
        if take_one(&self.failing_connects) {
            return Err(cause(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )));
        }
        Ok(FakeHandle(ordinal))
    }

    async fn ping(&self, _handle: &FakeHandle) -> Result<(), Cause> {
        self.pings.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.slow_pings) {
            tokio::time::sleep(self.ping_delay).await;
        }
        if take_one(&self.failing_pings) {
            return Err(cause(io::Error::other("PING returned an error reply")));
        }
        Ok(())
    }

    async fn release(&self, _handle: FakeHandle) -> Result<(), Cause> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        if self.fail_releases.load(Ordering::SeqCst) {
            return Err(cause(io::Error::other("socket already torn down")));
        }
        Ok(())
    }
}

pub fn test_config(connect_timeout: Duration) -> StoreConfig {
    StoreConfig {
        uri: "redis://localhost:6379".to_string(),
        require_tls: false,
        allow_invalid_certs: false,
        connect_timeout,
        retry: RetryPolicy {
            max_retries: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(5),
        },
    }
}
