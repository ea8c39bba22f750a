/// Redis connector for the store lifecycle manager.
///
/// A handle is a multiplexed async connection; clones share the same socket. The health
/// check is `PING`. Redis has no explicit close, so releasing a handle drops it and the
/// socket closes once the last clone is gone.
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::debug;

use crate::error::{Cause, cause};
use crate::lifecycle::StoreConnector;

#[derive(Clone)]
pub struct RedisHandle {
    conn: MultiplexedConnection,
}

impl RedisHandle {
    /// A connection clone for issuing commands.
    pub fn connection(&self) -> MultiplexedConnection {
        self.conn.clone()
    }
}

#[derive(Debug, Default, Clone)]
pub struct RedisConnector;

impl RedisConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StoreConnector for RedisConnector {
    type Handle = RedisHandle;

    async fn connect(&self, uri: &str) -> Result<RedisHandle, Cause> {
        let client = redis::Client::open(uri).map_err(cause)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(cause)?;
        Ok(RedisHandle { conn })
    }

    async fn ping(&self, handle: &RedisHandle) -> Result<(), Cause> {
        let mut conn = handle.connection();
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(cause)?;
        debug!(reply = %reply, "redis PING ok");
        Ok(())
    }

    async fn release(&self, handle: RedisHandle) -> Result<(), Cause> {
        drop(handle);
        Ok(())
    }
}
