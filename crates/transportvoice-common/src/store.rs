/// Store backend chosen from the `STORE_URI` scheme.
///
/// `mongodb://` and `mongodb+srv://` use [`MongoConnector`]; `redis://` and `rediss://` use
/// [`RedisConnector`]. The lifecycle manager only ever sees [`StoreBackend`].
use async_trait::async_trait;

use crate::config::{StoreConfig, StoreKind};
use crate::error::{Cause, StoreError, cause};
use crate::lifecycle::StoreConnector;
use crate::mongo::{MongoConnector, MongoHandle};
use crate::redis::{RedisConnector, RedisHandle};

#[derive(Debug, Clone)]
pub enum StoreBackend {
    Redis(RedisConnector),
    Mongo(MongoConnector),
}

#[derive(Clone)]
pub enum StoreHandle {
    Redis(RedisHandle),
    Mongo(MongoHandle),
}

#[derive(Debug, thiserror::Error)]
#[error("{backend} connector was handed a handle from another backend")]
struct ForeignHandle {
    backend: &'static str,
}

impl StoreBackend {
    pub fn for_config(config: &StoreConfig) -> Result<Self, StoreError> {
        match config.kind() {
            Some(StoreKind::Redis) => Ok(StoreBackend::Redis(RedisConnector::new())),
            Some(StoreKind::Mongo) => Ok(StoreBackend::Mongo(MongoConnector::new())),
            None => Err(StoreError::Config(format!(
                "unsupported store URI scheme: {}",
                config.redacted_uri()
            ))),
        }
    }

    pub fn kind(&self) -> StoreKind {
        match self {
            StoreBackend::Redis(_) => StoreKind::Redis,
            StoreBackend::Mongo(_) => StoreKind::Mongo,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            StoreBackend::Redis(_) => "redis",
            StoreBackend::Mongo(_) => "mongodb",
        }
    }

    fn foreign(&self) -> Cause {
        cause(ForeignHandle {
            backend: self.name(),
        })
    }
}

#[async_trait]
impl StoreConnector for StoreBackend {
    type Handle = StoreHandle;

    async fn connect(&self, uri: &str) -> Result<StoreHandle, Cause> {
        match self {
            StoreBackend::Redis(c) => c.connect(uri).await.map(StoreHandle::Redis),
            StoreBackend::Mongo(c) => c.connect(uri).await.map(StoreHandle::Mongo),
        }
    }

    async fn ping(&self, handle: &StoreHandle) -> Result<(), Cause> {
        match (self, handle) {
            (StoreBackend::Redis(c), StoreHandle::Redis(h)) => c.ping(h).await,
            (StoreBackend::Mongo(c), StoreHandle::Mongo(h)) => c.ping(h).await,
            _ => Err(self.foreign()),
        }
    }

    async fn release(&self, handle: StoreHandle) -> Result<(), Cause> {
        match (self, handle) {
            (StoreBackend::Redis(c), StoreHandle::Redis(h)) => c.release(h).await,
            (StoreBackend::Mongo(c), StoreHandle::Mongo(h)) => c.release(h).await,
            _ => Err(self.foreign()),
        }
    }
}
