/// MongoDB connector for the store lifecycle manager.
///
/// A handle wraps a driver `Client`, which is itself a pool; clones share it. The health
/// check is `{ ping: 1 }` against the `admin` database, and releasing a handle shuts the
/// client down. Clients pin the Stable API v1 (strict).
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::options::{ClientOptions, ServerApi, ServerApiVersion};
use mongodb::{Client, Database};
use tracing::debug;

use crate::error::{Cause, cause};
use crate::lifecycle::StoreConnector;

#[derive(Clone, Debug)]
pub struct MongoHandle {
    client: Client,
}

impl MongoHandle {
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// The database named in the URI path, if any.
    pub fn default_database(&self) -> Option<Database> {
        self.client.default_database()
    }
}

#[derive(Debug, Default, Clone)]
pub struct MongoConnector;

impl MongoConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StoreConnector for MongoConnector {
    type Handle = MongoHandle;

    async fn connect(&self, uri: &str) -> Result<MongoHandle, Cause> {
        let mut options = ClientOptions::parse(uri).await.map_err(cause)?;
        options.server_api = Some(
            ServerApi::builder()
                .version(ServerApiVersion::V1)
                .strict(true)
                .deprecation_errors(true)
                .build(),
        );
        let client = Client::with_options(options).map_err(cause)?;
        Ok(MongoHandle { client })
    }

    async fn ping(&self, handle: &MongoHandle) -> Result<(), Cause> {
        handle
            .client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(cause)?;
        debug!("mongodb ping ok");
        Ok(())
    }

    async fn release(&self, handle: MongoHandle) -> Result<(), Cause> {
        handle.client.shutdown().await;
        Ok(())
    }
}
