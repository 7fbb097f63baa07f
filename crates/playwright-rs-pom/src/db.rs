// Document database wrapper
//
// CRUD and bulk helpers over named MongoDB collections. Documents are keyed
// by an opaque string `_id` chosen by the test (see `fixtures::new_id`).

use crate::config::TestConfiguration;
use crate::error::Result;
use futures_util::TryStreamExt;
use mongodb::bson::{Document, doc};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Server selection timeout applied when the connection string sets none, so
/// an unreachable server is reported quickly instead of after the driver's
/// 30 second default.
const SERVER_SELECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the test database. Cheap to clone; clones share the client.
#[derive(Debug, Clone)]
pub struct Database {
    inner: mongodb::Database,
}

impl Database {
    /// Builds a client for `MongoDB.ConnectionString` and selects
    /// `MongoDB.DatabaseName`.
    ///
    /// The driver connects lazily; use [`Database::ping`] to find out whether
    /// the server is reachable.
    pub async fn connect(config: &TestConfiguration) -> Result<Self> {
        let mut options = ClientOptions::parse(config.mongo_connection_string()).await?;
        if options.server_selection_timeout.is_none() {
            options.server_selection_timeout = Some(SERVER_SELECTION_TIMEOUT);
        }
        let client = Client::with_options(options)?;
        let inner = client.database(config.mongo_database_name());
        tracing::debug!(database = config.mongo_database_name(), "Database client created");
        Ok(Self { inner })
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Round-trips a `ping` command to the server.
    pub async fn ping(&self) -> Result<()> {
        self.inner.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.inner.collection::<T>(name)
    }

    /// Every document in `collection`.
    pub async fn list_all<T>(&self, collection: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        let cursor = self.collection::<T>(collection).find(doc! {}).await?;
        Ok(cursor.try_collect().await?)
    }

    /// The document with `_id == id`, if any.
    pub async fn get_by_id<T>(&self, collection: &str, id: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned + Unpin + Send + Sync,
    {
        Ok(self
            .collection::<T>(collection)
            .find_one(doc! { "_id": id })
            .await?)
    }

    pub async fn insert<T>(&self, collection: &str, document: &T) -> Result<()>
    where
        T: Serialize + Send + Sync,
    {
        self.collection::<T>(collection).insert_one(document).await?;
        tracing::info!(collection, "Inserted document");
        Ok(())
    }

    /// Applies `patch` as a `$set` on the document with `_id == id`.
    ///
    /// Returns whether a document matched.
    pub async fn update(&self, collection: &str, id: &str, patch: Document) -> Result<bool> {
        let result = self
            .collection::<Document>(collection)
            .update_one(doc! { "_id": id }, doc! { "$set": patch })
            .await?;
        tracing::info!(collection, id, matched = result.matched_count, "Updated document");
        Ok(result.matched_count > 0)
    }

    /// Deletes the document with `_id == id`. Returns whether one was removed.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let result = self
            .collection::<Document>(collection)
            .delete_one(doc! { "_id": id })
            .await?;
        tracing::info!(collection, id, deleted = result.deleted_count, "Deleted document");
        Ok(result.deleted_count > 0)
    }

    pub async fn count(&self, collection: &str) -> Result<u64> {
        Ok(self
            .collection::<Document>(collection)
            .count_documents(doc! {})
            .await?)
    }

    /// Removes every document from `collection`. Returns how many were removed.
    pub async fn clear(&self, collection: &str) -> Result<u64> {
        let result = self
            .collection::<Document>(collection)
            .delete_many(doc! {})
            .await?;
        tracing::info!(collection, deleted = result.deleted_count, "Cleared collection");
        Ok(result.deleted_count)
    }

    /// Clears `collection`, then inserts `documents`.
    ///
    /// Seeding the same documents twice leaves exactly one copy of each.
    pub async fn seed<T>(&self, collection: &str, documents: &[T]) -> Result<()>
    where
        T: Serialize + Send + Sync,
    {
        self.clear(collection).await?;
        // insert_many rejects an empty batch
        if !documents.is_empty() {
            self.collection::<T>(collection)
                .insert_many(documents)
                .await?;
        }
        tracing::info!(collection, count = documents.len(), "Seeded collection");
        Ok(())
    }
}
