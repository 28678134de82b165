//! MongoDB implementation of the storage capability set

use std::future::IntoFuture;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::IndexModel;
use mongodb::options::IndexOptions;

use super::models::TOKENS_COLLECTION;
use super::store::{Collection, Cursor, Database, SingleResult, StoreError, document_to_json};
use crate::config::DatabaseConfig;
use crate::context::Context;
use crate::metrics::DB_OPERATIONS_TOTAL;

/// Gateway around a driver database handle
///
/// Holds no documents; every call is a round-trip to the server.
#[derive(Clone)]
pub struct MongoDatabase {
    db: mongodb::Database,
}

impl MongoDatabase {
    /// Connect and verify the server answers a `ping`.
    ///
    /// # Errors
    /// Returns error if the URI is invalid, the server is unreachable, or
    /// `ctx` ends first
    pub async fn connect(config: &DatabaseConfig, ctx: &Context) -> Result<Self, StoreError> {
        let client = ctx
            .run(mongodb::Client::with_uri_str(&config.uri))
            .await??;
        let db = client.database(&config.name);

        ctx.run(db.run_command(doc! { "ping": 1 }).into_future())
            .await??;

        tracing::info!(database = %config.name, "Connected to MongoDB");
        Ok(Self { db })
    }

    /// Create the TTL index that expires client tokens.
    pub async fn ensure_token_indexes(&self, ctx: &Context, ttl: Duration) -> Result<(), StoreError> {
        let index = IndexModel::builder()
            .keys(doc! { "createdAt": 1 })
            .options(IndexOptions::builder().expire_after(ttl).build())
            .build();

        ctx.run(
            self.db
                .collection::<Document>(TOKENS_COLLECTION)
                .create_index(index)
                .into_future(),
        )
        .await??;

        tracing::info!(ttl_seconds = ttl.as_secs(), "Token TTL index ensured");
        Ok(())
    }
}

impl Database for MongoDatabase {
    fn collection(&self, name: &str) -> Arc<dyn Collection> {
        Arc::new(MongoCollection {
            name: name.to_string(),
            inner: self.db.collection::<Document>(name),
        })
    }
}

pub struct MongoCollection {
    name: String,
    inner: mongodb::Collection<Document>,
}

impl MongoCollection {
    fn record(&self, operation: &str) {
        DB_OPERATIONS_TOTAL
            .with_label_values(&[operation, self.name.as_str()])
            .inc();
    }
}

#[async_trait]
impl Collection for MongoCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(
        &self,
        ctx: &Context,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Box<dyn Cursor>, StoreError> {
        self.record("find");

        let mut action = self.inner.find(filter);
        if let Some(sort) = sort {
            action = action.sort(sort);
        }

        let cursor = ctx.run(action.into_future()).await??;
        Ok(Box::new(MongoCursor { cursor }))
    }

    async fn find_one(&self, ctx: &Context, filter: Document) -> Box<dyn SingleResult> {
        self.record("find_one");

        let outcome = match ctx.run(self.inner.find_one(filter).into_future()).await {
            Ok(Ok(Some(document))) => Ok(document),
            Ok(Ok(None)) => Err(StoreError::NoDocuments),
            Ok(Err(error)) => Err(StoreError::from(error)),
            Err(interrupted) => Err(StoreError::from(interrupted)),
        };

        Box::new(MongoSingleResult { outcome })
    }

    async fn insert_one(&self, ctx: &Context, document: Document) -> Result<String, StoreError> {
        self.record("insert_one");

        let result = ctx
            .run(self.inner.insert_one(document).into_future())
            .await??;

        match result.inserted_id {
            Bson::ObjectId(oid) => Ok(oid.to_hex()),
            _ => Err(StoreError::MissingInsertedId),
        }
    }
}

pub struct MongoCursor {
    cursor: mongodb::Cursor<Document>,
}

#[async_trait]
impl Cursor for MongoCursor {
    async fn advance(&mut self, ctx: &Context) -> Result<bool, StoreError> {
        Ok(ctx.run(self.cursor.advance()).await??)
    }

    fn current(&self) -> Result<Document, StoreError> {
        Ok(self.cursor.deserialize_current()?)
    }

    async fn all(&mut self, ctx: &Context) -> Result<Vec<Document>, StoreError> {
        let cursor = &mut self.cursor;
        let documents = ctx
            .run(async move {
                let mut documents = Vec::new();
                while let Some(document) = cursor.try_next().await? {
                    documents.push(document);
                }
                Ok::<_, mongodb::error::Error>(documents)
            })
            .await??;

        Ok(documents)
    }
}

pub struct MongoSingleResult {
    outcome: Result<Document, StoreError>,
}

impl SingleResult for MongoSingleResult {
    fn err(&self) -> Option<StoreError> {
        self.outcome.as_ref().err().cloned()
    }

    fn document(&self) -> Result<Document, StoreError> {
        self.outcome.clone()
    }

    fn decode_bytes(&self) -> Result<Vec<u8>, StoreError> {
        document_to_json(self.outcome.clone()?)
    }
}
