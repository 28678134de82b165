//! Storage capability set
//!
//! Handlers and services talk to [`Database`], [`Collection`], [`Cursor`] and
//! [`SingleResult`] only. `MongoDatabase` backs them in production and
//! `FixtureDatabase` in tests; both are injected at the composition root.

use std::sync::Arc;

use async_trait::async_trait;
use bson::{Bson, Document};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::context::{Context, Interrupted};

/// Storage-layer failure
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// `find_one` matched nothing
    #[error("no documents in result")]
    NoDocuments,

    /// Driver or transport failure
    #[error("database error: {0}")]
    Driver(#[from] mongodb::error::Error),

    /// Query or document could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Stored bytes could not be decoded into the requested shape
    #[error("decode error: {0}")]
    Decode(String),

    #[error("failed to get id for inserted document")]
    MissingInsertedId,

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl From<bson::ser::Error> for StoreError {
    fn from(err: bson::ser::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<bson::de::Error> for StoreError {
    fn from(err: bson::de::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Handle factory for named collections
pub trait Database: Send + Sync {
    /// Never fails; a collection that does not exist yet is created on first write.
    fn collection(&self, name: &str) -> Arc<dyn Collection>;
}

#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Start a query. No matches is an empty cursor, not an error.
    async fn find(
        &self,
        ctx: &Context,
        filter: Document,
        sort: Option<Document>,
    ) -> Result<Box<dyn Cursor>, StoreError>;

    /// Look up a single document. A miss is reported through
    /// [`SingleResult::err`] as [`StoreError::NoDocuments`].
    async fn find_one(&self, ctx: &Context, filter: Document) -> Box<dyn SingleResult>;

    /// Insert a document and return its store-assigned id.
    async fn insert_one(&self, ctx: &Context, document: Document) -> Result<String, StoreError>;
}

#[async_trait]
pub trait Cursor: Send {
    /// Move to the next document. Returns `false` once exhausted.
    async fn advance(&mut self, ctx: &Context) -> Result<bool, StoreError>;

    /// Document the cursor is positioned on
    fn current(&self) -> Result<Document, StoreError>;

    /// Every remaining document, in order
    async fn all(&mut self, ctx: &Context) -> Result<Vec<Document>, StoreError>;
}

pub trait SingleResult: Send + Sync {
    fn err(&self) -> Option<StoreError>;

    fn document(&self) -> Result<Document, StoreError>;

    /// The matched document as JSON bytes
    fn decode_bytes(&self) -> Result<Vec<u8>, StoreError>;
}

impl dyn Cursor {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        decode_document(self.current()?)
    }

    pub async fn all_as<T: DeserializeOwned>(&mut self, ctx: &Context) -> Result<Vec<T>, StoreError> {
        self.all(ctx)
            .await?
            .into_iter()
            .map(decode_document)
            .collect()
    }
}

impl dyn SingleResult {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        decode_document(self.document()?)
    }
}

pub fn decode_document<T: DeserializeOwned>(document: Document) -> Result<T, StoreError> {
    Ok(bson::from_document(document)?)
}

/// Render a document as relaxed extended JSON bytes.
pub fn document_to_json(document: Document) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(&Bson::Document(document).into_relaxed_extjson())
        .map_err(|e| StoreError::Serialization(e.to_string()))
}
