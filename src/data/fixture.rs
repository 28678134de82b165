//! In-memory fixture store
//!
//! Implements the storage capability set from pre-registered
//! (query -> document bytes) pairs, so handlers can be tested without a
//! running MongoDB. Lookups match on a hash of the canonicalized query; any
//! two queries with the same fields and values hit the same fixture, whatever
//! their key order.
//!
//! This is a query/response table, not a simulated database: `insert_one`
//! never feeds later `find` calls. Tests that need to read back a write must
//! register a fixture for the read query themselves.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hasher};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use bson::{Bson, Document};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::models::EntityId;
use super::store::{
    Collection, Cursor, Database, SingleResult, StoreError, decode_document, document_to_json,
};
use crate::context::Context;

/// Hash a query for fixture lookup.
///
/// The query is rendered as JSON with object keys sorted at every level and
/// hashed with a non-cryptographic 64-bit hasher. Distinct queries can
/// collide; fixtures are test data, so that risk is accepted.
///
/// # Errors
/// Returns [`StoreError::Serialization`] if the query cannot be serialized
pub fn hash_query<Q>(query: &Q) -> Result<u64, StoreError>
where
    Q: Serialize + ?Sized,
{
    let value = bson::to_bson(query)?.into_relaxed_extjson();
    let bytes = serde_json::to_vec(&canonicalize(value))
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    let mut hasher = DefaultHasher::new();
    hasher.write(&bytes);
    Ok(hasher.finish())
}

fn canonicalize(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut entries: Vec<_> = map.into_iter().collect();
            entries.sort_by(|(left, _), (right, _)| left.cmp(right));
            serde_json::Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, canonicalize(value)))
                    .collect(),
            )
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(canonicalize).collect())
        }
        other => other,
    }
}

/// Encode a serializable value the way fixtures are stored.
fn encode_fixture<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, StoreError> {
    let json = bson::to_bson(value)?.into_relaxed_extjson();
    serde_json::to_vec(&json).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn parse_documents(bytes: &[u8]) -> Result<Vec<Document>, StoreError> {
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| StoreError::Decode(e.to_string()))?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    items
        .into_iter()
        .map(|item| match Bson::try_from(item) {
            Ok(Bson::Document(document)) => Ok(document),
            Ok(other) => Err(StoreError::Decode(format!(
                "fixture entry is not a document: {other}"
            ))),
            Err(e) => Err(StoreError::Decode(e.to_string())),
        })
        .collect()
}

// =============================================================================
// Database
// =============================================================================

/// Fixture-backed database
///
/// The same name always yields the same [`FixtureCollection`], so fixtures
/// registered through [`FixtureDatabase::fixture`] are visible to code that
/// reaches the collection through the [`Database`] trait.
#[derive(Default)]
pub struct FixtureDatabase {
    collections: RwLock<HashMap<String, Arc<FixtureCollection>>>,
}

impl FixtureDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Concrete collection for registering fixtures and inspecting inserts
    pub fn fixture(&self, name: &str) -> Arc<FixtureCollection> {
        if let Some(existing) = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return existing.clone();
        }

        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(FixtureCollection::new(name)))
            .clone()
    }
}

impl Database for FixtureDatabase {
    fn collection(&self, name: &str) -> Arc<dyn Collection> {
        self.fixture(name)
    }
}

// =============================================================================
// Collection
// =============================================================================

/// A named table of query fixtures
///
/// Registration takes a lock, so it is memory safe from any thread. Fixtures
/// are still meant to be registered during test setup, before the code under
/// test starts issuing lookups.
pub struct FixtureCollection {
    name: String,
    fixtures: RwLock<HashMap<u64, Arc<[u8]>>>,
    last_insert: Mutex<Option<Document>>,
}

impl FixtureCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixtures: RwLock::new(HashMap::new()),
            last_insert: Mutex::new(None),
        }
    }

    /// Answer queries equal to `query` with `documents`.
    ///
    /// `documents` is JSON: an array for `find` results, or a single object.
    ///
    /// # Panics
    /// Panics if `query` cannot be serialized. This only runs during test
    /// setup, where a broken fixture should stop the test immediately.
    pub fn register_fixture<Q>(&self, query: &Q, documents: impl Into<Vec<u8>>)
    where
        Q: Serialize + ?Sized,
    {
        let hash = match hash_query(query) {
            Ok(hash) => hash,
            Err(error) => panic!("fixture query for `{}` cannot be hashed: {error}", self.name),
        };

        let bytes: Vec<u8> = documents.into();
        self.fixtures
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(hash, Arc::from(bytes));
    }

    /// Register a single serializable document as the answer to `query`.
    ///
    /// # Panics
    /// Panics if the query or the document cannot be serialized
    pub fn register_document<Q, T>(&self, query: &Q, document: &T)
    where
        Q: Serialize + ?Sized,
        T: Serialize + ?Sized,
    {
        match encode_fixture(document) {
            Ok(bytes) => self.register_fixture(query, bytes),
            Err(error) => panic!("fixture document for `{}` cannot be encoded: {error}", self.name),
        }
    }

    /// Register a list of serializable documents as the answer to `query`.
    ///
    /// # Panics
    /// Panics if the query or any document cannot be serialized
    pub fn register_documents<Q, T>(&self, query: &Q, documents: &[T])
    where
        Q: Serialize + ?Sized,
        T: Serialize,
    {
        match encode_fixture(documents) {
            Ok(bytes) => self.register_fixture(query, bytes),
            Err(error) => panic!("fixture documents for `{}` cannot be encoded: {error}", self.name),
        }
    }

    /// JSON of the most recent `insert_one` document
    pub fn last_insert(&self) -> Option<Result<Vec<u8>, StoreError>> {
        let document = self
            .last_insert
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        Some(document_to_json(document))
    }

    /// Most recent `insert_one` document decoded as `T`
    pub fn last_insert_as<T: DeserializeOwned>(&self) -> Option<Result<T, StoreError>> {
        let document = self
            .last_insert
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        Some(decode_document(document))
    }

    fn lookup(&self, filter: &Document) -> Result<Option<Arc<[u8]>>, StoreError> {
        let hash = hash_query(filter)?;
        Ok(self
            .fixtures
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&hash)
            .cloned())
    }
}

#[async_trait]
impl Collection for FixtureCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn find(
        &self,
        ctx: &Context,
        filter: Document,
        _sort: Option<Document>,
    ) -> Result<Box<dyn Cursor>, StoreError> {
        if let Some(reason) = ctx.err() {
            return Err(reason.into());
        }

        let documents = match self.lookup(&filter)? {
            Some(bytes) => parse_documents(&bytes)?,
            None => {
                tracing::debug!(collection = %self.name, "No fixture registered for find query");
                Vec::new()
            }
        };

        Ok(Box::new(FixtureCursor::new(documents)))
    }

    async fn find_one(&self, ctx: &Context, filter: Document) -> Box<dyn SingleResult> {
        let outcome = match ctx.err() {
            Some(reason) => Err(reason.into()),
            None => self
                .lookup(&filter)
                .and_then(|found| found.ok_or(StoreError::NoDocuments)),
        };

        Box::new(FixtureSingleResult { outcome })
    }

    async fn insert_one(&self, ctx: &Context, document: Document) -> Result<String, StoreError> {
        if let Some(reason) = ctx.err() {
            return Err(reason.into());
        }

        *self
            .last_insert
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(document);

        Ok(EntityId::new().0)
    }
}

// =============================================================================
// Cursor and single result
// =============================================================================

pub struct FixtureCursor {
    documents: Vec<Document>,
    /// Index of the current document; `None` before the first advance
    position: Option<usize>,
}

impl FixtureCursor {
    fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            position: None,
        }
    }

    fn next_index(&self) -> usize {
        self.position.map_or(0, |position| position + 1)
    }
}

#[async_trait]
impl Cursor for FixtureCursor {
    async fn advance(&mut self, _ctx: &Context) -> Result<bool, StoreError> {
        let next = self.next_index();
        if next < self.documents.len() {
            self.position = Some(next);
            Ok(true)
        } else {
            self.position = Some(self.documents.len());
            Ok(false)
        }
    }

    fn current(&self) -> Result<Document, StoreError> {
        self.position
            .and_then(|position| self.documents.get(position))
            .cloned()
            .ok_or_else(|| StoreError::Decode("cursor is not positioned on a document".to_string()))
    }

    async fn all(&mut self, _ctx: &Context) -> Result<Vec<Document>, StoreError> {
        let start = self.next_index().min(self.documents.len());
        let remaining = self.documents[start..].to_vec();
        self.position = Some(self.documents.len());
        Ok(remaining)
    }
}

pub struct FixtureSingleResult {
    outcome: Result<Arc<[u8]>, StoreError>,
}

impl SingleResult for FixtureSingleResult {
    fn err(&self) -> Option<StoreError> {
        self.outcome.as_ref().err().cloned()
    }

    fn document(&self) -> Result<Document, StoreError> {
        let bytes = self.outcome.clone()?;
        parse_documents(&bytes)?
            .into_iter()
            .next()
            .ok_or(StoreError::NoDocuments)
    }

    fn decode_bytes(&self) -> Result<Vec<u8>, StoreError> {
        self.outcome.as_ref().map(|bytes| bytes.to_vec()).map_err(Clone::clone)
    }
}
