//! Data layer module
//!
//! Storage access for every other layer:
//! - Storage traits (`Database`, `Collection`, `Cursor`, `SingleResult`)
//! - MongoDB implementation
//! - In-memory fixture implementation for tests

mod fixture;
mod models;
mod mongo;
mod store;

pub use fixture::{FixtureCollection, FixtureDatabase, hash_query};
pub use models::*;
pub use mongo::MongoDatabase;
pub use store::{
    Collection, Cursor, Database, SingleResult, StoreError, decode_document, document_to_json,
};
