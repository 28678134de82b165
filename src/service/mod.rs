//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services reach storage only through the `data` traits.

mod articles;
mod profile;

pub use articles::{ArticleCatalog, ArticleListOptions, NewArticle};
pub use profile::ProfileService;
