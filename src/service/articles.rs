//! Article service
//!
//! Lists and creates articles. Each article type is its own collection,
//! and only the types named in configuration may be used.

use std::collections::HashSet;
use std::sync::Arc;

use bson::{Document, doc};

use crate::config::ArticlesConfig;
use crate::context::Context;
use crate::data::{ArticleRecord, Collection, Database, StoreError, UserRecord};
use crate::error::AppError;

/// Parameters of an article listing
#[derive(Debug, Clone, Default)]
pub struct ArticleListOptions {
    /// Required; names the collection to read
    pub article_type: String,
    /// Only articles by this user; empty means any creator
    pub creator: String,
}

impl ArticleListOptions {
    /// Build the equality filter for this listing.
    ///
    /// Non-admin viewers only see approved articles.
    ///
    /// # Errors
    /// Returns `Validation` if no article type was given
    pub fn to_filter(&self, viewer_is_admin: bool) -> Result<Document, AppError> {
        if self.article_type.is_empty() {
            return Err(AppError::Validation(
                "missing required parameter 'articleType'".to_string(),
            ));
        }

        let mut filter = Document::new();
        if !viewer_is_admin {
            filter.insert("approved", doc! { "$eq": true });
        }
        filter.insert("articleType", doc! { "$eq": self.article_type.as_str() });
        if !self.creator.is_empty() {
            filter.insert("creator", doc! { "$eq": self.creator.as_str() });
        }

        Ok(filter)
    }
}

/// Fields a caller supplies for a new article
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub item_title: String,
    pub thumbnail: String,
    pub content: String,
    pub article_type: String,
}

/// Article service
#[derive(Clone)]
pub struct ArticleCatalog {
    db: Arc<dyn Database>,
    collections: Arc<[String]>,
    admins: Arc<HashSet<String>>,
}

impl ArticleCatalog {
    /// Create new article service
    pub fn new(db: Arc<dyn Database>, config: &ArticlesConfig) -> Self {
        Self {
            db,
            collections: config.collections.iter().cloned().collect(),
            admins: Arc::new(config.admin_user_ids.clone()),
        }
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admins.contains(user_id)
    }

    /// Collection holding articles of `article_type`
    ///
    /// # Errors
    /// Returns `Validation` for types outside the configured allow-list
    fn collection_for(&self, article_type: &str) -> Result<Arc<dyn Collection>, AppError> {
        if !self.collections.iter().any(|name| name == article_type) {
            return Err(AppError::Validation(format!(
                "invalid article type: {article_type}"
            )));
        }

        Ok(self.db.collection(article_type))
    }

    /// List articles, oldest first.
    ///
    /// # Arguments
    /// * `viewer` - The signed-in caller, if any; admins also see unapproved articles
    pub async fn list_articles(
        &self,
        ctx: &Context,
        options: &ArticleListOptions,
        viewer: Option<&UserRecord>,
    ) -> Result<Vec<ArticleRecord>, AppError> {
        let viewer_is_admin = viewer.is_some_and(|user| self.is_admin(&user.user_id));
        let filter = options.to_filter(viewer_is_admin)?;
        let collection = self.collection_for(&options.article_type)?;

        let mut cursor = collection
            .find(ctx, filter, Some(doc! { "createdAt": 1 }))
            .await
            .map_err(AppError::from_store)?;

        let articles = cursor
            .all_as::<ArticleRecord>(ctx)
            .await
            .map_err(AppError::from_store)?;

        tracing::debug!(
            collection = %collection.name(),
            count = articles.len(),
            "Listed articles"
        );

        Ok(articles)
    }

    /// Store a new, unapproved article by `creator` and return its id.
    pub async fn create_article(
        &self,
        ctx: &Context,
        creator: &UserRecord,
        article: NewArticle,
    ) -> Result<String, AppError> {
        if article.item_title.trim().is_empty() {
            return Err(AppError::Validation(
                "missing required parameter 'itemTitle'".to_string(),
            ));
        }

        let collection = self.collection_for(&article.article_type)?;

        let record = ArticleRecord {
            id: None,
            item_title: article.item_title,
            thumbnail: article.thumbnail,
            content: article.content,
            article_type: article.article_type,
            creator: creator.user_id.clone(),
            approved: false,
            created_at: Some(bson::DateTime::now()),
        };

        let document = bson::to_document(&record).map_err(StoreError::from)?;
        let id = collection
            .insert_one(ctx, document)
            .await
            .map_err(AppError::from_store)?;

        tracing::info!(
            user_id = %creator.user_id,
            article_type = %record.article_type,
            article_id = %id,
            "Article created"
        );

        Ok(id)
    }
}
