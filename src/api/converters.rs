//! Converters from stored records to API responses

use axum::body::Bytes;
use serde::de::DeserializeOwned;

use super::dto::ArticleResponse;
use crate::data::{ArticleRecord, id_to_string};
use crate::error::AppError;

/// Convert ArticleRecord to the listing response
pub fn article_to_response(article: ArticleRecord) -> ArticleResponse {
    ArticleResponse {
        id: article.id.as_ref().map(id_to_string).unwrap_or_default(),
        item_title: article.item_title,
        thumbnail: article.thumbnail,
        content: article.content,
        article_type: article.article_type,
        creator: article.creator,
        approved: article.approved,
        created_at: article.created_at.map(|at| at.to_chrono()),
    }
}

/// Decode a JSON request body, whatever its content type.
///
/// Malformed bodies and missing fields are client errors (400).
pub fn parse_json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::dto::{ClientLogRequest, CreateArticleRequest};

    #[test]
    fn article_response_renders_object_id_and_date() {
        let oid = bson::oid::ObjectId::new();
        let created = bson::DateTime::from_millis(1_600_000_000_000);
        let response = article_to_response(ArticleRecord {
            id: Some(bson::Bson::ObjectId(oid)),
            item_title: "Rosebud".to_string(),
            thumbnail: "sled.png".to_string(),
            content: "A sled.".to_string(),
            article_type: "macguffins".to_string(),
            creator: "agent-7".to_string(),
            approved: true,
            created_at: Some(created),
        });

        assert_eq!(response.id, oid.to_hex());
        assert_eq!(response.created_at, Some(created.to_chrono()));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["_id"], oid.to_hex());
        assert_eq!(json["itemTitle"], "Rosebud");
        assert_eq!(json["articleType"], "macguffins");
    }

    #[test]
    fn parse_json_body_reports_missing_fields_as_validation() {
        let body = Bytes::from_static(br#"{"message":"wrong key"}"#);
        let result = parse_json_body::<ClientLogRequest>(&body);
        assert!(matches!(result, Err(AppError::Validation(_))));

        let body = Bytes::from_static(br#"{"itemTitle":"T","articleType":"sites"}"#);
        let request: CreateArticleRequest = parse_json_body(&body).unwrap();
        assert_eq!(request.item_title, "T");
        assert!(request.content.is_empty());
    }
}
