//! Data models
//!
//! Documents as they are stored in MongoDB. Field names follow the stored
//! camelCase layout, so the structs carry explicit renames.

use bson::Bson;
use serde::{Deserialize, Serialize};

// =============================================================================
// Collection names
// =============================================================================

/// Client tokens, TTL-indexed on `createdAt`
pub const TOKENS_COLLECTION: &str = "tokens";

/// Local user records
pub const AGENTS_COLLECTION: &str = "agents";

/// Agent stats
pub const PROFILES_COLLECTION: &str = "agentprofiles";

pub const MACGUFFINS_COLLECTION: &str = "macguffins";
pub const SITES_COLLECTION: &str = "sites";
pub const EVENTS_COLLECTION: &str = "events";

// =============================================================================
// Entity IDs
// =============================================================================

/// Opaque document id (ULID format, 26 characters)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a stored `_id` as a plain string.
pub fn id_to_string(id: &Bson) -> String {
    match id {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// =============================================================================
// Tokens and users
// =============================================================================

/// A client token issued after a GitHub sign-in
///
/// `client_token` is derived from `access_token` and `user_id`, so issuing
/// twice for the same pair yields the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(rename = "clientToken")]
    pub client_token: String,
    /// Stored as a BSON date so the TTL index can expire it
    #[serde(rename = "createdAt")]
    pub created_at: bson::DateTime,
}

/// Local user record, created on first sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(default)]
    pub initialized: bool,
}

impl UserRecord {
    pub fn uninitialized(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            initialized: false,
        }
    }
}

// =============================================================================
// Articles
// =============================================================================

/// An article in one of the article collections
///
/// New articles start unapproved; approval happens outside this service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Bson>,
    pub item_title: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub content: String,
    pub article_type: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<bson::DateTime>,
}

// =============================================================================
// Profiles
// =============================================================================

/// Stat value every agent starts with
pub const DEFAULT_STAT: i32 = 8;

/// Agent stats sheet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(
        rename = "publicAgentID",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub public_agent_id: Option<String>,
    #[serde(default)]
    pub strength: i32,
    #[serde(default)]
    pub constitution: i32,
    #[serde(default)]
    pub dexterity: i32,
    #[serde(default)]
    pub intelligence: i32,
    #[serde(default)]
    pub wisdom: i32,
    #[serde(default)]
    pub charisma: i32,
}

impl UserProfile {
    /// Profile served to agents that have no stored sheet yet
    pub fn starting(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            public_agent_id: None,
            strength: DEFAULT_STAT,
            constitution: DEFAULT_STAT,
            dexterity: DEFAULT_STAT,
            intelligence: DEFAULT_STAT,
            wisdom: DEFAULT_STAT,
            charisma: DEFAULT_STAT,
        }
    }
}
