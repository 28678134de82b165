//! Client token issuance and verification
//!
//! A client token is derived from the provider access token and the user id,
//! stored in `tokens`, and expired by the TTL index on `createdAt`. Every
//! token belongs to a record in `agents`, created on first login.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bson::doc;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::context::Context;
use crate::data::{
    AGENTS_COLLECTION, Collection, Database, StoreError, TOKENS_COLLECTION, TokenRecord,
    UserRecord,
};
use crate::error::AppError;
use crate::metrics::TOKENS_ISSUED_TOTAL;

/// Derive the client token for `(access_token, user_id)`.
///
/// Deterministic: the same pair always yields the same token, so logging in
/// again with an unchanged provider token reissues the same credential.
pub fn derive_client_token(access_token: &str, user_id: &str) -> String {
    let digest = Sha256::digest(format!("{access_token}:{user_id}").as_bytes());
    STANDARD.encode(digest)
}

/// Only the owner is needed to verify a token.
#[derive(Debug, Deserialize)]
struct TokenOwner {
    #[serde(rename = "userID")]
    user_id: String,
}

/// Token and user persistence over the storage traits
#[derive(Clone)]
pub struct TokenService {
    tokens: Arc<dyn Collection>,
    agents: Arc<dyn Collection>,
}

impl TokenService {
    pub fn new(db: &dyn Database) -> Self {
        Self {
            tokens: db.collection(TOKENS_COLLECTION),
            agents: db.collection(AGENTS_COLLECTION),
        }
    }

    /// Persist a client token for `user_id` and make sure the user exists.
    ///
    /// # Errors
    /// - `Cancelled` if `ctx` is already done; nothing is written
    /// - `Store` if either write fails
    pub async fn issue_token(
        &self,
        ctx: &Context,
        access_token: &str,
        user_id: &str,
    ) -> Result<String, AppError> {
        if let Some(reason) = ctx.err() {
            tracing::info!(user_id = %user_id, %reason, "Request ended before token could be stored");
            return Err(AppError::Cancelled(reason));
        }

        let client_token = derive_client_token(access_token, user_id);
        let record = TokenRecord {
            user_id: user_id.to_string(),
            access_token: access_token.to_string(),
            client_token: client_token.clone(),
            created_at: bson::DateTime::now(),
        };

        tracing::info!(user_id = %user_id, "Storing token");
        let document = bson::to_document(&record).map_err(StoreError::from)?;
        self.tokens
            .insert_one(ctx, document)
            .await
            .map_err(AppError::from_store)?;
        TOKENS_ISSUED_TOTAL.inc();

        self.ensure_user(ctx, user_id).await?;

        Ok(client_token)
    }

    /// Resolve a client token to its user.
    ///
    /// # Errors
    /// - `TokenExpired` if no stored token matches
    /// - `InconsistentState` if the token exists but its user does not
    /// - `Store` on any other storage failure
    pub async fn verify_token(
        &self,
        ctx: &Context,
        client_token: &str,
    ) -> Result<UserRecord, AppError> {
        let found = self
            .tokens
            .find_one(ctx, doc! { "clientToken": { "$eq": client_token } })
            .await;

        let owner: TokenOwner = match found.err() {
            None => found.decode().map_err(AppError::from_store)?,
            Some(StoreError::NoDocuments) => return Err(AppError::TokenExpired),
            Some(error) => return Err(AppError::from_store(error)),
        };

        let user = self
            .agents
            .find_one(ctx, doc! { "userID": { "$eq": owner.user_id.as_str() } })
            .await;

        match user.err() {
            None => user.decode().map_err(AppError::from_store),
            Some(StoreError::NoDocuments) => Err(AppError::InconsistentState(format!(
                "token found for user {} but no user record exists",
                owner.user_id
            ))),
            Some(error) => Err(AppError::from_store(error)),
        }
    }

    /// Create an uninitialized user record unless one exists.
    ///
    /// Two first logins for the same user can both miss and both insert.
    async fn ensure_user(&self, ctx: &Context, user_id: &str) -> Result<(), AppError> {
        let existing = self
            .agents
            .find_one(ctx, doc! { "userID": { "$eq": user_id } })
            .await;

        match existing.err() {
            None => Ok(()),
            Some(StoreError::NoDocuments) => {
                let document = bson::to_document(&UserRecord::uninitialized(user_id))
                    .map_err(StoreError::from)?;
                self.agents
                    .insert_one(ctx, document)
                    .await
                    .map_err(AppError::from_store)?;
                tracing::info!(user_id = %user_id, "Created user record");
                Ok(())
            }
            Some(error) => Err(AppError::from_store(error)),
        }
    }
}
