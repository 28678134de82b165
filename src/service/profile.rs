//! Profile service

use std::sync::Arc;

use bson::doc;

use crate::context::Context;
use crate::data::{Collection, Database, PROFILES_COLLECTION, StoreError, UserProfile, UserRecord};
use crate::error::AppError;

/// Reads agent stat sheets
#[derive(Clone)]
pub struct ProfileService {
    profiles: Arc<dyn Collection>,
}

impl ProfileService {
    pub fn new(db: &dyn Database) -> Self {
        Self {
            profiles: db.collection(PROFILES_COLLECTION),
        }
    }

    /// Stored profile for `user`, or the starting profile if none exists.
    pub async fn get_profile(&self, ctx: &Context, user: &UserRecord) -> Result<UserProfile, AppError> {
        let found = self
            .profiles
            .find_one(ctx, doc! { "userID": { "$eq": user.user_id.as_str() } })
            .await;

        match found.err() {
            None => found.decode().map_err(|error| {
                AppError::Internal(anyhow::anyhow!(
                    "stored profile for {} is unreadable: {error}",
                    user.user_id
                ))
            }),
            Some(StoreError::NoDocuments) => {
                tracing::debug!(user_id = %user.user_id, "No stored profile, serving starting stats");
                Ok(UserProfile::starting(user.user_id.clone()))
            }
            Some(error) => Err(AppError::from_store(error)),
        }
    }
}
