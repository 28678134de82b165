//! Code-for-token login flow

use super::github::IdentityProvider;
use super::token::TokenService;
use crate::context::Context;
use crate::error::AppError;

/// Trade an OAuth authorization code for a client token.
///
/// Exchanges the code, resolves the provider user, then stores the client
/// token. A context that ends before the store step leaves nothing behind.
///
/// # Errors
/// - `Validation` if `code` is empty
/// - `Provider` / `HttpClient` if the identity provider fails
/// - `Cancelled` if `ctx` ends before the token is stored
pub async fn login(
    ctx: &Context,
    provider: &dyn IdentityProvider,
    tokens: &TokenService,
    code: &str,
) -> Result<String, AppError> {
    if code.trim().is_empty() {
        return Err(AppError::Validation(
            "Body missing required parameter: 'code'".to_string(),
        ));
    }

    let access_token = provider.exchange_code(ctx, code).await?;
    let user_id = provider.fetch_user_id(ctx, &access_token).await?;

    tokens.issue_token(ctx, &access_token, &user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::github::MockIdentityProvider;
    use crate::auth::token::derive_client_token;
    use crate::data::{FixtureDatabase, TOKENS_COLLECTION};

    #[tokio::test]
    async fn login_issues_token_for_provider_user() {
        let db = FixtureDatabase::new();
        let tokens = TokenService::new(&db);

        let mut provider = MockIdentityProvider::new();
        provider
            .expect_exchange_code()
            .withf(|_, code| code == "abc")
            .times(1)
            .returning(|_, _| Ok("gho_access".to_string()));
        provider
            .expect_fetch_user_id()
            .withf(|_, access| access == "gho_access")
            .times(1)
            .returning(|_, _| Ok("42".to_string()));

        let token = login(&Context::background(), &provider, &tokens, "abc")
            .await
            .unwrap();

        assert_eq!(token, derive_client_token("gho_access", "42"));
        assert!(db.fixture(TOKENS_COLLECTION).last_insert().is_some());
    }

    #[tokio::test]
    async fn empty_code_never_reaches_provider() {
        let db = FixtureDatabase::new();
        let tokens = TokenService::new(&db);
        let provider = MockIdentityProvider::new();

        let result = login(&Context::background(), &provider, &tokens, "  ").await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn provider_failure_stores_nothing() {
        let db = FixtureDatabase::new();
        let tokens = TokenService::new(&db);

        let mut provider = MockIdentityProvider::new();
        provider
            .expect_exchange_code()
            .returning(|_, _| Err(AppError::Provider("bad_verification_code".to_string())));
        provider.expect_fetch_user_id().never();

        let result = login(&Context::background(), &provider, &tokens, "stale").await;

        assert!(matches!(result, Err(AppError::Provider(_))));
        assert!(db.fixture(TOKENS_COLLECTION).last_insert().is_none());
    }

    #[tokio::test]
    async fn cancellation_after_lookup_stores_nothing() {
        let db = FixtureDatabase::new();
        let tokens = TokenService::new(&db);
        let (ctx, handle) = Context::cancellable();
        let handle = std::sync::Arc::new(handle);

        let mut provider = MockIdentityProvider::new();
        provider
            .expect_exchange_code()
            .returning(|_, _| Ok("gho_access".to_string()));
        let canceller = handle.clone();
        provider.expect_fetch_user_id().returning(move |_, _| {
            // client went away while the provider was answering
            canceller.cancel();
            Ok("42".to_string())
        });

        let result = login(&ctx, &provider, &tokens, "abc").await;

        assert!(matches!(result, Err(AppError::Cancelled(_))));
        assert!(db.fixture(TOKENS_COLLECTION).last_insert().is_none());
    }
}
