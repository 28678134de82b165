//! GitHub OAuth authentication
//!
//! Handles:
//! - Code exchange with GitHub
//! - Client token issuance and verification
//! - Request extractors for the signed-in user

mod github;
mod login;
mod middleware;
mod token;

pub use github::{GitHubProvider, IdentityProvider};
pub use login::login;
pub use middleware::{CurrentUser, MaybeUser, RequestContext};
pub use token::{TokenService, derive_client_token};
