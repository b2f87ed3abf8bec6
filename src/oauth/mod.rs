//! # OAuth Token Lifecycle
//!
//! Resolves usable GitHub App user-to-server tokens. The [`TokenRefresher`]
//! refreshes an expired credential against the authorization server and
//! persists the result; the [`TokenLifecycle`] wraps it with a single re-read so
//! that a request losing a refresh race adopts the token the winner stored.

use thiserror::Error;
use uuid::Uuid;

use crate::repositories::StoreError;

mod exchange;
mod lifecycle;
mod refresher;
mod token;

pub use exchange::{
    ExchangeError, ExchangedToken, OAuth2Exchanger, TokenExchanger, UnconfiguredExchanger,
};
pub use lifecycle::TokenLifecycle;
pub use refresher::TokenRefresher;
pub use token::{BearerToken, OAuthCredential, TokenPair};

/// Errors raised while resolving a bearer token
#[derive(Debug, Error)]
pub enum TokenError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("token refresh failed: {0}")]
    Exchange(#[from] ExchangeError),
    #[error("user {user_id} has not authorized the GitHub App")]
    NotLinked { user_id: Uuid },
    #[error("credential {integration_id} is expired and has no refresh token")]
    MissingRefreshToken { integration_id: Uuid },
    #[error("credential {integration_id} holds a token that is not valid UTF-8")]
    MalformedToken { integration_id: Uuid },
    #[error("invalid OAuth configuration: {0}")]
    Configuration(String),
}
