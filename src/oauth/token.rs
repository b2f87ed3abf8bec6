//! Credential and token value types.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::TokenError;

/// Stored OAuth credential for one integration
#[derive(Clone, PartialEq, Eq)]
pub struct OAuthCredential {
    pub integration_id: Uuid,
    pub access_token: Vec<u8>,
    pub refresh_token: Vec<u8>,
    pub expiry: DateTime<Utc>,
}

impl OAuthCredential {
    /// Whether the access token should be treated as expired at `now`.
    ///
    /// Tokens are considered expired `leeway` before their recorded expiry.
    pub fn is_expired(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        self.expiry - leeway <= now
    }

    pub fn token_pair(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expiry: self.expiry,
        }
    }
}

impl std::fmt::Debug for OAuthCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredential")
            .field("integration_id", &self.integration_id)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Access/refresh token pair with the access token's expiry
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: Vec<u8>,
    pub refresh_token: Vec<u8>,
    pub expiry: DateTime<Utc>,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .finish()
    }
}

/// Per-request bearer token; never persisted
#[derive(Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BearerToken {
    pub access_token: String,
    #[serde(skip_serializing)]
    pub refresh_token: String,
    pub expiry: DateTime<Utc>,
    pub token_type: String,
}

impl BearerToken {
    pub const TOKEN_TYPE: &'static str = "Bearer";

    /// Builds a bearer token from the authoritative pair of `integration_id`
    pub fn from_pair(integration_id: Uuid, pair: TokenPair) -> Result<Self, TokenError> {
        let decode = |bytes: Vec<u8>| {
            String::from_utf8(bytes).map_err(|_| TokenError::MalformedToken { integration_id })
        };

        Ok(Self {
            access_token: decode(pair.access_token)?,
            refresh_token: decode(pair.refresh_token)?,
            expiry: pair.expiry,
            token_type: Self::TOKEN_TYPE.to_string(),
        })
    }

    /// Value for an `Authorization` header
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerToken")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .field("token_type", &self.token_type)
            .finish()
    }
}
