// ABOUTME: JWT-based authentication producing the request principal
// ABOUTME: Token generation and validation with HS256 signing

// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Clubdesk

use crate::errors::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims carried by access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: user UUID
    pub sub: String,
    /// User email
    pub email: String,
    /// Issued-at (Unix seconds)
    pub iat: i64,
    /// Expiry (Unix seconds)
    pub exp: i64,
}

/// Authenticated caller identity, before any tenant binding
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
}

/// Issues and validates access tokens
#[derive(Clone)]
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_lifetime: Duration,
}

impl AuthManager {
    #[must_use]
    pub fn new(jwt_secret: &[u8], token_lifetime_hours: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(jwt_secret),
            decoding_key: DecodingKey::from_secret(jwt_secret),
            token_lifetime: Duration::hours(token_lifetime_hours),
        }
    }

    /// Issue a signed access token for a user
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails
    pub fn generate_token(&self, user_id: Uuid, email: &str) -> AppResult<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            email: email.to_owned(),
            iat: now.timestamp(),
            exp: (now + self.token_lifetime).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Token signing failed: {e}")))
    }

    /// Validate a token and extract the principal
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` for expired, malformed, or tampered tokens
    pub fn validate_token(&self, token: &str) -> AppResult<Principal> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AppError::auth_invalid(format!("Invalid token: {e}")))?;
        let user_id = Uuid::parse_str(&data.claims.sub)
            .map_err(|e| AppError::auth_invalid(format!("Invalid token subject: {e}")))?;
        Ok(Principal {
            user_id,
            email: data.claims.email,
        })
    }
}

/// Extract a bearer token from an `Authorization` header value
#[must_use]
pub fn extract_bearer_token(header_value: &str) -> Option<&str> {
    header_value.strip_prefix("Bearer ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_valid_token() {
        let auth = AuthManager::new(b"test-secret-key", 24);
        let user_id = Uuid::new_v4();
        let token = auth.generate_token(user_id, "ada@example.com").unwrap();
        let principal = auth.validate_token(&token).unwrap();
        assert_eq!(principal.user_id, user_id);
        assert_eq!(principal.email, "ada@example.com");
    }

    #[test]
    fn rejects_token_signed_with_other_secret() {
        let issuer = AuthManager::new(b"secret-a", 24);
        let verifier = AuthManager::new(b"secret-b", 24);
        let token = issuer.generate_token(Uuid::new_v4(), "x@example.com").unwrap();
        let err = verifier.validate_token(&token).unwrap_err();
        assert_eq!(err.code, crate::errors::ErrorCode::AuthInvalid);
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }
}
