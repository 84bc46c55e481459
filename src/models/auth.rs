//! Authentication Models
//!
//! JWT claim shapes and the token bundle returned by login, refresh and
//! OAuth linking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::{User, UserRole};

/// Access and refresh token pair returned on successful authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// Short-lived signed access token
    pub access_token: String,

    /// Long-lived opaque refresh token
    pub refresh_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Access token lifetime in seconds
    pub expires_in: i64,
}

impl TokenPair {
    pub fn new(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in,
        }
    }
}

/// An authenticated session: the safe user projection plus its tokens
#[derive(Debug, Clone, Serialize)]
pub struct AuthenticatedSession {
    pub user: User,
    pub tokens: TokenPair,
}

/// Claims embedded in access tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject - user id
    pub sub: String,
    pub email: String,
    pub role: UserRole,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl AccessTokenClaims {
    pub fn new(
        user_id: Uuid,
        email: &str,
        role: UserRole,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub: user_id.to_string(),
            email: email.to_string(),
            role,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }
}

/// Claims embedded in signed password-reset tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetTokenClaims {
    /// Subject - user id
    pub sub: String,
    /// Always "password_reset"; rejects access tokens presented as reset
    /// tokens
    pub purpose: String,
    pub iat: i64,
    pub exp: i64,
}

impl ResetTokenClaims {
    pub const PURPOSE: &'static str = "password_reset";

    pub fn new(user_id: Uuid, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: user_id.to_string(),
            purpose: Self::PURPOSE.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn token_pair_defaults_to_bearer() {
        let pair = TokenPair::new("a".to_string(), "r".to_string(), 3600);
        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 3600);
    }

    #[test]
    fn access_claims_carry_identity() {
        let user_id = Uuid::new_v4();
        let now = Utc::now();
        let claims = AccessTokenClaims::new(
            user_id,
            "a@x.com",
            UserRole::Artisan,
            now,
            now + Duration::hours(1),
        );

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, UserRole::Artisan);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn reset_claims_are_purpose_tagged() {
        let now = Utc::now();
        let claims = ResetTokenClaims::new(Uuid::new_v4(), now, now + Duration::minutes(10));
        assert_eq!(claims.purpose, ResetTokenClaims::PURPOSE);
    }
}
