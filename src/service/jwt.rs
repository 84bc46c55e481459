//! JWT Service
//!
//! Issues and validates the signed tokens used by the identity flows: access
//! tokens carrying {sub, email, role} and purpose-tagged password-reset
//! tokens. Refresh tokens are deliberately not JWTs; they are opaque values
//! generated in `utils::security` and matched by the store.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::models::{AccessTokenClaims, ResetTokenClaims, UserRecord};
use crate::utils::error::{AuthError, AuthResult};

/// Token signing and validation service
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    reset_ttl: Duration,
}

impl JwtService {
    /// Create a new JWT service with the given HMAC secret and lifetimes
    pub fn new(secret: &str, access_ttl_minutes: i64, reset_ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_ttl: Duration::minutes(access_ttl_minutes),
            reset_ttl: Duration::minutes(reset_ttl_minutes),
        }
    }

    /// Access token lifetime in seconds, for `expires_in` fields
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    /// Sign an access token for an authenticated user
    pub fn issue_access_token(&self, user: &UserRecord) -> AuthResult<String> {
        let now = Utc::now();
        let claims =
            AccessTokenClaims::new(user.id, &user.email, user.role, now, now + self.access_ttl);

        self.sign(&claims)
    }

    /// Decode and validate an access token
    pub fn decode_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<AccessTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidCredential("invalid access token".to_string()))
    }

    /// Sign a short-lived password-reset token for a user
    pub fn issue_reset_token(&self, user_id: Uuid) -> AuthResult<String> {
        let now = Utc::now();
        let claims = ResetTokenClaims::new(user_id, now, now + self.reset_ttl);

        self.sign(&claims)
    }

    /// Decode a reset token, rejecting expired signatures and tokens minted
    /// for any other purpose
    pub fn decode_reset_token(&self, token: &str) -> AuthResult<ResetTokenClaims> {
        let validation = Validation::new(Algorithm::HS256);

        let claims = decode::<ResetTokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| {
                AuthError::InvalidCredential("invalid or expired reset token".to_string())
            })?;

        if claims.purpose != ResetTokenClaims::PURPOSE {
            return Err(AuthError::InvalidCredential(
                "invalid or expired reset token".to_string(),
            ));
        }

        Ok(claims)
    }

    fn sign<T: serde::Serialize>(&self, claims: &T) -> AuthResult<String> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key).map_err(|e| {
            log::error!("token signing failure: {}", e);
            AuthError::Dependency("token generation failed".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UserRole, UserStatus};

    fn service() -> JwtService {
        JwtService::new("test_secret_key", 60, 10)
    }

    fn user() -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone_number: None,
            role: UserRole::Customer,
            status: UserStatus::Active,
            is_email_verified: true,
            profile_picture: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn access_token_round_trip() {
        let service = service();
        let user = user();

        let token = service.issue_access_token(&user).unwrap();
        let claims = service.decode_access_token(&token).unwrap();

        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.role, UserRole::Customer);
    }

    #[test]
    fn access_token_rejects_wrong_secret() {
        let token = service().issue_access_token(&user()).unwrap();
        let other = JwtService::new("different_secret", 60, 10);

        assert!(other.decode_access_token(&token).is_err());
    }

    #[test]
    fn reset_token_round_trip() {
        let service = service();
        let user_id = Uuid::new_v4();

        let token = service.issue_reset_token(user_id).unwrap();
        let claims = service.decode_reset_token(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
    }

    #[test]
    fn access_token_is_not_a_reset_token() {
        let service = service();
        let token = service.issue_access_token(&user()).unwrap();

        assert!(service.decode_reset_token(&token).is_err());
    }

    #[test]
    fn expired_reset_token_is_rejected() {
        // Far enough in the past to clear the decoder's expiry leeway.
        let service = JwtService::new("test_secret_key", 60, -5);
        let token = service.issue_reset_token(Uuid::new_v4()).unwrap();

        let err = service.decode_reset_token(&token).unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential(_)));
    }
}
