//! Token Models
//!
//! Short-lived verification tokens (email OTPs and password-reset digests)
//! and long-lived refresh tokens. Both are owned by a user and deleted with
//! it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::security;

/// What flow a verification token belongs to. One live token is expected per
/// user per purpose; issuing a new one invalidates its predecessors for the
/// same purpose only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "token_purpose", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

/// Short-lived credential proof.
///
/// `code_hash` holds a bcrypt hash of the OTP for email verification, or a
/// SHA-256 digest of the signed reset token for password resets; the
/// plaintext value only ever travels in the outbound email.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VerificationToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub code_hash: String,
    pub purpose: TokenPurpose,
    /// Reserved for email-change flows
    pub new_email: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl VerificationToken {
    /// Build a token expiring `ttl_minutes` from now
    pub fn issue(
        user_id: Uuid,
        code_hash: String,
        purpose: TokenPurpose,
        ttl_minutes: i64,
    ) -> Self {
        VerificationToken {
            id: Uuid::new_v4(),
            user_id,
            code_hash,
            purpose,
            new_email: None,
            expires_at: security::expiry_in_minutes(ttl_minutes),
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        security::is_expired(self.expires_at)
    }
}

/// Session-continuation credential. The `token` value is opaque and random;
/// it is matched by exact value and replaced in place on every successful
/// refresh.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Build a token expiring `ttl_days` from now
    pub fn issue(user_id: Uuid, token: String, ttl_days: i64) -> Self {
        let now = Utc::now();
        RefreshToken {
            id: Uuid::new_v4(),
            user_id,
            token,
            expires_at: now + Duration::days(ttl_days),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        security::is_expired(self.expires_at)
    }
}
