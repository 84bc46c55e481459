//! User Model
//!
//! Core identity record, role/status enums, and the account state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::error::{AuthError, AuthResult};

/// Marketplace role attached to an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Customer,
    Artisan,
    Admin,
}

/// Account lifecycle state.
///
/// `Pending` accounts become `Active` through email verification only;
/// suspension, reactivation and banning are administrative actions. `Banned`
/// is terminal for login purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    Pending,
    Active,
    Suspended,
    Banned,
}

impl UserStatus {
    /// Whether an administrative transition from `self` to `target` is
    /// allowed. Verification-driven `Pending -> Active` is handled by the
    /// verification flow, not here.
    pub fn can_transition_to(self, target: UserStatus) -> bool {
        use UserStatus::*;
        matches!(
            (self, target),
            (Active, Suspended) | (Suspended, Active) | (Active, Banned) | (Suspended, Banned)
        )
    }
}

/// User representation safe to hand back to callers.
///
/// Never carries the password hash; see [`UserRecord`] for the persistence
/// shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub is_email_verified: bool,
    pub profile_picture: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full user row including the credential hash.
///
/// This is what the credential store reads and writes; it is converted into
/// [`User`] before leaving the service layer so the hash is never exposed.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    /// bcrypt hash; empty string for OAuth-only accounts
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub is_email_verified: bool,
    pub profile_picture: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Gate consulted by login and token refresh before any credential is
    /// issued. Suspended and banned accounts render identically so the
    /// response does not reveal which state applies.
    pub fn ensure_can_authenticate(&self) -> AuthResult<()> {
        match self.status {
            UserStatus::Suspended | UserStatus::Banned => Err(AuthError::Forbidden(
                "account not available".to_string(),
            )),
            _ if !self.is_email_verified => Err(AuthError::Forbidden(
                "please verify your email before logging in".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Full display name used in email salutations
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        User {
            id: record.id,
            email: record.email,
            first_name: record.first_name,
            last_name: record.last_name,
            phone_number: record.phone_number,
            role: record.role,
            status: record.status,
            is_email_verified: record.is_email_verified,
            profile_picture: record.profile_picture,
            address: record.address,
            city: record.city,
            state: record.state,
            zip_code: record.zip_code,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
