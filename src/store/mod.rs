//! Credential Store
//!
//! Persistence seam for users, artisan profiles, verification tokens and
//! refresh tokens. The store is the single source of truth and the sole
//! mutation point; services receive it as an injected `Arc<dyn
//! CredentialStore>` and never touch a connection pool directly.
//!
//! Two implementations ship with the crate: [`PgCredentialStore`] backed by
//! PostgreSQL for production, and [`MemoryCredentialStore`] as an in-process
//! double for tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Artisan, ArtisanStatus, RefreshToken, TokenPurpose, UserRecord, UserStatus, VerificationToken,
};

pub use memory::MemoryCredentialStore;
pub use postgres::PgCredentialStore;

/// Errors surfaced by credential store implementations
#[derive(Error, Debug)]
pub enum StoreError {
    /// A unique constraint (email, phone number, refresh-token value,
    /// business license, tax id) was violated; the payload names the field
    #[error("unique constraint violated on {0}")]
    UniqueViolation(String),

    /// Backing database failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Partial profile update applied by administrative edits; `None` fields are
/// left untouched
#[derive(Debug, Clone, Default)]
pub struct UserProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    /// Already-normalized email
    pub email: Option<String>,
}

/// Persistence contract for the identity subsystem.
///
/// Contract notes, beyond the obvious CRUD semantics:
/// - [`create_account`](CredentialStore::create_account) persists the user,
///   optional artisan profile and optional verification token atomically.
/// - [`rotate_refresh_token`](CredentialStore::rotate_refresh_token) is a
///   compare-and-swap keyed on the current token value; of two concurrent
///   rotations of the same token, exactly one observes `true`.
/// - [`replace_verification_tokens`](CredentialStore::replace_verification_tokens)
///   (delete-all-then-insert for one purpose) is serialized per user, so
///   concurrent resends cannot leave the user with zero live tokens.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    // --- users ---

    /// Insert a standalone user row (OAuth linking, admin creation)
    async fn create_user(&self, user: UserRecord) -> StoreResult<()>;

    /// Atomically insert a user with its optional artisan profile and
    /// optional initial verification token
    async fn create_account(
        &self,
        user: UserRecord,
        artisan: Option<Artisan>,
        token: Option<VerificationToken>,
    ) -> StoreResult<()>;

    /// Exact-match lookup; callers normalize the email first
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>>;

    /// All users, newest first
    async fn list_users(&self) -> StoreResult<Vec<UserRecord>>;

    /// Mark the user verified and active (the verification-driven
    /// `Pending -> Active` transition)
    async fn activate_user(&self, id: Uuid) -> StoreResult<Option<UserRecord>>;

    /// Administrative status change; the caller is responsible for checking
    /// the transition is legal
    async fn set_user_status(&self, id: Uuid, status: UserStatus)
        -> StoreResult<Option<UserRecord>>;

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<bool>;

    async fn set_profile_picture(&self, id: Uuid, url: &str) -> StoreResult<Option<UserRecord>>;

    async fn update_user_profile(
        &self,
        id: Uuid,
        update: UserProfileUpdate,
    ) -> StoreResult<Option<UserRecord>>;

    /// Delete the user, cascading its artisan profile and all tokens.
    /// Returns whether a row was removed.
    async fn delete_user(&self, id: Uuid) -> StoreResult<bool>;

    // --- artisans ---

    async fn find_artisan_by_user(&self, user_id: Uuid) -> StoreResult<Option<Artisan>>;

    async fn set_artisan_status(
        &self,
        id: Uuid,
        status: ArtisanStatus,
        verification_date: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<Artisan>>;

    // --- verification tokens ---

    /// The newest unexpired token for a user and purpose, if any
    async fn find_live_verification_token(
        &self,
        user_id: Uuid,
        purpose: TokenPurpose,
    ) -> StoreResult<Option<VerificationToken>>;

    /// Delete every token the user holds for the new token's purpose and
    /// insert the new one, as one per-user serialized step
    async fn replace_verification_tokens(&self, token: VerificationToken) -> StoreResult<()>;

    async fn delete_verification_token(&self, id: Uuid) -> StoreResult<bool>;

    /// Delete the user's verification tokens, optionally narrowed to one
    /// purpose; returns the number removed
    async fn delete_verification_tokens_for_user(
        &self,
        user_id: Uuid,
        purpose: Option<TokenPurpose>,
    ) -> StoreResult<u64>;

    // --- refresh tokens ---

    async fn create_refresh_token(&self, token: RefreshToken) -> StoreResult<()>;

    /// Exact-value lookup; the token value is never decoded
    async fn find_refresh_token(&self, value: &str) -> StoreResult<Option<RefreshToken>>;

    /// Compare-and-swap rotation: update the row only if it still carries
    /// `current_value`. Returns whether the swap won.
    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        current_value: &str,
        new_value: &str,
        new_expires_at: DateTime<Utc>,
    ) -> StoreResult<bool>;

    /// Returns whether a row was removed (absence is not an error)
    async fn delete_refresh_token(&self, value: &str) -> StoreResult<bool>;

    async fn delete_refresh_tokens_for_user(&self, user_id: Uuid) -> StoreResult<u64>;

    // --- maintenance sweeps ---

    async fn delete_expired_verification_tokens(&self) -> StoreResult<u64>;

    async fn delete_expired_refresh_tokens(&self) -> StoreResult<u64>;

    /// Delete users still unverified that were created before the cutoff,
    /// cascading their artisan profiles and tokens
    async fn delete_stale_unverified_users(&self, created_before: DateTime<Utc>)
        -> StoreResult<u64>;
}
