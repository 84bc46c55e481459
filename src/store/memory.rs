//! In-Memory Credential Store
//!
//! A hash-map implementation of [`CredentialStore`] used as a test double.
//! A single mutex guards all state, which trivially provides the atomicity
//! and per-user serialization the contract asks for, while uniqueness checks
//! mirror the database constraints.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    Artisan, ArtisanStatus, RefreshToken, TokenPurpose, UserRecord, UserStatus, VerificationToken,
};
use crate::store::{CredentialStore, StoreError, StoreResult, UserProfileUpdate};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, UserRecord>,
    artisans: HashMap<Uuid, Artisan>,
    verification_tokens: HashMap<Uuid, VerificationToken>,
    refresh_tokens: HashMap<Uuid, RefreshToken>,
}

impl State {
    fn check_user_uniqueness(&self, user: &UserRecord) -> StoreResult<()> {
        if self.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::UniqueViolation("email".to_string()));
        }
        if let Some(phone) = &user.phone_number {
            if self
                .users
                .values()
                .any(|u| u.phone_number.as_deref() == Some(phone))
            {
                return Err(StoreError::UniqueViolation("phone number".to_string()));
            }
        }
        Ok(())
    }

    fn check_artisan_uniqueness(&self, artisan: &Artisan) -> StoreResult<()> {
        if self
            .artisans
            .values()
            .any(|a| a.business_license == artisan.business_license)
        {
            return Err(StoreError::UniqueViolation("business license".to_string()));
        }
        if let Some(tax_id) = &artisan.tax_id {
            if self
                .artisans
                .values()
                .any(|a| a.tax_id.as_deref() == Some(tax_id))
            {
                return Err(StoreError::UniqueViolation("tax id".to_string()));
            }
        }
        Ok(())
    }

    /// Cascade delete of a user's dependents, mirroring the ON DELETE
    /// CASCADE constraints
    fn remove_user_cascade(&mut self, user_id: Uuid) {
        self.artisans.retain(|_, a| a.user_id != user_id);
        self.verification_tokens.retain(|_, t| t.user_id != user_id);
        self.refresh_tokens.retain(|_, t| t.user_id != user_id);
        self.users.remove(&user_id);
    }
}

/// In-memory credential store for tests
#[derive(Default)]
pub struct MemoryCredentialStore {
    state: Mutex<State>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn create_user(&self, user: UserRecord) -> StoreResult<()> {
        let mut state = self.lock();
        state.check_user_uniqueness(&user)?;
        state.users.insert(user.id, user);
        Ok(())
    }

    async fn create_account(
        &self,
        user: UserRecord,
        artisan: Option<Artisan>,
        token: Option<VerificationToken>,
    ) -> StoreResult<()> {
        let mut state = self.lock();

        // All checks run before any insert so a failure leaves no partial
        // account behind.
        state.check_user_uniqueness(&user)?;
        if let Some(artisan) = &artisan {
            state.check_artisan_uniqueness(artisan)?;
        }

        state.users.insert(user.id, user);
        if let Some(artisan) = artisan {
            state.artisans.insert(artisan.id, artisan);
        }
        if let Some(token) = token {
            state.verification_tokens.insert(token.id, token);
        }
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let state = self.lock();
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let state = self.lock();
        Ok(state.users.get(&id).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<UserRecord>> {
        let state = self.lock();
        let mut users: Vec<UserRecord> = state.users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }

    async fn activate_user(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let mut state = self.lock();
        Ok(state.users.get_mut(&id).map(|user| {
            user.is_email_verified = true;
            user.status = UserStatus::Active;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn set_user_status(
        &self,
        id: Uuid,
        status: UserStatus,
    ) -> StoreResult<Option<UserRecord>> {
        let mut state = self.lock();
        Ok(state.users.get_mut(&id).map(|user| {
            user.status = status;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let mut state = self.lock();
        Ok(match state.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }

    async fn set_profile_picture(&self, id: Uuid, url: &str) -> StoreResult<Option<UserRecord>> {
        let mut state = self.lock();
        Ok(state.users.get_mut(&id).map(|user| {
            user.profile_picture = Some(url.to_string());
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn update_user_profile(
        &self,
        id: Uuid,
        update: UserProfileUpdate,
    ) -> StoreResult<Option<UserRecord>> {
        let mut state = self.lock();

        if let Some(email) = &update.email {
            if state
                .users
                .values()
                .any(|u| u.id != id && u.email == *email)
            {
                return Err(StoreError::UniqueViolation("email".to_string()));
            }
        }

        Ok(state.users.get_mut(&id).map(|user| {
            if let Some(first_name) = update.first_name {
                user.first_name = first_name;
            }
            if let Some(last_name) = update.last_name {
                user.last_name = last_name;
            }
            if let Some(phone_number) = update.phone_number {
                user.phone_number = Some(phone_number);
            }
            if let Some(email) = update.email {
                user.email = email;
            }
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.lock();
        let existed = state.users.contains_key(&id);
        state.remove_user_cascade(id);
        Ok(existed)
    }

    async fn find_artisan_by_user(&self, user_id: Uuid) -> StoreResult<Option<Artisan>> {
        let state = self.lock();
        Ok(state
            .artisans
            .values()
            .find(|a| a.user_id == user_id)
            .cloned())
    }

    async fn set_artisan_status(
        &self,
        id: Uuid,
        status: ArtisanStatus,
        verification_date: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<Artisan>> {
        let mut state = self.lock();
        Ok(state.artisans.get_mut(&id).map(|artisan| {
            artisan.status = status;
            artisan.verification_date = verification_date;
            artisan.clone()
        }))
    }

    async fn find_live_verification_token(
        &self,
        user_id: Uuid,
        purpose: TokenPurpose,
    ) -> StoreResult<Option<VerificationToken>> {
        let state = self.lock();
        let now = Utc::now();
        Ok(state
            .verification_tokens
            .values()
            .filter(|t| t.user_id == user_id && t.purpose == purpose && t.expires_at > now)
            .max_by_key(|t| t.created_at)
            .cloned())
    }

    async fn replace_verification_tokens(&self, token: VerificationToken) -> StoreResult<()> {
        // The single state mutex serializes concurrent replacements.
        let mut state = self.lock();
        state
            .verification_tokens
            .retain(|_, t| !(t.user_id == token.user_id && t.purpose == token.purpose));
        state.verification_tokens.insert(token.id, token);
        Ok(())
    }

    async fn delete_verification_token(&self, id: Uuid) -> StoreResult<bool> {
        let mut state = self.lock();
        Ok(state.verification_tokens.remove(&id).is_some())
    }

    async fn delete_verification_tokens_for_user(
        &self,
        user_id: Uuid,
        purpose: Option<TokenPurpose>,
    ) -> StoreResult<u64> {
        let mut state = self.lock();
        let before = state.verification_tokens.len();
        state.verification_tokens.retain(|_, t| {
            t.user_id != user_id || purpose.map(|p| t.purpose != p).unwrap_or(false)
        });
        Ok((before - state.verification_tokens.len()) as u64)
    }

    async fn create_refresh_token(&self, token: RefreshToken) -> StoreResult<()> {
        let mut state = self.lock();
        if state.refresh_tokens.values().any(|t| t.token == token.token) {
            return Err(StoreError::UniqueViolation("refresh token".to_string()));
        }
        state.refresh_tokens.insert(token.id, token);
        Ok(())
    }

    async fn find_refresh_token(&self, value: &str) -> StoreResult<Option<RefreshToken>> {
        let state = self.lock();
        Ok(state
            .refresh_tokens
            .values()
            .find(|t| t.token == value)
            .cloned())
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        current_value: &str,
        new_value: &str,
        new_expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        let mut state = self.lock();
        Ok(match state.refresh_tokens.get_mut(&id) {
            Some(record) if record.token == current_value => {
                record.token = new_value.to_string();
                record.expires_at = new_expires_at;
                record.updated_at = Utc::now();
                true
            }
            _ => false,
        })
    }

    async fn delete_refresh_token(&self, value: &str) -> StoreResult<bool> {
        let mut state = self.lock();
        let id = state
            .refresh_tokens
            .values()
            .find(|t| t.token == value)
            .map(|t| t.id);
        Ok(match id {
            Some(id) => state.refresh_tokens.remove(&id).is_some(),
            None => false,
        })
    }

    async fn delete_refresh_tokens_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let mut state = self.lock();
        let before = state.refresh_tokens.len();
        state.refresh_tokens.retain(|_, t| t.user_id != user_id);
        Ok((before - state.refresh_tokens.len()) as u64)
    }

    async fn delete_expired_verification_tokens(&self) -> StoreResult<u64> {
        let mut state = self.lock();
        let now = Utc::now();
        let before = state.verification_tokens.len();
        state.verification_tokens.retain(|_, t| t.expires_at > now);
        Ok((before - state.verification_tokens.len()) as u64)
    }

    async fn delete_expired_refresh_tokens(&self) -> StoreResult<u64> {
        let mut state = self.lock();
        let now = Utc::now();
        let before = state.refresh_tokens.len();
        state.refresh_tokens.retain(|_, t| t.expires_at > now);
        Ok((before - state.refresh_tokens.len()) as u64)
    }

    async fn delete_stale_unverified_users(
        &self,
        created_before: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut state = self.lock();
        let stale: Vec<Uuid> = state
            .users
            .values()
            .filter(|u| !u.is_email_verified && u.created_at < created_before)
            .map(|u| u.id)
            .collect();

        for user_id in &stale {
            state.remove_user_cascade(*user_id);
        }
        Ok(stale.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn user(email: &str) -> UserRecord {
        let now = Utc::now();
        UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone_number: None,
            role: crate::models::UserRole::Customer,
            status: UserStatus::Pending,
            is_email_verified: false,
            profile_picture: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn duplicate_email_is_a_unique_violation() {
        let store = MemoryCredentialStore::new();
        store.create_user(user("a@x.com")).await.unwrap();

        let err = store.create_user(user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(field) if field == "email"));
    }

    #[tokio::test]
    async fn failed_account_creation_leaves_no_partial_state() {
        let store = MemoryCredentialStore::new();

        let first = user("craft@x.com");
        let mut artisan = Artisan::placeholder(first.id, "First");
        artisan.business_license = "LIC-1".to_string();
        store
            .create_account(first, Some(artisan), None)
            .await
            .unwrap();

        // Same license, different user: the account as a whole must fail.
        let second = user("other@x.com");
        let second_id = second.id;
        let mut dup = Artisan::placeholder(second.id, "Second");
        dup.business_license = "LIC-1".to_string();
        let err = store.create_account(second, Some(dup), None).await.unwrap_err();
        assert!(matches!(err, StoreError::UniqueViolation(_)));

        assert!(store.find_user_by_id(second_id).await.unwrap().is_none());
        assert!(store
            .find_user_by_email("other@x.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn rotate_is_compare_and_swap() {
        let store = MemoryCredentialStore::new();
        let owner = user("a@x.com");
        let token = RefreshToken::issue(owner.id, "old-value".to_string(), 30);
        let id = token.id;
        store.create_user(owner).await.unwrap();
        store.create_refresh_token(token).await.unwrap();

        let expires = Utc::now() + Duration::days(30);
        assert!(store
            .rotate_refresh_token(id, "old-value", "new-value", expires)
            .await
            .unwrap());

        // The losing side of the race presents the stale value.
        assert!(!store
            .rotate_refresh_token(id, "old-value", "even-newer", expires)
            .await
            .unwrap());

        let live = store.find_refresh_token("new-value").await.unwrap();
        assert!(live.is_some());
        assert!(store.find_refresh_token("old-value").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stale_unverified_sweep_cascades() {
        let store = MemoryCredentialStore::new();
        let mut stale = user("stale@x.com");
        stale.created_at = Utc::now() - Duration::hours(25);
        let stale_id = stale.id;
        let token = VerificationToken::issue(
            stale_id,
            "hash".to_string(),
            TokenPurpose::EmailVerification,
            10,
        );
        store.create_account(stale, None, Some(token)).await.unwrap();

        let mut fresh = user("fresh@x.com");
        fresh.created_at = Utc::now();
        store.create_user(fresh).await.unwrap();

        let removed = store
            .delete_stale_unverified_users(Utc::now() - Duration::hours(24))
            .await
            .unwrap();

        assert_eq!(removed, 1);
        assert!(store.find_user_by_id(stale_id).await.unwrap().is_none());
        assert!(store
            .find_live_verification_token(stale_id, TokenPurpose::EmailVerification)
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_user_by_email("fresh@x.com")
            .await
            .unwrap()
            .is_some());
    }
}
