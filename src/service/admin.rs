//! Admin Service
//!
//! Privileged account management: sub-admin lifecycle, user suspension and
//! banning through the account state machine, user listing, and artisan
//! profile review. Plain data mutation otherwise; the state machine is the
//! only invariant enforced here.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    AdminCreateRequest, AdminUpdateRequest, Artisan, ArtisanStatus, User, UserRecord, UserRole,
    UserStatus,
};
use crate::store::{CredentialStore, UserProfileUpdate};
use crate::utils::error::{AuthError, AuthResult};
use crate::utils::security::hash_password;
use crate::utils::validation::normalize_email;

/// Administrative operations over users and artisan profiles
pub struct AdminService {
    store: Arc<dyn CredentialStore>,
}

impl AdminService {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Create a sub-admin. This is the privileged path for admin accounts:
    /// they are born active and verified, never through registration.
    pub async fn create_sub_admin(&self, request: AdminCreateRequest) -> AuthResult<User> {
        request.validate()?;

        let email = normalize_email(&request.email);
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(AuthError::Conflict(
                "an account with this email already exists".to_string(),
            ));
        }

        let now = Utc::now();
        let admin = UserRecord {
            id: Uuid::new_v4(),
            email,
            password_hash: hash_password(&request.password)?,
            first_name: request.first_name,
            last_name: request.last_name,
            phone_number: request.phone_number,
            role: UserRole::Admin,
            status: UserStatus::Active,
            is_email_verified: true,
            profile_picture: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            created_at: now,
            updated_at: now,
        };

        self.store.create_user(admin.clone()).await?;
        log::info!("sub-admin {} created", admin.id);
        Ok(admin.into())
    }

    /// Update a sub-admin's profile fields
    pub async fn update_admin(
        &self,
        admin_id: Uuid,
        request: AdminUpdateRequest,
    ) -> AuthResult<User> {
        request.validate()?;
        self.require_admin(admin_id).await?;

        let update = UserProfileUpdate {
            first_name: request.first_name,
            last_name: request.last_name,
            phone_number: request.phone_number,
            email: request.email.as_deref().map(normalize_email),
        };

        let updated = self
            .store
            .update_user_profile(admin_id, update)
            .await?
            .ok_or_else(|| AuthError::NotFound("admin not found".to_string()))?;

        Ok(updated.into())
    }

    /// Delete a sub-admin account
    pub async fn delete_admin(&self, admin_id: Uuid) -> AuthResult<()> {
        self.require_admin(admin_id).await?;
        self.store.delete_user(admin_id).await?;
        log::info!("sub-admin {} deleted", admin_id);
        Ok(())
    }

    /// Suspend or reactivate an account. Only the transitions the state
    /// machine allows go through; anything else is a conflict.
    pub async fn set_suspension(&self, user_id: Uuid, suspend: bool) -> AuthResult<User> {
        let target = if suspend {
            UserStatus::Suspended
        } else {
            UserStatus::Active
        };
        self.transition_user(user_id, target).await
    }

    /// Ban an account. Terminal for login purposes; the record itself
    /// remains until deleted.
    pub async fn ban_user(&self, user_id: Uuid) -> AuthResult<User> {
        self.transition_user(user_id, UserStatus::Banned).await
    }

    /// Fetch a single user together with its artisan profile, if any
    pub async fn fetch_user(&self, user_id: Uuid) -> AuthResult<(User, Option<Artisan>)> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".to_string()))?;
        let artisan = self.store.find_artisan_by_user(user_id).await?;

        Ok((user.into(), artisan))
    }

    /// All users, newest first
    pub async fn list_users(&self) -> AuthResult<Vec<User>> {
        let users = self.store.list_users().await?;
        Ok(users.into_iter().map(User::from).collect())
    }

    /// Approve or reject an artisan business profile. Independent of the
    /// owning user's account status.
    pub async fn review_artisan(&self, artisan_id: Uuid, approve: bool) -> AuthResult<Artisan> {
        let (status, verification_date) = if approve {
            (ArtisanStatus::Verified, Some(Utc::now()))
        } else {
            (ArtisanStatus::Rejected, None)
        };

        let artisan = self
            .store
            .set_artisan_status(artisan_id, status, verification_date)
            .await?
            .ok_or_else(|| AuthError::NotFound("artisan not found".to_string()))?;

        log::info!(
            "artisan {} reviewed: {:?}",
            artisan_id,
            artisan.status
        );
        Ok(artisan)
    }

    async fn transition_user(&self, user_id: Uuid, target: UserStatus) -> AuthResult<User> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".to_string()))?;

        if user.status == target {
            return Ok(user.into());
        }
        if !user.status.can_transition_to(target) {
            return Err(AuthError::Conflict(format!(
                "account cannot move from {:?} to {:?}",
                user.status, target
            )));
        }

        let updated = self
            .store
            .set_user_status(user_id, target)
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".to_string()))?;

        log::info!("user {} status set to {:?}", user_id, target);
        Ok(updated.into())
    }

    async fn require_admin(&self, user_id: Uuid) -> AuthResult<UserRecord> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("admin not found".to_string()))?;

        if user.role != UserRole::Admin {
            return Err(AuthError::Forbidden(
                "user is not an administrator".to_string(),
            ));
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;

    struct Harness {
        service: AdminService,
        store: Arc<MemoryCredentialStore>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryCredentialStore::new());
        let service = AdminService::new(store.clone());
        Harness { service, store }
    }

    fn admin_request(email: &str) -> AdminCreateRequest {
        AdminCreateRequest {
            email: email.to_string(),
            password: "Adm1nP@ss!".to_string(),
            first_name: "Grace".to_string(),
            last_name: "Hopper".to_string(),
            phone_number: None,
        }
    }

    async fn seed_customer(store: &MemoryCredentialStore, status: UserStatus) -> Uuid {
        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: format!("{}@x.com", Uuid::new_v4()),
            password_hash: "hash".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            phone_number: None,
            role: UserRole::Customer,
            status,
            is_email_verified: true,
            profile_picture: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            created_at: now,
            updated_at: now,
        };
        let id = user.id;
        store.create_user(user).await.unwrap();
        id
    }

    #[tokio::test]
    async fn sub_admin_is_born_active_and_verified() {
        let h = harness();
        let admin = h
            .service
            .create_sub_admin(admin_request("grace@x.com"))
            .await
            .unwrap();

        assert_eq!(admin.role, UserRole::Admin);
        assert_eq!(admin.status, UserStatus::Active);
        assert!(admin.is_email_verified);
    }

    #[tokio::test]
    async fn duplicate_sub_admin_email_conflicts() {
        let h = harness();
        h.service
            .create_sub_admin(admin_request("grace@x.com"))
            .await
            .unwrap();

        let err = h
            .service
            .create_sub_admin(admin_request("grace@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn suspend_and_reactivate_cycle() {
        let h = harness();
        let user_id = seed_customer(&h.store, UserStatus::Active).await;

        let suspended = h.service.set_suspension(user_id, true).await.unwrap();
        assert_eq!(suspended.status, UserStatus::Suspended);

        let reactivated = h.service.set_suspension(user_id, false).await.unwrap();
        assert_eq!(reactivated.status, UserStatus::Active);
    }

    #[tokio::test]
    async fn banned_accounts_cannot_be_reactivated() {
        let h = harness();
        let user_id = seed_customer(&h.store, UserStatus::Active).await;

        h.service.ban_user(user_id).await.unwrap();

        let err = h.service.set_suspension(user_id, false).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn pending_accounts_cannot_be_admin_activated() {
        let h = harness();
        let user_id = seed_customer(&h.store, UserStatus::Pending).await;

        // Pending -> Active is the verification flow's transition only.
        let err = h.service.set_suspension(user_id, false).await.unwrap_err();
        assert!(matches!(err, AuthError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_admin_rejects_non_admin_targets() {
        let h = harness();
        let user_id = seed_customer(&h.store, UserStatus::Active).await;

        let err = h
            .service
            .update_admin(user_id, AdminUpdateRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(_)));
    }

    #[tokio::test]
    async fn review_artisan_approval_sets_verification_date() {
        let h = harness();
        let now = Utc::now();
        let owner = UserRecord {
            id: Uuid::new_v4(),
            email: "owner@x.com".to_string(),
            password_hash: "hash".to_string(),
            first_name: "Bob".to_string(),
            last_name: "Builder".to_string(),
            phone_number: None,
            role: UserRole::Artisan,
            status: UserStatus::Active,
            is_email_verified: true,
            profile_picture: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            created_at: now,
            updated_at: now,
        };
        let artisan = Artisan::placeholder(owner.id, "Bob Builder");
        let artisan_id = artisan.id;
        h.store
            .create_account(owner, Some(artisan), None)
            .await
            .unwrap();

        let approved = h.service.review_artisan(artisan_id, true).await.unwrap();
        assert_eq!(approved.status, ArtisanStatus::Verified);
        assert!(approved.verification_date.is_some());

        let rejected = h.service.review_artisan(artisan_id, false).await.unwrap();
        assert_eq!(rejected.status, ArtisanStatus::Rejected);
        assert!(rejected.verification_date.is_none());
    }

    #[tokio::test]
    async fn list_users_returns_safe_projections() {
        let h = harness();
        seed_customer(&h.store, UserStatus::Active).await;
        seed_customer(&h.store, UserStatus::Suspended).await;

        let users = h.service.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
    }
}
