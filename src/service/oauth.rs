//! OAuth Identity Linker
//!
//! Maps an external provider profile onto a local account: reuse by email
//! when one exists, otherwise create an already-verified account with no
//! password. Token minting is handed off to the session service.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    Artisan, AuthenticatedSession, OAuthProfile, UserRecord, UserRole, UserStatus,
};
use crate::service::session::SessionService;
use crate::store::CredentialStore;
use crate::utils::error::{AuthError, AuthResult};
use crate::utils::validation::normalize_email;

/// Links provider identities to local users
pub struct OAuthService {
    store: Arc<dyn CredentialStore>,
    sessions: Arc<SessionService>,
}

impl OAuthService {
    pub fn new(store: Arc<dyn CredentialStore>, sessions: Arc<SessionService>) -> Self {
        Self { store, sessions }
    }

    /// Find or create the local account for a provider profile, then mint a
    /// token pair for it.
    ///
    /// New accounts are born active and email-verified (the provider already
    /// verified the address) with an empty password hash. For an existing
    /// account only an unset profile picture is backfilled; role and every
    /// other field are left alone.
    pub async fn link_or_create(
        &self,
        profile: &OAuthProfile,
        role: UserRole,
    ) -> AuthResult<AuthenticatedSession> {
        if role == UserRole::Admin {
            return Err(AuthError::Validation(
                "admin accounts cannot be created through OAuth".to_string(),
            ));
        }

        let email = profile
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                AuthError::Validation("no email found in OAuth profile".to_string())
            })?;
        let email = normalize_email(email);

        let user = match self.store.find_user_by_email(&email).await? {
            Some(existing) => self.backfill_profile_picture(existing, profile).await?,
            None => self.create_linked_user(&email, profile, role).await?,
        };

        let session = self.sessions.issue_session(&user).await?;
        log::info!(
            "oauth sign-in via {} for user {}",
            profile.provider,
            user.id
        );
        Ok(session)
    }

    async fn backfill_profile_picture(
        &self,
        existing: UserRecord,
        profile: &OAuthProfile,
    ) -> AuthResult<UserRecord> {
        if existing.profile_picture.is_some() {
            return Ok(existing);
        }
        let photo = match &profile.photo_url {
            Some(photo) => photo,
            None => return Ok(existing),
        };

        let updated = self
            .store
            .set_profile_picture(existing.id, photo)
            .await?
            .unwrap_or(existing);
        Ok(updated)
    }

    async fn create_linked_user(
        &self,
        email: &str,
        profile: &OAuthProfile,
        role: UserRole,
    ) -> AuthResult<UserRecord> {
        let (first_name, last_name) = profile.resolve_names();
        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            // OAuth accounts never authenticate with a password.
            password_hash: String::new(),
            first_name,
            last_name,
            phone_number: None,
            role,
            status: UserStatus::Active,
            is_email_verified: true,
            profile_picture: profile.photo_url.clone(),
            address: None,
            city: None,
            state: None,
            zip_code: None,
            created_at: now,
            updated_at: now,
        };

        let artisan = (role == UserRole::Artisan)
            .then(|| Artisan::placeholder(user.id, &profile.display_name));

        self.store
            .create_account(user.clone(), artisan, None)
            .await?;
        log::info!("created oauth-linked user {}", user.id);
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArtisanStatus;
    use crate::service::jwt::JwtService;
    use crate::store::MemoryCredentialStore;

    struct Harness {
        service: OAuthService,
        store: Arc<MemoryCredentialStore>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryCredentialStore::new());
        let jwt = JwtService::new("test_secret_key", 60, 10);
        let sessions = Arc::new(SessionService::new(store.clone(), jwt, 30));
        let service = OAuthService::new(store.clone(), sessions);
        Harness { service, store }
    }

    fn profile(email: Option<&str>) -> OAuthProfile {
        OAuthProfile {
            provider: "google".to_string(),
            provider_id: "sub-123".to_string(),
            display_name: "Ada Lovelace".to_string(),
            given_name: Some("Ada".to_string()),
            family_name: Some("Lovelace".to_string()),
            email: email.map(str::to_string),
            photo_url: Some("https://example.com/ada.jpg".to_string()),
        }
    }

    #[tokio::test]
    async fn creates_verified_active_user_with_empty_password() {
        let h = harness();
        let session = h
            .service
            .link_or_create(&profile(Some("Ada@Example.com")), UserRole::Customer)
            .await
            .unwrap();

        assert_eq!(session.user.email, "ada@example.com");
        assert_eq!(session.user.status, UserStatus::Active);
        assert!(session.user.is_email_verified);
        assert!(!session.tokens.refresh_token.is_empty());

        let record = h
            .store
            .find_user_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(record.password_hash.is_empty());
        assert_eq!(
            record.profile_picture.as_deref(),
            Some("https://example.com/ada.jpg")
        );
    }

    #[tokio::test]
    async fn missing_email_is_rejected() {
        let h = harness();
        let err = h
            .service
            .link_or_create(&profile(None), UserRole::Customer)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn display_name_fallback_splits_names() {
        let h = harness();
        let mut p = profile(Some("ese@example.com"));
        p.given_name = None;
        p.family_name = None;
        p.display_name = "Ese O. Jonathan".to_string();

        let session = h
            .service
            .link_or_create(&p, UserRole::Customer)
            .await
            .unwrap();
        assert_eq!(session.user.first_name, "Ese");
        assert_eq!(session.user.last_name, "Jonathan");
    }

    #[tokio::test]
    async fn existing_user_gets_picture_backfilled_but_nothing_else() {
        let h = harness();

        // First link creates the account without a picture.
        let mut p = profile(Some("ada@example.com"));
        p.photo_url = None;
        h.service
            .link_or_create(&p, UserRole::Customer)
            .await
            .unwrap();

        // Second link arrives with a photo and a different requested role.
        let session = h
            .service
            .link_or_create(&profile(Some("ada@example.com")), UserRole::Artisan)
            .await
            .unwrap();

        assert_eq!(
            session.user.profile_picture.as_deref(),
            Some("https://example.com/ada.jpg")
        );
        // The stored role is untouched.
        assert_eq!(session.user.role, UserRole::Customer);
        // No artisan profile was conjured up for the existing account.
        assert!(h
            .store
            .find_artisan_by_user(session.user.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn existing_picture_is_not_overwritten() {
        let h = harness();
        h.service
            .link_or_create(&profile(Some("ada@example.com")), UserRole::Customer)
            .await
            .unwrap();

        let mut p = profile(Some("ada@example.com"));
        p.photo_url = Some("https://example.com/other.jpg".to_string());
        let session = h
            .service
            .link_or_create(&p, UserRole::Customer)
            .await
            .unwrap();

        assert_eq!(
            session.user.profile_picture.as_deref(),
            Some("https://example.com/ada.jpg")
        );
    }

    #[tokio::test]
    async fn artisan_role_creates_placeholder_profile() {
        let h = harness();
        let session = h
            .service
            .link_or_create(&profile(Some("bob@example.com")), UserRole::Artisan)
            .await
            .unwrap();

        let artisan = h
            .store
            .find_artisan_by_user(session.user.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(artisan.status, ArtisanStatus::PendingVerification);
        assert!(artisan.business_license.starts_with("PENDING-"));
    }

    #[tokio::test]
    async fn admin_role_is_rejected() {
        let h = harness();
        let err = h
            .service
            .link_or_create(&profile(Some("ada@example.com")), UserRole::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }
}
