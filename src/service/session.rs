//! Session Service
//!
//! Login, logout and refresh-token rotation. Access tokens are signed JWTs;
//! refresh tokens are opaque random values held by the store and rotated in
//! place on every use, so a refresh token is single-use by construction.

use std::sync::Arc;

use chrono::{Duration, Utc};
use validator::Validate;

use crate::models::{AuthenticatedSession, LoginRequest, RefreshToken, TokenPair, UserRecord};
use crate::service::jwt::JwtService;
use crate::store::CredentialStore;
use crate::utils::error::{AuthError, AuthResult};
use crate::utils::security::{generate_refresh_token, verify_password};
use crate::utils::validation::normalize_email;

/// Orchestrates credential issuance and revocation
pub struct SessionService {
    store: Arc<dyn CredentialStore>,
    jwt: JwtService,
    /// Refresh token lifetime in days
    refresh_ttl_days: i64,
}

impl SessionService {
    pub fn new(store: Arc<dyn CredentialStore>, jwt: JwtService, refresh_ttl_days: i64) -> Self {
        Self {
            store,
            jwt,
            refresh_ttl_days,
        }
    }

    /// Password login.
    ///
    /// An unknown email and a wrong password produce the same error, so the
    /// response does not reveal which accounts exist. Account state is
    /// checked before the password so a suspended account with the right
    /// password still reads as unavailable.
    pub async fn login(&self, request: LoginRequest) -> AuthResult<AuthenticatedSession> {
        request.validate()?;

        let email = normalize_email(&request.email);
        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| {
                AuthError::InvalidCredential("invalid email or password".to_string())
            })?;

        user.ensure_can_authenticate()?;

        // OAuth-only accounts carry an empty hash and can never log in with
        // a password.
        if user.password_hash.is_empty()
            || !verify_password(&request.password, &user.password_hash)?
        {
            return Err(AuthError::InvalidCredential(
                "invalid email or password".to_string(),
            ));
        }

        let session = self.issue_session(&user).await?;
        log::info!("user {} logged in", user.id);
        Ok(session)
    }

    /// Revoke a refresh token.
    ///
    /// Idempotent: logging out a token that is already gone succeeds, so the
    /// response never confirms whether a presented value was live.
    pub async fn logout(&self, refresh_token: &str) -> AuthResult<()> {
        let removed = self.store.delete_refresh_token(refresh_token).await?;
        if !removed {
            log::debug!("logout for an unknown refresh token; treating as success");
        }
        Ok(())
    }

    /// Exchange a refresh token for a fresh token pair, rotating the stored
    /// value. The rotation is a compare-and-swap on the presented value, so
    /// of two concurrent refreshes with the same token exactly one wins and
    /// the other fails as invalid.
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<AuthenticatedSession> {
        let record = self
            .store
            .find_refresh_token(refresh_token)
            .await?
            .ok_or_else(|| AuthError::InvalidCredential("invalid refresh token".to_string()))?;

        if record.is_expired() {
            self.store.delete_refresh_token(refresh_token).await?;
            return Err(AuthError::Expired("refresh token expired".to_string()));
        }

        let user = self
            .store
            .find_user_by_id(record.user_id)
            .await?
            .ok_or_else(|| AuthError::InvalidCredential("invalid refresh token".to_string()))?;

        user.ensure_can_authenticate()?;

        let access_token = self.jwt.issue_access_token(&user)?;
        let new_value = generate_refresh_token();
        let new_expires_at = Utc::now() + Duration::days(self.refresh_ttl_days);

        let rotated = self
            .store
            .rotate_refresh_token(record.id, &record.token, &new_value, new_expires_at)
            .await?;
        if !rotated {
            // Lost a race against a concurrent refresh of the same token.
            return Err(AuthError::InvalidCredential(
                "invalid refresh token".to_string(),
            ));
        }

        log::debug!("refresh token rotated for user {}", user.id);
        Ok(AuthenticatedSession {
            user: user.clone().into(),
            tokens: TokenPair::new(access_token, new_value, self.jwt.access_ttl_seconds()),
        })
    }

    /// Mint a token pair for an already-authenticated user and persist the
    /// refresh half. Shared by login and the OAuth linker.
    pub async fn issue_session(&self, user: &UserRecord) -> AuthResult<AuthenticatedSession> {
        let access_token = self.jwt.issue_access_token(user)?;
        let refresh_value = generate_refresh_token();
        let record = RefreshToken::issue(user.id, refresh_value.clone(), self.refresh_ttl_days);
        self.store.create_refresh_token(record).await?;

        Ok(AuthenticatedSession {
            user: user.clone().into(),
            tokens: TokenPair::new(access_token, refresh_value, self.jwt.access_ttl_seconds()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UserRole, UserStatus};
    use crate::store::MemoryCredentialStore;
    use crate::utils::security::hash_password;
    use uuid::Uuid;

    struct Harness {
        service: SessionService,
        store: Arc<MemoryCredentialStore>,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryCredentialStore::new());
        let jwt = JwtService::new("test_secret_key", 60, 10);
        let service = SessionService::new(store.clone(), jwt, 30);
        Harness { service, store }
    }

    async fn seed_user(
        store: &MemoryCredentialStore,
        email: &str,
        password: &str,
        status: UserStatus,
        verified: bool,
    ) -> UserRecord {
        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: hash_password(password).unwrap(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone_number: None,
            role: UserRole::Customer,
            status,
            is_email_verified: verified,
            profile_picture: None,
            address: None,
            city: None,
            state: None,
            zip_code: None,
            created_at: now,
            updated_at: now,
        };
        store.create_user(user.clone()).await.unwrap();
        user
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn login_issues_token_pair_and_safe_projection() {
        let h = harness();
        seed_user(&h.store, "a@x.com", "P@ssw0rd!", UserStatus::Active, true).await;

        let session = h
            .service
            .login(login_request("a@x.com", "P@ssw0rd!"))
            .await
            .unwrap();

        assert!(!session.tokens.access_token.is_empty());
        assert_eq!(session.tokens.token_type, "Bearer");
        assert_eq!(session.user.email, "a@x.com");

        // The refresh token was persisted for later lookup.
        assert!(h
            .store
            .find_refresh_token(&session.tokens.refresh_token)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn login_is_case_insensitive_on_email() {
        let h = harness();
        seed_user(&h.store, "a@x.com", "P@ssw0rd!", UserStatus::Active, true).await;

        assert!(h
            .service
            .login(login_request("A@X.COM", "P@ssw0rd!"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_are_indistinguishable() {
        let h = harness();
        seed_user(&h.store, "a@x.com", "P@ssw0rd!", UserStatus::Active, true).await;

        let absent = h
            .service
            .login(login_request("ghost@x.com", "P@ssw0rd!"))
            .await
            .unwrap_err();
        let wrong = h
            .service
            .login(login_request("a@x.com", "WrongPass1!"))
            .await
            .unwrap_err();

        assert_eq!(absent.to_string(), wrong.to_string());
        assert!(matches!(absent, AuthError::InvalidCredential(_)));
    }

    #[tokio::test]
    async fn suspended_and_banned_accounts_cannot_login() {
        let h = harness();
        seed_user(
            &h.store,
            "suspended@x.com",
            "P@ssw0rd!",
            UserStatus::Suspended,
            true,
        )
        .await;
        seed_user(
            &h.store,
            "banned@x.com",
            "P@ssw0rd!",
            UserStatus::Banned,
            true,
        )
        .await;

        for email in ["suspended@x.com", "banned@x.com"] {
            let err = h
                .service
                .login(login_request(email, "P@ssw0rd!"))
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::Forbidden(_)), "email {}", email);
        }
    }

    #[tokio::test]
    async fn unverified_account_cannot_login_even_with_correct_password() {
        let h = harness();
        seed_user(&h.store, "a@x.com", "P@ssw0rd!", UserStatus::Pending, false).await;

        let err = h
            .service
            .login(login_request("a@x.com", "P@ssw0rd!"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(_)));
    }

    #[tokio::test]
    async fn oauth_only_account_rejects_password_login() {
        let h = harness();
        let mut user = seed_user(&h.store, "b@x.com", "unused", UserStatus::Active, true).await;
        user.password_hash = String::new();
        // Re-seed with an empty hash under a fresh email.
        user.email = "oauth@x.com".to_string();
        user.id = Uuid::new_v4();
        h.store.create_user(user).await.unwrap();

        let err = h
            .service
            .login(login_request("oauth@x.com", "anything123"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential(_)));
    }

    #[tokio::test]
    async fn logout_is_idempotent() {
        let h = harness();
        seed_user(&h.store, "a@x.com", "P@ssw0rd!", UserStatus::Active, true).await;
        let session = h
            .service
            .login(login_request("a@x.com", "P@ssw0rd!"))
            .await
            .unwrap();

        h.service.logout(&session.tokens.refresh_token).await.unwrap();
        // Second revocation of the same value is still success.
        h.service.logout(&session.tokens.refresh_token).await.unwrap();

        assert!(h
            .store
            .find_refresh_token(&session.tokens.refresh_token)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn refresh_rotates_and_invalidates_predecessor() {
        let h = harness();
        seed_user(&h.store, "a@x.com", "P@ssw0rd!", UserStatus::Active, true).await;
        let session = h
            .service
            .login(login_request("a@x.com", "P@ssw0rd!"))
            .await
            .unwrap();
        let first_refresh = session.tokens.refresh_token;

        let renewed = h.service.refresh(&first_refresh).await.unwrap();
        assert_ne!(renewed.tokens.refresh_token, first_refresh);

        // The rotated-away value is dead.
        let err = h.service.refresh(&first_refresh).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredential(_)));

        // The replacement works.
        assert!(h.service.refresh(&renewed.tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn expired_refresh_token_is_deleted_on_use() {
        let h = harness();
        let user = seed_user(&h.store, "a@x.com", "P@ssw0rd!", UserStatus::Active, true).await;

        let mut record = RefreshToken::issue(user.id, "stale-token".to_string(), 30);
        record.expires_at = Utc::now() - Duration::seconds(1);
        h.store.create_refresh_token(record).await.unwrap();

        let err = h.service.refresh("stale-token").await.unwrap_err();
        assert!(matches!(err, AuthError::Expired(_)));
        assert!(h
            .store
            .find_refresh_token("stale-token")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn refresh_consults_account_state() {
        let h = harness();
        let user = seed_user(&h.store, "a@x.com", "P@ssw0rd!", UserStatus::Active, true).await;
        let session = h
            .service
            .login(login_request("a@x.com", "P@ssw0rd!"))
            .await
            .unwrap();

        h.store
            .set_user_status(user.id, UserStatus::Suspended)
            .await
            .unwrap();

        let err = h
            .service
            .refresh(&session.tokens.refresh_token)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Forbidden(_)));
    }

    #[tokio::test]
    async fn concurrent_refreshes_produce_a_single_winner() {
        let h = harness();
        let user = seed_user(&h.store, "a@x.com", "P@ssw0rd!", UserStatus::Active, true).await;
        let session = h.service.issue_session(&user).await.unwrap();
        let token = session.tokens.refresh_token;

        let store = h.store.clone();
        let jwt = JwtService::new("test_secret_key", 60, 10);
        let other = SessionService::new(store, jwt, 30);

        let (a, b) = tokio::join!(h.service.refresh(&token), other.refresh(&token));

        // Exactly one side wins the compare-and-swap.
        assert!(a.is_ok() ^ b.is_ok(), "expected exactly one winner");
    }
}
