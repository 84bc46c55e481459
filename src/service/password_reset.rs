//! Password Reset Service
//!
//! Forgot/reset password with persisted, single-use reset tokens: the signed
//! token travels in the email while only its SHA-256 digest is stored, and
//! the digest record is deleted on consumption.

use std::sync::Arc;

use uuid::Uuid;

use crate::models::{TokenPurpose, VerificationToken};
use crate::service::email::{EmailDispatcher, EmailTemplates, OutgoingEmail};
use crate::service::jwt::JwtService;
use crate::store::CredentialStore;
use crate::utils::error::{AuthError, AuthResult};
use crate::utils::security::{hash_password, sha256_hex};
use crate::utils::validation::normalize_email;

/// Orchestrates the forgot/reset password flow
pub struct PasswordResetService {
    store: Arc<dyn CredentialStore>,
    jwt: JwtService,
    mailer: Arc<dyn EmailDispatcher>,
    templates: Arc<EmailTemplates>,
    /// Reset token lifetime in minutes
    reset_ttl_minutes: i64,
}

impl PasswordResetService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        jwt: JwtService,
        mailer: Arc<dyn EmailDispatcher>,
        templates: Arc<EmailTemplates>,
        reset_ttl_minutes: i64,
    ) -> Self {
        Self {
            store,
            jwt,
            mailer,
            templates,
            reset_ttl_minutes,
        }
    }

    /// Start a reset: mint a signed, time-boxed token, persist its digest,
    /// and email the reset link.
    ///
    /// An unknown email returns success without sending anything, so the
    /// endpoint cannot be used to enumerate accounts. A still-live prior
    /// reset token is a conflict rather than a silent replacement.
    pub async fn forgot_password(&self, email: &str) -> AuthResult<()> {
        let email = normalize_email(email);

        let user = match self.store.find_user_by_email(&email).await? {
            Some(user) => user,
            None => {
                log::info!("password reset requested for an unknown email");
                return Ok(());
            }
        };

        if self
            .store
            .find_live_verification_token(user.id, TokenPurpose::PasswordReset)
            .await?
            .is_some()
        {
            return Err(AuthError::Conflict(
                "a password reset link has already been sent; check your email or wait for it \
                 to expire"
                    .to_string(),
            ));
        }

        let reset_token = self.jwt.issue_reset_token(user.id)?;
        let record = VerificationToken::issue(
            user.id,
            sha256_hex(&reset_token),
            TokenPurpose::PasswordReset,
            self.reset_ttl_minutes,
        );
        self.store.replace_verification_tokens(record).await?;

        let outcome = async {
            let body = self.templates.password_reset(
                &user.full_name(),
                &reset_token,
                self.reset_ttl_minutes,
            )?;
            self.mailer
                .send(OutgoingEmail {
                    recipient: user.email.clone(),
                    subject: "Password Reset Request".to_string(),
                    body,
                })
                .await
        }
        .await;

        if let Err(e) = outcome {
            log::error!("reset email for user {} failed: {}", user.id, e);
            // Remove the digest so the user is not locked out of retrying
            // until the undelivered token expires.
            if let Err(e) = self
                .store
                .delete_verification_tokens_for_user(user.id, Some(TokenPurpose::PasswordReset))
                .await
            {
                log::warn!("failed to clear undelivered reset token: {}", e);
            }
            return Err(AuthError::Dependency(
                "password reset email could not be delivered".to_string(),
            ));
        }

        log::info!("password reset issued for user {}", user.id);
        Ok(())
    }

    /// Consume a reset token: signature, persisted digest and expiry must
    /// all hold. On success the password hash is replaced and every reset
    /// token for the user is deleted, making the token single-use.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AuthResult<()> {
        if new_password.len() < 8 || new_password.len() > 128 {
            return Err(AuthError::Validation(
                "password must be between 8 and 128 characters".to_string(),
            ));
        }

        let claims = self.jwt.decode_reset_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| {
            AuthError::InvalidCredential("invalid or expired reset token".to_string())
        })?;

        let record = self
            .store
            .find_live_verification_token(user_id, TokenPurpose::PasswordReset)
            .await?
            .ok_or_else(|| {
                AuthError::Expired("reset token is expired or invalid".to_string())
            })?;

        if record.code_hash != sha256_hex(token) {
            return Err(AuthError::InvalidCredential(
                "invalid or expired reset token".to_string(),
            ));
        }

        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| {
                AuthError::InvalidCredential("invalid or expired reset token".to_string())
            })?;

        let password_hash = hash_password(new_password)?;
        self.store.update_password_hash(user_id, &password_hash).await?;
        self.store
            .delete_verification_tokens_for_user(user_id, Some(TokenPurpose::PasswordReset))
            .await?;

        log::info!("password reset completed for user {}", user_id);

        // Confirmation is a courtesy; the reset has already happened.
        let confirmation = async {
            let body = self.templates.password_changed(&user.full_name())?;
            self.mailer
                .send(OutgoingEmail {
                    recipient: user.email.clone(),
                    subject: "Password Changed Successfully".to_string(),
                    body,
                })
                .await
        }
        .await;
        if let Err(e) = confirmation {
            log::warn!("failed to send password-change confirmation: {}", e);
        }

        Ok(())
    }
}
