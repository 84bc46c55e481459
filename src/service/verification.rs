//! Verification Service
//!
//! Registration and email verification: creates pending accounts, issues
//! hashed one-time codes, and promotes accounts to active on successful
//! verification. Email dispatch failure during registration rolls the whole
//! registration back; the periodic cleanup sweep is the backstop if the
//! rollback itself fails.

use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::models::{
    Artisan, ArtisanRegisterRequest, ArtisanStatus, RegisterRequest, RegistrationReceipt,
    TokenPurpose, User, UserRecord, UserRole, UserStatus, VerificationToken,
};
use crate::service::email::{EmailDispatcher, EmailTemplates, OutgoingEmail};
use crate::store::CredentialStore;
use crate::utils::error::{AuthError, AuthResult};
use crate::utils::security::{generate_verification_code, hash_password, verify_password};
use crate::utils::validation::normalize_email;

/// Orchestrates registration, OTP issuance and verification consumption
pub struct VerificationService {
    store: Arc<dyn CredentialStore>,
    mailer: Arc<dyn EmailDispatcher>,
    templates: Arc<EmailTemplates>,
    /// Verification code lifetime in minutes
    code_ttl_minutes: i64,
}

impl VerificationService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        mailer: Arc<dyn EmailDispatcher>,
        templates: Arc<EmailTemplates>,
        code_ttl_minutes: i64,
    ) -> Self {
        Self {
            store,
            mailer,
            templates,
            code_ttl_minutes,
        }
    }

    /// Register a customer account.
    ///
    /// The account is created pending and unverified, with a hashed
    /// six-digit code stored alongside it and the plaintext code emailed to
    /// the address on file.
    pub async fn register(&self, request: RegisterRequest) -> AuthResult<RegistrationReceipt> {
        request.validate()?;

        match request.role.unwrap_or(UserRole::Customer) {
            UserRole::Customer => {}
            UserRole::Admin => {
                return Err(AuthError::Validation(
                    "admin accounts cannot be self-registered".to_string(),
                ))
            }
            UserRole::Artisan => {
                return Err(AuthError::Validation(
                    "artisan accounts must register through artisan registration".to_string(),
                ))
            }
        }

        let email = normalize_email(&request.email);
        self.ensure_email_unclaimed(&email).await?;

        let password_hash = hash_password(&request.password)?;
        let user = new_pending_user(
            email.clone(),
            password_hash,
            request.first_name,
            request.last_name,
            request.phone_number,
            UserRole::Customer,
        );
        let user_id = user.id;

        let code = generate_verification_code();
        let token = VerificationToken::issue(
            user_id,
            hash_password(&code)?,
            TokenPurpose::EmailVerification,
            self.code_ttl_minutes,
        );

        self.store.create_account(user, None, Some(token)).await?;
        log::info!("registered pending user {}", user_id);

        self.send_code_or_roll_back(user_id, &email, &code, "Verify Your Email")
            .await?;

        Ok(RegistrationReceipt {
            user_id,
            email,
            artisan_id: None,
        })
    }

    /// Register an artisan account: the user row, the business profile and
    /// the verification token are created in one atomic step.
    pub async fn register_artisan(
        &self,
        request: ArtisanRegisterRequest,
    ) -> AuthResult<RegistrationReceipt> {
        request.validate()?;

        let email = normalize_email(&request.email);
        self.ensure_email_unclaimed(&email).await?;

        let password_hash = hash_password(&request.password)?;
        let mut user = new_pending_user(
            email.clone(),
            password_hash,
            request.first_name,
            request.last_name,
            request.phone_number,
            UserRole::Artisan,
        );
        user.address = request.address;
        user.city = request.city;
        user.state = request.state;
        user.zip_code = request.zip_code;
        let user_id = user.id;

        let artisan = Artisan {
            id: Uuid::new_v4(),
            user_id,
            business_name: request.business_name,
            business_license: request.business_license,
            tax_id: request.tax_id,
            service_categories: request.service_categories,
            service_areas: request.service_areas,
            status: ArtisanStatus::PendingVerification,
            rating: None,
            total_ratings: 0,
            verification_date: None,
            insurance_info: request.insurance_info,
            working_hours: request.working_hours,
            is_available: true,
            max_job_distance: request.max_job_distance.unwrap_or(50),
            hourly_rate: request.hourly_rate,
            description: request.description,
            years_of_experience: request.years_of_experience,
            qualifications: request.qualifications.unwrap_or_default(),
        };
        let artisan_id = artisan.id;

        let code = generate_verification_code();
        let token = VerificationToken::issue(
            user_id,
            hash_password(&code)?,
            TokenPurpose::EmailVerification,
            self.code_ttl_minutes,
        );

        self.store
            .create_account(user, Some(artisan), Some(token))
            .await?;
        log::info!("registered pending artisan {}", user_id);

        self.send_code_or_roll_back(user_id, &email, &code, "Verify Your Artisan Account")
            .await?;

        Ok(RegistrationReceipt {
            user_id,
            email,
            artisan_id: Some(artisan_id),
        })
    }

    /// Consume a verification code: on match the account becomes active and
    /// verified and the token is deleted. A mismatched code leaves the token
    /// in place so the user can retry until it expires.
    pub async fn verify(&self, user_id: Uuid, code: &str) -> AuthResult<User> {
        let token = self
            .store
            .find_live_verification_token(user_id, TokenPurpose::EmailVerification)
            .await?
            .ok_or_else(|| {
                AuthError::Expired("verification code is expired or invalid".to_string())
            })?;

        if !verify_password(code, &token.code_hash)? {
            return Err(AuthError::InvalidCredential(
                "invalid verification code".to_string(),
            ));
        }

        let user = self
            .store
            .activate_user(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".to_string()))?;

        self.store.delete_verification_token(token.id).await?;
        log::info!("user {} verified and activated", user_id);

        // Verification already succeeded; a failed confirmation email must
        // not undo it.
        if let Err(e) = self.send_verification_success(&user.email).await {
            log::warn!(
                "failed to send verification confirmation to {}: {}",
                user.email,
                e
            );
        }

        Ok(user.into())
    }

    /// Invalidate any outstanding codes for the user and issue a fresh one.
    /// The replacement is serialized per user by the store, so concurrent
    /// resends cannot strand the user without a live code.
    pub async fn resend_code(&self, user_id: Uuid) -> AuthResult<()> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::NotFound("user not found".to_string()))?;

        let code = generate_verification_code();
        let token = VerificationToken::issue(
            user_id,
            hash_password(&code)?,
            TokenPurpose::EmailVerification,
            self.code_ttl_minutes,
        );

        self.store.replace_verification_tokens(token).await?;

        let body = self.templates.verification_code(&code, self.code_ttl_minutes)?;
        self.mailer
            .send(OutgoingEmail {
                recipient: user.email.clone(),
                subject: "Verify Your Email".to_string(),
                body,
            })
            .await?;

        log::info!("verification code reissued for user {}", user_id);
        Ok(())
    }

    /// Registration rejects an email that belongs to a verified account or
    /// to a pending account holding a live code. A pending account whose
    /// code has expired still rejects, matching the original contract; the
    /// cleanup sweep eventually reclaims it.
    async fn ensure_email_unclaimed(&self, email: &str) -> AuthResult<()> {
        if let Some(existing) = self.store.find_user_by_email(email).await? {
            let live_token = self
                .store
                .find_live_verification_token(existing.id, TokenPurpose::EmailVerification)
                .await?;

            if live_token.is_some() {
                return Err(AuthError::Conflict(
                    "a valid verification code already exists; use it or wait for it to expire"
                        .to_string(),
                ));
            }
            return Err(AuthError::Conflict(
                "an account with this email already exists".to_string(),
            ));
        }
        Ok(())
    }

    async fn send_code_or_roll_back(
        &self,
        user_id: Uuid,
        email: &str,
        code: &str,
        subject: &str,
    ) -> AuthResult<()> {
        let outcome = async {
            let body = self.templates.verification_code(code, self.code_ttl_minutes)?;
            self.mailer
                .send(OutgoingEmail {
                    recipient: email.to_string(),
                    subject: subject.to_string(),
                    body,
                })
                .await
        }
        .await;

        if let Err(e) = outcome {
            log::error!(
                "verification email for user {} failed, rolling back registration: {}",
                user_id,
                e
            );
            self.roll_back_registration(user_id).await;
            return Err(AuthError::Dependency(
                "verification email could not be delivered".to_string(),
            ));
        }
        Ok(())
    }

    /// Best-effort compensating delete of a registration whose verification
    /// email never went out. Failures are logged, not propagated; the
    /// periodic cleanup sweep reclaims anything left behind.
    async fn roll_back_registration(&self, user_id: Uuid) {
        if let Err(e) = self
            .store
            .delete_verification_tokens_for_user(user_id, None)
            .await
        {
            log::warn!("rollback: failed to delete tokens for {}: {}", user_id, e);
        }
        if let Err(e) = self.store.delete_refresh_tokens_for_user(user_id).await {
            log::warn!(
                "rollback: failed to delete refresh tokens for {}: {}",
                user_id,
                e
            );
        }

        match self.store.find_user_by_id(user_id).await {
            Ok(Some(user)) if !user.is_email_verified => {
                if let Err(e) = self.store.delete_user(user_id).await {
                    log::warn!("rollback: failed to delete user {}: {}", user_id, e);
                }
            }
            Ok(_) => {}
            Err(e) => log::warn!("rollback: failed to look up user {}: {}", user_id, e),
        }
    }

    async fn send_verification_success(&self, email: &str) -> AuthResult<()> {
        let body = self.templates.verification_success()?;
        self.mailer
            .send(OutgoingEmail {
                recipient: email.to_string(),
                subject: "Email Verification Successful".to_string(),
                body,
            })
            .await?;
        Ok(())
    }
}

fn new_pending_user(
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone_number: Option<String>,
    role: UserRole,
) -> UserRecord {
    let now = chrono::Utc::now();
    UserRecord {
        id: Uuid::new_v4(),
        email,
        password_hash,
        first_name,
        last_name,
        phone_number,
        role,
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
