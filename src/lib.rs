//! Identity Service Library
//!
//! Identity and credential-lifecycle backend for a two-sided artisan
//! marketplace: registration with email-verification codes, password login,
//! JWT access tokens, opaque rotating refresh tokens, password resets, OAuth
//! identity linking, and the account status state machine that gates all of
//! it.
//!
//! # Features
//!
//! - **Verified registration**: accounts are created pending with a hashed
//!   six-digit code emailed to the user; email dispatch failure rolls the
//!   registration back
//! - **Session lifecycle**: short-lived signed access tokens plus opaque
//!   refresh tokens rotated in place on every use, so a refresh token is
//!   single-use
//! - **Password resets**: signed, time-boxed tokens persisted as digests and
//!   deleted on consumption
//! - **OAuth linking**: find-or-create by email with a concrete, validated
//!   profile type
//! - **Pluggable persistence**: every flow talks to a `CredentialStore`
//!   trait; PostgreSQL in production, an in-memory double in tests
//! - **Background maintenance**: periodic sweeps reclaim expired tokens and
//!   abandoned unverified accounts
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use identity_service::{
//!     config::AppConfig,
//!     models::RegisterRequest,
//!     service::{EmailTemplates, JwtService, SessionService, SmtpMailer, VerificationService},
//!     store::PgCredentialStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let pool = config.database.create_pool().await?;
//!
//!     let store = Arc::new(PgCredentialStore::new(pool));
//!     let mailer = Arc::new(SmtpMailer::new(&config.email)?);
//!     let templates = Arc::new(EmailTemplates::new(&config.email.frontend_base_url)?);
//!     let jwt = JwtService::new(
//!         &config.jwt.secret,
//!         config.jwt.access_ttl_minutes,
//!         config.jwt.reset_ttl_minutes,
//!     );
//!
//!     let verification = VerificationService::new(
//!         store.clone(),
//!         mailer,
//!         templates,
//!         config.verification.code_ttl_minutes,
//!     );
//!     let sessions = SessionService::new(store, jwt, config.jwt.refresh_ttl_days);
//!
//!     let receipt = verification
//!         .register(RegisterRequest {
//!             email: "ada@example.com".to_string(),
//!             password: "SecurePass123!".to_string(),
//!             first_name: "Ada".to_string(),
//!             last_name: "Lovelace".to_string(),
//!             phone_number: None,
//!             role: None,
//!         })
//!         .await?;
//!     println!("verification code sent to {}", receipt.email);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Models**: identity records, token records and request payloads
//! - **Store**: the persistence seam ([`store::CredentialStore`]) with
//!   Postgres and in-memory implementations
//! - **Services**: verification, sessions, password reset, OAuth linking,
//!   admin operations and cleanup
//! - **Utils**: error taxonomy, crypto primitives, validation

/// Configuration management
pub mod config;

/// Database connection management
pub mod database;

/// Data models and request/response structures
pub mod models;

/// Business logic services
pub mod service;

/// Persistence seam and its implementations
pub mod store;

/// Shared utilities for security, validation, and error handling
pub mod utils;

// Re-export commonly used types for convenient access
pub use models::{
    AccessTokenClaims, AdminCreateRequest, AdminUpdateRequest, Artisan, ArtisanRegisterRequest,
    ArtisanStatus, AuthenticatedSession, LoginRequest, OAuthProfile, RefreshToken,
    RegisterRequest, RegistrationReceipt, ResetTokenClaims, TokenPair, TokenPurpose, User,
    UserRecord, UserRole, UserStatus, VerificationToken,
};
pub use service::{
    AdminService, CleanupService, EmailDispatcher, EmailTemplates, JwtService, OAuthService,
    OutgoingEmail, PasswordResetService, SessionService, SmtpMailer, SweepReport,
    VerificationService,
};
pub use store::{CredentialStore, MemoryCredentialStore, PgCredentialStore, StoreError};
pub use utils::error::{AuthError, AuthResult};

// Re-export database utilities for configuration
pub use database::{DatabaseConfig, DatabasePool};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
