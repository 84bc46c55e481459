//! Service Layer
//!
//! Business logic for the identity subsystem. Every service receives its
//! collaborators (credential store, mailer, token issuer) through its
//! constructor; there is no ambient global state.

pub mod admin;
pub mod cleanup;
pub mod email;
pub mod jwt;
pub mod oauth;
pub mod password_reset;
pub mod session;
pub mod verification;

// Re-export services
pub use admin::AdminService;
pub use cleanup::{CleanupService, SweepReport};
pub use email::{EmailDispatcher, EmailTemplates, OutgoingEmail, RecordingMailer, SmtpMailer};
pub use jwt::JwtService;
pub use oauth::OAuthService;
pub use password_reset::PasswordResetService;
pub use session::SessionService;
pub use verification::VerificationService;
