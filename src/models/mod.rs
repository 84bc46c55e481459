//! Data Models
//!
//! Identity records, token records, claim shapes and request payloads used
//! throughout the service.

pub mod artisan;
pub mod auth;
pub mod oauth;
pub mod requests;
pub mod token;
pub mod user;

// Re-export commonly used types
pub use artisan::{Artisan, ArtisanStatus};
pub use auth::{AccessTokenClaims, AuthenticatedSession, ResetTokenClaims, TokenPair};
pub use oauth::OAuthProfile;
pub use requests::*;
pub use token::{RefreshToken, TokenPurpose, VerificationToken};
pub use user::{User, UserRecord, UserRole, UserStatus};
