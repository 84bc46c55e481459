//! Security Utilities
//!
//! Password hashing, verification-code and refresh-token generation, and
//! expiry helpers.

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use rand::{distributions::Alphanumeric, Rng};
use sha2::{Digest, Sha256};

/// Number of digits in an email verification code
pub const VERIFICATION_CODE_LENGTH: u32 = 6;

/// Length of the opaque refresh-token value in characters
pub const REFRESH_TOKEN_LENGTH: usize = 64;

/// Hash a password (or verification code) using bcrypt
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    hash(password, DEFAULT_COST)
}

/// Verify a password (or verification code) against its bcrypt hash
pub fn verify_password(password: &str, hashed: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hashed)
}

/// Generate a numeric verification code of [`VERIFICATION_CODE_LENGTH`]
/// digits, uniformly distributed over the whole space with leading zeros
/// preserved.
pub fn generate_verification_code() -> String {
    let bound = 10u32.pow(VERIFICATION_CODE_LENGTH);
    let code = rand::thread_rng().gen_range(0..bound);
    format!("{:0width$}", code, width = VERIFICATION_CODE_LENGTH as usize)
}

/// Generate an opaque, cryptographically random refresh-token value.
///
/// Refresh tokens are looked up by exact value and never decoded, so the
/// value carries no structure at all.
pub fn generate_refresh_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(REFRESH_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// SHA-256 digest of a token value as lowercase hex, used to store reset
/// tokens without keeping the raw value.
pub fn sha256_hex(data: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Expiration timestamp a given number of minutes from now
pub fn expiry_in_minutes(minutes: i64) -> DateTime<Utc> {
    Utc::now() + Duration::minutes(minutes)
}

/// Check whether a timestamp lies in the past
pub fn is_expired(expires_at: DateTime<Utc>) -> bool {
    Utc::now() > expires_at
}
