//! Configuration Module
//!
//! Environment-driven configuration for the identity service: database,
//! token lifetimes, email transport and the cleanup schedule.

use crate::database::DatabaseConfig;

/// Environment variable helpers
pub mod env {
    use std::env;

    /// Get environment variable as string with default
    pub fn get_string(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get environment variable as u16 with default
    pub fn get_u16(key: &str, default: u16) -> u16 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as u64 with default
    pub fn get_u64(key: &str, default: u64) -> u64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Get environment variable as i64 with default
    pub fn get_i64(key: &str, default: i64) -> i64 {
        env::var(key)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Check if environment variable is set
    pub fn is_set(key: &str) -> bool {
        env::var(key).is_ok()
    }

    /// Get required environment variable or panic
    pub fn get_required(key: &str) -> String {
        env::var(key).unwrap_or_else(|_| panic!("Required environment variable {} is not set", key))
    }
}

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub email: EmailConfig,
    pub verification: VerificationConfig,
    pub cleanup: CleanupConfig,
}

/// Signed-token configuration and refresh lifetime
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC secret for access and reset tokens
    pub secret: String,
    pub access_ttl_minutes: i64,
    /// Opaque refresh-token lifetime
    pub refresh_ttl_days: i64,
    pub reset_ttl_minutes: i64,
}

/// Email verification settings
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    /// How long an emailed code stays valid
    pub code_ttl_minutes: i64,
}

/// Background maintenance settings
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    pub interval_seconds: u64,
    /// Grace period before an unverified account is reclaimed
    pub unverified_max_age_hours: i64,
}

/// SMTP transport settings plus the frontend base URL used in email links
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_name: String,
    pub from_email: String,
    pub frontend_base_url: String,
}

impl JwtConfig {
    pub fn from_env() -> Self {
        Self {
            secret: env::get_required("JWT_SECRET"),
            access_ttl_minutes: env::get_i64("JWT_ACCESS_TTL_MINUTES", 60),
            refresh_ttl_days: env::get_i64("REFRESH_TOKEN_TTL_DAYS", 30),
            reset_ttl_minutes: env::get_i64("RESET_TOKEN_TTL_MINUTES", 10),
        }
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl_minutes: env::get_i64("VERIFICATION_CODE_TTL_MINUTES", 10),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_seconds: env::get_u64("CLEANUP_INTERVAL_SECONDS", 3600),
            unverified_max_age_hours: env::get_i64("UNVERIFIED_MAX_AGE_HOURS", 24),
        }
    }
}

impl EmailConfig {
    pub fn from_env() -> Self {
        Self {
            smtp_host: env::get_required("SMTP_HOST"),
            smtp_port: env::get_u16("SMTP_PORT", 587),
            smtp_username: env::get_required("SMTP_USERNAME"),
            smtp_password: env::get_required("SMTP_PASSWORD"),
            from_name: env::get_string("SMTP_FROM_NAME", "Artisan Marketplace"),
            from_email: env::get_required("SMTP_FROM_EMAIL"),
            frontend_base_url: env::get_string("FRONTEND_URL", "http://localhost:5173"),
        }
    }
}

impl AppConfig {
    /// Load the complete configuration from the environment
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = Self {
            database: DatabaseConfig::from_env()?,
            jwt: JwtConfig::from_env(),
            email: EmailConfig::from_env(),
            verification: VerificationConfig::default(),
            cleanup: CleanupConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Sanity-check the loaded values
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.jwt.secret.is_empty() {
            return Err("JWT secret cannot be empty".into());
        }
        if self.jwt.access_ttl_minutes <= 0 {
            return Err("access token lifetime must be positive".into());
        }
        if self.jwt.refresh_ttl_days <= 0 {
            return Err("refresh token lifetime must be positive".into());
        }
        if self.jwt.reset_ttl_minutes <= 0 {
            return Err("reset token lifetime must be positive".into());
        }
        if self.verification.code_ttl_minutes <= 0 {
            return Err("verification code lifetime must be positive".into());
        }
        if self.cleanup.interval_seconds == 0 {
            return Err("cleanup interval must be greater than 0".into());
        }
        if self.database.max_connections == 0 {
            return Err("database max_connections must be greater than 0".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_helpers_fall_back_to_defaults() {
        assert_eq!(env::get_u16("NONEXISTENT_U16", 42), 42);
        assert_eq!(env::get_i64("NONEXISTENT_I64", -7), -7);
        assert_eq!(env::get_string("NONEXISTENT_STRING", "default"), "default");
        assert!(!env::is_set("NONEXISTENT_FLAG"));
    }

    #[test]
    fn validation_catches_bad_lifetimes() {
        let config = AppConfig {
            database: DatabaseConfig {
                url: "postgresql://localhost/identity".to_string(),
                ..DatabaseConfig::default()
            },
            jwt: JwtConfig {
                secret: "secret".to_string(),
                access_ttl_minutes: 0,
                refresh_ttl_days: 30,
                reset_ttl_minutes: 10,
            },
            email: EmailConfig {
                smtp_host: "localhost".to_string(),
                smtp_port: 587,
                smtp_username: "u".to_string(),
                smtp_password: "p".to_string(),
                from_name: "Test".to_string(),
                from_email: "noreply@x.com".to_string(),
                frontend_base_url: "http://localhost:5173".to_string(),
            },
            verification: VerificationConfig {
                code_ttl_minutes: 10,
            },
            cleanup: CleanupConfig {
                interval_seconds: 3600,
                unverified_max_age_hours: 24,
            },
        };

        assert!(config.validate().is_err());
    }
}
