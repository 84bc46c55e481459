//! Validation Utilities
//!
//! Input validation and normalization for identity data.

use regex::Regex;
use std::sync::OnceLock;
use validator::ValidationError;

/// Validates email address format
pub fn validate_email(email: &str) -> bool {
    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    regex.is_match(email)
}

/// Normalizes an email address to lowercase with surrounding whitespace
/// removed. All store lookups go through this, which is what makes email
/// matching case-insensitive.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validates that a person name is non-empty, bounded, and contains only
/// letters, spaces, hyphens and apostrophes
pub fn validate_name(name: &str) -> bool {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.len() > 100 {
        return false;
    }

    static NAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = NAME_REGEX
        .get_or_init(|| Regex::new(r"^[a-zA-Z\s\-']+$").expect("Failed to compile name regex"));

    regex.is_match(trimmed)
}

/// Split an OAuth display name into (first name, last name).
///
/// A three-token name whose middle token ends in a period is treated as
/// "First M. Last" and the middle initial is dropped; otherwise the first
/// token is the first name and the remainder the last name.
pub fn split_display_name(display_name: &str) -> (String, String) {
    let parts: Vec<&str> = display_name.split_whitespace().collect();

    match parts.as_slice() {
        [first, middle, last] if middle.ends_with('.') => {
            (first.to_string(), last.to_string())
        }
        [] => (String::new(), String::new()),
        [only] => (only.to_string(), String::new()),
        [first, rest @ ..] => (first.to_string(), rest.join(" ")),
    }
}

/// Custom validator for email fields using the validator crate
pub fn email_validator(email: &str) -> Result<(), ValidationError> {
    if validate_email(email) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_email"))
    }
}

/// Custom validator for name fields using the validator crate
pub fn name_validator(name: &str) -> Result<(), ValidationError> {
    if validate_name(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_name"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com"));
        assert!(validate_email("test.user+tag@domain.co.uk"));
        assert!(!validate_email("invalid.email"));
        assert!(!validate_email("@domain.com"));
        assert!(!validate_email(""));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  USER@EXAMPLE.COM  "), "user@example.com");
        assert_eq!(normalize_email("Test@Domain.org"), "test@domain.org");
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("John Doe"));
        assert!(validate_name("Mary-Jane O'Connor"));
        assert!(!validate_name(""));
        assert!(!validate_name("John123"));
        assert!(!validate_name(&"a".repeat(101)));
    }

    #[test]
    fn split_plain_two_token_name() {
        assert_eq!(
            split_display_name("Ese Jonathan"),
            ("Ese".to_string(), "Jonathan".to_string())
        );
    }

    #[test]
    fn split_middle_initial_name() {
        assert_eq!(
            split_display_name("Ese O. Jonathan"),
            ("Ese".to_string(), "Jonathan".to_string())
        );
    }

    #[test]
    fn split_long_name_keeps_remainder_as_last() {
        assert_eq!(
            split_display_name("Anna Maria van der Berg"),
            ("Anna".to_string(), "Maria van der Berg".to_string())
        );
    }

    #[test]
    fn split_single_and_empty_names() {
        assert_eq!(split_display_name("Cher"), ("Cher".to_string(), String::new()));
        assert_eq!(split_display_name(""), (String::new(), String::new()));
    }
}
