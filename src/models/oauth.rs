//! OAuth Models
//!
//! Concrete profile type handed to the identity linker. Provider payloads
//! are validated into this shape at the boundary; nothing dynamically typed
//! reaches the services.

use serde::{Deserialize, Serialize};

/// Normalized identity profile from an external OAuth provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthProfile {
    /// Provider name, e.g. "google"
    pub provider: String,
    /// Provider-scoped subject identifier
    pub provider_id: String,
    pub display_name: String,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    /// Primary email as reported by the provider; linking fails without one
    pub email: Option<String>,
    /// First photo URL, if any
    pub photo_url: Option<String>,
}

impl OAuthProfile {
    /// Resolve (first name, last name) from the structured name fields,
    /// falling back to splitting the display name.
    pub fn resolve_names(&self) -> (String, String) {
        match (&self.given_name, &self.family_name) {
            (Some(given), Some(family)) => (given.clone(), family.clone()),
            (Some(given), None) => (given.clone(), String::new()),
            _ => crate::utils::validation::split_display_name(&self.display_name),
        }
    }
}
