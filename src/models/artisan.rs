//! Artisan Model
//!
//! Business profile attached 1:1 to a user with the `Artisan` role. Created
//! atomically with the owning user and cascade-deleted with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Verification state of an artisan business profile, independent of the
/// owning user's account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "artisan_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtisanStatus {
    PendingVerification,
    Verified,
    Rejected,
}

/// Artisan business profile
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Artisan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub business_name: String,
    pub business_license: String,
    pub tax_id: Option<String>,
    pub service_categories: Vec<String>,
    pub service_areas: Vec<String>,
    pub status: ArtisanStatus,
    pub rating: Option<f64>,
    pub total_ratings: i32,
    pub verification_date: Option<DateTime<Utc>>,
    pub insurance_info: Option<String>,
    pub working_hours: Option<String>,
    pub is_available: bool,
    pub max_job_distance: i32,
    pub hourly_rate: Option<f64>,
    pub description: Option<String>,
    pub years_of_experience: Option<i32>,
    pub qualifications: Vec<String>,
}

impl Artisan {
    /// Placeholder profile for an artisan created through OAuth, pending
    /// later completion of the business details. The license placeholder is
    /// keyed by user id because business licenses are unique.
    pub fn placeholder(user_id: Uuid, display_name: &str) -> Self {
        Artisan {
            id: Uuid::new_v4(),
            user_id,
            business_name: format!("{}'s Business", display_name),
            business_license: format!("PENDING-{}", user_id),
            tax_id: None,
            service_categories: vec!["General".to_string()],
            service_areas: vec!["Local".to_string()],
            status: ArtisanStatus::PendingVerification,
            rating: None,
            total_ratings: 0,
            verification_date: None,
            insurance_info: None,
            working_hours: None,
            is_available: true,
            max_job_distance: 50,
            hourly_rate: None,
            description: None,
            years_of_experience: None,
            qualifications: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_profiles_have_distinct_licenses() {
        let a = Artisan::placeholder(Uuid::new_v4(), "Ada Lovelace");
        let b = Artisan::placeholder(Uuid::new_v4(), "Ada Lovelace");

        assert_ne!(a.business_license, b.business_license);
        assert_eq!(a.business_name, "Ada Lovelace's Business");
        assert_eq!(a.status, ArtisanStatus::PendingVerification);
    }
}
