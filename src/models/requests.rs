//! Request and Response Models
//!
//! Input payloads for the identity services with validation, plus the small
//! receipt types they return.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::user::UserRole;
use crate::utils::validation::{email_validator, name_validator};

/// Request payload for customer registration
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address (unique, case-insensitive)
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    /// Plaintext password (8-128 characters)
    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub password: String,

    #[validate(custom(function = "name_validator"))]
    pub first_name: String,

    #[validate(custom(function = "name_validator"))]
    pub last_name: String,

    /// Optional phone number (unique when present)
    pub phone_number: Option<String>,

    /// Requested role. Defaults to `Customer`; `Admin` is rejected (admin
    /// creation is a separate privileged operation) and `Artisan` must go
    /// through artisan registration so the business profile is created
    /// atomically.
    pub role: Option<UserRole>,
}

/// Request payload for artisan registration: the customer fields plus the
/// business profile created atomically with the account
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ArtisanRegisterRequest {
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub password: String,

    #[validate(custom(function = "name_validator"))]
    pub first_name: String,

    #[validate(custom(function = "name_validator"))]
    pub last_name: String,

    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip_code: Option<String>,

    #[validate(length(min = 1, max = 255, message = "Business name is required"))]
    pub business_name: String,

    #[validate(length(min = 1, max = 255, message = "Business license is required"))]
    pub business_license: String,

    pub tax_id: Option<String>,

    #[validate(length(min = 1, message = "At least one service category is required"))]
    pub service_categories: Vec<String>,

    #[validate(length(min = 1, message = "At least one service area is required"))]
    pub service_areas: Vec<String>,

    pub description: Option<String>,
    pub hourly_rate: Option<f64>,
    pub years_of_experience: Option<i32>,
    pub qualifications: Option<Vec<String>>,
    pub insurance_info: Option<String>,
    pub working_hours: Option<String>,
    pub max_job_distance: Option<i32>,
}

/// Request payload for password login
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password cannot be empty"))]
    pub password: String,
}

/// Request payload for creating a sub-admin (privileged path; the account is
/// born active and verified)
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AdminCreateRequest {
    #[validate(custom(function = "email_validator"))]
    pub email: String,

    #[validate(length(
        min = 8,
        max = 128,
        message = "Password must be between 8 and 128 characters"
    ))]
    pub password: String,

    #[validate(custom(function = "name_validator"))]
    pub first_name: String,

    #[validate(custom(function = "name_validator"))]
    pub last_name: String,

    pub phone_number: Option<String>,
}

/// Request payload for updating an admin profile
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AdminUpdateRequest {
    #[validate(custom(function = "name_validator"))]
    pub first_name: Option<String>,

    #[validate(custom(function = "name_validator"))]
    pub last_name: Option<String>,

    pub phone_number: Option<String>,

    #[validate(custom(function = "email_validator"))]
    pub email: Option<String>,
}

/// Receipt returned by registration: enough to drive the verification step,
/// nothing more
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationReceipt {
    pub user_id: Uuid,
    pub email: String,
    /// Present for artisan registrations
    pub artisan_id: Option<Uuid>,
}
