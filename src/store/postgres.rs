//! PostgreSQL Credential Store
//!
//! Production implementation of [`CredentialStore`] on top of a SQLx
//! connection pool. Unique-constraint violations are mapped to
//! [`StoreError::UniqueViolation`] by constraint name so the service layer
//! can surface them as conflicts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    Artisan, ArtisanStatus, RefreshToken, TokenPurpose, UserRecord, UserStatus, VerificationToken,
};
use crate::store::{CredentialStore, StoreError, StoreResult, UserProfileUpdate};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone_number, \
     role, status, is_email_verified, profile_picture, address, city, state, zip_code, \
     created_at, updated_at";

const ARTISAN_COLUMNS: &str = "id, user_id, business_name, business_license, tax_id, \
     service_categories, service_areas, status, rating, total_ratings, verification_date, \
     insurance_info, working_hours, is_available, max_job_distance, hourly_rate, description, \
     years_of_experience, qualifications";

/// PostgreSQL-backed credential store
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Advisory-lock key for per-user serialization. Truncating the UUID to
    /// 64 bits is fine here; a collision only means two unrelated users
    /// briefly share a lock.
    fn user_lock_key(user_id: Uuid) -> i64 {
        user_id.as_u128() as i64
    }

    async fn insert_user<'e, E>(executor: E, user: &UserRecord) -> StoreResult<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, phone_number,
                               role, status, is_email_verified, profile_picture, address, city,
                               state, zip_code, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone_number)
        .bind(user.role)
        .bind(user.status)
        .bind(user.is_email_verified)
        .bind(&user.profile_picture)
        .bind(&user.address)
        .bind(&user.city)
        .bind(&user.state)
        .bind(&user.zip_code)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(executor)
        .await
        .map_err(map_unique_violation)?;

        Ok(())
    }

    async fn insert_artisan<'e, E>(executor: E, artisan: &Artisan) -> StoreResult<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO artisans (id, user_id, business_name, business_license, tax_id,
                                  service_categories, service_areas, status, rating,
                                  total_ratings, verification_date, insurance_info,
                                  working_hours, is_available, max_job_distance, hourly_rate,
                                  description, years_of_experience, qualifications)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, $19)
            "#,
        )
        .bind(artisan.id)
        .bind(artisan.user_id)
        .bind(&artisan.business_name)
        .bind(&artisan.business_license)
        .bind(&artisan.tax_id)
        .bind(&artisan.service_categories)
        .bind(&artisan.service_areas)
        .bind(artisan.status)
        .bind(artisan.rating)
        .bind(artisan.total_ratings)
        .bind(artisan.verification_date)
        .bind(&artisan.insurance_info)
        .bind(&artisan.working_hours)
        .bind(artisan.is_available)
        .bind(artisan.max_job_distance)
        .bind(artisan.hourly_rate)
        .bind(&artisan.description)
        .bind(artisan.years_of_experience)
        .bind(&artisan.qualifications)
        .execute(executor)
        .await
        .map_err(map_unique_violation)?;

        Ok(())
    }

    async fn insert_verification_token<'e, E>(
        executor: E,
        token: &VerificationToken,
    ) -> StoreResult<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO verification_tokens (id, user_id, code_hash, purpose, new_email,
                                             expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.code_hash)
        .bind(token.purpose)
        .bind(&token.new_email)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }
}

/// Map a constraint-name violation onto the field it protects
fn map_unique_violation(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        let field = match db_err.constraint() {
            Some("users_email_key") => Some("email"),
            Some("users_phone_number_key") => Some("phone number"),
            Some("artisans_business_license_key") => Some("business license"),
            Some("artisans_tax_id_key") => Some("tax id"),
            Some("refresh_tokens_token_key") => Some("refresh token"),
            _ => None,
        };
        if let Some(field) = field {
            return StoreError::UniqueViolation(field.to_string());
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create_user(&self, user: UserRecord) -> StoreResult<()> {
        Self::insert_user(&self.pool, &user).await
    }

    async fn create_account(
        &self,
        user: UserRecord,
        artisan: Option<Artisan>,
        token: Option<VerificationToken>,
    ) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        Self::insert_user(&mut *tx, &user).await?;
        if let Some(artisan) = &artisan {
            Self::insert_artisan(&mut *tx, artisan).await?;
        }
        if let Some(token) = &token {
            Self::insert_verification_token(&mut *tx, token).await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn list_users(&self) -> StoreResult<Vec<UserRecord>> {
        let users = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn activate_user(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users
             SET is_email_verified = TRUE, status = 'ACTIVE', updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn set_user_status(
        &self,
        id: Uuid,
        status: UserStatus,
    ) -> StoreResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET status = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> StoreResult<bool> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(password_hash)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_profile_picture(&self, id: Uuid, url: &str) -> StoreResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users SET profile_picture = $2, updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_user_profile(
        &self,
        id: Uuid,
        update: UserProfileUpdate,
    ) -> StoreResult<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "UPDATE users
             SET first_name = COALESCE($2, first_name),
                 last_name = COALESCE($3, last_name),
                 phone_number = COALESCE($4, phone_number),
                 email = COALESCE($5, email),
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(update.first_name)
        .bind(update.last_name)
        .bind(update.phone_number)
        .bind(update.email)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(user)
    }

    async fn delete_user(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_artisan_by_user(&self, user_id: Uuid) -> StoreResult<Option<Artisan>> {
        let artisan = sqlx::query_as::<_, Artisan>(&format!(
            "SELECT {ARTISAN_COLUMNS} FROM artisans WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(artisan)
    }

    async fn set_artisan_status(
        &self,
        id: Uuid,
        status: ArtisanStatus,
        verification_date: Option<DateTime<Utc>>,
    ) -> StoreResult<Option<Artisan>> {
        let artisan = sqlx::query_as::<_, Artisan>(&format!(
            "UPDATE artisans SET status = $2, verification_date = $3
             WHERE id = $1
             RETURNING {ARTISAN_COLUMNS}"
        ))
        .bind(id)
        .bind(status)
        .bind(verification_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(artisan)
    }

    async fn find_live_verification_token(
        &self,
        user_id: Uuid,
        purpose: TokenPurpose,
    ) -> StoreResult<Option<VerificationToken>> {
        let token = sqlx::query_as::<_, VerificationToken>(
            "SELECT id, user_id, code_hash, purpose, new_email, expires_at, created_at
             FROM verification_tokens
             WHERE user_id = $1 AND purpose = $2 AND expires_at > NOW()
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(user_id)
        .bind(purpose)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn replace_verification_tokens(&self, token: VerificationToken) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        // Serializes concurrent replacements for the same user so two
        // resends cannot each delete the other's fresh token.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(Self::user_lock_key(token.user_id))
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM verification_tokens WHERE user_id = $1 AND purpose = $2")
            .bind(token.user_id)
            .bind(token.purpose)
            .execute(&mut *tx)
            .await?;

        Self::insert_verification_token(&mut *tx, &token).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn delete_verification_token(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM verification_tokens WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_verification_tokens_for_user(
        &self,
        user_id: Uuid,
        purpose: Option<TokenPurpose>,
    ) -> StoreResult<u64> {
        let result = match purpose {
            Some(purpose) => {
                sqlx::query("DELETE FROM verification_tokens WHERE user_id = $1 AND purpose = $2")
                    .bind(user_id)
                    .bind(purpose)
                    .execute(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("DELETE FROM verification_tokens WHERE user_id = $1")
                    .bind(user_id)
                    .execute(&self.pool)
                    .await?
            }
        };

        Ok(result.rows_affected())
    }

    async fn create_refresh_token(&self, token: RefreshToken) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO refresh_tokens (id, user_id, token, expires_at, created_at, updated_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.token)
        .bind(token.expires_at)
        .bind(token.created_at)
        .bind(token.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(())
    }

    async fn find_refresh_token(&self, value: &str) -> StoreResult<Option<RefreshToken>> {
        let token = sqlx::query_as::<_, RefreshToken>(
            "SELECT id, user_id, token, expires_at, created_at, updated_at
             FROM refresh_tokens WHERE token = $1",
        )
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn rotate_refresh_token(
        &self,
        id: Uuid,
        current_value: &str,
        new_value: &str,
        new_expires_at: DateTime<Utc>,
    ) -> StoreResult<bool> {
        // The WHERE clause carries the old value, so of two concurrent
        // rotations of the same token exactly one updates a row.
        let result = sqlx::query(
            "UPDATE refresh_tokens
             SET token = $3, expires_at = $4, updated_at = NOW()
             WHERE id = $1 AND token = $2",
        )
        .bind(id)
        .bind(current_value)
        .bind(new_value)
        .bind(new_expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_refresh_token(&self, value: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(value)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_refresh_tokens_for_user(&self, user_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired_verification_tokens(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM verification_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_expired_refresh_tokens(&self) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_stale_unverified_users(
        &self,
        created_before: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result = sqlx::query(
            "DELETE FROM users WHERE is_email_verified = FALSE AND created_at < $1",
        )
        .bind(created_before)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
