use async_trait::async_trait;

use crate::config::DbPool;
use crate::modules::auth::interface::{
    OtpChallengeRepository, Result, TokenRepository, UserRepository,
};
use crate::modules::auth::model::{OtpChallenge, TokenRecord, User};

// =============================================================================
// USERS
// =============================================================================

pub struct MySqlUserRepository {
    pool: DbPool,
}

impl MySqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for MySqlUserRepository {
    async fn create(&self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users
                (id, firstname, lastname, email, phone, password, password_salt,
                 verified, is_admin, active, deleted, deleted_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password)
        .bind(&user.password_salt)
        .bind(user.verified)
        .bind(user.is_admin)
        .bind(user.active)
        .bind(user.deleted)
        .bind(user.deleted_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = ? AND deleted = FALSE",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_one_by_id(&self, id: &str, is_admin: bool) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = ? AND is_admin = ? AND deleted = FALSE",
        )
        .bind(id)
        .bind(is_admin)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_one_by_email(&self, email: &str, is_admin: bool) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE LOWER(email) = LOWER(?) AND is_admin = ? AND deleted = FALSE",
        )
        .bind(email)
        .bind(is_admin)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn email_exists(&self, email: &str, is_admin: bool) -> Result<bool> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM users WHERE LOWER(email) = LOWER(?) AND is_admin = ? AND deleted = FALSE",
        )
        .bind(email)
        .bind(is_admin)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn set_verified(&self, id: &str, verified: bool) -> Result<()> {
        sqlx::query("UPDATE users SET verified = ?, updated_at = NOW(3) WHERE id = ?")
            .bind(verified)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn update_password(&self, id: &str, salt: &str, hash: &str) -> Result<()> {
        sqlx::query(
            "UPDATE users SET password_salt = ?, password = ?, updated_at = NOW(3) WHERE id = ?",
        )
        .bind(salt)
        .bind(hash)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// OTP CHALLENGES
// =============================================================================

/// One repository type serves both challenge stores; the login and
/// password-recovery flows are wired to different tables at startup.
pub struct MySqlOtpChallengeRepository {
    pool: DbPool,
    table: &'static str,
}

pub const LOGIN_OTP_TABLE: &str = "login_otps";
pub const RECOVER_PASSWORD_OTP_TABLE: &str = "recover_password_otps";

impl MySqlOtpChallengeRepository {
    pub fn new(pool: DbPool, table: &'static str) -> Self {
        Self { pool, table }
    }
}

#[async_trait]
impl OtpChallengeRepository for MySqlOtpChallengeRepository {
    async fn create(&self, challenge: &OtpChallenge) -> Result<()> {
        let query = format!(
            r#"
            INSERT INTO {} (id, otp, token, email, phone, exp, checked, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            self.table
        );

        sqlx::query(&query)
            .bind(&challenge.id)
            .bind(&challenge.otp)
            .bind(&challenge.token)
            .bind(&challenge.email)
            .bind(&challenge.phone)
            .bind(challenge.exp)
            .bind(challenge.checked)
            .bind(challenge.created_at)
            .bind(challenge.updated_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_last_by_email(&self, email: &str) -> Result<Option<OtpChallenge>> {
        let query = format!(
            "SELECT * FROM {} WHERE email = ? ORDER BY created_at DESC LIMIT 1",
            self.table
        );

        let challenge = sqlx::query_as::<_, OtpChallenge>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(challenge)
    }

    async fn get_by_otp_and_token(&self, otp: &str, token: &str) -> Result<Option<OtpChallenge>> {
        let query = format!("SELECT * FROM {} WHERE otp = ? AND token = ?", self.table);

        let challenge = sqlx::query_as::<_, OtpChallenge>(&query)
            .bind(otp)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(challenge)
    }

    async fn get_unchecked_by_token(&self, token: &str) -> Result<Option<OtpChallenge>> {
        let query = format!(
            "SELECT * FROM {} WHERE token = ? AND checked = FALSE",
            self.table
        );

        let challenge = sqlx::query_as::<_, OtpChallenge>(&query)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        Ok(challenge)
    }

    async fn mark_checked(&self, id: &str) -> Result<()> {
        let query = format!(
            "UPDATE {} SET checked = TRUE, updated_at = NOW(3) WHERE id = ?",
            self.table
        );

        sqlx::query(&query).bind(id).execute(&self.pool).await?;

        Ok(())
    }
}

// =============================================================================
// TOKEN RECORDS
// =============================================================================

pub struct MySqlTokenRepository {
    pool: DbPool,
}

impl MySqlTokenRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenRepository for MySqlTokenRepository {
    async fn upsert(&self, record: &TokenRecord) -> Result<()> {
        // Keyed on the (user_id, app_type) unique index; a new login for the
        // same client overwrites the previous session's tokens.
        sqlx::query(
            r#"
            INSERT INTO tokens
                (id, user_id, access_token, refresh_token, ip_address, app_type,
                 active, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                access_token = VALUES(access_token),
                refresh_token = VALUES(refresh_token),
                ip_address = VALUES(ip_address),
                active = VALUES(active),
                updated_at = VALUES(updated_at)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(&record.access_token)
        .bind(&record.refresh_token)
        .bind(&record.ip_address)
        .bind(&record.app_type)
        .bind(record.active)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_active_by_user_and_access_token(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<Option<TokenRecord>> {
        let record = sqlx::query_as::<_, TokenRecord>(
            "SELECT * FROM tokens WHERE user_id = ? AND access_token = ? AND active = TRUE",
        )
        .bind(user_id)
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get_active_by_user_and_refresh_token(
        &self,
        user_id: &str,
        refresh_token: &str,
    ) -> Result<Option<TokenRecord>> {
        let record = sqlx::query_as::<_, TokenRecord>(
            "SELECT * FROM tokens WHERE user_id = ? AND refresh_token = ? AND active = TRUE",
        )
        .bind(user_id)
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    async fn deactivate(&self, id: &str) -> Result<()> {
        sqlx::query("UPDATE tokens SET active = FALSE, updated_at = NOW(3) WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
