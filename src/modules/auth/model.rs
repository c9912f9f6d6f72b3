use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub password_salt: String,
    pub verified: bool,
    pub is_admin: bool,
    pub active: bool,
    pub deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single-use, time-boxed proof-of-possession record backing the OTP
/// step-up flows. The numeric `otp` travels by email; the opaque `token` is
/// the bearer for the multi-step exchange. Both must be presented together.
#[derive(Debug, Clone, FromRow)]
pub struct OtpChallenge {
    pub id: String,
    pub otp: String,
    pub token: String,
    pub email: String,
    pub phone: String,
    pub exp: DateTime<Utc>,
    pub checked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OtpChallenge {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.exp
    }

    /// Pending means reusable: not consumed and not past its expiry.
    pub fn is_pending_at(&self, now: DateTime<Utc>) -> bool {
        !self.checked && !self.is_expired_at(now)
    }
}

/// The currently-valid token pair for one (user, client app type). Overwritten
/// on every issuance, so at most one session per client type is ever valid
/// while revocation tracking is enabled.
#[derive(Debug, Clone, FromRow)]
pub struct TokenRecord {
    pub id: String,
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub ip_address: String,
    pub app_type: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
