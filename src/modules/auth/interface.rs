use async_trait::async_trait;
use axum::{http::StatusCode, response::IntoResponse, Json};

use super::model::{OtpChallenge, TokenRecord, User};
use super::schema::ErrorBody;

// =============================================================================
// REPOSITORY TRAITS
// =============================================================================

pub type Result<T> = std::result::Result<T, AuthError>;

/// Credential store. Admin and regular accounts are disjoint namespaces keyed
/// by the same email column, so every lookup that authenticates someone takes
/// the admin flag. All getters filter soft-deleted rows implicitly.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: &User) -> Result<()>;
    async fn get_by_id(&self, id: &str) -> Result<Option<User>>;
    async fn get_one_by_id(&self, id: &str, is_admin: bool) -> Result<Option<User>>;
    async fn get_one_by_email(&self, email: &str, is_admin: bool) -> Result<Option<User>>;
    async fn email_exists(&self, email: &str, is_admin: bool) -> Result<bool>;
    async fn set_verified(&self, id: &str, verified: bool) -> Result<()>;
    async fn update_password(&self, id: &str, salt: &str, hash: &str) -> Result<()>;
}

/// Challenge store for one OTP purpose. The login and password-recovery flows
/// each get their own instance; the contract is identical.
#[async_trait]
pub trait OtpChallengeRepository: Send + Sync {
    async fn create(&self, challenge: &OtpChallenge) -> Result<()>;
    /// Most recent challenge for the email, consumed or not.
    async fn get_last_by_email(&self, email: &str) -> Result<Option<OtpChallenge>>;
    /// Both halves must match the same record.
    async fn get_by_otp_and_token(&self, otp: &str, token: &str) -> Result<Option<OtpChallenge>>;
    /// Unconsumed challenge by its exchange token, for OTP delivery.
    async fn get_unchecked_by_token(&self, token: &str) -> Result<Option<OtpChallenge>>;
    async fn mark_checked(&self, id: &str) -> Result<()>;
}

/// Session revocation store: the single active token pair per
/// (user, app type).
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Insert or overwrite, keyed on (user_id, app_type).
    async fn upsert(&self, record: &TokenRecord) -> Result<()>;
    async fn get_active_by_user_and_access_token(
        &self,
        user_id: &str,
        access_token: &str,
    ) -> Result<Option<TokenRecord>>;
    async fn get_active_by_user_and_refresh_token(
        &self,
        user_id: &str,
        refresh_token: &str,
    ) -> Result<Option<TokenRecord>>;
    async fn deactivate(&self, id: &str) -> Result<()>;
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Authentication error taxonomy. Every variant carries a stable numeric
/// code and a user-safe clean message; the `Display` output is the internal
/// diagnostic and may name accounts or fields.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("the request payload is invalid: {0}")]
    Validation(String),

    #[error("account [{0}] was not found")]
    AccountNotFound(String),

    #[error("account [{0}] is not verified")]
    AccountUnverified(String),

    #[error("account [{0}] is disabled")]
    AccountDisabled(String),

    #[error("the email address or password is incorrect")]
    InvalidCredentials,

    #[error("the otp or the exchange token is invalid")]
    ChallengeInvalid,

    #[error("the otp is expired")]
    ChallengeExpired,

    #[error("the exchange token is expired or already consumed")]
    ExchangeTokenInvalid,

    #[error("the refresh token is expired or invalid")]
    RefreshInvalid,

    #[error("the presented token is not a refresh token")]
    RefreshKindInvalid,

    #[error("the email verification token is invalid")]
    VerificationFailed,

    #[error("no bearer token was provided")]
    MissingBearer,

    #[error("the access token is invalid")]
    Unauthorized,

    #[error("the account is blocked")]
    AccountBlocked,

    #[error("the old password is incorrect")]
    WrongOldPassword,

    #[error("admin privileges are required")]
    AdminOnly,

    #[error("an account already exists with email [{0}]")]
    EmailTaken(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Stable numeric code, also used by API clients to branch on failures.
    pub fn code(&self) -> u32 {
        match self {
            Self::Validation(_) => 400_000,
            Self::ExchangeTokenInvalid | Self::RefreshInvalid => 400_036,
            Self::ChallengeInvalid => 400_058,
            Self::ChallengeExpired => 400_059,
            Self::RefreshKindInvalid => 400_060,
            Self::VerificationFailed => 400_069,
            Self::Unauthorized => 401_000,
            Self::WrongOldPassword => 401_002,
            Self::MissingBearer => 401_006,
            Self::InvalidCredentials => 401_007,
            Self::AdminOnly => 403_000,
            Self::AccountUnverified(_) => 403_002,
            Self::AccountDisabled(_) => 403_003,
            Self::AccountBlocked => 403_004,
            Self::AccountNotFound(_) => 404_016,
            Self::EmailTaken(_) => 409_001,
            Self::Database(_) | Self::Internal(_) => 500_000,
        }
    }

    /// Message safe to show to an end user; never interpolates identifiers.
    pub fn clean_message(&self) -> &'static str {
        match self {
            Self::Validation(_) => "The request payload is invalid",
            Self::AccountNotFound(_) => "The account was not found",
            Self::AccountUnverified(_) => "The account is not verified",
            Self::AccountDisabled(_) => "The account is disabled",
            Self::InvalidCredentials => "The email address or password is incorrect",
            Self::ChallengeInvalid => "The verification code is invalid",
            Self::ChallengeExpired => "The verification code is expired",
            Self::ExchangeTokenInvalid | Self::RefreshInvalid => {
                "The token is expired or invalid"
            }
            Self::RefreshKindInvalid => "The token is invalid",
            Self::VerificationFailed => "The verification failed",
            Self::MissingBearer => "An access token must be provided",
            Self::Unauthorized => "Access denied",
            Self::AccountBlocked => "The account is blocked",
            Self::WrongOldPassword => "The old password is incorrect",
            Self::AdminOnly => "You do not have the required permissions",
            Self::EmailTaken(_) => "An account already exists with this email address",
            Self::Database(_) | Self::Internal(_) => "An unexpected error occurred",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::ChallengeInvalid
            | Self::ChallengeExpired
            | Self::ExchangeTokenInvalid
            | Self::RefreshInvalid
            | Self::RefreshKindInvalid
            | Self::VerificationFailed => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials
            | Self::MissingBearer
            | Self::Unauthorized
            | Self::WrongOldPassword => StatusCode::UNAUTHORIZED,
            Self::AccountUnverified(_)
            | Self::AccountDisabled(_)
            | Self::AccountBlocked
            | Self::AdminOnly => StatusCode::FORBIDDEN,
            Self::AccountNotFound(_) => StatusCode::NOT_FOUND,
            Self::EmailTaken(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        // 5xx diagnostics stay in the logs, everything else is sent along to
        // help API integrators.
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "auth operation failed");
            None
        } else {
            Some(self.to_string())
        };

        let body = ErrorBody {
            code: self.code(),
            error: self.clean_message().to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}
