use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::model::{OtpChallenge, User};

// =============================================================================
// REGISTER
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "firstname is required"))]
    pub firstname: String,
    #[validate(length(min = 1, message = "lastname is required"))]
    pub lastname: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "phone is too short"))]
    pub phone: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

// =============================================================================
// LOGIN
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

/// The issued token pair. Expiries are absolute epoch-millisecond timestamps.
#[derive(Debug, Serialize)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub access_expires_at: i64,
    pub refresh_token: String,
    pub refresh_expires_at: i64,
    pub token_type: &'static str,
    pub scope: &'static str,
}

// =============================================================================
// OTP CHALLENGES
// =============================================================================

/// Issued challenge, as shown to the caller. Excludes the OTP code itself:
/// the code only ever travels by email, this response carries the exchange
/// token plus masked hints about where the code went.
#[derive(Debug, Serialize)]
pub struct OtpChallengeResponse {
    pub token: String,
    pub exp: DateTime<Utc>,
    pub email: String,
    pub phone: String,
}

impl From<&OtpChallenge> for OtpChallengeResponse {
    fn from(challenge: &OtpChallenge) -> Self {
        Self {
            token: challenge.token.clone(),
            exp: challenge.exp,
            email: mask_email(&challenge.email),
            phone: mask_phone(&challenge.phone),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendOtpRequest {
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateOtpRequest {
    #[validate(length(equal = 6, message = "otp must be 6 digits"))]
    pub otp: String,
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
}

// =============================================================================
// REFRESH TOKEN
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RefreshTokenRequest {
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
}

// =============================================================================
// PASSWORD RECOVERY
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct RecoverPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RecoverPasswordValidateRequest {
    #[validate(length(equal = 6, message = "otp must be 6 digits"))]
    pub otp: String,
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

// =============================================================================
// EMAIL VERIFICATION
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyEmailQuery {
    #[validate(length(min = 1, message = "token is required"))]
    pub token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResendVerificationRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

// =============================================================================
// ACCOUNT
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePasswordRequest {
    #[validate(length(min = 1, message = "old_password is required"))]
    pub old_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Public view of an account: everything except the credential material.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileData {
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub verified: bool,
    pub is_admin: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for ProfileData {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            firstname: user.firstname.clone(),
            lastname: user.lastname.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            verified: user.verified,
            is_admin: user.is_admin,
            active: user.active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: u32,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EmptyResponse {
    pub status: &'static str,
}

impl EmptyResponse {
    pub fn ok() -> Self {
        Self { status: "ok" }
    }
}

// =============================================================================
// MASKING
// =============================================================================

/// `johndoe@mail.com` -> `jo*****@mail.com`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let visible: String = local.chars().take(2).collect();
            format!("{visible}*****@{domain}")
        }
        None => "*****".to_string(),
    }
}

/// `+22890112233` -> `+2289****33`
pub fn mask_phone(phone: &str) -> String {
    let chars: Vec<char> = phone.chars().collect();
    if chars.len() < 8 {
        return "****".to_string();
    }
    let head: String = chars[..5].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{head}****{tail}")
}
