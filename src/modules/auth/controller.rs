use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Extension, Json,
};
use std::sync::Arc;
use validator::Validate;

use crate::AppState;

use super::guard::CurrentUser;
use super::interface::Result;
use super::schema::{
    EmptyResponse, LoginRequest, OtpChallengeResponse, ProfileData, RecoverPasswordRequest,
    RecoverPasswordValidateRequest, RefreshTokenRequest, RegisterRequest, ResendVerificationRequest,
    SendOtpRequest, TokenPairResponse, UpdatePasswordRequest, ValidateOtpRequest, VerifyEmailQuery,
};
use super::service::{AuthOptions, ClientMeta, Credentials, RegisterInput};

const LANG_HEADER: &str = "x-lang";
const APP_TYPE_HEADER: &str = "x-app-type";
const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

// =============================================================================
// USER AUTH
// =============================================================================

pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ProfileData>)> {
    req.validate()?;

    let input = RegisterInput {
        firstname: req.firstname,
        lastname: req.lastname,
        email: req.email,
        phone: req.phone,
        password: req.password,
    };

    let profile = state.auth.register(input, &lang(&headers)).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn login_with_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<OtpChallengeResponse>> {
    req.validate()?;

    let challenge = state
        .auth
        .login_with_otp(&credentials(req), false)
        .await?;
    Ok(Json(OtpChallengeResponse::from(&challenge)))
}

pub async fn login_send_otp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SendOtpRequest>,
) -> Result<Json<EmptyResponse>> {
    req.validate()?;

    state.auth.send_login_otp(&req.token, &lang(&headers)).await?;
    Ok(Json(EmptyResponse::ok()))
}

pub async fn login_validate_otp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ValidateOtpRequest>,
) -> Result<Json<TokenPairResponse>> {
    req.validate()?;

    let outcome = state
        .auth
        .validate_login_otp(
            &req.otp,
            &req.token,
            &client_meta(&headers),
            AuthOptions {
                as_api: true,
                as_admin: false,
            },
        )
        .await?;
    Ok(Json(outcome.into_tokens()?))
}

pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPairResponse>> {
    req.validate()?;

    let tokens = state
        .auth
        .refresh_token(&req.token, &client_meta(&headers), false)
        .await?;
    Ok(Json(tokens))
}

pub async fn resend_verification_email(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ResendVerificationRequest>,
) -> Result<Json<EmptyResponse>> {
    req.validate()?;

    state
        .auth
        .resend_verification_email(&req.email, &lang(&headers))
        .await?;
    Ok(Json(EmptyResponse::ok()))
}

pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<EmptyResponse>> {
    query.validate()?;

    state.auth.verify_email(&query.token).await?;
    Ok(Json(EmptyResponse::ok()))
}

// =============================================================================
// USER PASSWORD RECOVERY
// =============================================================================

pub async fn recover_password_request_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecoverPasswordRequest>,
) -> Result<Json<OtpChallengeResponse>> {
    req.validate()?;

    let challenge = state
        .auth
        .request_password_reset_otp(&req.email, false)
        .await?;
    Ok(Json(OtpChallengeResponse::from(&challenge)))
}

pub async fn recover_password_send_otp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SendOtpRequest>,
) -> Result<Json<EmptyResponse>> {
    req.validate()?;

    state
        .auth
        .send_password_reset_otp(&req.token, &lang(&headers))
        .await?;
    Ok(Json(EmptyResponse::ok()))
}

pub async fn recover_password_validate_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecoverPasswordValidateRequest>,
) -> Result<Json<EmptyResponse>> {
    req.validate()?;

    let profile = state
        .auth
        .validate_password_reset_otp(&req.otp, &req.token, false)
        .await?;
    state
        .auth
        .update_password(&profile.id, None, &req.password)
        .await?;
    Ok(Json(EmptyResponse::ok()))
}

// =============================================================================
// ADMIN AUTH
// =============================================================================

pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenPairResponse>> {
    req.validate()?;

    let outcome = state
        .auth
        .login(
            &credentials(req),
            &client_meta(&headers),
            AuthOptions {
                as_api: true,
                as_admin: true,
            },
        )
        .await?;
    Ok(Json(outcome.into_tokens()?))
}

pub async fn admin_login_with_otp(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<OtpChallengeResponse>> {
    req.validate()?;

    let challenge = state.auth.login_with_otp(&credentials(req), true).await?;
    Ok(Json(OtpChallengeResponse::from(&challenge)))
}

pub async fn admin_login_validate_otp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ValidateOtpRequest>,
) -> Result<Json<TokenPairResponse>> {
    req.validate()?;

    let outcome = state
        .auth
        .validate_login_otp(
            &req.otp,
            &req.token,
            &client_meta(&headers),
            AuthOptions {
                as_api: true,
                as_admin: true,
            },
        )
        .await?;
    Ok(Json(outcome.into_tokens()?))
}

pub async fn admin_refresh_token(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<RefreshTokenRequest>,
) -> Result<Json<TokenPairResponse>> {
    req.validate()?;

    let tokens = state
        .auth
        .refresh_token(&req.token, &client_meta(&headers), true)
        .await?;
    Ok(Json(tokens))
}

// =============================================================================
// ACCOUNT
// =============================================================================

pub async fn profile(Extension(current): Extension<CurrentUser>) -> Json<ProfileData> {
    Json(ProfileData::from(&current.user))
}

pub async fn update_password(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<Json<EmptyResponse>> {
    req.validate()?;

    state
        .auth
        .update_password(&current.user.id, Some(&req.old_password), &req.password)
        .await?;
    Ok(Json(EmptyResponse::ok()))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<EmptyResponse>> {
    state.auth.logout(&current.user.id, &current.token).await?;
    Ok(Json(EmptyResponse::ok()))
}

// =============================================================================
// HELPERS
// =============================================================================

fn credentials(req: LoginRequest) -> Credentials {
    Credentials {
        email: req.email,
        password: req.password,
    }
}

fn lang(headers: &HeaderMap) -> String {
    headers
        .get(LANG_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("en")
        .to_string()
}

fn client_meta(headers: &HeaderMap) -> ClientMeta {
    let ip_address = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .unwrap_or("unknown")
        .trim()
        .to_string();

    let app_type = headers
        .get(APP_TYPE_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    ClientMeta {
        ip_address,
        app_type,
    }
}
