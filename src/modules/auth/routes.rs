use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;

use crate::AppState;

use super::{controller, guard};

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(controller::register))
        .route("/login/otp", post(controller::login_with_otp))
        .route("/login/sendotp", post(controller::login_send_otp))
        .route("/login/validateOtp", post(controller::login_validate_otp))
        .route("/refresh_token", post(controller::refresh_token))
        .route(
            "/resend-verify-email",
            post(controller::resend_verification_email),
        )
        .route("/verify-email", get(controller::verify_email))
        .route(
            "/password/recover/request_otp",
            post(controller::recover_password_request_otp),
        )
        .route(
            "/password/recover/send_otp",
            post(controller::recover_password_send_otp),
        )
        .route(
            "/password/recover/validate_otp",
            post(controller::recover_password_validate_otp),
        )
}

pub fn admin_auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(controller::admin_login))
        .route("/login/otp", post(controller::admin_login_with_otp))
        .route("/login/sendotp", post(controller::login_send_otp))
        .route(
            "/login/validateOtp",
            post(controller::admin_login_validate_otp),
        )
        .route("/refresh_token", post(controller::admin_refresh_token))
}

pub fn account_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(controller::profile))
        .route("/password", put(controller::update_password))
        .route("/logout", post(controller::logout))
        .layer(middleware::from_fn_with_state(state, guard::require_auth))
}

pub fn admin_account_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(controller::profile))
        .layer(middleware::from_fn_with_state(state, guard::require_admin))
}
