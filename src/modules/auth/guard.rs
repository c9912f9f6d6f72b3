use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::AppState;

use super::interface::{AuthError, Result};
use super::model::User;

/// Authenticated caller, injected into request extensions by the guard. The
/// raw token is kept because logout must prove possession of it.
#[derive(Clone)]
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = extract_bearer(&request)?;
    let current = authenticate(&state, token).await?;
    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = extract_bearer(&request)?;
    let current = authenticate(&state, token).await?;

    if !current.user.is_admin {
        return Err(AuthError::AdminOnly);
    }

    request.extensions_mut().insert(current);
    Ok(next.run(request).await)
}

/// Pulls the bearer token out of the request synchronously. Keeping this off
/// the async path means no `&Request` (whose body is not `Sync`) is held across
/// an await, so the middleware future stays `Send`.
fn extract_bearer(request: &Request) -> Result<String> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or(AuthError::MissingBearer)
}

async fn authenticate(state: &AppState, token: String) -> Result<CurrentUser> {
    let user = state.auth.verify_bearer(&token).await?;

    Ok(CurrentUser { user, token })
}
