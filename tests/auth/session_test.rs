use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use serde_json::json;

use event_registration::modules::auth::service::{AuthOptions, ClientMeta, Credentials};

use crate::common::{test_password, TestContext};

async fn login(ctx: &TestContext, email: &str) -> (String, String) {
    let outcome = ctx
        .auth
        .login(
            &Credentials {
                email: email.to_string(),
                password: test_password().to_string(),
            },
            &ClientMeta {
                ip_address: "203.0.113.7".to_string(),
                app_type: Some("web".to_string()),
            },
            AuthOptions {
                as_api: true,
                as_admin: false,
            },
        )
        .await
        .unwrap();

    let tokens = outcome.into_tokens().unwrap();
    (tokens.access_token, tokens.refresh_token)
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

#[tokio::test]
async fn issuance_records_the_active_session() {
    let ctx = TestContext::with_tracking(true).await;
    let user = ctx.seed_user("a@x.com", test_password()).await;

    let (access, refresh) = login(&ctx, "a@x.com").await;

    let records = ctx.tokens.active_for(&user.id);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].access_token, access);
    assert_eq!(records[0].refresh_token, refresh);
    assert_eq!(records[0].ip_address, "203.0.113.7");
    assert_eq!(records[0].app_type, "web");
}

#[tokio::test]
async fn a_second_login_invalidates_the_first_sessions_refresh_token() {
    let ctx = TestContext::with_tracking(true).await;
    ctx.seed_user("a@x.com", test_password()).await;

    let (_, first_refresh) = login(&ctx, "a@x.com").await;
    login(&ctx, "a@x.com").await;

    // the upsert overwrote the record: last writer wins
    let response = ctx
        .server
        .post("/v1/user/auth/refresh_token")
        .json(&json!({ "token": first_refresh }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], 400_036);
}

#[tokio::test]
async fn the_current_sessions_refresh_token_still_works() {
    let ctx = TestContext::with_tracking(true).await;
    ctx.seed_user("a@x.com", test_password()).await;

    login(&ctx, "a@x.com").await;
    let (_, refresh) = login(&ctx, "a@x.com").await;

    ctx.server
        .post("/v1/user/auth/refresh_token")
        .json(&json!({ "token": refresh }))
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn an_overwritten_access_token_fails_the_guard() {
    let ctx = TestContext::with_tracking(true).await;
    ctx.seed_user("a@x.com", test_password()).await;

    let (first_access, _) = login(&ctx, "a@x.com").await;
    login(&ctx, "a@x.com").await;

    let response = ctx
        .server
        .get("/v1/user/account")
        .add_header(AUTHORIZATION, bearer(&first_access))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_disables_the_session() {
    let ctx = TestContext::with_tracking(true).await;
    let user = ctx.seed_user("a@x.com", test_password()).await;

    let (access, refresh) = login(&ctx, "a@x.com").await;

    ctx.server
        .post("/v1/user/account/logout")
        .add_header(AUTHORIZATION, bearer(&access))
        .await
        .assert_status(StatusCode::OK);

    assert!(ctx.tokens.active_for(&user.id).is_empty());

    // neither half of the pair survives
    ctx.server
        .get("/v1/user/account")
        .add_header(AUTHORIZATION, bearer(&access))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    ctx.server
        .post("/v1/user/auth/refresh_token")
        .json(&json!({ "token": refresh }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sessions_are_tracked_per_app_type() {
    let ctx = TestContext::with_tracking(true).await;
    let user = ctx.seed_user("a@x.com", test_password()).await;

    let web = ctx
        .auth
        .login(
            &Credentials {
                email: "a@x.com".to_string(),
                password: test_password().to_string(),
            },
            &ClientMeta {
                ip_address: "203.0.113.7".to_string(),
                app_type: Some("web".to_string()),
            },
            AuthOptions {
                as_api: true,
                as_admin: false,
            },
        )
        .await
        .unwrap()
        .into_tokens()
        .unwrap();

    let mobile = ctx
        .auth
        .login(
            &Credentials {
                email: "a@x.com".to_string(),
                password: test_password().to_string(),
            },
            &ClientMeta {
                ip_address: "203.0.113.7".to_string(),
                app_type: Some("mobile".to_string()),
            },
            AuthOptions {
                as_api: true,
                as_admin: false,
            },
        )
        .await
        .unwrap()
        .into_tokens()
        .unwrap();

    // one active record per client type, both sessions usable
    assert_eq!(ctx.tokens.active_for(&user.id).len(), 2);

    for refresh in [&web.refresh_token, &mobile.refresh_token] {
        ctx.server
            .post("/v1/user/auth/refresh_token")
            .json(&json!({ "token": refresh }))
            .await
            .assert_status(StatusCode::OK);
    }
}

#[tokio::test]
async fn with_tracking_disabled_no_records_are_written() {
    let ctx = TestContext::new().await;
    let user = ctx.seed_user("a@x.com", test_password()).await;

    let (access, _) = login(&ctx, "a@x.com").await;

    assert!(ctx.tokens.active_for(&user.id).is_empty());

    // the guard accepts any correctly signed access token
    ctx.server
        .get("/v1/user/account")
        .add_header(AUTHORIZATION, bearer(&access))
        .await
        .assert_status(StatusCode::OK);

    // and logout is a no-op rather than an error
    ctx.server
        .post("/v1/user/account/logout")
        .add_header(AUTHORIZATION, bearer(&access))
        .await
        .assert_status(StatusCode::OK);
}
