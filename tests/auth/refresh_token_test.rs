use axum::http::StatusCode;
use serde_json::json;

use event_registration::modules::auth::service::{AuthOptions, ClientMeta, Credentials};

use crate::common::{test_password, TestContext};

async fn issue_tokens(ctx: &TestContext, email: &str) -> (String, String) {
    let outcome = ctx
        .auth
        .login(
            &Credentials {
                email: email.to_string(),
                password: test_password().to_string(),
            },
            &ClientMeta::default(),
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

#[tokio::test]
async fn a_valid_refresh_token_yields_a_fresh_pair() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;
    let (_, refresh) = issue_tokens(&ctx, "a@x.com").await;

    let response = ctx
        .server
        .post("/v1/user/auth/refresh_token")
        .json(&json!({ "token": refresh }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert!(body.get("access_token").is_some());
    assert_ne!(body["refresh_token"], refresh);
}

#[tokio::test]
async fn an_access_token_is_rejected_as_a_refresh_token() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;
    let (access, _) = issue_tokens(&ctx, "a@x.com").await;

    let response = ctx
        .server
        .post("/v1/user/auth/refresh_token")
        .json(&json!({ "token": access }))
        .await;

    // type confusion must be impossible
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], 400_060);
}

#[tokio::test]
async fn garbage_tokens_are_rejected() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/v1/user/auth/refresh_token")
        .json(&json!({ "token": "not-a-jwt" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], 400_036);
}

#[tokio::test]
async fn with_tracking_disabled_any_signed_refresh_token_works() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;
    let (_, first_refresh) = issue_tokens(&ctx, "a@x.com").await;

    // a later login would overwrite the session record if tracking were on
    issue_tokens(&ctx, "a@x.com").await;

    let response = ctx
        .server
        .post("/v1/user/auth/refresh_token")
        .json(&json!({ "token": first_refresh }))
        .await;

    response.assert_status(StatusCode::OK);
}

#[tokio::test]
async fn an_admin_refresh_token_does_not_work_on_the_user_route() {
    let ctx = TestContext::new().await;
    ctx.seed_admin("root@x.com", test_password()).await;

    let login = ctx
        .server
        .post("/v1/admin/auth/login")
        .json(&json!({ "email": "root@x.com", "password": test_password() }))
        .await;
    login.assert_status(StatusCode::OK);
    let body: serde_json::Value = login.json();

    let response = ctx
        .server
        .post("/v1/user/auth/refresh_token")
        .json(&json!({ "token": body["refresh_token"] }))
        .await;

    // the admin flag filter makes the account unresolvable here
    response.assert_status(StatusCode::NOT_FOUND);
    let err: serde_json::Value = response.json();
    assert_eq!(err["code"], 404_016);
}
