use axum::http::StatusCode;
use serde_json::json;

use crate::common::{test_password, TestContext, WHITELISTED_EMAIL, WHITELIST_OTP};

async fn request_recovery(ctx: &TestContext, email: &str) -> serde_json::Value {
    let response = ctx
        .server
        .post("/v1/user/auth/password/recover/request_otp")
        .json(&json!({ "email": email }))
        .await;
    response.assert_status(StatusCode::OK);
    response.json()
}

#[tokio::test]
async fn the_full_recovery_flow_resets_the_password() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;

    let challenge = request_recovery(&ctx, "a@x.com").await;
    assert_eq!(challenge["email"], "a*****@x.com");
    assert!(challenge.get("otp").is_none());

    // the code travels by email
    ctx.server
        .post("/v1/user/auth/password/recover/send_otp")
        .json(&json!({ "token": challenge["token"] }))
        .await
        .assert_status(StatusCode::OK);
    let sent = ctx.wait_for_outbox(1).await;
    assert_eq!(sent[0].slug, "mail-password-reset-otp");

    let stored = ctx.recovery_otps.latest_for("a@x.com").unwrap();
    ctx.server
        .post("/v1/user/auth/password/recover/validate_otp")
        .json(&json!({
            "otp": stored.otp,
            "token": stored.token,
            "password": "Brand-new-pass1",
        }))
        .await
        .assert_status(StatusCode::OK);

    // the old password is gone, the new one authenticates
    use event_registration::modules::auth::service::{AuthOptions, ClientMeta, Credentials};
    let old = ctx
        .auth
        .login(
            &Credentials {
                email: "a@x.com".to_string(),
                password: test_password().to_string(),
            },
            &ClientMeta::default(),
            AuthOptions::default(),
        )
        .await;
    assert!(old.is_err());

    let new = ctx
        .auth
        .login(
            &Credentials {
                email: "a@x.com".to_string(),
                password: "Brand-new-pass1".to_string(),
            },
            &ClientMeta::default(),
            AuthOptions::default(),
        )
        .await;
    assert!(new.is_ok());
}

#[tokio::test]
async fn recovery_challenges_are_reissued_while_pending() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;

    let first = request_recovery(&ctx, "a@x.com").await;
    let second = request_recovery(&ctx, "a@x.com").await;

    assert_eq!(first["token"], second["token"]);
    assert_eq!(ctx.recovery_otps.count(), 1);
}

#[tokio::test]
async fn recovery_for_an_unknown_account_is_not_found() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/v1/user/auth/password/recover/request_otp")
        .json(&json!({ "email": "ghost@x.com" }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], 404_016);
}

#[tokio::test]
async fn recovery_for_an_unverified_account_is_refused() {
    let ctx = TestContext::new().await;
    ctx.seed_account("a@x.com", test_password(), false, true, false)
        .await;

    let response = ctx
        .server
        .post("/v1/user/auth/password/recover/request_otp")
        .json(&json!({ "email": "a@x.com" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], 403_002);
}

#[tokio::test]
async fn recovery_for_a_disabled_account_is_refused() {
    let ctx = TestContext::new().await;
    ctx.seed_account("a@x.com", test_password(), true, false, false)
        .await;

    let response = ctx
        .server
        .post("/v1/user/auth/password/recover/request_otp")
        .json(&json!({ "email": "a@x.com" }))
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], 403_003);
}

#[tokio::test]
async fn an_expired_recovery_challenge_is_rejected() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;

    request_recovery(&ctx, "a@x.com").await;
    let stored = ctx.recovery_otps.latest_for("a@x.com").unwrap();
    ctx.recovery_otps.expire(&stored.token);

    let response = ctx
        .server
        .post("/v1/user/auth/password/recover/validate_otp")
        .json(&json!({
            "otp": stored.otp,
            "token": stored.token,
            "password": "Brand-new-pass1",
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], 400_059);
}

#[tokio::test]
async fn recovery_codes_ignore_the_login_whitelist() {
    let ctx = TestContext::new().await;
    ctx.seed_user(WHITELISTED_EMAIL, test_password()).await;

    request_recovery(&ctx, WHITELISTED_EMAIL).await;

    // fixed test codes are a login-flow convenience only; recovery codes for
    // a whitelisted address are still random, so equality here would be a
    // one-in-a-million fluke
    let stored = ctx.recovery_otps.latest_for(WHITELISTED_EMAIL).unwrap();
    assert_ne!(stored.otp, WHITELIST_OTP);
}

#[tokio::test]
async fn the_login_and_recovery_stores_are_separate() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;

    // issue a login challenge, then try to validate it via the recovery flow
    ctx.server
        .post("/v1/user/auth/login/otp")
        .json(&json!({ "email": "a@x.com", "password": test_password() }))
        .await
        .assert_status(StatusCode::OK);

    let login_challenge = ctx.login_otps.latest_for("a@x.com").unwrap();

    let response = ctx
        .server
        .post("/v1/user/auth/password/recover/validate_otp")
        .json(&json!({
            "otp": login_challenge.otp,
            "token": login_challenge.token,
            "password": "Brand-new-pass1",
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], 400_058);
}
