use axum::http::StatusCode;
use serde_json::json;

use crate::common::{test_password, TestContext, WHITELISTED_EMAIL, WHITELIST_OTP};

async fn request_challenge(ctx: &TestContext, email: &str, password: &str) -> serde_json::Value {
    let response = ctx
        .server
        .post("/v1/user/auth/login/otp")
        .json(&json!({ "email": email, "password": password }))
        .await;
    response.assert_status(StatusCode::OK);
    response.json()
}

#[tokio::test]
async fn challenge_response_masks_contact_details_and_hides_the_code() {
    let ctx = TestContext::new().await;
    ctx.seed_user("johndoe@mail.com", test_password()).await;

    let body = request_challenge(&ctx, "johndoe@mail.com", test_password()).await;

    assert!(body.get("token").is_some());
    assert!(body.get("exp").is_some());
    assert_eq!(body["email"], "jo*****@mail.com");
    assert_eq!(body["phone"], "+2289****33");

    // the numeric code only ever travels by email
    assert!(body.get("otp").is_none());
}

#[tokio::test]
async fn a_pending_challenge_is_reissued_verbatim() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;

    let first = request_challenge(&ctx, "a@x.com", test_password()).await;
    let second = request_challenge(&ctx, "a@x.com", test_password()).await;

    assert_eq!(first["token"], second["token"]);
    assert_eq!(ctx.login_otps.count(), 1);

    let stored = ctx.login_otps.latest_for("a@x.com").unwrap();
    assert_eq!(stored.token, first["token"].as_str().unwrap());
}

#[tokio::test]
async fn an_expired_challenge_is_replaced_by_a_fresh_one() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;

    let first = request_challenge(&ctx, "a@x.com", test_password()).await;
    ctx.login_otps.expire(first["token"].as_str().unwrap());

    let second = request_challenge(&ctx, "a@x.com", test_password()).await;
    assert_ne!(first["token"], second["token"]);
    assert_eq!(ctx.login_otps.count(), 2);
}

#[tokio::test]
async fn send_otp_dispatches_the_code_by_email() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;

    let challenge = request_challenge(&ctx, "a@x.com", test_password()).await;

    let response = ctx
        .server
        .post("/v1/user/auth/login/sendotp")
        .json(&json!({ "token": challenge["token"] }))
        .await;
    response.assert_status(StatusCode::OK);

    let sent = ctx.wait_for_outbox(1).await;
    let email = &sent[0];
    assert_eq!(email.slug, "mail-authentication-otp");
    assert_eq!(email.recipient, "a@x.com");

    let stored = ctx.login_otps.latest_for("a@x.com").unwrap();
    assert_eq!(email.payload["otpCode"], stored.otp);
}

#[tokio::test]
async fn send_otp_rejects_an_unknown_token() {
    let ctx = TestContext::new().await;

    let response = ctx
        .server
        .post("/v1/user/auth/login/sendotp")
        .json(&json!({ "token": "nope" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], 400_036);
}

#[tokio::test]
async fn the_full_three_step_flow_ends_in_a_token_pair() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;

    let challenge = request_challenge(&ctx, "a@x.com", test_password()).await;
    let stored = ctx.login_otps.latest_for("a@x.com").unwrap();

    let response = ctx
        .server
        .post("/v1/user/auth/login/validateOtp")
        .json(&json!({ "otp": stored.otp, "token": challenge["token"] }))
        .await;

    response.assert_status(StatusCode::OK);
    let body: serde_json::Value = response.json();
    assert!(body.get("access_token").is_some());
    assert!(body.get("refresh_token").is_some());
}

#[tokio::test]
async fn validation_requires_both_halves_to_match_the_same_record() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;

    request_challenge(&ctx, "a@x.com", test_password()).await;
    let a = ctx.login_otps.latest_for("a@x.com").unwrap();

    // correct code, wrong token
    let response = ctx
        .server
        .post("/v1/user/auth/login/validateOtp")
        .json(&json!({ "otp": a.otp, "token": "not-the-exchange-token" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], 400_058);

    // correct token, wrong code
    let wrong_otp = if a.otp == "999999" { "999998" } else { "999999" };
    let response = ctx
        .server
        .post("/v1/user/auth/login/validateOtp")
        .json(&json!({ "otp": wrong_otp, "token": a.token }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    // neither partial match consumed the challenge
    assert!(!ctx.login_otps.latest_for("a@x.com").unwrap().checked);
}

#[tokio::test]
async fn an_expired_challenge_fails_even_when_unconsumed() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;

    request_challenge(&ctx, "a@x.com", test_password()).await;
    let stored = ctx.login_otps.latest_for("a@x.com").unwrap();
    assert!(!stored.checked);

    ctx.login_otps.expire(&stored.token);

    let response = ctx
        .server
        .post("/v1/user/auth/login/validateOtp")
        .json(&json!({ "otp": stored.otp, "token": stored.token }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], 400_059);
}

#[tokio::test]
async fn a_consumed_challenge_cannot_be_validated_twice() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;

    request_challenge(&ctx, "a@x.com", test_password()).await;
    let stored = ctx.login_otps.latest_for("a@x.com").unwrap();

    let payload = json!({ "otp": stored.otp, "token": stored.token });
    let first = ctx
        .server
        .post("/v1/user/auth/login/validateOtp")
        .json(&payload)
        .await;
    first.assert_status(StatusCode::OK);

    let second = ctx
        .server
        .post("/v1/user/auth/login/validateOtp")
        .json(&payload)
        .await;
    second.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn a_consumed_challenge_is_superseded_on_the_next_request() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;

    let first = request_challenge(&ctx, "a@x.com", test_password()).await;
    let stored = ctx.login_otps.latest_for("a@x.com").unwrap();

    ctx.server
        .post("/v1/user/auth/login/validateOtp")
        .json(&json!({ "otp": stored.otp, "token": stored.token }))
        .await
        .assert_status(StatusCode::OK);

    let next = request_challenge(&ctx, "a@x.com", test_password()).await;
    assert_ne!(first["token"], next["token"]);
}

#[tokio::test]
async fn whitelisted_accounts_get_the_fixed_test_code() {
    let ctx = TestContext::new().await;
    ctx.seed_user(WHITELISTED_EMAIL, test_password()).await;

    request_challenge(&ctx, WHITELISTED_EMAIL, test_password()).await;

    let stored = ctx.login_otps.latest_for(WHITELISTED_EMAIL).unwrap();
    assert_eq!(stored.otp, WHITELIST_OTP);
}

#[tokio::test]
async fn challenge_issuance_requires_valid_credentials() {
    let ctx = TestContext::new().await;
    ctx.seed_user("a@x.com", test_password()).await;

    let response = ctx
        .server
        .post("/v1/user/auth/login/otp")
        .json(&json!({ "email": "a@x.com", "password": "wrong-password" }))
        .await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(ctx.login_otps.count(), 0);
}
