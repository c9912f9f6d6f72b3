use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::config::Config;
use crate::services::cipher::CipherService;
use crate::services::hashing;
use crate::services::journal::{Journal, LogLevel};
use crate::services::jwt::{JwtService, TokenKind};
use crate::services::notify::NotificationSender;

use super::interface::{
    AuthError, OtpChallengeRepository, Result, UserRepository,
};
use super::model::{OtpChallenge, User};
use super::schema::{ProfileData, TokenPairResponse};
use super::session::SessionTracker;

const MODULE: &str = "AuthModule";
const COMPONENT: &str = "AuthService";

const OTP_CODE_LENGTH: usize = 6;
const EXCHANGE_TOKEN_LENGTH: usize = 100;

const LOGIN_OTP_TEMPLATE: &str = "mail-authentication-otp";
const RECOVER_PASSWORD_OTP_TEMPLATE: &str = "mail-password-reset-otp";
const EMAIL_VERIFICATION_TEMPLATE: &str = "mail-email-verification";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip_address: String,
    pub app_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AuthOptions {
    pub as_api: bool,
    pub as_admin: bool,
}

/// What a successful authentication yields: a signed token pair for API
/// callers, a sanitized profile otherwise. Never both.
#[derive(Debug)]
pub enum LoginOutcome {
    Tokens(TokenPairResponse),
    Profile(ProfileData),
}

impl LoginOutcome {
    pub fn into_tokens(self) -> Result<TokenPairResponse> {
        match self {
            LoginOutcome::Tokens(tokens) => Ok(tokens),
            LoginOutcome::Profile(_) => Err(AuthError::Internal(
                "expected a token pair from an api-mode login".to_string(),
            )),
        }
    }
}

/// Stateless email-verification token contents. `exp` is epoch milliseconds
/// and is enforced by the cipher on decode, not re-checked by callers.
#[derive(Debug, Serialize, Deserialize)]
pub struct EmailVerificationPayload {
    pub user_id: String,
    pub email: String,
    pub exp: i64,
}

/// Orchestrates every authentication lifecycle: password login, the two
/// OTP step-up flows, token refresh, email verification and the account
/// credential operations. All collaborators are injected as trait objects;
/// the object graph is composed once at process start.
pub struct AuthService {
    app_name: String,
    api_base_url: String,
    otp_lifetime: Duration,
    otp_lifetime_min: i64,
    whitelist_emails: Vec<String>,
    whitelist_otp: String,
    verification_lifetime_min: i64,

    jwt: JwtService,
    cipher: CipherService,

    users: Arc<dyn UserRepository>,
    login_otps: Arc<dyn OtpChallengeRepository>,
    recovery_otps: Arc<dyn OtpChallengeRepository>,
    sessions: SessionTracker,
    notifier: Arc<dyn NotificationSender>,
    journal: Arc<dyn Journal>,
}

impl AuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &Config,
        users: Arc<dyn UserRepository>,
        login_otps: Arc<dyn OtpChallengeRepository>,
        recovery_otps: Arc<dyn OtpChallengeRepository>,
        sessions: SessionTracker,
        notifier: Arc<dyn NotificationSender>,
        journal: Arc<dyn Journal>,
    ) -> Self {
        Self {
            app_name: config.app_name.clone(),
            api_base_url: config.api_base_url.clone(),
            otp_lifetime: Duration::minutes(config.otp_lifetime_min),
            otp_lifetime_min: config.otp_lifetime_min,
            whitelist_emails: config.whitelist_emails.clone(),
            whitelist_otp: config.whitelist_otp.clone(),
            verification_lifetime_min: config.email_verification_lifetime_min,
            jwt: JwtService::new(
                &config.jwt_secret,
                config.jwt_issuer.clone(),
                config.jwt_access_lifetime,
                config.jwt_refresh_lifetime,
            ),
            cipher: CipherService::new(
                config.email_verification_cipher_key,
                config.email_verification_cipher_iv,
            ),
            users,
            login_otps,
            recovery_otps,
            sessions,
            notifier,
            journal,
        }
    }

    // =========================================================================
    // PASSWORD LOGIN
    // =========================================================================

    pub async fn login(
        &self,
        creds: &Credentials,
        meta: &ClientMeta,
        options: AuthOptions,
    ) -> Result<LoginOutcome> {
        let user = self.handle_login(creds, options.as_admin).await?;

        if options.as_api {
            return Ok(LoginOutcome::Tokens(self.issue_tokens(&user, meta).await?));
        }

        Ok(LoginOutcome::Profile(ProfileData::from(&user)))
    }

    /// Resolves and checks the account, then the password. Callers always
    /// see the one generic credentials error; which check failed only
    /// reaches the journal.
    async fn handle_login(&self, creds: &Credentials, as_admin: bool) -> Result<User> {
        match self.check_credentials(creds, as_admin).await {
            Ok(user) => {
                self.log(
                    LogLevel::Info,
                    format!("user {} logged in", creds.email),
                );
                Ok(user)
            }
            Err(_) => Err(AuthError::InvalidCredentials),
        }
    }

    async fn check_credentials(&self, creds: &Credentials, as_admin: bool) -> Result<User> {
        let email = creds.email.to_lowercase();

        let user = self.users.get_one_by_email(&email, as_admin).await?;
        let user = self.validate_account(user, &email)?;

        let matches = hashing::is_password_match(&user.password_salt, &creds.password, &user.password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        if !matches {
            self.log(
                LogLevel::Info,
                format!("user {email} supplied an incorrect password"),
            );
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// A login may only succeed against a verified and active account.
    fn validate_account(&self, user: Option<User>, identifier: &str) -> Result<User> {
        let Some(user) = user else {
            self.log(
                LogLevel::Info,
                format!("account {identifier} was not found"),
            );
            return Err(AuthError::AccountNotFound(identifier.to_string()));
        };

        if !user.verified {
            self.log(
                LogLevel::Info,
                format!("account {identifier} is not verified"),
            );
            return Err(AuthError::AccountUnverified(identifier.to_string()));
        }

        if !user.active {
            self.log(LogLevel::Info, format!("account {identifier} is disabled"));
            return Err(AuthError::AccountDisabled(identifier.to_string()));
        }

        Ok(user)
    }

    // =========================================================================
    // LOGIN WITH OTP (STEP-UP)
    // =========================================================================

    /// Step 1: validate credentials and hand out a challenge. A still-pending
    /// challenge for the same email is returned as-is, so retries are
    /// idempotent; consumed or expired ones trigger a fresh challenge.
    pub async fn login_with_otp(
        &self,
        creds: &Credentials,
        as_admin: bool,
    ) -> Result<OtpChallenge> {
        let user = self.handle_login(creds, as_admin).await?;

        if let Some(old) = self.login_otps.get_last_by_email(&user.email).await? {
            if old.is_pending_at(Utc::now()) {
                return Ok(old);
            }
        }

        let otp = if self.whitelist_emails.contains(&user.email) {
            self.whitelist_otp.clone()
        } else {
            generate_numeric_code(OTP_CODE_LENGTH)
        };

        let challenge = self.build_challenge(&user, otp);
        self.login_otps.create(&challenge).await?;

        self.log(
            LogLevel::Info,
            format!("user {} obtained a login otp challenge", user.email),
        );
        Ok(challenge)
    }

    /// Step 2: deliver the code by email. Looked up by the exchange token so
    /// the numeric code never appears in an API response.
    pub async fn send_login_otp(&self, token: &str, lang: &str) -> Result<()> {
        let Some(challenge) = self.login_otps.get_unchecked_by_token(token).await? else {
            return Err(AuthError::ExchangeTokenInvalid);
        };

        self.dispatch_email(
            LOGIN_OTP_TEMPLATE,
            self.otp_email_payload(&challenge, lang),
            challenge.email.clone(),
            None,
        );
        Ok(())
    }

    /// Step 3: exchange the (otp, token) pair for the login result.
    pub async fn validate_login_otp(
        &self,
        otp: &str,
        token: &str,
        meta: &ClientMeta,
        options: AuthOptions,
    ) -> Result<LoginOutcome> {
        let challenge = self.consume_challenge(&self.login_otps, otp, token).await?;

        let user = self
            .users
            .get_one_by_email(&challenge.email, options.as_admin)
            .await?
            .ok_or_else(|| AuthError::AccountNotFound(challenge.email.clone()))?;

        if options.as_api {
            return Ok(LoginOutcome::Tokens(self.issue_tokens(&user, meta).await?));
        }

        self.log(
            LogLevel::Info,
            format!("user {} validated a login otp", challenge.email),
        );
        Ok(LoginOutcome::Profile(ProfileData::from(&user)))
    }

    // =========================================================================
    // TOKEN REFRESH
    // =========================================================================

    /// Reauthenticates a user from a refresh token. Signature, expiry and
    /// (when tracking is enabled) the stored-session check all collapse into
    /// the one invalid-token error; only the kind claim gets its own code.
    pub async fn refresh_token(
        &self,
        token: &str,
        meta: &ClientMeta,
        as_admin: bool,
    ) -> Result<TokenPairResponse> {
        let claims = self
            .jwt
            .verify(token)
            .map_err(|_| AuthError::RefreshInvalid)?;

        self.sessions
            .verify_refresh(&claims.account.id, token)
            .await
            .map_err(|_| AuthError::RefreshInvalid)?;

        if claims.metadata.kind != TokenKind::RefreshToken {
            return Err(AuthError::RefreshKindInvalid);
        }

        let user = self
            .users
            .get_one_by_id(&claims.account.id, as_admin)
            .await?
            .ok_or_else(|| AuthError::AccountNotFound(claims.account.id.clone()))?;

        self.log(
            LogLevel::Info,
            format!("user {} refreshed their tokens", user.email),
        );
        self.issue_tokens(&user, meta).await
    }

    // =========================================================================
    // PASSWORD RECOVERY
    // =========================================================================

    /// Same shape as the login step-up, but failures here are not collapsed:
    /// a recovery request is already past the credentials boundary.
    pub async fn request_password_reset_otp(
        &self,
        email: &str,
        as_admin: bool,
    ) -> Result<OtpChallenge> {
        let email = email.to_lowercase();
        self.log(
            LogLevel::Info,
            format!("user {email} initiated a password reset"),
        );

        let user = self.users.get_one_by_email(&email, as_admin).await?;
        let user = self.validate_account(user, &email)?;

        if let Some(old) = self.recovery_otps.get_last_by_email(&user.email).await? {
            if old.is_pending_at(Utc::now()) {
                return Ok(old);
            }
        }

        // recovery codes are always random; the whitelist only covers login
        let challenge = self.build_challenge(&user, generate_numeric_code(OTP_CODE_LENGTH));
        self.recovery_otps.create(&challenge).await?;

        self.log(
            LogLevel::Info,
            format!("user {} obtained a password reset otp challenge", user.email),
        );
        Ok(challenge)
    }

    pub async fn send_password_reset_otp(&self, token: &str, lang: &str) -> Result<()> {
        let Some(challenge) = self.recovery_otps.get_unchecked_by_token(token).await? else {
            return Err(AuthError::ExchangeTokenInvalid);
        };

        self.dispatch_email(
            RECOVER_PASSWORD_OTP_TEMPLATE,
            self.otp_email_payload(&challenge, lang),
            challenge.email.clone(),
            None,
        );
        Ok(())
    }

    /// Terminates in the sanitized profile; the caller follows up with a
    /// password update, token issuance is not part of this flow.
    pub async fn validate_password_reset_otp(
        &self,
        otp: &str,
        token: &str,
        as_admin: bool,
    ) -> Result<ProfileData> {
        let challenge = self
            .consume_challenge(&self.recovery_otps, otp, token)
            .await?;

        let user = self
            .users
            .get_one_by_email(&challenge.email, as_admin)
            .await?
            .ok_or_else(|| AuthError::AccountNotFound(challenge.email.clone()))?;

        self.log(
            LogLevel::Info,
            format!("user {} validated a password reset otp", challenge.email),
        );
        Ok(ProfileData::from(&user))
    }

    // =========================================================================
    // REGISTRATION & ACCOUNT
    // =========================================================================

    pub async fn register(&self, input: RegisterInput, lang: &str) -> Result<ProfileData> {
        let email = input.email.to_lowercase();

        if self.users.email_exists(&email, false).await? {
            return Err(AuthError::EmailTaken(email));
        }

        let (salt, hash) = hashing::hash_password(&input.password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            firstname: input.firstname,
            lastname: input.lastname,
            email,
            phone: input.phone,
            password: hash,
            password_salt: salt,
            verified: false,
            is_admin: false,
            active: true,
            deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        self.users.create(&user).await?;
        self.log(
            LogLevel::Info,
            format!("user {} registered an account", user.email),
        );

        self.send_verification_email(&user, "/v1/user/auth/verify-email", lang)
            .await;

        Ok(ProfileData::from(&user))
    }

    pub async fn update_password(
        &self,
        user_id: &str,
        old_password: Option<&str>,
        new_password: &str,
    ) -> Result<()> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| AuthError::AccountNotFound(user_id.to_string()))?;

        if let Some(old_password) = old_password {
            let matches =
                hashing::is_password_match(&user.password_salt, old_password, &user.password)
                    .map_err(|e| AuthError::Internal(e.to_string()))?;
            if !matches {
                return Err(AuthError::WrongOldPassword);
            }
        }

        let (salt, hash) = hashing::hash_password(new_password)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        self.users.update_password(&user.id, &salt, &hash).await?;

        self.log(
            LogLevel::Info,
            format!("user {} changed their password", user.email),
        );
        Ok(())
    }

    pub async fn logout(&self, user_id: &str, access_token: &str) -> Result<()> {
        self.sessions.disable(user_id, access_token).await
    }

    // =========================================================================
    // EMAIL VERIFICATION
    // =========================================================================

    /// Fire-and-forget by contract: verification-email delivery must never
    /// block or fail whichever flow triggered it.
    pub async fn send_verification_email(&self, user: &User, callback_path: &str, lang: &str) {
        if user.verified {
            return;
        }

        let payload = EmailVerificationPayload {
            user_id: user.id.clone(),
            email: user.email.clone(),
            exp: (Utc::now() + Duration::minutes(self.verification_lifetime_min))
                .timestamp_millis(),
        };

        let token = match self.cipher.encrypt(&payload) {
            Ok(token) => token,
            Err(err) => {
                self.log(
                    LogLevel::Error,
                    format!("failed to build a verification token: {err}"),
                );
                return;
            }
        };

        let verification_url = format!("{}{}?token={}", self.api_base_url, callback_path, token);
        let body = json!({
            "lang": lang,
            "appName": self.app_name,
            "verificationUrl": verification_url,
            "expiresIn": self.verification_lifetime_min,
        });

        self.dispatch_email(
            EMAIL_VERIFICATION_TEMPLATE,
            body,
            user.email.clone(),
            Some(user.id.clone()),
        );
    }

    pub async fn resend_verification_email(&self, email: &str, lang: &str) -> Result<()> {
        let email = email.to_lowercase();
        let user = self
            .users
            .get_one_by_email(&email, false)
            .await?
            .ok_or_else(|| AuthError::AccountNotFound(email.clone()))?;

        self.send_verification_email(&user, "/v1/user/auth/verify-email", lang)
            .await;
        Ok(())
    }

    /// Decodes the stateless token and flips the account verified. The codec
    /// enforces the embedded expiry; every failure on the way, including an
    /// unknown account, collapses into the one verification error.
    pub async fn verify_email(&self, token: &str) -> Result<()> {
        match self.try_verify_email(token).await {
            Ok(()) => Ok(()),
            Err(err) => {
                self.log(
                    LogLevel::Error,
                    format!("email verification failed: {err}"),
                );
                Err(AuthError::VerificationFailed)
            }
        }
    }

    async fn try_verify_email(&self, token: &str) -> Result<()> {
        let payload: EmailVerificationPayload = self
            .cipher
            .decrypt(token, true)
            .map_err(|_| AuthError::VerificationFailed)?;

        let user = self
            .users
            .get_by_id(&payload.user_id)
            .await?
            .ok_or(AuthError::VerificationFailed)?;

        if user.verified {
            return Ok(());
        }

        self.users.set_verified(&user.id, true).await?;
        self.log(
            LogLevel::Info,
            format!("user {} verified their account", user.email),
        );
        Ok(())
    }

    // =========================================================================
    // BEARER VERIFICATION (GUARD)
    // =========================================================================

    /// Resolves a bearer access token into its account. Signature, lookup and
    /// session-tracking failures collapse into the generic unauthorized
    /// error; only an inactive account is reported distinctly. The kind
    /// claim is not enforced here, only refresh checks it.
    pub async fn verify_bearer(&self, token: &str) -> Result<User> {
        let user = self
            .check_bearer(token)
            .await
            .map_err(|_| AuthError::Unauthorized)?;

        if !user.active {
            return Err(AuthError::AccountBlocked);
        }

        Ok(user)
    }

    async fn check_bearer(&self, token: &str) -> Result<User> {
        let claims = self.jwt.verify(token).map_err(|_| AuthError::Unauthorized)?;

        let user = self
            .users
            .get_by_id(&claims.account.id)
            .await?
            .ok_or_else(|| AuthError::AccountNotFound(claims.account.id.clone()))?;

        self.sessions.verify_access(&user.id, token).await?;

        Ok(user)
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    /// Looks up a challenge by both halves of the proof, rejects expired or
    /// already-consumed ones, and marks it consumed. The consumption write is
    /// best-effort: a failure is journaled and swallowed, it never blocks the
    /// flow that presented a valid code.
    async fn consume_challenge(
        &self,
        store: &Arc<dyn OtpChallengeRepository>,
        otp: &str,
        token: &str,
    ) -> Result<OtpChallenge> {
        let Some(challenge) = store.get_by_otp_and_token(otp, token).await? else {
            return Err(AuthError::ChallengeInvalid);
        };

        if challenge.checked {
            return Err(AuthError::ChallengeInvalid);
        }

        if challenge.is_expired_at(Utc::now()) {
            self.log(
                LogLevel::Info,
                format!("user {} presented an expired otp", challenge.email),
            );
            return Err(AuthError::ChallengeExpired);
        }

        if let Err(err) = store.mark_checked(&challenge.id).await {
            self.log(
                LogLevel::Error,
                format!("failed to mark challenge {} consumed: {err}", challenge.id),
            );
        }

        Ok(challenge)
    }

    fn build_challenge(&self, user: &User, otp: String) -> OtpChallenge {
        let now = Utc::now();
        OtpChallenge {
            id: Uuid::new_v4().to_string(),
            otp,
            token: generate_exchange_token(EXCHANGE_TOKEN_LENGTH),
            email: user.email.clone(),
            phone: user.phone.clone(),
            exp: now + self.otp_lifetime,
            checked: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn otp_email_payload(&self, challenge: &OtpChallenge, lang: &str) -> serde_json::Value {
        json!({
            "lang": lang,
            "appName": self.app_name,
            "otpCode": challenge.otp,
            "expiresIn": self.otp_lifetime_min,
        })
    }

    /// Signs a fresh pair and records it with the session tracker. Each call
    /// signs independently; there is no cross-request ordering.
    async fn issue_tokens(&self, user: &User, meta: &ClientMeta) -> Result<TokenPairResponse> {
        let access = self
            .jwt
            .sign_access_token(&user.id)
            .map_err(|e| AuthError::Internal(e.to_string()))?;
        let refresh = self
            .jwt
            .sign_refresh_token(&user.id)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        self.sessions
            .save(
                &user.id,
                &access.token,
                &refresh.token,
                &meta.ip_address,
                meta.app_type.as_deref(),
            )
            .await?;

        Ok(TokenPairResponse {
            access_token: access.token,
            access_expires_at: access.expires_at,
            refresh_token: refresh.token,
            refresh_expires_at: refresh.expires_at,
            token_type: "Bearer",
            scope: "authentication",
        })
    }

    /// Emails are dispatched on a detached task; a delivery failure is
    /// journaled and discarded, never surfaced to the calling operation.
    fn dispatch_email(
        &self,
        slug: &'static str,
        payload: serde_json::Value,
        recipient: String,
        user_id: Option<String>,
    ) {
        let notifier = Arc::clone(&self.notifier);
        let journal = Arc::clone(&self.journal);

        tokio::spawn(async move {
            let result = notifier
                .notify_by_email(slug, payload, &recipient, user_id.as_deref())
                .await;

            if let Err(err) = result {
                journal
                    .record(
                        MODULE,
                        COMPONENT,
                        LogLevel::Error,
                        &format!("email [{slug}] to {recipient} failed: {err}"),
                        None,
                    )
                    .await;
            }
        });
    }

    /// Journal writes ride a detached task as well; the journal itself is
    /// best-effort and must never slow an authentication call down.
    fn log(&self, level: LogLevel, message: String) {
        let journal = Arc::clone(&self.journal);
        tokio::spawn(async move {
            journal
                .record(MODULE, COMPONENT, level, &message, None)
                .await;
        });
    }
}

#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

fn generate_numeric_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| char::from(b'0' + rng.random_range(0u8..10)))
        .collect()
}

fn generate_exchange_token(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
