use std::env;

use chrono::Duration;

/// Environment configuration.
///
/// Every value is loaded and validated exactly once at startup; the rest of
/// the application receives this struct by reference and never re-reads the
/// environment. Token lifetimes are accepted as duration strings ("30m",
/// "1d") and resolved here, so downstream code only ever sees a `Duration`.
pub struct Config {
    pub app_name: String,
    pub api_base_url: String,
    pub port: u16,
    pub database_url: String,

    pub otp_lifetime_min: i64,
    pub whitelist_emails: Vec<String>,
    pub whitelist_otp: String,

    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_access_lifetime: Duration,
    pub jwt_refresh_lifetime: Duration,

    pub email_verification_lifetime_min: i64,
    pub email_verification_cipher_key: [u8; 32],
    pub email_verification_cipher_iv: [u8; 16],

    pub token_tracking_enabled: bool,
    pub journal_enabled: bool,

    pub mailer_api_url: Option<String>,
    pub mailer_api_key: Option<String>,
    pub mailer_sender: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        dotenvy::dotenv().ok();

        let app_name = require("APP_NAME")?;
        let api_base_url = require("API_BASE_URL")?;
        let port = env::var("API_PORT")
            .unwrap_or_else(|_| "6000".to_string())
            .parse::<u16>()
            .map_err(|_| "API_PORT must be a port number".to_string())?;
        let database_url = require("DATABASE_URL")?;

        let otp_lifetime_min = parse_minutes("OTP_EXPIRES_IN_MIN", 10)?;
        let whitelist_emails = env::var("OTP_WHITELIST_EMAILS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        let whitelist_otp = require("OTP_WHITELIST_CODE")?;

        let jwt_secret = require("JWT_SECRET")?;
        let jwt_issuer = require("JWT_ISSUER")?;
        let jwt_access_lifetime = parse_duration(&require("JWT_ACCESS_TOKEN_EXPIRES_IN")?)
            .map_err(|e| format!("JWT_ACCESS_TOKEN_EXPIRES_IN: {e}"))?;
        let jwt_refresh_lifetime = parse_duration(&require("JWT_REFRESH_TOKEN_EXPIRES_IN")?)
            .map_err(|e| format!("JWT_REFRESH_TOKEN_EXPIRES_IN: {e}"))?;

        let email_verification_lifetime_min =
            parse_minutes("EMAIL_VERIFICATION_EXPIRES_IN_MIN", 10)?;
        let email_verification_cipher_key = parse_hex_key::<32>("EMAIL_VERIFICATION_CIPHER_KEY")?;
        let email_verification_cipher_iv = parse_hex_key::<16>("EMAIL_VERIFICATION_CIPHER_IV")?;

        let token_tracking_enabled = parse_bool("TOKEN_TRACKING_ENABLED");
        let journal_enabled = parse_bool("JOURNAL_ENABLED");

        let mailer_api_url = env::var("MAILER_API_URL").ok().filter(|s| !s.is_empty());
        let mailer_api_key = env::var("MAILER_API_KEY").ok().filter(|s| !s.is_empty());
        let mailer_sender = env::var("MAILER_SENDER").ok().filter(|s| !s.is_empty());

        Ok(Self {
            app_name,
            api_base_url,
            port,
            database_url,
            otp_lifetime_min,
            whitelist_emails,
            whitelist_otp,
            jwt_secret,
            jwt_issuer,
            jwt_access_lifetime,
            jwt_refresh_lifetime,
            email_verification_lifetime_min,
            email_verification_cipher_key,
            email_verification_cipher_iv,
            token_tracking_enabled,
            journal_enabled,
            mailer_api_url,
            mailer_api_key,
            mailer_sender,
        })
    }
}

fn require(name: &str) -> Result<String, String> {
    env::var(name).map_err(|_| format!("{name} must be set"))
}

fn parse_bool(name: &str) -> bool {
    env::var(name).map(|v| v == "true").unwrap_or(false)
}

fn parse_minutes(name: &str, default: i64) -> Result<i64, String> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(raw) => {
            let minutes = raw
                .parse::<i64>()
                .map_err(|_| format!("{name} must be an integer number of minutes"))?;
            if minutes < 1 {
                return Err(format!("{name} must be at least 1 minute"));
            }
            Ok(minutes)
        }
    }
}

fn parse_hex_key<const N: usize>(name: &str) -> Result<[u8; N], String> {
    let raw = require(name)?;
    let bytes = hex::decode(raw.trim()).map_err(|_| format!("{name} must be hex encoded"))?;
    bytes
        .try_into()
        .map_err(|_| format!("{name} must decode to exactly {N} bytes"))
}

/// Parses a duration string such as "600s", "30m", "12h" or "1d".
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| format!("[{raw}] is missing a unit (s, m, h or d)"))?;
    let (value, unit) = raw.split_at(split);
    let value = value
        .parse::<i64>()
        .map_err(|_| format!("[{raw}] is not a valid duration"))?;
    if value < 1 {
        return Err(format!("[{raw}] must be positive"));
    }

    match unit {
        "s" => Ok(Duration::seconds(value)),
        "m" => Ok(Duration::minutes(value)),
        "h" => Ok(Duration::hours(value)),
        "d" => Ok(Duration::days(value)),
        _ => Err(format!("[{raw}] has an unknown unit [{unit}]")),
    }
}
