use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub const TOKEN_AUDIENCE: &str = "account";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    AccessToken,
    RefreshToken,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AccountClaim {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenMetadata {
    #[serde(rename = "type")]
    pub kind: TokenKind,
}

/// Claims carried by both access and refresh tokens. The two kinds share one
/// shape and are told apart only by `metadata.type`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub account: AccountClaim,
    pub metadata: TokenMetadata,
    pub aud: String,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly signed token together with its absolute expiry.
///
/// `expires_at` is an epoch-millisecond timestamp so API clients never need
/// to understand the duration grammar used in configuration.
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    pub expires_at: i64,
}

pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl JwtService {
    pub fn new(
        secret: &str,
        issuer: String,
        access_lifetime: Duration,
        refresh_lifetime: Duration,
    ) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            access_lifetime,
            refresh_lifetime,
        }
    }

    pub fn sign_access_token(
        &self,
        user_id: &str,
    ) -> Result<SignedToken, jsonwebtoken::errors::Error> {
        self.sign(user_id, TokenKind::AccessToken, self.access_lifetime)
    }

    pub fn sign_refresh_token(
        &self,
        user_id: &str,
    ) -> Result<SignedToken, jsonwebtoken::errors::Error> {
        self.sign(user_id, TokenKind::RefreshToken, self.refresh_lifetime)
    }

    fn sign(
        &self,
        user_id: &str,
        kind: TokenKind,
        lifetime: Duration,
    ) -> Result<SignedToken, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let expires = now + lifetime;

        let claims = Claims {
            account: AccountClaim {
                id: user_id.to_string(),
            },
            metadata: TokenMetadata { kind },
            aud: TOKEN_AUDIENCE.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };

        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &self.encoding_key,
        )?;

        Ok(SignedToken {
            token,
            expires_at: expires.timestamp_millis(),
        })
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS512);
        validation.set_audience(&[TOKEN_AUDIENCE]);
        validation.set_issuer(&[self.issuer.as_str()]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;
        Ok(data.claims)
    }
}
