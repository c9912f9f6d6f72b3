use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use serde::{de::DeserializeOwned, Serialize};

type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

/// Single collapsed failure kind for every decode problem: bad base64,
/// tampered ciphertext, malformed payload and an elapsed embedded expiry
/// all look identical to the caller.
#[derive(Debug, thiserror::Error)]
#[error("the cipher payload is invalid")]
pub struct CipherError;

/// Reversible symmetric codec for small stateless tokens (email
/// verification). Payloads are serialized to JSON, encrypted with
/// AES-256-CBC under a fixed configured key/IV pair and emitted as URL-safe
/// base64, so the ciphertext can ride in a query parameter.
pub struct CipherService {
    key: [u8; 32],
    iv: [u8; 16],
}

impl CipherService {
    pub fn new(key: [u8; 32], iv: [u8; 16]) -> Self {
        Self { key, iv }
    }

    pub fn encrypt<T: Serialize>(&self, payload: &T) -> Result<String, CipherError> {
        let plain = serde_json::to_vec(payload).map_err(|_| CipherError)?;
        let ciphertext = Aes256CbcEnc::new(&self.key.into(), &self.iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(&plain);
        Ok(URL_SAFE_NO_PAD.encode(ciphertext))
    }

    /// Decrypts and deserializes a token produced by [`encrypt`].
    ///
    /// With `enforce_exp` the payload must carry a numeric `exp` field
    /// (epoch milliseconds) that is still in the future; enforcing it here
    /// is this codec's contract, callers do not re-check it.
    ///
    /// [`encrypt`]: CipherService::encrypt
    pub fn decrypt<T: DeserializeOwned>(
        &self,
        token: &str,
        enforce_exp: bool,
    ) -> Result<T, CipherError> {
        let ciphertext = URL_SAFE_NO_PAD.decode(token).map_err(|_| CipherError)?;
        let plain = Aes256CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|_| CipherError)?;

        let value: serde_json::Value = serde_json::from_slice(&plain).map_err(|_| CipherError)?;

        if enforce_exp {
            let exp = value.get("exp").and_then(|v| v.as_i64()).ok_or(CipherError)?;
            if Utc::now().timestamp_millis() >= exp {
                return Err(CipherError);
            }
        }

        serde_json::from_value(value).map_err(|_| CipherError)
    }
}
