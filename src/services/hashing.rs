use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Algorithm, Argon2, Params, Version,
};

// m=8MB, t=2 iterations, p=1 parallelism
fn get_argon2() -> Argon2<'static> {
    let params = Params::new(8192, 2, 1, None).expect("static argon2 params");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Hashes a password with a freshly generated salt.
///
/// The salt is returned (and stored) separately from the hash so that
/// verification can recompute the digest against a caller-supplied salt.
pub fn hash_password(password: &str) -> Result<(String, String), argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = get_argon2().hash_password(password.as_bytes(), &salt)?;
    Ok((salt.to_string(), hash.to_string()))
}

/// Recomputes the digest for `password` under `salt` and compares it with the
/// stored hash. Deterministic and side-effect free.
pub fn is_password_match(
    salt: &str,
    password: &str,
    hash: &str,
) -> Result<bool, argon2::password_hash::Error> {
    let salt = SaltString::from_b64(salt)?;
    let computed = get_argon2().hash_password(password.as_bytes(), &salt)?;
    Ok(computed.to_string() == hash)
}
