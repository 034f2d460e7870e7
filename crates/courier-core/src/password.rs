//! Password hashing and token generation.
//!
//! New hashes are `argon2$<PHC string>`: Argon2id with the configured secret
//! as its secret input and a random 16-byte salt. Hashes in the older
//! `blake3$<salt hex>$<digest hex>` format still verify.

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

const SCHEME: &str = "argon2";
const LEGACY_SCHEME: &str = "blake3";
const LEGACY_KEY_CONTEXT: &str = "courier 2024-01-01 password hashing";
const SALT_LEN: usize = 16;
const TOKEN_LEN: usize = 20;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PasswordError {
    #[error("unsupported hash scheme: {0}")]
    UnsupportedScheme(String),
    #[error("malformed password hash")]
    Malformed,
    #[error("password hashing failed: {0}")]
    Hash(String),
}

fn argon2(secret: &str) -> Result<Argon2<'_>, PasswordError> {
    Argon2::new_with_secret(
        secret.as_bytes(),
        Algorithm::Argon2id,
        Version::V0x13,
        Params::default(),
    )
    .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Hash `password` with a fresh random salt.
pub fn hash_password(secret: &str, password: &str) -> Result<String, PasswordError> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|e| PasswordError::Hash(e.to_string()))?;

    let phc = argon2(secret)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(format!("{}${}", SCHEME, phc))
}

/// Check `password` against a stored hash.
pub fn verify_password(secret: &str, password: &str, stored: &str) -> Result<bool, PasswordError> {
    let (scheme, rest) = stored.split_once('$').ok_or(PasswordError::Malformed)?;
    match scheme {
        SCHEME => {
            let parsed = PasswordHash::new(rest).map_err(|_| PasswordError::Malformed)?;
            match argon2(secret)?.verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(password_hash::Error::Password) => Ok(false),
                Err(e) => Err(PasswordError::Hash(e.to_string())),
            }
        }
        LEGACY_SCHEME => verify_legacy(secret, password, rest),
        other => Err(PasswordError::UnsupportedScheme(other.to_string())),
    }
}

fn legacy_digest(secret: &str, salt: &[u8], password: &str) -> blake3::Hash {
    let key = blake3::derive_key(LEGACY_KEY_CONTEXT, secret.as_bytes());
    let mut hasher = blake3::Hasher::new_keyed(&key);
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize()
}

fn verify_legacy(secret: &str, password: &str, rest: &str) -> Result<bool, PasswordError> {
    let (salt, digest) = rest.split_once('$').ok_or(PasswordError::Malformed)?;
    let salt = hex::decode(salt).map_err(|_| PasswordError::Malformed)?;
    let expected = blake3::Hash::from_hex(digest).map_err(|_| PasswordError::Malformed)?;

    // blake3::Hash equality is constant-time.
    Ok(legacy_digest(secret, &salt, password) == expected)
}

/// Opaque bearer token: 40 hex characters.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_LEN];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
