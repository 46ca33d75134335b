//! Password encryption for imported and provisioned accounts.
//!
//! Plaintext passwords only ever pass through a [`PasswordEncryptor`]; the
//! resulting hash is what gets handed to the account commands. The default
//! [`ShaCryptEncryptor`] emits SHA-512 crypt(3) strings (`$6$`), which
//! pam_unix verifies on every mainstream distribution. [`Argon2Encryptor`]
//! emits PHC strings for hosts whose crypt(3) understands them.

use argon2::{
    Argon2,
    password_hash::{PasswordHasher, SaltString, rand_core},
};
use sha_crypt::{Sha512Params, sha512_simple};
use thiserror::Error;

use crate::constants::SHA_CRYPT_ROUNDS;

/// Errors from password encryption.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Password hashing failed: {reason}")]
    HashingFailed { reason: String },

    #[error("Refusing to encrypt an empty password")]
    EmptyPassword,
}

impl From<CryptoError> for crate::Error {
    fn from(err: CryptoError) -> Self {
        crate::Error::Crypto(err)
    }
}

/// Turns a plaintext password into the hash stored in the shadow file.
pub trait PasswordEncryptor: Send + Sync + std::fmt::Debug {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError>;
}

/// SHA-512 crypt with a random salt, the glibc `$6$` scheme.
#[derive(Debug, Clone, Default)]
pub struct ShaCryptEncryptor;

impl PasswordEncryptor for ShaCryptEncryptor {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Err(CryptoError::EmptyPassword);
        }
        let params =
            Sha512Params::new(SHA_CRYPT_ROUNDS).map_err(|e| CryptoError::HashingFailed {
                reason: format!("{e:?}"),
            })?;
        sha512_simple(plaintext, &params).map_err(|e| CryptoError::HashingFailed {
            reason: format!("{e:?}"),
        })
    }
}

/// Argon2id with default parameters and a random salt.
#[derive(Debug, Clone, Default)]
pub struct Argon2Encryptor;

impl PasswordEncryptor for Argon2Encryptor {
    fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        if plaintext.is_empty() {
            return Err(CryptoError::EmptyPassword);
        }
        let salt = SaltString::generate(&mut rand_core::OsRng);
        Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CryptoError::HashingFailed {
                reason: e.to_string(),
            })
    }
}
