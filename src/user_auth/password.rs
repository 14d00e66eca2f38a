//! Password hashing (Argon2id).
//!
//! By default the plaintext is run through SHA-256 first and the 32-byte
//! digest is what Argon2 sees. The same transform runs on both the hash and
//! verify paths; flipping `prehash` on a populated database makes every
//! stored hash unverifiable.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sha2::{Digest, Sha256};

use super::error::AuthError;
use crate::config::Argon2Config;

/// Largest raw password accepted when pre-digesting is off (bcrypt's bound,
/// kept so hashes stay portable to bcrypt-era tooling).
pub const MAX_RAW_PASSWORD_BYTES: usize = 72;

#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    prehash: bool,
}

impl CredentialHasher {
    pub fn new(prehash: bool, work: &Argon2Config) -> Result<Self, AuthError> {
        let params = Params::new(work.memory_kib, work.iterations, work.lanes, None)
            .map_err(|e| AuthError::Internal(format!("argon2 params: {}", e)))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            prehash,
        })
    }

    /// Hash a password into a PHC string with a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let input = self.prepare(plaintext)?;
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(&input, &salt)
            .map(|hash| hash.to_string())
            .map_err(hash_failure)
    }

    /// True iff `plaintext` produced `digest`. A digest that is not a PHC
    /// string is an error, not a mismatch.
    pub fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(digest)
            .map_err(|e| AuthError::CredentialFormat(format!("stored hash: {}", e)))?;
        let input = match self.prepare(plaintext) {
            Ok(input) => input,
            // could never have been hashed
            Err(AuthError::CredentialFormat(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        Ok(self.argon2.verify_password(&input, &parsed).is_ok())
    }

    fn prepare(&self, plaintext: &str) -> Result<Vec<u8>, AuthError> {
        if self.prehash {
            return Ok(Sha256::digest(plaintext.as_bytes()).to_vec());
        }
        if plaintext.len() > MAX_RAW_PASSWORD_BYTES {
            return Err(AuthError::CredentialFormat(format!(
                "password exceeds {} bytes",
                MAX_RAW_PASSWORD_BYTES
            )));
        }
        Ok(plaintext.as_bytes().to_vec())
    }
}

/// Argon2 rejecting valid input is a server fault, not a client one.
fn hash_failure(err: argon2::password_hash::Error) -> AuthError {
    AuthError::Internal(format!("hashing failed: {}", err))
}

#[cfg(test)]
pub(crate) fn test_hasher() -> CredentialHasher {
    let cheap = Argon2Config {
        memory_kib: 64,
        iterations: 1,
        lanes: 1,
    };
    CredentialHasher::new(true, &cheap).unwrap()
}
