/// Password Hashing and Verification
///
/// Argon2id credential hashes in PHC form
/// `$argon2id$v=19$m=<memory>,t=<iterations>,p=<parallelism>$<salt>$<digest>`
/// with salt and digest encoded as unpadded standard base64.

use argon2::password_hash::{Error as PhcError, SaltString};
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher as _, PasswordVerifier, Version,
};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;

const SALT_LENGTH: usize = 16;

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    /// Derived key length in bytes
    pub output_len: usize,
}

impl Default for HashParams {
    fn default() -> Self {
        Self {
            memory_kib: 19 * 1024,
            iterations: 2,
            parallelism: 1,
            output_len: 32,
        }
    }
}

#[derive(Debug, Error)]
pub enum HashError {
    #[error("secure randomness unavailable: {0}")]
    Randomness(#[source] std::io::Error),
    #[error("malformed credential hash: {0}")]
    Format(&'static str),
    #[error("incompatible argon2 version {found}, expected {expected}")]
    Version { found: u32, expected: u32 },
    #[error("argon2 derivation failed: {0}")]
    Derivation(String),
}

/// One-way password hashing with constant-time verification
pub trait PasswordHasher: Send + Sync {
    /// Hash a password with a fresh random salt
    fn hash(&self, password: &str) -> Result<String, HashError>;

    /// Verify a password against a stored credential hash
    ///
    /// # Errors
    /// Returns an error if the stored hash cannot be parsed or was produced
    /// by a different argon2 version. A wrong password is `Ok(false)`.
    fn verify(&self, password: &str, encoded_hash: &str) -> Result<bool, HashError>;
}

#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher {
    params: HashParams,
}

impl Argon2Hasher {
    pub fn new(params: HashParams) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Result<Argon2<'static>, HashError> {
        let params = Params::new(
            self.params.memory_kib,
            self.params.iterations,
            self.params.parallelism,
            Some(self.params.output_len),
        )
        .map_err(|e| HashError::Derivation(e.to_string()))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, HashError> {
        let mut salt = [0u8; SALT_LENGTH];
        OsRng.try_fill_bytes(&mut salt).map_err(|e| {
            tracing::error!(error = %e, "Failed to gather salt from the OS random source");
            HashError::Randomness(std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))
        })?;
        let salt = SaltString::encode_b64(&salt).map_err(|e| HashError::Derivation(e.to_string()))?;

        self.argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| HashError::Derivation(e.to_string()))
    }

    fn verify(&self, password: &str, encoded_hash: &str) -> Result<bool, HashError> {
        let stored = parse_stored_hash(encoded_hash)?;

        // Re-derives with the parameters embedded in `stored`, not `self.params`.
        match Argon2::default().verify_password(password.as_bytes(), &stored) {
            Ok(()) => Ok(true),
            Err(PhcError::Password) => Ok(false),
            Err(e) => Err(HashError::Derivation(e.to_string())),
        }
    }
}

fn parse_stored_hash(encoded: &str) -> Result<PasswordHash<'_>, HashError> {
    // Leading '$' yields an empty first element, then exactly five fields.
    let fields: Vec<&str> = encoded.split('$').collect();
    if fields.len() != 6 || !fields[0].is_empty() {
        return Err(HashError::Format("expected five '$'-delimited fields"));
    }

    let stored = PasswordHash::new(encoded).map_err(|_| HashError::Format("unparseable PHC string"))?;

    if stored.algorithm != Algorithm::Argon2id.ident() {
        return Err(HashError::Format("unsupported algorithm marker"));
    }

    let expected = Version::V0x13 as u32;
    match stored.version {
        Some(found) if found == expected => {}
        Some(found) => return Err(HashError::Version { found, expected }),
        None => return Err(HashError::Format("missing version field")),
    }

    if stored.salt.is_none() || stored.hash.is_none() {
        return Err(HashError::Format("empty salt or digest"));
    }

    Ok(stored)
}
