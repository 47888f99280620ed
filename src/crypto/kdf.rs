//! Password-based key derivation and password verification.
//!
//! Argon2id turns a password + salt into the 32-byte vault key.  The
//! parameters are fixed (64 MiB, 3 iterations, 4 lanes) so a vault can be
//! reopened without storing them.  A verifier, `HMAC-SHA256(key, salt)`,
//! is kept in the vault header so a password can be checked without
//! touching any entry ciphertext.

use argon2::{Algorithm, Argon2, Params, Version};
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::errors::{EnvSwitchError, Result};

/// Length of the salt in bytes (128 bits).
pub const SALT_LEN: usize = 16;

/// Length of the vault key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Argon2id memory cost in KiB (64 MiB).
const ARGON2_MEMORY_KIB: u32 = 64 * 1024;

/// Argon2id iteration count.
const ARGON2_ITERATIONS: u32 = 3;

/// Argon2id parallelism lanes.
const ARGON2_PARALLELISM: u32 = 4;

/// Fill `buf` from the OS random number generator.
pub(crate) fn fill_random(buf: &mut [u8]) -> Result<()> {
    OsRng
        .try_fill_bytes(buf)
        .map_err(|e| EnvSwitchError::Entropy(e.to_string()))
}

/// Generate a random 16-byte salt for Argon2id.
pub fn generate_salt() -> Result<[u8; SALT_LEN]> {
    let mut salt = [0u8; SALT_LEN];
    fill_random(&mut salt)?;
    Ok(salt)
}

/// Generate a random 32-byte key (used for keychain mode).
pub fn generate_key() -> Result<[u8; KEY_LEN]> {
    let mut key = [0u8; KEY_LEN];
    fill_random(&mut key)?;
    Ok(key)
}

/// Derive a 32-byte key from a password and salt using Argon2id.
///
/// The same password + salt always produce the same key.  This is slow
/// on purpose.
pub fn derive_key(password: &[u8], salt: &[u8]) -> Result<[u8; KEY_LEN]> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_ITERATIONS,
        ARGON2_PARALLELISM,
        Some(KEY_LEN),
    )
    .map_err(|e| EnvSwitchError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password, salt, &mut key)
        .map_err(|e| {
            EnvSwitchError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}"))
        })?;

    Ok(key)
}

/// Compute the password verifier: `HMAC-SHA256(key, salt)`.
pub fn compute_verifier(key: &[u8], salt: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key)
        .map_err(|e| EnvSwitchError::KeyDerivationFailed(format!("HMAC init failed: {e}")))?;
    mac.update(salt);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Check `password` against a stored salt and verifier.
///
/// Returns the derived key when the password is correct, so callers do
/// not pay for Argon2id twice.  The comparison is constant-time.
pub fn check_password(password: &[u8], salt: &[u8], verifier: &[u8]) -> Result<Option<[u8; KEY_LEN]>> {
    let mut key = derive_key(password, salt)?;
    let computed = compute_verifier(&key, salt)?;

    if computed.ct_eq(verifier).into() {
        Ok(Some(key))
    } else {
        key.zeroize();
        Ok(None)
    }
}

/// Returns `true` only when both `password` and `salt` match the ones
/// used to produce `verifier`.
pub fn verify_password(password: &[u8], salt: &[u8], verifier: &[u8]) -> Result<bool> {
    Ok(check_password(password, salt, verifier)?
        .map(|mut key| key.zeroize())
        .is_some())
}
