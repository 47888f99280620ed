//! AES-256-GCM authenticated encryption of single values.
//!
//! Each call to `encrypt` draws a fresh random 12-byte nonce.  The result
//! is a self-describing text envelope that can sit in a JSON string:
//!
//! ```text
//! enc:v1:<base64( 12-byte nonce | ciphertext | 16-byte auth tag )>
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use super::kdf::{fill_random, KEY_LEN};
use crate::errors::{EnvSwitchError, Result};

/// Prefix that marks a value as an encrypted envelope.
pub const ENVELOPE_PREFIX: &str = "enc:v1:";

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
const TAG_LEN: usize = 16;

fn cipher(key: &[u8]) -> Result<Aes256Gcm> {
    if key.len() != KEY_LEN {
        return Err(EnvSwitchError::InvalidKeySize(key.len()));
    }
    Aes256Gcm::new_from_slice(key).map_err(|_| EnvSwitchError::InvalidKeySize(key.len()))
}

/// Encrypt `plaintext` with a 32-byte `key` and wrap it in an envelope.
pub fn encrypt(key: &[u8], plaintext: &str) -> Result<String> {
    let cipher = cipher(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    fill_random(&mut nonce_bytes)?;
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| EnvSwitchError::SerializationError(format!("encryption error: {e}")))?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);

    Ok(format!("{ENVELOPE_PREFIX}{}", BASE64.encode(sealed)))
}

/// Decrypt an envelope produced by `encrypt`.
pub fn decrypt(key: &[u8], envelope: &str) -> Result<String> {
    let encoded = envelope
        .strip_prefix(ENVELOPE_PREFIX)
        .ok_or_else(|| EnvSwitchError::MalformedEnvelope("missing enc:v1: prefix".into()))?;

    let sealed = BASE64
        .decode(encoded)
        .map_err(|e| EnvSwitchError::MalformedEnvelope(format!("invalid base64: {e}")))?;

    let cipher = cipher(key)?;

    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(EnvSwitchError::AuthenticationFailure);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| EnvSwitchError::AuthenticationFailure)?;

    String::from_utf8(plaintext).map_err(|_| EnvSwitchError::AuthenticationFailure)
}

/// Format-only check: does `value` carry the envelope prefix?
///
/// A plaintext value that happens to start with `enc:v1:` is
/// misclassified.
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENVELOPE_PREFIX)
}
