//! JSON vault file format and the encryption header.
//!
//! A vault file looks like this:
//!
//! ```text
//! {
//!   "encryption": { "mode": "password", "salt": "<base64>", "verifier": "<base64>" },
//!   "entries": [ { "name": "...", "value": "<plaintext or enc:v1:...>", "label": "..." } ]
//! }
//! ```
//!
//! - `encryption` omitted or `{}` means the vault is unencrypted.
//! - `salt`/`verifier` are present only for `mode = "password"`.
//!
//! On disk the header is three loose strings; in memory it is the
//! `EncryptionHeader` enum, so "salt and verifier iff password mode"
//! cannot be violated once a file has been parsed.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::entry::Entry;
use crate::errors::{EnvSwitchError, Result};

// ---------------------------------------------------------------------------
// EncryptionHeader
// ---------------------------------------------------------------------------

/// How the entry values of a vault are protected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EncryptionHeader {
    /// Values are stored in plaintext.
    #[default]
    None,

    /// The key is derived from a password with Argon2id.
    Password {
        /// Argon2id salt (16 bytes).
        salt: Vec<u8>,
        /// `HMAC-SHA256(key, salt)`.
        verifier: Vec<u8>,
    },

    /// The key is random and lives in the OS keychain.
    Keychain,
}

impl EncryptionHeader {
    /// Returns `true` if encryption is configured.
    pub fn enabled(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// Mode name as written on disk (empty for `None`).
    pub fn mode_name(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Password { .. } => "password",
            Self::Keychain => "keychain",
        }
    }
}

/// On-disk shape of the header.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawHeader {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    mode: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    salt: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    verifier: String,
}

impl TryFrom<RawHeader> for EncryptionHeader {
    type Error = EnvSwitchError;

    fn try_from(raw: RawHeader) -> Result<Self> {
        match raw.mode.as_str() {
            "" => {
                if !raw.salt.is_empty() || !raw.verifier.is_empty() {
                    return Err(EnvSwitchError::InvalidVaultFormat(
                        "salt/verifier present on an unencrypted vault".into(),
                    ));
                }
                Ok(Self::None)
            }
            "keychain" => {
                if !raw.salt.is_empty() || !raw.verifier.is_empty() {
                    return Err(EnvSwitchError::InvalidVaultFormat(
                        "salt/verifier present on a keychain vault".into(),
                    ));
                }
                Ok(Self::Keychain)
            }
            "password" => {
                let salt = decode_field("salt", &raw.salt)?;
                let verifier = decode_field("verifier", &raw.verifier)?;
                Ok(Self::Password { salt, verifier })
            }
            other => Err(EnvSwitchError::UnknownMode(other.to_string())),
        }
    }
}

impl From<&EncryptionHeader> for RawHeader {
    fn from(header: &EncryptionHeader) -> Self {
        match header {
            EncryptionHeader::None => Self::default(),
            EncryptionHeader::Password { salt, verifier } => Self {
                mode: header.mode_name().to_string(),
                salt: BASE64.encode(salt),
                verifier: BASE64.encode(verifier),
            },
            EncryptionHeader::Keychain => Self {
                mode: header.mode_name().to_string(),
                ..Self::default()
            },
        }
    }
}

fn decode_field(field: &str, encoded: &str) -> Result<Vec<u8>> {
    if encoded.is_empty() {
        return Err(EnvSwitchError::InvalidVaultFormat(format!(
            "password vault is missing its {field}"
        )));
    }
    BASE64
        .decode(encoded)
        .map_err(|e| EnvSwitchError::InvalidVaultFormat(format!("invalid {field}: {e}")))
}

// ---------------------------------------------------------------------------
// VaultFile
// ---------------------------------------------------------------------------

/// The whole vault as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VaultFile {
    pub header: EncryptionHeader,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RawVaultFile {
    #[serde(default)]
    encryption: RawHeader,
    #[serde(default)]
    entries: Vec<Entry>,
}

impl VaultFile {
    /// Returns `true` if encryption is enabled.
    pub fn encrypted(&self) -> bool {
        self.header.enabled()
    }

    /// Parse vault bytes.  Empty input is an empty, unencrypted vault.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let raw: RawVaultFile = serde_json::from_slice(data)
            .map_err(|e| EnvSwitchError::InvalidVaultFormat(format!("vault JSON: {e}")))?;

        for entry in &raw.entries {
            if entry.name.is_empty() {
                return Err(EnvSwitchError::InvalidVaultFormat(
                    "entry with an empty name".into(),
                ));
            }
        }

        Ok(Self {
            header: EncryptionHeader::try_from(raw.encryption)?,
            entries: raw.entries,
        })
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let raw = RawVaultFile {
            encryption: RawHeader::from(&self.header),
            entries: self.entries.clone(),
        };
        serde_json::to_vec_pretty(&raw)
            .map_err(|e| EnvSwitchError::SerializationError(format!("vault: {e}")))
    }
}
