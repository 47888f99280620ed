//! The persisted vault entry.

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// A named environment-variable value stored in the vault.
///
/// `value` is plaintext in memory and either plaintext or an `enc:v1:`
/// envelope on disk, depending on the vault's encryption mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize)]
pub struct Entry {
    /// Variable name (e.g. "DATABASE_URL").  Never empty.
    pub name: String,

    /// Plaintext value or ciphertext envelope.
    pub value: String,

    /// Free-text label used to tell variants of the same name apart.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
}

impl Entry {
    pub fn new(name: impl Into<String>, value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            label: label.into(),
        }
    }
}
