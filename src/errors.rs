use thiserror::Error;

/// All errors that can occur in EnvSwitch.
#[derive(Debug, Error)]
pub enum EnvSwitchError {
    // --- Crypto errors ---
    #[error("Invalid key size: expected 32 bytes, got {0}")]
    InvalidKeySize(usize),

    #[error("Malformed ciphertext envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Decryption failed — wrong key or tampered data")]
    AuthenticationFailure,

    #[error("Random number generator failure: {0}")]
    Entropy(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Vault state errors ---
    #[error("Variable '{0}' is already encrypted")]
    AlreadyEncrypted(String),

    #[error("Variable '{0}' is not encrypted")]
    NotEncrypted(String),

    #[error("Unknown encryption mode: '{0}'")]
    UnknownMode(String),

    #[error("Vault is already encrypted — use `envswitch rotate` to change the key")]
    VaultAlreadyEncrypted,

    #[error("Vault is not encrypted")]
    VaultNotEncrypted,

    #[error("Vault is not password-protected")]
    NotPasswordProtected,

    #[error("No variables in the vault")]
    NoEntries,

    #[error("Invalid vault format: {0}")]
    InvalidVaultFormat(String),

    // --- Auth errors ---
    #[error("Wrong password")]
    WrongPassword,

    #[error("Too many wrong password attempts")]
    TooManyAttempts,

    #[error("Invalid password from ENVSWITCH_PASSWORD")]
    InvalidEnvPassword,

    #[error("Password mismatch — passwords do not match")]
    PasswordMismatch,

    // --- Persist errors ---
    #[error("Failed to save variables: {0}")]
    Persist(String),

    // --- Keychain errors ---
    #[error("Keychain error: {0}")]
    Keychain(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    #[error("Cannot parse {path} line {line}: {reason}")]
    DotenvParse {
        path: String,
        line: usize,
        reason: String,
    },

    #[error("Could not determine the home directory")]
    HomeDirNotFound,

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

impl EnvSwitchError {
    /// Returns `true` for the wrong-password case that prompt loops may retry.
    pub fn is_wrong_password(&self) -> bool {
        matches!(self, Self::WrongPassword)
    }
}

/// Convenience type alias for EnvSwitch results.
pub type Result<T> = std::result::Result<T, EnvSwitchError>;
