//! Vault module: the optionally encrypted entry store.
//!
//! This module provides:
//! - The persisted `Entry` type (`entry`)
//! - The JSON file format and encryption header (`format`)
//! - `VaultStore` with transactional saves and mode transitions (`store`)

pub mod entry;
pub mod format;
pub mod store;

// Re-export the most commonly used items.
pub use entry::Entry;
pub use format::{EncryptionHeader, VaultFile};
pub use store::{LockMethod, VaultStore};
