//! EnvSwitch: keep several values per environment variable in an
//! optionally encrypted vault and switch between them from the shell.

pub mod cli;
pub mod config;
pub mod crypto;
pub mod dotenv;
pub mod errors;
pub mod filter;
pub mod keychain;
pub mod selection;
pub mod session;
pub mod storage;
pub mod vault;
