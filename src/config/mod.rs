//! User settings and path resolution.

pub mod settings;

pub use settings::{config_dir, Settings, CONFIG_DIR_NAME};
