mod raw;
mod loader;
pub mod error;

pub use error::ConfigError;
pub use loader::{load_config, load_config_with, HarnessConfig, CONFIG_FILE_NAME};
