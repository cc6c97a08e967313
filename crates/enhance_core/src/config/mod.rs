//! Configuration for the video enhancer.
//!
//! Settings live in one TOML file with a table per [`ConfigSection`].
//! [`ConfigManager::load_or_create`] creates the file on first use and
//! repairs it in place afterwards, writing atomically.
//!
//! # Example
//!
//! ```no_run
//! use enhance_core::config::ConfigManager;
//!
//! let settings = ConfigManager::new(".config/enhancer.toml").load_or_create().unwrap();
//! println!("Bin dir: {}", settings.tools.bin_dir);
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    ConfigSection, LoggingSettings, PathSettings, PipelineSettings, Settings, ToolSettings,
};
