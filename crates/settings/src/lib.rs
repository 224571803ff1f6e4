//! Environment configuration for HellForge.
//! HellForge 的環境設定。

pub mod color;
pub mod config;
pub mod recent;
pub mod store;

pub use color::{ColorParseError, Rgba, DEFAULT_BG_COLOR};
pub use config::{Config, StaticLayout, ViewMode, DEFAULT_LOG_FILE};
pub use recent::{RecentProjects, MAX_RECENT_PROJECTS};
pub use store::{ConfigError, ConfigStore, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
