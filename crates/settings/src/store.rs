use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use hellforge_project::{write_atomic, ErrorKind};
use thiserror::Error;

use crate::config::Config;

/// 設定資料夾名稱。 / Name of the per-application configuration directory.
pub const CONFIG_DIR_NAME: &str = "hellforge";
/// 設定檔名稱。 / File name of the environment configuration.
pub const CONFIG_FILE_NAME: &str = "environment.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot determine the user configuration directory")]
    NoConfigDir,
    #[error("failed to serialize configuration {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write configuration {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::NoConfigDir => ErrorKind::NotFound,
            ConfigError::Serialize { .. } => ErrorKind::DecodeFailure,
            ConfigError::Write { .. } => ErrorKind::Io,
        }
    }
}

/// 設定檔的讀寫入口。 / Loads and persists `environment.json`.
///
/// Clones share one writer lock, so saves issued from different threads are
/// applied one whole file at a time.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// 作業系統預設的設定檔路徑。 / Per-OS default location of the configuration file.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    pub fn at_default_location() -> Result<Self, ConfigError> {
        Ok(Self::new(Self::default_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 載入設定；檔案不存在或損毀時回傳預設值。 / Loads the configuration, falling back to defaults.
    ///
    /// A missing file is created with the defaults. A corrupt file is left
    /// untouched until the next save.
    pub fn load(&self) -> Config {
        let defaults = Config::defaults_for(&self.path);
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                if let Err(err) = self.save(&defaults) {
                    log::warn!("failed to save default configuration: {err}");
                }
                return defaults;
            }
            Err(err) => {
                log::warn!("cannot read configuration {}: {err}", self.path.display());
                return defaults;
            }
        };

        match serde_json::from_slice::<Config>(&data) {
            Ok(mut config) => {
                config.sanitize(&self.path);
                config
            }
            Err(err) => {
                log::warn!(
                    "ignoring corrupt configuration {}: {err}",
                    self.path.display()
                );
                defaults
            }
        }
    }

    /// 寫入設定檔。 / Writes the whole configuration atomically.
    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        let payload =
            serde_json::to_vec_pretty(config).map_err(|source| ConfigError::Serialize {
                path: self.path.clone(),
                source,
            })?;

        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        write_atomic(&self.path, &payload).map_err(|source| ConfigError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_path_ends_with_app_directory() {
        if let Ok(path) = ConfigStore::default_path() {
            assert!(path.ends_with("hellforge/environment.json"));
        }
    }

    #[test]
    fn write_failure_is_an_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, b"").unwrap();
        let store = ConfigStore::new(blocker.join("environment.json"));
        let err = store.save(&Config::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
