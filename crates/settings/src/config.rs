use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hellforge_project::AppState;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::color::Rgba;
use crate::recent::RecentProjects;

/// 預設日誌檔名。 / File name of the default log, placed next to the configuration.
pub const DEFAULT_LOG_FILE: &str = "output.log";

const DEFAULT_PROJECT_SPLIT: f32 = 0.2;
const DEFAULT_ARCHIVE_SPLIT: f32 = 1.0 - DEFAULT_PROJECT_SPLIT / (1.0 - DEFAULT_PROJECT_SPLIT);
const DEFAULT_CONSOLE_SPLIT: f32 = 0.8;

/// 視窗排列模式。 / How tool windows are arranged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// 自由浮動視窗。 / Free floating windows.
    #[default]
    Legacy,
    /// 固定分割版面。 / Fixed split layout.
    Static,
}

/// 固定版面的分割比例。 / Split ratios of the static layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StaticLayout {
    #[serde(rename = "ProjectSplit")]
    pub project_split: f32,
    #[serde(rename = "MPQSplit")]
    pub archive_split: f32,
    #[serde(rename = "ConsoleSplit")]
    pub console_split: f32,
}

impl Default for StaticLayout {
    fn default() -> Self {
        Self {
            project_split: DEFAULT_PROJECT_SPLIT,
            archive_split: DEFAULT_ARCHIVE_SPLIT,
            console_split: DEFAULT_CONSOLE_SPLIT,
        }
    }
}

impl StaticLayout {
    fn sanitize(&mut self) {
        let defaults = Self::default();
        for (value, fallback) in [
            (&mut self.project_split, defaults.project_split),
            (&mut self.archive_split, defaults.archive_split),
            (&mut self.console_split, defaults.console_split),
        ] {
            if !(value.is_finite() && *value > 0.0 && *value < 1.0) {
                *value = fallback;
            }
        }
    }
}

/// 應用程式環境設定。 / Application-wide environment configuration (`environment.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub recent_projects: RecentProjects,
    #[serde(default)]
    pub abyss_engine_path: String,
    #[serde(default, rename = "auxiliaryMpqPath")]
    pub auxiliary_archive_path: String,
    #[serde(default)]
    pub external_list_file: String,
    #[serde(default = "default_true")]
    pub open_most_recent_on_startup: bool,
    #[serde(default)]
    pub project_states: BTreeMap<String, AppState>,
    #[serde(default)]
    pub logging_to_file: bool,
    #[serde(default, rename = "logFile")]
    pub log_file_path: String,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default)]
    pub bg_color: Rgba,
    #[serde(default, rename = "ViewMode")]
    pub view_mode: ViewMode,
    #[serde(default, rename = "StaticLayout")]
    pub static_layout: StaticLayout,
}

fn default_true() -> bool {
    true
}

fn default_locale() -> String {
    "en".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recent_projects: RecentProjects::default(),
            abyss_engine_path: String::new(),
            auxiliary_archive_path: String::new(),
            external_list_file: String::new(),
            open_most_recent_on_startup: true,
            project_states: BTreeMap::new(),
            logging_to_file: false,
            log_file_path: String::new(),
            locale: default_locale(),
            bg_color: Rgba::default(),
            view_mode: ViewMode::default(),
            static_layout: StaticLayout::default(),
        }
    }
}

impl Config {
    /// 建立儲存在指定路徑的預設設定。 / Defaults for a configuration stored at `config_path`.
    pub fn defaults_for(config_path: &Path) -> Self {
        let mut config = Self::default();
        config.sanitize(config_path);
        config
    }

    /// 修正不合法的數值。 / Replaces out-of-range or empty values with their defaults.
    pub fn sanitize(&mut self, config_path: &Path) {
        if self.log_file_path.trim().is_empty() {
            let dir = config_path.parent().unwrap_or_else(|| Path::new(""));
            self.log_file_path = dir.join(DEFAULT_LOG_FILE).to_string_lossy().into_owned();
        }
        if self.locale.trim().is_empty() {
            self.locale = default_locale();
        }
        self.static_layout.sanitize();
    }

    /// 記錄最近開啟的專案。 / Records a project as the most recently opened one.
    pub fn add_to_recent_projects(&mut self, manifest_path: &Path) {
        self.recent_projects
            .add(manifest_path.to_string_lossy().into_owned());
    }

    /// 取得專案的工作階段。 / Stored session of a project, keyed by manifest path.
    pub fn project_state(&self, manifest_path: &Path) -> Option<&AppState> {
        self.project_states.get(&*manifest_path.to_string_lossy())
    }

    pub fn set_project_state(&mut self, manifest_path: &Path, state: AppState) {
        self.project_states
            .insert(manifest_path.to_string_lossy().into_owned(), state);
    }

    /// 輔助封存檔所在資料夾。 / Directory holding auxiliary archives.
    pub fn auxiliary_archive_dir(&self) -> PathBuf {
        PathBuf::from(&self.auxiliary_archive_path)
    }

    /// 外部檔名清單路徑；未設定時為 `None`。 / External name list, `None` when unset.
    pub fn external_list(&self) -> Option<&Path> {
        let trimmed = self.external_list_file.trim();
        (!trimmed.is_empty()).then(|| Path::new(trimmed))
    }

    /// 日誌檔路徑。 / Path of the log file used when logging to file.
    pub fn log_file(&self) -> &Path {
        Path::new(&self.log_file_path)
    }

    /// 搜尋可用的 `.mpq` 封存檔。 / Walks the auxiliary archive directory for `.mpq` files.
    ///
    /// Unreadable directory entries are skipped.
    pub fn discover_archives(&self) -> Vec<PathBuf> {
        if self.auxiliary_archive_path.trim().is_empty() {
            return Vec::new();
        }

        let mut found: Vec<PathBuf> = WalkDir::new(&self.auxiliary_archive_path)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| {
                entry
                    .path()
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("mpq"))
                    .unwrap_or(false)
            })
            .map(|entry| entry.into_path())
            .collect();
        found.sort();
        found
    }
}
