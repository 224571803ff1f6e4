use std::collections::VecDeque;

use hellforge_project::{
    ArchiveLoader, PathEntry, Project, ProjectError, ToolWindowKind, ToolWindowState,
};
use hellforge_settings::Config;

use crate::window::Window;

/// 主控台保留的行數。 / Lines the console keeps before dropping the oldest.
pub const CONSOLE_CAPACITY: usize = 1000;

const PROJECT_EXPLORER_POS: (f32, f32) = (0.0, 25.0);
const ARCHIVE_EXPLORER_POS: (f32, f32) = (30.0, 30.0);
const CONSOLE_POS: (f32, f32) = (10.0, 500.0);

/// 固定的工具視窗。 / A fixed panel that is not bound to a resource.
pub trait ToolWindow {
    fn kind(&self) -> ToolWindowKind;

    fn window(&self) -> &Window;

    fn window_mut(&mut self) -> &mut Window;

    fn state(&self) -> ToolWindowState {
        ToolWindowState {
            kind: self.kind(),
            window: self.window().state(),
        }
    }

    fn apply_state(&mut self, state: &ToolWindowState) {
        self.window_mut().apply(&state.window);
    }

    fn toggle_visibility(&mut self) {
        self.window_mut().toggle_visibility();
    }

    /// 關閉工具視窗。 / Hides the tool window.
    fn cleanup(&mut self) {
        self.window_mut().set_visible(false);
    }
}

/// 主控台：保存最近的訊息。 / Console: a bounded buffer of recent messages.
#[derive(Debug, Clone)]
pub struct Console {
    window: Window,
    lines: VecDeque<String>,
    capacity: usize,
}

impl Default for Console {
    fn default() -> Self {
        Self::new(CONSOLE_CAPACITY)
    }
}

impl Console {
    pub fn new(capacity: usize) -> Self {
        Self {
            window: Window::new(ToolWindowKind::Console.title(), CONSOLE_POS.0, CONSOLE_POS.1),
            lines: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// 加入訊息，多行訊息會拆開。 / Appends a message, one entry per line.
    pub fn push(&mut self, message: &str) {
        for line in message.lines() {
            self.lines.push_back(line.to_string());
        }
        while self.lines.len() > self.capacity {
            self.lines.pop_front();
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl ToolWindow for Console {
    fn kind(&self) -> ToolWindowKind {
        ToolWindowKind::Console
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn window_mut(&mut self) -> &mut Window {
        &mut self.window
    }
}

/// 專案總管。 / Project explorer: the sorted tree of the project's content.
#[derive(Debug, Clone)]
pub struct ProjectExplorer {
    window: Window,
}

impl Default for ProjectExplorer {
    fn default() -> Self {
        Self {
            window: Window::new(
                ToolWindowKind::ProjectExplorer.title(),
                PROJECT_EXPLORER_POS.0,
                PROJECT_EXPLORER_POS.1,
            ),
        }
    }
}

impl ProjectExplorer {
    /// 取得排序後的專案樹。 / Sorted copy of the project tree for display.
    pub fn tree(&self, project: &mut Project) -> Result<PathEntry, ProjectError> {
        let mut tree = project.file_structure()?.clone();
        tree.sort_tree();
        Ok(tree)
    }

    /// 重新掃描檔案系統。 / Forces the next [`ProjectExplorer::tree`] to rescan the disk.
    pub fn refresh(&self, project: &mut Project) {
        project.invalidate_file_structure();
    }
}

impl ToolWindow for ProjectExplorer {
    fn kind(&self) -> ToolWindowKind {
        ToolWindowKind::ProjectExplorer
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn window_mut(&mut self) -> &mut Window {
        &mut self.window
    }
}

/// 封存檔總管，快取每個封存檔的節點樹。 / Archive explorer; caches one tree per auxiliary archive.
#[derive(Debug, Clone)]
pub struct ArchiveExplorer {
    window: Window,
    cache: Option<Vec<Option<PathEntry>>>,
}

impl Default for ArchiveExplorer {
    fn default() -> Self {
        Self {
            window: Window::new(
                ToolWindowKind::MpqExplorer.title(),
                ARCHIVE_EXPLORER_POS.0,
                ARCHIVE_EXPLORER_POS.1,
            ),
            cache: None,
        }
    }
}

impl ArchiveExplorer {
    /// 取得（必要時建立）封存檔樹。 / Per-archive trees, built on first use after a reset.
    pub fn trees(
        &mut self,
        project: &Project,
        config: &Config,
        loader: &dyn ArchiveLoader,
    ) -> &[Option<PathEntry>] {
        self.cache.get_or_insert_with(|| {
            project.archive_trees(
                &config.auxiliary_archive_dir(),
                config.external_list(),
                loader,
            )
        })
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// 清除快取。 / Drops the cached trees.
    pub fn reset(&mut self) {
        self.cache = None;
    }
}

impl ToolWindow for ArchiveExplorer {
    fn kind(&self) -> ToolWindowKind {
        ToolWindowKind::MpqExplorer
    }

    fn window(&self) -> &Window {
        &self.window
    }

    fn window_mut(&mut self) -> &mut Window {
        &mut self.window
    }
}
