use std::mem;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hellforge_project::{
    AppState, ArchiveLoader, CopyOutcome, FileType, PathEntry, Project, ProjectManifest,
    ResourceError, ToolWindowKind,
};
use hellforge_settings::{Config, ConfigStore};

use crate::autosave::AutoSave;
use crate::editor::{Editor, EditorContext, Prompter, SaveOutcome};
use crate::error::WorkbenchError;
use crate::registry::EditorRegistry;
use crate::tool_window::{ArchiveExplorer, Console, ProjectExplorer, ToolWindow};
use crate::view_state::ViewStateStore;

/// 新編輯器的預設位置。 / Where newly opened editors appear.
pub const EDITOR_DEFAULT_POS: (f32, f32) = (320.0, 30.0);

/// 背景讀取完成、等待在 UI 執行緒建立的編輯器。 / Editor whose bytes were loaded off-thread.
struct PendingEditor {
    generation: u64,
    entry: PathEntry,
    state: Vec<u8>,
    position: (f32, f32),
    size: (f32, f32),
    loaded: Result<(Vec<u8>, FileType), ResourceError>,
}

/// 讀取資源並判斷類型。 / Reads an entry and detects its file type.
pub fn load_resource(
    entry: &PathEntry,
    loader: &dyn ArchiveLoader,
) -> Result<(Vec<u8>, FileType), ResourceError> {
    let data = entry.read_bytes(loader)?;
    let file_type = FileType::detect(&entry.extension(), &data)?;
    Ok((data, file_type))
}

/// 應用程式層：專案、開啟中的編輯器與工具視窗。 / Application layer owning the project, open editors and tool windows.
///
/// Everything here runs on the UI thread. Session restore reads files on
/// worker threads; [`Workbench::pump_pending`] turns the results into editors.
pub struct Workbench {
    config: Config,
    store: ConfigStore,
    project: Option<Project>,
    editors: Vec<Box<dyn Editor>>,
    registry: EditorRegistry,
    views: ViewStateStore,
    console: Console,
    project_explorer: ProjectExplorer,
    archive_explorer: ArchiveExplorer,
    loader: Arc<dyn ArchiveLoader>,
    prompter: Box<dyn Prompter>,
    pending_tx: Sender<PendingEditor>,
    pending_rx: Receiver<PendingEditor>,
    pending: usize,
    generation: u64,
    autosave: Option<AutoSave>,
}

impl Workbench {
    pub fn new(
        store: ConfigStore,
        config: Config,
        loader: Arc<dyn ArchiveLoader>,
        prompter: Box<dyn Prompter>,
    ) -> Self {
        let (pending_tx, pending_rx) = mpsc::channel();
        Self {
            config,
            store,
            project: None,
            editors: Vec::new(),
            registry: EditorRegistry::with_defaults(),
            views: ViewStateStore::new(),
            console: Console::default(),
            project_explorer: ProjectExplorer::default(),
            archive_explorer: ArchiveExplorer::default(),
            loader,
            prompter,
            pending_tx,
            pending_rx,
            pending: 0,
            generation: 0,
            autosave: None,
        }
    }

    pub fn with_registry(mut self, registry: EditorRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.store
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn project_mut(&mut self) -> Option<&mut Project> {
        self.project.as_mut()
    }

    pub fn registry_mut(&mut self) -> &mut EditorRegistry {
        &mut self.registry
    }

    pub fn loader(&self) -> &dyn ArchiveLoader {
        self.loader.as_ref()
    }

    pub fn views(&self) -> &ViewStateStore {
        &self.views
    }

    pub fn views_mut(&mut self) -> &mut ViewStateStore {
        &mut self.views
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut Console {
        &mut self.console
    }

    pub fn project_explorer(&self) -> &ProjectExplorer {
        &self.project_explorer
    }

    pub fn project_explorer_mut(&mut self) -> &mut ProjectExplorer {
        &mut self.project_explorer
    }

    pub fn archive_explorer(&self) -> &ArchiveExplorer {
        &self.archive_explorer
    }

    pub fn archive_explorer_mut(&mut self) -> &mut ArchiveExplorer {
        &mut self.archive_explorer
    }

    pub fn editors(&self) -> impl Iterator<Item = &dyn Editor> {
        self.editors.iter().map(|editor| editor.as_ref())
    }

    pub fn editor(&self, id: &str) -> Option<&dyn Editor> {
        self.editors
            .iter()
            .find(|editor| editor.id() == id)
            .map(|editor| editor.as_ref())
    }

    pub fn editor_mut(&mut self, id: &str) -> Option<&mut (dyn Editor + 'static)> {
        self.editors
            .iter_mut()
            .find(|editor| editor.id() == id)
            .map(|editor| editor.as_mut())
    }

    pub fn focused_editor_id(&self) -> Option<String> {
        self.editors
            .iter()
            .find(|editor| editor.has_focus())
            .map(|editor| editor.id())
    }

    /// 背景中尚未完成的編輯器數量。 / Restored editors still loading in the background.
    pub fn pending_count(&self) -> usize {
        self.pending
    }

    /// 記錄錯誤並通知使用者。 / Logs an error, appends it to the console and shows it.
    pub fn report(&mut self, context: &str, err: &dyn std::error::Error) {
        let message = format!("{context}: {err}");
        log::error!("{message}");
        self.console.push(&message);
        self.prompter.error(&message);
    }

    /// 讓指定編輯器取得焦點並移到最前面。 / Brings one editor to the front, unfocusing the rest.
    pub fn focus_editor(&mut self, id: &str) -> bool {
        let mut found = false;
        for editor in &mut self.editors {
            if editor.id() == id {
                editor.bring_to_front();
                found = true;
            } else {
                editor.base_mut().window.set_focused(false);
            }
        }
        found
    }

    /// 開啟編輯器；已開啟時移到最前面。 / Opens an editor for `entry`, or focuses the one already open.
    pub fn open_editor(&mut self, entry: PathEntry) -> Result<String, WorkbenchError> {
        let id = entry.unique_id();
        if self.focus_editor(&id) {
            return Ok(id);
        }
        self.create_editor(entry, &[], EDITOR_DEFAULT_POS, (0.0, 0.0))
    }

    /// 建立編輯器。 / Reads, detects, constructs, sizes, shows and focuses a new editor.
    ///
    /// Failures are reported and leave the open editors untouched.
    pub fn create_editor(
        &mut self,
        entry: PathEntry,
        state: &[u8],
        position: (f32, f32),
        size: (f32, f32),
    ) -> Result<String, WorkbenchError> {
        let loaded = load_resource(&entry, self.loader.as_ref());
        self.finish_editor(entry, state, position, size, loaded)
    }

    fn finish_editor(
        &mut self,
        entry: PathEntry,
        state: &[u8],
        position: (f32, f32),
        size: (f32, f32),
        loaded: Result<(Vec<u8>, FileType), ResourceError>,
    ) -> Result<String, WorkbenchError> {
        let full_path = entry.full_path.clone();
        let result = self.construct_editor(entry, state, position, size, loaded);
        if let Err(err) = &result {
            self.report(&format!("could not open {full_path}"), err);
        }
        result
    }

    fn construct_editor(
        &mut self,
        entry: PathEntry,
        state: &[u8],
        position: (f32, f32),
        size: (f32, f32),
        loaded: Result<(Vec<u8>, FileType), ResourceError>,
    ) -> Result<String, WorkbenchError> {
        let (data, file_type) = loaded?;
        let constructor = self
            .registry
            .get(file_type)
            .ok_or(WorkbenchError::NoEditor(file_type))?;

        let mut ctx = EditorContext {
            config: &self.config,
            project: self.project.as_ref(),
            views: &mut self.views,
            position,
        };
        let mut editor = constructor(&mut ctx, entry, state, data)?;
        editor.set_size(size.0, size.1);

        let id = editor.id();
        self.editors.push(editor);
        self.focus_editor(&id);
        Ok(id)
    }

    pub fn save_editor(&mut self, id: &str) -> Result<SaveOutcome, WorkbenchError> {
        let loader = self.loader.as_ref();
        let editor = self
            .editors
            .iter_mut()
            .find(|editor| editor.id() == id)
            .ok_or_else(|| WorkbenchError::UnknownEditor(id.to_string()))?;
        Ok(editor.save(loader)?)
    }

    /// 儲存目前焦點所在的編輯器。 / Saves the focused editor; `None` when nothing has focus.
    pub fn save_focused_editor(&mut self) -> Result<Option<SaveOutcome>, WorkbenchError> {
        match self.focused_editor_id() {
            Some(id) => self.save_editor(&id).map(Some),
            None => Ok(None),
        }
    }

    /// 隱藏焦點編輯器，實際關閉留給 [`Workbench::prune_closed_editors`]。 / Hides the focused editor.
    pub fn close_active_editor(&mut self) {
        if let Some(editor) = self.editors.iter_mut().find(|editor| editor.has_focus()) {
            editor.set_visible(false);
        }
    }

    /// 清理已隱藏的編輯器。 / Cleans up and drops editors that are no longer visible.
    pub fn prune_closed_editors(&mut self) -> usize {
        let (open, closed): (Vec<_>, Vec<_>) = mem::take(&mut self.editors)
            .into_iter()
            .partition(|editor| editor.is_visible());
        self.editors = open;

        let count = closed.len();
        for editor in closed {
            self.dispose_editor(editor);
        }
        count
    }

    /// 關閉全部視窗。 / Closes the explorers and every editor.
    pub fn close_all_open_windows(&mut self) {
        self.project_explorer.cleanup();
        self.archive_explorer.cleanup();
        self.generation += 1;

        for editor in mem::take(&mut self.editors) {
            self.dispose_editor(editor);
        }
    }

    fn dispose_editor(&mut self, mut editor: Box<dyn Editor>) {
        editor.cleanup(self.loader.as_ref(), self.prompter.as_mut());
        editor.teardown(&mut self.views);
    }

    /// 建立新專案並開啟。 / Creates a project at `path` and opens it.
    pub fn new_project(&mut self, path: &Path) -> Result<(), WorkbenchError> {
        let project = Project::create_new(path)?;
        let manifest = project.file_path().to_path_buf();
        self.load_project(&manifest)
    }

    /// 開啟專案並還原其工作階段。 / Opens a project and restores its session.
    ///
    /// Without a stored session the project explorer is shown instead. The
    /// new project is fully opened before anything is swapped, so on error
    /// the current project and its editors stay as they were.
    pub fn load_project(&mut self, path: &Path) -> Result<(), WorkbenchError> {
        let mut project = Project::load(path)?;
        let archive_dir = self.config.auxiliary_archive_dir();
        project.validate_auxiliary_archives(&archive_dir)?;
        project.reload_auxiliary_archives(&archive_dir, self.loader.as_ref())?;

        self.close_all_open_windows();
        self.archive_explorer.reset();

        let manifest = project.file_path().to_path_buf();
        self.project = Some(project);
        self.config.add_to_recent_projects(&manifest);
        if let Err(err) = self.store.save(&self.config) {
            self.report("failed to save config", &err);
        }

        match self.config.project_state(&manifest).cloned() {
            Some(state) => self.restore_app_state(&state),
            None => self.project_explorer.window_mut().show(),
        }
        log::info!("opened project {}", manifest.display());
        Ok(())
    }

    /// 重新載入輔助封存檔。 / Reopens the project's auxiliary archives and drops the explorer cache.
    pub fn reload_auxiliary_archives(&mut self) -> Result<(), WorkbenchError> {
        let project = self.project.as_mut().ok_or(WorkbenchError::NoProject)?;
        self.archive_explorer.reset();
        project.reload_auxiliary_archives(&self.config.auxiliary_archive_dir(), self.loader.as_ref())?;
        Ok(())
    }

    /// 套用並儲存專案屬性。 / Applies and persists new project properties.
    pub fn update_project_properties(
        &mut self,
        manifest: ProjectManifest,
    ) -> Result<(), WorkbenchError> {
        let project = self.project.as_mut().ok_or(WorkbenchError::NoProject)?;
        project.set_properties(manifest);
        project.save()?;
        self.reload_auxiliary_archives()
    }

    /// 套用並儲存偏好設定。 / Applies and persists a new configuration.
    pub fn update_preferences(&mut self, config: Config) -> Result<(), WorkbenchError> {
        self.config = config;
        self.store.save(&self.config)?;
        if self.project.is_some() {
            self.reload_auxiliary_archives()?;
        }
        Ok(())
    }

    /// 排序後的專案樹。 / Sorted project tree as the project explorer shows it.
    pub fn project_tree(&mut self) -> Result<PathEntry, WorkbenchError> {
        let project = self.project.as_mut().ok_or(WorkbenchError::NoProject)?;
        Ok(self.project_explorer.tree(project)?)
    }

    /// 封存檔樹（已快取）。 / Cached per-archive trees for the archive explorer.
    pub fn archive_trees(&mut self) -> Result<&[Option<PathEntry>], WorkbenchError> {
        let project = self.project.as_ref().ok_or(WorkbenchError::NoProject)?;
        Ok(self
            .archive_explorer
            .trees(project, &self.config, self.loader.as_ref()))
    }

    /// 將封存檔中的檔案複製到專案。 / Copies an archive file into the project.
    pub fn copy_to_project(
        &mut self,
        entry: &PathEntry,
        overwrite: bool,
    ) -> Result<CopyOutcome, WorkbenchError> {
        let project = self.project.as_mut().ok_or(WorkbenchError::NoProject)?;
        Ok(project.copy_from_archive(entry, self.loader.as_ref(), overwrite)?)
    }

    /// 擷取工作階段。 / Captures open editors and tool windows.
    pub fn state(&self) -> AppState {
        AppState {
            project_path: self
                .project
                .as_ref()
                .map(|project| project.file_path().to_string_lossy().into_owned())
                .unwrap_or_default(),
            editor_windows: self
                .editors
                .iter()
                .map(|editor| editor.state(&self.views))
                .collect(),
            tool_windows: vec![
                self.archive_explorer.state(),
                self.project_explorer.state(),
                self.console.state(),
            ],
        }
    }

    /// 還原工作階段。 / Restores a captured session.
    ///
    /// Tool windows are applied at once. Each editor record is decoded and its
    /// file read on a worker thread; undecodable records are skipped.
    pub fn restore_app_state(&mut self, state: &AppState) {
        for tool in &state.tool_windows {
            match tool.kind {
                ToolWindowKind::Console => self.console.apply_state(tool),
                ToolWindowKind::MpqExplorer => self.archive_explorer.apply_state(tool),
                ToolWindowKind::ProjectExplorer => self.project_explorer.apply_state(tool),
            }
        }

        for record in &state.editor_windows {
            let entry = match PathEntry::from_identifier(&record.path) {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("failed to restore editor: {err}");
                    continue;
                }
            };

            let sender = self.pending_tx.clone();
            let loader = Arc::clone(&self.loader);
            let generation = self.generation;
            let encoded = record.encoded.clone();
            let position = record.window.position();
            let size = record.window.size();
            self.pending += 1;

            thread::spawn(move || {
                let loaded = load_resource(&entry, loader.as_ref());
                let pending = PendingEditor {
                    generation,
                    entry,
                    state: encoded,
                    position,
                    size,
                    loaded,
                };
                if sender.send(pending).is_err() {
                    log::debug!("workbench dropped before a restored editor finished loading");
                }
            });
        }
    }

    /// 建立已完成讀取的編輯器，不等待。 / Builds every restored editor whose bytes are ready.
    pub fn pump_pending(&mut self) -> usize {
        let mut opened = 0;
        while let Ok(pending) = self.pending_rx.try_recv() {
            if self.complete_pending(pending) {
                opened += 1;
            }
        }
        opened
    }

    /// 等待所有背景讀取完成。 / Blocks until every restored editor has been handled.
    pub fn wait_pending(&mut self) -> usize {
        let mut opened = 0;
        while self.pending > 0 {
            let Ok(pending) = self.pending_rx.recv() else {
                break;
            };
            if self.complete_pending(pending) {
                opened += 1;
            }
        }
        opened
    }

    fn complete_pending(&mut self, pending: PendingEditor) -> bool {
        self.pending = self.pending.saturating_sub(1);
        if pending.generation != self.generation {
            return false;
        }
        if self.editor(&pending.entry.unique_id()).is_some() {
            return false;
        }
        self.finish_editor(
            pending.entry,
            &pending.state,
            pending.position,
            pending.size,
            pending.loaded,
        )
        .is_ok()
    }

    /// 保存工作階段與設定，並儲存焦點編輯器。 / Stores the session, persists the config, saves the focused editor.
    pub fn save(&mut self) {
        if let Some(project) = &self.project {
            let state = self.state();
            self.config.set_project_state(project.file_path(), state);
        }

        if let Err(err) = self.store.save(&self.config) {
            self.report("failed to save config", &err);
            return;
        }

        if let Err(err) = self.save_focused_editor() {
            self.report("failed to save editor", &err);
        }
    }

    /// 結束前儲存並關閉所有視窗。 / Saves, then closes every window.
    pub fn quit(&mut self) {
        self.autosave = None;
        self.save();
        self.close_all_open_windows();
    }

    pub fn start_autosave(&mut self, interval: Duration) {
        self.autosave = Some(AutoSave::start(interval));
    }

    /// 到時間時執行自動儲存。 / Runs [`Workbench::save`] when the auto-save timer fired.
    pub fn poll_autosave(&mut self) -> bool {
        let due = self
            .autosave
            .as_ref()
            .map(AutoSave::is_due)
            .unwrap_or(false);
        if due {
            log::debug!("auto-saving");
            self.save();
        }
        due
    }
}
