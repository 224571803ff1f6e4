use hellforge_project::{
    ArchiveLoader, EditorState, PathEntry, PathEntrySource, Project, ResourceError,
};
use hellforge_settings::Config;

use crate::view_state::ViewStateStore;
use crate::window::Window;

/// 宿主提供的訊息對話框。 / Host-provided message dialogs.
pub trait Prompter {
    /// 是/否詢問。 / Asks a yes/no question.
    fn confirm(&mut self, message: &str) -> bool;
    /// 顯示錯誤。 / Shows an error message.
    fn error(&mut self, message: &str);
}

/// 無介面環境使用的對話框，回覆固定答案並記錄訊息。 / Prompter for headless hosts: fixed answer, recorded messages.
#[derive(Debug, Clone, Default)]
pub struct HeadlessPrompter {
    pub answer: bool,
    pub questions: Vec<String>,
    pub errors: Vec<String>,
}

impl HeadlessPrompter {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer,
            ..Self::default()
        }
    }
}

impl Prompter for HeadlessPrompter {
    fn confirm(&mut self, message: &str) -> bool {
        self.questions.push(message.to_string());
        self.answer
    }

    fn error(&mut self, message: &str) {
        log::error!("{message}");
        self.errors.push(message.to_string());
    }
}

/// 儲存動作的結果。 / What a save attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// 內容與磁碟相同，未寫入。 / Content matched the file on disk; nothing was written.
    Unchanged,
    /// 來源不可寫入（封存檔）。 / The entry is not writable (archive sourced).
    ReadOnly,
    /// 編輯器沒有可儲存的資料。 / The editor produced no data.
    Nothing,
}

/// 所有編輯器共用的狀態。 / State shared by every editor: its window and the entry it edits.
#[derive(Debug, Clone)]
pub struct EditorBase {
    pub window: Window,
    pub path: PathEntry,
}

impl EditorBase {
    pub fn new(path: PathEntry, position: (f32, f32)) -> Self {
        let window = Window::new(window_title(&path), position.0, position.1);
        Self { window, path }
    }
}

/// 視窗標題：顯示名稱加上唯一識別碼。 / Window title: display name, `##`, unique id.
pub fn window_title(path: &PathEntry) -> String {
    format!("{}##{}", path.name, path.unique_id())
}

/// 編輯器建構時可使用的環境。 / Collaborators handed to editor constructors.
pub struct EditorContext<'a> {
    pub config: &'a Config,
    pub project: Option<&'a Project>,
    pub views: &'a mut ViewStateStore,
    pub position: (f32, f32),
}

/// 以解碼後的資源建立的視窗。 / A live window bound to one decoded resource.
///
/// Implementors supply [`Editor::base`] and [`Editor::generate_save_data`];
/// the lifecycle methods are shared.
pub trait Editor {
    fn base(&self) -> &EditorBase;

    fn base_mut(&mut self) -> &mut EditorBase;

    /// 產生要寫回檔案的內容。 / Bytes to write back, `None` when the editor has nothing to save.
    fn generate_save_data(&self) -> Option<Vec<u8>>;

    /// 唯一識別碼。 / Identity of the editor, equal to its entry's unique id.
    fn id(&self) -> String {
        self.base().path.unique_id()
    }

    fn title(&self) -> String {
        window_title(&self.base().path)
    }

    fn path(&self) -> &PathEntry {
        &self.base().path
    }

    fn is_visible(&self) -> bool {
        self.base().window.is_visible()
    }

    fn set_visible(&mut self, visible: bool) {
        self.base_mut().window.set_visible(visible);
    }

    fn show(&mut self) {
        self.base_mut().window.show();
    }

    fn has_focus(&self) -> bool {
        self.base().window.has_focus()
    }

    fn bring_to_front(&mut self) {
        let window = &mut self.base_mut().window;
        window.show();
        window.set_focused(true);
    }

    fn set_size(&mut self, width: f32, height: f32) {
        self.base_mut().window.set_size(width, height);
    }

    /// 寫回變更；內容未變時不寫入。 / Writes changes back, skipping the write when bytes are identical.
    fn save(&mut self, loader: &dyn ArchiveLoader) -> Result<SaveOutcome, ResourceError> {
        let path = &self.base().path;
        if path.source != PathEntrySource::Project {
            return Ok(SaveOutcome::ReadOnly);
        }

        let Some(data) = self.generate_save_data() else {
            return Ok(SaveOutcome::Nothing);
        };
        let existing = path.read_bytes(loader)?;
        if existing == data {
            return Ok(SaveOutcome::Unchanged);
        }

        path.write_bytes(&data)?;
        Ok(SaveOutcome::Written)
    }

    /// 是否有未儲存變更；發生錯誤時視為沒有。 / Whether unsaved changes exist; errors count as none.
    fn has_changes(&self, loader: &dyn ArchiveLoader) -> bool {
        let path = &self.base().path;
        if path.source != PathEntrySource::Project {
            return false;
        }
        match (self.generate_save_data(), path.read_bytes(loader)) {
            (Some(data), Ok(existing)) => data != existing,
            _ => false,
        }
    }

    /// 匯出工作階段記錄。 / Session record: window geometry, entry identifier, view-state payload.
    fn state(&self, views: &ViewStateStore) -> EditorState {
        let base = self.base();
        let path = base.path.to_identifier().unwrap_or_else(|err| {
            log::error!("failed to encode editor path {}: {err}", base.path.full_path);
            Vec::new()
        });
        EditorState {
            path,
            encoded: views.encode(&self.id()).unwrap_or_default(),
            window: base.window.state(),
        }
    }

    /// 關閉前詢問是否儲存；關閉一定會進行。 / Offers to save unsaved changes, then hides the editor.
    fn cleanup(&mut self, loader: &dyn ArchiveLoader, prompter: &mut dyn Prompter) {
        if self.has_changes(loader) {
            let question = format!(
                "There are unsaved changes to {}, save before closing this editor?",
                self.base().path.full_path
            );
            if prompter.confirm(&question) {
                if let Err(err) = self.save(loader) {
                    prompter.error(&format!("failed to save file: {err}"));
                }
            }
        }
        self.set_visible(false);
    }

    /// 釋放編輯器資源與檢視狀態。 / Final teardown: hides the window and evicts the view state.
    ///
    /// Editors holding extra resources override this and call
    /// [`ViewStateStore::evict`] themselves.
    fn teardown(&mut self, views: &mut ViewStateStore) {
        self.set_visible(false);
        views.evict(&self.id());
    }
}
