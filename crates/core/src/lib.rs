//! 應用核心：編輯器生命週期、工具視窗與工作階段。 / Editor lifecycle, tool windows and session handling.

pub mod autosave;
pub mod editor;
pub mod error;
pub mod registry;
pub mod text_editor;
pub mod tool_window;
pub mod view_state;
pub mod window;
pub mod workbench;

pub use autosave::{AutoSave, AUTOSAVE_INTERVAL};
pub use editor::{
    window_title, Editor, EditorBase, EditorContext, HeadlessPrompter, Prompter, SaveOutcome,
};
pub use error::WorkbenchError;
pub use registry::{EditorConstructor, EditorRegistry};
pub use text_editor::{TextEditor, TextTable, TextViewState, MAX_TABLE_COLUMNS};
pub use tool_window::{ArchiveExplorer, Console, ProjectExplorer, ToolWindow, CONSOLE_CAPACITY};
pub use view_state::{widget_key, ViewState, ViewStateStore};
pub use window::Window;
pub use workbench::{load_resource, Workbench, EDITOR_DEFAULT_POS};
