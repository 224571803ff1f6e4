//! Resource tree, project resolver and session model for HellForge.
//! 管理 HellForge 資源樹、專案解析與工作階段模型的核心模組。

mod serde_b64;
mod util;

pub mod archive;
pub mod error;
pub mod file_type;
pub mod path_entry;
pub mod project;
pub mod session;

pub use archive::{
    archive_tree, load_archive_trees, normalize_name, Archive, ArchiveLoader, MemoryArchive,
    MemoryArchiveLoader, ZipArchiveLoader, ZipContainer,
};
pub use error::{ErrorKind, ProjectError, ResourceError};
pub use file_type::{FileType, TemplateFn, TemplateRegistry};
pub use path_entry::{PathEntry, PathEntrySource};
pub use project::{
    CopyOutcome, Project, ProjectManifest, CONTENT_DIR, MAX_NEW_FILE_ATTEMPTS, PROJECT_EXTENSION,
};
pub use session::{AppState, EditorState, ToolWindowKind, ToolWindowState, WindowState};
pub use util::write_atomic;
