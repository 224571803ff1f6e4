use hellforge_project::{ErrorKind, FileType, ProjectError, ResourceError};
use hellforge_settings::ConfigError;
use thiserror::Error;

/// 應用層錯誤。 / Errors surfaced by the workbench.
#[derive(Debug, Error)]
pub enum WorkbenchError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no editor is registered for {0} files")]
    NoEditor(FileType),
    #[error("no project is open")]
    NoProject,
    #[error("no open editor with id {0}")]
    UnknownEditor(String),
}

impl WorkbenchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkbenchError::Resource(err) => err.kind(),
            WorkbenchError::Project(err) => err.kind(),
            WorkbenchError::Config(err) => err.kind(),
            WorkbenchError::NoEditor(_) => ErrorKind::Unsupported,
            WorkbenchError::NoProject | WorkbenchError::UnknownEditor(_) => ErrorKind::NotFound,
        }
    }
}
