use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Broad failure classes shared by every layer of the workspace.  
/// 全工作區共用的錯誤分類。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Io,
    Unsupported,
    DecodeFailure,
    CreationFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Io => "i/o failure",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::DecodeFailure => "decode failure",
            ErrorKind::CreationFailed => "creation failed",
        };
        f.write_str(label)
    }
}

/// Errors raised while reading or writing a single resource.  
/// 讀寫單一資源時可能發生的錯誤。
#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("cannot find {path}")]
    NotFound { path: String },
    #[error("could not locate {path} in archive {archive}")]
    NotInArchive { archive: String, path: String },
    #[error("i/o error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("cannot open archive {path}: {message}")]
    Archive { path: String, message: String },
    #[error("{0}")]
    Unsupported(String),
    #[error("cannot decode {path}: {message}")]
    Decode { path: String, message: String },
}

impl ResourceError {
    pub(crate) fn io(path: impl Into<String>, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            return ResourceError::NotFound { path: path.into() };
        }
        ResourceError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ResourceError::NotFound { .. } | ResourceError::NotInArchive { .. } => {
                ErrorKind::NotFound
            }
            ResourceError::Io { .. } | ResourceError::Archive { .. } => ErrorKind::Io,
            ResourceError::Unsupported(_) => ErrorKind::Unsupported,
            ResourceError::Decode { .. } => ErrorKind::DecodeFailure,
        }
    }
}

/// Errors raised by project-level operations.  
/// 專案層級操作的錯誤。
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid project manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("auxiliary archive not found at {0}")]
    MissingArchive(PathBuf),
    #[error("could not find a free name for {pattern} after {attempts} attempts")]
    CreationFailed { pattern: String, attempts: usize },
    #[error("no template registered for {0} files")]
    NoTemplate(String),
    #[error("cannot rename {path}: {reason}")]
    Rename { path: String, reason: String },
    #[error("{0} is not part of the project tree")]
    UnknownEntry(String),
}

impl ProjectError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ProjectError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ProjectError::Resource(inner) => inner.kind(),
            ProjectError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound => {
                ErrorKind::NotFound
            }
            ProjectError::Io { .. } => ErrorKind::Io,
            ProjectError::Manifest { .. } => ErrorKind::DecodeFailure,
            ProjectError::MissingArchive(_) | ProjectError::UnknownEntry(_) => {
                ErrorKind::NotFound
            }
            ProjectError::CreationFailed { .. } => ErrorKind::CreationFailed,
            ProjectError::NoTemplate(_) => ErrorKind::Unsupported,
            ProjectError::Rename { .. } => ErrorKind::Unsupported,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_io_maps_to_not_found() {
        let err = ResourceError::io("a.txt", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = ResourceError::io("a.txt", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn project_errors_forward_resource_kind() {
        let err = ProjectError::from(ResourceError::Unsupported("read-only".into()));
        assert_eq!(err.kind(), ErrorKind::Unsupported);
        let err = ProjectError::CreationFailed {
            pattern: "untitled{}".into(),
            attempts: 101,
        };
        assert_eq!(err.kind(), ErrorKind::CreationFailed);
    }
}
