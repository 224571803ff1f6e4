use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::archive::ArchiveLoader;
use crate::error::ResourceError;

/// Where a [`PathEntry`] takes its bytes from.  
/// [`PathEntry`] 的資料來源。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum PathEntrySource {
    /// Relative to a specific auxiliary archive.
    Archive,
    /// Relative to the project's content directory.
    #[default]
    Project,
    /// Composite view over the project and every archive. Reserved, not resolvable yet.
    Virtual,
}

impl From<PathEntrySource> for u8 {
    fn from(source: PathEntrySource) -> Self {
        match source {
            PathEntrySource::Archive => 0,
            PathEntrySource::Project => 1,
            PathEntrySource::Virtual => 2,
        }
    }
}

impl TryFrom<u8> for PathEntrySource {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PathEntrySource::Archive),
            1 => Ok(PathEntrySource::Project),
            2 => Ok(PathEntrySource::Virtual),
            other => Err(format!("unknown path entry source {other}")),
        }
    }
}

impl fmt::Display for PathEntrySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", u8::from(*self))
    }
}

/// A file or folder node in the virtual resource tree.  
/// 虛擬資源樹中的檔案或資料夾節點。
///
/// While a rename is in progress `name` is the live edit buffer and
/// `old_name` holds the name the entry had when the rename started.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathEntry {
    #[serde(default)]
    pub old_name: String,
    pub name: String,
    pub full_path: String,
    #[serde(default, rename = "mpqFile")]
    pub archive: String,
    #[serde(default)]
    pub children: Vec<PathEntry>,
    #[serde(default)]
    pub source: PathEntrySource,
    #[serde(default)]
    pub is_directory: bool,
    #[serde(default)]
    pub is_root: bool,
    #[serde(default)]
    pub is_renaming: bool,
}

impl PathEntry {
    /// Creates a project-sourced node.  
    /// 建立來源為專案目錄的節點。
    pub fn project(name: impl Into<String>, full_path: impl Into<String>, is_directory: bool) -> Self {
        Self {
            name: name.into(),
            full_path: full_path.into(),
            source: PathEntrySource::Project,
            is_directory,
            ..Self::default()
        }
    }

    /// Creates an archive-sourced node.  
    /// 建立來源為封存檔的節點。
    pub fn archive(
        archive: impl Into<String>,
        name: impl Into<String>,
        full_path: impl Into<String>,
        is_directory: bool,
    ) -> Self {
        Self {
            name: name.into(),
            full_path: full_path.into(),
            archive: archive.into(),
            source: PathEntrySource::Archive,
            is_directory,
            ..Self::default()
        }
    }

    /// Identity shared by every rebuild of the same logical resource.  
    /// 同一資源在每次重建後皆相同的識別字串。
    pub fn unique_id(&self) -> String {
        format!("{}_{}_{}", self.source, self.archive, self.full_path)
    }

    pub fn fs_path(&self) -> PathBuf {
        PathBuf::from(&self.full_path)
    }

    /// Extension of the entry name including the leading dot, lower-cased.
    pub fn extension(&self) -> String {
        let name = self.full_path.rsplit(['/', '\\']).next().unwrap_or_default();
        match name.rfind('.') {
            Some(idx) if idx > 0 => name[idx..].to_ascii_lowercase(),
            _ => String::new(),
        }
    }

    /// Reads the resource bytes. Archive entries open their archive on every call.  
    /// 讀取資源內容；封存檔項目每次呼叫都會重新開啟封存檔。
    pub fn read_bytes(&self, loader: &dyn ArchiveLoader) -> Result<Vec<u8>, ResourceError> {
        match self.source {
            PathEntrySource::Project => {
                let path = self.fs_path();
                fs::metadata(&path).map_err(|_| ResourceError::NotFound {
                    path: self.full_path.clone(),
                })?;
                fs::read(&path).map_err(|source| ResourceError::Io {
                    path: self.full_path.clone(),
                    source,
                })
            }
            PathEntrySource::Archive => {
                let archive = loader.open(PathBuf::from(&self.archive).as_path())?;
                if !archive.contains(&self.full_path) {
                    return Err(ResourceError::NotInArchive {
                        archive: self.archive.clone(),
                        path: self.full_path.clone(),
                    });
                }
                archive.read_file(&self.full_path)
            }
            PathEntrySource::Virtual => Err(ResourceError::Unsupported(
                "composite entries cannot be read yet".to_string(),
            )),
        }
    }

    /// Overwrites a project file, keeping its permission bits.  
    /// 覆寫專案檔案並保留原有權限。
    pub fn write_bytes(&self, data: &[u8]) -> Result<(), ResourceError> {
        if self.source != PathEntrySource::Project {
            return Err(ResourceError::Unsupported(format!(
                "cannot write {}: only project files are writable",
                self.full_path
            )));
        }

        let path = self.fs_path();
        let metadata = fs::metadata(&path).map_err(|source| ResourceError::io(&self.full_path, source))?;
        fs::write(&path, data).map_err(|source| ResourceError::io(&self.full_path, source))?;
        fs::set_permissions(&path, metadata.permissions())
            .map_err(|source| ResourceError::io(&self.full_path, source))
    }

    /// Name used for ordering; stays fixed while a rename is being typed.
    pub fn sort_key(&self) -> &str {
        if self.old_name.is_empty() {
            &self.name
        } else {
            &self.old_name
        }
    }

    /// Sorts direct children: directories first, then case-insensitive name.  
    /// 排序子節點：資料夾優先，其次依名稱（不分大小寫）。
    pub fn sort_children(&mut self) {
        self.children.sort_by(compare_entries);
    }

    /// Sorts every level of the subtree.
    pub fn sort_tree(&mut self) {
        self.sort_children();
        for child in &mut self.children {
            child.sort_tree();
        }
    }

    pub fn begin_rename(&mut self) {
        self.old_name = self.name.clone();
        self.is_renaming = true;
    }

    pub fn cancel_rename(&mut self) {
        if !self.old_name.is_empty() {
            self.name = std::mem::take(&mut self.old_name);
        }
        self.is_renaming = false;
    }

    /// Depth-first lookup by exact `full_path`.
    pub fn find(&self, full_path: &str) -> Option<&PathEntry> {
        if self.full_path == full_path {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(full_path))
    }

    pub fn find_mut(&mut self, full_path: &str) -> Option<&mut PathEntry> {
        if self.full_path == full_path {
            return Some(self);
        }
        self.children
            .iter_mut()
            .find_map(|child| child.find_mut(full_path))
    }

    /// Serialized, childless form stored in session records.  
    /// 儲存在工作階段中的序列化識別資料（不含子節點）。
    pub fn to_identifier(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut detached = self.clone();
        detached.children.clear();
        detached.old_name.clear();
        detached.is_renaming = false;
        serde_json::to_vec(&detached)
    }

    pub fn from_identifier(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

fn compare_entries(a: &PathEntry, b: &PathEntry) -> Ordering {
    match (a.is_directory, b.is_directory) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a
            .sort_key()
            .to_lowercase()
            .cmp(&b.sort_key().to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{MemoryArchive, MemoryArchiveLoader};
    use crate::error::ErrorKind;
    use tempfile::tempdir;

    fn names(entry: &PathEntry) -> Vec<&str> {
        entry.children.iter().map(|child| child.name.as_str()).collect()
    }

    #[test]
    fn unique_id_is_stable_across_instances() {
        let a = PathEntry::archive("d2data.mpq", "a.txt", "data\\a.txt", false);
        let mut b = PathEntry::archive("d2data.mpq", "renamed", "data\\a.txt", false);
        b.is_renaming = true;
        assert_eq!(a.unique_id(), b.unique_id());
        assert_eq!(a.unique_id(), "0_d2data.mpq_data\\a.txt");

        let project = PathEntry::project("a.txt", "data\\a.txt", false);
        assert_ne!(a.unique_id(), project.unique_id());
    }

    #[test]
    fn project_write_then_read_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, b"first").unwrap();
        let entry = PathEntry::project("notes.txt", path.to_string_lossy(), false);
        let loader = MemoryArchiveLoader::default();

        let original = entry.read_bytes(&loader).unwrap();
        entry.write_bytes(&original).unwrap();
        assert_eq!(entry.read_bytes(&loader).unwrap(), b"first");

        entry.write_bytes(b"second").unwrap();
        assert_eq!(entry.read_bytes(&loader).unwrap(), b"second");
    }

    #[cfg(unix)]
    #[test]
    fn write_preserves_permission_bits() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("table.txt");
        fs::write(&path, b"x").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        let entry = PathEntry::project("table.txt", path.to_string_lossy(), false);
        entry.write_bytes(b"updated").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    }

    #[test]
    fn reading_missing_project_file_is_not_found() {
        let dir = tempdir().unwrap();
        let entry = PathEntry::project("gone", dir.path().join("gone").to_string_lossy(), false);
        let err = entry.read_bytes(&MemoryArchiveLoader::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn archive_entries_are_read_only() {
        let entry = PathEntry::archive("patch.mpq", "a.txt", "data\\a.txt", false);
        for payload in [&b""[..], b"abc", &[0u8; 512]] {
            let err = entry.write_bytes(payload).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Unsupported);
        }
    }

    #[test]
    fn archive_entries_read_through_their_archive() {
        let mut loader = MemoryArchiveLoader::default();
        loader.insert(MemoryArchive::new(
            "patch.mpq",
            vec![("data\\a.txt".to_string(), b"hello".to_vec())],
        ));

        let entry = PathEntry::archive("patch.mpq", "a.txt", "data\\a.txt", false);
        assert_eq!(entry.read_bytes(&loader).unwrap(), b"hello");

        let missing = PathEntry::archive("patch.mpq", "b.txt", "data\\b.txt", false);
        assert_eq!(missing.read_bytes(&loader).unwrap_err().kind(), ErrorKind::NotFound);

        let unknown_archive = PathEntry::archive("other.mpq", "a.txt", "data\\a.txt", false);
        assert_eq!(unknown_archive.read_bytes(&loader).unwrap_err().kind(), ErrorKind::Io);
    }

    #[test]
    fn sort_puts_directories_first_and_ignores_case() {
        let mut root = PathEntry::project("root", "/root", true);
        root.children = vec![
            PathEntry::project("beta.txt", "/root/beta.txt", false),
            PathEntry::project("Alpha.txt", "/root/Alpha.txt", false),
            PathEntry::project("zeta", "/root/zeta", true),
            PathEntry::project("assets", "/root/assets", true),
        ];
        root.sort_children();
        assert_eq!(names(&root), vec!["assets", "zeta", "Alpha.txt", "beta.txt"]);

        let once = root.clone();
        root.sort_children();
        assert_eq!(root, once);
    }

    #[test]
    fn renaming_entry_keeps_its_slot_while_typing() {
        let mut root = PathEntry::project("root", "/root", true);
        let mut renaming = PathEntry::project("b.txt", "/root/b.txt", false);
        renaming.begin_rename();
        renaming.name = "zzz.txt".to_string();
        root.children = vec![
            PathEntry::project("c.txt", "/root/c.txt", false),
            renaming,
            PathEntry::project("a.txt", "/root/a.txt", false),
        ];
        root.sort_children();
        assert_eq!(names(&root), vec!["a.txt", "zzz.txt", "c.txt"]);
    }

    #[test]
    fn cancel_rename_restores_name() {
        let mut entry = PathEntry::project("a.txt", "/root/a.txt", false);
        entry.begin_rename();
        entry.name = "draft".to_string();
        entry.cancel_rename();
        assert_eq!(entry.name, "a.txt");
        assert!(entry.old_name.is_empty());
        assert!(!entry.is_renaming);
    }

    #[test]
    fn identifier_round_trip_preserves_identity() {
        let mut entry = PathEntry::archive("patch.mpq", "b", "data\\b", true);
        entry
            .children
            .push(PathEntry::archive("patch.mpq", "c.txt", "data\\b\\c.txt", false));

        let bytes = entry.to_identifier().unwrap();
        let decoded = PathEntry::from_identifier(&bytes).unwrap();
        assert_eq!(decoded.unique_id(), entry.unique_id());
        assert!(decoded.children.is_empty());
        assert!(decoded.is_directory);
    }

    #[test]
    fn extension_uses_last_path_segment() {
        let entry = PathEntry::archive("x.mpq", "pal.dat", "data\\global\\pal.dat", false);
        assert_eq!(entry.extension(), ".dat");
        let entry = PathEntry::project(".hidden", "/tmp/.hidden", false);
        assert_eq!(entry.extension(), "");
    }
}
