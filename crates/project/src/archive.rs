//! Read-only archive containers and the archive-sourced part of the resource tree.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use crate::error::ResourceError;
use crate::path_entry::PathEntry;

/// A packed-file container used as a secondary resource source.  
/// 作為次要資源來源的封存容器。
///
/// Names are matched case-insensitively and `/` is equivalent to `\`.
pub trait Archive: Send + Sync {
    /// Filesystem location the archive was opened from.
    fn path(&self) -> &Path;

    /// Embedded file listing, when the container carries one.
    fn list_files(&self) -> Option<Vec<String>>;

    fn contains(&self, name: &str) -> bool;

    fn read_file(&self, name: &str) -> Result<Vec<u8>, ResourceError>;
}

/// Opens archives by filesystem path.  
/// 依檔案路徑開啟封存檔。
pub trait ArchiveLoader: Send + Sync {
    fn open(&self, path: &Path) -> Result<Arc<dyn Archive>, ResourceError>;
}

/// Canonical lookup key for an archive member name.
pub fn normalize_name(name: &str) -> String {
    name.trim_start_matches(['/', '\\'])
        .replace('/', "\\")
        .to_lowercase()
}

/// Zip-backed container.  
/// 以 zip 格式實作的封存容器。
#[derive(Debug)]
pub struct ZipContainer {
    path: PathBuf,
    listing: Vec<String>,
    members: HashMap<String, String>,
}

impl ZipContainer {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ResourceError> {
        let path = path.as_ref().to_path_buf();
        let archive = open_zip(&path)?;

        let mut listing = Vec::new();
        let mut members = HashMap::new();
        for name in archive.file_names() {
            if name.ends_with('/') {
                continue;
            }
            members.insert(normalize_name(name), name.to_string());
            listing.push(name.to_string());
        }

        Ok(Self {
            path,
            listing,
            members,
        })
    }
}

impl Archive for ZipContainer {
    fn path(&self) -> &Path {
        &self.path
    }

    fn list_files(&self) -> Option<Vec<String>> {
        Some(self.listing.clone())
    }

    fn contains(&self, name: &str) -> bool {
        self.members.contains_key(&normalize_name(name))
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>, ResourceError> {
        let stored = self
            .members
            .get(&normalize_name(name))
            .ok_or_else(|| ResourceError::NotInArchive {
                archive: self.path.to_string_lossy().into_owned(),
                path: name.to_string(),
            })?;

        let mut archive = open_zip(&self.path)?;
        let mut member = archive.by_name(stored).map_err(|err| ResourceError::Archive {
            path: self.path.to_string_lossy().into_owned(),
            message: err.to_string(),
        })?;
        let mut data = Vec::new();
        member
            .read_to_end(&mut data)
            .map_err(|source| ResourceError::io(name, source))?;
        Ok(data)
    }
}

fn open_zip(path: &Path) -> Result<zip::ZipArchive<BufReader<File>>, ResourceError> {
    let display = path.to_string_lossy().into_owned();
    let file = File::open(path).map_err(|err| ResourceError::Archive {
        path: display.clone(),
        message: err.to_string(),
    })?;
    zip::ZipArchive::new(BufReader::new(file)).map_err(|err| ResourceError::Archive {
        path: display,
        message: err.to_string(),
    })
}

/// Loader for [`ZipContainer`] archives.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiveLoader;

impl ArchiveLoader for ZipArchiveLoader {
    fn open(&self, path: &Path) -> Result<Arc<dyn Archive>, ResourceError> {
        Ok(Arc::new(ZipContainer::open(path)?))
    }
}

/// In-memory container, for hosts that synthesize archives and for tests.  
/// 記憶體內的封存容器。
#[derive(Debug, Clone)]
pub struct MemoryArchive {
    path: PathBuf,
    files: Vec<(String, Vec<u8>)>,
    listed: bool,
}

impl MemoryArchive {
    pub fn new(path: impl Into<PathBuf>, files: Vec<(String, Vec<u8>)>) -> Self {
        Self {
            path: path.into(),
            files,
            listed: true,
        }
    }

    /// Drops the embedded listing so callers must discover names externally.
    pub fn without_listing(mut self) -> Self {
        self.listed = false;
        self
    }

    fn lookup(&self, name: &str) -> Option<&[u8]> {
        let key = normalize_name(name);
        self.files
            .iter()
            .find(|(stored, _)| normalize_name(stored) == key)
            .map(|(_, data)| data.as_slice())
    }
}

impl Archive for MemoryArchive {
    fn path(&self) -> &Path {
        &self.path
    }

    fn list_files(&self) -> Option<Vec<String>> {
        self.listed
            .then(|| self.files.iter().map(|(name, _)| name.clone()).collect())
    }

    fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn read_file(&self, name: &str) -> Result<Vec<u8>, ResourceError> {
        self.lookup(name)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| ResourceError::NotInArchive {
                archive: self.path.to_string_lossy().into_owned(),
                path: name.to_string(),
            })
    }
}

/// Resolves paths against a fixed set of [`MemoryArchive`]s.
#[derive(Debug, Default, Clone)]
pub struct MemoryArchiveLoader {
    archives: HashMap<PathBuf, Arc<MemoryArchive>>,
}

impl MemoryArchiveLoader {
    pub fn insert(&mut self, archive: MemoryArchive) {
        self.archives
            .insert(archive.path.clone(), Arc::new(archive));
    }
}

impl ArchiveLoader for MemoryArchiveLoader {
    fn open(&self, path: &Path) -> Result<Arc<dyn Archive>, ResourceError> {
        match self.archives.get(path) {
            Some(archive) => Ok(archive.clone() as Arc<dyn Archive>),
            None => Err(ResourceError::Archive {
                path: path.to_string_lossy().into_owned(),
                message: "no such archive".to_string(),
            }),
        }
    }
}

/// Builds the tree of one archive, rooted at a node named after the archive file.  
/// 建立單一封存檔的節點樹，根節點以封存檔名稱命名。
///
/// Falls back to probing every name of `external_list` when the archive has
/// no embedded listing. An unreadable list yields an empty root.
pub fn archive_tree(archive: &dyn Archive, external_list: Option<&Path>) -> PathEntry {
    let archive_path = archive.path().to_string_lossy().into_owned();
    let root_name = archive
        .path()
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| archive_path.clone());
    let mut root = PathEntry::archive(&archive_path, root_name, "", true);

    let files = match archive.list_files() {
        Some(files) => files,
        None => match probe_external_list(archive, external_list) {
            Ok(files) => files,
            Err(err) => {
                log::warn!("cannot scan list file for {archive_path}: {err}");
                return root;
            }
        },
    };

    // lower-cased partial path -> index within its parent's children
    let mut known: HashMap<String, usize> = HashMap::new();
    for file in &files {
        let elements: Vec<&str> = file
            .split(['\\', '/'])
            .filter(|element| !element.is_empty())
            .collect();

        let mut node = &mut root;
        let mut partial = String::new();
        for (depth, element) in elements.iter().enumerate() {
            if depth > 0 {
                partial.push('\\');
            }
            partial.push_str(element);
            let key = partial.to_lowercase();
            let idx = match known.get(&key) {
                Some(idx) => *idx,
                None => {
                    let is_directory = depth + 1 < elements.len();
                    node.children.push(PathEntry::archive(
                        &archive_path,
                        *element,
                        partial.clone(),
                        is_directory,
                    ));
                    let idx = node.children.len() - 1;
                    known.insert(key, idx);
                    idx
                }
            };
            if depth + 1 < elements.len() {
                node.children[idx].is_directory = true;
            }
            node = &mut node.children[idx];
        }
    }

    root.sort_tree();
    root
}

fn probe_external_list(archive: &dyn Archive, list: Option<&Path>) -> io::Result<Vec<String>> {
    let Some(list) = list else {
        return Ok(Vec::new());
    };

    let reader = BufReader::new(File::open(list)?);
    let mut found = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let name = line.trim();
        if !name.is_empty() && archive.contains(name) {
            found.push(name.to_string());
        }
    }
    Ok(found)
}

/// Opens every archive on its own thread and builds its tree.  
/// 以每個封存檔一條執行緒的方式建立節點樹。
///
/// Slot `i` belongs to `paths[i]`; an archive that fails to open is logged
/// and leaves its slot empty.
pub fn load_archive_trees(
    paths: &[PathBuf],
    external_list: Option<&Path>,
    loader: &dyn ArchiveLoader,
) -> Vec<Option<PathEntry>> {
    let mut slots: Vec<Option<PathEntry>> = vec![None; paths.len()];

    thread::scope(|scope| {
        for (slot, path) in slots.iter_mut().zip(paths) {
            scope.spawn(move || match loader.open(path) {
                Ok(archive) => *slot = Some(archive_tree(archive.as_ref(), external_list)),
                Err(err) => log::warn!("failed to load archive {}: {err}", path.display()),
            });
        }
    });

    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_entry::PathEntrySource;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;

    fn sample_archive() -> MemoryArchive {
        MemoryArchive::new(
            "/mpq/patch_d2.mpq",
            vec![
                ("data\\a.txt".to_string(), b"a".to_vec()),
                ("data\\b\\c.txt".to_string(), b"c".to_vec()),
            ],
        )
    }

    #[test]
    fn builds_nested_directories_once() {
        let tree = archive_tree(&sample_archive(), None);
        assert_eq!(tree.name, "patch_d2.mpq");
        assert!(tree.is_directory);
        assert_eq!(tree.children.len(), 1);

        let data = &tree.children[0];
        assert_eq!(data.name, "data");
        assert!(data.is_directory);
        assert_eq!(data.children.len(), 2);

        let b = &data.children[0];
        assert_eq!(b.name, "b");
        assert!(b.is_directory);
        assert_eq!(b.children.len(), 1);
        assert_eq!(b.children[0].name, "c.txt");
        assert_eq!(b.children[0].full_path, "data\\b\\c.txt");

        let a = &data.children[1];
        assert_eq!(a.name, "a.txt");
        assert!(!a.is_directory);
        assert!(a.children.is_empty());

        for entry in [a, &b.children[0]] {
            assert_eq!(entry.archive, "/mpq/patch_d2.mpq");
            assert_eq!(entry.source, PathEntrySource::Archive);
        }
    }

    #[test]
    fn prefixes_differing_in_case_or_separator_share_a_node() {
        let archive = MemoryArchive::new(
            "x.mpq",
            vec![
                ("Data/Global/one.dat".to_string(), Vec::new()),
                ("data\\global\\two.dat".to_string(), Vec::new()),
            ],
        );
        let tree = archive_tree(&archive, None);
        assert_eq!(tree.children.len(), 1);
        assert_eq!(tree.children[0].children.len(), 1);
        assert_eq!(tree.children[0].children[0].children.len(), 2);
    }

    #[test]
    fn file_listed_before_its_children_becomes_a_directory() {
        fn leaves_are_childless(entry: &PathEntry) -> bool {
            (entry.is_directory || entry.children.is_empty())
                && entry.children.iter().all(leaves_are_childless)
        }

        let archive = MemoryArchive::new(
            "x.mpq",
            vec![
                ("a\\x".to_string(), Vec::new()),
                ("a\\x\\y".to_string(), Vec::new()),
            ],
        );
        let tree = archive_tree(&archive, None);
        let x = &tree.children[0].children[0];
        assert_eq!(x.name, "x");
        assert!(x.is_directory);
        assert_eq!(x.children.len(), 1);
        assert!(!x.children[0].is_directory);
        assert!(leaves_are_childless(&tree));
    }

    #[test]
    fn falls_back_to_external_list() {
        let dir = tempdir().unwrap();
        let list = dir.path().join("listfile.txt");
        fs::write(&list, "data\\a.txt\nunknown\\file.dc6\n\ndata\\b\\c.txt\n").unwrap();

        let archive = sample_archive().without_listing();
        let tree = archive_tree(&archive, Some(&list));
        let data = &tree.children[0];
        assert_eq!(data.children.len(), 2);
        assert!(tree.find("unknown\\file.dc6").is_none());
    }

    #[test]
    fn missing_listing_without_list_file_yields_empty_root() {
        let archive = sample_archive().without_listing();
        assert!(archive_tree(&archive, None).children.is_empty());

        let dir = tempdir().unwrap();
        let tree = archive_tree(&archive, Some(&dir.path().join("absent.txt")));
        assert!(tree.children.is_empty());
    }

    #[test]
    fn zip_container_matches_names_loosely() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("aux.zip");
        {
            let file = File::create(&path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Stored);
            writer.add_directory("data/", options).unwrap();
            writer.start_file("data/global/pal.dat", options).unwrap();
            writer.write_all(&[1, 2, 3]).unwrap();
            writer.finish().unwrap();
        }

        let container = ZipContainer::open(&path).unwrap();
        assert_eq!(
            container.list_files().unwrap(),
            vec!["data/global/pal.dat".to_string()]
        );
        assert!(container.contains("DATA\\Global\\pal.dat"));
        assert_eq!(container.read_file("data\\global\\pal.dat").unwrap(), vec![1, 2, 3]);

        let tree = archive_tree(&container, None);
        let entry = tree.find("data\\global\\pal.dat").unwrap();
        assert_eq!(entry.read_bytes(&ZipArchiveLoader).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn opening_garbage_is_an_io_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.mpq");
        fs::write(&path, b"not an archive").unwrap();
        let err = ZipArchiveLoader.open(&path).err().unwrap();
        assert_eq!(err.kind(), crate::error::ErrorKind::Io);
    }

    #[test]
    fn failed_archives_leave_empty_slots() {
        let mut loader = MemoryArchiveLoader::default();
        loader.insert(sample_archive());
        let paths = vec![
            PathBuf::from("/mpq/missing.mpq"),
            PathBuf::from("/mpq/patch_d2.mpq"),
        ];

        let trees = load_archive_trees(&paths, None, &loader);
        assert_eq!(trees.len(), 2);
        assert!(trees[0].is_none());
        assert_eq!(trees[1].as_ref().unwrap().name, "patch_d2.mpq");
    }
}
