//! A project: manifest file, sibling `content` directory and auxiliary archives.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::archive::{load_archive_trees, Archive, ArchiveLoader};
use crate::error::{ProjectError, ResourceError};
use crate::file_type::{FileType, TemplateRegistry};
use crate::path_entry::{PathEntry, PathEntrySource};
use crate::util::write_atomic;

/// Extension appended to new manifests.
pub const PROJECT_EXTENSION: &str = ".hsp";
/// Directory, next to the manifest, holding the project's files.
pub const CONTENT_DIR: &str = "content";
/// Highest `N` tried for `untitled{N}` before giving up.
pub const MAX_NEW_FILE_ATTEMPTS: usize = 100;

#[cfg(unix)]
const NEW_FILE_MODE: u32 = 0o644;
#[cfg(unix)]
const NEW_DIR_MODE: u32 = 0o755;

/// Persisted project properties.  
/// 專案資訊檔的內容。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectManifest {
    #[serde(rename = "ProjectName", default)]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "Author", default)]
    pub author: String,
    #[serde(rename = "AuxiliaryMPQs", default)]
    pub auxiliary_archives: Vec<String>,
}

/// Result of copying an archive entry into the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Written(PathBuf),
    /// Target exists and overwriting was not requested.
    AlreadyExists(PathBuf),
}

/// An open project.  
/// 已開啟的專案。
///
/// The file tree of `content/` is cached after the first
/// [`Project::file_structure`] call until something invalidates it.
pub struct Project {
    manifest: ProjectManifest,
    file_path: PathBuf,
    cache: Option<PathEntry>,
    archives: Vec<Option<Arc<dyn Archive>>>,
}

impl Project {
    /// Creates a manifest at `path` (appending `.hsp` when missing) and its content directory.  
    /// 建立專案資訊檔（必要時補上 `.hsp`）與內容資料夾。
    pub fn create_new(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let mut file_path = path.as_ref().to_path_buf();
        let default_name = file_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        if !has_project_extension(&file_path) {
            let mut raw = file_path.into_os_string();
            raw.push(PROJECT_EXTENSION);
            file_path = PathBuf::from(raw);
        }

        let mut project = Self {
            manifest: ProjectManifest {
                name: default_name,
                ..ProjectManifest::default()
            },
            file_path,
            cache: None,
            archives: Vec::new(),
        };
        project.save()?;
        Ok(project)
    }

    /// Loads an existing manifest.  
    /// 載入既有的專案資訊檔。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let file_path = path.as_ref().to_path_buf();
        let data = fs::read(&file_path).map_err(|source| ProjectError::io(&file_path, source))?;
        let manifest: ProjectManifest =
            serde_json::from_slice(&data).map_err(|source| ProjectError::Manifest {
                path: file_path.clone(),
                source,
            })?;

        let project = Self {
            manifest,
            file_path,
            cache: None,
            archives: Vec::new(),
        };
        project.ensure_content_dir()?;
        Ok(project)
    }

    /// Writes the manifest, makes sure `content/` exists and drops the cached tree.
    pub fn save(&mut self) -> Result<(), ProjectError> {
        let data = serde_json::to_vec_pretty(&self.manifest).map_err(|source| {
            ProjectError::Manifest {
                path: self.file_path.clone(),
                source,
            }
        })?;
        write_atomic(&self.file_path, &data)
            .map_err(|source| ProjectError::io(&self.file_path, source))?;
        self.ensure_content_dir()?;
        self.invalidate_file_structure();
        Ok(())
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn content_path(&self) -> PathBuf {
        self.base_dir().join(CONTENT_DIR)
    }

    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    pub fn description(&self) -> &str {
        &self.manifest.description
    }

    pub fn author(&self) -> &str {
        &self.manifest.author
    }

    pub fn auxiliary_archives(&self) -> &[String] {
        &self.manifest.auxiliary_archives
    }

    pub fn properties(&self) -> &ProjectManifest {
        &self.manifest
    }

    /// Replaces the properties in memory; call [`Project::save`] to persist them.
    pub fn set_properties(&mut self, manifest: ProjectManifest) {
        self.manifest = manifest;
        self.invalidate_file_structure();
    }

    /// Tree of `content/`, rebuilt when no cached copy exists.  
    /// 取得 `content/` 的節點樹；無快取時重新建立。
    pub fn file_structure(&mut self) -> Result<&PathEntry, ProjectError> {
        let tree = match self.cache.take() {
            Some(tree) => tree,
            None => self.build_file_structure()?,
        };
        Ok(&*self.cache.insert(tree))
    }

    pub fn invalidate_file_structure(&mut self) {
        self.cache = None;
    }

    /// Looks `full_path` up in the cached tree only.
    pub fn find_path_entry(&self, full_path: &str) -> Option<&PathEntry> {
        self.cache.as_ref()?.find(full_path)
    }

    pub fn find_path_entry_mut(&mut self, full_path: &str) -> Option<&mut PathEntry> {
        self.cache.as_mut()?.find_mut(full_path)
    }

    /// Puts the cached entry at `full_path` into rename mode.
    pub fn begin_rename(&mut self, full_path: &str) -> bool {
        match self.find_path_entry_mut(full_path) {
            Some(entry) => {
                entry.begin_rename();
                true
            }
            None => false,
        }
    }

    /// Creates `untitled{N}<ext>` under `parent` with the type's template and starts renaming it.  
    /// 在 `parent` 下建立 `untitled{N}<副檔名>`，寫入範本內容並進入重新命名狀態。
    pub fn create_new_file(
        &mut self,
        file_type: FileType,
        parent: &Path,
        templates: &TemplateRegistry,
    ) -> Result<PathBuf, ProjectError> {
        let data = templates
            .render(file_type)
            .ok_or_else(|| ProjectError::NoTemplate(file_type.to_string()))?;
        let path = next_free_path(parent, file_type.extension())?;
        create_file(&path, &data).map_err(|source| ProjectError::io(&path, source))?;
        log::debug!("created {}", path.display());

        self.refresh_and_rename(&path)?;
        Ok(path)
    }

    /// Creates an `untitled{N}` folder under `parent` and starts renaming it.
    pub fn create_new_folder(&mut self, parent: &Path) -> Result<PathBuf, ProjectError> {
        let path = next_free_path(parent, "")?;
        create_dir(&path).map_err(|source| ProjectError::io(&path, source))?;
        log::debug!("created {}", path.display());

        self.refresh_and_rename(&path)?;
        Ok(path)
    }

    fn refresh_and_rename(&mut self, path: &Path) -> Result<(), ProjectError> {
        self.invalidate_file_structure();
        self.file_structure()?;
        self.begin_rename(&path.to_string_lossy());
        Ok(())
    }

    /// Fails with the first auxiliary archive missing from `archive_dir`.
    pub fn validate_auxiliary_archives(&self, archive_dir: &Path) -> Result<(), ProjectError> {
        for path in self.archive_paths(archive_dir) {
            if fs::metadata(&path).is_err() {
                return Err(ProjectError::MissingArchive(path));
            }
        }
        Ok(())
    }

    /// Reopens every auxiliary archive, one thread each.  
    /// 重新開啟所有輔助封存檔，每個封存檔一條執行緒。
    ///
    /// Successfully opened archives are kept even when another one fails; the
    /// error of the lowest failing index is returned.
    pub fn reload_auxiliary_archives(
        &mut self,
        archive_dir: &Path,
        loader: &dyn ArchiveLoader,
    ) -> Result<(), ProjectError> {
        let paths = self.archive_paths(archive_dir);
        let mut slots: Vec<Option<Result<Arc<dyn Archive>, ResourceError>>> =
            (0..paths.len()).map(|_| None).collect();

        thread::scope(|scope| {
            for (slot, path) in slots.iter_mut().zip(&paths) {
                scope.spawn(move || *slot = Some(loader.open(path)));
            }
        });

        let mut first_error = None;
        self.archives = slots
            .into_iter()
            .map(|slot| match slot {
                Some(Ok(archive)) => Some(archive),
                Some(Err(err)) => {
                    log::warn!("{err}");
                    first_error.get_or_insert(err);
                    None
                }
                None => None,
            })
            .collect();
        self.invalidate_file_structure();

        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Archives opened by the last reload, indexed like the manifest list.
    pub fn loaded_archives(&self) -> &[Option<Arc<dyn Archive>>] {
        &self.archives
    }

    pub fn archive_paths(&self, archive_dir: &Path) -> Vec<PathBuf> {
        self.manifest
            .auxiliary_archives
            .iter()
            .map(|name| archive_dir.join(name))
            .collect()
    }

    /// One tree per auxiliary archive, `None` where the archive failed to open.
    pub fn archive_trees(
        &self,
        archive_dir: &Path,
        external_list: Option<&Path>,
        loader: &dyn ArchiveLoader,
    ) -> Vec<Option<PathEntry>> {
        load_archive_trees(&self.archive_paths(archive_dir), external_list, loader)
    }

    /// Applies the draft name of an entry in rename mode to the filesystem.  
    /// 將重新命名中的節點名稱套用到檔案系統。
    ///
    /// Returns the new path, or `None` when the name did not change. On
    /// failure the entry gets its previous name back.
    pub fn commit_rename(&mut self, full_path: &str) -> Result<Option<PathBuf>, ProjectError> {
        let entry = self
            .find_path_entry_mut(full_path)
            .ok_or_else(|| ProjectError::UnknownEntry(full_path.to_string()))?;
        entry.is_renaming = false;

        if entry.old_name.is_empty() || entry.name == entry.old_name {
            entry.old_name.clear();
            return Ok(None);
        }

        match rename_on_disk(entry) {
            Ok(new_path) => {
                entry.old_name.clear();
                self.invalidate_file_structure();
                Ok(Some(new_path))
            }
            Err(err) => {
                entry.cancel_rename();
                Err(err)
            }
        }
    }

    /// Removes a file or, recursively, a folder of the project.
    pub fn delete_entry(&mut self, full_path: &str) -> Result<(), ProjectError> {
        let path = PathBuf::from(full_path);
        if !path.starts_with(self.content_path()) || path == self.content_path() {
            return Err(ProjectError::UnknownEntry(full_path.to_string()));
        }

        let metadata = fs::metadata(&path).map_err(|source| ProjectError::io(&path, source))?;
        let removed = if metadata.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(|source| ProjectError::io(&path, source))?;
        self.invalidate_file_structure();
        Ok(())
    }

    /// Copies an archive entry into `content/`, dropping a leading `data` folder.  
    /// 將封存檔中的項目複製到 `content/`，並移除開頭的 `data` 資料夾。
    pub fn copy_from_archive(
        &mut self,
        entry: &PathEntry,
        loader: &dyn ArchiveLoader,
        overwrite: bool,
    ) -> Result<CopyOutcome, ProjectError> {
        if entry.source != PathEntrySource::Archive || entry.is_directory {
            return Err(ResourceError::Unsupported(format!(
                "{} is not an archive file",
                entry.full_path
            ))
            .into());
        }

        let data = entry.read_bytes(loader)?;
        let relative = entry
            .full_path
            .strip_prefix("data")
            .unwrap_or(&entry.full_path);
        let mut target = self.content_path();
        for segment in relative.split(['\\', '/']).filter(|s| !s.is_empty()) {
            target.push(segment);
        }

        if !overwrite && fs::metadata(&target).is_ok() {
            return Ok(CopyOutcome::AlreadyExists(target));
        }

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ProjectError::io(parent, source))?;
        }
        fs::write(&target, &data).map_err(|source| ProjectError::io(&target, source))?;
        self.invalidate_file_structure();
        Ok(CopyOutcome::Written(target))
    }

    fn base_dir(&self) -> &Path {
        self.file_path.parent().unwrap_or_else(|| Path::new(""))
    }

    fn ensure_content_dir(&self) -> Result<(), ProjectError> {
        let content = self.content_path();
        if fs::metadata(&content).is_err() {
            create_dir(&content).map_err(|source| ProjectError::io(&content, source))?;
        }
        Ok(())
    }

    fn build_file_structure(&self) -> Result<PathEntry, ProjectError> {
        self.ensure_content_dir()?;

        let content = self.content_path();
        let mut root = PathEntry::project(&self.manifest.name, content.to_string_lossy(), true);
        root.is_root = true;
        self.collect_children(&content, &mut root)?;
        Ok(root)
    }

    fn collect_children(&self, dir: &Path, parent: &mut PathEntry) -> Result<(), ProjectError> {
        let mut entries = fs::read_dir(dir)
            .map_err(|source| ProjectError::io(dir, source))?
            .collect::<io::Result<Vec<_>>>()
            .map_err(|source| ProjectError::io(dir, source))?;
        entries.sort_by_key(|entry| entry.file_name());

        for dir_entry in entries {
            let name = dir_entry.file_name().to_string_lossy().into_owned();
            let path = dir_entry.path();
            if name.starts_with('.') || path == self.file_path {
                continue;
            }

            let is_directory = dir_entry
                .file_type()
                .map_err(|source| ProjectError::io(&path, source))?
                .is_dir();
            let mut node = PathEntry::project(name, path.to_string_lossy(), is_directory);
            if is_directory {
                self.collect_children(&path, &mut node)?;
            }
            parent.children.push(node);
        }
        Ok(())
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("manifest", &self.manifest)
            .field("file_path", &self.file_path)
            .field("cached", &self.cache.is_some())
            .field(
                "loaded_archives",
                &self.archives.iter().filter(|slot| slot.is_some()).count(),
            )
            .finish()
    }
}

fn has_project_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(&PROJECT_EXTENSION[1..]))
        .unwrap_or(false)
}

fn next_free_path(parent: &Path, extension: &str) -> Result<PathBuf, ProjectError> {
    for attempt in 0..=MAX_NEW_FILE_ATTEMPTS {
        let candidate = parent.join(format!("untitled{attempt}{extension}"));
        if fs::symlink_metadata(&candidate).is_err() {
            return Ok(candidate);
        }
    }
    Err(ProjectError::CreationFailed {
        pattern: parent
            .join(format!("untitled{{}}{extension}"))
            .to_string_lossy()
            .into_owned(),
        attempts: MAX_NEW_FILE_ATTEMPTS + 1,
    })
}

fn create_file(path: &Path, data: &[u8]) -> io::Result<()> {
    use std::io::Write;

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(NEW_FILE_MODE);
    }
    options.open(path)?.write_all(data)
}

fn create_dir(path: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(NEW_DIR_MODE);
    }
    builder.create(path)
}

/// Extension as the original file dialogs see it: from the last dot on.
fn dotted_extension(name: &str) -> &str {
    name.rfind('.').map(|idx| &name[idx..]).unwrap_or("")
}

fn rename_on_disk(entry: &mut PathEntry) -> Result<PathBuf, ProjectError> {
    let reject = |reason: &str| ProjectError::Rename {
        path: entry.full_path.clone(),
        reason: reason.to_string(),
    };

    if entry.name.trim().is_empty() {
        return Err(reject("files cannot have a blank name"));
    }
    if entry.name.contains(['/', '\\']) {
        return Err(reject("names cannot contain path separators"));
    }

    let old_ext = dotted_extension(&entry.old_name).to_string();
    if dotted_extension(&entry.name).is_empty() {
        entry.name.push_str(&old_ext);
    }
    if !dotted_extension(&entry.name).eq_ignore_ascii_case(&old_ext) {
        return Err(reject("file extension cannot be changed"));
    }

    let current = PathBuf::from(&entry.full_path);
    let base = current.parent().unwrap_or_else(|| Path::new(""));
    let old_path = base.join(&entry.old_name);
    let new_path = base.join(&entry.name);
    if fs::symlink_metadata(&new_path).is_ok() {
        return Err(reject("already exists"));
    }

    fs::rename(&old_path, &new_path).map_err(|source| ProjectError::io(&old_path, source))?;
    Ok(new_path)
}
