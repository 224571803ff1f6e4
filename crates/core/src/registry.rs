use std::collections::HashMap;
use std::fmt;

use hellforge_project::{FileType, PathEntry, ResourceError};

use crate::editor::{Editor, EditorContext};
use crate::text_editor::TextEditor;

/// 編輯器建構函式。 / Builds an editor from its entry, previous view state and file bytes.
pub type EditorConstructor = Box<
    dyn Fn(&mut EditorContext<'_>, PathEntry, &[u8], Vec<u8>) -> Result<Box<dyn Editor>, ResourceError>
        + Send
        + Sync,
>;

/// 依檔案類型選擇編輯器。 / Maps each file type to the constructor of its editor.
#[derive(Default)]
pub struct EditorRegistry {
    constructors: HashMap<FileType, EditorConstructor>,
}

impl EditorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 內建編輯器。 / Registry with the built-in editors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FileType::Text, TextEditor::create);
        registry
    }

    pub fn register<F>(&mut self, file_type: FileType, constructor: F)
    where
        F: Fn(&mut EditorContext<'_>, PathEntry, &[u8], Vec<u8>) -> Result<Box<dyn Editor>, ResourceError>
            + Send
            + Sync
            + 'static,
    {
        self.constructors.insert(file_type, Box::new(constructor));
    }

    pub fn get(&self, file_type: FileType) -> Option<&EditorConstructor> {
        self.constructors.get(&file_type)
    }

    pub fn contains(&self, file_type: FileType) -> bool {
        self.constructors.contains_key(&file_type)
    }
}

impl fmt::Debug for EditorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EditorRegistry")
            .field("types", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}
