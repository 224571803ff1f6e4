//! Resource type detection and per-type templates for new files.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ResourceError;

const FONT_TABLE_SIGNATURE: &[u8] = b"Woo!\x01";

/// Editor-dispatch key for a resource.  
/// 用於選擇編輯器的資源類型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileType {
    Text,
    Audio,
    Palette,
    AnimationData,
    Dc6,
    Dcc,
    Cof,
    Font,
    Dt1,
    Pl2,
    StringTable,
    FontTable,
    Ds1,
}

impl FileType {
    pub const ALL: [FileType; 13] = [
        FileType::Text,
        FileType::Audio,
        FileType::Palette,
        FileType::AnimationData,
        FileType::Dc6,
        FileType::Dcc,
        FileType::Cof,
        FileType::Font,
        FileType::Dt1,
        FileType::Pl2,
        FileType::StringTable,
        FileType::FontTable,
        FileType::Ds1,
    ];

    /// Detects the type from an extension (with or without the dot) and the leading bytes.  
    /// 依副檔名與檔頭判斷資源類型。
    ///
    /// `.tbl` holds both string tables and font tables; the latter start with
    /// a fixed signature.
    pub fn detect(extension: &str, data: &[u8]) -> Result<Self, ResourceError> {
        let ext = extension.trim_start_matches('.').to_ascii_lowercase();
        let detected = match ext.as_str() {
            "txt" => FileType::Text,
            "wav" => FileType::Audio,
            "dat" => FileType::Palette,
            "d2" => FileType::AnimationData,
            "dc6" => FileType::Dc6,
            "dcc" => FileType::Dcc,
            "cof" => FileType::Cof,
            "hsf" => FileType::Font,
            "dt1" => FileType::Dt1,
            "pl2" => FileType::Pl2,
            "ds1" => FileType::Ds1,
            "tbl" if data.starts_with(FONT_TABLE_SIGNATURE) => FileType::FontTable,
            "tbl" => FileType::StringTable,
            _ => {
                return Err(ResourceError::Decode {
                    path: extension.to_string(),
                    message: "unsupported file type".to_string(),
                })
            }
        };
        Ok(detected)
    }

    /// Extension, with leading dot, given to newly created files of this type.
    pub fn extension(self) -> &'static str {
        match self {
            FileType::Text => ".txt",
            FileType::Audio => ".wav",
            FileType::Palette => ".dat",
            FileType::AnimationData => ".d2",
            FileType::Dc6 => ".dc6",
            FileType::Dcc => ".dcc",
            FileType::Cof => ".cof",
            FileType::Font => ".hsf",
            FileType::Dt1 => ".dt1",
            FileType::Pl2 => ".pl2",
            FileType::StringTable | FileType::FontTable => ".tbl",
            FileType::Ds1 => ".ds1",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FileType::Text => "text",
            FileType::Audio => "audio",
            FileType::Palette => "palette",
            FileType::AnimationData => "animation-data",
            FileType::Dc6 => "dc6",
            FileType::Dcc => "dcc",
            FileType::Cof => "cof",
            FileType::Font => "font",
            FileType::Dt1 => "dt1",
            FileType::Pl2 => "pl2",
            FileType::StringTable => "string-table",
            FileType::FontTable => "font-table",
            FileType::Ds1 => "ds1",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Produces the initial bytes of a new file of some type.
pub type TemplateFn = Box<dyn Fn() -> Vec<u8> + Send + Sync>;

/// Per-type initial content for new files.  
/// 各資源類型新檔案的初始內容。
#[derive(Default)]
pub struct TemplateRegistry {
    templates: HashMap<FileType, TemplateFn>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in templates: text, font and palette.  
    /// 內建範本：文字、字型與調色盤。
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(FileType::Text, Vec::new);
        registry.register(FileType::Font, default_font);
        registry.register(FileType::Palette, || vec![0; 256 * 3]);
        registry
    }

    pub fn register<F>(&mut self, file_type: FileType, template: F)
    where
        F: Fn() -> Vec<u8> + Send + Sync + 'static,
    {
        self.templates.insert(file_type, Box::new(template));
    }

    pub fn contains(&self, file_type: FileType) -> bool {
        self.templates.contains_key(&file_type)
    }

    pub fn render(&self, file_type: FileType) -> Option<Vec<u8>> {
        self.templates.get(&file_type).map(|template| template())
    }
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("types", &self.templates.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FontSkeleton<'a> {
    sprite_path: &'a str,
    table_path: &'a str,
    palette_path: &'a str,
}

fn default_font() -> Vec<u8> {
    let skeleton = FontSkeleton {
        sprite_path: "",
        table_path: "",
        palette_path: "",
    };
    serde_json::to_vec_pretty(&skeleton).unwrap_or_default()
}
