use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use hellforge_project::{PathEntry, ResourceError};
use serde::{Deserialize, Serialize};

use crate::editor::{Editor, EditorBase, EditorContext};

const DEFAULT_SIZE: (f32, f32) = (400.0, 300.0);
/// 表格檢視最多顯示的欄數。 / Widest table the table view shows.
pub const MAX_TABLE_COLUMNS: usize = 64;

/// 文字編輯器的檢視狀態。 / View state of the text editor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextViewState {
    #[serde(default)]
    pub cursor: usize,
    #[serde(default)]
    pub scroll: f32,
    /// 顯示原始文字而非表格。 / Show the raw text even when the content is tabular.
    #[serde(default)]
    pub raw_view: bool,
}

/// 以 Tab 分隔的表格。 / Tab-separated table detected from the first line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TextTable {
    /// 第一行含 Tab 時解析為表格。 / Parses the text as a table when its first line holds a tab.
    pub fn detect(text: &str) -> Option<Self> {
        let mut lines = text.split('\n');
        let first = lines.next()?;
        if !first.contains('\t') {
            return None;
        }

        let mut header: Vec<String> = first.split('\t').map(str::to_string).collect();
        if header.len() > MAX_TABLE_COLUMNS {
            log::warn!("table is wider than {MAX_TABLE_COLUMNS} columns; extra columns are hidden");
            header.truncate(MAX_TABLE_COLUMNS);
        }
        let rows = lines
            .map(|line| line.split('\t').map(str::to_string).collect())
            .collect();
        Some(Self { header, rows })
    }

    pub fn columns(&self) -> usize {
        self.header.len()
    }
}

/// 解碼後的文字與其原始編碼。 / Decoded text plus the encoding it was read with.
struct DecodedText {
    text: String,
    encoding: &'static Encoding,
    has_bom: bool,
}

/// 依 BOM、UTF-8 檢查與 chardetng 偵測解碼。 / Decodes by BOM, then strict UTF-8, then a chardetng guess.
fn decode_text(bytes: &[u8]) -> DecodedText {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
        return DecodedText {
            text: text.into_owned(),
            encoding,
            has_bom: true,
        };
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return DecodedText {
            text: text.to_owned(),
            encoding: UTF_8,
            has_bom: false,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        log::warn!("text is not valid {}; undecodable bytes were replaced", encoding.name());
    }
    DecodedText {
        text: text.into_owned(),
        encoding,
        has_bom: false,
    }
}

/// 以原編碼寫回文字。 / Encodes text back into the encoding it was read with.
fn encode_text(text: &str, encoding: &'static Encoding, has_bom: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len() + 3);
    if encoding == UTF_16LE || encoding == UTF_16BE {
        let big_endian = encoding == UTF_16BE;
        if has_bom {
            out.extend_from_slice(if big_endian { b"\xFE\xFF" } else { b"\xFF\xFE" });
        }
        for unit in text.encode_utf16() {
            let pair = if big_endian {
                unit.to_be_bytes()
            } else {
                unit.to_le_bytes()
            };
            out.extend_from_slice(&pair);
        }
        return out;
    }

    if has_bom && encoding == UTF_8 {
        out.extend_from_slice(b"\xEF\xBB\xBF");
    }
    let (bytes, _, had_errors) = encoding.encode(text);
    if had_errors {
        log::warn!("some characters cannot be represented in {}", encoding.name());
    }
    out.extend_from_slice(&bytes);
    out
}

/// 文字編輯器。 / Plain text editor; tab-separated files get a table view.
///
/// Until the text is edited the bytes read from disk are saved back as-is.
#[derive(Debug, Clone)]
pub struct TextEditor {
    base: EditorBase,
    text: String,
    table: Option<TextTable>,
    encoding: &'static Encoding,
    has_bom: bool,
    original: Option<Vec<u8>>,
}

impl TextEditor {
    /// 建構函式，供編輯器註冊表使用。 / Constructor registered for text files.
    pub fn create(
        ctx: &mut EditorContext<'_>,
        path: PathEntry,
        state: &[u8],
        data: Vec<u8>,
    ) -> Result<Box<dyn Editor>, ResourceError> {
        let editor = Self::new(path, ctx.position, data);

        let view = if state.is_empty() {
            TextViewState::default()
        } else {
            serde_json::from_slice(state).unwrap_or_else(|err| {
                log::warn!("discarding view state of {}: {err}", editor.base.path.full_path);
                TextViewState::default()
            })
        };
        ctx.views.insert(&editor.id(), view);

        Ok(Box::new(editor))
    }

    pub fn new(path: PathEntry, position: (f32, f32), data: Vec<u8>) -> Self {
        let DecodedText {
            text,
            encoding,
            has_bom,
        } = decode_text(&data);
        let table = TextTable::detect(&text);
        let mut base = EditorBase::new(path, position);
        base.window.set_size(DEFAULT_SIZE.0, DEFAULT_SIZE.1);
        Self {
            base,
            text,
            table,
            encoding,
            has_bom,
            original: Some(data),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.table = TextTable::detect(&self.text);
        self.original = None;
    }

    /// 檔案的編碼名稱。 / Name of the encoding the file was read with.
    pub fn encoding(&self) -> &'static str {
        self.encoding.name()
    }

    pub fn table(&self) -> Option<&TextTable> {
        self.table.as_ref()
    }
}

impl Editor for TextEditor {
    fn base(&self) -> &EditorBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EditorBase {
        &mut self.base
    }

    fn generate_save_data(&self) -> Option<Vec<u8>> {
        match &self.original {
            Some(bytes) => Some(bytes.clone()),
            None => Some(encode_text(&self.text, self.encoding, self.has_bom)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_tab_separated_tables() {
        let table = TextTable::detect("Name\tLevel\nzombie\t1\nskeleton\t2").unwrap();
        assert_eq!(table.header, vec!["Name", "Level"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["skeleton", "2"]);

        assert!(TextTable::detect("plain text\nwith\ttab later").is_none());
        assert!(TextTable::detect("").is_none());
    }

    #[test]
    fn wide_tables_are_capped() {
        let header = vec!["c"; MAX_TABLE_COLUMNS + 10].join("\t");
        let table = TextTable::detect(&header).unwrap();
        assert_eq!(table.columns(), MAX_TABLE_COLUMNS);
    }

    #[test]
    fn editing_updates_save_data_and_table() {
        let path = PathEntry::project("a.txt", "/p/content/a.txt", false);
        let mut editor = TextEditor::new(path, (320.0, 30.0), b"hello".to_vec());
        assert!(editor.table().is_none());
        assert_eq!(editor.base().window.size(), DEFAULT_SIZE);

        editor.set_text("a\tb\n1\t2");
        assert_eq!(editor.generate_save_data().unwrap(), b"a\tb\n1\t2");
        assert_eq!(editor.table().unwrap().columns(), 2);
        assert_eq!(editor.title(), "a.txt##1__/p/content/a.txt");
    }

    #[test]
    fn legacy_encoded_text_round_trips() {
        let data = b"Name\tLevel\nGol\xe9m\t1\nCaf\xe9 cr\xe8me\t2\n".to_vec();
        let path = PathEntry::project("monsters.txt", "/p/content/monsters.txt", false);
        let mut editor = TextEditor::new(path, (0.0, 0.0), data.clone());

        assert_ne!(editor.encoding(), "UTF-8");
        assert!(editor.text().contains("Gol\u{e9}m"));
        assert_eq!(editor.generate_save_data().unwrap(), data);

        editor.set_text("Name\tLevel\nGol\u{e9}m\t3\n");
        let saved = editor.generate_save_data().unwrap();
        assert!(saved.contains(&0xe9));
        assert!(!saved.contains(&0xc3));
    }

    #[test]
    fn teardown_evicts_view_state() {
        let config = hellforge_settings::Config::default();
        let mut views = crate::view_state::ViewStateStore::new();
        let mut ctx = EditorContext {
            config: &config,
            project: None,
            views: &mut views,
            position: (0.0, 0.0),
        };
        let path = PathEntry::project("a.txt", "/p/content/a.txt", false);
        let mut editor = TextEditor::create(&mut ctx, path, b"{\"cursor\":2}", b"hi".to_vec())
            .unwrap();
        let id = editor.id();
        assert_eq!(views.get::<TextViewState>(&id).unwrap().cursor, 2);

        editor.show();
        editor.teardown(&mut views);
        assert!(!editor.is_visible());
        assert!(!views.contains(&id));
    }

    #[test]
    fn bom_is_kept_when_re_encoding() {
        let path = PathEntry::project("a.txt", "/p/content/a.txt", false);
        let mut editor = TextEditor::new(path, (0.0, 0.0), b"\xEF\xBB\xBFhi".to_vec());
        assert_eq!(editor.text(), "hi");

        editor.set_text("ho");
        assert_eq!(editor.generate_save_data().unwrap(), b"\xEF\xBB\xBFho");
    }
}
