//! Serializable snapshot of the open editors and tool windows of a project.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Geometry and visibility shared by editors and tool windows.  
/// 編輯器與工具視窗共用的位置、尺寸與可見狀態。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowState {
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub pos_x: f32,
    #[serde(default)]
    pub pos_y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
}

impl WindowState {
    pub fn new(visible: bool, position: (f32, f32), size: (f32, f32)) -> Self {
        Self {
            visible,
            pos_x: position.0,
            pos_y: position.1,
            width: size.0,
            height: size.1,
        }
    }

    pub fn position(&self) -> (f32, f32) {
        (self.pos_x, self.pos_y)
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

/// One open editor: the serialized path entry plus the editor's own payload.  
/// 單一已開啟編輯器的記錄：序列化的路徑節點與編輯器自身的狀態內容。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditorState {
    #[serde(default, with = "crate::serde_b64")]
    pub path: Vec<u8>,
    #[serde(default, rename = "state", with = "crate::serde_b64")]
    pub encoded: Vec<u8>,
    #[serde(flatten)]
    pub window: WindowState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolWindowKind {
    Console,
    #[serde(rename = "MPQExplorer")]
    MpqExplorer,
    ProjectExplorer,
}

impl ToolWindowKind {
    pub const ALL: [ToolWindowKind; 3] = [
        ToolWindowKind::Console,
        ToolWindowKind::MpqExplorer,
        ToolWindowKind::ProjectExplorer,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ToolWindowKind::Console => "Console",
            ToolWindowKind::MpqExplorer => "MPQ Explorer",
            ToolWindowKind::ProjectExplorer => "Project Explorer",
        }
    }
}

impl fmt::Display for ToolWindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolWindowState {
    #[serde(rename = "type")]
    pub kind: ToolWindowKind,
    #[serde(flatten)]
    pub window: WindowState,
}

/// Everything needed to reopen a project's workspace.  
/// 重新開啟專案工作區所需的全部資訊。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    #[serde(default)]
    pub project_path: String,
    #[serde(default)]
    pub editor_windows: Vec<EditorState>,
    #[serde(default)]
    pub tool_windows: Vec<ToolWindowState>,
}

impl AppState {
    pub fn is_empty(&self) -> bool {
        self.editor_windows.is_empty() && self.tool_windows.is_empty()
    }

    pub fn tool_window(&self, kind: ToolWindowKind) -> Option<&ToolWindowState> {
        self.tool_windows.iter().find(|tool| tool.kind == kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_entry::PathEntry;

    #[test]
    fn editor_state_flattens_window_and_encodes_bytes() {
        let entry = PathEntry::project("a.txt", "/p/content/a.txt", false);
        let record = EditorState {
            path: entry.to_identifier().unwrap(),
            encoded: b"{\"cursor\":3}".to_vec(),
            window: WindowState::new(true, (320.0, 30.0), (400.0, 300.0)),
        };

        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert!(json["path"].is_string());
        assert!(json["state"].is_string());
        assert_eq!(json["posX"], 320.0);
        assert_eq!(json["visible"], true);

        let decoded: EditorState = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, record);
        let restored = PathEntry::from_identifier(&decoded.path).unwrap();
        assert_eq!(restored.unique_id(), entry.unique_id());
    }

    #[test]
    fn tool_window_kind_uses_stable_names() {
        let state = ToolWindowState {
            kind: ToolWindowKind::MpqExplorer,
            window: WindowState::default(),
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["type"], "MPQExplorer");
    }

    #[test]
    fn app_state_tolerates_missing_fields() {
        let state: AppState = serde_json::from_str("{\"projectPath\":\"/p/x.hsp\"}").unwrap();
        assert_eq!(state.project_path, "/p/x.hsp");
        assert!(state.is_empty());

        let record: EditorState = serde_json::from_str("{\"path\":null,\"state\":null}").unwrap();
        assert!(record.path.is_empty());
        assert!(record.encoded.is_empty());
    }
}
