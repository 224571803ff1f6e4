use std::any::Any;
use std::collections::HashMap;

use serde::Serialize;

/// 編輯器的暫存檢視狀態。 / Ephemeral per-editor view state (cursor, scroll, toggles).
pub trait ViewState: Any {
    fn encode(&self) -> Result<Vec<u8>, serde_json::Error>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T> ViewState for T
where
    T: Any + Serialize,
{
    fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// 以編輯器識別碼取得檢視狀態的鍵。 / Key of an editor's view state.
pub fn widget_key(unique_id: &str) -> String {
    format!("widget_{unique_id}")
}

/// 檢視狀態的集中儲存。 / Explicit store of view states, keyed by `widget_<unique id>`.
///
/// Entries are created when an editor opens and evicted when it closes.
#[derive(Default)]
pub struct ViewStateStore {
    states: HashMap<String, Box<dyn ViewState>>,
}

impl ViewStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T>(&mut self, unique_id: &str, state: T)
    where
        T: ViewState,
    {
        self.states.insert(widget_key(unique_id), Box::new(state));
    }

    pub fn get<T: 'static>(&self, unique_id: &str) -> Option<&T> {
        self.states
            .get(&widget_key(unique_id))
            .and_then(|state| state.as_ref().as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: 'static>(&mut self, unique_id: &str) -> Option<&mut T> {
        self.states
            .get_mut(&widget_key(unique_id))
            .and_then(|state| state.as_mut().as_any_mut().downcast_mut::<T>())
    }

    pub fn contains(&self, unique_id: &str) -> bool {
        self.states.contains_key(&widget_key(unique_id))
    }

    /// 將檢視狀態編碼為 JSON。 / Encodes the view state as JSON; `None` when absent or unencodable.
    pub fn encode(&self, unique_id: &str) -> Option<Vec<u8>> {
        let state = self.states.get(&widget_key(unique_id))?;
        match state.encode() {
            Ok(data) => Some(data),
            Err(err) => {
                log::error!("error encoding view state of {unique_id}: {err}");
                None
            }
        }
    }

    /// 移除檢視狀態。 / Drops the view state; returns `true` when one existed.
    pub fn evict(&mut self, unique_id: &str) -> bool {
        self.states.remove(&widget_key(unique_id)).is_some()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl std::fmt::Debug for ViewStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewStateStore")
            .field("keys", &self.states.keys().collect::<Vec<_>>())
            .finish()
    }
}
