use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// 最近開啟專案的上限。 / Maximum number of remembered projects.
pub const MAX_RECENT_PROJECTS: usize = 5;

/// 管理最近開啟專案的清單。 / Maintains the bounded, most-recent-first list of opened projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct RecentProjects {
    entries: VecDeque<String>,
}

impl Default for RecentProjects {
    fn default() -> Self {
        Self {
            entries: VecDeque::with_capacity(MAX_RECENT_PROJECTS),
        }
    }
}

impl From<Vec<String>> for RecentProjects {
    fn from(entries: Vec<String>) -> Self {
        let mut recent = Self::default();
        for entry in entries.into_iter().rev() {
            recent.add(entry);
        }
        recent
    }
}

impl From<RecentProjects> for Vec<String> {
    fn from(recent: RecentProjects) -> Self {
        recent.entries.into_iter().collect()
    }
}

impl RecentProjects {
    /// 加入或提升某個專案路徑至清單頂端。 / Inserts or promotes a manifest path to the front.
    pub fn add(&mut self, path: impl Into<String>) {
        let path = path.into();
        if path.is_empty() {
            return;
        }
        self.entries.retain(|existing| existing != &path);
        self.entries.push_front(path);
        self.entries.truncate(MAX_RECENT_PROJECTS);
    }

    /// 移除指定路徑；若存在則回傳 `true`。 / Removes the path and returns `true` if it was listed.
    pub fn remove(&mut self, path: &str) -> bool {
        let initial_len = self.entries.len();
        self.entries.retain(|existing| existing != path);
        initial_len != self.entries.len()
    }

    /// 最近一次開啟的專案。 / The most recently opened project.
    pub fn most_recent(&self) -> Option<&str> {
        self.entries.front().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_promotes_and_limits_capacity() {
        let mut recent = RecentProjects::default();
        for name in ["a.hsp", "b.hsp", "c.hsp"] {
            recent.add(name);
        }
        // 重新加入既有路徑時，應提升至清單前端。
        recent.add("a.hsp");
        assert_eq!(recent.iter().collect::<Vec<_>>(), vec!["a.hsp", "c.hsp", "b.hsp"]);

        for name in ["d.hsp", "e.hsp", "f.hsp"] {
            recent.add(name);
        }
        assert_eq!(recent.len(), MAX_RECENT_PROJECTS);
        assert_eq!(recent.most_recent(), Some("f.hsp"));
        assert!(!recent.iter().any(|p| p == "b.hsp"));
    }

    #[test]
    fn serializes_as_plain_list() {
        let mut recent = RecentProjects::default();
        recent.add("one.hsp");
        recent.add("two.hsp");
        let json = serde_json::to_string(&recent).unwrap();
        assert_eq!(json, r#"["two.hsp","one.hsp"]"#);

        let restored: RecentProjects = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, recent);
    }

    #[test]
    fn oversized_lists_are_trimmed_on_load() {
        let listed: Vec<String> = (0..8).map(|i| format!("{i}.hsp")).collect();
        let mut recent = RecentProjects::from(listed);
        assert_eq!(recent.len(), MAX_RECENT_PROJECTS);
        assert_eq!(recent.most_recent(), Some("0.hsp"));
        assert!(recent.remove("1.hsp"));
        assert!(!recent.remove("7.hsp"));
    }
}
