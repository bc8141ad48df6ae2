// src/models.rs

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One video clip as described by the remote catalog.
///
/// Records are immutable once fetched; `id` is unique within a single
/// query result. Field names on the wire are the catalog's
/// (`_id`, `url`, `fromtime`, `totime`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClipRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub filename: String,
    #[serde(rename = "url")]
    pub source_url: String,
    pub date: String,
    #[serde(rename = "fromtime")]
    pub from_time: String,
    #[serde(rename = "totime")]
    pub to_time: String,
}

impl ClipRef {
    /// Direct openable URL for this clip, used as the per-item fallback
    /// when bulk transfer fails for it.
    pub fn direct_url(&self) -> &str {
        &self.source_url
    }
}

/// Caller-chosen subset of clip ids to export. Order-irrelevant.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    ids: HashSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the id if absent, removes it if present.
    pub fn toggle(&mut self, id: &str) {
        if !self.ids.remove(id) {
            self.ids.insert(id.to_string());
        }
    }

    pub fn select_all(&mut self, clips: &[ClipRef]) {
        self.ids.extend(clips.iter().map(|c| c.id.clone()));
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resolves the selection against a catalog result, preserving the
    /// catalog's order. Ids with no matching clip are skipped.
    pub fn materialize(&self, catalog: &[ClipRef]) -> Vec<ClipRef> {
        catalog
            .iter()
            .filter(|clip| self.ids.contains(&clip.id))
            .cloned()
            .collect()
    }
}

/// One entry in the ordered failure log. Never removed automatically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub filename: String,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(id: &str, filename: &str) -> ClipRef {
        ClipRef {
            id: id.to_string(),
            filename: filename.to_string(),
            source_url: format!("http://example.com/{filename}"),
            date: "01-02-2025".to_string(),
            from_time: "01:00:00".to_string(),
            to_time: "02:00:00".to_string(),
        }
    }

    #[test]
    fn toggle_flips_membership() {
        let mut sel = Selection::new();
        sel.toggle("a");
        assert!(sel.contains("a"));
        sel.toggle("a");
        assert!(!sel.contains("a"));
        assert!(sel.is_empty());
    }

    #[test]
    fn materialize_preserves_catalog_order() {
        let catalog = vec![clip("1", "a.mp4"), clip("2", "b.mp4"), clip("3", "c.mp4")];
        let mut sel = Selection::new();
        sel.toggle("3");
        sel.toggle("1");

        let resolved = sel.materialize(&catalog);
        let ids: Vec<_> = resolved.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn materialize_skips_unknown_ids() {
        let catalog = vec![clip("1", "a.mp4")];
        let mut sel = Selection::new();
        sel.toggle("1");
        sel.toggle("ghost");

        assert_eq!(sel.materialize(&catalog).len(), 1);
    }

    #[test]
    fn clip_ref_parses_catalog_shape() {
        let json = r#"{
            "_id": "abc123",
            "filename": "cam-0105",
            "url": "http://cdn.example.com/cam-0105.mp4",
            "date": "05-01-2025",
            "fromtime": "01:00:00",
            "totime": "01:05:00"
        }"#;
        let clip: ClipRef = serde_json::from_str(json).unwrap();
        assert_eq!(clip.id, "abc123");
        assert_eq!(clip.source_url, "http://cdn.example.com/cam-0105.mp4");
        assert_eq!(clip.from_time, "01:00:00");
    }
}
