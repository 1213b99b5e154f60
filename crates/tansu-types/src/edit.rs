//! Edit history records: field-level before/after change entries.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;
use uuid::Uuid;

use crate::ids::BlockId;

/// Maximum retained entries per block, newest first.
pub const MAX_ENTRIES_PER_BLOCK: usize = 50;

/// Which family of fields an edit touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum EditType {
    Content,
    Zone,
    Compression,
    Role,
    Pin,
}

impl EditType {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EditType::Content => "content",
            EditType::Zone => "zone",
            EditType::Compression => "compression",
            EditType::Role => "role",
            EditType::Pin => "pin",
        }
    }
}

impl std::fmt::Display for EditType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Field name → value map for one side of an edit. `None` marks a field
/// that was unset (e.g. a cleared pin or block type).
pub type EditFields = BTreeMap<String, Option<String>>;

/// One field-level change record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEntry {
    pub id: String,
    pub block_id: BlockId,
    /// When the edit happened (Unix millis).
    pub timestamp: u64,
    #[serde(rename = "type")]
    pub kind: EditType,
    pub before: EditFields,
    pub after: EditFields,
}

impl EditEntry {
    /// Create a new entry, auto-timestamped.
    pub fn new(block_id: BlockId, kind: EditType, before: EditFields, after: EditFields) -> Self {
        Self {
            id: format!("edit-{}", &Uuid::new_v4().simple().to_string()[..12]),
            block_id,
            timestamp: crate::now_millis(),
            kind,
            before,
            after,
        }
    }
}

/// Build an [`EditFields`] map from `(field, value)` pairs.
pub fn edit_fields<const N: usize>(pairs: [(&str, Option<String>); N]) -> EditFields {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_type_parsing() {
        assert_eq!(EditType::from_str("content"), Some(EditType::Content));
        assert_eq!(EditType::from_str("PIN"), Some(EditType::Pin));
        assert_eq!(EditType::from_str("merge"), None);
    }

    #[test]
    fn test_entry_construction() {
        let block_id = BlockId::generate();
        let entry = EditEntry::new(
            block_id.clone(),
            EditType::Zone,
            edit_fields([("zone", Some("middle".into()))]),
            edit_fields([("zone", Some("recency".into()))]),
        );
        assert_eq!(entry.block_id, block_id);
        assert_eq!(entry.kind, EditType::Zone);
        assert!(entry.id.starts_with("edit-"));
        assert!(entry.timestamp > 0);
        assert_eq!(entry.before["zone"], Some("middle".to_string()));
    }

    #[test]
    fn test_none_marks_unset_fields() {
        let entry = EditEntry::new(
            BlockId::generate(),
            EditType::Pin,
            edit_fields([("pinned", Some("top".into()))]),
            edit_fields([("pinned", None)]),
        );
        assert_eq!(entry.after["pinned"], None);
    }

    #[test]
    fn test_serde_kind_serializes_as_type() {
        let entry = EditEntry::new(
            BlockId::from("block-1"),
            EditType::Compression,
            EditFields::new(),
            EditFields::new(),
        );
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"type\":\"compression\""));
        assert!(json.contains("\"blockId\":\"block-1\""));
        let parsed: EditEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}
