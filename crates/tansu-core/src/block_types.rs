//! Block type registry: the fixed built-in table plus custom types.
//!
//! Only custom types are mutable and persisted; built-ins derive from the
//! role set and live in `tansu-types`.

use tansu_types::{built_in_types, BlockType};

use crate::storage::{load_record, save_record, StorageHandle, BLOCK_TYPES_KEY};

/// Partial update applied through [`BlockTypeRegistry::update_custom_type`].
#[derive(Clone, Debug, Default)]
pub struct BlockTypeUpdate {
    pub label: Option<String>,
    pub short_label: Option<String>,
    pub color: Option<String>,
}

/// Registry of block type descriptors.
#[derive(Default)]
pub struct BlockTypeRegistry {
    custom_types: Vec<BlockType>,
    storage: Option<StorageHandle>,
}

impl BlockTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry backed by storage, loading any persisted custom
    /// types. The record is a flat array of descriptors.
    pub fn with_storage(storage: StorageHandle) -> Self {
        let custom_types =
            load_record::<Vec<BlockType>>(&storage, BLOCK_TYPES_KEY).unwrap_or_default();
        Self {
            custom_types,
            storage: Some(storage),
        }
    }

    fn save(&self) {
        if let Some(storage) = &self.storage {
            save_record(storage, BLOCK_TYPES_KEY, &self.custom_types);
        }
    }

    /// All types, built-ins first.
    pub fn list_types(&self) -> Vec<BlockType> {
        built_in_types()
            .into_iter()
            .chain(self.custom_types.iter().cloned())
            .collect()
    }

    /// The custom types only.
    pub fn custom_types(&self) -> &[BlockType] {
        &self.custom_types
    }

    /// Add a custom type and return its generated ID. The short label is
    /// uppercased and truncated to 4 characters.
    pub fn add_custom_type(
        &mut self,
        label: impl Into<String>,
        short_label: &str,
        color: impl Into<String>,
    ) -> String {
        let id = format!("custom-{}", &uuid::Uuid::new_v4().simple().to_string()[..12]);
        self.custom_types
            .push(BlockType::custom(id.clone(), label, short_label, color));
        self.save();
        id
    }

    /// Apply a partial update to a custom type. Unknown or built-in IDs
    /// are ignored.
    pub fn update_custom_type(&mut self, id: &str, update: BlockTypeUpdate) {
        if let Some(ty) = self.custom_types.iter_mut().find(|t| t.id == id) {
            if let Some(label) = update.label {
                ty.label = label;
            }
            if let Some(short) = update.short_label {
                let mut short = short.to_uppercase();
                short.truncate(4);
                ty.short_label = short;
            }
            if let Some(color) = update.color {
                ty.color = color;
            }
        }
        self.save();
    }

    /// Remove a custom type. Blocks carrying the type keep their
    /// `block_type` string and fall back to role-derived display.
    pub fn delete_custom_type(&mut self, id: &str) {
        self.custom_types.retain(|t| t.id != id);
        self.save();
    }

    /// A type descriptor by ID, built-in or custom.
    pub fn type_by_id(&self, id: &str) -> Option<BlockType> {
        self.list_types().into_iter().find(|t| t.id == id)
    }

    /// Effective color for a type ID, with a muted fallback.
    pub fn type_color(&self, id: &str) -> String {
        self.type_by_id(id)
            .map(|t| t.color)
            .unwrap_or_else(|| "var(--text-muted)".to_string())
    }

    /// Effective short label for a type ID. Unknown IDs fall back to
    /// their first three characters, uppercased.
    pub fn type_short_label(&self, id: &str) -> String {
        self.type_by_id(id)
            .map(|t| t.short_label)
            .unwrap_or_else(|| id.chars().take(3).collect::<String>().to_uppercase())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory_storage;

    #[test]
    fn test_lists_built_ins_by_default() {
        let registry = BlockTypeRegistry::new();
        let types = registry.list_types();
        assert_eq!(types.len(), 5);
        assert!(types.iter().all(|t| t.is_built_in));
    }

    #[test]
    fn test_add_custom_type_normalizes_short_label() {
        let mut registry = BlockTypeRegistry::new();
        let id = registry.add_custom_type("Scratch Notes", "notes", "#888");
        assert!(id.starts_with("custom-"));
        let ty = registry.type_by_id(&id).unwrap();
        assert_eq!(ty.short_label, "NOTE");
        assert!(!ty.is_built_in);
        assert_eq!(registry.list_types().len(), 6);
    }

    #[test]
    fn test_update_ignores_built_ins() {
        let mut registry = BlockTypeRegistry::new();
        registry.update_custom_type(
            "system",
            BlockTypeUpdate {
                label: Some("Hacked".into()),
                ..Default::default()
            },
        );
        assert_eq!(registry.type_by_id("system").unwrap().label, "System");
    }

    #[test]
    fn test_update_custom_type() {
        let mut registry = BlockTypeRegistry::new();
        let id = registry.add_custom_type("Notes", "NT", "#888");
        registry.update_custom_type(
            &id,
            BlockTypeUpdate {
                short_label: Some("scratch".into()),
                color: Some("#f0f".into()),
                ..Default::default()
            },
        );
        let ty = registry.type_by_id(&id).unwrap();
        assert_eq!(ty.label, "Notes");
        assert_eq!(ty.short_label, "SCRA");
        assert_eq!(ty.color, "#f0f");
    }

    #[test]
    fn test_delete_custom_type() {
        let mut registry = BlockTypeRegistry::new();
        let id = registry.add_custom_type("Notes", "NT", "#888");
        registry.delete_custom_type(&id);
        assert!(registry.type_by_id(&id).is_none());
        // Built-ins are untouched by delete.
        registry.delete_custom_type("user");
        assert!(registry.type_by_id("user").is_some());
    }

    #[test]
    fn test_lookup_fallbacks() {
        let registry = BlockTypeRegistry::new();
        assert_eq!(registry.type_color("assistant"), "var(--role-assistant)");
        assert_eq!(registry.type_color("ghost"), "var(--text-muted)");
        assert_eq!(registry.type_short_label("tool_result"), "RES");
        assert_eq!(registry.type_short_label("ghost-type"), "GHO");
    }

    #[test]
    fn test_persistence_roundtrip() {
        let storage = memory_storage();
        let id;
        {
            let mut registry = BlockTypeRegistry::with_storage(storage.clone());
            id = registry.add_custom_type("Notes", "NT", "#888");
        }
        let reloaded = BlockTypeRegistry::with_storage(storage);
        assert_eq!(reloaded.custom_types().len(), 1);
        assert_eq!(reloaded.type_by_id(&id).unwrap().label, "Notes");
    }
}
