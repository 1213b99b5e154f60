//! Block type descriptors and display-identity resolution.
//!
//! Built-in types derive 1:1 from [`Role`]; custom types add a label,
//! a short label (uppercased, at most 4 chars), and a color. Assigning a
//! built-in type to a block changes its canonical role and clears any
//! custom type; assigning a custom type changes display identity only.

use serde::{Deserialize, Serialize};

use crate::block::Role;

/// Descriptor for a block type (built-in or custom).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockType {
    pub id: String,
    pub label: String,
    pub short_label: String,
    pub color: String,
    pub is_built_in: bool,
}

impl BlockType {
    /// Create a custom type. The short label is uppercased and truncated
    /// to 4 characters.
    pub fn custom(
        id: impl Into<String>,
        label: impl Into<String>,
        short_label: &str,
        color: impl Into<String>,
    ) -> Self {
        let mut short: String = short_label.to_uppercase();
        short.truncate(4);
        Self {
            id: id.into(),
            label: label.into(),
            short_label: short,
            color: color.into(),
            is_built_in: false,
        }
    }
}

/// The fixed built-in type table, one entry per role.
pub fn built_in_types() -> Vec<BlockType> {
    fn built_in(id: &str, label: &str, short_label: &str, color: &str) -> BlockType {
        BlockType {
            id: id.to_string(),
            label: label.to_string(),
            short_label: short_label.to_string(),
            color: color.to_string(),
            is_built_in: true,
        }
    }
    vec![
        built_in("system", "System", "SYS", "var(--role-system)"),
        built_in("user", "User", "USR", "var(--role-user)"),
        built_in("assistant", "Assistant", "AST", "var(--role-assistant)"),
        built_in("tool_use", "Tool Use", "TOOL", "var(--role-tool)"),
        built_in("tool_result", "Tool Result", "RES", "var(--role-tool)"),
    ]
}

/// Whether a type id names a built-in role.
pub fn is_built_in_type(type_id: &str) -> bool {
    Role::from_str(type_id).is_some()
}

/// Result of resolving a type selection against a block's current role.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeSelection {
    pub role: Role,
    pub block_type: Option<String>,
}

/// Resolve what assigning `type_id` to a block means.
///
/// A built-in role string becomes the block's new role and clears any
/// custom type. A custom type id leaves the canonical role at
/// `fallback_role` and sets the display type only.
pub fn resolve_type_selection(type_id: &str, fallback_role: Role) -> TypeSelection {
    if let Some(role) = Role::from_str(type_id) {
        TypeSelection {
            role,
            block_type: None,
        }
    } else {
        TypeSelection {
            role: fallback_role,
            block_type: Some(type_id.to_string()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
