//! Block model: roles, pinning, compression, and the `Block` entity.
//!
//! A block is one unit of content in the context editor. Its canonical
//! semantic category is `role`; an optional `block_type` overrides what
//! the block *looks like* (selection, filtering, search) without ever
//! touching the canonical role — see [`Block::display_type_id`].
//!
//! Compression is non-destructive: `compressed_versions` always retains
//! the `original` entry, and `compression_level` merely selects which
//! precomputed version is active. Only a content edit rewrites `original`.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::EnumString;

use crate::ids::{BlockId, ZoneId};

/// Canonical semantic category of a block.
///
/// Used for token-budget aggregation and as the default display type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum Role {
    System,
    #[default]
    User,
    Assistant,
    #[serde(rename = "tool_use")]
    #[strum(serialize = "tool_use", serialize = "tooluse")]
    ToolUse,
    #[serde(rename = "tool_result")]
    #[strum(serialize = "tool_result", serialize = "toolresult")]
    ToolResult,
}

impl Role {
    /// All roles, in budget-seeding order.
    pub const ALL: [Role; 5] = [
        Role::System,
        Role::User,
        Role::Assistant,
        Role::ToolUse,
        Role::ToolResult,
    ];

    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::ToolUse => "tool_use",
            Role::ToolResult => "tool_result",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pin position within a zone.
///
/// Pinned-top blocks form a prefix of the zone's ordering, pinned-bottom
/// blocks a suffix. Pinned blocks are exempt from drag reordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum PinPosition {
    Top,
    Bottom,
}

impl PinPosition {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            PinPosition::Top => "top",
            PinPosition::Bottom => "bottom",
        }
    }
}

impl std::fmt::Display for PinPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which precomputed content version of a block is active.
///
/// A flat selector, not a progression — any level may be set from any
/// other level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum CompressionLevel {
    #[default]
    Original,
    Trimmed,
    Summarized,
    Minimal,
}

impl CompressionLevel {
    /// Parse from string (case-insensitive).
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        <Self as FromStr>::from_str(s).ok()
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionLevel::Original => "original",
            CompressionLevel::Trimmed => "trimmed",
            CompressionLevel::Summarized => "summarized",
            CompressionLevel::Minimal => "minimal",
        }
    }
}

impl std::fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One stored content version at a given compression level.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionVersion {
    pub content: String,
    pub tokens: u32,
}

/// Per-level content versions. `original` is always present; the other
/// levels are filled in by an external compression pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionVersions {
    pub original: CompressionVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trimmed: Option<CompressionVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarized: Option<CompressionVersion>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimal: Option<CompressionVersion>,
}

impl CompressionVersions {
    /// Seed with only the original version present.
    pub fn new(content: impl Into<String>, tokens: u32) -> Self {
        Self {
            original: CompressionVersion {
                content: content.into(),
                tokens,
            },
            trimmed: None,
            summarized: None,
            minimal: None,
        }
    }

    /// The stored version for a level, if present.
    pub fn get(&self, level: CompressionLevel) -> Option<&CompressionVersion> {
        match level {
            CompressionLevel::Original => Some(&self.original),
            CompressionLevel::Trimmed => self.trimmed.as_ref(),
            CompressionLevel::Summarized => self.summarized.as_ref(),
            CompressionLevel::Minimal => self.minimal.as_ref(),
        }
    }

    /// The effective version for a level, falling back to `original`
    /// when that level has not been computed.
    pub fn active(&self, level: CompressionLevel) -> &CompressionVersion {
        self.get(level).unwrap_or(&self.original)
    }

    /// Store a computed version for a non-original level.
    ///
    /// `Original` is rejected here — only a content edit may rewrite it.
    pub fn set(&mut self, level: CompressionLevel, version: CompressionVersion) {
        match level {
            CompressionLevel::Original => {}
            CompressionLevel::Trimmed => self.trimmed = Some(version),
            CompressionLevel::Summarized => self.summarized = Some(version),
            CompressionLevel::Minimal => self.minimal = Some(version),
        }
    }
}

/// Provenance metadata attached to every block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockMetadata {
    pub provider: String,
    pub turn_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub file_paths: Vec<String>,
}

impl BlockMetadata {
    /// Metadata for a manually created block.
    pub fn manual(turn_index: u32) -> Self {
        Self {
            provider: "manual".to_string(),
            turn_index,
            tool_name: None,
            file_paths: Vec::new(),
        }
    }
}

/// A unit of content in the context editor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: BlockId,
    /// Canonical semantic category. Never mutated by display-type changes.
    pub role: Role,
    /// Custom display type, overriding `role` for display purposes only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_type: Option<String>,
    pub content: String,
    pub tokens: u32,
    /// Creation time (Unix millis).
    pub timestamp: u64,
    pub zone: ZoneId,
    pub pinned: Option<PinPosition>,
    pub compression_level: CompressionLevel,
    pub compressed_versions: CompressionVersions,
    /// Usage heat score in [0, 1], clamped on write.
    pub usage_heat: f64,
    /// Position relevance score in [0, 1], clamped on write.
    pub position_relevance: f64,
    pub last_referenced_turn: u32,
    pub reference_count: u32,
    pub topic_cluster: Option<String>,
    #[serde(default)]
    pub topic_keywords: Vec<String>,
    pub metadata: BlockMetadata,
}

impl Block {
    /// Create a new block with default scores and seeded compression
    /// versions. `tokens` must already be estimated from `content`.
    pub fn new(zone: ZoneId, role: Role, content: impl Into<String>, tokens: u32) -> Self {
        let content = content.into();
        Self {
            id: BlockId::generate(),
            role,
            block_type: None,
            compressed_versions: CompressionVersions::new(content.clone(), tokens),
            content,
            tokens,
            timestamp: crate::now_millis(),
            zone,
            pinned: None,
            compression_level: CompressionLevel::Original,
            usage_heat: 0.5,
            position_relevance: 0.5,
            last_referenced_turn: 0,
            reference_count: 0,
            topic_cluster: None,
            topic_keywords: Vec::new(),
            metadata: BlockMetadata::manual(0),
        }
    }

    /// Display identity: `block_type` when set, otherwise the role string.
    ///
    /// The single rule determining what a block "looks like" to
    /// selection, filtering, and search — decoupled from `role`.
    pub fn display_type_id(&self) -> &str {
        self.block_type.as_deref().unwrap_or(self.role.as_str())
    }

    /// Whether this block's display identity matches a type id.
    pub fn matches_display_type(&self, type_id: &str) -> bool {
        self.display_type_id() == type_id
    }

    /// The content of the currently active compression version.
    pub fn active_content(&self) -> &str {
        &self.compressed_versions.active(self.compression_level).content
    }

    /// The token count of the currently active compression version.
    pub fn active_tokens(&self) -> u32 {
        self.compressed_versions.active(self.compression_level).tokens
    }
}

/// Clamp a continuous score into [0, 1].
pub fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

// ============================================================================
// Tests
// ============================================================================
