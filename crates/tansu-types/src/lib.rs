//! Shared entity types for Tansu.
//!
//! This crate is the model foundation: typed IDs, blocks, zones,
//! snapshots, edit records, block type descriptors, the token budget
//! aggregate, and the line diff. It has **no internal tansu
//! dependencies** — a pure leaf crate that the engine builds on.
//!
//! # Entity Overview
//!
//! ```text
//! Block (BlockId)
//!     └── lives in Zone (ZoneId, built-in or custom)
//!     └── pinned top/bottom within its zone, or free
//!     └── role (canonical) + optional block_type (display identity)
//!     └── compressed_versions keyed by CompressionLevel
//!
//! Zone (ZoneId)
//!     └── context_order: primacy first, recency last — always
//!     └── display_order: on-screen position, freely reassignable
//!
//! Snapshot (SnapshotId)
//!     └── deep copy of blocks + ZoneLayout
//!     └── parent_snapshot_id forms branch lineage
//!
//! EditEntry
//!     └── field-level before/after per block, capped per block
//! ```

pub mod block;
pub mod block_type;
pub mod budget;
pub mod diff;
pub mod edit;
pub mod ids;
pub mod snapshot;
pub mod zone;

// Re-export primary types at crate root for convenience.
pub use block::{
    clamp_score, Block, BlockMetadata, CompressionLevel, CompressionVersion, CompressionVersions,
    PinPosition, Role,
};
pub use block_type::{
    built_in_types, is_built_in_type, resolve_type_selection, BlockType, TypeSelection,
};
pub use budget::{TokenBudget, DEFAULT_TOKEN_LIMIT};
pub use diff::{diff_lines, diff_stats, DiffLine, DiffLineKind, DiffStats};
pub use edit::{edit_fields, EditEntry, EditFields, EditType, MAX_ENTRIES_PER_BLOCK};
pub use ids::{BlockId, SnapshotId, ZoneId};
pub use snapshot::{Snapshot, SnapshotKind, WorkingState};
pub use zone::{
    built_in_zones, ZoneConfig, ZoneLayout, ZoneOverride, MIDDLE_CONTEXT_ORDER,
    PRIMACY_CONTEXT_ORDER, RECENCY_CONTEXT_ORDER,
};

/// Current time as Unix milliseconds. Used by constructors throughout
/// the crate.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
