//! Snapshot model: named point-in-time copies of the block list plus the
//! zone layout, with parent linkage for branch lineage.
//!
//! The store keeps a separate working-state cache so that checking out a
//! named snapshot never loses the live editing state — see
//! `tansu-core`'s `ContextStore` for the switch protocol.

use serde::{Deserialize, Serialize};

use crate::block::Block;
use crate::ids::SnapshotId;
use crate::zone::ZoneLayout;

/// Snapshot kind. Hard snapshots are user-pinned baselines; soft
/// snapshots are routine save points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    Hard,
    #[default]
    Soft,
}

/// A named point-in-time copy of the editor state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: SnapshotId,
    pub name: String,
    /// Creation time (Unix millis).
    pub timestamp: u64,
    /// Deep copy of the block list at capture time.
    pub blocks: Vec<Block>,
    /// Cached token total of `blocks` at capture time.
    pub total_tokens: u64,
    #[serde(rename = "type")]
    pub kind: SnapshotKind,
    /// Zone registry layout at capture time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_state: Option<ZoneLayout>,
    /// The snapshot this branched from; `None` when branched from the
    /// working state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_snapshot_id: Option<SnapshotId>,
}

impl Snapshot {
    /// Capture a snapshot from a live state, auto-timestamped.
    pub fn capture(
        name: impl Into<String>,
        blocks: Vec<Block>,
        zone_state: ZoneLayout,
        parent_snapshot_id: Option<SnapshotId>,
    ) -> Self {
        let total_tokens = blocks.iter().map(|b| u64::from(b.tokens)).sum();
        Self {
            id: SnapshotId::generate(),
            name: name.into(),
            timestamp: crate::now_millis(),
            blocks,
            total_tokens,
            kind: SnapshotKind::Soft,
            zone_state: Some(zone_state),
            parent_snapshot_id,
        }
    }
}

/// The working state parked aside while a named snapshot is checked out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingState {
    pub blocks: Vec<Block>,
    pub zone_state: ZoneLayout,
}

// ============================================================================
// Tests
// ============================================================================
