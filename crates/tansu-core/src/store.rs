//! The context store: block list, snapshot branches, and edit recording.
//!
//! Every mutator follows the same contract: locate the block by ID,
//! silently no-op when it is absent, apply the change, persist. Single-
//! block mutations of content, zone, compression, role, and pin record an
//! [`EditEntry`] in the owned ledger iff the field actually changed.
//!
//! # Branch protocol
//!
//! At most one of {working state, a named snapshot} is live. Switching
//! away writes the live blocks and zone layout back to wherever they came
//! from — the working-state cache or the currently active snapshot — and
//! only then loads the target. Deleting the active snapshot forces a
//! switch to the working state first, so edits made on the doomed branch
//! survive in the cache.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tansu_types::{
    resolve_type_selection, Block, BlockId, BlockMetadata, CompressionLevel, CompressionVersion,
    EditFields, EditType, PinPosition, Role, Snapshot, SnapshotId, TokenBudget, WorkingState,
    ZoneId, DEFAULT_TOKEN_LIMIT,
};

use crate::clock::{system_clock, ClockHandle};
use crate::estimate::{CharEstimator, TokenEstimator};
use crate::history::EditHistory;
use crate::storage::{load_record, save_record, StorageHandle, CONTEXT_KEY};
use crate::zones::ZoneRegistry;

/// Legal insertion window for a drop into a zone, in pin-sorted indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DropRange {
    pub min: usize,
    pub max: usize,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextRecord {
    #[serde(default)]
    blocks: Vec<Block>,
    #[serde(default)]
    snapshots: Vec<Snapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active_snapshot_id: Option<SnapshotId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    working_state_cache: Option<WorkingState>,
}

/// Block store and snapshot/branch manager.
pub struct ContextStore {
    blocks: Vec<Block>,
    snapshots: Vec<Snapshot>,
    active_snapshot_id: Option<SnapshotId>,
    working_state_cache: Option<WorkingState>,
    token_limit: u64,
    estimator: Box<dyn TokenEstimator>,
    storage: Option<StorageHandle>,
    history: EditHistory,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ContextStore {
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    pub fn with_clock(clock: ClockHandle) -> Self {
        Self {
            blocks: Vec::new(),
            snapshots: Vec::new(),
            active_snapshot_id: None,
            working_state_cache: None,
            token_limit: DEFAULT_TOKEN_LIMIT,
            estimator: Box::new(CharEstimator),
            storage: None,
            history: EditHistory::new(clock),
        }
    }

    /// Create a store backed by storage, loading any persisted state.
    /// A record with an empty block list counts as not loaded.
    pub fn with_storage(storage: StorageHandle, clock: ClockHandle) -> Self {
        let mut store = Self::with_clock(clock.clone());
        store.history = EditHistory::with_storage(storage.clone(), clock);
        if let Some(record) = load_record::<ContextRecord>(&storage, CONTEXT_KEY) {
            if !record.blocks.is_empty() {
                store.blocks = record.blocks;
                store.snapshots = record.snapshots;
                store.active_snapshot_id = record.active_snapshot_id;
                store.working_state_cache = record.working_state_cache;
            }
        }
        store.storage = Some(storage);
        store
    }

    /// Seed the store when nothing was loaded from storage.
    pub fn init_with(&mut self, seed: impl FnOnce() -> (Vec<Block>, Vec<Snapshot>)) {
        if !self.blocks.is_empty() {
            return;
        }
        let (blocks, snapshots) = seed();
        self.blocks = blocks;
        self.snapshots = snapshots;
        self.save();
    }

    /// Swap in a different token estimator.
    pub fn set_estimator(&mut self, estimator: Box<dyn TokenEstimator>) {
        self.estimator = estimator;
    }

    pub fn set_token_limit(&mut self, limit: u64) {
        self.token_limit = limit;
    }

    pub fn token_limit(&self) -> u64 {
        self.token_limit
    }

    fn save(&self) {
        let Some(storage) = &self.storage else { return };
        let record = ContextRecord {
            blocks: self.blocks.clone(),
            snapshots: self.snapshots.clone(),
            active_snapshot_id: self.active_snapshot_id.clone(),
            working_state_cache: self.working_state_cache.clone(),
        };
        save_record(storage, CONTEXT_KEY, &record);
    }

    // ── Views ───────────────────────────────────────────────────────────

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn get_block(&self, id: &BlockId) -> Option<&Block> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    pub fn get_block_index(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    /// Blocks grouped by zone in pin-sorted order. The three built-in
    /// zones are always present, even when empty.
    pub fn blocks_by_zone(&self) -> IndexMap<ZoneId, Vec<&Block>> {
        let mut result: IndexMap<ZoneId, Vec<&Block>> = IndexMap::new();
        result.insert(ZoneId::primacy(), Vec::new());
        result.insert(ZoneId::middle(), Vec::new());
        result.insert(ZoneId::recency(), Vec::new());
        for block in &self.blocks {
            result.entry(block.zone.clone()).or_default().push(block);
        }
        for zone_blocks in result.values_mut() {
            *zone_blocks = sort_with_pins(std::mem::take(zone_blocks));
        }
        result
    }

    /// The current token budget, recomputed from the live block list.
    pub fn token_budget(&self) -> TokenBudget {
        TokenBudget::calculate(&self.blocks, self.token_limit)
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut EditHistory {
        &mut self.history
    }

    // ── Block mutations ─────────────────────────────────────────────────

    /// Create a block in a zone. Empty content falls back to a role-named
    /// placeholder; tokens come from the estimator.
    pub fn create_block(
        &mut self,
        zone: ZoneId,
        role: Role,
        content: &str,
        block_type: Option<String>,
    ) -> BlockId {
        let content = if content.is_empty() {
            format!("New {} block", role)
        } else {
            content.to_string()
        };
        let tokens = self.estimator.estimate(&content);
        let mut block = Block::new(zone, role, content, tokens);
        block.block_type = block_type;
        block.metadata = BlockMetadata::manual(self.blocks.len() as u32);
        let id = block.id.clone();
        self.blocks.push(block);
        self.save();
        id
    }

    /// Move a block to a target zone.
    pub fn move_block(&mut self, id: &BlockId, target_zone: ZoneId) {
        let Some(index) = self.get_block_index(id) else { return };
        let old_zone = self.blocks[index].zone.clone();
        if old_zone == target_zone {
            return;
        }
        self.blocks[index].zone = target_zone.clone();
        self.history.record_edit(
            id.clone(),
            EditType::Zone,
            field("zone", Some(old_zone.to_string())),
            field("zone", Some(target_zone.to_string())),
        );
        self.save();
    }

    /// Move several blocks to a target zone. Bulk moves skip edit
    /// recording.
    pub fn move_blocks(&mut self, ids: &[BlockId], target_zone: ZoneId) {
        for block in &mut self.blocks {
            if ids.contains(&block.id) {
                block.zone = target_zone.clone();
            }
        }
        self.save();
    }

    /// Remove a block and purge its edit history.
    pub fn remove_block(&mut self, id: &BlockId) {
        self.blocks.retain(|b| &b.id != id);
        self.history.clear_block_history(id);
        self.save();
    }

    /// Remove several blocks and purge their edit histories.
    pub fn remove_blocks(&mut self, ids: &[BlockId]) {
        self.blocks.retain(|b| !ids.contains(&b.id));
        for id in ids {
            self.history.clear_block_history(id);
        }
        self.save();
    }

    /// Rewrite a block's content. Tokens are re-estimated and the
    /// `original` compression version is rewritten — the only operation
    /// allowed to touch it.
    pub fn update_block_content(&mut self, id: &BlockId, content: &str) {
        let Some(index) = self.get_block_index(id) else { return };
        let old_content = self.blocks[index].content.clone();
        if old_content == content {
            return;
        }
        let tokens = self.estimator.estimate(content);
        let block = &mut self.blocks[index];
        block.content = content.to_string();
        block.tokens = tokens;
        block.compressed_versions.original = CompressionVersion {
            content: content.to_string(),
            tokens,
        };
        self.history.record_edit(
            id.clone(),
            EditType::Content,
            field("content", Some(old_content)),
            field("content", Some(content.to_string())),
        );
        self.save();
    }

    /// Set a block's canonical role and display type together.
    pub fn set_block_role(&mut self, id: &BlockId, role: Role, block_type: Option<String>) {
        let Some(index) = self.get_block_index(id) else { return };
        let old_role = self.blocks[index].role;
        let old_type = self.blocks[index].block_type.clone();
        if old_role == role && old_type == block_type {
            return;
        }
        self.blocks[index].role = role;
        self.blocks[index].block_type = block_type.clone();
        self.history.record_edit(
            id.clone(),
            EditType::Role,
            fields([
                ("role", Some(old_role.as_str().to_string())),
                ("blockType", old_type),
            ]),
            fields([
                ("role", Some(role.as_str().to_string())),
                ("blockType", block_type),
            ]),
        );
        self.save();
    }

    /// Bulk role-only change. Display types are untouched.
    pub fn set_blocks_role(&mut self, ids: &[BlockId], role: Role) {
        for block in &mut self.blocks {
            if ids.contains(&block.id) {
                block.role = role;
            }
        }
        self.save();
    }

    /// Assign a display type to several blocks, resolving built-in role
    /// strings per block: a built-in becomes the new role and clears any
    /// custom type; a custom type changes display identity only.
    pub fn set_blocks_type(&mut self, ids: &[BlockId], type_id: &str) {
        for block in &mut self.blocks {
            if ids.contains(&block.id) {
                let selection = resolve_type_selection(type_id, block.role);
                block.role = selection.role;
                block.block_type = selection.block_type;
            }
        }
        self.save();
    }

    /// Select which precomputed compression version is active. The
    /// versions themselves are untouched.
    pub fn set_compression_level(&mut self, id: &BlockId, level: CompressionLevel) {
        let Some(index) = self.get_block_index(id) else { return };
        let old_level = self.blocks[index].compression_level;
        if old_level == level {
            return;
        }
        self.blocks[index].compression_level = level;
        self.history.record_edit(
            id.clone(),
            EditType::Compression,
            field("compressionLevel", Some(old_level.as_str().to_string())),
            field("compressionLevel", Some(level.as_str().to_string())),
        );
        self.save();
    }

    /// Pin a block top or bottom within its zone, or unpin it.
    pub fn pin_block(&mut self, id: &BlockId, position: Option<PinPosition>) {
        let Some(index) = self.get_block_index(id) else { return };
        let old_position = self.blocks[index].pinned;
        if old_position == position {
            return;
        }
        self.blocks[index].pinned = position;
        self.history.record_edit(
            id.clone(),
            EditType::Pin,
            field("pinned", old_position.map(|p| p.as_str().to_string())),
            field("pinned", position.map(|p| p.as_str().to_string())),
        );
        self.save();
    }

    /// Set a block's usage heat, clamped to [0, 1].
    pub fn update_block_heat(&mut self, id: &BlockId, heat: f64) {
        let Some(index) = self.get_block_index(id) else { return };
        self.blocks[index].usage_heat = tansu_types::clamp_score(heat);
        self.save();
    }

    /// Move all blocks out of one zone into another, e.g. before the
    /// source zone is deleted.
    pub fn migrate_zone(&mut self, from: &ZoneId, to: &ZoneId) {
        for block in &mut self.blocks {
            if &block.zone == from {
                block.zone = to.clone();
            }
        }
        self.save();
    }

    // ── Reordering ──────────────────────────────────────────────────────

    /// Splice a block to a new index in the global list.
    pub fn reorder_block(&mut self, id: &BlockId, new_index: usize) {
        let Some(current) = self.get_block_index(id) else { return };
        let block = self.blocks.remove(current);
        let new_index = new_index.min(self.blocks.len());
        self.blocks.insert(new_index, block);
        self.save();
    }

    /// Reorder blocks within one zone's pin-sorted order.
    ///
    /// The whole operation is rejected if any moved block is pinned.
    /// The insertion index is clamped into the legal window between the
    /// staying pinned-top prefix and pinned-bottom suffix, then the moved
    /// blocks are spliced in as a group.
    pub fn reorder_blocks_in_zone(&mut self, zone: &ZoneId, ids: &[BlockId], insert_index: usize) {
        let zone_blocks: Vec<&Block> =
            sort_with_pins(self.blocks.iter().filter(|b| &b.zone == zone).collect());

        if zone_blocks
            .iter()
            .any(|b| ids.contains(&b.id) && b.pinned.is_some())
        {
            return;
        }

        let moving: Vec<Block> = zone_blocks
            .iter()
            .filter(|b| ids.contains(&b.id))
            .map(|b| (*b).clone())
            .collect();
        let mut staying: Vec<Block> = zone_blocks
            .iter()
            .filter(|b| !ids.contains(&b.id))
            .map(|b| (*b).clone())
            .collect();

        let pinned_top = staying
            .iter()
            .filter(|b| b.pinned == Some(PinPosition::Top))
            .count();
        let pinned_bottom = staying
            .iter()
            .filter(|b| b.pinned == Some(PinPosition::Bottom))
            .count();
        let clamped = insert_index.clamp(pinned_top, staying.len() - pinned_bottom);
        staying.splice(clamped..clamped, moving);

        let mut reassembled: Vec<Block> = self
            .blocks
            .iter()
            .filter(|b| &b.zone != zone)
            .cloned()
            .collect();
        reassembled.extend(staying);
        self.blocks = reassembled;
        self.save();
    }

    /// The legal insertion window for a drop into a zone.
    pub fn get_valid_drop_range(&self, zone: &ZoneId) -> DropRange {
        let zone_blocks: Vec<&Block> = self.blocks.iter().filter(|b| &b.zone == zone).collect();
        let pinned_top = zone_blocks
            .iter()
            .filter(|b| b.pinned == Some(PinPosition::Top))
            .count();
        let pinned_bottom = zone_blocks
            .iter()
            .filter(|b| b.pinned == Some(PinPosition::Bottom))
            .count();
        DropRange {
            min: pinned_top,
            max: zone_blocks.len() - pinned_bottom,
        }
    }

    // ── Undo / redo ─────────────────────────────────────────────────────

    /// Undo the most recent recorded edit by applying its `before`
    /// fields. Tolerates entries whose block no longer exists.
    pub fn undo(&mut self) -> bool {
        let Some(entry) = self.history.pop_undo() else {
            return false;
        };
        let fields = entry.before.clone();
        self.apply_edit_fields(&entry.block_id, &fields);
        true
    }

    /// Redo the most recently undone edit by applying its `after` fields.
    pub fn redo(&mut self) -> bool {
        let Some(entry) = self.history.pop_redo() else {
            return false;
        };
        let fields = entry.after.clone();
        self.apply_edit_fields(&entry.block_id, &fields);
        true
    }

    fn apply_edit_fields(&mut self, id: &BlockId, fields: &EditFields) {
        let Some(index) = self.get_block_index(id) else {
            tracing::warn!(block_id = %id, "skipping edit replay for missing block");
            return;
        };
        for (key, value) in fields {
            match (key.as_str(), value) {
                ("content", Some(content)) => {
                    let tokens = self.estimator.estimate(content);
                    let block = &mut self.blocks[index];
                    block.content = content.clone();
                    block.tokens = tokens;
                    block.compressed_versions.original = CompressionVersion {
                        content: content.clone(),
                        tokens,
                    };
                }
                ("zone", Some(zone)) => self.blocks[index].zone = ZoneId::from(zone.clone()),
                ("compressionLevel", Some(level)) => {
                    if let Some(level) = CompressionLevel::from_str(level) {
                        self.blocks[index].compression_level = level;
                    }
                }
                ("role", Some(role)) => {
                    if let Some(role) = Role::from_str(role) {
                        self.blocks[index].role = role;
                    }
                }
                ("blockType", value) => self.blocks[index].block_type = value.clone(),
                ("pinned", value) => {
                    self.blocks[index].pinned = value.as_deref().and_then(PinPosition::from_str);
                }
                _ => {}
            }
        }
        self.save();
    }

    // ── Snapshot branches ───────────────────────────────────────────────

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn active_snapshot_id(&self) -> Option<&SnapshotId> {
        self.active_snapshot_id.as_ref()
    }

    pub fn get_snapshot(&self, id: &SnapshotId) -> Option<&Snapshot> {
        self.snapshots.iter().find(|s| &s.id == id)
    }

    /// Capture the live state as a named snapshot. The new snapshot's
    /// parent is whatever branch is currently checked out.
    pub fn save_snapshot(&mut self, name: &str, zones: &ZoneRegistry) -> SnapshotId {
        let snapshot = Snapshot::capture(
            name,
            self.blocks.clone(),
            zones.layout(),
            self.active_snapshot_id.clone(),
        );
        let id = snapshot.id.clone();
        self.snapshots.push(snapshot);
        self.save();
        id
    }

    /// Check out a named snapshot. Returns false if the ID is unknown.
    pub fn switch_to_snapshot(&mut self, id: &SnapshotId, zones: &mut ZoneRegistry) -> bool {
        let Some(target_index) = self.snapshots.iter().position(|s| &s.id == id) else {
            return false;
        };
        self.write_back_live_state(zones);

        let target = &self.snapshots[target_index];
        self.blocks = target.blocks.clone();
        if let Some(layout) = target.zone_state.clone() {
            zones.restore_layout(&layout);
        }
        self.active_snapshot_id = Some(id.clone());
        self.save();
        true
    }

    /// Alias for [`ContextStore::switch_to_snapshot`].
    pub fn restore_snapshot(&mut self, id: &SnapshotId, zones: &mut ZoneRegistry) -> bool {
        self.switch_to_snapshot(id, zones)
    }

    /// Check out the working state. No-op when it is already live.
    pub fn switch_to_working_state(&mut self, zones: &mut ZoneRegistry) {
        if self.active_snapshot_id.is_none() {
            return;
        }
        self.write_back_live_state(zones);
        if let Some(cached) = self.working_state_cache.take() {
            self.blocks = cached.blocks;
            zones.restore_layout(&cached.zone_state);
        }
        self.active_snapshot_id = None;
        self.save();
    }

    /// Delete a snapshot. If it is the active branch, switch to the
    /// working state first so the live edits survive.
    pub fn delete_snapshot(&mut self, id: &SnapshotId, zones: &mut ZoneRegistry) {
        if self.active_snapshot_id.as_ref() == Some(id) {
            self.switch_to_working_state(zones);
        }
        self.snapshots.retain(|s| &s.id != id);
        self.save();
    }

    /// Write the live blocks and zone layout back to the branch they
    /// belong to: the active snapshot, or the working-state cache.
    fn write_back_live_state(&mut self, zones: &ZoneRegistry) {
        match &self.active_snapshot_id {
            Some(active) => {
                if let Some(snapshot) = self.snapshots.iter_mut().find(|s| s.id == *active) {
                    snapshot.blocks = self.blocks.clone();
                    snapshot.zone_state = Some(zones.layout());
                    snapshot.total_tokens =
                        snapshot.blocks.iter().map(|b| u64::from(b.tokens)).sum();
                }
            }
            None => {
                self.working_state_cache = Some(WorkingState {
                    blocks: self.blocks.clone(),
                    zone_state: zones.layout(),
                });
            }
        }
    }

    // ── Persistence plumbing ────────────────────────────────────────────

    /// Drive the history ledger's debounced save.
    pub fn tick(&mut self) {
        self.history.tick();
    }

    /// Flush all pending debounced writes, e.g. on shutdown.
    pub fn flush_pending_writes(&mut self) {
        self.history.flush_pending_writes();
    }
}

/// Pin-sorted order: pinned-top prefix, unpinned middle, pinned-bottom
/// suffix. Stable within each group.
fn sort_with_pins(zone_blocks: Vec<&Block>) -> Vec<&Block> {
    let mut sorted = Vec::with_capacity(zone_blocks.len());
    sorted.extend(
        zone_blocks
            .iter()
            .copied()
            .filter(|b| b.pinned == Some(PinPosition::Top)),
    );
    sorted.extend(zone_blocks.iter().copied().filter(|b| b.pinned.is_none()));
    sorted.extend(
        zone_blocks
            .iter()
            .copied()
            .filter(|b| b.pinned == Some(PinPosition::Bottom)),
    );
    sorted
}

fn field(name: &str, value: Option<String>) -> EditFields {
    tansu_types::edit_fields([(name, value)])
}

fn fields<const N: usize>(pairs: [(&str, Option<String>); N]) -> EditFields {
    tansu_types::edit_fields(pairs)
}

// ============================================================================
// Tests
// ============================================================================
