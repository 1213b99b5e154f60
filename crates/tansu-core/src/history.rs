//! Per-block edit history with undo/redo stacks.
//!
//! Each recorded edit lands in two places: the per-block history list
//! (newest first, capped at [`MAX_ENTRIES_PER_BLOCK`]) and the global
//! undo stack. Recording always clears the redo stack.
//!
//! Only the per-block history is persisted; undo/redo stacks are
//! session-local. Writes are debounced so an editing burst produces one
//! storage write, driven by [`EditHistory::tick`] / `flush_pending_writes`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tansu_types::{BlockId, EditEntry, EditFields, EditType, MAX_ENTRIES_PER_BLOCK};

use crate::clock::{system_clock, ClockHandle, Debounce};
use crate::storage::{load_record, save_record, StorageHandle, EDIT_HISTORY_KEY};

/// Debounce window for history persistence, in milliseconds.
pub const SAVE_DEBOUNCE_MS: u64 = 1500;

#[derive(Serialize, Deserialize)]
struct HistoryRecord {
    history: IndexMap<BlockId, Vec<EditEntry>>,
}

/// The edit ledger.
pub struct EditHistory {
    history: IndexMap<BlockId, Vec<EditEntry>>,
    undo_stack: Vec<EditEntry>,
    redo_stack: Vec<EditEntry>,
    storage: Option<StorageHandle>,
    clock: ClockHandle,
    save_debounce: Debounce,
    dirty: bool,
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new(system_clock())
    }
}

impl EditHistory {
    pub fn new(clock: ClockHandle) -> Self {
        Self {
            history: IndexMap::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            storage: None,
            clock,
            save_debounce: Debounce::new(SAVE_DEBOUNCE_MS),
            dirty: false,
        }
    }

    /// Create a ledger backed by storage, loading persisted history.
    /// Undo/redo stacks always start empty.
    pub fn with_storage(storage: StorageHandle, clock: ClockHandle) -> Self {
        let mut ledger = Self::new(clock);
        if let Some(record) = load_record::<HistoryRecord>(&storage, EDIT_HISTORY_KEY) {
            ledger.history = record.history;
        }
        ledger.storage = Some(storage);
        ledger
    }

    fn save(&self) {
        let Some(storage) = &self.storage else { return };
        let record = HistoryRecord {
            history: self.history.clone(),
        };
        save_record(storage, EDIT_HISTORY_KEY, &record);
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.save_debounce.schedule(self.clock.now_ms());
    }

    /// Record one edit: prepend to the block's history (capped), push to
    /// the undo stack, clear the redo stack.
    pub fn record_edit(
        &mut self,
        block_id: BlockId,
        kind: EditType,
        before: EditFields,
        after: EditFields,
    ) {
        let entry = EditEntry::new(block_id.clone(), kind, before, after);
        let entries = self.history.entry(block_id).or_default();
        entries.insert(0, entry.clone());
        entries.truncate(MAX_ENTRIES_PER_BLOCK);

        self.undo_stack.push(entry);
        self.redo_stack.clear();
        self.mark_dirty();
    }

    /// A block's history, newest first.
    pub fn block_history(&self, block_id: &BlockId) -> &[EditEntry] {
        self.history.get(block_id).map_or(&[], Vec::as_slice)
    }

    /// Drop all history for a block (e.g. when it is deleted).
    pub fn clear_block_history(&mut self, block_id: &BlockId) {
        if self.history.shift_remove(block_id).is_some() {
            self.mark_dirty();
        }
    }

    /// Pop the most recent edit for undoing. The entry moves to the redo
    /// stack; the caller applies the `before` fields.
    pub fn pop_undo(&mut self) -> Option<EditEntry> {
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(entry.clone());
        Some(entry)
    }

    /// Pop the most recently undone edit for redoing. The entry moves
    /// back to the undo stack; the caller applies the `after` fields.
    pub fn pop_redo(&mut self) -> Option<EditEntry> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push(entry.clone());
        Some(entry)
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    /// Run the debounced save if its window has elapsed.
    pub fn tick(&mut self) {
        if self.save_debounce.fire_if_due(self.clock.now_ms()) && self.dirty {
            self.save();
            self.dirty = false;
        }
    }

    /// Force any pending save through immediately, e.g. on shutdown.
    pub fn flush_pending_writes(&mut self) {
        self.save_debounce.cancel_pending();
        if self.dirty {
            self.save();
            self.dirty = false;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::memory_storage;
    use std::sync::Arc;
    use tansu_types::edit_fields;

    fn content_edit(n: u32) -> (EditFields, EditFields) {
        (
            edit_fields([("content", Some(format!("v{}", n)))]),
            edit_fields([("content", Some(format!("v{}", n + 1)))]),
        )
    }

    #[test]
    fn test_record_edit_newest_first() {
        let mut ledger = EditHistory::default();
        let id = BlockId::from("block-1");
        for n in 0..3 {
            let (before, after) = content_edit(n);
            ledger.record_edit(id.clone(), EditType::Content, before, after);
        }
        let entries = ledger.block_history(&id);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].after["content"], Some("v3".to_string()));
        assert_eq!(entries[2].after["content"], Some("v1".to_string()));
    }

    #[test]
    fn test_history_capped_per_block() {
        let mut ledger = EditHistory::default();
        let id = BlockId::from("block-1");
        for n in 0..60 {
            let (before, after) = content_edit(n);
            ledger.record_edit(id.clone(), EditType::Content, before, after);
        }
        let entries = ledger.block_history(&id);
        assert_eq!(entries.len(), MAX_ENTRIES_PER_BLOCK);
        // Oldest entries fell off; newest survives.
        assert_eq!(entries[0].after["content"], Some("v60".to_string()));
        assert_eq!(
            entries.last().unwrap().after["content"],
            Some("v11".to_string())
        );
    }

    #[test]
    fn test_undo_redo_traversal() {
        let mut ledger = EditHistory::default();
        let id = BlockId::from("block-1");
        let (b1, a1) = content_edit(1);
        let (b2, a2) = content_edit(2);
        ledger.record_edit(id.clone(), EditType::Content, b1, a1);
        ledger.record_edit(id.clone(), EditType::Content, b2, a2);

        let undone = ledger.pop_undo().unwrap();
        assert_eq!(undone.before["content"], Some("v2".to_string()));
        assert_eq!(ledger.undo_depth(), 1);
        assert_eq!(ledger.redo_depth(), 1);

        let redone = ledger.pop_redo().unwrap();
        assert_eq!(redone.id, undone.id);
        assert_eq!(ledger.undo_depth(), 2);
        assert_eq!(ledger.redo_depth(), 0);
    }

    #[test]
    fn test_recording_clears_redo() {
        let mut ledger = EditHistory::default();
        let id = BlockId::from("block-1");
        let (b1, a1) = content_edit(1);
        ledger.record_edit(id.clone(), EditType::Content, b1, a1);
        ledger.pop_undo();
        assert_eq!(ledger.redo_depth(), 1);

        let (b2, a2) = content_edit(2);
        ledger.record_edit(id.clone(), EditType::Content, b2, a2);
        assert_eq!(ledger.redo_depth(), 0);
    }

    #[test]
    fn test_pop_on_empty_stacks() {
        let mut ledger = EditHistory::default();
        assert!(ledger.pop_undo().is_none());
        assert!(ledger.pop_redo().is_none());
    }

    #[test]
    fn test_clear_block_history() {
        let mut ledger = EditHistory::default();
        let id = BlockId::from("block-1");
        let (before, after) = content_edit(1);
        ledger.record_edit(id.clone(), EditType::Content, before, after);
        ledger.clear_block_history(&id);
        assert!(ledger.block_history(&id).is_empty());
    }

    // ── Debounced persistence ───────────────────────────────────────────

    #[test]
    fn test_save_waits_for_debounce_window() {
        let clock = ManualClock::new();
        let storage = memory_storage();
        let mut ledger =
            EditHistory::with_storage(storage.clone(), Arc::clone(&clock) as ClockHandle);

        let (before, after) = content_edit(1);
        ledger.record_edit(BlockId::from("block-1"), EditType::Content, before, after);
        ledger.tick();
        assert!(storage.lock().unwrap().get(EDIT_HISTORY_KEY).is_none());

        clock.advance(SAVE_DEBOUNCE_MS);
        ledger.tick();
        assert!(storage.lock().unwrap().get(EDIT_HISTORY_KEY).is_some());
    }

    #[test]
    fn test_burst_coalesces_into_one_deadline() {
        let clock = ManualClock::new();
        let storage = memory_storage();
        let mut ledger =
            EditHistory::with_storage(storage.clone(), Arc::clone(&clock) as ClockHandle);

        let id = BlockId::from("block-1");
        for n in 0..4 {
            let (before, after) = content_edit(n);
            ledger.record_edit(id.clone(), EditType::Content, before, after);
            clock.advance(500); // keep re-arming the window
            ledger.tick();
            assert!(storage.lock().unwrap().get(EDIT_HISTORY_KEY).is_none());
        }
        clock.advance(SAVE_DEBOUNCE_MS);
        ledger.tick();
        assert!(storage.lock().unwrap().get(EDIT_HISTORY_KEY).is_some());
    }

    #[test]
    fn test_flush_forces_pending_write() {
        let clock = ManualClock::new();
        let storage = memory_storage();
        let mut ledger =
            EditHistory::with_storage(storage.clone(), Arc::clone(&clock) as ClockHandle);

        let (before, after) = content_edit(1);
        ledger.record_edit(BlockId::from("block-1"), EditType::Content, before, after);
        ledger.flush_pending_writes();
        assert!(storage.lock().unwrap().get(EDIT_HISTORY_KEY).is_some());
    }

    #[test]
    fn test_undo_stacks_not_persisted() {
        let clock = ManualClock::new();
        let storage = memory_storage();
        {
            let mut ledger =
                EditHistory::with_storage(storage.clone(), Arc::clone(&clock) as ClockHandle);
            let (before, after) = content_edit(1);
            ledger.record_edit(BlockId::from("block-1"), EditType::Content, before, after);
            ledger.flush_pending_writes();
        }
        let mut reloaded = EditHistory::with_storage(storage, Arc::clone(&clock) as ClockHandle);
        assert_eq!(reloaded.block_history(&BlockId::from("block-1")).len(), 1);
        assert!(reloaded.pop_undo().is_none());
        assert!(reloaded.pop_redo().is_none());
    }
}
