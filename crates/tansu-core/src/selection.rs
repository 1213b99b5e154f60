//! Block selection: single, toggle, and anchored range selection.
//!
//! Purely session-local state; nothing here is persisted. Methods take
//! the store by reference so the manager never holds stale block data.

use indexmap::IndexSet;
use tansu_types::{Block, BlockId, Role, ZoneId};

use crate::store::ContextStore;

/// Keyboard modifiers active during a block click.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClickModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
}

/// Selection state over the store's block list.
#[derive(Default)]
pub struct SelectionManager {
    selected: IndexSet<BlockId>,
    /// Anchor for range selection: global index of the last explicitly
    /// selected or toggled block.
    last_selected_index: Option<usize>,
    focused: Option<BlockId>,
}

impl SelectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Views ───────────────────────────────────────────────────────────

    pub fn is_selected(&self, id: &BlockId) -> bool {
        self.selected.contains(id)
    }

    pub fn has_selection(&self) -> bool {
        !self.selected.is_empty()
    }

    pub fn count(&self) -> usize {
        self.selected.len()
    }

    pub fn selected_ids(&self) -> impl Iterator<Item = &BlockId> {
        self.selected.iter()
    }

    pub fn focused_id(&self) -> Option<&BlockId> {
        self.focused.as_ref()
    }

    /// Selected blocks in global list order.
    pub fn selected_blocks<'a>(&self, store: &'a ContextStore) -> Vec<&'a Block> {
        store
            .blocks()
            .iter()
            .filter(|b| self.selected.contains(&b.id))
            .collect()
    }

    /// Total tokens across the selection.
    pub fn selected_tokens(&self, store: &ContextStore) -> u64 {
        self.selected_blocks(store)
            .iter()
            .map(|b| u64::from(b.tokens))
            .sum()
    }

    // ── Actions ─────────────────────────────────────────────────────────

    /// Replace the selection with a single block and move the anchor.
    pub fn select(&mut self, store: &ContextStore, id: &BlockId) {
        self.selected.clear();
        self.selected.insert(id.clone());
        self.last_selected_index = store.get_block_index(id);
    }

    /// Toggle one block's membership and move the anchor.
    pub fn toggle(&mut self, store: &ContextStore, id: &BlockId) {
        if !self.selected.shift_remove(id) {
            self.selected.insert(id.clone());
        }
        self.last_selected_index = store.get_block_index(id);
    }

    /// Add the global-order range between the anchor and the target to
    /// the selection. Without an anchor this degrades to [`select`].
    ///
    /// [`select`]: SelectionManager::select
    pub fn range_select(&mut self, store: &ContextStore, id: &BlockId) {
        let Some(anchor) = self.last_selected_index else {
            self.select(store, id);
            return;
        };
        let Some(target) = store.get_block_index(id) else { return };

        // The anchor may be stale after removals shrank the list.
        let anchor = anchor.min(store.blocks().len() - 1);
        let (start, end) = (anchor.min(target), anchor.max(target));
        for block in &store.blocks()[start..=end] {
            self.selected.insert(block.id.clone());
        }
    }

    pub fn select_all(&mut self, store: &ContextStore) {
        self.selected = store.blocks().iter().map(|b| b.id.clone()).collect();
    }

    /// Select every block in a zone, anchoring on the zone's first block.
    pub fn select_zone(&mut self, store: &ContextStore, zone: &ZoneId) {
        let by_zone = store.blocks_by_zone();
        let zone_blocks = by_zone.get(zone).map(Vec::as_slice).unwrap_or(&[]);
        self.selected = zone_blocks.iter().map(|b| b.id.clone()).collect();
        self.last_selected_index = zone_blocks
            .first()
            .and_then(|b| store.get_block_index(&b.id));
    }

    /// Select every block whose display identity matches a type id.
    pub fn select_by_type(&mut self, store: &ContextStore, type_id: &str) {
        let matching: Vec<&Block> = store
            .blocks()
            .iter()
            .filter(|b| b.matches_display_type(type_id))
            .collect();
        self.selected = matching.iter().map(|b| b.id.clone()).collect();
        self.last_selected_index = matching
            .first()
            .and_then(|b| store.get_block_index(&b.id));
    }

    /// Alias of [`select_by_type`] for role strings.
    ///
    /// [`select_by_type`]: SelectionManager::select_by_type
    pub fn select_by_role(&mut self, store: &ContextStore, role: Role) {
        self.select_by_type(store, role.as_str());
    }

    /// Clear the selection, anchor, and focus.
    pub fn deselect(&mut self) {
        self.selected.clear();
        self.last_selected_index = None;
        self.focused = None;
    }

    /// Focus a block for keyboard navigation; also single-selects it.
    pub fn focus(&mut self, store: &ContextStore, id: &BlockId) {
        self.select(store, id);
        self.focused = Some(id.clone());
    }

    /// Dispatch a click: shift extends a range, ctrl/meta toggles,
    /// otherwise single-select.
    pub fn handle_click(&mut self, store: &ContextStore, id: &BlockId, modifiers: ClickModifiers) {
        if modifiers.shift {
            self.range_select(store, id);
        } else if modifiers.ctrl || modifiers.meta {
            self.toggle(store, id);
        } else {
            self.select(store, id);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
