//! State engine for Tansu: blocks, zones, snapshots, and search.
//!
//! The engine is a set of plain structs constructed at startup and
//! threaded by reference — no globals. `ContextStore` owns the block
//! list, the snapshot branches, and the edit ledger; `ZoneRegistry` and
//! `BlockTypeRegistry` own their catalogs; `SelectionManager` and
//! `SearchEngine` are session-local views over the store.
//!
//! # Persistence
//!
//! Everything durable serializes to JSON records behind the [`Storage`]
//! trait. Loads are permissive: missing or corrupt records degrade to a
//! fresh start with a warning, never an error. Store mutations persist
//! synchronously; the edit ledger and search recompute are debounced
//! behind an injected [`Clock`], so tests drive time explicitly.
//!
//! # Branches
//!
//! Snapshots are full copies of the block list plus the zone layout.
//! Checking one out parks the working state in a cache; edits made on a
//! checked-out snapshot are written back to it when switching away. At
//! most one of {working state, named snapshot} is ever live.

mod block_types;
mod clock;
mod estimate;
mod history;
mod search;
mod selection;
mod storage;
mod store;
mod zones;

pub use block_types::{BlockTypeRegistry, BlockTypeUpdate};
pub use clock::{system_clock, Clock, ClockHandle, Debounce, ManualClock, SystemClock};
pub use estimate::{CharEstimator, TokenEstimator};
pub use history::{EditHistory, SAVE_DEBOUNCE_MS};
pub use search::{SearchEngine, SearchMatch, SEARCH_DEBOUNCE_MS};
pub use selection::{ClickModifiers, SelectionManager};
pub use storage::{
    memory_storage, MemoryStorage, Storage, StorageError, StorageHandle, BLOCK_TYPES_KEY,
    CONTEXT_KEY, EDIT_HISTORY_KEY, ZONES_KEY,
};
pub use store::{ContextStore, DropRange};
pub use zones::{ZoneRegistry, ZoneUpdate, DEFAULT_ZONE_HEIGHT, MIN_ZONE_HEIGHT};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tansu_types::{PinPosition, Role, ZoneId};

    /// Full walk through an editing session: create, pin, reorder,
    /// branch, search, select.
    #[test]
    fn test_editing_session_end_to_end() {
        let clock = ManualClock::new();
        let storage = memory_storage();
        let mut zones = ZoneRegistry::with_storage(storage.clone());
        let mut store = ContextStore::with_storage(storage.clone(), Arc::clone(&clock) as ClockHandle);
        let mut selection = SelectionManager::new();
        let mut search = SearchEngine::new(Arc::clone(&clock) as ClockHandle);

        // Build a small document.
        let sys = store.create_block(ZoneId::primacy(), Role::System, "You are terse.", None);
        store.create_block(ZoneId::middle(), Role::User, "What is a zone?", None);
        let a = store.create_block(
            ZoneId::middle(),
            Role::Assistant,
            "A named region of the context.",
            None,
        );
        store.pin_block(&sys, Some(PinPosition::Top));

        // Budget covers every block.
        let budget = store.token_budget();
        assert_eq!(
            budget.used,
            store.blocks().iter().map(|b| u64::from(b.tokens)).sum::<u64>()
        );

        // Branch off, edit, come back.
        let snap = store.save_snapshot("before rewrite", &zones);
        store.update_block_content(&a, "A zone is a slot in the assembly order.");
        store.switch_to_snapshot(&snap, &mut zones);
        assert_eq!(
            store.get_block(&a).unwrap().content,
            "A named region of the context."
        );
        store.switch_to_working_state(&mut zones);
        assert_eq!(
            store.get_block(&a).unwrap().content,
            "A zone is a slot in the assembly order."
        );

        // Search lands on the edited block.
        search.set_query("assembly");
        clock.advance(SEARCH_DEBOUNCE_MS);
        search.tick(&store);
        assert_eq!(search.select_all_results(), vec![a.clone()]);

        // Select the results and sum their tokens.
        for id in search.select_all_results() {
            selection.toggle(&store, &id);
        }
        assert_eq!(
            selection.selected_tokens(&store),
            u64::from(store.get_block(&a).unwrap().tokens)
        );

        // Ledger saw the content edit; flush it to storage.
        assert_eq!(store.history().block_history(&a).len(), 1);
        store.flush_pending_writes();
        assert!(storage.lock().unwrap().get(EDIT_HISTORY_KEY).is_some());
    }

    /// Custom zones travel with snapshots across branch switches.
    #[test]
    fn test_zone_layout_follows_branches() {
        let mut zones = ZoneRegistry::new();
        let mut store = ContextStore::new();
        store.create_block(ZoneId::middle(), Role::User, "base", None);

        let plain = store.save_snapshot("plain", &zones);
        let scratch = zones.add_custom_zone("Scratch", "#345");
        store.create_block(scratch.clone(), Role::User, "notes", None);
        let with_scratch = store.save_snapshot("with scratch", &zones);

        store.switch_to_snapshot(&plain, &mut zones);
        assert!(zones.zone_by_id(&scratch).is_none());

        store.switch_to_snapshot(&with_scratch, &mut zones);
        assert!(zones.zone_by_id(&scratch).is_some());
        let by_zone = store.blocks_by_zone();
        assert_eq!(by_zone[&scratch].len(), 1);
    }

    /// Assigning a built-in type via bulk type change rewrites the role
    /// and clears the custom display type.
    #[test]
    fn test_bulk_type_change_resolution() {
        let mut store = ContextStore::new();
        let id = store.create_block(ZoneId::middle(), Role::User, "x", Some("custom-x".into()));
        store.set_blocks_type(std::slice::from_ref(&id), "assistant");
        let block = store.get_block(&id).unwrap();
        assert_eq!(block.role, Role::Assistant);
        assert_eq!(block.block_type, None);
        assert_eq!(block.display_type_id(), "assistant");
    }
}
