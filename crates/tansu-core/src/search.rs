//! Content search across the block list.
//!
//! Queries are literal by default (regex-escaped); regex mode hands the
//! pattern to the engine directly, and an invalid pattern simply yields
//! zero matches. Recomputation is debounced behind the injected clock so
//! keystroke bursts cost one scan.
//!
//! Match positions are character offsets into the block's content.

use indexmap::IndexSet;
use regex::RegexBuilder;
use tansu_types::{BlockId, ZoneId};

use crate::clock::{system_clock, ClockHandle, Debounce};
use crate::store::ContextStore;

/// Debounce window for recomputing matches, in milliseconds.
pub const SEARCH_DEBOUNCE_MS: u64 = 250;

/// One match within one block's content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchMatch {
    pub block_id: BlockId,
    /// Which match within this block, 0-based.
    pub match_index: usize,
    /// Start offset in characters.
    pub start_pos: usize,
    /// End offset in characters (exclusive).
    pub end_pos: usize,
}

/// Search state: query, flags, filters, matches, and cursor.
pub struct SearchEngine {
    open: bool,
    query: String,
    case_sensitive: bool,
    use_regex: bool,
    filter_zones: IndexSet<ZoneId>,
    filter_block_types: IndexSet<String>,
    matches: Vec<SearchMatch>,
    current_match_index: usize,
    filters_expanded: bool,
    clock: ClockHandle,
    debounce: Debounce,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(system_clock())
    }
}

impl SearchEngine {
    pub fn new(clock: ClockHandle) -> Self {
        Self {
            open: false,
            query: String::new(),
            case_sensitive: false,
            use_regex: false,
            filter_zones: IndexSet::new(),
            filter_block_types: IndexSet::new(),
            matches: Vec::new(),
            current_match_index: 0,
            filters_expanded: false,
            clock,
            debounce: Debounce::new(SEARCH_DEBOUNCE_MS),
        }
    }

    // ── Views ───────────────────────────────────────────────────────────

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn use_regex(&self) -> bool {
        self.use_regex
    }

    pub fn filters_expanded(&self) -> bool {
        self.filters_expanded
    }

    pub fn filter_zones(&self) -> impl Iterator<Item = &ZoneId> {
        self.filter_zones.iter()
    }

    pub fn filter_block_types(&self) -> impl Iterator<Item = &String> {
        self.filter_block_types.iter()
    }

    pub fn matches(&self) -> &[SearchMatch] {
        &self.matches
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn has_matches(&self) -> bool {
        !self.matches.is_empty()
    }

    pub fn current_match(&self) -> Option<&SearchMatch> {
        self.matches.get(self.current_match_index)
    }

    pub fn current_match_index(&self) -> usize {
        self.current_match_index
    }

    /// All matches within one block.
    pub fn block_matches(&self, block_id: &BlockId) -> Vec<&SearchMatch> {
        self.matches
            .iter()
            .filter(|m| &m.block_id == block_id)
            .collect()
    }

    pub fn is_current_match_block(&self, block_id: &BlockId) -> bool {
        self.current_match()
            .is_some_and(|m| &m.block_id == block_id)
    }

    /// The current match, if it lies in the given block.
    pub fn current_match_for_block(&self, block_id: &BlockId) -> Option<&SearchMatch> {
        self.current_match().filter(|m| &m.block_id == block_id)
    }

    /// Unique matched block IDs in first-seen order, for selection.
    pub fn select_all_results(&self) -> Vec<BlockId> {
        let mut ids = IndexSet::new();
        for m in &self.matches {
            ids.insert(m.block_id.clone());
        }
        ids.into_iter().collect()
    }

    // ── Open / close ────────────────────────────────────────────────────

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Close the panel. The query, matches, and filter-panel expansion
    /// reset; the case/regex flags and the filters themselves persist.
    pub fn close(&mut self) {
        self.open = false;
        self.query.clear();
        self.matches.clear();
        self.current_match_index = 0;
        self.filters_expanded = false;
        self.debounce.cancel_pending();
    }

    pub fn toggle(&mut self) {
        if self.open {
            self.close();
        } else {
            self.open();
        }
    }

    // ── Parameter setters (debounced recompute) ─────────────────────────

    pub fn set_query(&mut self, query: &str) {
        self.query = query.to_string();
        self.schedule();
    }

    pub fn toggle_case_sensitive(&mut self) {
        self.case_sensitive = !self.case_sensitive;
        self.schedule();
    }

    pub fn toggle_use_regex(&mut self) {
        self.use_regex = !self.use_regex;
        self.schedule();
    }

    pub fn toggle_filters_expanded(&mut self) {
        self.filters_expanded = !self.filters_expanded;
    }

    pub fn add_zone_filter(&mut self, zone: ZoneId) {
        if self.filter_zones.insert(zone) {
            self.schedule();
        }
    }

    pub fn remove_zone_filter(&mut self, zone: &ZoneId) {
        if self.filter_zones.shift_remove(zone) {
            self.schedule();
        }
    }

    pub fn add_block_type_filter(&mut self, type_id: impl Into<String>) {
        if self.filter_block_types.insert(type_id.into()) {
            self.schedule();
        }
    }

    pub fn remove_block_type_filter(&mut self, type_id: &str) {
        if self.filter_block_types.shift_remove(type_id) {
            self.schedule();
        }
    }

    pub fn clear_filters(&mut self) {
        self.filter_zones.clear();
        self.filter_block_types.clear();
        self.schedule();
    }

    fn schedule(&mut self) {
        self.debounce.schedule(self.clock.now_ms());
    }

    // ── Navigation ──────────────────────────────────────────────────────

    /// Advance the cursor, wrapping past the last match.
    pub fn next_match(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        self.current_match_index = (self.current_match_index + 1) % self.matches.len();
    }

    /// Step the cursor back, wrapping before the first match.
    pub fn previous_match(&mut self) {
        if self.matches.is_empty() {
            return;
        }
        self.current_match_index =
            (self.current_match_index + self.matches.len() - 1) % self.matches.len();
    }

    // ── Recompute ───────────────────────────────────────────────────────

    /// Run the debounced recompute if its window has elapsed.
    pub fn tick(&mut self, store: &ContextStore) {
        if self.debounce.fire_if_due(self.clock.now_ms()) {
            self.perform_search(store);
        }
    }

    /// Force any pending recompute through immediately.
    pub fn flush(&mut self, store: &ContextStore) {
        if self.debounce.flush() {
            self.perform_search(store);
        }
    }

    fn perform_search(&mut self, store: &ContextStore) {
        if self.query.trim().is_empty() {
            self.matches.clear();
            self.current_match_index = 0;
            return;
        }

        let pattern = if self.use_regex {
            self.query.clone()
        } else {
            regex::escape(&self.query)
        };
        let regex = match RegexBuilder::new(&pattern)
            .case_insensitive(!self.case_sensitive)
            .build()
        {
            Ok(regex) => regex,
            Err(_) => {
                // Invalid pattern, e.g. mid-typing. Not an error.
                self.matches.clear();
                self.current_match_index = 0;
                return;
            }
        };

        let mut matches = Vec::new();
        for block in store.blocks() {
            if !self.filter_zones.is_empty() && !self.filter_zones.contains(&block.zone) {
                continue;
            }
            if !self.filter_block_types.is_empty()
                && !self.filter_block_types.contains(block.display_type_id())
            {
                continue;
            }

            // find_iter yields non-overlapping matches and steps past
            // zero-length ones on its own.
            for (match_index, found) in regex.find_iter(&block.content).enumerate() {
                matches.push(SearchMatch {
                    block_id: block.id.clone(),
                    match_index,
                    start_pos: char_offset(&block.content, found.start()),
                    end_pos: char_offset(&block.content, found.end()),
                });
            }
        }

        self.matches = matches;
        if self.current_match_index >= self.matches.len() {
            self.current_match_index = 0;
        }
    }
}

/// Convert a byte offset into a character offset.
fn char_offset(content: &str, byte_offset: usize) -> usize {
    content[..byte_offset].chars().count()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;
    use tansu_types::Role;

    fn engine_and_store(contents: &[&str]) -> (SearchEngine, ContextStore, Arc<ManualClock>) {
        let clock = ManualClock::new();
        let mut store = ContextStore::new();
        for content in contents {
            store.create_block(ZoneId::middle(), Role::User, content, None);
        }
        let engine = SearchEngine::new(Arc::clone(&clock) as ClockHandle);
        (engine, store, clock)
    }

    fn search(engine: &mut SearchEngine, store: &ContextStore, query: &str) {
        engine.set_query(query);
        engine.flush(store);
    }

    // ── Matching ────────────────────────────────────────────────────────

    #[test]
    fn test_literal_search_case_insensitive_by_default() {
        let (mut engine, store, _clock) = engine_and_store(&["Hello world", "HELLO again"]);
        search(&mut engine, &store, "hello");
        assert_eq!(engine.match_count(), 2);
        assert_eq!(engine.matches()[0].start_pos, 0);
        assert_eq!(engine.matches()[0].end_pos, 5);
    }

    #[test]
    fn test_case_sensitive_flag() {
        let (mut engine, store, _clock) = engine_and_store(&["Hello world", "hello again"]);
        engine.toggle_case_sensitive();
        search(&mut engine, &store, "hello");
        assert_eq!(engine.match_count(), 1);
        assert_eq!(engine.matches()[0].match_index, 0);
    }

    #[test]
    fn test_literal_mode_escapes_metacharacters() {
        let (mut engine, store, _clock) = engine_and_store(&["cost is $4.20", "aXb"]);
        search(&mut engine, &store, "$4.20");
        assert_eq!(engine.match_count(), 1);
        // "a.b" as a literal must not match "aXb".
        search(&mut engine, &store, "a.b");
        assert_eq!(engine.match_count(), 0);
    }

    #[test]
    fn test_regex_mode() {
        let (mut engine, store, _clock) = engine_and_store(&["abc 123 def 456"]);
        engine.toggle_use_regex();
        search(&mut engine, &store, r"\d+");
        assert_eq!(engine.match_count(), 2);
        assert_eq!(engine.matches()[1].match_index, 1);
    }

    #[test]
    fn test_invalid_regex_yields_zero_matches() {
        let (mut engine, store, _clock) = engine_and_store(&["anything"]);
        engine.toggle_use_regex();
        search(&mut engine, &store, "([unclosed");
        assert_eq!(engine.match_count(), 0);
        assert!(!engine.has_matches());
    }

    #[test]
    fn test_zero_length_matches_terminate() {
        let (mut engine, store, _clock) = engine_and_store(&["abc"]);
        engine.toggle_use_regex();
        search(&mut engine, &store, "x*");
        // One empty match per position; non-overlapping, terminates.
        assert_eq!(engine.match_count(), 4);
        assert!(engine.matches().iter().all(|m| m.start_pos == m.end_pos));
    }

    #[test]
    fn test_blank_query_clears_matches() {
        let (mut engine, store, _clock) = engine_and_store(&["abc"]);
        search(&mut engine, &store, "abc");
        assert_eq!(engine.match_count(), 1);
        search(&mut engine, &store, "   ");
        assert_eq!(engine.match_count(), 0);
    }

    #[test]
    fn test_positions_are_char_offsets() {
        let (mut engine, store, _clock) = engine_and_store(&["héllo wörld"]);
        search(&mut engine, &store, "wörld");
        assert_eq!(engine.match_count(), 1);
        assert_eq!(engine.matches()[0].start_pos, 6);
        assert_eq!(engine.matches()[0].end_pos, 11);
    }

    // ── Filters ─────────────────────────────────────────────────────────

    #[test]
    fn test_zone_filter() {
        let clock = ManualClock::new();
        let mut store = ContextStore::new();
        store.create_block(ZoneId::primacy(), Role::System, "needle one", None);
        store.create_block(ZoneId::middle(), Role::User, "needle two", None);
        let mut engine = SearchEngine::new(Arc::clone(&clock) as ClockHandle);

        engine.add_zone_filter(ZoneId::primacy());
        search(&mut engine, &store, "needle");
        assert_eq!(engine.match_count(), 1);

        engine.remove_zone_filter(&ZoneId::primacy());
        engine.flush(&store);
        assert_eq!(engine.match_count(), 2);
    }

    #[test]
    fn test_type_filter_uses_display_identity() {
        let clock = ManualClock::new();
        let mut store = ContextStore::new();
        store.create_block(ZoneId::middle(), Role::User, "needle plain", None);
        store.create_block(
            ZoneId::middle(),
            Role::User,
            "needle custom",
            Some("custom-x".into()),
        );
        let mut engine = SearchEngine::new(Arc::clone(&clock) as ClockHandle);

        engine.add_block_type_filter("custom-x");
        search(&mut engine, &store, "needle");
        assert_eq!(engine.match_count(), 1);
        assert_eq!(store.get_block(&engine.matches()[0].block_id).unwrap().content, "needle custom");

        engine.clear_filters();
        engine.flush(&store);
        assert_eq!(engine.match_count(), 2);
    }

    // ── Navigation ──────────────────────────────────────────────────────

    #[test]
    fn test_match_navigation_wraps() {
        let (mut engine, store, _clock) = engine_and_store(&["aa aa", "aa"]);
        search(&mut engine, &store, "aa");
        assert_eq!(engine.match_count(), 3);
        assert_eq!(engine.current_match_index(), 0);
        engine.next_match();
        engine.next_match();
        assert_eq!(engine.current_match_index(), 2);
        engine.next_match();
        assert_eq!(engine.current_match_index(), 0);
        engine.previous_match();
        assert_eq!(engine.current_match_index(), 2);
    }

    #[test]
    fn test_navigation_no_matches_is_no_op() {
        let (mut engine, _store, _clock) = engine_and_store(&[]);
        engine.next_match();
        engine.previous_match();
        assert_eq!(engine.current_match_index(), 0);
    }

    #[test]
    fn test_cursor_resets_when_out_of_bounds() {
        let (mut engine, store, _clock) = engine_and_store(&["aa aa aa"]);
        search(&mut engine, &store, "aa");
        engine.next_match();
        engine.next_match();
        assert_eq!(engine.current_match_index(), 2);
        search(&mut engine, &store, "aa aa");
        assert_eq!(engine.match_count(), 1);
        assert_eq!(engine.current_match_index(), 0);
    }

    // ── Per-block lookups ───────────────────────────────────────────────

    #[test]
    fn test_block_match_lookups() {
        let (mut engine, store, _clock) = engine_and_store(&["aa aa", "bb", "aa"]);
        search(&mut engine, &store, "aa");
        let first = store.blocks()[0].id.clone();
        let second = store.blocks()[1].id.clone();
        let third = store.blocks()[2].id.clone();

        assert_eq!(engine.block_matches(&first).len(), 2);
        assert!(engine.block_matches(&second).is_empty());
        assert!(engine.is_current_match_block(&first));
        assert!(engine.current_match_for_block(&third).is_none());

        assert_eq!(engine.select_all_results(), vec![first, third]);
    }

    // ── Debounce and close ──────────────────────────────────────────────

    #[test]
    fn test_recompute_waits_for_debounce() {
        let (mut engine, store, clock) = engine_and_store(&["target"]);
        engine.set_query("target");
        engine.tick(&store);
        assert_eq!(engine.match_count(), 0);
        clock.advance(SEARCH_DEBOUNCE_MS);
        engine.tick(&store);
        assert_eq!(engine.match_count(), 1);
    }

    #[test]
    fn test_keystroke_burst_coalesces() {
        let (mut engine, store, clock) = engine_and_store(&["target"]);
        for prefix in ["t", "ta", "tar", "targ", "target"] {
            engine.set_query(prefix);
            clock.advance(100);
            engine.tick(&store);
        }
        assert_eq!(engine.match_count(), 0); // still inside the window
        clock.advance(SEARCH_DEBOUNCE_MS);
        engine.tick(&store);
        assert_eq!(engine.match_count(), 1);
        assert_eq!(engine.query(), "target");
    }

    #[test]
    fn test_close_resets_query_but_keeps_flags_and_filters() {
        let (mut engine, store, _clock) = engine_and_store(&["target"]);
        engine.open();
        engine.toggle_case_sensitive();
        engine.toggle_use_regex();
        engine.add_zone_filter(ZoneId::middle());
        engine.toggle_filters_expanded();
        search(&mut engine, &store, "target");
        assert!(engine.has_matches());

        engine.close();
        assert!(!engine.is_open());
        assert_eq!(engine.query(), "");
        assert!(!engine.has_matches());
        assert!(!engine.filters_expanded());
        // Flags and filters survive for the next session.
        assert!(engine.case_sensitive());
        assert!(engine.use_regex());
        assert_eq!(engine.filter_zones().count(), 1);
    }

    #[test]
    fn test_close_cancels_pending_recompute() {
        let (mut engine, store, clock) = engine_and_store(&["target"]);
        engine.set_query("target");
        engine.close();
        clock.advance(SEARCH_DEBOUNCE_MS * 2);
        engine.tick(&store);
        assert_eq!(engine.match_count(), 0);
    }

    #[test]
    fn test_toggle_open_close() {
        let (mut engine, _store, _clock) = engine_and_store(&[]);
        engine.toggle();
        assert!(engine.is_open());
        engine.toggle();
        assert!(!engine.is_open());
    }
}
