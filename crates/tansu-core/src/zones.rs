//! Zone registry: built-in and custom zones with two independent orders.
//!
//! Built-in zone definitions are immutable; user changes to them live in
//! override layers (display order, label, color) so a reset is just
//! dropping the overrides. Custom zones are owned outright and mutable.
//!
//! Context order is the assembly order: primacy always holds the unique
//! minimum and recency the unique maximum. Custom zones slot strictly
//! between them.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tansu_types::{
    built_in_zones, ZoneConfig, ZoneId, ZoneLayout, ZoneOverride, MIDDLE_CONTEXT_ORDER,
};

use crate::storage::{load_record, save_record, StorageHandle, ZONES_KEY};

/// Default zone panel height in pixels.
pub const DEFAULT_ZONE_HEIGHT: u32 = 200;
/// Minimum zone panel height in pixels. There is no upper limit.
pub const MIN_ZONE_HEIGHT: u32 = 80;

/// Bumped when the persisted schema changes; old records load
/// permissively and are re-saved under the current version.
const STORAGE_VERSION: u32 = 3;

/// Partial update applied through [`ZoneRegistry::update_zone`]. Unset
/// fields are left unchanged.
#[derive(Clone, Debug, Default)]
pub struct ZoneUpdate {
    pub label: Option<String>,
    pub color: Option<String>,
    pub context_order: Option<u32>,
    pub display_order: Option<u32>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ZonesRecord {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    custom_zones: Vec<ZoneConfig>,
    #[serde(default)]
    display_order_overrides: IndexMap<ZoneId, u32>,
    #[serde(default)]
    built_in_overrides: IndexMap<ZoneId, ZoneOverride>,
    #[serde(default)]
    zone_heights: IndexMap<ZoneId, u32>,
    #[serde(default)]
    expanded_zones: Vec<ZoneId>,
    #[serde(default)]
    content_expanded_zones: Vec<ZoneId>,
}

/// Registry of all zones plus per-zone UI state (heights, expansion).
#[derive(Default)]
pub struct ZoneRegistry {
    custom_zones: Vec<ZoneConfig>,
    display_order_overrides: IndexMap<ZoneId, u32>,
    built_in_overrides: IndexMap<ZoneId, ZoneOverride>,
    zone_heights: IndexMap<ZoneId, u32>,
    expanded: IndexSet<ZoneId>,
    content_expanded: IndexSet<ZoneId>,
    storage: Option<StorageHandle>,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry backed by storage, loading any persisted state.
    pub fn with_storage(storage: StorageHandle) -> Self {
        let mut registry = Self {
            storage: Some(storage),
            ..Self::default()
        };
        registry.load();
        registry
    }

    fn load(&mut self) {
        let Some(storage) = &self.storage else { return };
        let Some(record) = load_record::<ZonesRecord>(storage, ZONES_KEY) else {
            return;
        };
        let version = record.version;
        self.custom_zones = record.custom_zones;
        self.display_order_overrides = record.display_order_overrides;
        self.built_in_overrides = record.built_in_overrides;
        self.zone_heights = record.zone_heights;
        self.expanded = record.expanded_zones.into_iter().collect();
        self.content_expanded = record.content_expanded_zones.into_iter().collect();
        if version < STORAGE_VERSION {
            tracing::info!(from = version, to = STORAGE_VERSION, "migrating zone storage");
            self.save();
        }
    }

    fn save(&self) {
        let Some(storage) = &self.storage else { return };
        let record = ZonesRecord {
            version: STORAGE_VERSION,
            custom_zones: self.custom_zones.clone(),
            display_order_overrides: self.display_order_overrides.clone(),
            built_in_overrides: self.built_in_overrides.clone(),
            zone_heights: self.zone_heights.clone(),
            expanded_zones: self.expanded.iter().cloned().collect(),
            content_expanded_zones: self.content_expanded.iter().cloned().collect(),
        };
        save_record(storage, ZONES_KEY, &record);
    }

    // ── Views ───────────────────────────────────────────────────────────

    /// All zones with override layers applied, built-ins first.
    pub fn list_zones(&self) -> Vec<ZoneConfig> {
        built_in_zones()
            .into_iter()
            .chain(self.custom_zones.iter().cloned())
            .map(|mut zone| {
                if let Some(&display) = self.display_order_overrides.get(&zone.id) {
                    zone.display_order = display;
                }
                if let Some(overrides) = self.built_in_overrides.get(&zone.id) {
                    if let Some(label) = &overrides.label {
                        zone.label = label.clone();
                    }
                    if let Some(color) = &overrides.color {
                        zone.color = color.clone();
                    }
                }
                zone
            })
            .collect()
    }

    /// Zones sorted for on-screen layout. Ties keep insertion order.
    pub fn zones_by_display_order(&self) -> Vec<ZoneConfig> {
        let mut zones = self.list_zones();
        zones.sort_by_key(|z| z.display_order);
        zones
    }

    /// Zones sorted for context assembly. Ties keep insertion order.
    pub fn zones_by_context_order(&self) -> Vec<ZoneConfig> {
        let mut zones = self.list_zones();
        zones.sort_by_key(|z| z.context_order);
        zones
    }

    /// Zone IDs in assembly order.
    pub fn zone_ids_in_context_order(&self) -> Vec<ZoneId> {
        self.zones_by_context_order()
            .into_iter()
            .map(|z| z.id)
            .collect()
    }

    /// A zone by ID, with overrides applied.
    pub fn zone_by_id(&self, id: &ZoneId) -> Option<ZoneConfig> {
        self.list_zones().into_iter().find(|z| &z.id == id)
    }

    /// A zone's effective color, with a muted fallback for unknown IDs.
    pub fn zone_color(&self, id: &ZoneId) -> String {
        self.zone_by_id(id)
            .map(|z| z.color)
            .unwrap_or_else(|| "var(--text-muted)".to_string())
    }

    /// The intrinsic (pre-override) definition of a built-in zone.
    pub fn original_built_in(&self, id: &ZoneId) -> Option<ZoneConfig> {
        built_in_zones().into_iter().find(|z| &z.id == id)
    }

    // ── Mutations ───────────────────────────────────────────────────────

    /// Add a custom zone. Its context order lands after every existing
    /// custom zone (and after middle), strictly before recency; its
    /// display order lands after every zone.
    pub fn add_custom_zone(&mut self, label: impl Into<String>, color: impl Into<String>) -> ZoneId {
        let max_context = self
            .custom_zones
            .iter()
            .map(|z| z.context_order)
            .max()
            .unwrap_or(MIDDLE_CONTEXT_ORDER)
            .max(MIDDLE_CONTEXT_ORDER);
        let max_display = self
            .list_zones()
            .iter()
            .map(|z| z.display_order)
            .max()
            .unwrap_or(2);

        let id = ZoneId::generate();
        self.custom_zones.push(ZoneConfig {
            id: id.clone(),
            label: label.into(),
            color: color.into(),
            is_built_in: false,
            context_order: (max_context + 10).min(999),
            display_order: max_display + 1,
        });
        self.save();
        id
    }

    /// Apply a partial update. Built-in zones accept label, color, and
    /// display order (via override layers); their context order never
    /// changes here.
    pub fn update_zone(&mut self, id: &ZoneId, update: ZoneUpdate) {
        if id.is_built_in() {
            if let Some(display) = update.display_order {
                self.display_order_overrides.insert(id.clone(), display);
            }
            if update.label.is_some() || update.color.is_some() {
                let entry = self.built_in_overrides.entry(id.clone()).or_default();
                if let Some(label) = update.label {
                    entry.label = Some(label);
                }
                if let Some(color) = update.color {
                    entry.color = Some(color);
                }
            }
            self.save();
            return;
        }

        if let Some(zone) = self.custom_zones.iter_mut().find(|z| &z.id == id) {
            if let Some(label) = update.label {
                zone.label = label;
            }
            if let Some(color) = update.color {
                zone.color = color;
            }
            if let Some(context) = update.context_order {
                zone.context_order = context.clamp(1, 999);
            }
            if let Some(display) = update.display_order {
                zone.display_order = display;
            }
            self.save();
        }
    }

    /// Delete a custom zone. Built-ins are never deleted. Blocks still
    /// referencing the zone are untouched; see `ContextStore::migrate_zone`.
    pub fn delete_zone(&mut self, id: &ZoneId) {
        if id.is_built_in() {
            return;
        }
        self.custom_zones.retain(|z| &z.id != id);
        self.display_order_overrides.shift_remove(id);
        self.zone_heights.shift_remove(id);
        self.expanded.shift_remove(id);
        self.content_expanded.shift_remove(id);
        self.save();
    }

    /// Reassign display order to match the given ID sequence.
    pub fn reorder_zones_display(&mut self, ordered_ids: &[ZoneId]) {
        for (index, id) in ordered_ids.iter().enumerate() {
            self.display_order_overrides
                .insert(id.clone(), index as u32);
        }
        self.save();
    }

    /// Set a custom zone's context order, clamped strictly between the
    /// primacy and recency sentinels. No-op for built-in zones.
    pub fn set_zone_context_order(&mut self, id: &ZoneId, context_order: u32) {
        if id.is_built_in() {
            return;
        }
        let clamped = context_order.clamp(1, 999);
        if let Some(zone) = self.custom_zones.iter_mut().find(|z| &z.id == id) {
            zone.context_order = clamped;
            self.save();
        }
    }

    /// Drop a built-in zone's override layers, restoring its intrinsic
    /// label, color, and display order.
    pub fn reset_built_in_zone(&mut self, id: &ZoneId) {
        if !id.is_built_in() {
            return;
        }
        self.built_in_overrides.shift_remove(id);
        self.display_order_overrides.shift_remove(id);
        self.save();
    }

    // ── Per-zone UI state ───────────────────────────────────────────────

    pub fn zone_height(&self, id: &ZoneId) -> u32 {
        self.zone_heights.get(id).copied().unwrap_or(DEFAULT_ZONE_HEIGHT)
    }

    /// Set a zone's panel height, floored at [`MIN_ZONE_HEIGHT`].
    pub fn set_zone_height(&mut self, id: &ZoneId, height: u32) {
        self.zone_heights
            .insert(id.clone(), height.max(MIN_ZONE_HEIGHT));
        self.save();
    }

    pub fn reset_zone_height(&mut self, id: &ZoneId) {
        self.zone_heights.shift_remove(id);
        self.save();
    }

    pub fn is_zone_expanded(&self, id: &ZoneId) -> bool {
        self.expanded.contains(id)
    }

    pub fn toggle_zone_expanded(&mut self, id: &ZoneId) {
        if !self.expanded.shift_remove(id) {
            self.expanded.insert(id.clone());
        }
        self.save();
    }

    pub fn set_zone_expanded(&mut self, id: &ZoneId, expanded: bool) {
        if expanded {
            self.expanded.insert(id.clone());
        } else {
            self.expanded.shift_remove(id);
        }
        self.save();
    }

    pub fn is_content_expanded(&self, id: &ZoneId) -> bool {
        self.content_expanded.contains(id)
    }

    pub fn toggle_content_expanded(&mut self, id: &ZoneId) {
        if !self.content_expanded.shift_remove(id) {
            self.content_expanded.insert(id.clone());
        }
        self.save();
    }

    // ── Snapshot layout ─────────────────────────────────────────────────

    /// The capturable layout: custom zones and override layers. Heights
    /// and expansion flags are UI state and stay out of snapshots.
    pub fn layout(&self) -> ZoneLayout {
        ZoneLayout {
            custom_zones: self.custom_zones.clone(),
            display_order_overrides: self.display_order_overrides.clone(),
            built_in_overrides: self.built_in_overrides.clone(),
        }
    }

    /// Replace the layout wholesale, as when switching branches.
    pub fn restore_layout(&mut self, layout: &ZoneLayout) {
        self.custom_zones = layout.custom_zones.clone();
        self.display_order_overrides = layout.display_order_overrides.clone();
        self.built_in_overrides = layout.built_in_overrides.clone();
        self.save();
    }
}

// ============================================================================
// Tests
// ============================================================================
