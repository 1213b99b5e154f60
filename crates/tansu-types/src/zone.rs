//! Zone model: named regions with two independent total orders.
//!
//! `context_order` positions a zone in the assembled linear output —
//! primacy always holds the minimum, recency the maximum, and those two
//! sentinels never move. `display_order` positions a zone on screen and
//! is fully reassignable, including for built-ins.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ids::ZoneId;

/// Context order of the primacy sentinel — always first.
pub const PRIMACY_CONTEXT_ORDER: u32 = 0;
/// Context order of the middle built-in zone.
pub const MIDDLE_CONTEXT_ORDER: u32 = 50;
/// Context order of the recency sentinel — always last.
pub const RECENCY_CONTEXT_ORDER: u32 = 1000;

/// Configuration of a single zone.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneConfig {
    pub id: ZoneId,
    pub label: String,
    pub color: String,
    pub is_built_in: bool,
    /// Position when assembling the final ordered content.
    pub context_order: u32,
    /// Position in on-screen layout, independent of `context_order`.
    pub display_order: u32,
}

/// The three built-in zones with their intrinsic defaults.
pub fn built_in_zones() -> Vec<ZoneConfig> {
    fn built_in(id: ZoneId, label: &str, color: &str, context_order: u32, display_order: u32) -> ZoneConfig {
        ZoneConfig {
            id,
            label: label.to_string(),
            color: color.to_string(),
            is_built_in: true,
            context_order,
            display_order,
        }
    }
    vec![
        built_in(
            ZoneId::primacy(),
            "Primacy",
            "var(--zone-primacy)",
            PRIMACY_CONTEXT_ORDER,
            0,
        ),
        built_in(
            ZoneId::middle(),
            "Middle",
            "var(--zone-middle)",
            MIDDLE_CONTEXT_ORDER,
            1,
        ),
        built_in(
            ZoneId::recency(),
            "Recency",
            "var(--zone-recency)",
            RECENCY_CONTEXT_ORDER,
            2,
        ),
    ]
}

/// Label/color override layer for a built-in zone. The intrinsic defaults
/// are never mutated in place.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ZoneOverride {
    /// Whether both fields are unset.
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.color.is_none()
    }
}

/// A zone registry layout, captured into snapshots and restored on
/// branch switches. UI-adjacent per-zone state (heights, expansion) is
/// deliberately not part of the captured layout.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneLayout {
    #[serde(default)]
    pub custom_zones: Vec<ZoneConfig>,
    #[serde(default)]
    pub display_order_overrides: IndexMap<ZoneId, u32>,
    #[serde(default)]
    pub built_in_overrides: IndexMap<ZoneId, ZoneOverride>,
}

// ============================================================================
// Tests
// ============================================================================
