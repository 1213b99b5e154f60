//! Token budget aggregation — a pure function of the block list.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::block::{Block, Role};
use crate::ids::ZoneId;

/// Default token limit when no session-specific limit is configured.
pub const DEFAULT_TOKEN_LIMIT: u64 = 200_000;

/// Aggregate token counts by zone and role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBudget {
    pub used: u64,
    pub limit: u64,
    /// Built-in zones are always present (seeded at 0); custom zones
    /// appear lazily as blocks reference them.
    pub by_zone: IndexMap<ZoneId, u64>,
    /// All five roles are always present.
    pub by_role: IndexMap<Role, u64>,
}

impl TokenBudget {
    /// Compute the budget for a block list. No side effects, no stored
    /// state beyond `limit`.
    pub fn calculate(blocks: &[Block], limit: u64) -> Self {
        let mut by_zone: IndexMap<ZoneId, u64> = IndexMap::new();
        by_zone.insert(ZoneId::primacy(), 0);
        by_zone.insert(ZoneId::middle(), 0);
        by_zone.insert(ZoneId::recency(), 0);

        let mut by_role: IndexMap<Role, u64> = Role::ALL.into_iter().map(|r| (r, 0)).collect();

        let mut used = 0u64;
        for block in blocks {
            let tokens = u64::from(block.tokens);
            used += tokens;
            *by_zone.entry(block.zone.clone()).or_insert(0) += tokens;
            *by_role.entry(block.role).or_insert(0) += tokens;
        }

        Self {
            used,
            limit,
            by_zone,
            by_role,
        }
    }

    /// Fraction of the limit consumed, in [0, 1].
    pub fn utilization(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        (self.used as f64 / self.limit as f64).min(1.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
