//! Typed string identifiers.
//!
//! Blocks, zones, and snapshots are addressed by opaque string IDs. The
//! wire format keeps them as plain strings (`#[serde(transparent)]`), but
//! in Rust each gets its own newtype so a `ZoneId` can never be passed
//! where a `BlockId` is expected.
//!
//! Generated IDs carry a short prefix (`block-`, `zone-`, `snap-`) plus a
//! random hex suffix. IDs loaded from persisted state are accepted as-is —
//! the engine never inspects their internal structure.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh unique ID.
            pub fn generate() -> Self {
                Self(format!("{}-{}", $prefix, &Uuid::new_v4().simple().to_string()[..12]))
            }

            /// Wrap an existing identifier string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

string_id!(
    /// Identifies a content block. Stable for the block's lifetime.
    BlockId,
    "block"
);

string_id!(
    /// Identifies a zone — built-in (`primacy`, `middle`, `recency`) or custom.
    ZoneId,
    "zone"
);

string_id!(
    /// Identifies a named snapshot.
    SnapshotId,
    "snap"
);

impl ZoneId {
    /// The built-in zone that always opens the assembled context.
    pub fn primacy() -> Self {
        Self("primacy".into())
    }

    /// The built-in zone between primacy and recency.
    pub fn middle() -> Self {
        Self("middle".into())
    }

    /// The built-in zone that always closes the assembled context.
    pub fn recency() -> Self {
        Self("recency".into())
    }

    /// Whether this is one of the three built-in zone IDs.
    pub fn is_built_in(&self) -> bool {
        matches!(self.0.as_str(), "primacy" | "middle" | "recency")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        let a = BlockId::generate();
        let b = BlockId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("block-"));
    }

    #[test]
    fn test_wraps_existing_strings() {
        let id = ZoneId::from("middle");
        assert_eq!(id.as_str(), "middle");
        assert_eq!(id, ZoneId::middle());
    }

    #[test]
    fn test_built_in_zone_detection() {
        assert!(ZoneId::primacy().is_built_in());
        assert!(ZoneId::middle().is_built_in());
        assert!(ZoneId::recency().is_built_in());
        assert!(!ZoneId::from("zone-123").is_built_in());
        assert!(!ZoneId::generate().is_built_in());
    }

    #[test]
    fn test_serde_transparent() {
        let id = SnapshotId::from("snap-abc");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"snap-abc\"");
        let parsed: SnapshotId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_usable_as_map_key() {
        use std::collections::HashMap;
        let id = BlockId::generate();
        let mut map = HashMap::new();
        map.insert(id.clone(), 1);
        assert_eq!(map.get(&id), Some(&1));
    }

    #[test]
    fn test_str_comparison() {
        let id = ZoneId::primacy();
        assert_eq!(id, "primacy");
    }
}
