//! Prefixed sequential identifiers
//!
//! Every entity is addressed by a typed handle that is rendered and persisted
//! as `"<prefix>_<n>"`. Handles are plain lookups into the owning container.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// An id string that does not follow the `"<prefix>_<n>"` shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed id '{id}': expected '{prefix}_<n>'")]
pub struct IdParseError {
    pub id: String,
    pub prefix: &'static str,
}

/// Parse the numeric suffix of `"<prefix>_<n>"`
///
/// Leading zeros are rejected so that parsing and display round-trip.
fn parse_suffix(raw: &str, prefix: &str) -> Option<u32> {
    let digits = raw.strip_prefix(prefix)?.strip_prefix('_')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse().ok()
}

macro_rules! prefixed_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl $name {
            /// String prefix used when rendering this id
            pub const PREFIX: &'static str = $prefix;

            pub fn new(index: u32) -> Self {
                Self(index)
            }

            /// Numeric suffix of the id
            pub fn index(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_suffix(s, $prefix).map(Self).ok_or_else(|| IdParseError {
                    id: s.to_string(),
                    prefix: $prefix,
                })
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

prefixed_id!(
    /// Handle of a part inside an assembly
    PartId,
    "part"
);
prefixed_id!(
    /// Handle of a constraint inside an assembly
    ConstraintId,
    "constraint"
);
prefixed_id!(
    /// Handle of a link inside a kinematic chain
    LinkId,
    "link"
);
prefixed_id!(
    /// Handle of a joint inside a kinematic chain
    JointId,
    "joint"
);

/// Monotonic id counter owned by a container
///
/// Once the suffix space is used up the allocator stays exhausted; it never
/// hands out a suffix twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdAllocator {
    /// Next free suffix; `None` once `u32::MAX` has been handed out or observed
    next: Option<u32>,
}

impl IdAllocator {
    /// Create an allocator whose first id has the given suffix
    pub fn starting_at(first: u32) -> Self {
        Self { next: Some(first) }
    }

    /// Hand out the next suffix, or `None` when none are left
    pub fn allocate(&mut self) -> Option<u32> {
        let index = self.next?;
        self.next = index.checked_add(1);
        Some(index)
    }

    /// Record an externally restored suffix so it is never handed out again
    ///
    /// Returns false when no suffix is left to hand out afterwards.
    pub fn observe(&mut self, index: u32) -> bool {
        self.next = match index.checked_add(1) {
            Some(after) => self.next.map(|next| next.max(after)),
            None => None,
        };
        self.next.is_some()
    }

    /// Highest suffix handed out or observed so far
    pub fn last(&self) -> Option<u32> {
        match self.next {
            Some(next) => next.checked_sub(1),
            None => Some(u32::MAX),
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.next.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_parse() {
        let id = PartId::new(12);
        assert_eq!(id.to_string(), "part_12");
        assert_eq!("part_12".parse::<PartId>().unwrap(), id);
        assert_eq!("joint_0".parse::<JointId>().unwrap(), JointId::new(0));
    }

    #[test]
    fn test_rejects_malformed_ids() {
        for raw in ["part", "part_", "part_x", "part-3", "gear_3", "part_03", "part_+3", "part_3_4"] {
            let err = raw.parse::<PartId>().unwrap_err();
            assert_eq!(err.prefix, "part");
            assert_eq!(err.id, raw);
        }
        assert!("part_1".parse::<ConstraintId>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&ConstraintId::new(4)).unwrap();
        assert_eq!(json, "\"constraint_4\"");
        let back: ConstraintId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ConstraintId::new(4));
        assert!(serde_json::from_str::<ConstraintId>("\"constraint_four\"").is_err());
    }

    #[test]
    fn test_allocator_observe() {
        let mut alloc = IdAllocator::starting_at(1);
        assert_eq!(alloc.last(), Some(0));
        assert_eq!(alloc.allocate(), Some(1));
        assert!(alloc.observe(7));
        assert_eq!(alloc.last(), Some(7));
        assert_eq!(alloc.allocate(), Some(8));
        assert!(alloc.observe(2));
        assert_eq!(alloc.allocate(), Some(9));
    }

    #[test]
    fn test_allocator_never_reuses_top_suffix() {
        let mut alloc = IdAllocator::starting_at(0);
        assert!(alloc.observe(u32::MAX - 1));
        assert_eq!(alloc.allocate(), Some(u32::MAX));
        assert!(alloc.is_exhausted());
        assert_eq!(alloc.allocate(), None);
        assert_eq!(alloc.last(), Some(u32::MAX));

        let mut alloc = IdAllocator::starting_at(1);
        assert!(!alloc.observe(u32::MAX));
        assert_eq!(alloc.allocate(), None);
        assert!(!alloc.observe(3));
    }
}
