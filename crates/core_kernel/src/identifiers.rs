//! Strongly-typed identifiers for domain entities
//!
//! Newtype wrappers around UUIDs keep claim, policyholder and estimation
//! identities from being mixed up at call sites. Serialized form is the bare
//! UUID; the display form carries a short prefix (`CLM-…`), and parsing
//! accepts both.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

macro_rules! define_id {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates a new time-ordered identifier (v7)
            pub fn new_v7() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates from an existing UUID
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the underlying UUID
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Returns the identifier prefix for display
            pub fn prefix() -> &'static str {
                $prefix
            }

            /// Parses an identifier, reporting the offending input on failure
            pub fn parse(s: &str) -> Result<Self, CoreError> {
                s.parse().map_err(|source| CoreError::InvalidIdentifier {
                    kind: stringify!($name),
                    input: s.to_string(),
                    source,
                })
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}-{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                // Strip prefix if present
                let trimmed = s.trim();
                let uuid_str = trimmed.strip_prefix(concat!($prefix, "-")).unwrap_or(trimmed);
                Ok(Self(Uuid::parse_str(uuid_str)?))
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Uuid {
                id.0
            }
        }
    };
}

// A submitted medical bulletin requesting reimbursement
define_id!(ClaimId, "CLM");
// The insured individual the claim belongs to
define_id!(PolicyholderId, "PH");
// A persisted estimation result
define_id!(EstimationId, "EST");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_id_display() {
        let id = ClaimId::new();
        assert!(id.to_string().starts_with("CLM-"));
    }

    #[test]
    fn test_id_parsing_round_trip() {
        let original = PolicyholderId::new();
        let parsed: PolicyholderId = original.to_string().parse().unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_parse_reports_type_name() {
        let err = ClaimId::parse("not-a-uuid").unwrap_err();
        assert!(err.to_string().contains("ClaimId"));
        assert!(err.to_string().contains("not-a-uuid"));
    }

    #[test]
    fn test_serializes_as_bare_uuid() {
        let uuid = Uuid::new_v4();
        let id = EstimationId::from(uuid);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", uuid));
    }
}
