//! Part identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FetchError;

/// Stable catalog key of a part (e.g. `C25804`)
///
/// Identifiers double as cache file names, so they must be non-empty and free
/// of path separators.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PartId(String);

impl PartId {
    /// Validate and wrap a part identifier
    pub fn new(id: impl Into<String>) -> Result<Self, FetchError> {
        let id = id.into();
        let trimmed = id.trim();

        let reason = if trimmed.is_empty() {
            Some("identifier is empty")
        } else if trimmed.contains(['/', '\\']) {
            Some("identifier contains a path separator")
        } else if trimmed.contains("..") {
            Some("identifier contains '..'")
        } else if trimmed.chars().any(char::is_control) {
            Some("identifier contains control characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(FetchError::InvalidPartId {
                part_id: id,
                reason: reason.to_string(),
            }),
            None => Ok(Self(trimmed.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PartId {
    type Error = FetchError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PartId::new(value)
    }
}

impl From<PartId> for String {
    fn from(id: PartId) -> Self {
        id.0
    }
}

impl AsRef<str> for PartId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        assert_eq!(PartId::new("C25804").unwrap().as_str(), "C25804");
        assert_eq!(PartId::new("  C1 ").unwrap().as_str(), "C1");
    }

    #[test]
    fn test_invalid_ids() {
        for bad in ["", "   ", "../C1", "a/b", "a\\b", "C\t1"] {
            assert!(PartId::new(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: Vec<PartId> = serde_yaml_ng::from_str("[C1, C2]").unwrap();
        assert_eq!(ok.len(), 2);

        let bad: Result<Vec<PartId>, _> = serde_yaml_ng::from_str("['../etc']");
        assert!(bad.is_err());
    }
}
