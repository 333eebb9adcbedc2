//! Identity newtypes for declared resources.
//!
//! Monikers identify resources within a snapshot, types route to
//! providers, and ids are the handles providers assign to materialized
//! resources.

use serde::{Deserialize, Serialize};

/// A stable, opaque identifier for a resource within a snapshot.
///
/// Monikers are the join key between the old and new snapshots during
/// diffing, and between graph vertices during sequencing. Equality is
/// plain value equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Moniker(String);

/// The declared type of a resource.
///
/// A type is a dotted token whose leading segment is the package, e.g.
/// `aws.ec2.instance` belongs to package `aws`. Types are compared
/// byte-wise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceType(String);

/// A provider-assigned handle for a materialized resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl Moniker {
    /// Creates a new moniker.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the moniker as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ResourceType {
    /// Creates a new resource type.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the type as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the package segment of this type.
    ///
    /// The package is everything before the first `.`; an undotted type
    /// is its own package.
    #[must_use]
    pub fn package(&self) -> &str {
        match self.0.split_once('.') {
            Some((package, _)) => package,
            None => &self.0,
        }
    }
}

impl ResourceId {
    /// Creates a new resource id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the id is empty.
    ///
    /// Providers must never assign empty ids; this is checked where
    /// provider responses are consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Moniker {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Moniker {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl From<&str> for ResourceType {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for ResourceType {
    fn from(token: String) -> Self {
        Self(token)
    }
}

impl From<&str> for ResourceId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ResourceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for Moniker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_is_leading_segment() {
        assert_eq!(ResourceType::from("aws.ec2.instance").package(), "aws");
        assert_eq!(ResourceType::from("pkg.X").package(), "pkg");
    }

    #[test]
    fn undotted_type_is_its_own_package() {
        assert_eq!(ResourceType::from("standalone").package(), "standalone");
    }

    #[test]
    fn monikers_compare_by_value() {
        assert_eq!(Moniker::from("a"), Moniker::new("a"));
        assert!(Moniker::from("a") < Moniker::from("b"));
    }

    #[test]
    fn empty_id_detected() {
        assert!(ResourceId::from("").is_empty());
        assert!(!ResourceId::from("i-123").is_empty());
    }
}
