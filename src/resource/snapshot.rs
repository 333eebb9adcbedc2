//! Point-in-time collections of declared resources.
//!
//! A snapshot is an ordered, immutable enumeration of resources
//! describing either desired or actual state. Where a snapshot comes
//! from (a file, remote state, a test fixture) is opaque to planning.

use serde::{Deserialize, Serialize};

use super::id::Moniker;
use super::types::Resource;

/// An immutable set of resources at a point in time.
///
/// Monikers must be unique within a snapshot; resource order has no
/// semantic effect on planning beyond making tie-breaks reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    resources: Vec<Resource>,
}

impl Snapshot {
    /// Creates a snapshot from a list of resources.
    #[must_use]
    pub fn new(resources: Vec<Resource>) -> Self {
        Self { resources }
    }

    /// Creates an empty snapshot.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            resources: Vec::new(),
        }
    }

    /// Returns the resources in declaration order.
    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Looks up a resource by moniker.
    #[must_use]
    pub fn get(&self, moniker: &Moniker) -> Option<&Resource> {
        self.resources.iter().find(|r| r.moniker() == moniker)
    }

    /// Returns true if a resource with the given moniker exists.
    #[must_use]
    pub fn contains(&self, moniker: &Moniker) -> bool {
        self.get(moniker).is_some()
    }

    /// Returns the number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if the snapshot holds no resources.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Iterates over resources in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, Resource> {
        self.resources.iter()
    }

    /// Returns all monikers in declaration order.
    #[must_use]
    pub fn monikers(&self) -> Vec<&Moniker> {
        self.resources.iter().map(Resource::moniker).collect()
    }
}

impl FromIterator<Resource> for Snapshot {
    fn from_iter<I: IntoIterator<Item = Resource>>(iter: I) -> Self {
        Self {
            resources: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a Resource;
    type IntoIter = std::slice::Iter<'a, Resource>;

    fn into_iter(self) -> Self::IntoIter {
        self.resources.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::property::{PropertyBag, PropertyValue};

    fn sample() -> Snapshot {
        Snapshot::new(vec![
            Resource::new("net", "pkg.network", PropertyBag::new().with("cidr", "10.0.0.0/16")),
            Resource::new(
                "web",
                "pkg.server",
                PropertyBag::new().with("vpc", PropertyValue::reference("net")),
            ),
        ])
    }

    #[test]
    fn lookup_by_moniker() {
        let snap = sample();
        assert!(snap.contains(&Moniker::from("net")));
        assert!(snap.get(&Moniker::from("missing")).is_none());
    }

    #[test]
    fn order_is_preserved() {
        let snap = sample();
        let monikers: Vec<&str> = snap.monikers().iter().map(|m| m.as_str()).collect();
        assert_eq!(monikers, vec!["net", "web"]);
    }

    #[test]
    fn collects_from_iterator() {
        let snap: Snapshot = sample().resources().iter().cloned().collect();
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn yaml_round_trip_preserves_structure() {
        let snap = sample();
        let encoded = serde_yaml::to_string(&snap).expect("serialize snapshot");
        let decoded: Snapshot = serde_yaml::from_str(&encoded).expect("parse snapshot");
        assert_eq!(snap, decoded);
    }
}
