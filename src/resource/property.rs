//! Typed property bags attached to declared resources.
//!
//! Property bags support the two operations planning depends on: deep
//! structural equality, which drives update detection, and enumeration
//! of transitively embedded resource references, which drives edge
//! construction in the dependency graph.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::id::Moniker;

/// A single property value.
///
/// Values are scalars, ordered sequences, nested bags, or references to
/// other resources by moniker. References are opaque to the planner; it
/// never resolves them, it only orders operations around them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyValue {
    /// Absent value.
    Null,
    /// Boolean scalar.
    Bool(bool),
    /// Numeric scalar.
    Number(f64),
    /// String scalar.
    String(String),
    /// Ordered sequence of values.
    Sequence(Vec<PropertyValue>),
    /// Nested property bag.
    Bag(PropertyBag),
    /// Reference to another resource by moniker.
    Reference(Moniker),
}

/// A mapping from property names to values.
///
/// Keys are kept in a sorted map so iteration, and everything derived
/// from it, is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag {
    entries: BTreeMap<String, PropertyValue>,
}

impl PropertyBag {
    /// Creates an empty property bag.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Adds a property, consuming and returning the bag.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    /// Sets a property.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PropertyValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Gets a property by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&PropertyValue> {
        self.entries.get(key)
    }

    /// Returns the number of top-level properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the bag has no properties.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.entries.iter()
    }

    /// Compares two bags under deep structural equality.
    ///
    /// Sequences compare element-wise in order; nested bags compare
    /// entry-wise. This is the comparison that decides whether a
    /// resource present in both snapshots needs an update.
    #[must_use]
    pub fn deep_equals(&self, other: &Self) -> bool {
        self == other
    }

    /// Enumerates every resource reference embedded in this bag.
    ///
    /// The walk is recursive through sequences and nested bags. The
    /// result is deduplicated and ordered by moniker.
    #[must_use]
    pub fn references(&self) -> BTreeSet<Moniker> {
        let mut refs = BTreeSet::new();
        for value in self.entries.values() {
            collect_references(value, &mut refs);
        }
        refs
    }
}

/// Recursively collects references from a value into the set.
fn collect_references(value: &PropertyValue, refs: &mut BTreeSet<Moniker>) {
    match value {
        PropertyValue::Reference(moniker) => {
            refs.insert(moniker.clone());
        }
        PropertyValue::Sequence(values) => {
            for value in values {
                collect_references(value, refs);
            }
        }
        PropertyValue::Bag(bag) => {
            for (_, value) in bag.iter() {
                collect_references(value, refs);
            }
        }
        PropertyValue::Null
        | PropertyValue::Bool(_)
        | PropertyValue::Number(_)
        | PropertyValue::String(_) => {}
    }
}

impl PropertyValue {
    /// Creates a reference to another resource.
    #[must_use]
    pub fn reference(moniker: impl Into<Moniker>) -> Self {
        Self::Reference(moniker.into())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for PropertyValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<PropertyBag> for PropertyValue {
    fn from(bag: PropertyBag) -> Self {
        Self::Bag(bag)
    }
}

impl From<Moniker> for PropertyValue {
    fn from(moniker: Moniker) -> Self {
        Self::Reference(moniker)
    }
}

impl From<Vec<PropertyValue>> for PropertyValue {
    fn from(values: Vec<PropertyValue>) -> Self {
        Self::Sequence(values)
    }
}
