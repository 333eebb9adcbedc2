//! Canonical fingerprinting of resources and snapshots.
//!
//! Fingerprints give callers a cheap, stable digest for change
//! detection and display. The encoding is canonical: tag bytes per
//! value variant and length prefixes for strings, with bag keys and
//! snapshot resources visited in sorted order.

use sha2::{Digest, Sha256};

use super::property::{PropertyBag, PropertyValue};
use super::snapshot::Snapshot;
use super::types::Resource;

/// Variant tags for the canonical value encoding.
const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_NUMBER: u8 = 2;
const TAG_STRING: u8 = 3;
const TAG_SEQUENCE: u8 = 4;
const TAG_BAG: u8 = 5;
const TAG_REFERENCE: u8 = 6;

/// Hasher for computing resource and snapshot fingerprints.
#[derive(Debug, Default)]
pub struct SnapshotHasher;

impl SnapshotHasher {
    /// Creates a new hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the fingerprint of a single resource.
    ///
    /// The digest covers moniker, type, and properties. The
    /// provider-assigned id is excluded: fingerprints track declared
    /// content, and ids are provider-side bookkeeping.
    #[must_use]
    pub fn hash_resource(&self, resource: &Resource) -> String {
        let mut hasher = Sha256::new();
        hash_str(&mut hasher, resource.moniker().as_str());
        hash_str(&mut hasher, resource.ty().as_str());
        hash_bag(&mut hasher, resource.properties());
        hex::encode(hasher.finalize())
    }

    /// Computes the fingerprint of an entire snapshot.
    ///
    /// Resources are hashed in moniker order, so declaration order does
    /// not affect the digest.
    #[must_use]
    pub fn hash_snapshot(&self, snapshot: &Snapshot) -> String {
        let mut resources: Vec<&Resource> = snapshot.iter().collect();
        resources.sort_by(|a, b| a.moniker().cmp(b.moniker()));

        let mut hasher = Sha256::new();
        for resource in resources {
            hash_str(&mut hasher, &self.hash_resource(resource));
        }
        hex::encode(hasher.finalize())
    }

    /// Returns the first 8 characters of a fingerprint, for display.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}

/// Hashes a length-prefixed string.
fn hash_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_be_bytes());
    hasher.update(s.as_bytes());
}

/// Hashes a property bag entry-wise in key order.
fn hash_bag(hasher: &mut Sha256, bag: &PropertyBag) {
    hasher.update((bag.len() as u64).to_be_bytes());
    for (key, value) in bag.iter() {
        hash_str(hasher, key);
        hash_value(hasher, value);
    }
}

/// Hashes a single tagged value.
fn hash_value(hasher: &mut Sha256, value: &PropertyValue) {
    match value {
        PropertyValue::Null => hasher.update([TAG_NULL]),
        PropertyValue::Bool(b) => {
            hasher.update([TAG_BOOL]);
            hasher.update([u8::from(*b)]);
        }
        PropertyValue::Number(n) => {
            hasher.update([TAG_NUMBER]);
            hasher.update(n.to_be_bytes());
        }
        PropertyValue::String(s) => {
            hasher.update([TAG_STRING]);
            hash_str(hasher, s);
        }
        PropertyValue::Sequence(values) => {
            hasher.update([TAG_SEQUENCE]);
            hasher.update((values.len() as u64).to_be_bytes());
            for value in values {
                hash_value(hasher, value);
            }
        }
        PropertyValue::Bag(bag) => {
            hasher.update([TAG_BAG]);
            hash_bag(hasher, bag);
        }
        PropertyValue::Reference(moniker) => {
            hasher.update([TAG_REFERENCE]);
            hash_str(hasher, moniker.as_str());
        }
    }
}
