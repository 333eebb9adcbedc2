//! Resource identity and property model.
//!
//! This module defines what the planner operates on: monikers and
//! types, resources with optional provider-assigned ids, typed
//! property bags with reference enumeration, and snapshots.

mod hash;
mod id;
mod property;
mod snapshot;
mod types;

pub use hash::SnapshotHasher;
pub use id::{Moniker, ResourceId, ResourceType};
pub use property::{PropertyBag, PropertyValue};
pub use snapshot::Snapshot;
pub use types::Resource;
