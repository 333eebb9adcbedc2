//! Provider contract and registry.
//!
//! Providers perform the actual create, update, and delete operations
//! against a real system for one package. The planner trusts provider
//! verdicts about assigned ids and replacements; it never interprets
//! them.

mod memory;
mod registry;

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::resource::{PropertyBag, ResourceId, ResourceType};

pub use memory::{MemoryProvider, Record, StaticProviderSource, UpdateCall};
pub use registry::{ProviderRegistry, ProviderSource};

/// Opaque health signal a provider attaches to operation outcomes.
///
/// The executor forwards verdicts verbatim; they never alter control
/// flow beyond being reported alongside a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceHealth {
    /// The resource is in the expected state.
    Ok,
    /// The provider could not determine the resource's state.
    Unknown,
    /// The operation is still settling on the provider side.
    Pending,
    /// The resource was left in a damaged state.
    Corrupt,
}

/// Outcome of a successful create operation.
#[derive(Debug, Clone)]
pub struct Created {
    /// Id the provider assigned to the materialized resource. Must be
    /// non-empty.
    pub id: ResourceId,
    /// Health verdict for the new resource.
    pub health: ResourceHealth,
}

/// Outcome of a successful update operation.
#[derive(Debug, Clone)]
pub struct Updated {
    /// Replacement id when the update was realized by recreating the
    /// resource; `None` signals an in-place mutation.
    pub replacement: Option<ResourceId>,
    /// Health verdict for the updated resource.
    pub health: ResourceHealth,
}

/// Outcome of a successful delete operation.
#[derive(Debug, Clone)]
pub struct Deleted {
    /// Health verdict for the removed resource.
    pub health: ResourceHealth,
}

/// A component that performs resource operations for one package.
///
/// Implementations typically wrap an out-of-process plugin or a remote
/// API; [`MemoryProvider`] is the in-process reference implementation.
#[async_trait]
pub trait Provider: Send + Sync + std::fmt::Debug {
    /// Creates a resource of the given type and returns its new id.
    async fn create(
        &self,
        ty: &ResourceType,
        properties: &PropertyBag,
    ) -> std::result::Result<Created, ProviderError>;

    /// Updates the resource with the given id from its old properties
    /// to the new ones.
    ///
    /// A returned replacement id means the update was realized by
    /// recreating the resource under a fresh handle.
    async fn update(
        &self,
        id: &ResourceId,
        ty: &ResourceType,
        old_properties: &PropertyBag,
        new_properties: &PropertyBag,
    ) -> std::result::Result<Updated, ProviderError>;

    /// Deletes the resource with the given id.
    async fn delete(
        &self,
        id: &ResourceId,
        ty: &ResourceType,
    ) -> std::result::Result<Deleted, ProviderError>;
}

impl std::fmt::Display for ResourceHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ok => "ok",
            Self::Unknown => "unknown",
            Self::Pending => "pending",
            Self::Corrupt => "corrupt",
        };
        write!(f, "{s}")
    }
}
