//! The declared resource record.
//!
//! A resource couples a stable moniker with a type, an optional
//! provider-assigned id, and a property bag. Desired-state resources
//! carry no id; only resources a provider has materialized do.

use serde::{Deserialize, Serialize};

use super::id::{Moniker, ResourceId, ResourceType};
use super::property::PropertyBag;

/// A single declared resource.
///
/// Moniker and type are fixed at construction; the id is assigned
/// exactly once, when a provider materializes the resource or reports a
/// replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Stable identity within a snapshot.
    moniker: Moniker,
    /// Declared type; the leading segment routes to a provider.
    ty: ResourceType,
    /// Provider-assigned handle, present once materialized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<ResourceId>,
    /// Typed properties, including references to other resources.
    properties: PropertyBag,
}

impl Resource {
    /// Creates a desired-state resource with no id.
    #[must_use]
    pub fn new(
        moniker: impl Into<Moniker>,
        ty: impl Into<ResourceType>,
        properties: PropertyBag,
    ) -> Self {
        Self {
            moniker: moniker.into(),
            ty: ty.into(),
            id: None,
            properties,
        }
    }

    /// Attaches a provider-assigned id, consuming and returning the
    /// resource. Used by snapshot producers describing actual state.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ResourceId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns the resource's moniker.
    #[must_use]
    pub const fn moniker(&self) -> &Moniker {
        &self.moniker
    }

    /// Returns the resource's declared type.
    #[must_use]
    pub const fn ty(&self) -> &ResourceType {
        &self.ty
    }

    /// Returns the provider-assigned id, if the resource has been
    /// materialized.
    #[must_use]
    pub const fn id(&self) -> Option<&ResourceId> {
        self.id.as_ref()
    }

    /// Returns true if a provider has assigned this resource an id.
    #[must_use]
    pub const fn has_id(&self) -> bool {
        self.id.is_some()
    }

    /// Returns the resource's properties.
    #[must_use]
    pub const fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    /// Records the id a provider assigned to this resource.
    pub(crate) fn set_id(&mut self, id: ResourceId) {
        self.id = Some(id);
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.moniker, self.ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::property::PropertyValue;

    #[test]
    fn new_resource_has_no_id() {
        let res = Resource::new("web", "pkg.server", PropertyBag::new());
        assert!(!res.has_id());
        assert!(res.id().is_none());
    }

    #[test]
    fn with_id_marks_materialized() {
        let res = Resource::new("web", "pkg.server", PropertyBag::new()).with_id("srv-1");
        assert!(res.has_id());
        assert_eq!(res.id().map(ResourceId::as_str), Some("srv-1"));
    }

    #[test]
    fn properties_expose_references() {
        let res = Resource::new(
            "web",
            "pkg.server",
            PropertyBag::new().with("vpc", PropertyValue::reference("net")),
        );
        assert!(res.properties().references().contains(&Moniker::from("net")));
    }
}
