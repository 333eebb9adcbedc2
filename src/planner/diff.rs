//! Diff engine for comparing two resource snapshots.
//!
//! The diff joins the old and new snapshots on moniker and classifies
//! every resource as a create, update, or delete. Resources present in
//! both snapshots with deeply equal properties are unchanged and
//! contribute no change entry.

use std::collections::HashMap;

use tracing::debug;

use crate::error::PlanError;
use crate::resource::{Moniker, Resource, Snapshot};

/// Kind of change a resource needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The resource exists only in the new snapshot.
    Create,
    /// The resource exists in both snapshots with differing properties.
    Update,
    /// The resource exists only in the old snapshot.
    Delete,
}

/// A single classified change.
#[derive(Debug, Clone)]
pub struct PlannedChange {
    /// Moniker of the affected resource.
    pub moniker: Moniker,
    /// Kind of change.
    pub kind: ChangeKind,
    /// Old state; present for updates and deletes.
    pub old: Option<Resource>,
    /// New state; present for creates and updates.
    pub new: Option<Resource>,
}

/// Result of diffing two snapshots.
#[derive(Debug)]
pub struct SnapshotDiff {
    /// Changes: deletes in old-snapshot order, then creates and
    /// updates in new-snapshot order.
    changes: Vec<PlannedChange>,
    /// Reverse reference map over the old snapshot: for each moniker,
    /// the monikers of resources that referred to it.
    old_dependents: HashMap<Moniker, Vec<Moniker>>,
    /// Number of resources present in both snapshots and unchanged.
    unchanged: usize,
}

/// Engine for computing snapshot diffs.
#[derive(Debug, Default)]
pub struct DiffEngine;

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the diff between an old and a new snapshot, either of
    /// which may be absent.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::TypeMismatch`] when a moniker appears in
    /// both snapshots with diverging types.
    pub fn diff(
        &self,
        old: Option<&Snapshot>,
        new: Option<&Snapshot>,
    ) -> std::result::Result<SnapshotDiff, PlanError> {
        let old_resources = old.map_or(&[][..], Snapshot::resources);
        let new_resources = new.map_or(&[][..], Snapshot::resources);

        let mut olds: HashMap<&Moniker, &Resource> = HashMap::new();
        let mut old_dependents: HashMap<Moniker, Vec<Moniker>> = HashMap::new();
        for resource in old_resources {
            olds.insert(resource.moniker(), resource);
            for referent in resource.properties().references() {
                old_dependents
                    .entry(referent)
                    .or_default()
                    .push(resource.moniker().clone());
            }
        }

        let mut news: HashMap<&Moniker, &Resource> = HashMap::new();
        for resource in new_resources {
            news.insert(resource.moniker(), resource);
        }

        let mut changes = Vec::new();
        let mut unchanged = 0;

        for resource in old_resources {
            if !news.contains_key(resource.moniker()) {
                debug!("'{}' will be deleted", resource.moniker());
                changes.push(PlannedChange {
                    moniker: resource.moniker().clone(),
                    kind: ChangeKind::Delete,
                    old: Some(resource.clone()),
                    new: None,
                });
            }
        }

        for resource in new_resources {
            match olds.get(resource.moniker()) {
                Some(prev) => {
                    if prev.ty() != resource.ty() {
                        return Err(PlanError::TypeMismatch {
                            moniker: resource.moniker().clone(),
                            old_ty: prev.ty().clone(),
                            new_ty: resource.ty().clone(),
                        });
                    }
                    if prev.properties().deep_equals(resource.properties()) {
                        debug!("'{}' is unchanged", resource.moniker());
                        unchanged += 1;
                    } else {
                        debug!("'{}' will be updated", resource.moniker());
                        changes.push(PlannedChange {
                            moniker: resource.moniker().clone(),
                            kind: ChangeKind::Update,
                            old: Some((*prev).clone()),
                            new: Some(resource.clone()),
                        });
                    }
                }
                None => {
                    debug!("'{}' will be created", resource.moniker());
                    changes.push(PlannedChange {
                        moniker: resource.moniker().clone(),
                        kind: ChangeKind::Create,
                        old: None,
                        new: Some(resource.clone()),
                    });
                }
            }
        }

        Ok(SnapshotDiff {
            changes,
            old_dependents,
            unchanged,
        })
    }
}

impl SnapshotDiff {
    /// Returns the classified changes.
    #[must_use]
    pub fn changes(&self) -> &[PlannedChange] {
        &self.changes
    }

    /// Returns the monikers that referred to the given moniker in the
    /// old snapshot.
    #[must_use]
    pub fn dependents_of(&self, moniker: &Moniker) -> &[Moniker] {
        self.old_dependents
            .get(moniker)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Consumes the diff, yielding the change list.
    pub(crate) fn into_changes(self) -> Vec<PlannedChange> {
        self.changes
    }

    /// Number of resources to create.
    #[must_use]
    pub fn creates(&self) -> usize {
        self.count(ChangeKind::Create)
    }

    /// Number of resources to update.
    #[must_use]
    pub fn updates(&self) -> usize {
        self.count(ChangeKind::Update)
    }

    /// Number of resources to delete.
    #[must_use]
    pub fn deletes(&self) -> usize {
        self.count(ChangeKind::Delete)
    }

    /// Number of resources present in both snapshots and unchanged.
    #[must_use]
    pub const fn unchanged(&self) -> usize {
        self.unchanged
    }

    /// Returns true if any change is needed.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }

    fn count(&self, kind: ChangeKind) -> usize {
        self.changes.iter().filter(|c| c.kind == kind).count()
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{PropertyBag, PropertyValue};

    fn resource(moniker: &str, v: i64) -> Resource {
        Resource::new(moniker, "pkg.widget", PropertyBag::new().with("v", v))
    }

    fn referencing(moniker: &str, target: &str) -> Resource {
        Resource::new(
            moniker,
            "pkg.widget",
            PropertyBag::new().with("target", PropertyValue::reference(target)),
        )
    }

    #[test]
    fn classifies_create_update_delete() {
        let old = Snapshot::new(vec![resource("kept", 1), resource("gone", 1)]);
        let new = Snapshot::new(vec![resource("kept", 2), resource("fresh", 1)]);

        let diff = DiffEngine::new().diff(Some(&old), Some(&new)).expect("diff");

        assert_eq!(diff.creates(), 1);
        assert_eq!(diff.updates(), 1);
        assert_eq!(diff.deletes(), 1);
        assert_eq!(diff.unchanged(), 0);
    }

    #[test]
    fn unchanged_resources_emit_no_change() {
        let old = Snapshot::new(vec![resource("same", 1)]);
        let new = Snapshot::new(vec![resource("same", 1)]);

        let diff = DiffEngine::new().diff(Some(&old), Some(&new)).expect("diff");

        assert!(!diff.has_changes());
        assert_eq!(diff.unchanged(), 1);
    }

    #[test]
    fn diff_of_snapshot_with_itself_is_empty() {
        let snap = Snapshot::new(vec![resource("a", 1), referencing("b", "a")]);

        let diff = DiffEngine::new()
            .diff(Some(&snap), Some(&snap))
            .expect("diff");

        assert!(!diff.has_changes());
        assert_eq!(diff.unchanged(), 2);
    }

    #[test]
    fn absent_snapshots_diff_to_nothing() {
        let diff = DiffEngine::new().diff(None, None).expect("diff");
        assert!(!diff.has_changes());
        assert_eq!(diff.unchanged(), 0);
    }

    #[test]
    fn absent_old_means_all_creates() {
        let new = Snapshot::new(vec![resource("a", 1), resource("b", 1)]);
        let diff = DiffEngine::new().diff(None, Some(&new)).expect("diff");

        assert_eq!(diff.creates(), 2);
        assert_eq!(diff.deletes(), 0);
    }

    #[test]
    fn absent_new_means_all_deletes() {
        let old = Snapshot::new(vec![resource("a", 1), resource("b", 1)]);
        let diff = DiffEngine::new().diff(Some(&old), None).expect("diff");

        assert_eq!(diff.deletes(), 2);
        assert_eq!(diff.creates(), 0);
    }

    #[test]
    fn type_divergence_is_fatal() {
        let old = Snapshot::new(vec![Resource::new("a", "pkg.X", PropertyBag::new())]);
        let new = Snapshot::new(vec![Resource::new("a", "pkg.Y", PropertyBag::new())]);

        let err = DiffEngine::new()
            .diff(Some(&old), Some(&new))
            .expect_err("types diverge");

        assert!(matches!(err, PlanError::TypeMismatch { .. }));
    }

    #[test]
    fn old_dependents_reverse_references() {
        let old = Snapshot::new(vec![
            resource("base", 1),
            referencing("user1", "base"),
            referencing("user2", "base"),
        ]);

        let diff = DiffEngine::new().diff(Some(&old), None).expect("diff");

        let dependents = diff.dependents_of(&Moniker::from("base"));
        assert_eq!(dependents.len(), 2);
        assert!(dependents.contains(&Moniker::from("user1")));
        assert!(dependents.contains(&Moniker::from("user2")));
    }
}
