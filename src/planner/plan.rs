//! Deployment plans and their steps.
//!
//! A plan is built by diffing two snapshots, ordering the resulting
//! operations through the dependency graph, and threading them into a
//! singly linked chain of steps. Once built, a plan is final: the
//! chain never changes shape, and only the executor touches the
//! resources it owns.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{ProviderError, Result};
use crate::provider::{Provider, ProviderRegistry};
use crate::resource::{Moniker, Resource, Snapshot};

use super::diff::{ChangeKind, DiffEngine, PlannedChange};
use super::graph::PlanGraph;

/// The operation a step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOp {
    /// Create a resource that exists only in the new snapshot.
    Create,
    /// Update a resource present in both snapshots.
    Update,
    /// Delete a resource that exists only in the old snapshot.
    Delete,
}

/// A single planned operation on one resource.
///
/// Steps are constructed during planning and never mutated afterwards,
/// except that the executor assigns provider ids to the new resource.
#[derive(Debug)]
pub struct Step {
    /// Operation to perform.
    op: StepOp,
    /// Resource state before the step; present for updates and deletes.
    old: Option<Resource>,
    /// Resource state after the step; present for creates and updates.
    new: Option<Resource>,
    /// Next step in the chain.
    next: Option<Box<Step>>,
}

/// Planner context shared by every step of a plan.
///
/// The context owns the provider registry; providers are resolved
/// lazily as steps execute and cached for the lifetime of the plan.
#[derive(Debug)]
pub struct PlanContext {
    registry: ProviderRegistry,
}

/// An executable deployment plan.
///
/// The plan owns its context and the chain of steps. An empty plan has
/// no steps and applying it is a no-op.
#[derive(Debug)]
pub struct Plan {
    /// Planner context; resolves providers during execution.
    ctx: PlanContext,
    /// First step of the chain, if any.
    head: Option<Box<Step>>,
    /// When the plan was built.
    created_at: DateTime<Utc>,
}

/// Iterator over a plan's steps in execution order.
pub struct Steps<'a> {
    next: Option<&'a Step>,
}

impl PlanContext {
    /// Creates a context around a provider registry.
    #[must_use]
    pub const fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Resolves the provider for a resource via its type's package.
    pub(crate) async fn provider(
        &self,
        resource: &Resource,
    ) -> std::result::Result<Arc<dyn Provider>, ProviderError> {
        self.registry.provider_for(resource.ty().package()).await
    }
}

impl Plan {
    /// Builds a plan that transforms the old snapshot into the new one.
    ///
    /// Either snapshot may be absent: with no old snapshot the plan is
    /// pure creation, with no new snapshot pure deletion, and with
    /// neither it is empty.
    ///
    /// # Errors
    ///
    /// Returns a planning error when a moniker changes type between
    /// snapshots or when the dependency graph contains a cycle. No
    /// partial plan is returned.
    pub fn new(ctx: PlanContext, old: Option<&Snapshot>, new: Option<&Snapshot>) -> Result<Self> {
        let diff = DiffEngine::new().diff(old, new)?;
        debug!(
            "planning {} creates, {} updates, {} deletes ({} unchanged)",
            diff.creates(),
            diff.updates(),
            diff.deletes(),
            diff.unchanged()
        );

        let mut graph = PlanGraph::new();
        for change in diff.changes() {
            graph.add_vertex(change.moniker.clone());
        }

        for change in diff.changes() {
            match change.kind {
                ChangeKind::Delete => {
                    // Dependents must release their references, by being
                    // deleted or updated themselves, before the target
                    // goes away.
                    for dependent in diff.dependents_of(&change.moniker) {
                        if graph.contains(dependent) {
                            graph.connect(&change.moniker, dependent);
                        }
                    }
                }
                ChangeKind::Create | ChangeKind::Update => {
                    // Referenced resources must exist before the step
                    // that refers to them. A referent without a vertex
                    // is unchanged or external and already satisfied.
                    if let Some(new_state) = &change.new {
                        for referent in new_state.properties().references() {
                            if graph.contains(&referent) {
                                graph.connect(&change.moniker, &referent);
                            }
                        }
                    }
                }
            }
        }

        let order = graph.sequence()?;

        let mut steps: HashMap<Moniker, Step> = diff
            .into_changes()
            .into_iter()
            .map(|change| (change.moniker.clone(), Step::from_change(change)))
            .collect();

        let mut head: Option<Box<Step>> = None;
        for moniker in order.iter().rev() {
            if let Some(mut step) = steps.remove(moniker) {
                step.next = head.take();
                head = Some(Box::new(step));
            }
        }

        Ok(Self {
            ctx,
            head,
            created_at: Utc::now(),
        })
    }

    /// Returns true if the plan has no steps.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns the first step of the chain, if any.
    #[must_use]
    pub fn head(&self) -> Option<&Step> {
        self.head.as_deref()
    }

    /// Iterates over the steps in execution order.
    #[must_use]
    pub fn steps(&self) -> Steps<'_> {
        Steps {
            next: self.head.as_deref(),
        }
    }

    /// Returns the number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps().count()
    }

    /// Returns when the plan was built.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Splits the plan into its context and chain head for execution.
    pub(crate) fn parts_mut(&mut self) -> (&PlanContext, Option<&mut Step>) {
        (&self.ctx, self.head.as_deref_mut())
    }
}

impl Drop for Plan {
    fn drop(&mut self) {
        // Unlink the chain iteratively so deep plans do not recurse.
        let mut next = self.head.take();
        while let Some(mut step) = next {
            next = step.next.take();
        }
    }
}

impl Step {
    /// Wraps a classified change into a step.
    fn from_change(change: PlannedChange) -> Self {
        let op = match change.kind {
            ChangeKind::Create => StepOp::Create,
            ChangeKind::Update => StepOp::Update,
            ChangeKind::Delete => StepOp::Delete,
        };
        Self {
            op,
            old: change.old,
            new: change.new,
            next: None,
        }
    }

    /// Returns the operation this step performs.
    #[must_use]
    pub const fn op(&self) -> StepOp {
        self.op
    }

    /// Returns the resource state before the step, if any.
    #[must_use]
    pub const fn old(&self) -> Option<&Resource> {
        self.old.as_ref()
    }

    /// Returns the resource state after the step, if any.
    #[must_use]
    pub const fn new(&self) -> Option<&Resource> {
        self.new.as_ref()
    }

    /// Returns the next step in the chain, if any.
    #[must_use]
    pub fn next(&self) -> Option<&Step> {
        self.next.as_deref()
    }

    /// Returns the moniker of the resource this step operates on.
    #[must_use]
    pub fn moniker(&self) -> &Moniker {
        match (&self.new, &self.old) {
            (Some(resource), _) | (None, Some(resource)) => resource.moniker(),
            (None, None) => unreachable!("step without a resource"),
        }
    }

    /// Mutable access to the next step, for the executor's walk.
    pub(crate) fn next_mut(&mut self) -> Option<&mut Step> {
        self.next.as_deref_mut()
    }

    /// Mutable access to the new resource, for id assignment.
    pub(crate) fn new_resource_mut(&mut self) -> Option<&mut Resource> {
        self.new.as_mut()
    }
}

impl<'a> Iterator for Steps<'a> {
    type Item = &'a Step;

    fn next(&mut self) -> Option<Self::Item> {
        let step = self.next?;
        self.next = step.next();
        Some(step)
    }
}

impl std::fmt::Display for StepOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} '{}'", self.op, self.moniker())
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "no changes required");
        }

        write!(f, "deployment plan ({} steps):", self.len())?;
        for (i, step) in self.steps().enumerate() {
            write!(f, "\n  {}. {step}", i + 1)?;
        }
        Ok(())
    }
}
