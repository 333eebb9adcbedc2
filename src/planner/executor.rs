//! Step-apply loop for deployment plans.
//!
//! The executor walks the plan's step chain in sequence, resolves the
//! provider for each step, performs the operation, and reports
//! progress. The first failing step halts the walk; nothing after it
//! is attempted and no applied step is rolled back.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, StratusError};
use crate::provider::ResourceHealth;
use crate::resource::{Moniker, ResourceId};

use super::plan::{Plan, PlanContext, Step, StepOp};

/// Observer of plan execution.
///
/// Observers see `before` and `after` strictly in step order, and see
/// read-only step views: the step a callback observes must not be
/// mutated. The `after` of a failing step carries its error; no
/// further `before` follows it.
pub trait Progress {
    /// Called before a step executes.
    fn before(&mut self, step: &Step);

    /// Called after a step executes, with its error on failure and the
    /// provider's health verdict.
    fn after(&mut self, step: &Step, error: Option<&StratusError>, health: ResourceHealth);
}

/// A step that failed during execution.
///
/// Carries everything the caller needs to report the halt: the
/// subject's moniker, the attempted operation, the underlying error,
/// and the provider's health verdict for the resource.
#[derive(Debug, Error)]
#[error("{op} of '{moniker}' failed: {error}")]
pub struct StepFailure {
    /// Moniker of the resource whose step failed.
    pub moniker: Moniker,
    /// Operation that was being performed.
    pub op: StepOp,
    /// The underlying error.
    #[source]
    pub error: StratusError,
    /// Provider health verdict for the resource, `Unknown` when the
    /// operation never reached a provider.
    pub health: ResourceHealth,
}

impl Plan {
    /// Applies the plan, walking the step chain in order.
    ///
    /// Each step notifies the observer, executes its provider
    /// operation, and notifies the observer again with the outcome.
    /// Successful creates assign the provider id to the step's new
    /// resource; updates adopt replacement ids the same way.
    ///
    /// # Errors
    ///
    /// Returns the first failing step's [`StepFailure`]. Steps after
    /// the failure are not attempted.
    pub async fn apply(
        &mut self,
        mut progress: Option<&mut dyn Progress>,
    ) -> std::result::Result<ResourceHealth, StepFailure> {
        let (ctx, head) = self.parts_mut();
        let mut current = head;

        while let Some(step) = current {
            if let Some(observer) = progress.as_deref_mut() {
                observer.before(step);
            }

            match execute_step(ctx, step).await {
                Ok(health) => {
                    debug!("applied {step}");
                    if let Some(observer) = progress.as_deref_mut() {
                        observer.after(step, None, health);
                    }
                }
                Err((error, health)) => {
                    if let Some(observer) = progress.as_deref_mut() {
                        observer.after(step, Some(&error), health);
                    }
                    return Err(StepFailure {
                        moniker: step.moniker().clone(),
                        op: step.op(),
                        error,
                        health,
                    });
                }
            }

            current = step.next_mut();
        }

        info!("plan applied");
        Ok(ResourceHealth::Ok)
    }
}

/// Executes one step, returning the health verdict, or the error
/// paired with the verdict reported alongside it.
async fn execute_step(
    ctx: &PlanContext,
    step: &mut Step,
) -> std::result::Result<ResourceHealth, (StratusError, ResourceHealth)> {
    match step.op() {
        StepOp::Create => execute_create(ctx, step).await,
        StepOp::Update => execute_update(ctx, step).await,
        StepOp::Delete => execute_delete(ctx, step).await,
    }
}

async fn execute_create(
    ctx: &PlanContext,
    step: &mut Step,
) -> std::result::Result<ResourceHealth, (StratusError, ResourceHealth)> {
    assert!(step.old().is_none(), "create step carries old state");
    let Some(new) = step.new() else {
        unreachable!("create step missing new state")
    };
    assert!(
        !new.has_id(),
        "resources being created must not have ids already"
    );

    let provider = ctx.provider(new).await.map_err(fail)?;
    let created = provider
        .create(new.ty(), new.properties())
        .await
        .map_err(fail)?;
    let id = nonempty_id(created.id, "create").map_err(fail)?;

    if let Some(new) = step.new_resource_mut() {
        new.set_id(id);
    }
    Ok(created.health)
}

async fn execute_update(
    ctx: &PlanContext,
    step: &mut Step,
) -> std::result::Result<ResourceHealth, (StratusError, ResourceHealth)> {
    let (Some(old), Some(new)) = (step.old(), step.new()) else {
        unreachable!("update step missing old or new state")
    };
    assert_eq!(old.ty(), new.ty(), "update step changes resource type");
    let Some(id) = old.id() else {
        panic!("resources being updated must have ids")
    };

    let provider = ctx.provider(old).await.map_err(fail)?;
    let updated = provider
        .update(id, old.ty(), old.properties(), new.properties())
        .await
        .map_err(fail)?;

    if let Some(replacement) = updated.replacement {
        // The provider recreated the resource. References other
        // resources resolved against the old id are not revisited; the
        // plan was sequenced before the replacement was known.
        warn!(
            "update of '{}' was realized as replacement '{replacement}'",
            step.moniker()
        );
        let replacement = nonempty_id(replacement, "update").map_err(fail)?;
        if let Some(new) = step.new_resource_mut() {
            new.set_id(replacement);
        }
    }
    Ok(updated.health)
}

async fn execute_delete(
    ctx: &PlanContext,
    step: &mut Step,
) -> std::result::Result<ResourceHealth, (StratusError, ResourceHealth)> {
    assert!(step.new().is_none(), "delete step carries new state");
    let Some(old) = step.old() else {
        unreachable!("delete step missing old state")
    };
    let Some(id) = old.id() else {
        panic!("resources being deleted must have ids")
    };

    let provider = ctx.provider(old).await.map_err(fail)?;
    let deleted = provider.delete(id, old.ty()).await.map_err(fail)?;
    Ok(deleted.health)
}

/// Pairs a provider error with the health verdict it carries.
fn fail(error: ProviderError) -> (StratusError, ResourceHealth) {
    let health = error.health();
    (StratusError::from(error), health)
}

/// Enforces the contract that providers assign non-empty ids.
fn nonempty_id(
    id: ResourceId,
    op: &str,
) -> std::result::Result<ResourceId, ProviderError> {
    if id.is_empty() {
        return Err(ProviderError::InvalidResponse {
            message: format!("{op} returned an empty id"),
        });
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::PlanError;
    use crate::provider::{
        MemoryProvider, ProviderRegistry, StaticProviderSource,
    };
    use crate::resource::{PropertyBag, PropertyValue, Resource, ResourceType, Snapshot};

    /// Observer that records callback order as compact strings.
    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
    }

    impl Progress for Recorder {
        fn before(&mut self, step: &Step) {
            self.events.push(format!("before:{step}"));
        }

        fn after(&mut self, step: &Step, error: Option<&StratusError>, _health: ResourceHealth) {
            let outcome = if error.is_some() { "err" } else { "ok" };
            self.events.push(format!("after:{step}:{outcome}"));
        }
    }

    fn plan_with(
        provider: &Arc<MemoryProvider>,
        old: Option<&Snapshot>,
        new: Option<&Snapshot>,
    ) -> Plan {
        let source = StaticProviderSource::new().with(
            "pkg",
            Arc::clone(provider) as Arc<dyn crate::provider::Provider>,
        );
        let ctx = PlanContext::new(ProviderRegistry::new(Arc::new(source)));
        Plan::new(ctx, old, new).expect("plan builds")
    }

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

    fn widget() -> ResourceType {
        ResourceType::from("pkg.widget")
    }

    #[tokio::test]
    async fn create_chain_applies_in_dependency_order() {
        let provider = Arc::new(MemoryProvider::new("pkg"));
        let new = Snapshot::new(vec![referencing("app", "zone"), resource("zone", 1)]);
        let mut plan = plan_with(&provider, None, Some(&new));

        let mut recorder = Recorder::default();
        let health = plan
            .apply(Some(&mut recorder))
            .await
            .expect("apply succeeds");

        assert_eq!(health, ResourceHealth::Ok);
        assert_eq!(
            recorder.events,
            vec![
                "before:create 'zone'",
                "after:create 'zone':ok",
                "before:create 'app'",
                "after:create 'app':ok",
            ]
        );

        // Every created resource carries the provider-assigned id.
        for step in plan.steps() {
            let new = step.new().expect("create step has new state");
            assert!(new.id().is_some_and(|id| !id.is_empty()));
        }
        assert_eq!(provider.len(), 2);
    }

    #[tokio::test]
    async fn delete_chain_removes_dependents_first() {
        let provider = Arc::new(MemoryProvider::new("pkg"));
        provider.seed("pkg-1", widget(), PropertyBag::new().with("v", 1i64));
        provider.seed(
            "pkg-2",
            widget(),
            PropertyBag::new().with("target", PropertyValue::reference("apple")),
        );

        let old = Snapshot::new(vec![
            resource("apple", 1).with_id("pkg-1"),
            referencing("zebra", "apple").with_id("pkg-2"),
        ]);
        let mut plan = plan_with(&provider, Some(&old), None);

        let mut recorder = Recorder::default();
        plan.apply(Some(&mut recorder)).await.expect("apply succeeds");

        assert_eq!(
            recorder.events,
            vec![
                "before:delete 'zebra'",
                "after:delete 'zebra':ok",
                "before:delete 'apple'",
                "after:delete 'apple':ok",
            ]
        );
        assert!(provider.is_empty());
    }

    #[tokio::test]
    async fn update_passes_old_and_new_properties() {
        let provider = Arc::new(MemoryProvider::new("pkg"));
        provider.seed("pkg-1", widget(), PropertyBag::new().with("v", 1i64));

        let old = Snapshot::new(vec![
            resource("a", 1).with_id("pkg-1"),
            referencing("b", "a"),
        ]);
        let new = Snapshot::new(vec![resource("a", 2), referencing("b", "a")]);
        let mut plan = plan_with(&provider, Some(&old), Some(&new));

        assert_eq!(plan.len(), 1);
        plan.apply(None).await.expect("apply succeeds");

        let calls = provider.update_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id.as_str(), "pkg-1");
        assert_eq!(calls[0].old, PropertyBag::new().with("v", 1i64));
        assert_eq!(calls[0].new, PropertyBag::new().with("v", 2i64));
    }

    #[tokio::test]
    async fn replacement_update_adopts_new_id() {
        let provider = Arc::new(MemoryProvider::new("pkg").with_replacement(widget()));
        provider.seed("pkg-1", widget(), PropertyBag::new().with("v", 1i64));

        let old = Snapshot::new(vec![resource("a", 1).with_id("pkg-1")]);
        let new = Snapshot::new(vec![resource("a", 2)]);
        let mut plan = plan_with(&provider, Some(&old), Some(&new));

        plan.apply(None).await.expect("apply succeeds");

        let step = plan.steps().next().expect("one step");
        let adopted = step
            .new()
            .and_then(Resource::id)
            .expect("replacement id adopted");
        assert_ne!(adopted.as_str(), "pkg-1");
    }

    #[tokio::test]
    async fn in_place_update_keeps_resource_id_unset() {
        let provider = Arc::new(MemoryProvider::new("pkg"));
        provider.seed("pkg-1", widget(), PropertyBag::new().with("v", 1i64));

        let old = Snapshot::new(vec![resource("a", 1).with_id("pkg-1")]);
        let new = Snapshot::new(vec![resource("a", 2)]);
        let mut plan = plan_with(&provider, Some(&old), Some(&new));

        plan.apply(None).await.expect("apply succeeds");

        // No replacement was signaled, so the desired-state resource
        // is left untouched.
        let step = plan.steps().next().expect("one step");
        assert!(step.new().is_some_and(|r| !r.has_id()));
    }

    #[tokio::test]
    async fn failure_halts_the_walk() {
        let provider = Arc::new(MemoryProvider::new("pkg"));
        provider.fail_next(
            ResourceType::from("pkg.flaky"),
            "backend exploded",
            ResourceHealth::Corrupt,
        );

        // "sturdy" runs first (referenced by "wobbly"), then "wobbly"
        // fails, and "zzz" must never start.
        let new = Snapshot::new(vec![
            Resource::new(
                "wobbly",
                "pkg.flaky",
                PropertyBag::new().with("target", PropertyValue::reference("sturdy")),
            ),
            resource("sturdy", 1),
            Resource::new("zzz", "pkg.flaky", PropertyBag::new()),
        ]);
        let mut plan = plan_with(&provider, None, Some(&new));

        let mut recorder = Recorder::default();
        let failure = plan
            .apply(Some(&mut recorder))
            .await
            .expect_err("apply halts");

        assert_eq!(failure.moniker.as_str(), "wobbly");
        assert_eq!(failure.op, StepOp::Create);
        assert_eq!(failure.health, ResourceHealth::Corrupt);
        assert_eq!(
            recorder.events,
            vec![
                "before:create 'sturdy'",
                "after:create 'sturdy':ok",
                "before:create 'wobbly'",
                "after:create 'wobbly':err",
            ]
        );

        // The failed create assigned no id.
        let wobbly = plan
            .steps()
            .find(|s| s.moniker().as_str() == "wobbly")
            .expect("step present");
        assert!(wobbly.new().is_some_and(|r| !r.has_id()));
    }

    #[tokio::test]
    async fn unavailable_provider_fails_the_step() {
        let source = StaticProviderSource::new();
        let ctx = PlanContext::new(ProviderRegistry::new(Arc::new(source)));
        let new = Snapshot::new(vec![Resource::new("lone", "ghost.thing", PropertyBag::new())]);
        let mut plan = Plan::new(ctx, None, Some(&new)).expect("plan builds");

        let failure = plan.apply(None).await.expect_err("no provider");

        assert!(matches!(
            failure.error,
            StratusError::Provider(ProviderError::Unavailable { .. })
        ));
        assert_eq!(failure.health, ResourceHealth::Unknown);
    }

    #[tokio::test]
    async fn empty_plan_applies_to_nothing() {
        let provider = Arc::new(MemoryProvider::new("pkg"));
        let mut plan = plan_with(&provider, None, None);

        let mut recorder = Recorder::default();
        let health = plan
            .apply(Some(&mut recorder))
            .await
            .expect("empty apply succeeds");

        assert_eq!(health, ResourceHealth::Ok);
        assert!(recorder.events.is_empty());
        assert!(provider.is_empty());
    }

    #[tokio::test]
    async fn planning_errors_preempt_execution() {
        let new = Snapshot::new(vec![referencing("a", "b"), referencing("b", "a")]);
        let source = StaticProviderSource::new();
        let ctx = PlanContext::new(ProviderRegistry::new(Arc::new(source)));

        let err = Plan::new(ctx, None, Some(&new)).expect_err("cycle");
        assert!(matches!(
            err,
            StratusError::Plan(PlanError::CycleDetected { .. })
        ));
    }

    #[tokio::test]
    async fn round_trip_restores_original_state() {
        let provider = Arc::new(MemoryProvider::new("pkg"));

        // Actual state A: a standalone "db" and a "cache" that will be
        // dropped in B.
        provider.seed("pkg-1", widget(), PropertyBag::new().with("v", 1i64));
        provider.seed("pkg-2", widget(), PropertyBag::new().with("v", 9i64));
        let state_a = Snapshot::new(vec![
            resource("db", 1).with_id("pkg-1"),
            resource("cache", 9).with_id("pkg-2"),
        ]);

        // Desired state B: "cache" gone, "db" reconfigured, "worker" new.
        let desired_b = Snapshot::new(vec![resource("db", 2), resource("worker", 5)]);

        let mut forward = plan_with(&provider, Some(&state_a), Some(&desired_b));
        forward.apply(None).await.expect("forward apply");

        // Reconstruct actual state B from the provider's deterministic
        // ids: "db" kept pkg-1 (in-place update), "worker" was minted
        // next.
        let worker_id = provider
            .records()
            .into_iter()
            .map(|(id, _)| id)
            .find(|id| id.as_str() != "pkg-1")
            .expect("worker record");
        let state_b = Snapshot::new(vec![
            resource("db", 2).with_id("pkg-1"),
            resource("worker", 5).with_id(worker_id.as_str()),
        ]);

        // Desired state A again: same declared content as state A.
        let desired_a = Snapshot::new(vec![resource("db", 1), resource("cache", 9)]);
        let mut backward = plan_with(&provider, Some(&state_b), Some(&desired_a));
        backward.apply(None).await.expect("backward apply");

        // The provider ends up with exactly A's declared content.
        let mut contents: Vec<(ResourceType, PropertyBag)> = provider
            .records()
            .into_iter()
            .map(|(_, record)| (record.ty, record.properties))
            .collect();
        contents.sort_by(|a, b| format!("{:?}", a.1).cmp(&format!("{:?}", b.1)));

        let mut expected: Vec<(ResourceType, PropertyBag)> = state_a
            .iter()
            .map(|r| (r.ty().clone(), r.properties().clone()))
            .collect();
        expected.sort_by(|a, b| format!("{:?}", a.1).cmp(&format!("{:?}", b.1)));

        assert_eq!(contents, expected);
    }
}
