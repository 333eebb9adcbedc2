// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::missing_const_for_fn)] // Force const when possible
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::shadow_unrelated)]    // Shadowing unrelated variables warning

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Stratus Deploy
//!
//! A dependency-aware deployment planner and executor for declared
//! infrastructure resources.
//!
//! ## Overview
//!
//! Stratus computes the minimal ordered sequence of provider
//! operations that transforms one resource snapshot into another:
//!
//! - Diff the old and new snapshots, joining resources on moniker
//! - Order the resulting creates, updates, and deletes through a
//!   dependency graph built from resource references
//! - Apply the steps in sequence through pluggable providers, with
//!   progress reporting and halt-on-first-error semantics
//!
//! ## Architecture
//!
//! 1. **Snapshots** describe desired or actual state as ordered sets
//!    of resources with typed property bags
//! 2. **Planning** classifies every resource and sequences the steps;
//!    type changes and reference cycles abort planning
//! 3. **Execution** walks the finalized step chain, resolving a
//!    provider per step through the registry
//!
//! ## Modules
//!
//! - [`resource`]: Resource identity, property bags, and snapshots
//! - [`provider`]: Provider contract, registry, and the in-memory
//!   reference provider
//! - [`planner`]: Diff computation, step sequencing, and execution
//! - [`error`]: Error hierarchy for planning and execution
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use stratus_deploy::{
//!     MemoryProvider, Plan, PlanContext, PropertyBag, PropertyValue,
//!     ProviderRegistry, Resource, Snapshot, StaticProviderSource,
//! };
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let provider = Arc::new(MemoryProvider::new("pkg"));
//! let source = StaticProviderSource::new().with("pkg", provider);
//! let ctx = PlanContext::new(ProviderRegistry::new(Arc::new(source)));
//!
//! let desired = Snapshot::new(vec![
//!     Resource::new("net", "pkg.network", PropertyBag::new()),
//!     Resource::new(
//!         "web",
//!         "pkg.server",
//!         PropertyBag::new().with("vpc", PropertyValue::reference("net")),
//!     ),
//! ]);
//!
//! let mut plan = Plan::new(ctx, None, Some(&desired))?;
//! plan.apply(None).await?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod error;
pub mod planner;
pub mod provider;
pub mod resource;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{PlanError, ProviderError, Result, StratusError};
pub use planner::{
    ChangeKind, DiffEngine, Plan, PlanContext, PlannedChange, Progress, SnapshotDiff, Step,
    StepFailure, StepOp, Steps,
};
pub use provider::{
    Created, Deleted, MemoryProvider, Provider, ProviderRegistry, ProviderSource, Record,
    ResourceHealth, StaticProviderSource, Updated,
};
pub use resource::{
    Moniker, PropertyBag, PropertyValue, Resource, ResourceId, ResourceType, Snapshot,
    SnapshotHasher,
};
