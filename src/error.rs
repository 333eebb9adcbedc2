//! Error types for the Stratus deployment planner.
//!
//! This module provides the error hierarchy for the two phases of a
//! deployment: planning (snapshot diffing and step sequencing) and
//! execution (provider operations driven by the step chain).

use thiserror::Error;

use crate::provider::ResourceHealth;
use crate::resource::{Moniker, ResourceType};

/// The main error type for the Stratus deployment planner.
#[derive(Debug, Error)]
pub enum StratusError {
    /// Planning errors.
    #[error("planning error: {0}")]
    Plan(#[from] PlanError),

    /// Provider errors.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Errors raised while constructing a plan.
///
/// Planning errors are fatal: no partial plan is ever returned.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The same moniker appears in both snapshots with diverging types.
    #[error("resource '{moniker}' changed type from '{old_ty}' to '{new_ty}'")]
    TypeMismatch {
        /// Moniker present in both snapshots.
        moniker: Moniker,
        /// Type recorded in the old snapshot.
        old_ty: ResourceType,
        /// Type declared in the new snapshot.
        new_ty: ResourceType,
    },

    /// The dependency graph contains a cycle and cannot be sequenced.
    #[error("dependency cycle among resources: {}", format_monikers(.members))]
    CycleDetected {
        /// Monikers of the steps that could not be sequenced.
        members: Vec<Moniker>,
    },
}

/// Errors raised by providers or while resolving them.
///
/// Provider errors surface as step errors at execute time; they never
/// abort plan construction.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No provider could be produced for a package.
    #[error("no provider available for package '{package}': {reason}")]
    Unavailable {
        /// Package segment the registry failed to route.
        package: String,
        /// Description of the acquisition failure.
        reason: String,
    },

    /// A provider operation failed.
    #[error("provider operation failed: {message}")]
    OperationFailed {
        /// Description of the failure.
        message: String,
        /// Health verdict the provider attached to the failure.
        health: ResourceHealth,
    },

    /// A provider returned a response that violates its contract.
    #[error("invalid provider response: {message}")]
    InvalidResponse {
        /// Description of the contract violation.
        message: String,
    },
}

/// Result type alias for Stratus operations.
pub type Result<T> = std::result::Result<T, StratusError>;

impl StratusError {
    /// Returns the health verdict attached to this error, if any.
    ///
    /// Planning errors carry no verdict and report `Unknown`.
    #[must_use]
    pub const fn health(&self) -> ResourceHealth {
        match self {
            Self::Provider(e) => e.health(),
            Self::Plan(_) => ResourceHealth::Unknown,
        }
    }
}

impl ProviderError {
    /// Creates an operation failure with the given health verdict.
    #[must_use]
    pub fn operation(message: impl Into<String>, health: ResourceHealth) -> Self {
        Self::OperationFailed {
            message: message.into(),
            health,
        }
    }

    /// Creates an unavailability error for a package.
    #[must_use]
    pub fn unavailable(package: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            package: package.into(),
            reason: reason.into(),
        }
    }

    /// Returns the health verdict attached to this error.
    ///
    /// Only failed operations carry a verdict; acquisition and contract
    /// errors report `Unknown`.
    #[must_use]
    pub const fn health(&self) -> ResourceHealth {
        match self {
            Self::OperationFailed { health, .. } => *health,
            Self::Unavailable { .. } | Self::InvalidResponse { .. } => ResourceHealth::Unknown,
        }
    }
}

/// Joins monikers into a comma-separated list for error messages.
fn format_monikers(monikers: &[Moniker]) -> String {
    monikers
        .iter()
        .map(Moniker::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
