//! Lazy, cached provider resolution by package.
//!
//! The registry routes a resource type's package segment to the
//! provider responsible for it. Providers are acquired on first use
//! and cached for the lifetime of the planner context.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tracing::debug;

use crate::error::ProviderError;

use super::Provider;

/// A source of providers, keyed by package.
///
/// Sources are external collaborators: they may spawn out-of-process
/// plugins, open network connections, or hand out in-process
/// implementations. Acquisition is allowed to block; the registry
/// never holds its cache lock while calling into a source.
#[async_trait]
pub trait ProviderSource: Send + Sync {
    /// Produces the provider responsible for a package.
    async fn acquire(&self, package: &str)
        -> std::result::Result<Arc<dyn Provider>, ProviderError>;
}

/// Registry mapping packages to providers, with lazy acquisition.
pub struct ProviderRegistry {
    /// Where providers come from.
    source: Arc<dyn ProviderSource>,
    /// Providers acquired so far. The lock is scoped to map access
    /// only and is never held across an acquisition.
    cache: Mutex<HashMap<String, Arc<dyn Provider>>>,
}

impl ProviderRegistry {
    /// Creates a registry backed by the given source.
    #[must_use]
    pub fn new(source: Arc<dyn ProviderSource>) -> Self {
        Self {
            source,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolves the provider for a package, acquiring it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Unavailable`] when the source cannot
    /// produce a provider for the package.
    pub async fn provider_for(
        &self,
        package: &str,
    ) -> std::result::Result<Arc<dyn Provider>, ProviderError> {
        {
            let cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(provider) = cache.get(package) {
                return Ok(Arc::clone(provider));
            }
        }

        let provider = self.source.acquire(package).await?;
        debug!("acquired provider for package '{package}'");

        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        let entry = cache
            .entry(package.to_string())
            .or_insert_with(|| Arc::clone(&provider));
        Ok(Arc::clone(entry))
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cached = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("ProviderRegistry")
            .field("cached_packages", &cached)
            .finish()
    }
}
