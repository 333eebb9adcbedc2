//! Deterministic in-process provider.
//!
//! `MemoryProvider` keeps its records in memory and mints sequential
//! ids, which makes it the reference implementation for tests and for
//! exercising plans without touching a real system. It supports
//! per-type replacement semantics and scripted failures.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::resource::{PropertyBag, ResourceId, ResourceType};

use super::{Created, Deleted, Provider, ProviderSource, ResourceHealth, Updated};

/// A materialized record held by a [`MemoryProvider`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Declared type of the record.
    pub ty: ResourceType,
    /// Properties as last written.
    pub properties: PropertyBag,
}

/// Arguments of an observed update call.
#[derive(Debug, Clone)]
pub struct UpdateCall {
    /// Id the update targeted.
    pub id: ResourceId,
    /// Old properties the planner passed.
    pub old: PropertyBag,
    /// New properties the planner passed.
    pub new: PropertyBag,
}

/// A scripted failure for the next operation touching a type.
#[derive(Debug)]
struct Failure {
    message: String,
    health: ResourceHealth,
}

#[derive(Debug, Default)]
struct Inner {
    records: BTreeMap<ResourceId, Record>,
    update_calls: Vec<UpdateCall>,
    failures: BTreeMap<ResourceType, Failure>,
    next_serial: u64,
}

/// In-memory provider for a single package.
#[derive(Debug)]
pub struct MemoryProvider {
    /// Package this provider serves; minted ids are prefixed with it.
    package: String,
    /// Types whose updates are realized as replacements.
    replace_types: BTreeSet<ResourceType>,
    inner: Mutex<Inner>,
}

impl MemoryProvider {
    /// Creates a provider for the given package.
    #[must_use]
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            replace_types: BTreeSet::new(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Marks a type as replace-on-update: updates to it delete the old
    /// record and mint a fresh id.
    #[must_use]
    pub fn with_replacement(mut self, ty: impl Into<ResourceType>) -> Self {
        self.replace_types.insert(ty.into());
        self
    }

    /// Preloads a record, as if it had been created earlier.
    pub fn seed(
        &self,
        id: impl Into<ResourceId>,
        ty: impl Into<ResourceType>,
        properties: PropertyBag,
    ) {
        let mut inner = self.lock();
        inner.records.insert(
            id.into(),
            Record {
                ty: ty.into(),
                properties,
            },
        );
    }

    /// Scripts a failure for the next operation touching the given
    /// type. The script is consumed by that operation.
    pub fn fail_next(
        &self,
        ty: impl Into<ResourceType>,
        message: impl Into<String>,
        health: ResourceHealth,
    ) {
        let mut inner = self.lock();
        inner.failures.insert(
            ty.into(),
            Failure {
                message: message.into(),
                health,
            },
        );
    }

    /// Returns a copy of the live records, ordered by id.
    #[must_use]
    pub fn records(&self) -> Vec<(ResourceId, Record)> {
        self.lock()
            .records
            .iter()
            .map(|(id, record)| (id.clone(), record.clone()))
            .collect()
    }

    /// Returns the update calls observed so far, in order.
    #[must_use]
    pub fn update_calls(&self) -> Vec<UpdateCall> {
        self.lock().update_calls.clone()
    }

    /// Returns the number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Returns true if no records are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mints the next free sequential id.
    fn mint_id(&self, inner: &mut Inner) -> ResourceId {
        loop {
            inner.next_serial += 1;
            let candidate = ResourceId::new(format!("{}-{}", self.package, inner.next_serial));
            if !inner.records.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

/// Pops a scripted failure for the type, if one is pending.
fn take_failure(inner: &mut Inner, ty: &ResourceType) -> std::result::Result<(), ProviderError> {
    match inner.failures.remove(ty) {
        Some(failure) => Err(ProviderError::operation(failure.message, failure.health)),
        None => Ok(()),
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    async fn create(
        &self,
        ty: &ResourceType,
        properties: &PropertyBag,
    ) -> std::result::Result<Created, ProviderError> {
        let mut inner = self.lock();
        take_failure(&mut inner, ty)?;

        let id = self.mint_id(&mut inner);
        inner.records.insert(
            id.clone(),
            Record {
                ty: ty.clone(),
                properties: properties.clone(),
            },
        );

        Ok(Created {
            id,
            health: ResourceHealth::Ok,
        })
    }

    async fn update(
        &self,
        id: &ResourceId,
        ty: &ResourceType,
        old_properties: &PropertyBag,
        new_properties: &PropertyBag,
    ) -> std::result::Result<Updated, ProviderError> {
        let mut inner = self.lock();
        take_failure(&mut inner, ty)?;

        inner.update_calls.push(UpdateCall {
            id: id.clone(),
            old: old_properties.clone(),
            new: new_properties.clone(),
        });

        if !inner.records.contains_key(id) {
            return Err(ProviderError::operation(
                format!("no record '{id}' to update"),
                ResourceHealth::Unknown,
            ));
        }

        if self.replace_types.contains(ty) {
            inner.records.remove(id);
            let replacement = self.mint_id(&mut inner);
            inner.records.insert(
                replacement.clone(),
                Record {
                    ty: ty.clone(),
                    properties: new_properties.clone(),
                },
            );
            return Ok(Updated {
                replacement: Some(replacement),
                health: ResourceHealth::Ok,
            });
        }

        if let Some(record) = inner.records.get_mut(id) {
            record.properties = new_properties.clone();
        }
        Ok(Updated {
            replacement: None,
            health: ResourceHealth::Ok,
        })
    }

    async fn delete(
        &self,
        id: &ResourceId,
        ty: &ResourceType,
    ) -> std::result::Result<Deleted, ProviderError> {
        let mut inner = self.lock();
        take_failure(&mut inner, ty)?;

        if inner.records.remove(id).is_none() {
            return Err(ProviderError::operation(
                format!("no record '{id}' to delete"),
                ResourceHealth::Unknown,
            ));
        }

        Ok(Deleted {
            health: ResourceHealth::Ok,
        })
    }
}

/// Provider source backed by a fixed package map.
#[derive(Default)]
pub struct StaticProviderSource {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl StaticProviderSource {
    /// Creates an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider for a package, consuming and returning the
    /// source.
    #[must_use]
    pub fn with(mut self, package: impl Into<String>, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(package.into(), provider);
        self
    }
}

#[async_trait]
impl ProviderSource for StaticProviderSource {
    async fn acquire(
        &self,
        package: &str,
    ) -> std::result::Result<Arc<dyn Provider>, ProviderError> {
        self.providers
            .get(package)
            .map(Arc::clone)
            .ok_or_else(|| ProviderError::unavailable(package, "package not registered"))
    }
}

impl std::fmt::Debug for StaticProviderSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut packages: Vec<&String> = self.providers.keys().collect();
        packages.sort();
        f.debug_struct("StaticProviderSource")
            .field("packages", &packages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty() -> ResourceType {
        ResourceType::from("pkg.widget")
    }

    #[tokio::test]
    async fn create_mints_sequential_ids() {
        let provider = MemoryProvider::new("pkg");

        let first = provider
            .create(&ty(), &PropertyBag::new())
            .await
            .expect("create");
        let second = provider
            .create(&ty(), &PropertyBag::new())
            .await
            .expect("create");

        assert_eq!(first.id.as_str(), "pkg-1");
        assert_eq!(second.id.as_str(), "pkg-2");
        assert_eq!(provider.len(), 2);
    }

    #[tokio::test]
    async fn update_in_place_keeps_id() {
        let provider = MemoryProvider::new("pkg");
        provider.seed("pkg-7", ty(), PropertyBag::new().with("v", 1i64));

        let updated = provider
            .update(
                &ResourceId::from("pkg-7"),
                &ty(),
                &PropertyBag::new().with("v", 1i64),
                &PropertyBag::new().with("v", 2i64),
            )
            .await
            .expect("update");

        assert!(updated.replacement.is_none());
        let records = provider.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0.as_str(), "pkg-7");
        assert_eq!(
            records[0].1.properties,
            PropertyBag::new().with("v", 2i64)
        );
    }

    #[tokio::test]
    async fn replacement_update_mints_fresh_id() {
        let provider = MemoryProvider::new("pkg").with_replacement(ty());
        provider.seed("pkg-1", ty(), PropertyBag::new().with("v", 1i64));

        let updated = provider
            .update(
                &ResourceId::from("pkg-1"),
                &ty(),
                &PropertyBag::new().with("v", 1i64),
                &PropertyBag::new().with("v", 2i64),
            )
            .await
            .expect("update");

        let replacement = updated.replacement.expect("should replace");
        assert_ne!(replacement.as_str(), "pkg-1");
        let records = provider.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].0, replacement);
    }

    #[tokio::test]
    async fn delete_unknown_record_fails() {
        let provider = MemoryProvider::new("pkg");
        let err = provider
            .delete(&ResourceId::from("pkg-404"), &ty())
            .await
            .expect_err("missing record");

        assert!(matches!(err, ProviderError::OperationFailed { .. }));
    }

    #[tokio::test]
    async fn scripted_failure_is_consumed_once() {
        let provider = MemoryProvider::new("pkg");
        provider.fail_next(ty(), "quota exhausted", ResourceHealth::Pending);

        let err = provider
            .create(&ty(), &PropertyBag::new())
            .await
            .expect_err("scripted failure");
        assert_eq!(err.health(), ResourceHealth::Pending);

        provider
            .create(&ty(), &PropertyBag::new())
            .await
            .expect("second attempt succeeds");
    }

    #[tokio::test]
    async fn static_source_routes_known_packages_only() {
        let provider: Arc<dyn Provider> = Arc::new(MemoryProvider::new("pkg"));
        let source = StaticProviderSource::new().with("pkg", Arc::clone(&provider));

        source.acquire("pkg").await.expect("registered package");
        let err = source.acquire("ghost").await.expect_err("unregistered");
        assert!(matches!(err, ProviderError::Unavailable { .. }));
    }
}
