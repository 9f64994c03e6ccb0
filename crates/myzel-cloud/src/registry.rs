//! Resource registry
//!
//! Maps the short type tag stored in state files to the resource kind that
//! can rehydrate it, and maps live resource instances back to their tag.
//!
//! The registry is filled once at startup and is read-only afterwards.
//! Applications that want a process-wide instance call [`install`] exactly
//! once before the first reconciliation and fetch it with [`global`].

use crate::app::Environment;
use crate::error::{CloudError, Result};
use crate::resource::{BoxFuture, ConfigEq, Resource, ResourceKind};
use crate::state::ResourceMapping;
use std::any::Any;
use std::sync::{Arc, OnceLock};

/// Destroy priority for kinds registered without one
pub const DEFAULT_DESTROY_PRIORITY: i32 = 100;

type Rehydrator =
    for<'a> fn(&'a str, &'a Environment) -> BoxFuture<'a, Result<Arc<dyn Resource>>>;
type Decoder = fn(serde_json::Value) -> Result<Arc<dyn Resource>>;
type Matcher = fn(&dyn Any) -> bool;

static GLOBAL: OnceLock<Arc<ResourceRegistry>> = OnceLock::new();

struct Registration {
    tag: String,
    type_name: &'static str,
    destroy_priority: i32,
    matches: Matcher,
    rehydrate: Rehydrator,
    decode: Decoder,
}

fn matches_kind<T: 'static>(resource: &dyn Any) -> bool {
    resource.is::<T>()
}

fn rehydrate_kind<'a, T: ResourceKind>(
    technical_id: &'a str,
    env: &'a Environment,
) -> BoxFuture<'a, Result<Arc<dyn Resource>>> {
    Box::pin(async move {
        let resource: Arc<dyn Resource> = Arc::new(T::get(technical_id, env).await?);
        Ok(resource)
    })
}

fn decode_kind<T: ResourceKind>(config: serde_json::Value) -> Result<Arc<dyn Resource>> {
    let resource: T = serde_json::from_value(config)?;
    Ok(Arc::new(resource))
}

/// Tag ⟷ kind table
pub struct ResourceRegistry {
    entries: Vec<Registration>,
}

impl std::fmt::Debug for ResourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.entries.iter().map(|e| (&e.tag, e.type_name)))
            .finish()
    }
}

impl ResourceRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Registered tags, in registration order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.tag.as_str())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.entry(tag).is_some()
    }

    fn entry(&self, tag: &str) -> Option<&Registration> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    /// Tag of a live resource; the first registration whose kind matches wins
    pub fn type_tag_for(&self, resource: &dyn Resource) -> Result<&str> {
        let any = ConfigEq::as_any(resource);
        self.entries
            .iter()
            .find(|e| (e.matches)(any))
            .map(|e| e.tag.as_str())
            .ok_or_else(|| CloudError::UnregisteredResource(resource.describe()))
    }

    /// Rebuild the resource recorded under `mapping` via its kind's `get`
    pub async fn rehydrate(
        &self,
        mapping: &ResourceMapping,
        env: &Environment,
    ) -> Result<Arc<dyn Resource>> {
        let entry = self
            .entry(&mapping.resource_type)
            .ok_or_else(|| CloudError::UnknownResourceType(mapping.resource_type.clone()))?;
        (entry.rehydrate)(&mapping.technical_id, env).await
    }

    /// Build a resource of kind `tag` from its configuration fields
    pub fn decode(&self, tag: &str, config: serde_json::Value) -> Result<Arc<dyn Resource>> {
        let entry = self
            .entry(tag)
            .ok_or_else(|| CloudError::UnknownResourceType(tag.to_string()))?;
        (entry.decode)(config)
            .map_err(|e| CloudError::InvalidConfig(format!("{} resource: {}", tag, e)))
    }

    /// Lower priorities are destroyed first
    pub fn destroy_priority(&self, tag: &str) -> i32 {
        self.entry(tag)
            .map(|e| e.destroy_priority)
            .unwrap_or(DEFAULT_DESTROY_PRIORITY)
    }
}

/// Collects registrations; duplicate tags are reported by [`RegistryBuilder::build`]
#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<Registration>,
    duplicate: Option<String>,
}

impl RegistryBuilder {
    pub fn register<T: ResourceKind>(self, tag: impl Into<String>) -> Self {
        self.register_with_priority::<T>(tag, DEFAULT_DESTROY_PRIORITY)
    }

    pub fn register_with_priority<T: ResourceKind>(
        mut self,
        tag: impl Into<String>,
        destroy_priority: i32,
    ) -> Self {
        let tag = tag.into();
        if self.entries.iter().any(|e| e.tag == tag) {
            self.duplicate.get_or_insert(tag);
            return self;
        }
        self.entries.push(Registration {
            tag,
            type_name: std::any::type_name::<T>(),
            destroy_priority,
            matches: matches_kind::<T>,
            rehydrate: rehydrate_kind::<T>,
            decode: decode_kind::<T>,
        });
        self
    }

    pub fn build(self) -> Result<ResourceRegistry> {
        if let Some(tag) = self.duplicate {
            return Err(CloudError::DuplicateRegistration(tag));
        }
        tracing::debug!("Built resource registry with {} kinds", self.entries.len());
        Ok(ResourceRegistry {
            entries: self.entries,
        })
    }
}

/// Install the process-wide registry; only the first call succeeds
pub fn install(registry: ResourceRegistry) -> Result<Arc<ResourceRegistry>> {
    let registry = Arc::new(registry);
    GLOBAL
        .set(Arc::clone(&registry))
        .map_err(|_| CloudError::RegistryAlreadyInitialized)?;
    Ok(registry)
}

/// The registry installed by [`install`]
pub fn global() -> Result<Arc<ResourceRegistry>> {
    GLOBAL
        .get()
        .cloned()
        .ok_or(CloudError::RegistryNotInitialized)
}
