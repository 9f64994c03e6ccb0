//! Resource contract
//!
//! Every resource kind (storage bucket, function, table, ...) implements
//! [`Resource`] for the per-instance operations and [`ResourceKind`] for
//! rehydration from a technical id. The engine only ever talks to
//! resources through these two traits.

use crate::app::Environment;
use crate::error::Result;
use crate::state::ResourceMapping;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Type-erased configuration equality
///
/// Implemented for every `PartialEq + 'static` type, so resource kinds only
/// need `#[derive(PartialEq)]` over their configuration fields.
pub trait ConfigEq {
    fn as_any(&self) -> &dyn Any;

    /// `true` when `other` is the same kind with equal configuration
    fn config_eq(&self, other: &dyn Any) -> bool;
}

impl<T: PartialEq + Any> ConfigEq for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn config_eq(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| self == other)
    }
}

/// Per-instance operations of a resource kind
///
/// Implementations absorb "does not exist" into the success path of each
/// operation: `delete` of a missing object is a no-op and `update` of a
/// missing object falls back to `desired.create()`. Only genuine provider
/// failures are returned as errors.
#[async_trait]
pub trait Resource: ConfigEq + fmt::Debug + Send + Sync + 'static {
    /// One-line description used in plans and logs
    fn describe(&self) -> String {
        format!("{self:?}")
    }

    /// Create the object, or adopt an existing one with the same identity.
    ///
    /// Must not return before the object is usable.
    async fn create(&self, env: &Environment) -> Result<String>;

    /// Move the object at `deployed_technical_id` toward `desired`.
    ///
    /// The returned id is authoritative; it differs from the input when the
    /// change required a replacement.
    async fn update(
        &self,
        env: &Environment,
        deployed_technical_id: &str,
        desired: &dyn Resource,
    ) -> Result<String>;

    /// Delete the object and everything it exclusively owns
    async fn delete(&self, env: &Environment, technical_id: &str) -> Result<()>;
}

/// Kind-level operations, used by the registry to rehydrate deployed state
#[async_trait]
pub trait ResourceKind: Resource + Sized + DeserializeOwned {
    /// Fetch the object behind `technical_id`.
    ///
    /// Returns a default instance instead of failing when the object is gone.
    async fn get(technical_id: &str, env: &Environment) -> Result<Self>;
}

/// Compare two resources by configuration
pub fn same_config(a: &dyn Resource, b: &dyn Resource) -> bool {
    a.config_eq(ConfigEq::as_any(b))
}

/// Downcast a type-erased resource to a concrete kind
pub fn downcast<T: Resource>(resource: &dyn Resource) -> Option<&T> {
    ConfigEq::as_any(resource).downcast_ref::<T>()
}

/// A resource recorded in state, rehydrated through the registry
#[derive(Debug, Clone)]
pub struct DeployedResource {
    pub mapping: ResourceMapping,
    pub resource: Arc<dyn Resource>,
}

impl DeployedResource {
    pub fn new(mapping: ResourceMapping, resource: Arc<dyn Resource>) -> Self {
        Self { mapping, resource }
    }

    pub fn technical_id(&self) -> &str {
        &self.mapping.technical_id
    }

    pub fn resource_type(&self) -> &str {
        &self.mapping.resource_type
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde::Deserialize;

    /// Minimal in-process resource used by unit tests in this crate
    #[derive(Debug, Clone, PartialEq, Deserialize)]
    pub(crate) struct Dummy(pub u32);

    #[async_trait]
    impl Resource for Dummy {
        async fn create(&self, _env: &Environment) -> Result<String> {
            Ok(format!("dummy:{}", self.0))
        }

        async fn update(
            &self,
            env: &Environment,
            _deployed_technical_id: &str,
            desired: &dyn Resource,
        ) -> Result<String> {
            desired.create(env).await
        }

        async fn delete(&self, _env: &Environment, _technical_id: &str) -> Result<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl ResourceKind for Dummy {
        async fn get(technical_id: &str, _env: &Environment) -> Result<Self> {
            let n = technical_id
                .strip_prefix("dummy:")
                .and_then(|n| n.parse().ok())
                .unwrap_or_default();
            Ok(Dummy(n))
        }
    }

    #[derive(Debug, PartialEq)]
    struct Other(u32);

    #[async_trait]
    impl Resource for Other {
        async fn create(&self, _env: &Environment) -> Result<String> {
            Ok("other".to_string())
        }

        async fn update(
            &self,
            _env: &Environment,
            deployed_technical_id: &str,
            _desired: &dyn Resource,
        ) -> Result<String> {
            Ok(deployed_technical_id.to_string())
        }

        async fn delete(&self, _env: &Environment, _technical_id: &str) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_same_config_compares_values() {
        assert!(same_config(&Dummy(1), &Dummy(1)));
        assert!(!same_config(&Dummy(1), &Dummy(2)));
    }

    #[test]
    fn test_same_config_across_kinds_is_false() {
        assert!(!same_config(&Dummy(1), &Other(1)));
        assert!(!same_config(&Other(1), &Dummy(1)));
    }

    #[test]
    fn test_downcast() {
        let erased: Arc<dyn Resource> = Arc::new(Dummy(7));
        assert_eq!(downcast::<Dummy>(erased.as_ref()), Some(&Dummy(7)));
        assert!(downcast::<Other>(erased.as_ref()).is_none());
    }

    #[tokio::test]
    async fn test_get_missing_returns_default() {
        let env = Environment::default();
        let dummy = Dummy::get("garbage", &env).await.unwrap();
        assert_eq!(dummy, Dummy(0));
    }
}
