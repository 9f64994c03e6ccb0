//! Local filesystem provider for Myzel
//!
//! Maps the bucket/object model onto directories and files so that the whole
//! engine can be exercised without cloud credentials.
//!
//! | tag            | resource          | on disk                  |
//! |----------------|-------------------|--------------------------|
//! | `local-bucket` | [`LocalBucket`]   | `<root>/<name>/`         |
//! | `local-object` | [`LocalObject`]   | `<root>/<bucket>/<key>`  |
//!
//! The root directory is taken from `Environment.region` when it is set,
//! then from `MYZEL_LOCAL_ROOT`, and falls back to `./.myzel/local`.
//!
//! # Example
//!
//! ```ignore
//! use myzel_cloud::{App, Environment, Reconciler, StateStore};
//! use myzel_cloud_local::{LocalBucket, LocalObject};
//! use std::sync::Arc;
//!
//! let registry = Arc::new(myzel_cloud_local::registry()?);
//! let reconciler = Reconciler::new(registry, StateStore::new("config"));
//!
//! let app = App::new("site", Environment::default())
//!     .with_resource("assets", LocalBucket::new("site-assets"))
//!     .with_resource("index", LocalObject::new("site-assets", "index.html", "<h1>hi</h1>"));
//! reconciler.deploy_incremental(&app).await?;
//! ```

pub mod bucket;
pub mod error;
pub mod object;

pub use bucket::LocalBucket;
pub use error::{LocalError, Result};
pub use object::LocalObject;

use myzel_cloud::{Environment, RegistryBuilder, ResourceRegistry, RetryConfig};
use std::path::PathBuf;
use std::time::Duration;

pub const BUCKET_TAG: &str = "local-bucket";
pub const OBJECT_TAG: &str = "local-object";

/// Buckets go after the objects they hold
pub const BUCKET_DESTROY_PRIORITY: i32 = 200;
pub const OBJECT_DESTROY_PRIORITY: i32 = 50;

const ROOT_VAR: &str = "MYZEL_LOCAL_ROOT";
const DEFAULT_ROOT: &str = ".myzel/local";

/// Directory that plays the role of the cloud account
pub fn root_dir(env: &Environment) -> PathBuf {
    if let Some(region) = env.region.as_deref().filter(|r| !r.is_empty()) {
        return PathBuf::from(region);
    }
    std::env::var_os(ROOT_VAR)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ROOT))
}

/// Add the local kinds to a registry under construction
pub fn register(builder: RegistryBuilder) -> RegistryBuilder {
    builder
        .register_with_priority::<LocalBucket>(BUCKET_TAG, BUCKET_DESTROY_PRIORITY)
        .register_with_priority::<LocalObject>(OBJECT_TAG, OBJECT_DESTROY_PRIORITY)
}

/// A registry holding only the local kinds
pub fn registry() -> myzel_cloud::Result<ResourceRegistry> {
    register(ResourceRegistry::builder()).build()
}

/// Filesystem changes are visible immediately; keep the polling short
pub(crate) fn retry_config() -> RetryConfig {
    RetryConfig {
        max_attempts: 5,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(200),
        ..RetryConfig::default()
    }
}
