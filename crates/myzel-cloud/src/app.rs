//! Application and environment definitions
//!
//! An [`App`] names one deployment: its state lives in `app_<name>.yaml`,
//! and every resource it declares is applied against the same
//! [`Environment`].

use crate::resource::Resource;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const PROFILE_VAR: &str = "MYZEL_PROFILE";
const ACCOUNT_VAR: &str = "MYZEL_ACCOUNT";
const REGION_VAR: &str = "MYZEL_REGION";

/// Credential/region/account context handed to every resource operation
///
/// The engine never interprets these values; they only mean something to
/// the provider implementations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub profile: Option<String>,
    pub account: Option<String>,
    pub region: Option<String>,
}

impl Environment {
    pub fn new(
        profile: Option<String>,
        account: Option<String>,
        region: Option<String>,
    ) -> Self {
        Self {
            profile,
            account,
            region,
        }
    }

    /// Read `MYZEL_PROFILE`, `MYZEL_ACCOUNT` and `MYZEL_REGION`
    pub fn from_env() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());
        Self {
            profile: var(PROFILE_VAR),
            account: var(ACCOUNT_VAR),
            region: var(REGION_VAR),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

/// A named application and the resources it wants deployed
///
/// Iteration order of the resources is the order they were added, and that
/// order is the order in which they are applied.
#[derive(Debug, Clone)]
pub struct App {
    name: String,
    env: Arc<Environment>,
    resources: IndexMap<String, Arc<dyn Resource>>,
}

impl App {
    pub fn new(name: impl Into<String>, env: Environment) -> Self {
        Self {
            name: name.into(),
            env: Arc::new(env),
            resources: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub(crate) fn shared_env(&self) -> Arc<Environment> {
        Arc::clone(&self.env)
    }

    /// Declare a resource; re-declaring a name replaces it in place
    pub fn with_resource(mut self, name: impl Into<String>, resource: impl Resource) -> Self {
        self.add_resource(name, Arc::new(resource));
        self
    }

    pub fn add_resource(&mut self, name: impl Into<String>, resource: Arc<dyn Resource>) {
        self.resources.insert(name.into(), resource);
    }

    pub fn resources(&self) -> &IndexMap<String, Arc<dyn Resource>> {
        &self.resources
    }
}
