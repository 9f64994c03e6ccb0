//! In-memory fake cloud shared by the engine tests.
//!
//! Each test gets its own cloud, addressed through `Environment.account`, so
//! rehydration through `ResourceKind::get` finds the right one.

use async_trait::async_trait;
use myzel_cloud::{
    CloudError, Environment, Reconciler, Resource, ResourceKind, ResourceRegistry, Result,
    StateStore, downcast,
};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tempfile::TempDir;

static CLOUDS: OnceLock<Mutex<HashMap<String, Arc<FakeCloud>>>> = OnceLock::new();
static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

#[derive(Default)]
pub struct FakeCloud {
    objects: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashSet<String>>,
}

impl FakeCloud {
    /// A fresh cloud and the environment that addresses it
    pub fn new_env() -> (Arc<FakeCloud>, Environment) {
        let account = format!("acct-{}", NEXT_ID.fetch_add(1, Ordering::SeqCst));
        let cloud = Arc::new(FakeCloud::default());
        CLOUDS
            .get_or_init(Default::default)
            .lock()
            .unwrap()
            .insert(account.clone(), Arc::clone(&cloud));
        let env = Environment::new(None, Some(account), Some("test-1".to_string()));
        (cloud, env)
    }

    fn of(env: &Environment) -> Arc<FakeCloud> {
        let account = env.account.clone().unwrap_or_default();
        Arc::clone(
            CLOUDS
                .get_or_init(Default::default)
                .lock()
                .unwrap()
                .get(&account)
                .expect("unknown fake cloud"),
        )
    }

    /// Make the next `op` (create/update/delete) on `name` fail
    pub fn fail_on(&self, op: &str, name: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(format!("{} {}", op, name));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn exists(&self, id: &str) -> bool {
        self.objects.lock().unwrap().contains_key(id)
    }

    pub fn object_count(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Drop an object behind the engine's back
    pub fn vanish(&self, id: &str) {
        self.objects.lock().unwrap().remove(id);
    }

    fn call(&self, op: &str, name: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{} {}", op, name));
        if self
            .failures
            .lock()
            .unwrap()
            .remove(&format!("{} {}", op, name))
        {
            return Err(CloudError::ApiError(format!("injected {} failure for {}", op, name)));
        }
        Ok(())
    }

    fn get(&self, id: &str) -> Option<String> {
        self.objects.lock().unwrap().get(id).cloned()
    }

    fn put(&self, id: &str, config: String) {
        self.objects.lock().unwrap().insert(id.to_string(), config);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Bucket {
    pub name: String,
}

impl Bucket {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }

    fn arn(name: &str) -> String {
        format!("arn:fake:bucket:{}", name)
    }
}

#[async_trait]
impl Resource for Bucket {
    async fn create(&self, env: &Environment) -> Result<String> {
        let cloud = FakeCloud::of(env);
        cloud.call("create", &self.name)?;
        let arn = Self::arn(&self.name);
        if cloud.get(&arn).is_none() {
            cloud.put(&arn, self.name.clone());
        }
        Ok(arn)
    }

    async fn update(
        &self,
        env: &Environment,
        deployed_technical_id: &str,
        desired: &dyn Resource,
    ) -> Result<String> {
        let desired = downcast::<Bucket>(desired)
            .ok_or_else(|| CloudError::InvalidConfig("expected a bucket".to_string()))?;
        let cloud = FakeCloud::of(env);
        cloud.call("update", &desired.name)?;
        if cloud.get(deployed_technical_id).is_none() {
            return desired.create(env).await;
        }
        let arn = desired.create(env).await?;
        if arn != deployed_technical_id {
            cloud.vanish(deployed_technical_id);
        }
        Ok(arn)
    }

    async fn delete(&self, env: &Environment, technical_id: &str) -> Result<()> {
        let cloud = FakeCloud::of(env);
        cloud.call("delete", &self.name)?;
        cloud.vanish(technical_id);
        Ok(())
    }
}

#[async_trait]
impl ResourceKind for Bucket {
    async fn get(technical_id: &str, env: &Environment) -> Result<Self> {
        Ok(FakeCloud::of(env)
            .get(technical_id)
            .map(|name| Bucket { name })
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Function {
    pub name: String,
    pub runtime: String,
}

impl Function {
    pub fn new(name: &str, runtime: &str) -> Self {
        Self {
            name: name.to_string(),
            runtime: runtime.to_string(),
        }
    }

    fn arn(name: &str) -> String {
        format!("arn:fake:function:{}", name)
    }
}

#[async_trait]
impl Resource for Function {
    async fn create(&self, env: &Environment) -> Result<String> {
        let cloud = FakeCloud::of(env);
        cloud.call("create", &self.name)?;
        let arn = Self::arn(&self.name);
        cloud.put(&arn, format!("{}|{}", self.name, self.runtime));
        Ok(arn)
    }

    async fn update(
        &self,
        env: &Environment,
        deployed_technical_id: &str,
        desired: &dyn Resource,
    ) -> Result<String> {
        let desired = downcast::<Function>(desired)
            .ok_or_else(|| CloudError::InvalidConfig("expected a function".to_string()))?;
        let cloud = FakeCloud::of(env);
        cloud.call("update", &desired.name)?;
        if cloud.get(deployed_technical_id).is_none() {
            return desired.create(env).await;
        }
        let arn = Self::arn(&desired.name);
        if arn != deployed_technical_id {
            cloud.vanish(deployed_technical_id);
        }
        cloud.put(&arn, format!("{}|{}", desired.name, desired.runtime));
        Ok(arn)
    }

    async fn delete(&self, env: &Environment, technical_id: &str) -> Result<()> {
        let cloud = FakeCloud::of(env);
        cloud.call("delete", &self.name)?;
        cloud.vanish(technical_id);
        Ok(())
    }
}

#[async_trait]
impl ResourceKind for Function {
    async fn get(technical_id: &str, env: &Environment) -> Result<Self> {
        Ok(FakeCloud::of(env)
            .get(technical_id)
            .and_then(|config| {
                let (name, runtime) = config.split_once('|')?;
                Some(Function::new(name, runtime))
            })
            .unwrap_or_default())
    }
}

pub fn registry() -> Arc<ResourceRegistry> {
    Arc::new(
        ResourceRegistry::builder()
            .register_with_priority::<Bucket>("storage", 200)
            .register::<Function>("function")
            .build()
            .unwrap(),
    )
}

pub struct TestProject {
    pub root: TempDir,
    pub cloud: Arc<FakeCloud>,
    pub env: Environment,
    pub reconciler: Reconciler,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let (cloud, env) = FakeCloud::new_env();
        let reconciler = Reconciler::new(registry(), StateStore::new(root.path().join("config")));
        Self {
            root,
            cloud,
            env,
            reconciler,
        }
    }

    pub fn app(&self, name: &str) -> myzel_cloud::App {
        myzel_cloud::App::new(name, self.env.clone())
    }
}
