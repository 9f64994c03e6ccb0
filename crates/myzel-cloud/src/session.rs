//! Transactional deployment session
//!
//! A [`Session`] applies each resource the moment it is declared and writes
//! the state file after every step, together with a [`DeploymentProgress`]
//! record. If the process dies halfway, the file lists exactly the resources
//! that were applied, in order.
//!
//! ```ignore
//! let mut session = reconciler.begin(&app).await?;
//! let role_arn = session.add_resource("role", role).await?;
//! session.add_resource("function", function_using(role_arn)).await?;
//! session.commit().await?;
//! ```
//!
//! `commit` deletes everything the previous deployment had that this
//! session did not declare, newest first. Dropping the session without
//! committing (for instance on `?`) takes the abort path: nothing is rolled
//! back and the partial state stays on disk.

use crate::app::Environment;
use crate::error::{CloudError, Result};
use crate::registry::ResourceRegistry;
use crate::resource::{DeployedResource, Resource, same_config};
use crate::state::{
    DeploymentProgress, ReplacedResource, ResourceMapping, StateDocument, StateStore,
};
use indexmap::IndexMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionStatus {
    Open,
    Failed,
    Committed,
    Aborted,
}

/// Scoped deployment of one application; see the module docs
#[derive(Debug)]
pub struct Session {
    app_name: String,
    env: Arc<Environment>,
    registry: Arc<ResourceRegistry>,
    state_path: PathBuf,
    previous: IndexMap<String, DeployedResource>,
    state: StateDocument,
    /// Old objects of names whose resource kind changed, oldest first;
    /// removed on commit
    replaced: Vec<(String, DeployedResource)>,
    status: SessionStatus,
}

impl Session {
    pub(crate) fn new(
        app_name: impl Into<String>,
        env: Arc<Environment>,
        registry: Arc<ResourceRegistry>,
        state_path: PathBuf,
        previous: IndexMap<String, DeployedResource>,
        replaced: Vec<(String, DeployedResource)>,
    ) -> Self {
        let previous_mappings = previous
            .iter()
            .map(|(name, d)| (name.clone(), d.mapping.clone()))
            .collect();
        let mut progress = DeploymentProgress::new(previous_mappings);
        progress.replaced = replaced
            .iter()
            .map(|(name, d)| ReplacedResource {
                name: name.clone(),
                mapping: d.mapping.clone(),
            })
            .collect();
        let app_name = app_name.into();
        tracing::info!("Starting deployment for app: {}", app_name);
        Self {
            app_name,
            env,
            registry,
            state_path,
            previous,
            state: StateDocument {
                resources: IndexMap::new(),
                deployment_progress: Some(progress),
            },
            replaced,
            status: SessionStatus::Open,
        }
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// State as last persisted by this session
    pub fn state(&self) -> &StateDocument {
        &self.state
    }

    /// Resources that were deployed when the session started
    pub fn previous(&self) -> &IndexMap<String, DeployedResource> {
        &self.previous
    }

    pub fn progress(&self) -> Option<&DeploymentProgress> {
        self.state.deployment_progress.as_ref()
    }

    /// Deploy `resource` under `name` right away and record it.
    ///
    /// Creates it if `name` is new, updates the previous object if the
    /// configuration changed, and otherwise reuses the recorded id. Returns
    /// the technical id. Any failure closes the session.
    pub async fn add_resource(
        &mut self,
        name: impl Into<String>,
        resource: Arc<dyn Resource>,
    ) -> Result<String> {
        let name = name.into();
        self.ensure_open()?;
        if self.state.resources.contains_key(&name) {
            return Err(CloudError::DuplicateResource(name));
        }

        match self.apply(&name, resource.as_ref()).await {
            Ok(technical_id) => Ok(technical_id),
            Err(e) => {
                self.status = SessionStatus::Failed;
                Err(e)
            }
        }
    }

    async fn apply(&mut self, name: &str, resource: &dyn Resource) -> Result<String> {
        let tag = self.registry.type_tag_for(resource)?.to_string();
        let env = self.env.as_ref();

        let mut replaced = None;
        let technical_id = match self.previous.get(name) {
            Some(deployed) if deployed.resource_type() != tag => {
                tracing::info!(
                    "Replacing: {} ({} -> {})",
                    name,
                    deployed.resource_type(),
                    tag
                );
                let technical_id = resource.create(env).await?;
                replaced = Some(deployed.clone());
                technical_id
            }
            Some(deployed) if !same_config(resource, deployed.resource.as_ref()) => {
                tracing::info!("Updating: {} ({})", name, tag);
                deployed
                    .resource
                    .update(env, deployed.technical_id(), resource)
                    .await?
            }
            Some(deployed) => {
                tracing::info!("No changes: {} ({})", name, tag);
                deployed.technical_id().to_string()
            }
            None => {
                tracing::info!("Creating: {} ({})", name, tag);
                resource.create(env).await?
            }
        };
        tracing::info!("Deployed: {} -> {}", name, technical_id);

        self.state
            .set_resource(name, ResourceMapping::new(tag, technical_id.as_str()));
        let progress = self
            .state
            .deployment_progress
            .get_or_insert_with(|| DeploymentProgress::new(IndexMap::new()));
        progress.record(name);
        progress.previous.shift_remove(name);
        if let Some(old) = replaced {
            progress.replaced.push(ReplacedResource {
                name: name.to_string(),
                mapping: old.mapping.clone(),
            });
            self.replaced.push((name.to_string(), old));
        }

        self.persist().await?;
        Ok(technical_id)
    }

    /// Finish the deployment: delete what is no longer declared, then write
    /// the final state without progress.
    pub async fn commit(mut self) -> Result<StateDocument> {
        self.ensure_open()?;

        if let Err(e) = self.cleanup().await {
            self.status = SessionStatus::Failed;
            return Err(e);
        }

        self.state.deployment_progress = None;
        if let Err(e) = self.persist().await {
            self.status = SessionStatus::Failed;
            return Err(e);
        }
        self.status = SessionStatus::Committed;
        tracing::info!(
            "Deployment of {} complete ({} resources)",
            self.app_name,
            self.state.resources.len()
        );
        Ok(self.state.clone())
    }

    /// Stop without cleanup; the partial state stays on disk
    pub fn abort(mut self) {
        self.finish_aborted();
    }

    /// Resources no longer declared, in reverse of the order they were
    /// originally deployed
    fn undeclared(&self) -> Vec<(String, DeployedResource)> {
        self.previous
            .iter()
            .rev()
            .filter(|(name, _)| !self.state.resources.contains_key(*name))
            .map(|(name, d)| (name.clone(), d.clone()))
            .collect()
    }

    /// Kind changes first (newest first), then undeclared resources
    async fn cleanup(&mut self) -> Result<()> {
        let replaced: Vec<_> = self.replaced.iter().rev().cloned().collect();
        let undeclared = self.undeclared();
        if replaced.is_empty() && undeclared.is_empty() {
            tracing::info!("No resources to delete");
            return Ok(());
        }

        tracing::info!(
            "Deleting {} old resources in reverse order",
            replaced.len() + undeclared.len()
        );
        for (name, old) in replaced {
            tracing::info!("Deleting replaced: {} ({})", name, old.resource_type());
            old.resource
                .delete(self.env.as_ref(), old.technical_id())
                .await?;

            if let Some(progress) = self.state.deployment_progress.as_mut() {
                progress
                    .replaced
                    .retain(|r| r.name != name || r.mapping != old.mapping);
            }
            self.persist().await?;
        }

        for (name, deployed) in undeclared {
            tracing::info!("Deleting: {} ({})", name, deployed.resource_type());
            deployed
                .resource
                .delete(self.env.as_ref(), deployed.technical_id())
                .await?;

            if let Some(progress) = self.state.deployment_progress.as_mut() {
                progress.previous.shift_remove(&name);
            }
            self.persist().await?;
        }
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        StateStore::save_to(&self.state_path, &self.state).await
    }

    fn ensure_open(&self) -> Result<()> {
        match self.status {
            SessionStatus::Open => Ok(()),
            SessionStatus::Failed => Err(CloudError::SessionClosed(format!(
                "a previous step of the {} deployment failed",
                self.app_name
            ))),
            SessionStatus::Committed | SessionStatus::Aborted => Err(CloudError::SessionClosed(
                format!("the {} deployment has already finished", self.app_name),
            )),
        }
    }

    fn finish_aborted(&mut self) {
        if matches!(self.status, SessionStatus::Committed | SessionStatus::Aborted) {
            return;
        }
        let deployed = self.progress().map(|p| p.total_deployed).unwrap_or_default();
        if self.status == SessionStatus::Failed {
            tracing::warn!("Deployment of {} failed", self.app_name);
        }
        tracing::warn!(
            "Deployment of {} stopped; partial state with {} deployed resources kept at {}",
            self.app_name,
            deployed,
            self.state_path.display()
        );
        self.status = SessionStatus::Aborted;
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.finish_aborted();
    }
}
