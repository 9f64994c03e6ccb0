//! Deploy, diff and destroy
//!
//! [`Reconciler::deploy`] is the batch path: it applies the whole diff and
//! writes the new state once at the end. If a provider call fails halfway,
//! the state file still describes the old deployment while reality has
//! already moved; prefer [`Reconciler::deploy_incremental`], which goes
//! through a [`Session`] and persists after every resource.

use crate::app::{App, Environment};
use crate::diff::{DiffResult, compute_diff};
use crate::error::Result;
use crate::registry::ResourceRegistry;
use crate::resource::DeployedResource;
use crate::session::Session;
use crate::state::{ResourceMapping, StateDocument, StateStore};
use indexmap::IndexMap;
use std::sync::Arc;

/// Applies desired resources of an [`App`] against its recorded state
#[derive(Debug, Clone)]
pub struct Reconciler {
    registry: Arc<ResourceRegistry>,
    store: StateStore,
}

impl Reconciler {
    pub fn new(registry: Arc<ResourceRegistry>, store: StateStore) -> Self {
        Self { registry, store }
    }

    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Recorded state of `app_name`, without contacting any provider
    pub async fn status(&self, app_name: &str) -> Result<StateDocument> {
        self.store.load(app_name).await
    }

    /// Load the recorded state and rehydrate every entry through the registry
    pub async fn deployed(
        &self,
        app_name: &str,
        env: &Environment,
    ) -> Result<(StateDocument, IndexMap<String, DeployedResource>)> {
        let state = self.store.load(app_name).await?;
        let deployed = self.rehydrate(&state.deployed_mappings(), env).await?;
        Ok((state, deployed))
    }

    pub(crate) async fn rehydrate(
        &self,
        mappings: &IndexMap<String, ResourceMapping>,
        env: &Environment,
    ) -> Result<IndexMap<String, DeployedResource>> {
        let mut deployed = IndexMap::with_capacity(mappings.len());
        for (name, mapping) in mappings {
            let resource = self.registry.rehydrate(mapping, env).await?;
            deployed.insert(name.clone(), DeployedResource::new(mapping.clone(), resource));
        }
        Ok(deployed)
    }

    /// Old objects of kind changes an interrupted session did not delete yet
    pub(crate) async fn leftovers(
        &self,
        state: &StateDocument,
        env: &Environment,
    ) -> Result<Vec<(String, DeployedResource)>> {
        let mut leftovers = Vec::with_capacity(state.replaced().len());
        for entry in state.replaced() {
            let resource = self.registry.rehydrate(&entry.mapping, env).await?;
            leftovers.push((
                entry.name.clone(),
                DeployedResource::new(entry.mapping.clone(), resource),
            ));
        }
        Ok(leftovers)
    }

    /// What a deploy would do, without applying anything
    pub async fn diff(&self, app: &App) -> Result<DiffResult> {
        let (_, deployed) = self.deployed(app.name(), app.env()).await?;
        Ok(compute_diff(app.resources(), &deployed))
    }

    /// Batch deploy: apply the whole diff, then replace the state file.
    ///
    /// Returns the state that was recorded before this run.
    pub async fn deploy(&self, app: &App) -> Result<StateDocument> {
        let (previous, deployed) = self.deployed(app.name(), app.env()).await?;
        let leftovers = self.leftovers(&previous, app.env()).await?;
        let diff = compute_diff(app.resources(), &deployed);
        tracing::info!(
            "Deploying {}: {} to create, {} to update, {} to delete",
            app.name(),
            diff.create.len(),
            diff.update.len(),
            diff.delete.len()
        );

        let mut next = StateDocument::new();
        let mut changes = 0usize;
        if let Err(e) = self
            .apply_batch(app, &diff, &deployed, &leftovers, &mut next, &mut changes)
            .await
        {
            tracing::warn!(
                "Deployment of {} failed after {} applied changes; {} was left unchanged and may no longer match what is deployed",
                app.name(),
                changes,
                self.store.state_path(app.name()).display()
            );
            return Err(e);
        }

        self.store.save(app.name(), &next).await?;
        tracing::info!("Deployed {} ({} changes)", app.name(), changes);
        Ok(previous)
    }

    async fn apply_batch(
        &self,
        app: &App,
        diff: &DiffResult,
        deployed: &IndexMap<String, DeployedResource>,
        leftovers: &[(String, DeployedResource)],
        next: &mut StateDocument,
        changes: &mut usize,
    ) -> Result<()> {
        let env = app.env();
        let mut replaced = Vec::new();

        for (name, resource) in app.resources() {
            let tag = self.registry.type_tag_for(resource.as_ref())?.to_string();

            let technical_id = if let Some(entry) = diff.update.get(name) {
                let id = if entry.deployed.resource_type() == tag {
                    tracing::info!("Updating {} ({})", name, tag);
                    entry
                        .deployed
                        .resource
                        .update(env, entry.deployed.technical_id(), resource.as_ref())
                        .await?
                } else {
                    tracing::info!(
                        "Replacing {} ({} -> {})",
                        name,
                        entry.deployed.resource_type(),
                        tag
                    );
                    replaced.push((name, &entry.deployed));
                    resource.create(env).await?
                };
                *changes += 1;
                id
            } else if let Some(current) = deployed.get(name) {
                current.technical_id().to_string()
            } else {
                tracing::info!("Creating {} ({})", name, tag);
                let id = resource.create(env).await?;
                *changes += 1;
                id
            };

            next.set_resource(name.clone(), ResourceMapping::new(tag, technical_id));
        }

        let leftovers = leftovers.iter().map(|(name, d)| (name, d));
        for (name, d) in diff.delete.iter().chain(replaced).chain(leftovers) {
            tracing::info!("Deleting {} ({})", name, d.resource_type());
            d.resource.delete(env, d.technical_id()).await?;
            *changes += 1;
        }

        Ok(())
    }

    /// Incremental deploy through a [`Session`]; returns the committed state
    pub async fn deploy_incremental(&self, app: &App) -> Result<StateDocument> {
        let mut session = self.begin(app).await?;
        for (name, resource) in app.resources() {
            session.add_resource(name.clone(), Arc::clone(resource)).await?;
        }
        session.commit().await
    }

    /// Open a transactional deployment session for `app`
    pub async fn begin(&self, app: &App) -> Result<Session> {
        let (state, previous) = self.deployed(app.name(), app.env()).await?;
        let leftovers = self.leftovers(&state, app.env()).await?;
        if let Some(progress) = &state.deployment_progress {
            tracing::warn!(
                "Previous deployment of {} was interrupted after {} resources (at {}); resuming",
                app.name(),
                progress.total_deployed,
                progress.timestamp
            );
        }
        Ok(Session::new(
            app.name(),
            app.shared_env(),
            Arc::clone(&self.registry),
            self.store.state_path(app.name()),
            previous,
            leftovers,
        ))
    }

    /// Delete every recorded resource, lowest destroy priority first.
    ///
    /// The state file is rewritten after each deletion, so a failure leaves
    /// an accurate list of what is still deployed.
    pub async fn destroy(&self, app: &App) -> Result<()> {
        let env = app.env();
        let state = self.store.load(app.name()).await?;

        for (name, leftover) in self.leftovers(&state, env).await? {
            tracing::info!("Deleting replaced {} ({})", name, leftover.resource_type());
            leftover
                .resource
                .delete(env, leftover.technical_id())
                .await?;
        }

        let mut remaining = StateDocument {
            resources: state.deployed_mappings(),
            deployment_progress: None,
        };
        let mut order: Vec<(String, ResourceMapping)> = remaining
            .resources
            .iter()
            .map(|(name, mapping)| (name.clone(), mapping.clone()))
            .collect();
        order.sort_by_key(|(_, mapping)| self.registry.destroy_priority(&mapping.resource_type));

        tracing::info!("Destroying {} resources of {}", order.len(), app.name());
        for (name, mapping) in order {
            let resource = self.registry.rehydrate(&mapping, env).await?;
            tracing::info!("Deleting {} ({})", name, mapping.resource_type);
            resource.delete(env, &mapping.technical_id).await?;
            remaining.remove_resource(&name);
            self.store.save(app.name(), &remaining).await?;
        }

        self.store.save(app.name(), &StateDocument::new()).await?;
        Ok(())
    }
}
