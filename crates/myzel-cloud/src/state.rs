//! State management for deployed resources
//!
//! Manages the `app_<name>.yaml` file which maps every logical resource
//! name to the `{type, technical_id}` it was deployed as. The file is the
//! only record of what is deployed across process restarts.

use crate::error::{CloudError, Result};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio::fs;

const BACKUP_SUFFIX: &str = "backup";
const TMP_SUFFIX: &str = "tmp";

/// Recorded identity of one deployed resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMapping {
    /// Registry tag of the resource kind
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Provider-assigned identifier
    #[serde(alias = "tech_id")]
    pub technical_id: String,
}

impl ResourceMapping {
    pub fn new(resource_type: impl Into<String>, technical_id: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            technical_id: technical_id.into(),
        }
    }
}

/// An object whose logical name now points at a resource of another kind.
/// It stays recorded until the session that replaced it deletes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacedResource {
    pub name: String,
    #[serde(flatten)]
    pub mapping: ResourceMapping,
}

/// Progress of a transactional deployment that has not finished yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentProgress {
    pub total_deployed: usize,

    /// Names applied so far, in application order
    pub deployed_resource_ids: Vec<String>,

    pub timestamp: DateTime<Utc>,

    /// Previously deployed resources this run has not re-declared or
    /// cleaned up yet
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub previous: IndexMap<String, ResourceMapping>,

    /// Old objects of names whose kind changed, still to be deleted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub replaced: Vec<ReplacedResource>,
}

impl DeploymentProgress {
    pub fn new(previous: IndexMap<String, ResourceMapping>) -> Self {
        Self {
            total_deployed: 0,
            deployed_resource_ids: Vec::new(),
            timestamp: Utc::now(),
            previous,
            replaced: Vec::new(),
        }
    }

    /// Record a successfully applied resource
    pub fn record(&mut self, name: impl Into<String>) {
        self.deployed_resource_ids.push(name.into());
        self.total_deployed = self.deployed_resource_ids.len();
        self.timestamp = Utc::now();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.deployed_resource_ids.iter().any(|id| id == name)
    }
}

/// Persisted deployment state of one application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDocument {
    #[serde(default)]
    pub resources: IndexMap<String, ResourceMapping>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_progress: Option<DeploymentProgress>,
}

impl StateDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.deployment_progress.is_none()
    }

    /// Add or replace a resource, keeping its original position
    pub fn set_resource(&mut self, name: impl Into<String>, mapping: ResourceMapping) {
        self.resources.insert(name.into(), mapping);
    }

    /// Remove a resource, preserving the order of the rest
    pub fn remove_resource(&mut self, name: &str) -> Option<ResourceMapping> {
        self.resources.shift_remove(name)
    }

    pub fn get_resource(&self, name: &str) -> Option<&ResourceMapping> {
        self.resources.get(name)
    }

    /// Resources the engine should treat as deployed.
    ///
    /// A document left behind by an interrupted session only lists what that
    /// session applied; the resources it had not reached yet are carried in
    /// `deployment_progress.previous` and are merged back here.
    pub fn deployed_mappings(&self) -> IndexMap<String, ResourceMapping> {
        let mut mappings = self.resources.clone();
        if let Some(progress) = &self.deployment_progress {
            for (name, mapping) in &progress.previous {
                if !mappings.contains_key(name) {
                    mappings.insert(name.clone(), mapping.clone());
                }
            }
        }
        mappings
    }

    /// Replaced objects an interrupted session left for deletion
    pub fn replaced(&self) -> &[ReplacedResource] {
        self.deployment_progress
            .as_ref()
            .map(|p| p.replaced.as_slice())
            .unwrap_or_default()
    }

    fn validate(&self, path: &Path) -> Result<()> {
        let invalid = |reason: String| CloudError::InvalidState {
            path: path.to_path_buf(),
            reason,
        };

        let check = |name: &str, mapping: &ResourceMapping| {
            if name.is_empty() {
                return Err(invalid("empty resource name".to_string()));
            }
            if mapping.resource_type.is_empty() {
                return Err(invalid(format!("resource '{}' has an empty type", name)));
            }
            if mapping.technical_id.is_empty() {
                return Err(invalid(format!(
                    "resource '{}' has an empty technical_id",
                    name
                )));
            }
            Ok(())
        };

        for (name, mapping) in &self.resources {
            check(name, mapping)?;
        }

        if let Some(progress) = &self.deployment_progress {
            if progress.total_deployed != progress.deployed_resource_ids.len() {
                return Err(invalid(format!(
                    "total_deployed is {} but {} resource ids are listed",
                    progress.total_deployed,
                    progress.deployed_resource_ids.len()
                )));
            }
            let mut seen = HashSet::new();
            for id in &progress.deployed_resource_ids {
                if !seen.insert(id.as_str()) {
                    return Err(invalid(format!("resource id '{}' listed twice", id)));
                }
            }
            for (name, mapping) in &progress.previous {
                check(name, mapping)?;
            }
            for entry in &progress.replaced {
                check(&entry.name, &entry.mapping)?;
            }
        }

        Ok(())
    }
}

/// Reads and writes state documents under a configuration directory
#[derive(Debug, Clone)]
pub struct StateStore {
    config_dir: PathBuf,
}

impl StateStore {
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// `<config-dir>/app_<name>.yaml`
    pub fn state_path(&self, app_name: &str) -> PathBuf {
        myzel_config::state_file(&self.config_dir, app_name)
    }

    pub async fn load(&self, app_name: &str) -> Result<StateDocument> {
        Self::load_from(&self.state_path(app_name)).await
    }

    pub async fn save(&self, app_name: &str, state: &StateDocument) -> Result<()> {
        Self::save_to(&self.state_path(app_name), state).await
    }

    /// Load a state document, or an empty one if `path` does not exist
    pub async fn load_from(path: &Path) -> Result<StateDocument> {
        if !fs::try_exists(path).await? {
            tracing::debug!("State file {} not found, returning empty state", path.display());
            return Ok(StateDocument::new());
        }

        let content = fs::read_to_string(path).await?;
        if content.trim().is_empty() {
            return Ok(StateDocument::new());
        }

        let state: StateDocument =
            serde_yaml::from_str(&content).map_err(|e| CloudError::InvalidState {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        state.validate(path)?;

        tracing::debug!(
            "Loaded state with {} resources from {}",
            state.resources.len(),
            path.display()
        );
        Ok(state)
    }

    /// Atomically replace the state document at `path`
    pub async fn save_to(path: &Path, state: &StateDocument) -> Result<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if !fs::try_exists(dir).await? {
                fs::create_dir_all(dir).await?;
                tracing::debug!("Created state directory: {}", dir.display());
            }
        }

        if fs::try_exists(path).await? {
            fs::copy(path, sibling(path, BACKUP_SUFFIX)).await?;
        }

        let content = serde_yaml::to_string(state)?;
        let tmp = sibling(path, TMP_SUFFIX);
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, path).await?;

        tracing::debug!(
            "Saved state with {} resources to {}",
            state.resources.len(),
            path.display()
        );
        Ok(())
    }
}

/// `app_x.yaml` -> `app_x.yaml.<suffix>`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
