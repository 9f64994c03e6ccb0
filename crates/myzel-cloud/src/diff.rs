//! Three-way diff between desired and deployed resources
//!
//! Names only in the desired set are created, names only in the deployed set
//! are deleted, and names in both are updated when their configuration
//! differs. Each partition keeps the iteration order of the map it came
//! from; sequencing between resources is up to the caller's declaration
//! order.

use crate::action::{Action, ActionType, Plan};
use crate::registry::ResourceRegistry;
use crate::resource::{DeployedResource, Resource, same_config};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

/// A name present on both sides whose configuration changed
#[derive(Debug, Clone)]
pub struct UpdateEntry {
    pub deployed: DeployedResource,
    pub desired: Arc<dyn Resource>,
}

/// Partition of logical names into create/update/delete sets
#[derive(Debug, Clone, Default)]
pub struct DiffResult {
    pub create: IndexMap<String, Arc<dyn Resource>>,
    pub update: IndexMap<String, UpdateEntry>,
    pub delete: IndexMap<String, DeployedResource>,

    /// Names present on both sides with equal configuration
    pub unchanged: Vec<String>,
}

/// Compute the diff of `desired` against `deployed`
pub fn compute_diff(
    desired: &IndexMap<String, Arc<dyn Resource>>,
    deployed: &IndexMap<String, DeployedResource>,
) -> DiffResult {
    let mut result = DiffResult::default();

    for (name, resource) in desired {
        match deployed.get(name) {
            None => {
                result.create.insert(name.clone(), Arc::clone(resource));
            }
            Some(current) if !same_config(resource.as_ref(), current.resource.as_ref()) => {
                result.update.insert(
                    name.clone(),
                    UpdateEntry {
                        deployed: current.clone(),
                        desired: Arc::clone(resource),
                    },
                );
            }
            Some(_) => result.unchanged.push(name.clone()),
        }
    }

    for (name, current) in deployed {
        if !desired.contains_key(name) {
            result.delete.insert(name.clone(), current.clone());
        }
    }

    result
}

#[derive(Serialize)]
struct UpdateReport {
    old: String,
    new: String,
}

#[derive(Serialize)]
struct DiffReport<'a> {
    create: IndexMap<&'a str, String>,
    update: IndexMap<&'a str, UpdateReport>,
    delete: IndexMap<&'a str, String>,
}

impl DiffResult {
    pub fn has_changes(&self) -> bool {
        !(self.create.is_empty() && self.update.is_empty() && self.delete.is_empty())
    }

    /// Flatten into a [`Plan`] in create, update, delete, unchanged order
    pub fn plan(&self, registry: &ResourceRegistry) -> Plan {
        let tag_of = |resource: &dyn Resource| {
            registry
                .type_tag_for(resource)
                .map(str::to_string)
                .unwrap_or_else(|_| "unknown".to_string())
        };

        let mut actions = Vec::new();
        for (name, resource) in &self.create {
            actions.push(Action {
                name: name.clone(),
                action_type: ActionType::Create,
                resource_type: tag_of(resource.as_ref()),
                description: resource.describe(),
            });
        }
        for (name, entry) in &self.update {
            actions.push(Action {
                name: name.clone(),
                action_type: ActionType::Update,
                resource_type: entry.deployed.resource_type().to_string(),
                description: format!(
                    "{} -> {}",
                    entry.deployed.resource.describe(),
                    entry.desired.describe()
                ),
            });
        }
        for (name, deployed) in &self.delete {
            actions.push(Action {
                name: name.clone(),
                action_type: ActionType::Delete,
                resource_type: deployed.resource_type().to_string(),
                description: deployed.technical_id().to_string(),
            });
        }
        for name in &self.unchanged {
            actions.push(Action {
                name: name.clone(),
                action_type: ActionType::Keep,
                resource_type: String::new(),
                description: String::new(),
            });
        }
        Plan::new(actions)
    }

    /// YAML report with `create`, `update` (old/new) and `delete` sections
    pub fn to_yaml_string(&self) -> crate::Result<String> {
        let report = DiffReport {
            create: self
                .create
                .iter()
                .map(|(name, r)| (name.as_str(), r.describe()))
                .collect(),
            update: self
                .update
                .iter()
                .map(|(name, e)| {
                    (
                        name.as_str(),
                        UpdateReport {
                            old: e.deployed.resource.describe(),
                            new: e.desired.describe(),
                        },
                    )
                })
                .collect(),
            delete: self
                .delete
                .iter()
                .map(|(name, d)| (name.as_str(), d.resource.describe()))
                .collect(),
        };
        Ok(serde_yaml::to_string(&report)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::tests::Dummy;
    use crate::state::ResourceMapping;

    fn desired(entries: &[(&str, u32)]) -> IndexMap<String, Arc<dyn Resource>> {
        entries
            .iter()
            .map(|(name, n)| (name.to_string(), Arc::new(Dummy(*n)) as Arc<dyn Resource>))
            .collect()
    }

    fn deployed(entries: &[(&str, u32)]) -> IndexMap<String, DeployedResource> {
        entries
            .iter()
            .map(|(name, n)| {
                (
                    name.to_string(),
                    DeployedResource::new(
                        ResourceMapping::new("dummy", format!("dummy:{}", n)),
                        Arc::new(Dummy(*n)),
                    ),
                )
            })
            .collect()
    }

    fn keys<V>(map: &IndexMap<String, V>) -> Vec<&str> {
        map.keys().map(String::as_str).collect()
    }

    #[test]
    fn test_partition() {
        let diff = compute_diff(
            &desired(&[("new", 1), ("same", 2), ("changed", 3)]),
            &deployed(&[("same", 2), ("changed", 4), ("gone", 5)]),
        );

        assert_eq!(keys(&diff.create), vec!["new"]);
        assert_eq!(keys(&diff.update), vec!["changed"]);
        assert_eq!(keys(&diff.delete), vec!["gone"]);
        assert_eq!(diff.unchanged, vec!["same".to_string()]);
        assert_eq!(diff.update["changed"].deployed.technical_id(), "dummy:4");
    }

    #[test]
    fn test_fresh_deploy_creates_everything() {
        let diff = compute_diff(&desired(&[("b", 1), ("a", 2)]), &IndexMap::new());
        assert_eq!(keys(&diff.create), vec!["b", "a"]);
        assert!(diff.update.is_empty() && diff.delete.is_empty());
    }

    #[test]
    fn test_identical_redeploy_has_no_changes() {
        let diff = compute_diff(&desired(&[("bucket", 1)]), &deployed(&[("bucket", 1)]));
        assert!(!diff.has_changes());
        assert_eq!(diff.unchanged.len(), 1);
    }

    #[test]
    fn test_empty_desired_deletes_everything() {
        let diff = compute_diff(&IndexMap::new(), &deployed(&[("bucket", 1)]));
        assert_eq!(keys(&diff.delete), vec!["bucket"]);
    }

    #[test]
    fn test_plan_and_report() {
        let registry = ResourceRegistry::builder()
            .register::<Dummy>("dummy")
            .build()
            .unwrap();
        let diff = compute_diff(
            &desired(&[("new", 1), ("changed", 3)]),
            &deployed(&[("changed", 4), ("gone", 5)]),
        );

        let plan = diff.plan(&registry);
        assert_eq!(
            plan.summary().to_string(),
            "1 to create, 1 to update, 1 to delete, 0 unchanged"
        );
        assert_eq!(plan.actions[0].resource_type, "dummy");

        let yaml = diff.to_yaml_string().unwrap();
        assert!(yaml.contains("create:"));
        assert!(yaml.contains("old: Dummy(4)"));
        assert!(yaml.contains("new: Dummy(3)"));
    }
}
