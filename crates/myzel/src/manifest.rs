//! YAML application manifest
//!
//! ```yaml
//! name: demo
//! resources:
//!   assets: { type: local-bucket, name: demo-assets }
//!   index:  { type: local-object, bucket: demo-assets, key: index.html, content: "<h1>hi</h1>" }
//! ```
//!
//! Resources are deployed in the order they appear in the file.

use anyhow::{Context, bail};
use indexmap::IndexMap;
use myzel_cloud::{App, Environment, ResourceRegistry};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Manifest {
    pub name: String,
    #[serde(default)]
    pub resources: IndexMap<String, ResourceEntry>,
}

/// One resource: its registry tag plus the fields of that kind
#[derive(Debug, Deserialize)]
pub struct ResourceEntry {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl Manifest {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid manifest {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let manifest: Manifest = serde_yaml::from_str(content)?;
        if manifest.name.trim().is_empty() {
            bail!("application name must not be empty");
        }
        if manifest.name.contains(['/', '\\']) {
            bail!("application name must not contain path separators: {}", manifest.name);
        }
        Ok(manifest)
    }

    /// Build the [`App`], decoding every entry through `registry`
    pub fn into_app(self, registry: &ResourceRegistry, env: Environment) -> anyhow::Result<App> {
        let mut app = App::new(self.name, env);
        for (name, entry) in self.resources {
            let resource = registry
                .decode(&entry.kind, serde_json::Value::Object(entry.fields))
                .with_context(|| format!("Resource '{}'", name))?;
            app.add_resource(name, resource);
        }
        Ok(app)
    }
}
