pub mod deploy;
pub mod destroy;
pub mod diff;
pub mod status;

use crate::manifest::Manifest;
use colored::Colorize;
use myzel_cloud::{ActionType, App, Environment, Plan, Reconciler};
use std::path::PathBuf;

/// What every command needs: the engine, the environment and where the
/// manifest lives
pub struct Context {
    pub reconciler: Reconciler,
    pub env: Environment,
    manifest: Option<PathBuf>,
}

impl Context {
    pub fn new(reconciler: Reconciler, env: Environment, manifest: Option<PathBuf>) -> Self {
        Self {
            reconciler,
            env,
            manifest,
        }
    }

    pub fn manifest_path(&self) -> anyhow::Result<PathBuf> {
        match &self.manifest {
            Some(path) => Ok(path.clone()),
            None => Ok(myzel_config::find_manifest()?),
        }
    }

    pub fn load_app(&self) -> anyhow::Result<App> {
        let path = self.manifest_path()?;
        tracing::debug!("Loading manifest {}", path.display());
        Manifest::load(&path)?.into_app(self.reconciler.registry(), self.env.clone())
    }
}

pub fn print_plan(app: &App, plan: &Plan) {
    println!("{} {}", "Plan for".bold(), app.name().cyan().bold());
    for action in plan.changes() {
        let marker = match action.action_type {
            ActionType::Create => action.action_type.symbol().green(),
            ActionType::Update => action.action_type.symbol().yellow(),
            ActionType::Delete => action.action_type.symbol().red(),
            ActionType::Keep => action.action_type.symbol().normal(),
        };
        println!(
            "  {} {} ({}) {}",
            marker,
            action.name.bold(),
            action.resource_type,
            action.description.dimmed()
        );
    }
    println!("{}", plan.summary());
}
