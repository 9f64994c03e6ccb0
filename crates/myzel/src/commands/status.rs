use super::Context;
use crate::manifest::Manifest;
use colored::Colorize;

pub async fn handle(ctx: &Context, app: Option<String>) -> anyhow::Result<()> {
    let app_name = match app {
        Some(name) => name,
        None => Manifest::load(&ctx.manifest_path()?)?.name,
    };
    let store = ctx.reconciler.store();
    let state = ctx.reconciler.status(&app_name).await?;

    println!("{} {}", "Application:".bold(), app_name.cyan().bold());
    println!("State file:  {}", store.state_path(&app_name).display());

    if state.resources.is_empty() {
        println!("No resources recorded");
    } else {
        let width = state.resources.keys().map(String::len).max().unwrap_or(0);
        for (name, mapping) in &state.resources {
            println!(
                "  {:width$}  {:14}  {}",
                name,
                mapping.resource_type,
                mapping.technical_id,
                width = width
            );
        }
    }

    if let Some(progress) = &state.deployment_progress {
        println!();
        println!(
            "{} deployment started at {} was interrupted after {} resources",
            "Warning:".yellow().bold(),
            progress.timestamp,
            progress.total_deployed
        );
        if !progress.previous.is_empty() {
            println!(
                "  {} resources from the earlier deployment are still pending cleanup",
                progress.previous.len()
            );
        }
        for replaced in &progress.replaced {
            println!(
                "  {} was replaced; its old {} {} is still to be deleted",
                replaced.name, replaced.mapping.resource_type, replaced.mapping.technical_id
            );
        }
    }
    Ok(())
}
