use super::{Context, print_plan};
use colored::Colorize;

pub async fn handle(ctx: &Context, batch: bool, yes: bool) -> anyhow::Result<()> {
    let app = ctx.load_app()?;
    let diff = ctx.reconciler.diff(&app).await?;
    let interrupted = ctx
        .reconciler
        .status(app.name())
        .await?
        .deployment_progress
        .is_some();

    if !diff.has_changes() && !interrupted {
        println!("{} {} is up to date", "No changes.".green(), app.name().cyan());
        return Ok(());
    }

    print_plan(&app, &diff.plan(ctx.reconciler.registry()));
    if interrupted {
        println!(
            "{}",
            "The previous deployment was interrupted; it will be resumed.".yellow()
        );
    }

    if !yes {
        println!();
        println!("Run again with --yes to apply these changes");
        return Ok(());
    }

    println!();
    let state = if batch {
        ctx.reconciler.deploy(&app).await?;
        ctx.reconciler.status(app.name()).await?
    } else {
        ctx.reconciler.deploy_incremental(&app).await?
    };

    println!(
        "{} Deployed {} ({} resources)",
        "✓".green(),
        app.name().cyan().bold(),
        state.resources.len()
    );
    Ok(())
}
