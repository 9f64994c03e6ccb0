use super::{Context, print_plan};
use colored::Colorize;

pub async fn handle(ctx: &Context, yaml: bool) -> anyhow::Result<()> {
    let app = ctx.load_app()?;
    let diff = ctx.reconciler.diff(&app).await?;

    if yaml {
        print!("{}", diff.to_yaml_string()?);
        return Ok(());
    }

    if !diff.has_changes() {
        println!("{} {} is up to date", "No changes.".green(), app.name().cyan());
        return Ok(());
    }
    print_plan(&app, &diff.plan(ctx.reconciler.registry()));
    Ok(())
}
