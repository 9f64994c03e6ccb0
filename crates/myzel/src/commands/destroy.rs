use super::Context;
use colored::Colorize;

pub async fn handle(ctx: &Context, yes: bool) -> anyhow::Result<()> {
    let app = ctx.load_app()?;
    let state = ctx.reconciler.status(app.name()).await?;
    let deployed = state.deployed_mappings();

    if deployed.is_empty() {
        println!("Nothing deployed for {}", app.name().cyan());
        return Ok(());
    }

    println!("{} {}", "Resources of".bold(), app.name().cyan().bold());
    for (name, mapping) in &deployed {
        println!(
            "  {} {} ({}) {}",
            "-".red(),
            name.bold(),
            mapping.resource_type,
            mapping.technical_id.dimmed()
        );
    }

    if !yes {
        println!();
        println!("Run again with --yes to delete these resources");
        return Ok(());
    }

    ctx.reconciler.destroy(&app).await?;
    println!(
        "{} Destroyed {} ({} resources)",
        "✓".green(),
        app.name().cyan().bold(),
        deployed.len()
    );
    Ok(())
}
