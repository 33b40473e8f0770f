use clap::Args;

use anyhow::Context as _;

use super::Context;

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Print statistics as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &StatusArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_read_only()?;
    let stats = store.stats().context("Failed to read store stats")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("namebank status");
    println!();
    println!("  Database: {}", ctx.db.display());
    if stats.db_size_bytes > 0 {
        println!("  Size:     {}", format_bytes(stats.db_size_bytes));
    }
    println!();

    println!("  Projects: {}", stats.projects.len());
    for project in &stats.projects {
        println!("    {project}");
    }
    println!();

    println!("  Entities: {} total", stats.total_entities);
    if !stats.entities_by_species.is_empty() {
        let mut species: Vec<_> = stats.entities_by_species.iter().collect();
        species.sort_by(|a, b| b.1.cmp(a.1));
        for (name, count) in &species {
            println!("    {name:<20} {count:>6}");
        }
    }
    println!();

    println!("  Dictionaries:");
    for (name, count) in &stats.dictionary_sizes {
        println!("    {name:<20} {count:>6}");
    }

    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
