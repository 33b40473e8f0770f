use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;

use namebank_core::config::NamebankConfig;
use namebank_core::store::EntityStore;

use super::Context;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Config file whose [store] settings apply to the new database
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &InitArgs, ctx: &Context) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => NamebankConfig::load(path)
            .with_context(|| format!("Cannot load config: {}", path.display()))?,
        None => NamebankConfig::default(),
    };

    let existed = ctx.db.exists();
    let store = EntityStore::open_with_config(&ctx.db, &config)
        .with_context(|| format!("Cannot open database: {}", ctx.db.display()))?;
    store.shutdown().context("Failed to close database")?;

    if !ctx.quiet {
        if existed {
            println!("Database already initialized: {}", ctx.db.display());
        } else {
            println!("Initialized namebank database at {}", ctx.db.display());
        }
    }
    Ok(())
}
