use clap::Args;

use namebank_core::store::EntityReader;
use namebank_core::types::{NameSetRequest, Species};

use super::Context;

#[derive(Args, Debug)]
pub struct SampleArgs {
    /// Species to draw names from
    #[arg(long)]
    pub species: Species,

    /// Number of names to draw; 0 lists every qualifying name
    #[arg(long, default_value_t = 0)]
    pub count: usize,

    /// Minimum name length in characters
    #[arg(long, default_value_t = 1)]
    pub min_length: usize,

    /// Restrict to one project ("name version")
    #[arg(long)]
    pub project: Option<String>,

    /// Print each name as its space-separated tokens
    #[arg(long)]
    pub tokenised: bool,
}

pub fn run(args: &SampleArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_read_only()?;
    let request = NameSetRequest {
        project: args.project.clone(),
        species: args.species,
        count: args.count,
        min_length: args.min_length,
    };

    let names = if args.tokenised {
        store.tokenised_name_set_for(&request)?
    } else {
        store.name_set_for(&request)?
    };
    for name in names {
        println!("{name}");
    }
    Ok(())
}
