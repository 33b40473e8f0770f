use clap::{Args, ValueEnum};

use namebank_core::store::EntityReader;
use namebank_core::types::{ProgramEntity, Species};

use super::Context;

#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug)]
pub struct EntitiesArgs {
    /// Project as "name version"
    pub project: String,

    /// Restrict to one species
    #[arg(long)]
    pub species: Option<Species>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Args, Debug)]
pub struct InheritorsArgs {
    /// Simple type name, e.g. `Shape`
    pub name: String,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

pub fn run(args: &EntitiesArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_read_only()?;
    let entities = match args.species {
        Some(species) => store.entities_for_project_by_species(&args.project, species)?,
        None => store.entities_for_project(&args.project)?,
    };
    emit(&entities, args.format)
}

pub fn subclasses(args: &InheritorsArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_read_only()?;
    emit(&store.sub_classes_for(&args.name)?, args.format)
}

pub fn subtypes(args: &InheritorsArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_read_only()?;
    emit(&store.sub_types_for(&args.name)?, args.format)
}

fn emit(entities: &[ProgramEntity], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(entities)?),
        OutputFormat::Text => {
            for entity in entities {
                println!("{entity}");
            }
        }
    }
    Ok(())
}
