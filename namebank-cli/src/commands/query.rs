//! Name listings: projects, tokens, packages, classes and identifier names.

use clap::Args;

use namebank_core::store::EntityReader;
use namebank_core::types::{Modifier, Species};

use super::Context;

#[derive(Args, Debug)]
pub struct TokensArgs {
    /// Identifier name as stored, e.g. `getFooBar`
    pub name: String,
}

#[derive(Args, Debug)]
pub struct PackagesArgs {
    /// Project as "name version"
    pub project: String,
}

#[derive(Args, Debug)]
pub struct ClassesArgs {
    /// Project as "name version"
    pub project: String,

    /// Package name; omit to list classes of every package
    pub package: Option<String>,
}

#[derive(Args, Debug)]
pub struct NamesArgs {
    /// Project as "name version"
    pub project: String,

    /// Restrict to one species, e.g. `field` or `local-variable`
    #[arg(long)]
    pub species: Option<Species>,

    /// Only names of entities carrying this modifier (requires --species)
    #[arg(long, requires = "species")]
    pub modifier: Option<Modifier>,
}

pub fn projects(ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_read_only()?;
    print_lines(&store.project_list()?);
    Ok(())
}

pub fn tokens(args: &TokensArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_read_only()?;
    let tokens = store.tokens_for(&args.name)?;
    if tokens.is_empty() {
        eprintln!("No tokens stored for {}", args.name);
    } else {
        println!("{}", tokens.join(" "));
    }
    Ok(())
}

pub fn packages(args: &PackagesArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_read_only()?;
    print_lines(&store.package_names_for_project(&args.project)?);
    Ok(())
}

pub fn classes(args: &ClassesArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_read_only()?;
    let names = match &args.package {
        Some(package) => store.class_names_for_package(&args.project, package)?,
        None => store.all_class_names_for(&args.project)?,
    };
    print_lines(&names);
    Ok(())
}

pub fn names(args: &NamesArgs, ctx: &Context) -> anyhow::Result<()> {
    let store = ctx.open_read_only()?;
    let names = match (args.species, args.modifier) {
        (Some(species), Some(modifier)) => {
            store.identifier_names_with_modifier(&args.project, species, modifier)?
        }
        (species, _) => store.identifier_names_for(&args.project, species)?,
    };
    print_lines(&names);
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}
