pub mod entities;
pub mod ingest;
pub mod init;
pub mod query;
pub mod sample;
pub mod status;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Subcommand;

use namebank_core::store::EntityStore;

/// Settings shared by every subcommand.
#[derive(Debug)]
pub struct Context {
    pub db: PathBuf,
    pub quiet: bool,
}

impl Context {
    /// Open an existing database for queries.
    pub fn open_read_only(&self) -> anyhow::Result<EntityStore> {
        if !self.db.exists() {
            anyhow::bail!(
                "Database not found: {}. Run `namebank init` first.",
                self.db.display()
            );
        }
        EntityStore::open_read_only(&self.db)
            .with_context(|| format!("Cannot open database: {}", self.db.display()))
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create an empty namebank database
    Init(init::InitArgs),
    /// Store raw entities from a JSON-lines file
    Ingest(ingest::IngestArgs),
    /// Show entity and dictionary counts
    Status(status::StatusArgs),
    /// List registered projects
    Projects,
    /// Show the tokens of an identifier name
    Tokens(query::TokensArgs),
    /// List the packages of a project
    Packages(query::PackagesArgs),
    /// List class names in a package
    Classes(query::ClassesArgs),
    /// List identifier names of a project
    Names(query::NamesArgs),
    /// Draw a random sample of identifier names
    Sample(sample::SampleArgs),
    /// List reconstructed entities of a project
    Entities(entities::EntitiesArgs),
    /// List classes extending a class name
    Subclasses(entities::InheritorsArgs),
    /// List classes and interfaces implementing or extending a type name
    Subtypes(entities::InheritorsArgs),
}

pub fn run(cmd: Command, ctx: &Context) -> anyhow::Result<()> {
    match cmd {
        Command::Init(args) => init::run(&args, ctx),
        Command::Ingest(args) => ingest::run(&args, ctx),
        Command::Status(args) => status::run(&args, ctx),
        Command::Projects => query::projects(ctx),
        Command::Tokens(args) => query::tokens(&args, ctx),
        Command::Packages(args) => query::packages(&args, ctx),
        Command::Classes(args) => query::classes(&args, ctx),
        Command::Names(args) => query::names(&args, ctx),
        Command::Sample(args) => sample::run(&args, ctx),
        Command::Entities(args) => entities::run(&args, ctx),
        Command::Subclasses(args) => entities::subclasses(&args, ctx),
        Command::Subtypes(args) => entities::subtypes(&args, ctx),
    }
}
