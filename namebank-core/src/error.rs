/// Top-level namebank error type.
///
/// All fallible operations in `namebank-core` return [`Result<T, NamebankError>`](Result).
/// Each variant wraps a domain-specific error enum, allowing callers to
/// match on the error source without losing type information.
#[derive(thiserror::Error, Debug)]
pub enum NamebankError {
    /// Error from the entity store (`SQLite` operations, key resolution).
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error in configuration parsing or validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Error reading a batch of raw entities.
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// A query was called with arguments it cannot serve.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors from the SQLite-backed entity store.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    /// Underlying `SQLite` operation failed.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A dictionary key needed by a write could not be resolved.
    #[error("Unresolved {category} key for {value:?}")]
    UnresolvedKey {
        /// Dictionary category the lookup ran against.
        category: &'static str,
        /// Value that had no key.
        value: String,
    },

    /// A method or constructor arrived without a signature.
    #[error("Missing method signature for {0}")]
    MissingSignature(String),

    /// A write was attempted on a store opened read-only.
    #[error("Store is read-only")]
    ReadOnly,

    /// A write was attempted before a project name and version were set.
    #[error("No project set; call set_project first")]
    NoProject,

    /// The database exists but holds no namebank schema.
    #[error("Database not initialized: {0}")]
    NotInitialized(String),
}

/// Errors in namebank configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Errors while reading raw entities from a JSON-lines batch.
#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    /// Filesystem I/O error opening or reading the batch.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A line could not be decoded into a raw entity.
    #[error("Parse error on line {line}: {message}")]
    Parse {
        /// 1-based line number in the batch file.
        line: usize,
        /// Description of the decode failure.
        message: String,
    },
}

/// Convenience alias for `Result<T, NamebankError>`.
pub type Result<T> = std::result::Result<T, NamebankError>;
