//! namebank core library: interning store and entity reconstruction for
//! identifiers extracted from source code.
//!
//! The main entry point is [`store::EntityStore`], which normalizes
//! [`types::RawEntity`] values through [`store::EntityWriter`] and
//! reassembles [`types::ProgramEntity`] values through [`store::EntityReader`].

pub mod config;
pub mod dictionary;
pub mod error;
pub mod ingest;
pub mod progress;
pub mod sample;
pub mod store;
pub mod tokenize;
pub mod types;
