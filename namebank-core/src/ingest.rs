//! Batch ingestion of raw entities from JSON lines.
//!
//! Each non-blank line holds one [`RawEntity`]. A line that fails to parse
//! or store is recorded in the [`IngestReport`] and the batch continues.

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::IngestError;
use crate::progress::ProgressReporter;
use crate::store::EntityWriter;
use crate::types::RawEntity;

/// A line that could not be ingested.
#[derive(Debug, Clone, Serialize)]
pub struct IngestFailure {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

/// Outcome of one batch.
#[derive(Debug, Default, Clone, Serialize)]
pub struct IngestReport {
    pub stored: usize,
    pub failures: Vec<IngestFailure>,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ingest a JSON-lines file.
pub fn ingest_json_lines(
    store: &dyn EntityWriter,
    path: &Path,
    reporter: &dyn ProgressReporter,
) -> Result<IngestReport, IngestError> {
    let content = std::fs::read_to_string(path)?;
    info!(path = %path.display(), "Ingesting raw entities");
    Ok(ingest_lines(store, &content, reporter))
}

/// Ingest JSON-lines text already in memory.
pub fn ingest_lines(
    store: &dyn EntityWriter,
    content: &str,
    reporter: &dyn ProgressReporter,
) -> IngestReport {
    let lines: Vec<(usize, &str)> = content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .collect();

    reporter.start("Storing entities", Some(lines.len() as u64));
    let mut report = IngestReport::default();

    for (line_no, line) in lines {
        let outcome = serde_json::from_str::<RawEntity>(line)
            .map_err(|e| {
                IngestError::Parse {
                    line: line_no,
                    message: e.to_string(),
                }
                .to_string()
            })
            .and_then(|raw| store.store(&raw).map_err(|e| e.to_string()));

        match outcome {
            Ok(_) => report.stored += 1,
            Err(message) => {
                warn!(line = line_no, %message, "Failed to ingest entity");
                report.failures.push(IngestFailure {
                    line: line_no,
                    message,
                });
            }
        }
        reporter.advance(1);
    }

    reporter.finish();
    info!(
        stored = report.stored,
        failed = report.failures.len(),
        "Ingest finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopReporter;
    use crate::store::{EntityReader, EntityStore};

    const TWO_ENTITIES: &str = r#"
{"file_name":"Shape.java","package_name":"geo","name":"Shape","species":"class","type_name":{"name":"Shape","fqn":"geo.Shape"}}
{"file_name":"Shape.java","package_name":"geo","name":"area","species":"method","type_name":{"name":"double"},"method_signature":"()double"}
"#;

    #[test]
    fn ingests_every_line() {
        let store = EntityStore::in_memory().unwrap();
        store.set_project("geo", "1.0").unwrap();

        let report = ingest_lines(&store, TWO_ENTITIES, &NoopReporter);
        assert!(report.is_clean(), "{:?}", report.failures);
        assert_eq!(report.stored, 2);
        assert_eq!(store.entities_for_project("geo 1.0").unwrap().len(), 2);
    }

    #[test]
    fn bad_lines_are_reported_and_skipped() {
        let store = EntityStore::in_memory().unwrap();
        store.set_project("geo", "1.0").unwrap();

        let content = format!("{TWO_ENTITIES}\nnot json\n");
        let report = ingest_lines(&store, &content, &NoopReporter);
        assert_eq!(report.stored, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].line, 5);
        assert!(report.failures[0].message.contains("line 5"));
    }

    #[test]
    fn store_failures_are_reported() {
        let store = EntityStore::in_memory().unwrap();
        // No project set: every store fails.
        let report = ingest_lines(&store, TWO_ENTITIES, &NoopReporter);
        assert_eq!(report.stored, 0);
        assert_eq!(report.failures.len(), 2);
    }

    #[test]
    fn ingests_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entities.jsonl");
        std::fs::write(&path, TWO_ENTITIES).unwrap();

        let store = EntityStore::in_memory().unwrap();
        store.set_project("geo", "1.0").unwrap();
        let report = ingest_json_lines(&store, &path, &NoopReporter).unwrap();
        assert_eq!(report.stored, 2);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let store = EntityStore::in_memory().unwrap();
        let err = ingest_json_lines(&store, Path::new("/nonexistent/x.jsonl"), &NoopReporter)
            .unwrap_err();
        assert!(matches!(err, IngestError::Io(_)));
    }
}
