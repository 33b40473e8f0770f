//! Typed row access, one small function per table operation.
//!
//! Everything here speaks raw keys and returns `rusqlite::Result`; the
//! writer and reader decide what a missing row means.

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::dictionary::DictionaryKind;
use crate::types::{EntityKey, PackageKey, ProjectKey, SourceSpan};

/// Edge tables hanging off a fact row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EdgeTable {
    Modifier,
    SuperClass,
    SuperType,
}

impl EdgeTable {
    fn table_and_target(self) -> (&'static str, &'static str) {
        match self {
            Self::Modifier => ("modifier_xref", "modifier_key"),
            Self::SuperClass => ("super_class_xref", "type_name_key"),
            Self::SuperType => ("super_type_xref", "type_name_key"),
        }
    }
}

/// Insert a new dictionary value and return its generated key.
pub(crate) fn insert_dictionary_value(
    conn: &Connection,
    kind: DictionaryKind,
    value: &str,
) -> rusqlite::Result<i64> {
    let (table, _, value_col) = kind.columns();
    conn.prepare_cached(&format!("INSERT INTO {table} ({value_col}) VALUES (?1)"))?
        .execute(params![value])?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn insert_type_name(
    conn: &Connection,
    type_name: &str,
    identifier_name_key: i64,
) -> rusqlite::Result<i64> {
    conn.prepare_cached("INSERT INTO type_names (type_name, identifier_name_key) VALUES (?1, ?2)")?
        .execute(params![type_name, identifier_name_key])?;
    Ok(conn.last_insert_rowid())
}

/// Owning identifier-name key of a type name.
pub(crate) fn type_identifier_key(
    conn: &Connection,
    type_name_key: i64,
) -> rusqlite::Result<Option<i64>> {
    conn.prepare_cached("SELECT identifier_name_key FROM type_names WHERE type_name_key = ?1")?
        .query_row(params![type_name_key], |row| row.get(0))
        .optional()
}

pub(crate) fn find_file_key(conn: &Connection, file_name: &str) -> rusqlite::Result<Option<i64>> {
    conn.prepare_cached("SELECT file_key FROM files WHERE file_name = ?1")?
        .query_row(params![file_name], |row| row.get(0))
        .optional()
}

pub(crate) fn insert_project(
    conn: &Connection,
    name: &str,
    version: &str,
) -> rusqlite::Result<ProjectKey> {
    conn.prepare_cached(
        "INSERT INTO projects (project_name, project_version, registered_at) VALUES (?1, ?2, ?3)",
    )?
    .execute(params![name, version, Utc::now().to_rfc3339()])?;
    Ok(ProjectKey(conn.last_insert_rowid()))
}

pub(crate) fn project_row(
    conn: &Connection,
    project_key: ProjectKey,
) -> rusqlite::Result<Option<(String, String)>> {
    conn.prepare_cached(
        "SELECT project_name, project_version FROM projects WHERE project_key = ?1",
    )?
    .query_row(params![project_key.0], |row| Ok((row.get(0)?, row.get(1)?)))
    .optional()
}

pub(crate) fn find_package_key(
    conn: &Connection,
    project_key: ProjectKey,
    package_name_key: i64,
) -> rusqlite::Result<Option<PackageKey>> {
    conn.prepare_cached(
        "SELECT package_key FROM packages WHERE project_key = ?1 AND package_name_key = ?2",
    )?
    .query_row(params![project_key.0, package_name_key], |row| {
        row.get(0).map(PackageKey)
    })
    .optional()
}

pub(crate) fn insert_package(
    conn: &Connection,
    project_key: ProjectKey,
    package_name_key: i64,
) -> rusqlite::Result<PackageKey> {
    conn.prepare_cached("INSERT INTO packages (project_key, package_name_key) VALUES (?1, ?2)")?
        .execute(params![project_key.0, package_name_key])?;
    Ok(PackageKey(conn.last_insert_rowid()))
}

pub(crate) fn package_name_key(
    conn: &Connection,
    package_key: PackageKey,
) -> rusqlite::Result<Option<i64>> {
    conn.prepare_cached("SELECT package_name_key FROM packages WHERE package_key = ?1")?
        .query_row(params![package_key.0], |row| row.get(0))
        .optional()
}

pub(crate) fn package_name_keys_for_project(
    conn: &Connection,
    project_key: ProjectKey,
) -> rusqlite::Result<Vec<i64>> {
    conn.prepare_cached("SELECT package_name_key FROM packages WHERE project_key = ?1")?
        .query_map(params![project_key.0], |row| row.get(0))?
        .collect()
}

pub(crate) fn insert_token_position(
    conn: &Connection,
    identifier_name_key: i64,
    position: i64,
    token_key: i64,
) -> rusqlite::Result<()> {
    conn.prepare_cached(
        "INSERT INTO token_positions (identifier_name_key, position, token_key) VALUES (?1, ?2, ?3)",
    )?
    .execute(params![identifier_name_key, position, token_key])?;
    Ok(())
}

/// `(position, token_key)` pairs for an identifier, in storage order.
pub(crate) fn token_positions(
    conn: &Connection,
    identifier_name_key: i64,
) -> rusqlite::Result<Vec<(i64, i64)>> {
    conn.prepare_cached(
        "SELECT position, token_key FROM token_positions WHERE identifier_name_key = ?1",
    )?
    .query_map(params![identifier_name_key], |row| {
        Ok((row.get(0)?, row.get(1)?))
    })?
    .collect()
}

/// Column values of a new fact row.
#[derive(Debug)]
pub(crate) struct NewFact<'a> {
    pub project_key: ProjectKey,
    pub package_key: PackageKey,
    pub identifier_name_key: i64,
    pub container_uid: &'a str,
    pub entity_uid: &'a str,
    pub species_key: i64,
    pub type_name_key: i64,
    pub method_signature_key: i64,
    pub is_anonymous: bool,
    pub file_key: i64,
    pub is_array: bool,
    pub is_loop_control_var: bool,
    pub span: SourceSpan,
}

pub(crate) fn insert_entity(conn: &Connection, fact: &NewFact<'_>) -> rusqlite::Result<EntityKey> {
    conn.prepare_cached(
        "INSERT INTO program_entities (
            project_key, package_key, identifier_name_key, container_uid, entity_uid,
            species_key, type_name_key, method_signature_key, is_anonymous, file_key,
            is_array, is_loop_control_var, start_line, start_column, end_line, end_column
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
    )?
    .execute(params![
        fact.project_key.0,
        fact.package_key.0,
        fact.identifier_name_key,
        fact.container_uid,
        fact.entity_uid,
        fact.species_key,
        fact.type_name_key,
        fact.method_signature_key,
        fact.is_anonymous,
        fact.file_key,
        fact.is_array,
        fact.is_loop_control_var,
        fact.span.start_line,
        fact.span.start_column,
        fact.span.end_line,
        fact.span.end_column,
    ])?;
    Ok(EntityKey(conn.last_insert_rowid()))
}

/// An existing fact row with the same project and digests.
pub(crate) fn find_duplicate(
    conn: &Connection,
    project_key: ProjectKey,
    container_uid: &str,
    entity_uid: &str,
) -> rusqlite::Result<Option<EntityKey>> {
    conn.prepare_cached(
        "SELECT entity_key FROM program_entities
         WHERE project_key = ?1 AND container_uid = ?2 AND entity_uid = ?3
         ORDER BY entity_key LIMIT 1",
    )?
    .query_row(params![project_key.0, container_uid, entity_uid], |row| {
        row.get(0).map(EntityKey)
    })
    .optional()
}

pub(crate) fn insert_edge(
    conn: &Connection,
    edge: EdgeTable,
    entity_key: EntityKey,
    target_key: i64,
) -> rusqlite::Result<()> {
    let (table, target_col) = edge.table_and_target();
    conn.prepare_cached(&format!(
        "INSERT OR IGNORE INTO {table} (entity_key, {target_col}) VALUES (?1, ?2)"
    ))?
    .execute(params![entity_key.0, target_key])?;
    Ok(())
}

/// Target keys of one entity's edges, in insertion order.
pub(crate) fn edge_targets(
    conn: &Connection,
    edge: EdgeTable,
    entity_key: EntityKey,
) -> rusqlite::Result<Vec<i64>> {
    let (table, target_col) = edge.table_and_target();
    conn.prepare_cached(&format!(
        "SELECT {target_col} FROM {table} WHERE entity_key = ?1 ORDER BY rowid"
    ))?
    .query_map(params![entity_key.0], |row| row.get(0))?
    .collect()
}

/// Entities with an inheritance edge to any type name owned by the identifier.
pub(crate) fn entities_inheriting_from(
    conn: &Connection,
    edge: EdgeTable,
    identifier_name_key: i64,
) -> rusqlite::Result<Vec<EntityKey>> {
    let (table, _) = edge.table_and_target();
    conn.prepare_cached(&format!(
        "SELECT DISTINCT x.entity_key FROM {table} x
         JOIN type_names t ON t.type_name_key = x.type_name_key
         WHERE t.identifier_name_key = ?1
         ORDER BY x.entity_key"
    ))?
    .query_map(params![identifier_name_key], |row| row.get(0).map(EntityKey))?
    .collect()
}

// ── Fact rows ──────────────────────────────────────────────────────

/// A fact row as stored, before dictionary resolution.
#[derive(Debug, Clone)]
pub(crate) struct FactRow {
    pub entity_key: EntityKey,
    pub project_key: ProjectKey,
    pub package_key: PackageKey,
    pub identifier_name_key: i64,
    pub container_uid: String,
    pub entity_uid: String,
    pub species_key: i64,
    pub type_name_key: i64,
    pub method_signature_key: i64,
    pub is_anonymous: bool,
    pub file_key: i64,
    pub is_array: bool,
    pub is_loop_control_var: bool,
    pub span: SourceSpan,
}

/// Column list matching [`FactRow::from_row`], for `SELECT ... FROM program_entities e`.
pub(crate) const FACT_COLUMNS: &str = "e.entity_key, e.project_key, e.package_key, \
    e.identifier_name_key, e.container_uid, e.entity_uid, e.species_key, e.type_name_key, \
    e.method_signature_key, e.is_anonymous, e.file_key, e.is_array, e.is_loop_control_var, \
    e.start_line, e.start_column, e.end_line, e.end_column";

impl FactRow {
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            entity_key: EntityKey(row.get(0)?),
            project_key: ProjectKey(row.get(1)?),
            package_key: PackageKey(row.get(2)?),
            identifier_name_key: row.get(3)?,
            container_uid: row.get(4)?,
            entity_uid: row.get(5)?,
            species_key: row.get(6)?,
            type_name_key: row.get(7)?,
            method_signature_key: row.get(8)?,
            is_anonymous: row.get(9)?,
            file_key: row.get(10)?,
            is_array: row.get(11)?,
            is_loop_control_var: row.get(12)?,
            span: SourceSpan {
                start_line: row.get(13)?,
                start_column: row.get(14)?,
                end_line: row.get(15)?,
                end_column: row.get(16)?,
            },
        })
    }
}

/// Fact rows matching a `WHERE` clause over alias `e` (plus optional joins).
///
/// Rows that fail to decode are logged and skipped so one bad row does not
/// abort a listing.
pub(crate) fn fact_rows(
    conn: &Connection,
    joins: &str,
    where_clause: &str,
    params: &[&dyn rusqlite::ToSql],
) -> rusqlite::Result<Vec<FactRow>> {
    let sql = format!(
        "SELECT {FACT_COLUMNS} FROM program_entities e {joins} WHERE {where_clause} ORDER BY e.entity_key"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt.query_map(params, FactRow::from_row)?;
    let mut facts = Vec::new();
    for row in rows {
        match row {
            Ok(fact) => facts.push(fact),
            Err(e) => tracing::warn!(error = %e, "Skipping undecodable fact row"),
        }
    }
    Ok(facts)
}

/// Distinct identifier-name keys matching a `WHERE` clause over alias `e`.
pub(crate) fn identifier_keys(
    conn: &Connection,
    joins: &str,
    where_clause: &str,
    params: &[&dyn rusqlite::ToSql],
) -> rusqlite::Result<Vec<i64>> {
    let sql = format!(
        "SELECT DISTINCT e.identifier_name_key FROM program_entities e {joins} WHERE {where_clause}"
    );
    conn.prepare_cached(&sql)?
        .query_map(params, |row| row.get(0))?
        .collect()
}

pub(crate) fn count_entities(conn: &Connection) -> rusqlite::Result<u64> {
    conn.query_row("SELECT COUNT(*) FROM program_entities", [], |row| {
        row.get::<_, i64>(0)
    })
    .map(|n| u64::try_from(n).unwrap_or(0))
}

pub(crate) fn count_entities_by_species(conn: &Connection) -> rusqlite::Result<Vec<(i64, u64)>> {
    conn.prepare(
        "SELECT species_key, COUNT(*) FROM program_entities GROUP BY species_key",
    )?
    .query_map([], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            u64::try_from(row.get::<_, i64>(1)?).unwrap_or(0),
        ))
    })?
    .collect()
}

pub(crate) fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n > 0)
}
