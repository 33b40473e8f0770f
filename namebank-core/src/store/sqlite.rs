use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::RngCore;
use rusqlite::{Connection, OpenFlags, params};
use tracing::{debug, info, warn};

use crate::config::{DuplicatePolicy, NamebankConfig};
use crate::dictionary::{Dictionaries, DictionaryKind};
use crate::error::{NamebankError, StoreError};
use crate::tokenize::{IdentifierTokenizer, Tokenizer, TokenizerOptions};
use crate::types::{
    EntityKey, Modifier, NameSetRequest, PackageKey, ProgramEntity, ProjectDetails, ProjectKey,
    RawEntity, Species, StoreStats, TypeGroup,
};

use super::repo;
use super::schema;
use super::{EntityReader, EntityWriter};

/// Per-run write state: the current project and the packages seen so far.
#[derive(Debug, Default)]
pub(crate) struct RunState {
    pub(crate) project: Option<ProjectDetails>,
    pub(crate) project_key: Option<ProjectKey>,
    pub(crate) packages: HashMap<i64, PackageKey>,
}

/// Everything guarded by the store mutex.
#[derive(Debug)]
pub(crate) struct StoreState {
    pub(crate) conn: Connection,
    pub(crate) dicts: Dictionaries,
    pub(crate) run: RunState,
    pub(crate) tokenizer: Box<dyn Tokenizer>,
    pub(crate) read_only: bool,
    pub(crate) duplicates: DuplicatePolicy,
}

/// SQLite-backed entity store.
///
/// The connection and the dictionary context share one mutex, so the
/// store can be shared across threads and interning stays bijective.
#[derive(Debug)]
pub struct EntityStore {
    state: Mutex<StoreState>,
    db_path: Option<PathBuf>,
}

impl EntityStore {
    /// Open (or create) a store at the given path with default settings.
    pub fn open(path: &Path) -> crate::error::Result<Self> {
        Self::open_with_config(path, &NamebankConfig::default())
    }

    /// Open (or create) a store, taking project, tokenizer and duplicate
    /// settings from `config`.
    pub fn open_with_config(path: &Path, config: &NamebankConfig) -> crate::error::Result<Self> {
        let conn = Connection::open(path).map_err(StoreError::Sqlite)?;
        let store = Self::create(conn, Some(path.to_path_buf()), config)?;
        info!(path = %path.display(), "Opened entity store");
        Ok(store)
    }

    /// Open an existing store for queries only.
    pub fn open_read_only(path: &Path) -> crate::error::Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(StoreError::Sqlite)?;

        if !repo::table_exists(&conn, schema::MARKER_TABLE).map_err(StoreError::Sqlite)? {
            return Err(StoreError::NotInitialized(path.display().to_string()).into());
        }
        let dicts = Dictionaries::load(&conn).map_err(StoreError::Sqlite)?;

        info!(path = %path.display(), "Opened entity store read-only");
        Ok(Self {
            state: Mutex::new(StoreState {
                conn,
                dicts,
                run: RunState::default(),
                tokenizer: Box::new(IdentifierTokenizer::default()),
                read_only: true,
                duplicates: DuplicatePolicy::Keep,
            }),
            db_path: Some(path.to_path_buf()),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> crate::error::Result<Self> {
        Self::in_memory_with_config(&NamebankConfig::default())
    }

    pub fn in_memory_with_config(config: &NamebankConfig) -> crate::error::Result<Self> {
        let conn = Connection::open_in_memory().map_err(StoreError::Sqlite)?;
        Self::create(conn, None, config)
    }

    fn create(
        conn: Connection,
        db_path: Option<PathBuf>,
        config: &NamebankConfig,
    ) -> crate::error::Result<Self> {
        Self::initialize(&conn, config).map_err(StoreError::Sqlite)?;
        let dicts = Dictionaries::load(&conn).map_err(StoreError::Sqlite)?;

        let project = (!config.project.name.is_empty()).then(|| {
            ProjectDetails::new(config.project.name.clone(), config.project.version.clone())
        });

        Ok(Self {
            state: Mutex::new(StoreState {
                conn,
                dicts,
                run: RunState {
                    project,
                    ..RunState::default()
                },
                tokenizer: Box::new(IdentifierTokenizer::new(config.tokenizer)),
                read_only: false,
                duplicates: config.store.duplicates,
            }),
            db_path,
        })
    }

    fn initialize(conn: &Connection, config: &NamebankConfig) -> rusqlite::Result<()> {
        conn.execute_batch(&format!(
            "PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -{};
             PRAGMA foreign_keys = ON;",
            config.store.cache_size_kib
        ))?;

        // WAL is silently ignored for in-memory stores
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL;");

        let created = !repo::table_exists(conn, schema::MARKER_TABLE)?;
        conn.execute_batch(schema::SCHEMA_SQL)?;

        conn.execute(
            "INSERT OR IGNORE INTO namebank_meta (key, value) VALUES ('schema_version', ?1)",
            params![schema::SCHEMA_VERSION],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO namebank_meta (key, value) VALUES ('created_at', ?1)",
            params![chrono::Utc::now().to_rfc3339()],
        )?;

        // Species and modifiers are closed sets, seeded once.
        for species in Species::ALL {
            conn.execute(
                "INSERT OR IGNORE INTO species (species) VALUES (?1)",
                params![species.as_str()],
            )?;
        }
        for modifier in Modifier::ALL {
            conn.execute(
                "INSERT OR IGNORE INTO modifiers (modifier) VALUES (?1)",
                params![modifier.as_str()],
            )?;
        }

        if created {
            debug!("Created namebank schema");
        }
        Ok(())
    }

    /// Lock the store state. A writer that panicked mid-transaction leaves
    /// its interned keys in the caches after SQLite rolls the rows back, so
    /// a poisoned lock resyncs the caches from disk before it is cleared.
    pub(crate) fn lock(&self) -> MutexGuard<'_, StoreState> {
        let mut state = match self.state.lock() {
            Ok(state) => return state,
            Err(poisoned) => poisoned.into_inner(),
        };
        match state.resync() {
            Ok(()) => self.state.clear_poison(),
            Err(e) => warn!(error = %e, "Cannot reload dictionaries after a panicked write"),
        }
        state
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Set the project that subsequent writes belong to. Starts a new run.
    pub fn set_project(&self, name: &str, version: &str) -> crate::error::Result<()> {
        if name.trim().is_empty() || name.contains(' ') {
            return Err(NamebankError::InvalidArgument(format!(
                "project name must be non-empty and contain no spaces: {name:?}"
            )));
        }
        let mut state = self.lock();
        state.run = RunState {
            project: Some(ProjectDetails::new(name, version)),
            ..RunState::default()
        };
        debug!(project = name, version, "Project set");
        Ok(())
    }

    /// Replace the tokenizer with the default one configured by `options`.
    pub fn set_tokenizer_options(&self, options: TokenizerOptions) {
        self.set_tokenizer(Box::new(IdentifierTokenizer::new(options)));
    }

    pub fn set_tokenizer(&self, tokenizer: Box<dyn Tokenizer>) {
        self.lock().tokenizer = tokenizer;
    }

    pub fn set_duplicate_policy(&self, policy: DuplicatePolicy) {
        self.lock().duplicates = policy;
    }

    pub fn is_read_only(&self) -> bool {
        self.lock().read_only
    }

    /// Number of entries in one dictionary category.
    pub fn dictionary_len(&self, kind: DictionaryKind) -> usize {
        self.lock().dicts.get(kind).len()
    }

    pub fn stats(&self) -> crate::error::Result<StoreStats> {
        let state = self.lock();
        let conn = &state.conn;

        let total_entities = repo::count_entities(conn).map_err(StoreError::Sqlite)?;

        let mut entities_by_species = BTreeMap::new();
        for (species_key, count) in
            repo::count_entities_by_species(conn).map_err(StoreError::Sqlite)?
        {
            let name = state
                .dicts
                .get(DictionaryKind::Species)
                .get_value(species_key)
                .unwrap_or("unknown")
                .to_string();
            entities_by_species.insert(name, count);
        }

        let dictionary_sizes = DictionaryKind::ALL
            .into_iter()
            .map(|kind| {
                (
                    kind.as_str().to_string(),
                    state.dicts.get(kind).len() as u64,
                )
            })
            .collect();

        let db_size_bytes = self
            .db_path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map_or(0, |m| m.len());

        Ok(StoreStats {
            total_entities,
            projects: state.dicts.projects.names(),
            entities_by_species,
            dictionary_sizes,
            db_size_bytes,
        })
    }

    /// Flush and close the connection, leaving a single database file.
    pub fn shutdown(self) -> crate::error::Result<()> {
        let state = self
            .state
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        if !state.read_only {
            state
                .conn
                .execute_batch("PRAGMA journal_mode = DELETE;")
                .map_err(StoreError::Sqlite)?;
        }
        state
            .conn
            .close()
            .map_err(|(_, e)| StoreError::Sqlite(e))?;
        info!("Entity store closed");
        Ok(())
    }

    /// Bounded random name sample drawn with a caller-supplied RNG.
    pub fn name_set_with_rng(
        &self,
        request: &NameSetRequest,
        rng: &mut dyn RngCore,
    ) -> crate::error::Result<Vec<String>> {
        let state = self.lock();
        let candidates = state.candidate_names(request)?;
        Ok(crate::sample::select_names(candidates, request.count, rng))
    }

    /// Tokenised sample drawn with a caller-supplied RNG.
    pub fn tokenised_name_set_with_rng(
        &self,
        request: &NameSetRequest,
        rng: &mut dyn RngCore,
    ) -> crate::error::Result<Vec<String>> {
        let state = self.lock();
        let candidates = state.candidate_names(request)?;
        let chosen = crate::sample::select_names(candidates, request.count, rng);
        let mut rendered: Vec<String> = chosen
            .iter()
            .map(|name| state.tokens_for(name).join(" "))
            .collect();
        rendered.sort();
        Ok(rendered)
    }
}

impl StoreState {
    /// Rebuild the caches from the tables and forget run-scoped keys.
    fn resync(&mut self) -> rusqlite::Result<()> {
        self.dicts = Dictionaries::load(&self.conn)?;
        self.run.project_key = None;
        self.run.packages.clear();
        debug!("Reloaded dictionaries after a poisoned lock");
        Ok(())
    }
}

// ── Trait implementations ──────────────────────────────────────────

impl EntityWriter for EntityStore {
    fn store(&self, raw: &RawEntity) -> crate::error::Result<EntityKey> {
        Ok(self.lock().store_entity(raw)?)
    }

    /// Stops at the first failure; entities stored before it are kept.
    fn store_batch(&self, raws: &[RawEntity]) -> crate::error::Result<Vec<EntityKey>> {
        let mut state = self.lock();
        let mut keys = Vec::with_capacity(raws.len());
        for raw in raws {
            keys.push(state.store_entity(raw)?);
        }
        Ok(keys)
    }
}

impl EntityReader for EntityStore {
    fn project_list(&self) -> crate::error::Result<Vec<String>> {
        Ok(self.lock().dicts.projects.names())
    }

    fn project_details(&self, project_key: ProjectKey) -> crate::error::Result<Option<ProjectDetails>> {
        self.lock().project_details(project_key)
    }

    fn tokens_for(&self, name: &str) -> crate::error::Result<Vec<String>> {
        Ok(self.lock().tokens_for(name))
    }

    fn package_names_for_project(&self, project: &str) -> crate::error::Result<Vec<String>> {
        self.lock().package_names_for_project(project)
    }

    fn package_name_for(&self, package_key: PackageKey) -> crate::error::Result<Option<String>> {
        self.lock().package_name_for(package_key)
    }

    fn class_names_for_package(
        &self,
        project: &str,
        package: &str,
    ) -> crate::error::Result<Vec<String>> {
        self.lock().class_names_for_package(project, package)
    }

    fn all_class_names_for(&self, project: &str) -> crate::error::Result<Vec<String>> {
        self.lock().identifier_names_for(project, Some(Species::Class))
    }

    fn identifier_names_for(
        &self,
        project: &str,
        species: Option<Species>,
    ) -> crate::error::Result<Vec<String>> {
        self.lock().identifier_names_for(project, species)
    }

    fn identifier_names_with_modifier(
        &self,
        project: &str,
        species: Species,
        modifier: Modifier,
    ) -> crate::error::Result<Vec<String>> {
        self.lock()
            .identifier_names_with_modifier(project, species, modifier)
    }

    fn name_set_for(&self, request: &NameSetRequest) -> crate::error::Result<Vec<String>> {
        self.name_set_with_rng(request, &mut rand::rng())
    }

    fn tokenised_name_set_for(&self, request: &NameSetRequest) -> crate::error::Result<Vec<String>> {
        self.tokenised_name_set_with_rng(request, &mut rand::rng())
    }

    fn entity(&self, entity_key: EntityKey) -> crate::error::Result<Option<ProgramEntity>> {
        self.lock().entity(entity_key)
    }

    fn entities_for_project(&self, project: &str) -> crate::error::Result<Vec<ProgramEntity>> {
        self.lock().entities_for_project(project, &[])
    }

    fn entities_for_project_by_species(
        &self,
        project: &str,
        species: Species,
    ) -> crate::error::Result<Vec<ProgramEntity>> {
        self.lock().entities_for_project(project, &[species])
    }

    fn all_classes_and_interfaces_for(
        &self,
        project: &str,
    ) -> crate::error::Result<Vec<ProgramEntity>> {
        self.lock()
            .entities_for_project(project, &[Species::Class, Species::Interface])
    }

    fn entities_by_species(&self, species: Species) -> crate::error::Result<Vec<ProgramEntity>> {
        self.lock().entities_by_species(species)
    }

    fn entity_set_where(
        &self,
        species: Species,
        max_count: usize,
        type_group: TypeGroup,
    ) -> crate::error::Result<Vec<ProgramEntity>> {
        self.lock().entity_set_where(species, max_count, type_group)
    }

    fn class_or_interface_for(
        &self,
        project: &str,
        fqn: &str,
    ) -> crate::error::Result<Option<ProgramEntity>> {
        self.lock().class_or_interface_for(project, fqn)
    }

    fn entity_candidates_for(
        &self,
        class_name: &str,
        species: Species,
    ) -> crate::error::Result<Vec<ProgramEntity>> {
        self.lock().entity_candidates_for(class_name, species)
    }

    fn modifiers_for(&self, entity_key: EntityKey) -> crate::error::Result<Vec<Modifier>> {
        self.lock().modifiers_for(entity_key)
    }

    fn super_class_names_for(&self, entity_key: EntityKey) -> crate::error::Result<Vec<String>> {
        self.lock()
            .inheritance_names_for(entity_key, repo::EdgeTable::SuperClass)
    }

    fn super_type_names_for(&self, entity_key: EntityKey) -> crate::error::Result<Vec<String>> {
        self.lock()
            .inheritance_names_for(entity_key, repo::EdgeTable::SuperType)
    }

    fn sub_classes_for(&self, name: &str) -> crate::error::Result<Vec<ProgramEntity>> {
        self.lock().inheritors_of(name, repo::EdgeTable::SuperClass)
    }

    fn sub_types_for(&self, name: &str) -> crate::error::Result<Vec<ProgramEntity>> {
        self.lock().inheritors_of(name, repo::EdgeTable::SuperType)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::types::{EntityShape, SourceSpan, TypeName};

    fn class(name: &str, package: &str, super_classes: &[(&str, &str)]) -> RawEntity {
        RawEntity {
            file_name: format!("src/{package}/{name}.java"),
            package_name: package.to_string(),
            container_uid: format!("{package}-file"),
            entity_uid: format!("{package}.{name}"),
            name: name.to_string(),
            species: Species::Class,
            type_name: TypeName::new(name, format!("{package}.{name}")),
            is_array: false,
            is_loop_control_var: false,
            method_signature: None,
            modifiers: vec![Modifier::Public],
            super_classes: super_classes
                .iter()
                .map(|(n, fqn)| TypeName::new(*n, *fqn))
                .collect(),
            super_types: Vec::new(),
            span: SourceSpan::new(1, 1, 40, 2),
        }
    }

    fn member(name: &str, species: Species, type_name: &str) -> RawEntity {
        RawEntity {
            file_name: "src/geo/Shape.java".to_string(),
            package_name: "geo".to_string(),
            container_uid: "geo.Shape".to_string(),
            entity_uid: format!("geo.Shape#{name}"),
            name: name.to_string(),
            species,
            type_name: TypeName::simple(type_name),
            is_array: false,
            is_loop_control_var: false,
            method_signature: None,
            modifiers: Vec::new(),
            super_classes: Vec::new(),
            super_types: Vec::new(),
            span: SourceSpan::new(5, 5, 5, 30),
        }
    }

    fn method(name: &str, signature: &str) -> RawEntity {
        RawEntity {
            method_signature: Some(signature.to_string()),
            ..member(name, Species::Method, "void")
        }
    }

    fn geo_store() -> EntityStore {
        let store = EntityStore::in_memory().unwrap();
        store.set_project("geo", "1.0").unwrap();
        store
    }

    fn count(store: &EntityStore, sql: &str) -> i64 {
        store.lock().conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    // ── Lifecycle ──────────────────────────────────────────────────

    #[test]
    fn in_memory_store_seeds_closed_dictionaries() {
        let store = EntityStore::in_memory().unwrap();
        assert_eq!(store.dictionary_len(DictionaryKind::Species), Species::ALL.len());
        assert_eq!(store.dictionary_len(DictionaryKind::Modifier), Modifier::ALL.len());
        assert_eq!(store.dictionary_len(DictionaryKind::IdentifierName), 0);
        assert!(store.project_list().unwrap().is_empty());
    }

    #[test]
    fn store_requires_a_project() {
        let store = EntityStore::in_memory().unwrap();
        let err = store.store(&member("count", Species::Field, "int")).unwrap_err();
        assert!(matches!(err, NamebankError::Store(StoreError::NoProject)));
    }

    #[test]
    fn project_names_with_spaces_are_rejected() {
        let store = EntityStore::in_memory().unwrap();
        assert!(matches!(
            store.set_project("my project", "1"),
            Err(NamebankError::InvalidArgument(_))
        ));
    }

    #[test]
    fn config_project_is_used_for_writes() {
        let mut config = NamebankConfig::default();
        config.project.name = "cfg".into();
        config.project.version = "2".into();
        let store = EntityStore::in_memory_with_config(&config).unwrap();
        store.store(&member("count", Species::Field, "int")).unwrap();
        assert_eq!(store.project_list().unwrap(), vec!["cfg 2"]);
    }

    #[test]
    fn reopen_reloads_dictionaries_and_reuses_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.db");

        let store = EntityStore::open(&path).unwrap();
        store.set_project("geo", "1.0").unwrap();
        store.store(&member("fooBar", Species::Field, "int")).unwrap();
        store.shutdown().unwrap();

        let store = EntityStore::open(&path).unwrap();
        // foo, bar and the type's own token int
        assert_eq!(store.dictionary_len(DictionaryKind::Token), 3);
        assert_eq!(store.tokens_for("fooBar").unwrap(), vec!["foo", "bar"]);

        store.set_project("geo", "1.0").unwrap();
        store.store(&member("fooBar", Species::Field, "int")).unwrap();
        assert_eq!(count(&store, "SELECT COUNT(*) FROM projects"), 1);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM identifier_names WHERE identifier_name = 'fooBar'"), 1);
        assert_eq!(store.entities_for_project("geo 1.0").unwrap().len(), 2);
    }

    #[test]
    fn read_only_store_answers_queries_and_rejects_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.db");

        let store = EntityStore::open(&path).unwrap();
        store.set_project("geo", "1.0").unwrap();
        store.store(&class("Shape", "geo", &[])).unwrap();
        store.shutdown().unwrap();

        let store = EntityStore::open_read_only(&path).unwrap();
        assert!(store.is_read_only());
        assert_eq!(store.project_list().unwrap(), vec!["geo 1.0"]);
        assert_eq!(store.all_class_names_for("geo 1.0").unwrap(), vec!["Shape"]);

        store.set_project("geo", "1.0").unwrap();
        let err = store.store(&class("Circle", "geo", &[])).unwrap_err();
        assert!(matches!(err, NamebankError::Store(StoreError::ReadOnly)));
    }

    #[test]
    fn read_only_open_of_foreign_database_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("other.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("CREATE TABLE unrelated (x INTEGER);").unwrap();
        drop(conn);

        let err = EntityStore::open_read_only(&path).unwrap_err();
        assert!(matches!(err, NamebankError::Store(StoreError::NotInitialized(_))));
    }

    #[test]
    fn stats_count_entities_and_dictionaries() {
        let store = geo_store();
        store.store(&class("Shape", "geo", &[])).unwrap();
        store.store(&member("area", Species::Field, "double")).unwrap();
        store.store(&member("name", Species::Field, "String")).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total_entities, 3);
        assert_eq!(stats.projects, vec!["geo 1.0"]);
        assert_eq!(stats.entities_by_species.get("field"), Some(&2));
        assert_eq!(stats.entities_by_species.get("class"), Some(&1));
        assert_eq!(stats.dictionary_sizes.get("species"), Some(&12));
        assert_eq!(stats.db_size_bytes, 0);
    }

    // ── Writes ─────────────────────────────────────────────────────

    #[test]
    fn interning_is_idempotent() {
        let store = geo_store();
        store.store(&member("count", Species::Field, "int")).unwrap();
        let before = store.dictionary_len(DictionaryKind::IdentifierName);
        store
            .store(&member("count", Species::LocalVariable, "int"))
            .unwrap();

        assert_eq!(store.dictionary_len(DictionaryKind::IdentifierName), before);
        assert_eq!(
            count(&store, "SELECT COUNT(*) FROM identifier_names WHERE identifier_name = 'count'"),
            1
        );
        assert_eq!(count(&store, "SELECT COUNT(*) FROM token_positions t JOIN identifier_names i ON i.identifier_name_key = t.identifier_name_key WHERE i.identifier_name = 'count'"), 1);
    }

    #[test]
    fn same_entity_twice_makes_two_rows() {
        let store = geo_store();
        let raw = member("count", Species::Field, "int");
        let first = store.store(&raw).unwrap();
        let second = store.store(&raw).unwrap();
        assert_ne!(first, second);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM program_entities"), 2);
    }

    #[test]
    fn skip_policy_returns_existing_row() {
        let store = geo_store();
        store.set_duplicate_policy(DuplicatePolicy::Skip);
        let raw = member("count", Species::Field, "int");
        let first = store.store(&raw).unwrap();
        let second = store.store(&raw).unwrap();
        assert_eq!(first, second);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM program_entities"), 1);
    }

    #[test]
    fn packages_are_scoped_to_projects() {
        let store = geo_store();
        store.store(&class("Shape", "geo", &[])).unwrap();
        store.set_project("geo", "2.0").unwrap();
        store.store(&class("Shape", "geo", &[])).unwrap();

        assert_eq!(count(&store, "SELECT COUNT(*) FROM package_names"), 1);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM packages"), 2);
        assert_eq!(store.package_names_for_project("geo 2.0").unwrap(), vec!["geo"]);
    }

    #[test]
    fn method_signature_sentinel_for_non_methods() {
        let store = geo_store();
        store.store(&member("count", Species::Field, "int")).unwrap();
        assert_eq!(
            count(&store, "SELECT method_signature_key FROM program_entities"),
            0
        );
        assert_eq!(store.dictionary_len(DictionaryKind::MethodSignature), 0);
    }

    #[test]
    fn failed_store_rolls_back_rows_and_cache() {
        let store = geo_store();
        let mut raw = method("orphanMethod", "()void");
        raw.method_signature = None;
        raw.file_name = "src/geo/Orphan.java".into();
        raw.package_name = "orphans".into();

        let err = store.store(&raw).unwrap_err();
        assert!(matches!(err, NamebankError::Store(StoreError::MissingSignature(_))));

        assert_eq!(store.dictionary_len(DictionaryKind::FileName), 0);
        assert_eq!(store.dictionary_len(DictionaryKind::PackageName), 0);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM files"), 0);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM projects"), 0);
        assert!(store.project_list().unwrap().is_empty());

        // The store is still usable afterwards.
        store.store(&method("draw", "()void")).unwrap();
        assert_eq!(store.project_list().unwrap(), vec!["geo 1.0"]);
        assert_eq!(count(&store, "SELECT COUNT(*) FROM projects"), 1);
    }

    #[test]
    fn panicking_tokenizer_leaves_store_consistent() {
        #[derive(Debug)]
        struct Explosive;
        impl Tokenizer for Explosive {
            fn tokenize(&self, name: &str) -> Vec<String> {
                assert_ne!(name, "boom", "tokenizer gave up");
                IdentifierTokenizer::default().tokenize(name)
            }
        }

        let store = geo_store();
        store.set_tokenizer(Box::new(Explosive));
        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.store(&member("boom", Species::Field, "int"))
        }));
        assert!(panicked.is_err());

        // "int" was interned before the panic; its row is gone and so is
        // the cache entry.
        assert_eq!(store.dictionary_len(DictionaryKind::IdentifierName), 0);
        assert_eq!(store.dictionary_len(DictionaryKind::TypeName), 0);
        assert!(store.project_list().unwrap().is_empty());
        assert_eq!(count(&store, "SELECT COUNT(*) FROM identifier_names"), 0);

        store.set_tokenizer_options(TokenizerOptions::default());
        store.store(&member("boom", Species::Field, "int")).unwrap();
        store.store(&member("depth", Species::Field, "int")).unwrap();
        assert_eq!(
            store.identifier_names_for("geo 1.0", Some(Species::Field)).unwrap(),
            vec!["boom", "depth"]
        );
        assert_eq!(store.project_list().unwrap(), vec!["geo 1.0"]);
    }

    #[test]
    fn unreadable_rows_are_skipped_in_listings() {
        let store = geo_store();
        let alpha = store.store(&method("alpha", "()void")).unwrap();
        store.store(&method("beta", "(int;)void")).unwrap();
        store
            .lock()
            .conn
            .execute(
                "UPDATE program_entities SET method_signature_key = 999 WHERE entity_key = ?1",
                params![alpha.0],
            )
            .unwrap();

        let listed = store.entities_for_project("geo 1.0").unwrap();
        let names: Vec<&str> = listed.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["beta"]);
        assert!(store.entity(alpha).is_err());
    }

    #[test]
    fn anonymous_names_are_flagged_and_not_tokenized() {
        let store = geo_store();
        let key = store
            .store(&member(crate::types::ANONYMOUS_NAME, Species::Class, "Runnable"))
            .unwrap();
        let entity = store.entity(key).unwrap().unwrap();
        assert!(entity.is_anonymous);
        assert!(entity.tokens.is_empty());
    }

    #[test]
    fn untyped_entities_get_placeholder_type() {
        let store = geo_store();
        let mut raw = member("loop", Species::Label, "");
        raw.type_name = TypeName::simple("");
        let key = store.store(&raw).unwrap();
        let entity = store.entity(key).unwrap().unwrap();
        assert_eq!(entity.type_name, crate::types::NO_TYPE);
        assert!(!entity.has_type());
    }

    #[test]
    fn concurrent_writers_share_one_dictionary_entry() {
        let store = Arc::new(geo_store());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..10 {
                        let mut raw = member("sharedName", Species::Field, "int");
                        raw.file_name = format!("src/geo/F{t}_{i}.java");
                        store.store(&raw).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(count(&store, "SELECT COUNT(*) FROM program_entities"), 40);
        assert_eq!(
            count(&store, "SELECT COUNT(*) FROM identifier_names WHERE identifier_name = 'sharedName'"),
            1
        );
        assert_eq!(store.project_list().unwrap(), vec!["geo 1.0"]);
    }

    // ── Reads ──────────────────────────────────────────────────────

    #[test]
    fn tokens_come_back_in_order() {
        let store = geo_store();
        store
            .store(&method("getHTMLParserFactory", "()Factory"))
            .unwrap();
        assert_eq!(
            store.tokens_for("getHTMLParserFactory").unwrap(),
            vec!["get", "html", "parser", "factory"]
        );
        assert!(store.tokens_for("neverStored").unwrap().is_empty());
    }

    #[test]
    fn tokens_are_reordered_by_stored_position() {
        let store = geo_store();
        {
            let state = store.lock();
            let conn = &state.conn;
            conn.execute_batch(
                "INSERT INTO identifier_names (identifier_name_key, identifier_name) VALUES (900, 'zeroOneTwo');
                 INSERT INTO tokens (token_key, token) VALUES (901, 'zero'), (902, 'one'), (903, 'two');
                 INSERT INTO token_positions (identifier_name_key, position, token_key) VALUES (900, 3, 903);
                 INSERT INTO token_positions (identifier_name_key, position, token_key) VALUES (900, 1, 901);
                 INSERT INTO token_positions (identifier_name_key, position, token_key) VALUES (900, 2, 902);",
            )
            .unwrap();
        }
        // Pick up the hand-written rows.
        {
            let mut state = store.lock();
            state.dicts = Dictionaries::load(&state.conn).unwrap();
        }
        assert_eq!(
            store.tokens_for("zeroOneTwo").unwrap(),
            vec!["zero", "one", "two"]
        );
    }

    #[test]
    fn shapes_follow_species() {
        let store = geo_store();
        let mut child = class("Circle", "geo", &[("Shape", "geo.Shape")]);
        child.super_types = vec![TypeName::new("Drawable", "geo.Drawable")];
        let class_key = store.store(&child).unwrap();
        let method_key = store.store(&method("scaleBy", "(double;double;)void")).unwrap();
        let field_key = store.store(&member("radius", Species::Field, "double")).unwrap();

        let circle = store.entity(class_key).unwrap().unwrap();
        match &circle.shape {
            EntityShape::Inheritable {
                super_classes,
                super_types,
            } => {
                assert_eq!(super_classes.len(), 1);
                assert_eq!(super_classes["Shape"], vec!["shape"]);
                assert_eq!(super_types["Drawable"], vec!["drawable"]);
            }
            other => panic!("expected inheritable shape, got {other:?}"),
        }
        assert_eq!(circle.modifiers, vec![Modifier::Public]);
        assert_eq!(circle.fqn(), "geo.Circle");
        assert_eq!(circle.type_name, "geo.Circle");

        let scale = store.entity(method_key).unwrap().unwrap();
        assert_eq!(
            scale.shape,
            EntityShape::Invokable {
                signature: "(double;double;)void".to_string(),
                argument_count: 2,
            }
        );
        assert_eq!(scale.tokens, vec!["scale", "by"]);

        let radius = store.entity(field_key).unwrap().unwrap();
        assert_eq!(radius.shape, EntityShape::Plain);
        assert_eq!(radius.project, ProjectDetails::new("geo", "1.0"));
        assert_eq!(radius.span, SourceSpan::new(5, 5, 5, 30));
        assert_eq!(radius.file_name, "src/geo/Shape.java");
    }

    #[test]
    fn sub_classes_by_lexical_name() {
        let store = geo_store();
        store.store(&class("Base", "geo", &[])).unwrap();
        store
            .store(&class("Child", "geo", &[("Base", "geo.Base")]))
            .unwrap();

        let subs = store.sub_classes_for("Base").unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].name, "Child");

        // An unrelated Base elsewhere also matches by name.
        store.store(&class("Base", "other", &[])).unwrap();
        store
            .store(&class("Stranger", "other", &[("Base", "other.Base")]))
            .unwrap();
        let mut names: Vec<String> = store
            .sub_classes_for("Base")
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Child", "Stranger"]);

        assert!(store.sub_classes_for("Child").unwrap().is_empty());
        assert!(store.sub_classes_for("Nope").unwrap().is_empty());
    }

    #[test]
    fn sub_types_and_super_names() {
        let store = geo_store();
        let mut circle = class("Circle", "geo", &[("Shape", "geo.Shape")]);
        circle.super_types = vec![
            TypeName::new("Drawable", "geo.Drawable"),
            TypeName::new("Comparable", "java.lang.Comparable"),
        ];
        let key = store.store(&circle).unwrap();

        let subs = store.sub_types_for("Comparable").unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].key, key);
        assert_eq!(store.super_class_names_for(key).unwrap(), vec!["Shape"]);
        assert_eq!(
            store.super_type_names_for(key).unwrap(),
            vec!["Drawable", "Comparable"]
        );
    }

    #[test]
    fn super_lists_ignored_for_non_classes() {
        let store = geo_store();
        let mut raw = member("size", Species::Field, "int");
        raw.super_classes = vec![TypeName::simple("Base")];
        store.store(&raw).unwrap();
        assert_eq!(count(&store, "SELECT COUNT(*) FROM super_class_xref"), 0);
        assert!(store.sub_classes_for("Base").unwrap().is_empty());
    }

    #[test]
    fn name_listings() {
        let store = geo_store();
        store.store(&class("Shape", "geo", &[])).unwrap();
        store.store(&class("Circle", "geo", &[])).unwrap();
        store.store(&class("Point", "geo.util", &[])).unwrap();
        let mut hidden = member("secret", Species::Field, "int");
        hidden.modifiers = vec![Modifier::Private, Modifier::Final];
        store.store(&hidden).unwrap();
        store.store(&member("open", Species::Field, "int")).unwrap();

        assert_eq!(
            store.class_names_for_package("geo 1.0", "geo").unwrap(),
            vec!["Circle", "Shape"]
        );
        assert_eq!(
            store.class_names_for_package("geo 1.0", "geo.util").unwrap(),
            vec!["Point"]
        );
        assert_eq!(
            store.all_class_names_for("geo 1.0").unwrap(),
            vec!["Circle", "Point", "Shape"]
        );
        assert_eq!(
            store.identifier_names_for("geo 1.0", Some(Species::Field)).unwrap(),
            vec!["open", "secret"]
        );
        assert_eq!(store.identifier_names_for("geo 1.0", None).unwrap().len(), 5);
        assert_eq!(
            store
                .identifier_names_with_modifier("geo 1.0", Species::Field, Modifier::Private)
                .unwrap(),
            vec!["secret"]
        );
        assert_eq!(
            store.package_names_for_project("geo 1.0").unwrap(),
            vec!["geo", "geo.util"]
        );
        assert!(store.identifier_names_for("missing 0", None).unwrap().is_empty());
    }

    #[test]
    fn package_name_and_project_details_by_key() {
        let store = geo_store();
        store.store(&class("Shape", "geo", &[])).unwrap();
        let (package_key, project_key): (i64, i64) = store
            .lock()
            .conn
            .query_row("SELECT package_key, project_key FROM program_entities", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();

        assert_eq!(
            store.package_name_for(PackageKey(package_key)).unwrap(),
            Some("geo".to_string())
        );
        assert_eq!(store.package_name_for(PackageKey(9999)).unwrap(), None);
        assert_eq!(
            store.project_details(ProjectKey(project_key)).unwrap(),
            Some(ProjectDetails::new("geo", "1.0"))
        );
    }

    #[test]
    fn entity_listings_by_species() {
        let store = geo_store();
        store.store(&class("Shape", "geo", &[])).unwrap();
        let mut drawable = class("Drawable", "geo", &[]);
        drawable.species = Species::Interface;
        store.store(&drawable).unwrap();
        store.store(&member("area", Species::Field, "double")).unwrap();

        assert_eq!(store.entities_for_project("geo 1.0").unwrap().len(), 3);
        assert_eq!(
            store
                .entities_for_project_by_species("geo 1.0", Species::Field)
                .unwrap()
                .len(),
            1
        );
        let types = store.all_classes_and_interfaces_for("geo 1.0").unwrap();
        assert_eq!(types.len(), 2);
        assert!(types.iter().all(|e| e.super_classes().is_some()));
        assert_eq!(store.entities_by_species(Species::Interface).unwrap().len(), 1);
    }

    #[test]
    fn entity_set_where_filters_type_group() {
        let store = geo_store();
        store.store(&member("count", Species::Field, "int")).unwrap();
        store.store(&member("total", Species::Field, "Long")).unwrap();
        store.store(&member("label", Species::Field, "String")).unwrap();
        let mut qualified = member("title", Species::Field, "String");
        qualified.type_name = TypeName::new("String", "java.lang.String");
        store.store(&qualified).unwrap();
        store.store(&member("enabled", Species::Field, "boolean")).unwrap();

        let numeric = store
            .entity_set_where(Species::Field, 0, TypeGroup::Numeric)
            .unwrap();
        let names: Vec<&str> = numeric.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["count", "total"]);

        let strings = store
            .entity_set_where(Species::Field, 0, TypeGroup::String)
            .unwrap();
        assert_eq!(strings.len(), 2);

        let limited = store
            .entity_set_where(Species::Field, 1, TypeGroup::Numeric)
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn class_or_interface_by_fqn() {
        let store = geo_store();
        store.store(&class("Shape", "geo", &[])).unwrap();

        let found = store.class_or_interface_for("geo 1.0", "geo.Shape").unwrap();
        assert_eq!(found.map(|e| e.name), Some("Shape".to_string()));
        assert!(store.class_or_interface_for("geo 1.0", "other.Shape").unwrap().is_none());
        assert!(store.class_or_interface_for("nope 1", "geo.Shape").unwrap().is_none());
    }

    #[test]
    fn entity_candidates_require_type_species() {
        let store = geo_store();
        store.store(&class("Shape", "geo", &[])).unwrap();
        store.store(&class("Shape", "other", &[])).unwrap();

        assert_eq!(
            store.entity_candidates_for("Shape", Species::Class).unwrap().len(),
            2
        );
        assert!(store.entity_candidates_for("Shape", Species::Interface).unwrap().is_empty());
        assert!(matches!(
            store.entity_candidates_for("Shape", Species::Field),
            Err(NamebankError::InvalidArgument(_))
        ));
    }

    #[test]
    fn modifiers_for_entity() {
        let store = geo_store();
        let mut raw = member("LIMIT", Species::Field, "int");
        raw.modifiers = vec![Modifier::Final, Modifier::Public, Modifier::Static];
        let key = store.store(&raw).unwrap();
        assert_eq!(
            store.modifiers_for(key).unwrap(),
            vec![Modifier::Public, Modifier::Static, Modifier::Final]
        );
    }

    // ── Sampling ───────────────────────────────────────────────────

    fn store_fields(store: &EntityStore, names: &[&str]) {
        for name in names {
            store.store(&member(name, Species::Field, "int")).unwrap();
        }
    }

    #[test]
    fn name_set_all_sentinel_and_min_length() {
        let store = geo_store();
        store_fields(&store, &["x", "id", "count", "maxValue", "count"]);

        let request = NameSetRequest {
            project: None,
            species: Species::Field,
            count: 0,
            min_length: 2,
        };
        assert_eq!(
            store.name_set_for(&request).unwrap(),
            vec!["count", "id", "maxValue"]
        );
    }

    #[test]
    fn name_set_samples_exact_count() {
        let store = geo_store();
        let names: Vec<String> = (0..30).map(|i| format!("field{i:02}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        store_fields(&store, &refs);

        let request = NameSetRequest {
            project: Some("geo 1.0".to_string()),
            species: Species::Field,
            count: 5,
            min_length: 1,
        };
        let mut rng = StdRng::seed_from_u64(11);
        let picked = store.name_set_with_rng(&request, &mut rng).unwrap();
        assert_eq!(picked.len(), 5);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
        assert!(picked.iter().all(|p| names.contains(p)));

        // Same seed, same sample.
        let mut rng = StdRng::seed_from_u64(11);
        assert_eq!(store.name_set_with_rng(&request, &mut rng).unwrap(), picked);
    }

    #[test]
    fn name_set_scoped_to_project() {
        let store = geo_store();
        store_fields(&store, &["alpha"]);
        store.set_project("other", "1").unwrap();
        store_fields(&store, &["beta"]);

        let request = NameSetRequest {
            project: Some("other 1".to_string()),
            species: Species::Field,
            count: 0,
            min_length: 0,
        };
        assert_eq!(store.name_set_for(&request).unwrap(), vec!["beta"]);

        let everywhere = NameSetRequest {
            project: None,
            ..request
        };
        assert_eq!(store.name_set_for(&everywhere).unwrap(), vec!["alpha", "beta"]);
    }

    #[test]
    fn tokenised_name_set_sorts_rendered_names() {
        let store = geo_store();
        store_fields(&store, &["zeroCount", "aValue", "Zebra"]);

        let request = NameSetRequest {
            project: None,
            species: Species::Field,
            count: 0,
            min_length: 0,
        };
        // Plain sort is case-sensitive on the names; tokenised sort is on
        // the lowercased renderings.
        assert_eq!(
            store.name_set_for(&request).unwrap(),
            vec!["Zebra", "aValue", "zeroCount"]
        );
        assert_eq!(
            store.tokenised_name_set_for(&request).unwrap(),
            vec!["a value", "zebra", "zero count"]
        );
    }

    #[test]
    fn tokenized_sample_with_seeded_rng() {
        let store = geo_store();
        store_fields(&store, &["maxValue", "minValue", "itemCount", "pageSize"]);

        let request = NameSetRequest {
            project: None,
            species: Species::Field,
            count: 2,
            min_length: 1,
        };
        let mut rng = StdRng::seed_from_u64(5);
        let rendered = store.tokenised_name_set_with_rng(&request, &mut rng).unwrap();
        assert_eq!(rendered.len(), 2);
        assert!(rendered.windows(2).all(|w| w[0] <= w[1]));
        assert!(rendered.iter().all(|r| r.contains(' ')));
    }

    #[test]
    fn tokenizer_options_apply_to_new_names_only() {
        let store = geo_store();
        store.store(&member("utf8Decoder", Species::Field, "int")).unwrap();
        store.set_tokenizer_options(TokenizerOptions {
            recursive_split: true,
            modal_expansion: true,
        });
        store.store(&member("utf8Decoder", Species::LocalVariable, "int")).unwrap();
        store.store(&member("base64Text", Species::Field, "int")).unwrap();
        store.store(&member("cantStop", Species::Field, "int")).unwrap();

        // Already tokenized names keep their stored tokens.
        assert_eq!(store.tokens_for("utf8Decoder").unwrap(), vec!["utf8", "decoder"]);
        assert_eq!(store.tokens_for("base64Text").unwrap(), vec!["base", "64", "text"]);
        assert_eq!(store.tokens_for("cantStop").unwrap(), vec!["can", "not", "stop"]);
    }

    #[test]
    fn custom_tokenizer_is_used() {
        #[derive(Debug)]
        struct Whole;
        impl Tokenizer for Whole {
            fn tokenize(&self, name: &str) -> Vec<String> {
                vec![name.to_string()]
            }
        }

        let store = geo_store();
        store.set_tokenizer(Box::new(Whole));
        store.store(&member("fooBar", Species::Field, "int")).unwrap();
        assert_eq!(store.tokens_for("fooBar").unwrap(), vec!["foobar"]);
    }

    #[test]
    fn derived_token_views() {
        let store = geo_store();
        let key = store.store(&method("openSubMenu", "()void")).unwrap();
        let entity = store.entity(key).unwrap().unwrap();
        assert_eq!(entity.tokens, vec!["open", "sub", "menu"]);
        assert_eq!(entity.sub_concatenated_tokens(), vec!["open", "submenu"]);

        let key = store.store(&member("dontCache", Species::Field, "boolean")).unwrap();
        let entity = store.entity(key).unwrap().unwrap();
        assert_eq!(entity.modal_expanded_tokens(), vec!["do", "not", "cache"]);
        assert!(entity.has_type());
    }

    #[test]
    fn file_store_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("names.db");
        let store = EntityStore::open(&path).unwrap();
        assert_eq!(store.db_path(), Some(path.as_path()));
        assert!(EntityStore::in_memory().unwrap().db_path().is_none());
    }

    #[test]
    fn entity_display_summary() {
        let store = geo_store();
        let key = store.store(&member("radius", Species::Field, "double")).unwrap();
        let entity = store.entity(key).unwrap().unwrap();
        insta::assert_snapshot!(entity.to_string(), @"field geo.radius : double (src/geo/Shape.java:5:5)");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::tokenize::IdentifierTokenizer;
    use crate::types::{SourceSpan, TypeName};
    use proptest::prelude::*;

    fn field(name: &str) -> RawEntity {
        RawEntity {
            file_name: "F.java".to_string(),
            package_name: "p".to_string(),
            container_uid: "c".to_string(),
            entity_uid: name.to_string(),
            name: name.to_string(),
            species: Species::Field,
            type_name: TypeName::simple("int"),
            is_array: false,
            is_loop_control_var: false,
            method_signature: None,
            modifiers: Vec::new(),
            super_classes: Vec::new(),
            super_types: Vec::new(),
            span: SourceSpan::default(),
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(30))]

        /// Stored tokens equal the lowercased tokenizer output, in order.
        #[test]
        fn tokens_round_trip(name in "[a-z]{1,6}([A-Z][a-z]{1,6}){0,3}") {
            let store = EntityStore::in_memory().unwrap();
            store.set_project("p", "1").unwrap();
            store.store(&field(&name)).unwrap();

            let expected: Vec<String> = IdentifierTokenizer::default()
                .tokenize(&name)
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect();
            prop_assert_eq!(store.tokens_for(&name).unwrap(), expected);
        }

        /// One identifier entry per distinct name however often it is stored.
        #[test]
        fn one_entry_per_distinct_name(names in proptest::collection::vec("[a-z]{1,5}", 1..20)) {
            let store = EntityStore::in_memory().unwrap();
            store.set_project("p", "1").unwrap();
            for name in &names {
                store.store(&field(name)).unwrap();
            }
            let distinct: std::collections::HashSet<&String> = names.iter().collect();
            // "int" is interned as the type's identifier name too.
            let extra = usize::from(!distinct.iter().any(|n| n.as_str() == "int"));
            prop_assert_eq!(
                store.dictionary_len(DictionaryKind::IdentifierName),
                distinct.len() + extra
            );
            prop_assert_eq!(store.stats().unwrap().total_entities, names.len() as u64);
        }
    }
}
