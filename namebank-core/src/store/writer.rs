//! Normalizing writes: one raw entity becomes dictionary entries, a fact
//! row and its edges, all inside one transaction.

use rusqlite::Connection;
use tracing::debug;

use crate::config::DuplicatePolicy;
use crate::dictionary::{Dictionaries, DictionaryKind};
use crate::error::StoreError;
use crate::tokenize::Tokenizer;
use crate::types::{ANONYMOUS_NAME, EntityKey, NO_TYPE, PackageKey, ProjectKey, RawEntity, TypeName};

use super::repo::{self, EdgeTable, NewFact};
use super::sqlite::{RunState, StoreState};

/// Cache entries added during one `store()` call, undone if it fails.
#[derive(Debug, Default)]
struct InternJournal {
    entries: Vec<(DictionaryKind, i64)>,
    project: Option<String>,
    packages: Vec<i64>,
}

impl InternJournal {
    fn undo(self, dicts: &mut Dictionaries, run: &mut RunState) {
        for (kind, key) in self.entries.into_iter().rev() {
            dicts.get_mut(kind).remove(key);
        }
        if let Some(composite) = self.project {
            dicts.projects.remove(&composite);
            run.project_key = None;
        }
        for package_name_key in self.packages {
            run.packages.remove(&package_name_key);
        }
    }
}

/// Borrowed view of the store state a single write works against.
struct Writer<'c, 'd> {
    conn: &'c Connection,
    dicts: &'d mut Dictionaries,
    run: &'d mut RunState,
    tokenizer: &'d dyn Tokenizer,
    journal: InternJournal,
}

impl StoreState {
    pub(crate) fn store_entity(&mut self, raw: &RawEntity) -> Result<EntityKey, StoreError> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }

        let StoreState {
            conn,
            dicts,
            run,
            tokenizer,
            duplicates,
            ..
        } = self;

        let tx = conn.unchecked_transaction()?;
        let mut writer = Writer {
            conn: &tx,
            dicts,
            run,
            tokenizer: &**tokenizer,
            journal: InternJournal::default(),
        };
        let written = writer.write(raw, *duplicates);
        let Writer {
            dicts, run, journal, ..
        } = writer;

        let outcome = written.and_then(|key| tx.commit().map(|()| key).map_err(StoreError::Sqlite));
        if outcome.is_err() {
            // The transaction rolled back on drop; forget what it interned.
            journal.undo(dicts, run);
        }
        outcome
    }
}

impl Writer<'_, '_> {
    fn write(&mut self, raw: &RawEntity, duplicates: DuplicatePolicy) -> Result<EntityKey, StoreError> {
        let project_key = self.project_key()?;

        if duplicates == DuplicatePolicy::Skip {
            if let Some(existing) =
                repo::find_duplicate(self.conn, project_key, &raw.container_uid, &raw.entity_uid)?
            {
                debug!(entity_key = existing.0, name = %raw.name, "Skipping duplicate entity");
                return Ok(existing);
            }
        }

        let file_key = self.file_key(&raw.file_name)?;
        let package_key = self.package_key(project_key, &raw.package_name)?;

        let method_signature_key = if raw.species.is_method_or_constructor() {
            let signature = raw
                .method_signature
                .as_deref()
                .ok_or_else(|| StoreError::MissingSignature(raw.name.clone()))?;
            self.intern(DictionaryKind::MethodSignature, signature)?
        } else {
            0
        };

        let type_name_key = if raw.type_name.name.is_empty() {
            self.type_name_key(&TypeName::simple(NO_TYPE))?
        } else {
            self.type_name_key(&raw.type_name)?
        };

        let identifier_name_key = self.identifier_name_key(&raw.name)?;
        let species_key = self.seeded_key(DictionaryKind::Species, raw.species.as_str())?;

        let entity_key = repo::insert_entity(
            self.conn,
            &NewFact {
                project_key,
                package_key,
                identifier_name_key,
                container_uid: &raw.container_uid,
                entity_uid: &raw.entity_uid,
                species_key,
                type_name_key,
                method_signature_key,
                is_anonymous: raw.name == ANONYMOUS_NAME,
                file_key,
                is_array: raw.is_array,
                is_loop_control_var: raw.is_loop_control_var,
                span: raw.span,
            },
        )?;

        for modifier in &raw.modifiers {
            let modifier_key = self.seeded_key(DictionaryKind::Modifier, modifier.as_str())?;
            repo::insert_edge(self.conn, EdgeTable::Modifier, entity_key, modifier_key)?;
        }

        if raw.species.is_class_or_interface() {
            for super_class in &raw.super_classes {
                let type_key = self.type_name_key(super_class)?;
                repo::insert_edge(self.conn, EdgeTable::SuperClass, entity_key, type_key)?;
            }
            for super_type in &raw.super_types {
                let type_key = self.type_name_key(super_type)?;
                repo::insert_edge(self.conn, EdgeTable::SuperType, entity_key, type_key)?;
            }
        }

        debug!(
            entity_key = entity_key.0,
            name = %raw.name,
            species = %raw.species,
            interned = self.journal.entries.len(),
            "Stored entity"
        );
        Ok(entity_key)
    }

    /// Project key for this run, registering the project on first use.
    fn project_key(&mut self) -> Result<ProjectKey, StoreError> {
        if let Some(key) = self.run.project_key {
            return Ok(key);
        }
        let project = self.run.project.clone().ok_or(StoreError::NoProject)?;
        let composite = project.composite();

        let key = if let Some(key) = self.dicts.projects.get(&composite) {
            key
        } else {
            let key = repo::insert_project(self.conn, &project.name, &project.version)?;
            self.dicts.projects.insert(composite.clone(), key);
            self.journal.project = Some(composite);
            debug!(project_key = key.0, project = %project, "Registered project");
            key
        };
        self.run.project_key = Some(key);
        Ok(key)
    }

    /// File keys are resolved against the store itself, then mirrored into
    /// the file-name dictionary for reads.
    fn file_key(&mut self, file_name: &str) -> Result<i64, StoreError> {
        let key = match repo::find_file_key(self.conn, file_name)? {
            Some(key) => key,
            None => {
                let key = repo::insert_dictionary_value(self.conn, DictionaryKind::FileName, file_name)?;
                self.journal.entries.push((DictionaryKind::FileName, key));
                key
            }
        };
        let files = self.dicts.get_mut(DictionaryKind::FileName);
        if files.get_value(key).is_none() {
            files.put(key, file_name);
        }
        Ok(key)
    }

    fn package_key(&mut self, project_key: ProjectKey, package_name: &str) -> Result<PackageKey, StoreError> {
        let package_name_key = self.intern(DictionaryKind::PackageName, package_name)?;
        if let Some(key) = self.run.packages.get(&package_name_key) {
            return Ok(*key);
        }
        let key = match repo::find_package_key(self.conn, project_key, package_name_key)? {
            Some(key) => key,
            None => repo::insert_package(self.conn, project_key, package_name_key)?,
        };
        self.run.packages.insert(package_name_key, key);
        self.journal.packages.push(package_name_key);
        Ok(key)
    }

    /// Look a value up, inserting it on a miss.
    fn intern(&mut self, kind: DictionaryKind, value: &str) -> Result<i64, StoreError> {
        if let Some(key) = self.dicts.get(kind).get_key(value) {
            return Ok(key);
        }
        let key = repo::insert_dictionary_value(self.conn, kind, value)?;
        self.dicts.get_mut(kind).put(key, value);
        self.journal.entries.push((kind, key));
        Ok(key)
    }

    /// Species and modifiers are seeded with the schema and never grow.
    fn seeded_key(&self, kind: DictionaryKind, value: &str) -> Result<i64, StoreError> {
        self.dicts
            .get(kind)
            .get_key(value)
            .ok_or_else(|| StoreError::UnresolvedKey {
                category: kind.as_str(),
                value: value.to_string(),
            })
    }

    fn type_name_key(&mut self, type_name: &TypeName) -> Result<i64, StoreError> {
        let display = type_name.display_name();
        if let Some(key) = self.dicts.get(DictionaryKind::TypeName).get_key(display) {
            return Ok(key);
        }
        let identifier_name_key = self.identifier_name_key(&type_name.name)?;
        let key = repo::insert_type_name(self.conn, display, identifier_name_key)?;
        self.dicts.get_mut(DictionaryKind::TypeName).put(key, display);
        self.journal.entries.push((DictionaryKind::TypeName, key));
        Ok(key)
    }

    /// Identifier-name key; a new name is tokenized exactly once, here.
    fn identifier_name_key(&mut self, name: &str) -> Result<i64, StoreError> {
        if let Some(key) = self.dicts.get(DictionaryKind::IdentifierName).get_key(name) {
            return Ok(key);
        }
        let key = repo::insert_dictionary_value(self.conn, DictionaryKind::IdentifierName, name)?;
        self.dicts.get_mut(DictionaryKind::IdentifierName).put(key, name);
        self.journal.entries.push((DictionaryKind::IdentifierName, key));

        // Placeholder names such as #anonymous# carry no words.
        if !name.starts_with('#') {
            let tokens = self.tokenizer.tokenize(name);
            for (position, token) in (1_i64..).zip(tokens) {
                let token_key = self.intern(DictionaryKind::Token, &token.to_lowercase())?;
                repo::insert_token_position(self.conn, key, position, token_key)?;
            }
        }
        Ok(key)
    }
}
