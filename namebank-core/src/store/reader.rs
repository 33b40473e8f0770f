//! Reconstruction of program entities from fact rows and dictionaries.

use std::collections::{BTreeMap, HashSet};

use rusqlite::ToSql;
use tracing::{debug, warn};

use crate::dictionary::DictionaryKind;
use crate::error::{NamebankError, Result, StoreError};
use crate::types::{
    EntityKey, EntityShape, Modifier, NameSetRequest, PackageKey, ProgramEntity, ProjectDetails,
    ProjectKey, ShapeKind, Species, TypeGroup, argument_count,
};

use super::repo::{self, EdgeTable, FactRow};
use super::sqlite::StoreState;

const PACKAGE_JOIN: &str = "JOIN packages p ON p.package_key = e.package_key";
const MODIFIER_JOIN: &str = "JOIN modifier_xref m ON m.entity_key = e.entity_key";

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

impl StoreState {
    fn known_project(&self, project: &str) -> Option<ProjectKey> {
        let key = self.dicts.projects.get(project);
        if key.is_none() {
            warn!(project, "Unknown project");
        }
        key
    }

    fn dict_value(&self, kind: DictionaryKind, key: i64) -> std::result::Result<&str, StoreError> {
        self.dicts
            .get(kind)
            .get_value(key)
            .ok_or_else(|| StoreError::UnresolvedKey {
                category: kind.as_str(),
                value: key.to_string(),
            })
    }

    fn species_key(&self, species: Species) -> Option<i64> {
        self.dicts
            .get(DictionaryKind::Species)
            .get_key(species.as_str())
    }

    fn names_for_keys(&self, keys: Vec<i64>) -> Vec<String> {
        let names = self.dicts.get(DictionaryKind::IdentifierName);
        let mut resolved: Vec<String> = keys
            .into_iter()
            .filter_map(|key| {
                let name = names.get_value(key);
                if name.is_none() {
                    warn!(identifier_name_key = key, "Identifier name missing from dictionary");
                }
                name.map(str::to_string)
            })
            .collect();
        resolved.sort();
        resolved
    }

    // ── Projects and packages ──────────────────────────────────────

    pub(crate) fn project_details(&self, project_key: ProjectKey) -> Result<Option<ProjectDetails>> {
        let row = repo::project_row(&self.conn, project_key).map_err(StoreError::Sqlite)?;
        Ok(row.map(|(name, version)| ProjectDetails { name, version }))
    }

    pub(crate) fn package_name_for(&self, package_key: PackageKey) -> Result<Option<String>> {
        let Some(name_key) =
            repo::package_name_key(&self.conn, package_key).map_err(StoreError::Sqlite)?
        else {
            return Ok(None);
        };
        Ok(self
            .dicts
            .get(DictionaryKind::PackageName)
            .get_value(name_key)
            .map(str::to_string))
    }

    pub(crate) fn package_names_for_project(&self, project: &str) -> Result<Vec<String>> {
        let Some(project_key) = self.known_project(project) else {
            return Ok(Vec::new());
        };
        let package_names = self.dicts.get(DictionaryKind::PackageName);
        let mut names: Vec<String> =
            repo::package_name_keys_for_project(&self.conn, project_key)
                .map_err(StoreError::Sqlite)?
                .into_iter()
                .filter_map(|key| package_names.get_value(key).map(str::to_string))
                .collect();
        names.sort();
        Ok(names)
    }

    // ── Names ──────────────────────────────────────────────────────

    /// Tokens of an identifier name; unknown names yield no tokens.
    pub(crate) fn tokens_for(&self, name: &str) -> Vec<String> {
        match self.dicts.get(DictionaryKind::IdentifierName).get_key(name) {
            Some(key) => self.tokens_for_key(key),
            None => {
                warn!(name, "No identifier name stored");
                Vec::new()
            }
        }
    }

    fn tokens_for_key(&self, identifier_name_key: i64) -> Vec<String> {
        let mut positions = match repo::token_positions(&self.conn, identifier_name_key) {
            Ok(positions) => positions,
            Err(e) => {
                warn!(identifier_name_key, error = %e, "Failed to read token positions");
                return Vec::new();
            }
        };
        // Storage order is not guaranteed; the stored position is.
        positions.sort_by_key(|(position, _)| *position);

        let tokens = self.dicts.get(DictionaryKind::Token);
        positions
            .into_iter()
            .filter_map(|(position, token_key)| {
                let token = tokens.get_value(token_key);
                if token.is_none() {
                    warn!(identifier_name_key, position, token_key, "Token missing from dictionary");
                }
                token.map(str::to_string)
            })
            .collect()
    }

    pub(crate) fn class_names_for_package(&self, project: &str, package: &str) -> Result<Vec<String>> {
        let Some(project_key) = self.known_project(project) else {
            return Ok(Vec::new());
        };
        let Some(package_name_key) = self.dicts.get(DictionaryKind::PackageName).get_key(package)
        else {
            return Ok(Vec::new());
        };
        let Some(class_key) = self.species_key(Species::Class) else {
            return Ok(Vec::new());
        };
        let keys = repo::identifier_keys(
            &self.conn,
            PACKAGE_JOIN,
            "e.project_key = ? AND p.package_name_key = ? AND e.species_key = ?",
            &[&project_key.0, &package_name_key, &class_key],
        )
        .map_err(StoreError::Sqlite)?;
        Ok(self.names_for_keys(keys))
    }

    pub(crate) fn identifier_names_for(
        &self,
        project: &str,
        species: Option<Species>,
    ) -> Result<Vec<String>> {
        let Some(project_key) = self.known_project(project) else {
            return Ok(Vec::new());
        };
        let keys = match species {
            Some(species) => {
                let Some(species_key) = self.species_key(species) else {
                    return Ok(Vec::new());
                };
                repo::identifier_keys(
                    &self.conn,
                    "",
                    "e.project_key = ? AND e.species_key = ?",
                    &[&project_key.0, &species_key],
                )
            }
            None => repo::identifier_keys(&self.conn, "", "e.project_key = ?", &[&project_key.0]),
        }
        .map_err(StoreError::Sqlite)?;
        Ok(self.names_for_keys(keys))
    }

    pub(crate) fn identifier_names_with_modifier(
        &self,
        project: &str,
        species: Species,
        modifier: Modifier,
    ) -> Result<Vec<String>> {
        let Some(project_key) = self.known_project(project) else {
            return Ok(Vec::new());
        };
        let (Some(species_key), Some(modifier_key)) = (
            self.species_key(species),
            self.dicts
                .get(DictionaryKind::Modifier)
                .get_key(modifier.as_str()),
        ) else {
            return Ok(Vec::new());
        };
        let keys = repo::identifier_keys(
            &self.conn,
            MODIFIER_JOIN,
            "e.project_key = ? AND e.species_key = ? AND m.modifier_key = ?",
            &[&project_key.0, &species_key, &modifier_key],
        )
        .map_err(StoreError::Sqlite)?;
        Ok(self.names_for_keys(keys))
    }

    /// Distinct names of the requested species at least `min_length`
    /// characters long, sorted.
    pub(crate) fn candidate_names(&self, request: &NameSetRequest) -> Result<Vec<String>> {
        let Some(species_key) = self.species_key(request.species) else {
            return Ok(Vec::new());
        };
        let keys = match &request.project {
            Some(project) => {
                let Some(project_key) = self.known_project(project) else {
                    return Ok(Vec::new());
                };
                repo::identifier_keys(
                    &self.conn,
                    "",
                    "e.species_key = ? AND e.project_key = ?",
                    &[&species_key, &project_key.0],
                )
            }
            None => repo::identifier_keys(&self.conn, "", "e.species_key = ?", &[&species_key]),
        }
        .map_err(StoreError::Sqlite)?;

        let mut names = self.names_for_keys(keys);
        names.retain(|name| name.chars().count() >= request.min_length);
        debug!(
            species = %request.species,
            min_length = request.min_length,
            population = names.len(),
            "Collected candidate names"
        );
        Ok(names)
    }

    // ── Entities ───────────────────────────────────────────────────

    pub(crate) fn entity(&self, entity_key: EntityKey) -> Result<Option<ProgramEntity>> {
        let facts = repo::fact_rows(&self.conn, "", "e.entity_key = ?", &[&entity_key.0])
            .map_err(StoreError::Sqlite)?;
        match facts.first() {
            Some(fact) => self.assemble(fact).map(Some),
            None => Ok(None),
        }
    }

    /// Entities of a project, restricted to `species` unless it is empty.
    pub(crate) fn entities_for_project(
        &self,
        project: &str,
        species: &[Species],
    ) -> Result<Vec<ProgramEntity>> {
        let Some(project_key) = self.known_project(project) else {
            return Ok(Vec::new());
        };
        let species_keys: Vec<i64> = species
            .iter()
            .filter_map(|s| self.species_key(*s))
            .collect();
        if !species.is_empty() && species_keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut where_clause = "e.project_key = ?".to_string();
        let mut params: Vec<&dyn ToSql> = vec![&project_key.0];
        if !species_keys.is_empty() {
            where_clause.push_str(&format!(
                " AND e.species_key IN ({})",
                placeholders(species_keys.len())
            ));
            params.extend(species_keys.iter().map(|k| k as &dyn ToSql));
        }

        let facts = repo::fact_rows(&self.conn, "", &where_clause, &params)
            .map_err(StoreError::Sqlite)?;
        Ok(self.assemble_all(&facts))
    }

    pub(crate) fn entities_by_species(&self, species: Species) -> Result<Vec<ProgramEntity>> {
        let Some(species_key) = self.species_key(species) else {
            return Ok(Vec::new());
        };
        let facts = repo::fact_rows(&self.conn, "", "e.species_key = ?", &[&species_key])
            .map_err(StoreError::Sqlite)?;
        Ok(self.assemble_all(&facts))
    }

    /// Type groups are decided on the simple name, so `java.lang.String`
    /// is a string.
    pub(crate) fn entity_set_where(
        &self,
        species: Species,
        max_count: usize,
        type_group: TypeGroup,
    ) -> Result<Vec<ProgramEntity>> {
        let mut seen = HashSet::new();
        let mut selected: Vec<ProgramEntity> = self
            .entities_by_species(species)?
            .into_iter()
            .filter(|entity| {
                let simple = entity.type_name.rsplit('.').next().unwrap_or_default();
                TypeGroup::classify(simple) == type_group
            })
            .filter(|entity| seen.insert(entity.name.clone()))
            .collect();
        if max_count > 0 {
            selected.truncate(max_count);
        }
        Ok(selected)
    }

    pub(crate) fn class_or_interface_for(
        &self,
        project: &str,
        fqn: &str,
    ) -> Result<Option<ProgramEntity>> {
        let Some(project_key) = self.known_project(project) else {
            return Ok(None);
        };
        let (package, name) = fqn.rsplit_once('.').unwrap_or(("", fqn));
        let (Some(package_name_key), Some(identifier_name_key)) = (
            self.dicts.get(DictionaryKind::PackageName).get_key(package),
            self.dicts.get(DictionaryKind::IdentifierName).get_key(name),
        ) else {
            return Ok(None);
        };
        let (Some(class_key), Some(interface_key)) = (
            self.species_key(Species::Class),
            self.species_key(Species::Interface),
        ) else {
            return Ok(None);
        };

        let facts = repo::fact_rows(
            &self.conn,
            PACKAGE_JOIN,
            "e.project_key = ? AND e.identifier_name_key = ? AND p.package_name_key = ? \
             AND e.species_key IN (?, ?)",
            &[
                &project_key.0,
                &identifier_name_key,
                &package_name_key,
                &class_key,
                &interface_key,
            ],
        )
        .map_err(StoreError::Sqlite)?;
        Ok(self.assemble_all(&facts).into_iter().next())
    }

    pub(crate) fn entity_candidates_for(
        &self,
        class_name: &str,
        species: Species,
    ) -> Result<Vec<ProgramEntity>> {
        if !species.is_class_or_interface() {
            return Err(NamebankError::InvalidArgument(format!(
                "entity candidates are looked up for classes or interfaces, not {species}"
            )));
        }
        let Some(identifier_name_key) = self
            .dicts
            .get(DictionaryKind::IdentifierName)
            .get_key(class_name)
        else {
            return Ok(Vec::new());
        };
        let Some(species_key) = self.species_key(species) else {
            return Ok(Vec::new());
        };
        let facts = repo::fact_rows(
            &self.conn,
            "",
            "e.identifier_name_key = ? AND e.species_key = ?",
            &[&identifier_name_key, &species_key],
        )
        .map_err(StoreError::Sqlite)?;
        Ok(self.assemble_all(&facts))
    }

    pub(crate) fn modifiers_for(&self, entity_key: EntityKey) -> Result<Vec<Modifier>> {
        let keys = repo::edge_targets(&self.conn, EdgeTable::Modifier, entity_key)
            .map_err(StoreError::Sqlite)?;
        let mut modifiers = Vec::with_capacity(keys.len());
        for key in keys {
            let value = self.dict_value(DictionaryKind::Modifier, key)?;
            let modifier = value.parse::<Modifier>().map_err(|_| StoreError::UnresolvedKey {
                category: DictionaryKind::Modifier.as_str(),
                value: value.to_string(),
            })?;
            modifiers.push(modifier);
        }
        modifiers.sort();
        Ok(modifiers)
    }

    // ── Inheritance ────────────────────────────────────────────────

    /// `(identifier_name_key, name)` of each type an entity inherits from.
    fn inherited_identifiers(&self, entity_key: EntityKey, edge: EdgeTable) -> Result<Vec<(i64, String)>> {
        let type_keys =
            repo::edge_targets(&self.conn, edge, entity_key).map_err(StoreError::Sqlite)?;
        let mut identifiers = Vec::with_capacity(type_keys.len());
        for type_key in type_keys {
            let Some(identifier_key) =
                repo::type_identifier_key(&self.conn, type_key).map_err(StoreError::Sqlite)?
            else {
                warn!(type_name_key = type_key, "Type name has no owning identifier");
                continue;
            };
            let name = self.dict_value(DictionaryKind::IdentifierName, identifier_key)?;
            identifiers.push((identifier_key, name.to_string()));
        }
        Ok(identifiers)
    }

    pub(crate) fn inheritance_names_for(&self, entity_key: EntityKey, edge: EdgeTable) -> Result<Vec<String>> {
        Ok(self
            .inherited_identifiers(entity_key, edge)?
            .into_iter()
            .map(|(_, name)| name)
            .collect())
    }

    fn inheritance_map(&self, entity_key: EntityKey, edge: EdgeTable) -> Result<BTreeMap<String, Vec<String>>> {
        Ok(self
            .inherited_identifiers(entity_key, edge)?
            .into_iter()
            .map(|(key, name)| (name, self.tokens_for_key(key)))
            .collect())
    }

    /// Entities with an `edge` to any type whose identifier is `name`.
    pub(crate) fn inheritors_of(&self, name: &str, edge: EdgeTable) -> Result<Vec<ProgramEntity>> {
        let Some(identifier_name_key) = self.dicts.get(DictionaryKind::IdentifierName).get_key(name)
        else {
            warn!(name, "No identifier name stored");
            return Ok(Vec::new());
        };
        let entity_keys = repo::entities_inheriting_from(&self.conn, edge, identifier_name_key)
            .map_err(StoreError::Sqlite)?;

        let mut entities = Vec::with_capacity(entity_keys.len());
        for entity_key in entity_keys {
            match self.entity(entity_key) {
                Ok(Some(entity)) => entities.push(entity),
                Ok(None) => warn!(entity_key = entity_key.0, "Inheriting entity vanished"),
                Err(e) => warn!(entity_key = entity_key.0, error = %e, "Skipping entity"),
            }
        }
        Ok(entities)
    }

    // ── Assembly ───────────────────────────────────────────────────

    fn assemble_all(&self, facts: &[FactRow]) -> Vec<ProgramEntity> {
        facts
            .iter()
            .filter_map(|fact| match self.assemble(fact) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!(entity_key = fact.entity_key.0, error = %e, "Skipping entity");
                    None
                }
            })
            .collect()
    }

    fn assemble(&self, fact: &FactRow) -> Result<ProgramEntity> {
        let name = self.dict_value(DictionaryKind::IdentifierName, fact.identifier_name_key)?;
        let file_name = self.dict_value(DictionaryKind::FileName, fact.file_key)?;
        let type_name = self.dict_value(DictionaryKind::TypeName, fact.type_name_key)?;
        let species_name = self.dict_value(DictionaryKind::Species, fact.species_key)?;
        let species = species_name
            .parse::<Species>()
            .map_err(|_| StoreError::UnresolvedKey {
                category: DictionaryKind::Species.as_str(),
                value: species_name.to_string(),
            })?;

        let package_name =
            self.package_name_for(fact.package_key)?
                .ok_or_else(|| StoreError::UnresolvedKey {
                    category: "package",
                    value: fact.package_key.to_string(),
                })?;
        let project =
            self.project_details(fact.project_key)?
                .ok_or_else(|| StoreError::UnresolvedKey {
                    category: "project",
                    value: fact.project_key.to_string(),
                })?;

        let shape = match species.shape_kind() {
            ShapeKind::Plain => EntityShape::Plain,
            ShapeKind::Invokable => {
                let signature = self
                    .dict_value(DictionaryKind::MethodSignature, fact.method_signature_key)?
                    .to_string();
                EntityShape::Invokable {
                    argument_count: argument_count(&signature),
                    signature,
                }
            }
            ShapeKind::Inheritable => EntityShape::Inheritable {
                super_classes: self.inheritance_map(fact.entity_key, EdgeTable::SuperClass)?,
                super_types: self.inheritance_map(fact.entity_key, EdgeTable::SuperType)?,
            },
        };

        Ok(ProgramEntity {
            key: fact.entity_key,
            project,
            package_name,
            name: name.to_string(),
            tokens: self.tokens_for_key(fact.identifier_name_key),
            modifiers: self.modifiers_for(fact.entity_key)?,
            species,
            container_uid: fact.container_uid.clone(),
            entity_uid: fact.entity_uid.clone(),
            type_name: type_name.to_string(),
            resolvable_type: None,
            is_array: fact.is_array,
            is_loop_control_var: fact.is_loop_control_var,
            file_name: file_name.to_string(),
            span: fact.span,
            is_anonymous: fact.is_anonymous,
            shape,
        })
    }
}
