//! Bijective string ↔ surrogate-key dictionaries, one per category.
//!
//! A [`Dictionaries`] context is bulk-loaded when a store opens and is then
//! extended by every write that interns a new value. The store keeps it
//! behind the same mutex as the connection, so lookup-then-insert is atomic.

use std::collections::HashMap;

use rusqlite::Connection;

use crate::types::ProjectKey;

/// The interned string categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DictionaryKind {
    IdentifierName,
    TypeName,
    Token,
    MethodSignature,
    Modifier,
    Species,
    PackageName,
    FileName,
}

impl DictionaryKind {
    pub const ALL: [DictionaryKind; 8] = [
        Self::IdentifierName,
        Self::TypeName,
        Self::Token,
        Self::MethodSignature,
        Self::Modifier,
        Self::Species,
        Self::PackageName,
        Self::FileName,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdentifierName => "identifier name",
            Self::TypeName => "type name",
            Self::Token => "token",
            Self::MethodSignature => "method signature",
            Self::Modifier => "modifier",
            Self::Species => "species",
            Self::PackageName => "package name",
            Self::FileName => "file name",
        }
    }

    /// Backing table, key column and value column.
    pub(crate) fn columns(self) -> (&'static str, &'static str, &'static str) {
        match self {
            Self::IdentifierName => ("identifier_names", "identifier_name_key", "identifier_name"),
            Self::TypeName => ("type_names", "type_name_key", "type_name"),
            Self::Token => ("tokens", "token_key", "token"),
            Self::MethodSignature => (
                "method_signatures",
                "method_signature_key",
                "method_signature",
            ),
            Self::Modifier => ("modifiers", "modifier_key", "modifier"),
            Self::Species => ("species", "species_key", "species"),
            Self::PackageName => ("package_names", "package_name_key", "package_name"),
            Self::FileName => ("files", "file_key", "file_name"),
        }
    }
}

impl std::fmt::Display for DictionaryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// In-memory bidirectional map between surrogate keys and values.
///
/// Both directions are updated together, so every value has exactly one
/// key and every key exactly one value. Callers look a value up before
/// inserting it; `put` is for values the store has just assigned a key.
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    by_key: HashMap<i64, String>,
    by_value: HashMap<String, i64>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_value(&self, key: i64) -> Option<&str> {
        self.by_key.get(&key).map(String::as_str)
    }

    pub fn get_key(&self, value: &str) -> Option<i64> {
        self.by_value.get(value).copied()
    }

    /// Record `key ↔ value`, returning the value previously held by `key`.
    pub fn put(&mut self, key: i64, value: impl Into<String>) -> Option<String> {
        let value = value.into();
        if let Some(other_key) = self.by_value.get(&value).copied() {
            if other_key != key {
                self.by_key.remove(&other_key);
            }
        }
        let previous = self.by_key.insert(key, value.clone());
        if let Some(old) = &previous {
            self.by_value.remove(old);
        }
        self.by_value.insert(value, key);
        previous
    }

    /// Drop a key and its value. Used to undo entries of a failed write.
    pub(crate) fn remove(&mut self, key: i64) -> Option<String> {
        let value = self.by_key.remove(&key)?;
        self.by_value.remove(&value);
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Forward-only map from "name version" to project key.
#[derive(Debug, Clone, Default)]
pub struct ProjectKeys {
    keys: HashMap<String, ProjectKey>,
}

impl ProjectKeys {
    pub fn get(&self, composite: &str) -> Option<ProjectKey> {
        self.keys.get(composite).copied()
    }

    pub fn insert(&mut self, composite: impl Into<String>, key: ProjectKey) -> Option<ProjectKey> {
        self.keys.insert(composite.into(), key)
    }

    pub(crate) fn remove(&mut self, composite: &str) {
        self.keys.remove(composite);
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Composite names in lexical order.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.keys.keys().cloned().collect();
        names.sort();
        names
    }
}

/// One dictionary per category plus the project-key map.
#[derive(Debug, Clone, Default)]
pub struct Dictionaries {
    identifier_names: Dictionary,
    type_names: Dictionary,
    tokens: Dictionary,
    method_signatures: Dictionary,
    modifiers: Dictionary,
    species: Dictionary,
    package_names: Dictionary,
    file_names: Dictionary,
    pub projects: ProjectKeys,
}

impl Dictionaries {
    pub fn get(&self, kind: DictionaryKind) -> &Dictionary {
        match kind {
            DictionaryKind::IdentifierName => &self.identifier_names,
            DictionaryKind::TypeName => &self.type_names,
            DictionaryKind::Token => &self.tokens,
            DictionaryKind::MethodSignature => &self.method_signatures,
            DictionaryKind::Modifier => &self.modifiers,
            DictionaryKind::Species => &self.species,
            DictionaryKind::PackageName => &self.package_names,
            DictionaryKind::FileName => &self.file_names,
        }
    }

    pub fn get_mut(&mut self, kind: DictionaryKind) -> &mut Dictionary {
        match kind {
            DictionaryKind::IdentifierName => &mut self.identifier_names,
            DictionaryKind::TypeName => &mut self.type_names,
            DictionaryKind::Token => &mut self.tokens,
            DictionaryKind::MethodSignature => &mut self.method_signatures,
            DictionaryKind::Modifier => &mut self.modifiers,
            DictionaryKind::Species => &mut self.species,
            DictionaryKind::PackageName => &mut self.package_names,
            DictionaryKind::FileName => &mut self.file_names,
        }
    }

    /// Bulk-load every dictionary and the project keys from the store.
    pub(crate) fn load(conn: &Connection) -> rusqlite::Result<Self> {
        let mut dicts = Self::default();
        for kind in DictionaryKind::ALL {
            let (table, key_col, value_col) = kind.columns();
            let mut stmt = conn.prepare(&format!("SELECT {key_col}, {value_col} FROM {table}"))?;
            let rows = stmt.query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?;
            let dict = dicts.get_mut(kind);
            for row in rows {
                let (key, value) = row?;
                dict.put(key, value);
            }
        }

        let mut stmt =
            conn.prepare("SELECT project_key, project_name, project_version FROM projects")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;
        for row in rows {
            let (key, name, version) = row?;
            dicts
                .projects
                .insert(format!("{name} {version}"), ProjectKey(key));
        }

        tracing::debug!(
            identifier_names = dicts.identifier_names.len(),
            tokens = dicts.tokens.len(),
            type_names = dicts.type_names.len(),
            projects = dicts.projects.len(),
            "Loaded dictionaries"
        );
        Ok(dicts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_and_lookup_both_directions() {
        let mut dict = Dictionary::new();
        assert!(dict.is_empty());
        assert_eq!(dict.put(1, "alpha"), None);
        assert_eq!(dict.put(2, "beta"), None);

        assert_eq!(dict.get_value(1), Some("alpha"));
        assert_eq!(dict.get_key("beta"), Some(2));
        assert_eq!(dict.get_key("gamma"), None);
        assert_eq!(dict.get_value(3), None);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn put_returns_previous_value_and_keeps_maps_in_sync() {
        let mut dict = Dictionary::new();
        dict.put(1, "alpha");
        assert_eq!(dict.put(1, "omega"), Some("alpha".to_string()));
        assert_eq!(dict.get_key("alpha"), None);
        assert_eq!(dict.get_key("omega"), Some(1));
        assert_eq!(dict.len(), 1);
    }

    #[test]
    fn remove_drops_both_directions() {
        let mut dict = Dictionary::new();
        dict.put(7, "seven");
        assert_eq!(dict.remove(7), Some("seven".to_string()));
        assert_eq!(dict.get_key("seven"), None);
        assert!(dict.is_empty());
        assert_eq!(dict.remove(7), None);
    }

    #[test]
    fn project_keys_are_forward_only() {
        let mut projects = ProjectKeys::default();
        projects.insert("demo 1.0", ProjectKey(1));
        projects.insert("alpha 2", ProjectKey(2));
        assert_eq!(projects.get("demo 1.0"), Some(ProjectKey(1)));
        assert_eq!(projects.get("demo"), None);
        assert_eq!(projects.names(), vec!["alpha 2", "demo 1.0"]);
    }

    #[test]
    fn categories_are_independent() {
        let mut dicts = Dictionaries::default();
        dicts.get_mut(DictionaryKind::Token).put(1, "get");
        assert_eq!(dicts.get(DictionaryKind::Token).get_key("get"), Some(1));
        assert_eq!(dicts.get(DictionaryKind::IdentifierName).get_key("get"), None);
    }
}
