/// Current schema version.
pub const SCHEMA_VERSION: &str = "1";

/// Full SQL schema for namebank's `SQLite` database.
pub const SCHEMA_SQL: &str = r"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS namebank_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Dictionaries: one surrogate key per distinct string
CREATE TABLE IF NOT EXISTS identifier_names (
    identifier_name_key INTEGER PRIMARY KEY AUTOINCREMENT,
    identifier_name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS type_names (
    type_name_key INTEGER PRIMARY KEY AUTOINCREMENT,
    type_name TEXT NOT NULL UNIQUE,
    identifier_name_key INTEGER NOT NULL REFERENCES identifier_names(identifier_name_key)
);
CREATE INDEX IF NOT EXISTS idx_type_names_identifier ON type_names(identifier_name_key);

CREATE TABLE IF NOT EXISTS tokens (
    token_key INTEGER PRIMARY KEY AUTOINCREMENT,
    token TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS method_signatures (
    method_signature_key INTEGER PRIMARY KEY AUTOINCREMENT,
    method_signature TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS modifiers (
    modifier_key INTEGER PRIMARY KEY AUTOINCREMENT,
    modifier TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS species (
    species_key INTEGER PRIMARY KEY AUTOINCREMENT,
    species TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS package_names (
    package_name_key INTEGER PRIMARY KEY AUTOINCREMENT,
    package_name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS files (
    file_key INTEGER PRIMARY KEY AUTOINCREMENT,
    file_name TEXT NOT NULL UNIQUE
);

-- Projects and their packages
CREATE TABLE IF NOT EXISTS projects (
    project_key INTEGER PRIMARY KEY AUTOINCREMENT,
    project_name TEXT NOT NULL,
    project_version TEXT NOT NULL,
    registered_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS packages (
    package_key INTEGER PRIMARY KEY AUTOINCREMENT,
    project_key INTEGER NOT NULL REFERENCES projects(project_key),
    package_name_key INTEGER NOT NULL REFERENCES package_names(package_name_key),
    UNIQUE(project_key, package_name_key)
);

-- Program entity facts. method_signature_key is 0 for entities that are
-- not methods or constructors, so it carries no foreign key.
CREATE TABLE IF NOT EXISTS program_entities (
    entity_key INTEGER PRIMARY KEY AUTOINCREMENT,
    project_key INTEGER NOT NULL REFERENCES projects(project_key),
    package_key INTEGER NOT NULL REFERENCES packages(package_key),
    identifier_name_key INTEGER NOT NULL REFERENCES identifier_names(identifier_name_key),
    container_uid TEXT NOT NULL,
    entity_uid TEXT NOT NULL,
    species_key INTEGER NOT NULL REFERENCES species(species_key),
    type_name_key INTEGER NOT NULL REFERENCES type_names(type_name_key),
    method_signature_key INTEGER NOT NULL DEFAULT 0,
    is_anonymous INTEGER NOT NULL DEFAULT 0,
    file_key INTEGER NOT NULL REFERENCES files(file_key),
    is_array INTEGER NOT NULL DEFAULT 0,
    is_loop_control_var INTEGER NOT NULL DEFAULT 0,
    start_line INTEGER NOT NULL,
    start_column INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_column INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_entities_project_species ON program_entities(project_key, species_key);
CREATE INDEX IF NOT EXISTS idx_entities_identifier ON program_entities(identifier_name_key);
CREATE INDEX IF NOT EXISTS idx_entities_package ON program_entities(package_key);
CREATE INDEX IF NOT EXISTS idx_entities_uids ON program_entities(project_key, container_uid, entity_uid);

-- Cross-reference edges
CREATE TABLE IF NOT EXISTS modifier_xref (
    entity_key INTEGER NOT NULL REFERENCES program_entities(entity_key),
    modifier_key INTEGER NOT NULL REFERENCES modifiers(modifier_key),
    PRIMARY KEY (entity_key, modifier_key)
);
CREATE INDEX IF NOT EXISTS idx_modifier_xref_modifier ON modifier_xref(modifier_key);

CREATE TABLE IF NOT EXISTS super_class_xref (
    entity_key INTEGER NOT NULL REFERENCES program_entities(entity_key),
    type_name_key INTEGER NOT NULL REFERENCES type_names(type_name_key),
    PRIMARY KEY (entity_key, type_name_key)
);
CREATE INDEX IF NOT EXISTS idx_super_class_type ON super_class_xref(type_name_key);

CREATE TABLE IF NOT EXISTS super_type_xref (
    entity_key INTEGER NOT NULL REFERENCES program_entities(entity_key),
    type_name_key INTEGER NOT NULL REFERENCES type_names(type_name_key),
    PRIMARY KEY (entity_key, type_name_key)
);
CREATE INDEX IF NOT EXISTS idx_super_type_type ON super_type_xref(type_name_key);

-- Ordered tokens of each identifier name (1-based positions)
CREATE TABLE IF NOT EXISTS token_positions (
    identifier_name_key INTEGER NOT NULL REFERENCES identifier_names(identifier_name_key),
    position INTEGER NOT NULL,
    token_key INTEGER NOT NULL REFERENCES tokens(token_key),
    PRIMARY KEY (identifier_name_key, position)
);
";

/// Table whose presence marks an initialized store.
pub const MARKER_TABLE: &str = "identifier_names";
