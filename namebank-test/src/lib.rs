// Integration test utilities and fixture corpora for namebank.

use std::path::{Path, PathBuf};

use namebank_core::store::{EntityStore, EntityWriter};
use namebank_core::types::{Modifier, RawEntity, SourceSpan, Species, TypeName};

/// Builder for raw entities with sensible defaults.
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    raw: RawEntity,
}

impl EntityBuilder {
    pub fn new(name: &str, species: Species) -> Self {
        Self {
            raw: RawEntity {
                file_name: "src/Main.java".to_string(),
                package_name: String::new(),
                container_uid: String::new(),
                entity_uid: name.to_string(),
                name: name.to_string(),
                species,
                type_name: TypeName::simple(""),
                is_array: false,
                is_loop_control_var: false,
                method_signature: None,
                modifiers: Vec::new(),
                super_classes: Vec::new(),
                super_types: Vec::new(),
                span: SourceSpan::default(),
            },
        }
    }

    /// A class whose type is its own qualified name.
    pub fn class(package: &str, name: &str) -> Self {
        Self::new(name, Species::Class)
            .package(package)
            .file(&format!("src/{}/{name}.java", package.replace('.', "/")))
            .typed(TypeName::new(name, format!("{package}.{name}")))
            .uid(&format!("{package}.{name}"))
    }

    pub fn interface(package: &str, name: &str) -> Self {
        let mut builder = Self::class(package, name);
        builder.raw.species = Species::Interface;
        builder
    }

    pub fn method(name: &str, signature: &str, return_type: &str) -> Self {
        Self::new(name, Species::Method)
            .signature(signature)
            .typed(TypeName::simple(return_type))
    }

    pub fn field(name: &str, type_name: &str) -> Self {
        Self::new(name, Species::Field).typed(TypeName::simple(type_name))
    }

    pub fn package(mut self, package: &str) -> Self {
        self.raw.package_name = package.to_string();
        self
    }

    pub fn file(mut self, file: &str) -> Self {
        self.raw.file_name = file.to_string();
        self
    }

    pub fn typed(mut self, type_name: TypeName) -> Self {
        self.raw.type_name = type_name;
        self
    }

    pub fn uid(mut self, uid: &str) -> Self {
        self.raw.entity_uid = uid.to_string();
        self
    }

    pub fn container(mut self, uid: &str) -> Self {
        self.raw.container_uid = uid.to_string();
        self
    }

    pub fn signature(mut self, signature: &str) -> Self {
        self.raw.method_signature = Some(signature.to_string());
        self
    }

    pub fn modifiers(mut self, modifiers: &[Modifier]) -> Self {
        self.raw.modifiers = modifiers.to_vec();
        self
    }

    pub fn extends(mut self, name: &str, fqn: &str) -> Self {
        self.raw.super_classes.push(TypeName::new(name, fqn));
        self
    }

    pub fn implements(mut self, name: &str, fqn: &str) -> Self {
        self.raw.super_types.push(TypeName::new(name, fqn));
        self
    }

    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.raw.span = SourceSpan::new(line, column, line, column);
        self
    }

    pub fn build(self) -> RawEntity {
        self.raw
    }
}

/// A small drawing library: a shape hierarchy plus members of each kind.
pub fn shapes_corpus() -> Vec<RawEntity> {
    vec![
        EntityBuilder::interface("geo", "Drawable")
            .modifiers(&[Modifier::Public])
            .build(),
        EntityBuilder::class("geo", "Shape")
            .modifiers(&[Modifier::Public, Modifier::Abstract])
            .implements("Drawable", "geo.Drawable")
            .build(),
        EntityBuilder::class("geo", "Circle")
            .modifiers(&[Modifier::Public])
            .extends("Shape", "geo.Shape")
            .build(),
        EntityBuilder::class("geo", "Square")
            .modifiers(&[Modifier::Public, Modifier::Final])
            .extends("Shape", "geo.Shape")
            .implements("Comparable", "java.lang.Comparable")
            .build(),
        EntityBuilder::class("geo.util", "ShapeUtils")
            .modifiers(&[Modifier::Public])
            .build(),
        EntityBuilder::field("radius", "double")
            .package("geo")
            .container("geo.Circle")
            .uid("geo.Circle#radius")
            .modifiers(&[Modifier::Private])
            .at(4, 5)
            .build(),
        EntityBuilder::field("sideLength", "double")
            .package("geo")
            .container("geo.Square")
            .uid("geo.Square#sideLength")
            .modifiers(&[Modifier::Private, Modifier::Final])
            .build(),
        EntityBuilder::field("label", "java.lang.String")
            .package("geo")
            .container("geo.Shape")
            .uid("geo.Shape#label")
            .modifiers(&[Modifier::Protected])
            .build(),
        EntityBuilder::field("visible", "boolean")
            .package("geo")
            .container("geo.Shape")
            .uid("geo.Shape#visible")
            .build(),
        EntityBuilder::method("getArea", "()double", "double")
            .package("geo")
            .container("geo.Circle")
            .uid("geo.Circle#getArea")
            .modifiers(&[Modifier::Public])
            .build(),
        EntityBuilder::method("scaleBy", "(double;double;)void", "void")
            .package("geo")
            .container("geo.Square")
            .uid("geo.Square#scaleBy")
            .modifiers(&[Modifier::Public])
            .build(),
        EntityBuilder::new("factor", Species::FormalArgument)
            .package("geo")
            .container("geo.Square#scaleBy")
            .uid("geo.Square#scaleBy#factor")
            .typed(TypeName::simple("double"))
            .build(),
        EntityBuilder::new("Circle", Species::Constructor)
            .package("geo")
            .container("geo.Circle")
            .uid("geo.Circle#<init>")
            .signature("(double;)void")
            .typed(TypeName::simple("void"))
            .build(),
    ]
}

/// A file-backed store in a temporary directory.
#[derive(Debug)]
pub struct TestStore {
    pub dir: tempfile::TempDir,
    pub store: EntityStore,
}

impl TestStore {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create tempdir");
        let store = EntityStore::open(&dir.path().join("namebank.db")).expect("open store");
        Self { dir, store }
    }

    /// A store with `entities` written under project `name version`.
    pub fn with(name: &str, version: &str, entities: &[RawEntity]) -> Self {
        let test = Self::new();
        test.ingest(name, version, entities);
        test
    }

    pub fn ingest(&self, name: &str, version: &str, entities: &[RawEntity]) {
        self.store.set_project(name, version).expect("set project");
        self.store.store_batch(entities).expect("store batch");
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("namebank.db")
    }

    /// Close the store and reopen it read-only.
    pub fn reopen_read_only(self) -> (tempfile::TempDir, EntityStore) {
        let path = self.db_path();
        self.store.shutdown().expect("shutdown");
        let store = EntityStore::open_read_only(&path).expect("reopen read-only");
        (self.dir, store)
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Write entities as JSON lines and return the file path.
pub fn write_jsonl(dir: &Path, file_name: &str, entities: &[RawEntity]) -> anyhow::Result<PathBuf> {
    let mut content = String::new();
    for entity in entities {
        content.push_str(&serde_json::to_string(entity)?);
        content.push('\n');
    }
    let path = dir.join(file_name);
    std::fs::write(&path, content)?;
    Ok(path)
}
