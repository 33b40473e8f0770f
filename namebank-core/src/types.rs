use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::tokenize;

// ── Typed ID wrappers ──────────────────────────────────────────────

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub i64);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

typed_id!(ProjectKey);
typed_id!(PackageKey);
typed_id!(EntityKey);

/// Placeholder type name for entities that carry no declared type.
pub const NO_TYPE: &str = "#no type#";

/// Identifier name the parser gives anonymous classes.
pub const ANONYMOUS_NAME: &str = "#anonymous#";

// ── Species ────────────────────────────────────────────────────────

/// The category of a program entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Annotation,
    AnnotationMember,
    Class,
    Constructor,
    Enum,
    EnumConstant,
    Field,
    FormalArgument,
    Interface,
    Label,
    LocalVariable,
    Method,
}

/// Which reconstructed shape a species maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Plain,
    Invokable,
    Inheritable,
}

impl Species {
    pub const ALL: [Species; 12] = [
        Self::Annotation,
        Self::AnnotationMember,
        Self::Class,
        Self::Constructor,
        Self::Enum,
        Self::EnumConstant,
        Self::Field,
        Self::FormalArgument,
        Self::Interface,
        Self::Label,
        Self::LocalVariable,
        Self::Method,
    ];

    /// Persisted description, as stored in the species dictionary.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Annotation => "annotation",
            Self::AnnotationMember => "annotation member",
            Self::Class => "class",
            Self::Constructor => "constructor",
            Self::Enum => "enum",
            Self::EnumConstant => "enum constant",
            Self::Field => "field",
            Self::FormalArgument => "formal argument",
            Self::Interface => "interface",
            Self::Label => "label",
            Self::LocalVariable => "local variable",
            Self::Method => "method",
        }
    }

    pub fn is_class_or_interface(self) -> bool {
        matches!(self, Self::Class | Self::Interface)
    }

    pub fn is_method_or_constructor(self) -> bool {
        matches!(self, Self::Method | Self::Constructor)
    }

    pub fn shape_kind(self) -> ShapeKind {
        if self.is_class_or_interface() {
            ShapeKind::Inheritable
        } else if self.is_method_or_constructor() {
            ShapeKind::Invokable
        } else {
            ShapeKind::Plain
        }
    }
}

impl std::fmt::Display for Species {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Species {
    type Err = String;

    /// Accepts the persisted description (`formal argument`) as well as
    /// the snake/kebab case spelling (`formal_argument`, `formal-argument`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        Self::ALL
            .into_iter()
            .find(|species| species.as_str() == normalized)
            .ok_or_else(|| format!("unknown species: {s}"))
    }
}

// ── Modifiers ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    Public,
    Protected,
    Private,
    Static,
    Abstract,
    Final,
    Native,
    Synchronized,
    Transient,
    Volatile,
    Strictfp,
    Default,
}

impl Modifier {
    pub const ALL: [Modifier; 12] = [
        Self::Public,
        Self::Protected,
        Self::Private,
        Self::Static,
        Self::Abstract,
        Self::Final,
        Self::Native,
        Self::Synchronized,
        Self::Transient,
        Self::Volatile,
        Self::Strictfp,
        Self::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Protected => "protected",
            Self::Private => "private",
            Self::Static => "static",
            Self::Abstract => "abstract",
            Self::Final => "final",
            Self::Native => "native",
            Self::Synchronized => "synchronized",
            Self::Transient => "transient",
            Self::Volatile => "volatile",
            Self::Strictfp => "strictfp",
            Self::Default => "default",
        }
    }
}

impl std::fmt::Display for Modifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modifier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|modifier| modifier.as_str() == normalized)
            .ok_or_else(|| format!("unknown modifier: {s}"))
    }
}

// ── Type groups ────────────────────────────────────────────────────

/// Coarse classification of a declared type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeGroup {
    Boolean,
    Numeric,
    String,
    Reference,
    Void,
}

impl TypeGroup {
    /// Classify a simple type name. Anything not recognised is a reference type.
    pub fn classify(type_name: &str) -> Self {
        match type_name {
            "boolean" | "Boolean" => Self::Boolean,
            "BigDecimal" | "BigInteger" | "double" | "Double" | "float" | "Float" | "int"
            | "Integer" | "long" | "Long" | "short" | "Short" => Self::Numeric,
            "String" => Self::String,
            "void" => Self::Void,
            _ => Self::Reference,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Numeric => "numeric",
            Self::String => "string",
            Self::Reference => "reference",
            Self::Void => "void",
        }
    }
}

impl std::fmt::Display for TypeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "boolean" => Ok(Self::Boolean),
            "numeric" => Ok(Self::Numeric),
            "string" => Ok(Self::String),
            "reference" => Ok(Self::Reference),
            "void" => Ok(Self::Void),
            other => Err(format!("unknown type group: {other}")),
        }
    }
}

// ── Raw entities (write input) ─────────────────────────────────────

/// A type reference as the parser reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeName {
    /// Simple identifier name of the type, e.g. `List`.
    pub name: String,
    /// Fully-qualified name, empty when the parser could not resolve one.
    #[serde(default)]
    pub fqn: String,
}

impl TypeName {
    pub fn new(name: impl Into<String>, fqn: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fqn: fqn.into(),
        }
    }

    /// A type known only by its simple name.
    pub fn simple(name: impl Into<String>) -> Self {
        Self::new(name, "")
    }

    /// The string the type-name dictionary is keyed by.
    pub fn display_name(&self) -> &str {
        if self.fqn.is_empty() {
            &self.name
        } else {
            &self.fqn
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceSpan {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceSpan {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }
}

/// One unnormalized entity description, as produced by a source analyser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEntity {
    pub file_name: String,
    #[serde(default)]
    pub package_name: String,
    /// Opaque digest of the enclosing entity.
    #[serde(default)]
    pub container_uid: String,
    /// Opaque digest of this entity.
    #[serde(default)]
    pub entity_uid: String,
    pub name: String,
    pub species: Species,
    pub type_name: TypeName,
    #[serde(default)]
    pub is_array: bool,
    #[serde(default)]
    pub is_loop_control_var: bool,
    #[serde(default)]
    pub method_signature: Option<String>,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
    #[serde(default)]
    pub super_classes: Vec<TypeName>,
    #[serde(default)]
    pub super_types: Vec<TypeName>,
    #[serde(default)]
    pub span: SourceSpan,
}

// ── Reconstructed entities (read output) ───────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProjectDetails {
    pub name: String,
    pub version: String,
}

impl ProjectDetails {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// The "name version" composite the project-key map is keyed by.
    pub fn composite(&self) -> String {
        format!("{} {}", self.name, self.version)
    }
}

impl std::fmt::Display for ProjectDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

/// Species-specific payload of a reconstructed entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum EntityShape {
    Plain,
    Invokable {
        signature: String,
        argument_count: usize,
    },
    /// Super-class and super-type names, each mapped to the tokens of the
    /// identifier that names the type.
    Inheritable {
        super_classes: BTreeMap<String, Vec<String>>,
        super_types: BTreeMap<String, Vec<String>>,
    },
}

/// Number of arguments in a signature of `;`-terminated parameter types
/// followed by a return segment, e.g. `(int;String;)void` has two.
pub fn argument_count(signature: &str) -> usize {
    let mut parts: Vec<&str> = signature.split(';').collect();
    while parts.last().is_some_and(|part| part.is_empty()) {
        parts.pop();
    }
    parts.len().saturating_sub(1)
}

/// A program entity reassembled from its fact row and dictionaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramEntity {
    pub key: EntityKey,
    pub project: ProjectDetails,
    pub package_name: String,
    pub name: String,
    /// Tokens of the identifier name in left-to-right order.
    pub tokens: Vec<String>,
    pub modifiers: Vec<Modifier>,
    pub species: Species,
    pub container_uid: String,
    pub entity_uid: String,
    pub type_name: String,
    /// Never populated; type resolution is out of reach of a lexical store.
    pub resolvable_type: Option<String>,
    pub is_array: bool,
    pub is_loop_control_var: bool,
    pub file_name: String,
    pub span: SourceSpan,
    pub is_anonymous: bool,
    pub shape: EntityShape,
}

impl ProgramEntity {
    pub fn fqn(&self) -> String {
        if self.package_name.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.package_name, self.name)
        }
    }

    pub fn has_type(&self) -> bool {
        self.type_name != NO_TYPE
    }

    pub fn sub_concatenated_tokens(&self) -> Vec<String> {
        tokenize::sub_concatenate(&self.tokens)
    }

    pub fn modal_expanded_tokens(&self) -> Vec<String> {
        tokenize::modal_expand(&self.tokens)
    }

    pub fn method_signature(&self) -> Option<&str> {
        match &self.shape {
            EntityShape::Invokable { signature, .. } => Some(signature),
            _ => None,
        }
    }

    pub fn super_classes(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match &self.shape {
            EntityShape::Inheritable { super_classes, .. } => Some(super_classes),
            _ => None,
        }
    }

    pub fn super_types(&self) -> Option<&BTreeMap<String, Vec<String>>> {
        match &self.shape {
            EntityShape::Inheritable { super_types, .. } => Some(super_types),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProgramEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} : {} ({}:{}:{})",
            self.species,
            self.fqn(),
            self.type_name,
            self.file_name,
            self.span.start_line,
            self.span.start_column
        )
    }
}

// ── Queries ────────────────────────────────────────────────────────

/// Parameters of a bounded random name sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameSetRequest {
    /// Restrict to one "name version" project; `None` samples every project.
    pub project: Option<String>,
    pub species: Species,
    /// Number of names to draw. Zero means every qualifying name.
    pub count: usize,
    /// Minimum name length in characters.
    pub min_length: usize,
}

/// Store-level statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreStats {
    /// Total number of fact rows.
    pub total_entities: u64,
    /// Registered projects as "name version".
    pub projects: Vec<String>,
    /// Fact row count per species description.
    pub entities_by_species: BTreeMap<String, u64>,
    /// Entry count per dictionary category.
    pub dictionary_sizes: BTreeMap<String, u64>,
    /// Database file size in bytes (0 for in-memory stores).
    pub db_size_bytes: u64,
}
