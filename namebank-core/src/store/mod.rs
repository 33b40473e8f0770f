pub mod schema;
pub mod sqlite;

mod reader;
mod repo;
mod writer;

pub use sqlite::EntityStore;

use crate::types::{
    EntityKey, Modifier, NameSetRequest, PackageKey, ProgramEntity, ProjectDetails, ProjectKey,
    RawEntity, Species, TypeGroup,
};

/// Normalizing write surface.
pub trait EntityWriter: Send + Sync {
    /// Intern one raw entity and insert its fact row and edges atomically.
    fn store(&self, raw: &RawEntity) -> crate::error::Result<EntityKey>;

    /// Store entities in order, each in its own transaction.
    fn store_batch(&self, raws: &[RawEntity]) -> crate::error::Result<Vec<EntityKey>>;
}

/// Query surface. Projects are named by their "name version" composite.
///
/// Listings degrade gracefully: a row that cannot be reconstructed is
/// logged and skipped, and unknown names yield empty results.
pub trait EntityReader: Send + Sync {
    // ── Projects and packages ──────────────────────────────────────

    /// Registered projects, sorted.
    fn project_list(&self) -> crate::error::Result<Vec<String>>;

    fn project_details(&self, project_key: ProjectKey) -> crate::error::Result<Option<ProjectDetails>>;

    fn package_names_for_project(&self, project: &str) -> crate::error::Result<Vec<String>>;

    /// Package name behind a package key.
    fn package_name_for(&self, package_key: PackageKey) -> crate::error::Result<Option<String>>;

    // ── Names ──────────────────────────────────────────────────────

    /// Stored tokens of an identifier name in left-to-right order.
    fn tokens_for(&self, name: &str) -> crate::error::Result<Vec<String>>;

    fn class_names_for_package(&self, project: &str, package: &str)
    -> crate::error::Result<Vec<String>>;

    fn all_class_names_for(&self, project: &str) -> crate::error::Result<Vec<String>>;

    /// Distinct identifier names in a project, optionally of one species.
    fn identifier_names_for(
        &self,
        project: &str,
        species: Option<Species>,
    ) -> crate::error::Result<Vec<String>>;

    fn identifier_names_with_modifier(
        &self,
        project: &str,
        species: Species,
        modifier: Modifier,
    ) -> crate::error::Result<Vec<String>>;

    /// Bounded random sample of distinct names, sorted.
    fn name_set_for(&self, request: &NameSetRequest) -> crate::error::Result<Vec<String>>;

    /// Like [`name_set_for`](Self::name_set_for), rendered as space-joined
    /// tokens and sorted by the rendering.
    fn tokenised_name_set_for(&self, request: &NameSetRequest) -> crate::error::Result<Vec<String>>;

    // ── Entities ───────────────────────────────────────────────────

    fn entity(&self, entity_key: EntityKey) -> crate::error::Result<Option<ProgramEntity>>;

    fn entities_for_project(&self, project: &str) -> crate::error::Result<Vec<ProgramEntity>>;

    fn entities_for_project_by_species(
        &self,
        project: &str,
        species: Species,
    ) -> crate::error::Result<Vec<ProgramEntity>>;

    fn all_classes_and_interfaces_for(&self, project: &str)
    -> crate::error::Result<Vec<ProgramEntity>>;

    /// Entities of one species across every project.
    fn entities_by_species(&self, species: Species) -> crate::error::Result<Vec<ProgramEntity>>;

    /// Entities of a species whose type falls in `type_group`, unique by
    /// name, at most `max_count` of them. A `max_count` of 0 returns every
    /// match, not an empty set.
    fn entity_set_where(
        &self,
        species: Species,
        max_count: usize,
        type_group: TypeGroup,
    ) -> crate::error::Result<Vec<ProgramEntity>>;

    /// Class or interface by fully-qualified name within a project.
    fn class_or_interface_for(
        &self,
        project: &str,
        fqn: &str,
    ) -> crate::error::Result<Option<ProgramEntity>>;

    /// Every class or interface entity named `class_name`. `species` must be
    /// class or interface.
    fn entity_candidates_for(
        &self,
        class_name: &str,
        species: Species,
    ) -> crate::error::Result<Vec<ProgramEntity>>;

    fn modifiers_for(&self, entity_key: EntityKey) -> crate::error::Result<Vec<Modifier>>;

    // ── Inheritance ────────────────────────────────────────────────

    fn super_class_names_for(&self, entity_key: EntityKey) -> crate::error::Result<Vec<String>>;

    fn super_type_names_for(&self, entity_key: EntityKey) -> crate::error::Result<Vec<String>>;

    /// Entities declaring a super class named `name`. Matching is lexical:
    /// unrelated types sharing the simple name all match.
    fn sub_classes_for(&self, name: &str) -> crate::error::Result<Vec<ProgramEntity>>;

    /// Entities declaring a super type named `name`, matched lexically.
    fn sub_types_for(&self, name: &str) -> crate::error::Result<Vec<ProgramEntity>>;
}
