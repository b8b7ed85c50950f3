//! Table-level model contracts and row containers.
//!
//! # Responsibility
//! - Describe a table through the `Model` trait (name, key, relations).
//! - Define the dynamic row shape (`Record`, `Value`) used by repositories.
//!
//! # Invariants
//! - `Model` is static description only; it never holds row data.
//! - Relation names are unique per model.

pub mod record;
pub mod value;

pub use record::{Record, Related};
pub use value::Value;

/// Relationship cardinality and foreign-key placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// Foreign key on the related table; at most one related row.
    HasOne,
    /// Foreign key on the related table; any number of related rows.
    HasMany,
    /// Foreign key on this model's table.
    BelongsTo,
}

/// Declared relationship used for eager loading.
///
/// For `HasOne`/`HasMany`, `foreign_key` is a column of `related_table` that
/// references `local_key` on the parent. For `BelongsTo`, `foreign_key` is a
/// column of the parent that references `local_key` on `related_table`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
    pub name: &'static str,
    pub related_table: &'static str,
    pub kind: RelationKind,
    pub foreign_key: &'static str,
    pub local_key: &'static str,
}

impl Relation {
    pub const fn has_one(
        name: &'static str,
        related_table: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            related_table,
            kind: RelationKind::HasOne,
            foreign_key,
            local_key: "id",
        }
    }

    pub const fn has_many(
        name: &'static str,
        related_table: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            related_table,
            kind: RelationKind::HasMany,
            foreign_key,
            local_key: "id",
        }
    }

    pub const fn belongs_to(
        name: &'static str,
        related_table: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            name,
            related_table,
            kind: RelationKind::BelongsTo,
            foreign_key,
            local_key: "id",
        }
    }

    /// Overrides the referenced key column (defaults to `id`).
    pub const fn local_key(mut self, local_key: &'static str) -> Self {
        self.local_key = local_key;
        self
    }
}

/// Static description of one table accessed through a repository.
///
/// # Example
///
/// ```
/// use rowkeep_core::{Model, Relation};
///
/// struct Post;
///
/// impl Model for Post {
///     fn table() -> &'static str {
///         "posts"
///     }
///
///     fn relations() -> &'static [Relation] {
///         const RELATIONS: &[Relation] = &[Relation::has_many("comments", "comments", "post_id")];
///         RELATIONS
///     }
/// }
///
/// assert_eq!(Post::key_name(), "id");
/// ```
pub trait Model: 'static {
    fn table() -> &'static str;

    /// Primary key column.
    fn key_name() -> &'static str {
        "id"
    }

    /// Page size used when a page request does not specify one.
    fn per_page() -> u64 {
        15
    }

    /// Mass-assignable columns. Empty means every column is assignable.
    fn fillable() -> &'static [&'static str] {
        &[]
    }

    fn relations() -> &'static [Relation] {
        &[]
    }

    fn relation(name: &str) -> Option<&'static Relation> {
        Self::relations()
            .iter()
            .find(|relation| relation.name == name)
    }
}
