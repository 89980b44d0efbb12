//! Typed, declaration-ordered project relationships.
//!
//! ## Submodules
//!
//! - [`kind`] — edge kinds and dependency scopes.
//! - [`relationship`] — the edge value type, validation, re-owning.
//! - [`cycle`] — cycles as validated closed walks.
//! - [`bundle`] — per-descriptor direct-relationship bundles.

pub mod bundle;
pub mod cycle;
pub mod kind;
pub mod relationship;

pub use bundle::{DirectRelationships, DirectRelationshipsBuilder};
pub use cycle::{Cycle, CycleError};
pub use kind::{DependencyScope, RelationshipKind};
pub use relationship::{Relationship, RelationshipData, RelationshipError, Target};
