//! Project and artifact coordinates.
//!
//! Everything in this module is an immutable value type. Version *parsing*
//! (ranges, expressions) is an external concern — a [`VersionSpec`] only
//! records whether the version it carries is a single concrete value or a
//! variable range/expression, which is all the graph layer needs for
//! variable-subgraph classification.

pub mod refs;
pub mod version;

pub use refs::{ArtifactRef, ProjectRef, ProjectVersionRef};
pub use version::{SingleVersion, VersionSpec};
