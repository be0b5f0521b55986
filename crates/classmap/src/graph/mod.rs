//! Cross-file entity graph
//!
//! [`GraphBuilder`] merges per-file tables into an [`EntityGraph`] and
//! [`diff`] compares two versions into a canonical [`ChangeSet`].

mod builder;
mod diff;
mod entity;
mod resolve;

pub use builder::{GraphBuilder, MANY, ONE};
pub use diff::{diff, ChangeEvent, ChangeSet};
pub use entity::{EdgeKey, EntityGraph};
pub use resolve::Resolver;
