//! Run coordination for the recipeforge CLI: distribution snapshot loading
//! and the generator that walks a snapshot into a tree of recipe files.

pub mod generator;
pub mod snapshot;

pub use generator::{Generator, GeneratorConfig, PackageFailure, RunReport};
pub use snapshot::{DependLists, DistroSnapshot, SnapshotPackage};
