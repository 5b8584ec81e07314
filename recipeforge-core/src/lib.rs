//! recipeforge-core: Dependency classification and recipe synthesis
//!
//! This crate provides the engine that turns a package's dependency lists
//! plus upstream metadata into deterministic build-recipe text:
//! - Per-relation dependency classification (internal vs. external)
//! - External name resolution through mapping tables, a run-wide cache,
//!   and the OpenEmbedded layer index
//! - License taxonomy mapping to canonical identifiers
//! - Source archive download with persistent digest caching
//! - Recipe rendering for bitbake and ebuild targets

pub mod archive;
pub mod deps;
pub mod error;
pub mod layers;
pub mod license;
pub mod metadata;
pub mod recipe;
pub mod resolver;
pub mod world;

pub use archive::{ArchiveFetcher, ArchiveIdentity, Digests};
pub use deps::{DependencySet, PackageDepends, RelationKind};
pub use error::{Error, Result};
pub use layers::{LayerIndexClient, LayerRecipe, RecipeQuery};
pub use license::canonicalize;
pub use metadata::UpstreamMetadata;
pub use recipe::{
    to_recipe_name, Package, Provenance, RecipeState, RecipeSynthesizer, ResolvedRecipe,
    TargetFormat,
};
pub use resolver::{DependencyMapping, Resolution, ResolutionCache, Resolver};
pub use world::WorldIndex;
