//! recipeforge-cache: Persistent archive digest cache
//!
//! Stores md5 and sha256 digests of downloaded source archives, keyed by
//! archive identity, so archives are downloaded and hashed at most once
//! across generation runs.

pub mod db;
pub mod error;
pub mod schema;

pub use db::DigestCache;
pub use error::{Error, Result};
