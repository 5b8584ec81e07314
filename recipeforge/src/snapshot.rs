//! Distribution snapshot
//!
//! A snapshot is the YAML description of one distribution: every released
//! package with its repository, version, archive URI, upstream metadata, and
//! per-relation dependency lists. It doubles as the internal/external oracle:
//! a dependency is internal exactly when its name is a snapshot package.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use recipeforge_core::{RelationKind, Result, UpstreamMetadata};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct DistroSnapshot {
    pub distro: String,
    pub packages: BTreeMap<String, SnapshotPackage>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotPackage {
    pub repository: String,
    pub version: String,
    pub archive_uri: String,

    #[serde(default)]
    pub metadata: UpstreamMetadata,

    #[serde(default)]
    pub depends: DependLists,
}

/// Declared dependency names per relation kind.
#[derive(Debug, Default, Deserialize)]
pub struct DependLists {
    #[serde(default)]
    pub build: Vec<String>,
    #[serde(default)]
    pub build_export: Vec<String>,
    #[serde(default)]
    pub buildtool: Vec<String>,
    #[serde(default)]
    pub buildtool_export: Vec<String>,
    #[serde(default)]
    pub exec: Vec<String>,
    #[serde(default)]
    pub test: Vec<String>,
}

impl DependLists {
    pub fn by_kind(&self) -> [(RelationKind, &[String]); 6] {
        [
            (RelationKind::Build, self.build.as_slice()),
            (RelationKind::BuildExport, self.build_export.as_slice()),
            (RelationKind::Buildtool, self.buildtool.as_slice()),
            (
                RelationKind::BuildtoolExport,
                self.buildtool_export.as_slice(),
            ),
            (RelationKind::Run, self.exec.as_slice()),
            (RelationKind::Test, self.test.as_slice()),
        ]
    }
}

impl DistroSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Whether `dep` names a package of this distribution. Meta-layer
    /// qualifiers past '@' do not take part in the lookup.
    pub fn is_internal(&self, dep: &str) -> bool {
        let base = dep.split('@').next().unwrap_or(dep);
        self.packages.contains_key(base)
    }
}
