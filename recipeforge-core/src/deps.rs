//! Dependency classification per relation kind
//!
//! Each package carries one internal/external pair of name sets per relation
//! kind. Skip-listed names are never recorded, and a name classified as
//! internal for a relation is never re-added as external for that relation
//! (and vice versa).

use std::collections::{BTreeSet, HashSet};

/// The dependency category a name was declared under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationKind {
    Build,
    BuildExport,
    Buildtool,
    BuildtoolExport,
    Run,
    Test,
}

impl RelationKind {
    pub const ALL: [RelationKind; 6] = [
        RelationKind::Build,
        RelationKind::BuildExport,
        RelationKind::Buildtool,
        RelationKind::BuildtoolExport,
        RelationKind::Run,
        RelationKind::Test,
    ];

    /// Buildtool relations produce `-native` recipes on OpenEmbedded.
    pub fn is_buildtool(&self) -> bool {
        matches!(self, RelationKind::Buildtool | RelationKind::BuildtoolExport)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Build => "build",
            RelationKind::BuildExport => "build_export",
            RelationKind::Buildtool => "buildtool",
            RelationKind::BuildtoolExport => "buildtool_export",
            RelationKind::Run => "exec",
            RelationKind::Test => "test",
        }
    }
}

/// Internal and external dependency names for one relation kind.
#[derive(Debug, Clone, Default)]
pub struct DependencySet {
    pub internal: BTreeSet<String>,
    pub external: BTreeSet<String>,
}

impl DependencySet {
    fn add(&mut self, name: &str, internal: bool) {
        if internal {
            if !self.external.contains(name) {
                self.internal.insert(name.to_string());
            }
        } else if !self.internal.contains(name) {
            self.external.insert(name.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.internal.is_empty() && self.external.is_empty()
    }

    pub fn len(&self) -> usize {
        self.internal.len() + self.external.len()
    }
}

/// All classified dependencies of one package, honoring the skip-list.
#[derive(Debug, Default)]
pub struct PackageDepends {
    skip_keys: HashSet<String>,
    build: DependencySet,
    build_export: DependencySet,
    buildtool: DependencySet,
    buildtool_export: DependencySet,
    run: DependencySet,
    test: DependencySet,
}

impl PackageDepends {
    pub fn new<I, S>(skip_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            skip_keys: skip_keys.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Record `name` under `kind` as internal or external.
    pub fn classify(&mut self, name: &str, kind: RelationKind, internal: bool) {
        if self.skip_keys.contains(name) {
            tracing::debug!("'{}' is on the skip list, ignoring", name);
            return;
        }
        self.set_mut(kind).add(name, internal);
    }

    pub fn get(&self, kind: RelationKind) -> &DependencySet {
        match kind {
            RelationKind::Build => &self.build,
            RelationKind::BuildExport => &self.build_export,
            RelationKind::Buildtool => &self.buildtool,
            RelationKind::BuildtoolExport => &self.buildtool_export,
            RelationKind::Run => &self.run,
            RelationKind::Test => &self.test,
        }
    }

    fn set_mut(&mut self, kind: RelationKind) -> &mut DependencySet {
        match kind {
            RelationKind::Build => &mut self.build,
            RelationKind::BuildExport => &mut self.build_export,
            RelationKind::Buildtool => &mut self.buildtool,
            RelationKind::BuildtoolExport => &mut self.buildtool_export,
            RelationKind::Run => &mut self.run,
            RelationKind::Test => &mut self.test,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_internal_and_external() {
        let mut deps = PackageDepends::new(Vec::<String>::new());
        deps.classify("roscpp", RelationKind::Build, true);
        deps.classify("boost", RelationKind::Build, false);

        let build = deps.get(RelationKind::Build);
        assert!(build.internal.contains("roscpp"));
        assert!(build.external.contains("boost"));
    }

    #[test]
    fn test_skip_list_excludes_everywhere() {
        let mut deps = PackageDepends::new(["catkin"]);
        for kind in RelationKind::ALL {
            deps.classify("catkin", kind, true);
            deps.classify("catkin", kind, false);
        }
        for kind in RelationKind::ALL {
            assert!(deps.get(kind).is_empty());
        }
    }

    #[test]
    fn test_internal_classification_is_sticky() {
        let mut deps = PackageDepends::new(Vec::<String>::new());
        deps.classify("tf2", RelationKind::Run, true);
        deps.classify("tf2", RelationKind::Run, false);

        let run = deps.get(RelationKind::Run);
        assert!(run.internal.contains("tf2"));
        assert!(!run.external.contains("tf2"));
    }

    #[test]
    fn test_external_classification_is_sticky() {
        let mut deps = PackageDepends::new(Vec::<String>::new());
        deps.classify("eigen", RelationKind::Build, false);
        deps.classify("eigen", RelationKind::Build, true);

        let build = deps.get(RelationKind::Build);
        assert!(build.external.contains("eigen"));
        assert!(!build.internal.contains("eigen"));
    }

    #[test]
    fn test_relations_are_independent() {
        let mut deps = PackageDepends::new(Vec::<String>::new());
        deps.classify("gtest", RelationKind::Test, false);

        assert!(deps.get(RelationKind::Build).is_empty());
        assert_eq!(deps.get(RelationKind::Test).len(), 1);
    }
}
