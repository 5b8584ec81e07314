//! Recipe synthesis
//!
//! Resolves a package's classified dependencies into per-relation blocks and
//! renders the final recipe text for the selected target format. Rendering
//! is deterministic: blocks are lexicographically sorted, empty relations
//! still emit an empty block, and identical inputs always yield identical
//! text.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::archive::Digests;
use crate::deps::{DependencySet, PackageDepends, RelationKind};
use crate::license;
use crate::metadata::{license_file_checksum, UpstreamMetadata};
use crate::resolver::{Resolution, Resolver};
use crate::{Error, Result};

/// Identity of one package being generated. Immutable per invocation.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub repository: String,
    pub version: String,
    pub archive_uri: String,
    pub distro: String,
}

/// Per-package generation progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeState {
    Pending,
    Classified,
    Resolved,
    Rendered,
    Written,
    Aborted,
}

impl RecipeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecipeState::Pending => "pending",
            RecipeState::Classified => "classified",
            RecipeState::Resolved => "resolved",
            RecipeState::Rendered => "rendered",
            RecipeState::Written => "written",
            RecipeState::Aborted => "aborted",
        }
    }
}

/// The recipe flavor being emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetFormat {
    OpenEmbedded,
    Portage,
}

impl TargetFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            TargetFormat::OpenEmbedded => "bb",
            TargetFormat::Portage => "ebuild",
        }
    }

    /// Portage has no export concept; export relations become run-time
    /// dependencies. OpenEmbedded keeps dedicated blocks instead.
    pub fn folds_export_into_run(&self) -> bool {
        matches!(self, TargetFormat::Portage)
    }

    pub fn join_licenses(&self, ids: &[String]) -> String {
        match self {
            TargetFormat::OpenEmbedded => ids.join(" & "),
            TargetFormat::Portage => {
                if ids.len() == 1 {
                    ids[0].clone()
                } else {
                    format!("( {} )", ids.join(" "))
                }
            }
        }
    }
}

/// Provenance fields stamped into every generated file.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub distributor: String,
    pub license: String,
    pub year: String,
}

/// Convert a distribution package name to its recipe name.
///
/// Strips meta-layer information past '@', rewrites a `_native` suffix, and
/// replaces underscores. Buildtool dependencies additionally get a `-native`
/// suffix.
pub fn to_recipe_name(dep: &str, native: bool) -> String {
    let dep = dep.split('@').next().unwrap_or(dep);
    let base = match dep.strip_suffix("_native") {
        Some(stripped) => format!("{}-rosnative", stripped),
        None => dep.to_string(),
    };
    let mut name = base.replace('_', "-");
    if native {
        name.push_str("-native");
    }
    name
}

/// A package with every dependency block resolved, ready to render.
#[derive(Debug)]
pub struct ResolvedRecipe {
    pub package: Package,
    pub metadata: UpstreamMetadata,
    pub license_ids: Option<Vec<String>>,
    pub digests: Digests,
    pub blocks: BTreeMap<RelationKind, BTreeSet<String>>,
    /// Entries for which a `-native` recipe is built (buildtool relations).
    pub native_entries: BTreeSet<String>,
    /// External names that could not be translated (empty unless the
    /// caller opted to keep unresolved literals).
    pub unresolved: Vec<String>,
}

/// Resolves and renders recipes for one target format.
pub struct RecipeSynthesizer {
    format: TargetFormat,
    keep_unresolved: bool,
}

impl RecipeSynthesizer {
    pub fn new(format: TargetFormat, keep_unresolved: bool) -> Self {
        Self {
            format,
            keep_unresolved,
        }
    }

    pub fn format(&self) -> TargetFormat {
        self.format
    }

    /// Resolve every dependency block and the license expression.
    ///
    /// Fails with `UnresolvedDependency` listing all untranslatable names,
    /// unless unresolved literals were requested, and with `UnknownLicense`
    /// when any upstream license string matches no family.
    pub fn resolve(
        &self,
        resolver: &Resolver,
        package: &Package,
        depends: &PackageDepends,
        metadata: &UpstreamMetadata,
        digests: Digests,
    ) -> Result<ResolvedRecipe> {
        let license_ids = if metadata.license.is_empty() {
            None
        } else {
            Some(license::canonicalize_expression(&metadata.license)?)
        };

        let mut blocks = BTreeMap::new();
        let mut native_entries = BTreeSet::new();
        let mut unresolved = Vec::new();

        if self.format.folds_export_into_run() {
            let prefix = format!("ros-{}/", package.distro);
            let mut build = BTreeSet::new();
            for kind in [RelationKind::Build, RelationKind::Buildtool] {
                let (entries, missing) =
                    self.resolve_set(resolver, depends.get(kind), false, Some(&prefix));
                build.extend(entries);
                unresolved.extend(missing);
            }
            let mut run = BTreeSet::new();
            for kind in [
                RelationKind::Run,
                RelationKind::BuildExport,
                RelationKind::BuildtoolExport,
            ] {
                let (entries, missing) =
                    self.resolve_set(resolver, depends.get(kind), false, Some(&prefix));
                run.extend(entries);
                unresolved.extend(missing);
            }
            blocks.insert(RelationKind::Build, build);
            blocks.insert(RelationKind::Run, run);
        } else {
            for kind in RelationKind::ALL {
                let (entries, missing) =
                    self.resolve_set(resolver, depends.get(kind), kind.is_buildtool(), None);
                if kind.is_buildtool() {
                    native_entries.extend(entries.iter().cloned());
                }
                unresolved.extend(missing);
                blocks.insert(kind, entries);
            }
        }

        unresolved.sort();
        unresolved.dedup();
        if !unresolved.is_empty() {
            if !self.keep_unresolved {
                return Err(Error::UnresolvedDependency(unresolved));
            }
            warn!(
                "keeping {} unresolved dependency name(s) in '{}'",
                unresolved.len(),
                package.name
            );
        }

        Ok(ResolvedRecipe {
            package: package.clone(),
            metadata: metadata.clone(),
            license_ids,
            digests,
            blocks,
            native_entries,
            unresolved,
        })
    }

    fn resolve_set(
        &self,
        resolver: &Resolver,
        set: &DependencySet,
        native: bool,
        internal_prefix: Option<&str>,
    ) -> (BTreeSet<String>, Vec<String>) {
        let mut entries = BTreeSet::new();
        let mut missing = Vec::new();

        for dep in &set.internal {
            let entry = match internal_prefix {
                Some(prefix) => format!("{}{}", prefix, dep),
                None => to_recipe_name(dep, native),
            };
            debug!("internal dependency: {}", entry);
            entries.insert(entry);
        }

        for dep in &set.external {
            match resolver.resolve_external(dep) {
                Resolution::Resolved(found) => {
                    let entry = match internal_prefix {
                        Some(_) => found,
                        None => to_recipe_name(&found, native),
                    };
                    debug!("external dependency: {}", entry);
                    entries.insert(entry);
                }
                Resolution::Unresolved => {
                    missing.push(dep.clone());
                    if self.keep_unresolved {
                        // The untranslated name stays in the block under its
                        // literal distribution spelling.
                        let entry = match internal_prefix {
                            Some(_) => dep.clone(),
                            None => to_recipe_name(dep, native),
                        };
                        entries.insert(entry);
                    }
                }
            }
        }

        (entries, missing)
    }

    /// Render the final recipe text. Pure: no IO, no retries.
    pub fn render(&self, recipe: &ResolvedRecipe, provenance: &Provenance) -> String {
        match self.format {
            TargetFormat::OpenEmbedded => render_bitbake(recipe, provenance),
            TargetFormat::Portage => render_ebuild(recipe, provenance),
        }
    }
}

/// Render one multi-line bitbake variable with sorted, backslash-continued
/// entries. An empty container still emits the (empty) assignment.
pub fn multiline_variable(var: &str, entries: &BTreeSet<String>) -> String {
    let mut out = format!("{} = \"", var);
    if entries.is_empty() {
        out.push_str("\"\n");
        return out;
    }
    out.push_str(" \\\n");
    for entry in entries {
        out.push_str("    ");
        out.push_str(entry);
        out.push_str(" \\\n");
    }
    out.push_str("\"\n");
    out
}

/// Parse the unpacked source directory out of a GitHub release archive URI.
fn source_subdir(src_uri: &str) -> Option<String> {
    let rest = src_uri.strip_prefix("https://github.com/")?;
    let dirs: Vec<&str> = rest.split('/').collect();
    if dirs.len() < 7 {
        return None;
    }
    Some(
        format!(
            "{}-{}-{}-{}-{}",
            dirs[1], dirs[3], dirs[4], dirs[5], dirs[6]
        )
        .replace(".tar.gz", ""),
    )
}

fn render_bitbake(recipe: &ResolvedRecipe, provenance: &Provenance) -> String {
    let pkg = &recipe.package;
    let meta = &recipe.metadata;

    let mut ret = String::from("# Generated by recipeforge -- DO NOT EDIT\n#\n");
    ret += &format!("# Copyright {} {}\n", provenance.year, provenance.distributor);
    ret += &format!(
        "# Distributed under the terms of the {} license\n\n",
        provenance.license
    );

    if meta.description.is_empty() {
        ret += "DESCRIPTION = \"None\"\n";
    } else {
        ret += &format!("DESCRIPTION = \"{}\"\n", meta.description.replace('\n', " "));
    }
    ret += &format!("AUTHOR = \"{}\"\n", meta.author);
    if let Some(homepage) = &meta.homepage {
        ret += &format!("HOMEPAGE = \"{}\"\n", homepage);
    }
    ret += "SECTION = \"devel\"\n";
    if let Some(ids) = &recipe.license_ids {
        ret += &format!("LICENSE = \"{}\"\n", TargetFormat::OpenEmbedded.join_licenses(ids));
    }
    if let Some(checksum) = meta.manifest_text.as_deref().and_then(license_file_checksum) {
        ret += &format!(
            "LIC_FILES_CHKSUM = \"file://package.xml;beginline={};endline={};md5={}\"\n",
            checksum.line, checksum.line, checksum.md5
        );
    }
    ret.push('\n');

    let empty = BTreeSet::new();
    let block = |kind: RelationKind| recipe.blocks.get(&kind).unwrap_or(&empty);

    ret += &multiline_variable("ROS_BUILD_DEPENDS", block(RelationKind::Build));
    ret.push('\n');
    ret += &multiline_variable("ROS_BUILDTOOL_DEPENDS", block(RelationKind::Buildtool));
    ret.push('\n');
    ret += &multiline_variable("ROS_EXPORT_DEPENDS", block(RelationKind::BuildExport));
    ret.push('\n');
    ret += &multiline_variable(
        "ROS_BUILDTOOL_EXPORT_DEPENDS",
        block(RelationKind::BuildtoolExport),
    );
    ret.push('\n');
    ret += &multiline_variable("ROS_EXEC_DEPENDS", block(RelationKind::Run));
    ret.push('\n');
    ret += "# Currently informational only -- see http://www.ros.org/reps/rep-0149.html#dependency-tags.\n";
    ret += &multiline_variable("ROS_TEST_DEPENDS", block(RelationKind::Test));
    ret.push('\n');

    ret += "DEPENDS = \"${ROS_BUILD_DEPENDS} ${ROS_BUILDTOOL_DEPENDS}\"\n";
    ret += "# Bitbake doesn't support the \"export\" concept, so build them as if we needed them\n";
    ret += "# to build this package (even though we actually don't) so that they're guaranteed to\n";
    ret += "# have been staged should this package appear in another's DEPENDS.\n";
    ret += "DEPENDS += \"${ROS_EXPORT_DEPENDS} ${ROS_BUILDTOOL_EXPORT_DEPENDS}\"\n\n";
    ret += "RDEPENDS_${PN} += \"${ROS_EXEC_DEPENDS}\"\n\n";

    ret += &format!(
        "SRC_URI = \"{};downloadfilename=${{ROS_SP}}.tar.gz\"\n",
        pkg.archive_uri
    );
    ret += &format!("SRC_URI[md5sum] = \"{}\"\n", recipe.digests.md5);
    ret += &format!("SRC_URI[sha256sum] = \"{}\"\n", recipe.digests.sha256);
    let subdir = source_subdir(&pkg.archive_uri)
        .unwrap_or_else(|| format!("{}-{}", pkg.name, pkg.version));
    ret += &format!("S = \"${{WORKDIR}}/{}\"\n\n", subdir);

    ret += &format!("ROS_BUILD_TYPE = \"{}\"\n", meta.build_type);
    ret += "ROS_RECIPES_TREE = \"recipes-ros2\"\n\n";

    let component = to_recipe_name(&pkg.repository, false);
    ret += "# Allow the above settings to be overridden.\n";
    ret += &format!(
        "include ${{ROS_LAYERDIR}}/recipes-ros/{0}/{0}_common.inc\n",
        component
    );
    ret += &format!(
        "include ${{ROS_LAYERDIR}}/recipes-ros2/{0}/{0}_common.inc\n",
        component
    );
    ret += &format!(
        "include ${{ROS_LAYERDIR}}/${{ROS_RECIPES_TREE}}/{0}/{0}-${{PV}}_common.inc\n",
        component
    );
    ret += &format!(
        "include ${{ROS_LAYERDIR}}/${{ROS_RECIPES_TREE}}/{}/${{BPN}}.inc\n",
        component
    );
    ret += &format!(
        "include ${{ROS_LAYERDIR}}/${{ROS_RECIPES_TREE}}/{}/${{BPN}}-${{PV}}.inc\n",
        component
    );

    ret += "\ninherit ros_generated\n";
    ret += "inherit ros_${ROS_DISTRO}\n";
    ret += "inherit ros_${ROS_BUILD_TYPE}\n";
    ret
}

const ILLEGAL_DESC_CHARS: &str = "()[]{}|^$\\#\t\n\r\u{b}\u{c}'\"`";
const EBUILD_KEYWORDS: [&str; 4] = ["x86", "amd64", "arm", "arm64"];

fn sanitize_description(raw: &str) -> String {
    raw.chars()
        .filter(|c| !ILLEGAL_DESC_CHARS.contains(*c))
        .collect()
}

fn render_ebuild(recipe: &ResolvedRecipe, provenance: &Provenance) -> String {
    let pkg = &recipe.package;
    let meta = &recipe.metadata;

    let mut ret = format!("# Copyright {} {}\n", provenance.year, provenance.distributor);
    ret += &format!(
        "# Distributed under the terms of the {} license\n\n",
        provenance.license
    );

    ret += "EAPI=6\n";
    ret += "PYTHON_COMPAT=( python{2_7,3_5} )\n\n";
    ret += "inherit ros-cmake\n\n";

    ret += &format!("DESCRIPTION=\"{}\"\n", sanitize_description(&meta.description));
    let homepage = meta.homepage.as_deref().unwrap_or("https://wiki.ros.org");
    ret += &format!("HOMEPAGE=\"{}\"\n", homepage);
    ret += &format!(
        "SRC_URI=\"{} -> ${{PN}}-release-${{PV}}.tar.gz\"\n\n",
        pkg.archive_uri
    );

    if let Some(ids) = &recipe.license_ids {
        ret += &format!("LICENSE=\"{}\"\n", TargetFormat::Portage.join_licenses(ids));
    }
    let keywords: Vec<String> = EBUILD_KEYWORDS
        .iter()
        .map(|arch| format!("~{}", arch))
        .collect();
    ret += &format!("KEYWORDS=\"{}\"\n", keywords.join(" "));

    let empty = BTreeSet::new();
    let run = recipe.blocks.get(&RelationKind::Run).unwrap_or(&empty);
    let build = recipe.blocks.get(&RelationKind::Build).unwrap_or(&empty);

    ret += "RDEPEND=\"\n";
    for entry in run {
        ret += &format!("\t{}\n", entry);
    }
    ret += "\"\n";
    ret += "DEPEND=\"${RDEPEND}\n";
    for entry in build {
        ret += &format!("\t{}\n", entry);
    }
    ret += "\"\n\n";

    ret += "SLOT=\"0\"\n";
    ret += &format!("ROS_DISTRO=\"{}\"\n", pkg.distro);
    ret += "ROS_PREFIX=\"opt/ros/${ROS_DISTRO}\"\n";
    ret
}
