//! End-to-end generation against a tempdir snapshot, with archives staged
//! locally so no network is involved.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use recipeforge::generator::{Generator, GeneratorConfig, PackageFailure};
use recipeforge::snapshot::DistroSnapshot;
use recipeforge_cache::DigestCache;
use recipeforge_core::{
    DependencyMapping, LayerRecipe, Provenance, RecipeQuery, TargetFormat,
};

struct NoQuery;

impl RecipeQuery for NoQuery {
    fn query_recipe(&self, _name: &str) -> recipeforge_core::Result<Option<LayerRecipe>> {
        Ok(None)
    }
}

const SNAPSHOT: &str = r#"
distro: hydro
packages:
  tf2:
    repository: geometry2
    version: 1.2.3
    archive_uri: http://invalid.invalid/tf2.tar.gz
    metadata:
      description: Transform library
      license: [BSD]
    depends:
      build: [tf2_msgs, boost]
      exec: [tf2_msgs]
  tf2_msgs:
    repository: geometry2
    version: 1.2.3
    archive_uri: http://invalid.invalid/tf2_msgs.tar.gz
    metadata:
      license: [BSD]
"#;

fn stage_archive(dir: &Path, file_name: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(dir.join(file_name), format!("archive: {}", file_name)).unwrap();
}

fn write_snapshot(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("hydro.yaml");
    fs::write(&path, content).unwrap();
    path
}

fn mapping_with_boost() -> DependencyMapping {
    let mut mapping = DependencyMapping::new("openembedded");
    mapping
        .push_yaml("boost:\n  openembedded: [boost]\n")
        .unwrap();
    mapping
}

fn config(root: &Path, preserve_existing: bool) -> GeneratorConfig {
    GeneratorConfig {
        output: root.join("out"),
        archive_dir: root.join("archives"),
        format: TargetFormat::OpenEmbedded,
        skip_keys: BTreeSet::new(),
        keep_unresolved: false,
        preserve_existing,
        dry_run: false,
        snapshot_file: Some(root.join("hydro.yaml")),
        provenance: Provenance {
            distributor: "Open Source Robotics Foundation".to_string(),
            license: "BSD".to_string(),
            year: "2019".to_string(),
        },
    }
}

#[test]
fn test_generates_recipes_and_world_files() {
    let root = tempfile::tempdir().unwrap();
    let snapshot_path = write_snapshot(root.path(), SNAPSHOT);
    let archive_dir = root.path().join("archives");
    stage_archive(&archive_dir, "tf2-1.2.3-hydro.tar.gz");
    stage_archive(&archive_dir, "tf2_msgs-1.2.3-hydro.tar.gz");

    let snapshot = DistroSnapshot::load(&snapshot_path).unwrap();
    let mapping = mapping_with_boost();
    let mut cache = DigestCache::in_memory().unwrap();

    let generator = Generator::new(config(root.path(), false));
    let report = generator
        .run(&snapshot, &mapping, &NoQuery, &mut cache, None)
        .unwrap();

    assert_eq!(report.changed, vec!["tf2", "tf2_msgs"]);
    assert!(report.broken.is_empty());

    let recipe_path = root
        .path()
        .join("out/generated-recipes-hydro/geometry2/tf2_1.2.3.bb");
    let text = fs::read_to_string(&recipe_path).unwrap();
    // External dep mapped statically, internal dep normalized, both sorted.
    assert!(text.contains("ROS_BUILD_DEPENDS = \" \\\n    boost \\\n    tf2-msgs \\\n\"\n"));
    assert!(text.contains("ROS_EXEC_DEPENDS = \" \\\n    tf2-msgs \\\n\"\n"));
    assert!(text.contains("LICENSE = \"BSD\"\n"));
    assert!(text.contains("DESCRIPTION = \"Transform library\"\n"));

    assert!(root
        .path()
        .join("out/generated-recipes-hydro/geometry2/tf2-msgs_1.2.3.bb")
        .exists());

    let conf = fs::read_to_string(root.path().join("out/conf/hydro/generated-ros-distro.conf"))
        .unwrap();
    assert!(conf.contains("ROS_GENERATION_SCHEME = \"1\"\n"));
    assert!(conf.contains("    geometry2 \\\n"));

    let world = fs::read_to_string(
        root.path()
            .join("out/generated-recipes-hydro/packagegroups/packagegroup-ros-world.bb"),
    )
    .unwrap();
    assert!(world.contains("    tf2 \\\n"));
    assert!(world.contains("    tf2-msgs \\\n"));

    assert!(root.path().join("out/files/hydro-cache.yaml").exists());
}

#[test]
fn test_unresolved_package_lands_in_broken_set() {
    let root = tempfile::tempdir().unwrap();
    let snapshot_yaml = r#"
distro: hydro
packages:
  tf2:
    repository: geometry2
    version: 1.2.3
    archive_uri: http://invalid.invalid/tf2.tar.gz
    depends:
      build: [mystery]
"#;
    let snapshot_path = write_snapshot(root.path(), snapshot_yaml);
    stage_archive(&root.path().join("archives"), "tf2-1.2.3-hydro.tar.gz");

    let snapshot = DistroSnapshot::load(&snapshot_path).unwrap();
    let mapping = DependencyMapping::new("openembedded");
    let mut cache = DigestCache::in_memory().unwrap();

    let generator = Generator::new(config(root.path(), false));
    let report = generator
        .run(&snapshot, &mapping, &NoQuery, &mut cache, None)
        .unwrap();

    assert!(report.changed.is_empty());
    match &report.broken["tf2"] {
        PackageFailure::Unresolved(names) => assert_eq!(names, &vec!["mystery".to_string()]),
        other => panic!("expected unresolved dependencies, got {:?}", other),
    }
    assert!(!root
        .path()
        .join("out/generated-recipes-hydro/geometry2/tf2_1.2.3.bb")
        .exists());
    // No recipes were generated, so no world aggregates either.
    assert!(!root.path().join("out/conf/hydro").exists());
}

#[test]
fn test_archive_failure_does_not_abort_run() {
    let root = tempfile::tempdir().unwrap();
    let snapshot_yaml = r#"
distro: hydro
packages:
  console_bridge:
    repository: console_bridge
    version: 0.1.0
    archive_uri: http://invalid.invalid/console_bridge.tar.gz
    metadata:
      license: [BSD]
  tf2:
    repository: geometry2
    version: 1.2.3
    archive_uri: http://invalid.invalid/tf2.tar.gz
    metadata:
      license: [BSD]
"#;
    let snapshot_path = write_snapshot(root.path(), snapshot_yaml);
    // Only tf2's archive is staged; console_bridge's download must fail.
    stage_archive(&root.path().join("archives"), "tf2-1.2.3-hydro.tar.gz");

    let snapshot = DistroSnapshot::load(&snapshot_path).unwrap();
    let mapping = DependencyMapping::new("openembedded");
    let mut cache = DigestCache::in_memory().unwrap();

    let generator = Generator::new(config(root.path(), false));
    let report = generator
        .run(&snapshot, &mapping, &NoQuery, &mut cache, None)
        .unwrap();

    assert_eq!(report.changed, vec!["tf2"]);
    assert!(matches!(
        report.broken["console_bridge"],
        PackageFailure::Fatal(_)
    ));
    assert!(root
        .path()
        .join("out/generated-recipes-hydro/geometry2/tf2_1.2.3.bb")
        .exists());
}

#[test]
fn test_unknown_license_does_not_abort_run() {
    let root = tempfile::tempdir().unwrap();
    let snapshot_yaml = r#"
distro: hydro
packages:
  mystery_ware:
    repository: mystery_ware
    version: 0.1.0
    archive_uri: http://invalid.invalid/mystery_ware.tar.gz
    metadata:
      license: [nonsense]
  tf2:
    repository: geometry2
    version: 1.2.3
    archive_uri: http://invalid.invalid/tf2.tar.gz
    metadata:
      license: [BSD]
"#;
    let snapshot_path = write_snapshot(root.path(), snapshot_yaml);
    let archive_dir = root.path().join("archives");
    stage_archive(&archive_dir, "mystery_ware-0.1.0-hydro.tar.gz");
    stage_archive(&archive_dir, "tf2-1.2.3-hydro.tar.gz");

    let snapshot = DistroSnapshot::load(&snapshot_path).unwrap();
    let mapping = DependencyMapping::new("openembedded");
    let mut cache = DigestCache::in_memory().unwrap();

    let generator = Generator::new(config(root.path(), false));
    let report = generator
        .run(&snapshot, &mapping, &NoQuery, &mut cache, None)
        .unwrap();

    assert_eq!(report.changed, vec!["tf2"]);
    assert!(matches!(
        report.broken["mystery_ware"],
        PackageFailure::Fatal(_)
    ));
    assert!(!root
        .path()
        .join("out/generated-recipes-hydro/mystery-ware/mystery-ware_0.1.0.bb")
        .exists());
}

#[test]
fn test_preserve_existing_skips_up_to_date_recipes() {
    let root = tempfile::tempdir().unwrap();
    let snapshot_path = write_snapshot(root.path(), SNAPSHOT);
    let archive_dir = root.path().join("archives");
    stage_archive(&archive_dir, "tf2-1.2.3-hydro.tar.gz");
    stage_archive(&archive_dir, "tf2_msgs-1.2.3-hydro.tar.gz");

    let snapshot = DistroSnapshot::load(&snapshot_path).unwrap();
    let mapping = mapping_with_boost();
    let mut cache = DigestCache::in_memory().unwrap();

    Generator::new(config(root.path(), false))
        .run(&snapshot, &mapping, &NoQuery, &mut cache, None)
        .unwrap();

    let report = Generator::new(config(root.path(), true))
        .run(&snapshot, &mapping, &NoQuery, &mut cache, None)
        .unwrap();
    assert!(report.changed.is_empty());
    assert_eq!(report.skipped, vec!["tf2", "tf2_msgs"]);
}

#[test]
fn test_only_rejects_unknown_package() {
    let root = tempfile::tempdir().unwrap();
    let snapshot_path = write_snapshot(root.path(), SNAPSHOT);

    let snapshot = DistroSnapshot::load(&snapshot_path).unwrap();
    let mapping = mapping_with_boost();
    let mut cache = DigestCache::in_memory().unwrap();

    let only: BTreeSet<String> = ["nonexistent".to_string()].into_iter().collect();
    let result = Generator::new(config(root.path(), false)).run(
        &snapshot,
        &mapping,
        &NoQuery,
        &mut cache,
        Some(&only),
    );
    assert!(matches!(
        result,
        Err(recipeforge_core::Error::UnknownPackage(_))
    ));
}
