//! Run coordination
//!
//! Walks a distribution snapshot package by package: skip-list check,
//! existing-recipe check, classification, archive fetch, resolution,
//! rendering, and file writing. A package whose dependencies cannot be
//! resolved lands in the run's broken set; it never aborts the run. Archive
//! fetch failures are fatal.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::PathBuf;

use glob::glob;
use recipeforge_cache::DigestCache;
use recipeforge_core::{
    to_recipe_name, ArchiveFetcher, ArchiveIdentity, DependencyMapping, Error, Package,
    PackageDepends, Provenance, RecipeQuery, RecipeState, RecipeSynthesizer, ResolutionCache,
    Resolver, Result, TargetFormat, WorldIndex,
};
use tracing::{debug, error, info, warn};

use crate::snapshot::{DistroSnapshot, SnapshotPackage};

pub struct GeneratorConfig {
    pub output: PathBuf,
    pub archive_dir: PathBuf,
    pub format: TargetFormat,
    pub skip_keys: BTreeSet<String>,
    pub keep_unresolved: bool,
    /// Leave packages that already have a recipe file alone.
    pub preserve_existing: bool,
    pub dry_run: bool,
    /// Snapshot file to copy into the generated tree (OpenEmbedded only).
    pub snapshot_file: Option<PathBuf>,
    pub provenance: Provenance,
}

/// What one run did.
#[derive(Debug, Default)]
pub struct RunReport {
    pub changed: Vec<String>,
    pub skipped: Vec<String>,
    /// Packages that aborted, with why.
    pub broken: BTreeMap<String, PackageFailure>,
}

/// Why a package landed in the broken set.
#[derive(Debug)]
pub enum PackageFailure {
    /// Dependency names that could not be translated.
    Unresolved(Vec<String>),
    /// Archive fetch or license failure.
    Fatal(String),
}

impl PackageFailure {
    pub fn describe(&self) -> String {
        match self {
            PackageFailure::Unresolved(names) => names.join(", "),
            PackageFailure::Fatal(reason) => reason.clone(),
        }
    }
}

enum Outcome {
    Written,
    Skipped,
}

pub struct Generator {
    config: GeneratorConfig,
    synthesizer: RecipeSynthesizer,
    fetcher: ArchiveFetcher,
}

impl Generator {
    pub fn new(config: GeneratorConfig) -> Self {
        let synthesizer = RecipeSynthesizer::new(config.format, config.keep_unresolved);
        let fetcher = ArchiveFetcher::new(&config.archive_dir);
        Self {
            config,
            synthesizer,
            fetcher,
        }
    }

    /// Generate recipes for every snapshot package (or only the named ones).
    pub fn run(
        &self,
        snapshot: &DistroSnapshot,
        mapping: &DependencyMapping,
        query: &dyn RecipeQuery,
        cache: &mut DigestCache,
        only: Option<&BTreeSet<String>>,
    ) -> Result<RunReport> {
        if let Some(only) = only {
            for name in only {
                if !snapshot.packages.contains_key(name) {
                    return Err(Error::UnknownPackage(name.clone()));
                }
            }
        }

        let resolution_cache = ResolutionCache::new();
        let resolver = Resolver::new(mapping, &resolution_cache, query);
        let mut world = WorldIndex::new();
        let mut report = RunReport::default();

        for (name, pkg) in &snapshot.packages {
            if let Some(only) = only {
                if !only.contains(name) {
                    continue;
                }
            }
            match self.generate_one(snapshot, &resolver, cache, name, pkg, &mut world) {
                Ok(Outcome::Written) => report.changed.push(name.clone()),
                Ok(Outcome::Skipped) => report.skipped.push(name.clone()),
                Err(Error::UnresolvedDependency(missing)) => {
                    error!("failed to resolve required dependencies for package '{}'", name);
                    for dep in &missing {
                        error!(" unresolved: \"{}\"", dep);
                    }
                    debug!("package '{}' finished as {}", name, RecipeState::Aborted.as_str());
                    report
                        .broken
                        .insert(name.clone(), PackageFailure::Unresolved(missing));
                }
                // Fatal for the package only; the run keeps going.
                Err(e @ (Error::ArchiveFetch(_) | Error::UnknownLicense(_))) => {
                    error!("failed to generate recipe for package '{}': {}", name, e);
                    debug!("package '{}' finished as {}", name, RecipeState::Aborted.as_str());
                    report
                        .broken
                        .insert(name.clone(), PackageFailure::Fatal(e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }

        let unresolved = resolution_cache.unresolved_names();
        if !unresolved.is_empty() {
            warn!(
                "{} dependency name(s) stayed unresolved this run: {}",
                unresolved.len(),
                unresolved.join(", ")
            );
        }

        if self.config.format == TargetFormat::OpenEmbedded
            && !self.config.dry_run
            && !report.changed.is_empty()
        {
            self.write_world_files(snapshot, &world)?;
        }

        Ok(report)
    }

    fn generate_one(
        &self,
        snapshot: &DistroSnapshot,
        resolver: &Resolver,
        cache: &mut DigestCache,
        name: &str,
        pkg: &SnapshotPackage,
        world: &mut WorldIndex,
    ) -> Result<Outcome> {
        if self.config.skip_keys.contains(name) {
            warn!("package '{}' is on the skip list, skipping", name);
            return Ok(Outcome::Skipped);
        }

        let component = to_recipe_name(&pkg.repository, false);
        let recipe_name = to_recipe_name(name, false);

        let (dir, file_name, pattern) = match self.config.format {
            TargetFormat::OpenEmbedded => {
                let dir = self
                    .config
                    .output
                    .join(format!("generated-recipes-{}", snapshot.distro))
                    .join(&component);
                let file = format!("{}_{}.bb", recipe_name, pkg.version);
                let pattern = format!("{}/{}*.bb", dir.display(), recipe_name);
                (dir, file, pattern)
            }
            TargetFormat::Portage => {
                let dir = self
                    .config
                    .output
                    .join(format!("ros-{}", snapshot.distro))
                    .join(name);
                let file = format!("{}-{}.ebuild", name, pkg.version);
                let pattern = format!("{}/{}*.ebuild", dir.display(), name);
                (dir, file, pattern)
            }
        };

        let existing: Vec<PathBuf> = glob(&pattern)
            .map_err(|e| Error::Other(e.to_string()))?
            .filter_map(|entry| entry.ok())
            .collect();
        if self.config.preserve_existing && !existing.is_empty() {
            info!("recipe for package '{}' up to date, skipping", name);
            return Ok(Outcome::Skipped);
        }
        for stale in existing {
            if !self.config.dry_run {
                info!("removing stale recipe {}", stale.display());
                fs::remove_file(&stale)?;
            }
        }

        let mut depends = PackageDepends::new(self.config.skip_keys.iter().cloned());
        for (kind, deps) in pkg.depends.by_kind() {
            for dep in deps {
                depends.classify(dep, kind, snapshot.is_internal(dep));
            }
        }
        debug!("package '{}': {}", name, RecipeState::Classified.as_str());

        let identity = ArchiveIdentity::new(name, &pkg.version, &snapshot.distro);
        let digests = self
            .fetcher
            .ensure_archive(cache, &identity, &pkg.archive_uri)?;

        let package = Package {
            name: name.to_string(),
            repository: pkg.repository.clone(),
            version: pkg.version.clone(),
            archive_uri: pkg.archive_uri.clone(),
            distro: snapshot.distro.clone(),
        };
        let resolved =
            self.synthesizer
                .resolve(resolver, &package, &depends, &pkg.metadata, digests)?;
        debug!("package '{}': {}", name, RecipeState::Resolved.as_str());

        let text = self.synthesizer.render(&resolved, &self.config.provenance);
        debug!("package '{}': {}", name, RecipeState::Rendered.as_str());

        let path = dir.join(&file_name);
        if self.config.dry_run {
            info!("dry run, not writing {}", path.display());
        } else {
            fs::create_dir_all(&dir)?;
            fs::write(&path, &text)?;
            info!("wrote recipe {}", path.display());
            debug!("package '{}': {}", name, RecipeState::Written.as_str());
        }

        world.record(&recipe_name, &component);
        world.record_native(resolved.native_entries.iter().cloned());
        Ok(Outcome::Written)
    }

    /// World packagegroup, generation conf, and snapshot copy for the
    /// generated OpenEmbedded tree.
    fn write_world_files(&self, snapshot: &DistroSnapshot, world: &WorldIndex) -> Result<()> {
        let provenance = &self.config.provenance;
        let started = chrono::Utc::now().format("%Y%m%d%H%M%S").to_string();

        let conf_dir = self.config.output.join("conf").join(&snapshot.distro);
        fs::create_dir_all(&conf_dir)?;
        let conf_path = conf_dir.join("generated-ros-distro.conf");
        fs::write(
            &conf_path,
            world.render_generation_conf(provenance, &self.config.skip_keys, &started),
        )?;
        info!("wrote {}", conf_path.display());

        let group_dir = self
            .config
            .output
            .join(format!("generated-recipes-{}", snapshot.distro))
            .join("packagegroups");
        fs::create_dir_all(&group_dir)?;
        let group_path = group_dir.join("packagegroup-ros-world.bb");
        fs::write(&group_path, world.render_packagegroup(provenance))?;
        info!("wrote {}", group_path.display());

        if let Some(src) = &self.config.snapshot_file {
            let files_dir = self.config.output.join("files");
            fs::create_dir_all(&files_dir)?;
            fs::copy(src, files_dir.join(format!("{}-cache.yaml", snapshot.distro)))?;
        }
        Ok(())
    }
}
