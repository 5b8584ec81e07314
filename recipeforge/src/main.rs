//! recipeforge CLI
//!
//! Command-line interface for generating OpenEmbedded and Portage recipes
//! from a distribution snapshot.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::Utc;
use clap::{Parser, ValueEnum};
use colored::Colorize;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use recipeforge::generator::{Generator, GeneratorConfig, RunReport};
use recipeforge::snapshot::DistroSnapshot;
use recipeforge_cache::DigestCache;
use recipeforge_core::{
    DependencyMapping, Error, LayerIndexClient, Provenance, Result, TargetFormat,
};

static CHECK_MARK: LazyLock<colored::ColoredString> = LazyLock::new(|| "✔".bright_green().bold());
static CROSS_MARK: LazyLock<colored::ColoredString> = LazyLock::new(|| "〤".bright_red().bold());

const DISTRIBUTOR: &str = "Open Source Robotics Foundation";
const DISTRIBUTOR_LICENSE: &str = "BSD";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    /// OpenEmbedded bitbake recipes (.bb)
    Oe,
    /// Portage ebuilds
    Ebuild,
}

#[derive(Parser)]
#[command(name = "recipeforge")]
#[command(about = "Generates build recipes from a package distribution snapshot", long_about = None)]
#[command(version)]
struct Cli {
    /// Distribution snapshot (YAML)
    #[arg(long)]
    snapshot: PathBuf,

    /// Distribution name; must match the snapshot when given
    #[arg(long)]
    distro: Option<String>,

    /// Regenerate every package, even ones with an up-to-date recipe
    #[arg(long)]
    all: bool,

    /// Replace existing recipe files instead of skipping them
    #[arg(short, long)]
    force: bool,

    /// Regenerate only the named packages
    #[arg(long, num_args = 1..)]
    only: Vec<String>,

    /// Output directory for the generated tree
    #[arg(short, long, default_value = ".")]
    output: PathBuf,

    /// Dependency mapping tables (YAML), consulted in order
    #[arg(long, num_args = 1..)]
    mappings: Vec<PathBuf>,

    /// Directory to store downloaded source archives
    #[arg(long, default_value = "archives")]
    archive_dir: PathBuf,

    /// SQLite digest cache for source archives
    #[arg(long, default_value = "archives/digests.db")]
    digest_cache: PathBuf,

    /// Package names to ignore entirely
    #[arg(long, num_args = 1..)]
    skip_keys: Vec<String>,

    /// Keep unresolved dependency names in the output instead of failing the package
    #[arg(long)]
    keep_unresolved: bool,

    /// Resolve and render everything but write nothing
    #[arg(long)]
    dry_run: bool,

    /// Recipe flavor to emit
    #[arg(long, value_enum, default_value = "oe")]
    format: Format,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn setup_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" => Level::WARN,
        "info" => Level::INFO,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    let snapshot = DistroSnapshot::load(&cli.snapshot)?;
    if let Some(distro) = &cli.distro {
        if *distro != snapshot.distro {
            return Err(Error::Other(format!(
                "snapshot describes distribution '{}', not '{}'",
                snapshot.distro, distro
            )));
        }
    }
    warn!("\"{}\" distro detected", snapshot.distro);

    let format = match cli.format {
        Format::Oe => TargetFormat::OpenEmbedded,
        Format::Ebuild => TargetFormat::Portage,
    };
    let ecosystem = match format {
        TargetFormat::OpenEmbedded => "openembedded",
        TargetFormat::Portage => "gentoo",
    };

    let mut mapping = DependencyMapping::new(ecosystem);
    for path in &cli.mappings {
        let content = std::fs::read_to_string(path)?;
        mapping.push_yaml(&content)?;
        info!("loaded mapping table {}", path.display());
    }

    let mut cache = DigestCache::open(&cli.digest_cache)?;
    let query = LayerIndexClient::new();

    let only: Option<BTreeSet<String>> = if cli.only.is_empty() {
        None
    } else {
        Some(cli.only.iter().cloned().collect())
    };
    if cli.all {
        warn!("\"all\" mode detected... this may take a while!");
    }
    let preserve_existing = !(cli.all || cli.force || only.is_some());

    let config = GeneratorConfig {
        output: cli.output,
        archive_dir: cli.archive_dir,
        format,
        skip_keys: cli.skip_keys.into_iter().collect(),
        keep_unresolved: cli.keep_unresolved,
        preserve_existing,
        dry_run: cli.dry_run,
        snapshot_file: Some(cli.snapshot.clone()),
        provenance: Provenance {
            distributor: DISTRIBUTOR.to_string(),
            license: DISTRIBUTOR_LICENSE.to_string(),
            year: Utc::now().format("%Y").to_string(),
        },
    };

    let generator = Generator::new(config);
    let report = generator.run(&snapshot, &mapping, &query, &mut cache, only.as_ref())?;

    if report.changed.is_empty() && report.broken.is_empty() {
        info!("distribution '{}' is up to date", snapshot.distro);
    }
    print_summary(&snapshot.distro, &report);
    Ok(())
}

fn print_summary(distro: &str, report: &RunReport) {
    println!();
    println!(
        "{} {} recipe(s) generated for '{}'",
        *CHECK_MARK,
        report.changed.len(),
        distro
    );
    if !report.skipped.is_empty() {
        println!("  {} package(s) skipped", report.skipped.len());
    }
    if !report.broken.is_empty() {
        println!(
            "{} {} package(s) failed to generate:",
            *CROSS_MARK,
            report.broken.len()
        );
        for (pkg, failure) in &report.broken {
            println!("  {}: {}", pkg.bold(), failure.describe());
        }
    }
}
