//! Command-line driver: applies content packs to a world snapshot and
//! extracts templates from one.
mod config;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::CliConfig;
use patchkit_content::{ContentPack, DocumentFormat, DocumentLoader, WorldSnapshot};
use patchkit_core::{AssetManifest, EntityKey, Namespace};
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Data-driven content patching for prefab worlds
#[derive(Parser)]
#[command(name = "patchkit")]
#[command(about = "Apply content packs to a prefab world", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load packs into a world snapshot and write the patched world
    Apply {
        /// World snapshot (RON)
        #[arg(long)]
        world: PathBuf,
        /// Pack directories, loaded after those named in the config
        #[arg(long = "pack")]
        packs: Vec<PathBuf>,
        /// Loader settings (TOML)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Skip collections that only load on the first pass
        #[arg(long)]
        hot_reload: bool,
        /// Where to write the patched snapshot
        #[arg(long)]
        out: PathBuf,
    },

    /// Print the template that reproduces a live entity
    Extract {
        /// World snapshot (RON)
        #[arg(long)]
        world: PathBuf,
        /// Namespace of the entity (item, status_effect, effect_preset, ...)
        namespace: Namespace,
        /// Numeric id or string identifier
        id: String,
        #[arg(long, default_value = "ron")]
        format: DocumentFormat,
    },
}

fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = CliConfig::from_env();
    setup_logging(config.log_dir.as_deref())?;

    match Cli::parse().command {
        Command::Apply {
            world,
            packs,
            config: config_path,
            hot_reload,
            out,
        } => apply(&config, &world, config_path.as_ref(), &packs, hot_reload, &out),
        Command::Extract {
            world,
            namespace,
            id,
            format,
        } => extract(&world, namespace, &id, format),
    }
}

fn apply(
    config: &CliConfig,
    world: &Path,
    config_path: Option<&PathBuf>,
    packs: &[PathBuf],
    hot_reload: bool,
    out: &Path,
) -> Result<()> {
    let loader = config.loader_config(config_path, packs, hot_reload)?;
    let mut session = WorldSnapshot::load(world)?
        .restore()
        .with_max_effect_depth(loader.max_effect_depth);
    if loader.hot_reload && !session.is_hot_reload() {
        session.begin_reload();
    }

    let mut assets = AssetManifest::new();
    let mut failed = 0;
    for dir in &loader.pack_dirs {
        let pack = ContentPack::open(dir)?;
        let report = session.load_pack(&pack, &loader, &mut assets)?;
        for (source, e) in &report.failures {
            error!(pack = %report.pack, source = %source, error = %e, "template failed");
        }
        for (path, e) in &report.asset_failures {
            warn!(pack = %report.pack, path = %path.display(), error = %e, "asset skipped");
        }
        failed += report.failures.len();
        info!(
            pack = %report.pack,
            loaded = report.loaded,
            assets = report.assets,
            skipped = report.skipped.len(),
            "pack loaded"
        );
    }

    let load = session.finish_loading();
    for (label, e) in load.failures() {
        error!(template = %label, error = %e, "deferred template failed");
        failed += 1;
    }
    info!(
        items_ready = load.items_ready.ran,
        recipes_ready = load.recipes_ready.ran,
        failed,
        "loading finished"
    );

    WorldSnapshot::capture(session.context()).save(out)?;
    info!("Patched world written to {}", out.display());
    Ok(())
}

fn extract(world: &Path, namespace: Namespace, id: &str, format: DocumentFormat) -> Result<()> {
    let key = if namespace.is_numeric() {
        EntityKey::Id(
            id.parse()
                .with_context(|| format!("{namespace} identifiers are numeric, got '{id}'"))?,
        )
    } else {
        EntityKey::Name(id.to_owned())
    };

    let session = WorldSnapshot::load(world)?.restore();
    let document = session.extract(namespace, &key)?;
    println!("{}", DocumentLoader::to_string(&document, format)?);
    Ok(())
}

/// Setup logging to stderr and, when a log directory is available, to file
fn setup_logging(log_dir: Option<&Path>) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = log_dir.map(Path::to_path_buf).or_else(default_log_dir);
    let file_layer = match log_dir {
        Some(dir) if std::fs::create_dir_all(&dir).is_ok() => {
            let file_appender = tracing_appender::rolling::never(&dir, "patchkit.log");
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
            // Leak the guard to keep file writer alive
            std::mem::forget(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking_file)
                    .with_ansi(false),
            )
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

/// Platform cache directory, e.g. `~/.cache/patchkit/logs` on Linux
fn default_log_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "patchkit").map(|dirs| dirs.cache_dir().join("logs"))
}
