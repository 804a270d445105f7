//! Partfetch - offline-aware part fetching for hardware builds
//!
//! Main entry point: argument parsing, tracing setup and command dispatch

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use partfetch_core::cache::{refresh_always, ArtifactCache};
use partfetch_core::catalog::{CatalogClient, ProjectDependencies};
use partfetch_core::config::{ProjectConfig, Settings};
use partfetch_core::pipeline::{BuildTarget, ManifestPipeline};
use partfetch_core::resolver::FetchResolver;
use partfetch_core::workflow::{self, FetchReport};
use partfetch_core::{FetchError, OfflineGate};

mod cache_cli;

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "partfetch",
    about = "Fetch and cache part data so hardware builds can run offline",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Set log level
    #[clap(long, default_value = "info", global = true)]
    log_level: LogLevel,

    /// Never touch the network (same as PARTFETCH_OFFLINE=1)
    #[clap(long, global = true)]
    offline: bool,
}

#[derive(Parser, Debug)]
enum Command {
    /// Download every part the selected builds need into the cache
    FetchParts {
        /// Project directory, manifest or design address (file.ato:Module)
        entry: Option<String>,

        /// Builds to fetch parts for (default: all)
        #[clap(long = "build", short = 'b', env = "PARTFETCH_BUILD", value_delimiter = ',')]
        builds: Vec<String>,

        /// Refetch parts even if they are already cached
        #[clap(long)]
        refresh: bool,
    },

    /// Build the selected targets using the current offline policy
    Build {
        /// Project directory, manifest or design address (file.ato:Module)
        entry: Option<String>,

        /// Builds to run (default: all)
        #[clap(long = "build", short = 'b', env = "PARTFETCH_BUILD", value_delimiter = ',')]
        builds: Vec<String>,
    },

    /// Inspect or clear the part cache
    Cache {
        #[clap(subcommand)]
        command: cache_cli::CacheCommand,
    },
}

fn initialize_tracing(log_level: &LogLevel) {
    let mut filter = EnvFilter::new(log_level.to_filter_directive());

    // RUST_LOG directives refine the level for specific modules
    if let Ok(extra) = std::env::var(EnvFilter::DEFAULT_ENV) {
        for directive in extra.split(',').filter(|d| !d.trim().is_empty()) {
            if let Ok(parsed) = directive.trim().parse() {
                filter = filter.add_directive(parsed);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // stdout is reserved for command output
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level);

    let settings = Settings::from_env()?;
    let gate = OfflineGate::global().clone();
    gate.set(settings.offline || cli.offline);
    debug!(
        "Offline mode: {}, catalog: {}, cache: {}",
        gate.read(),
        settings.api_url,
        settings.cache_dir.display()
    );

    match cli.command {
        Command::FetchParts {
            entry,
            builds,
            refresh,
        } => fetch_parts_command(&settings, gate, entry, builds, refresh).await,
        Command::Build { entry, builds } => build_command(&settings, gate, entry, builds).await,
        Command::Cache { command } => command.execute(&settings),
    }
}

/// Project, targets and resolver shared by the build commands
struct Session {
    project: ProjectConfig,
    targets: Vec<BuildTarget>,
    resolver: FetchResolver<CatalogClient>,
}

impl Session {
    fn open(
        settings: &Settings,
        gate: OfflineGate,
        entry: Option<&str>,
        builds: &[String],
        cache: ArtifactCache,
    ) -> Result<Self> {
        let project = ProjectConfig::discover(entry)?;
        let targets = project.select_builds(entry, builds)?;
        debug!(
            "Project '{}' at {}: {} build(s) selected",
            project.name,
            project.root.display(),
            targets.len()
        );

        let client = CatalogClient::from_settings(settings, gate.clone())?;
        let resolver = FetchResolver::new(cache, client, gate);

        Ok(Self {
            project,
            targets,
            resolver,
        })
    }
}

async fn fetch_parts_command(
    settings: &Settings,
    gate: OfflineGate,
    entry: Option<String>,
    builds: Vec<String>,
    refresh: bool,
) -> Result<()> {
    let mut cache = ArtifactCache::new(&settings.cache_dir);
    if refresh {
        cache = cache.with_refresh_predicate(refresh_always());
    }

    let session = Session::open(settings, gate.clone(), entry.as_deref(), &builds, cache)?;
    let installer = ProjectDependencies::new(
        &session.project,
        CatalogClient::from_settings(settings, gate)?,
    );

    let report = workflow::fetch_missing_parts(
        &installer,
        &session.targets,
        &ManifestPipeline,
        &session.resolver,
    )
    .await
    .context("Failed to fetch parts")?;

    finish(report)?;

    info!("Part fetching complete! All required parts are now cached.");
    info!("You can now build offline by setting PARTFETCH_OFFLINE=1");
    Ok(())
}

async fn build_command(
    settings: &Settings,
    gate: OfflineGate,
    entry: Option<String>,
    builds: Vec<String>,
) -> Result<()> {
    let cache = ArtifactCache::new(&settings.cache_dir);
    let session = Session::open(settings, gate, entry.as_deref(), &builds, cache)?;

    let report =
        workflow::build_targets(&session.targets, &ManifestPipeline, &session.resolver).await;

    let offline_blocked = report.errors.failures().iter().any(|failure| {
        failure
            .error
            .downcast_ref::<FetchError>()
            .is_some_and(FetchError::is_offline_block)
    });
    if offline_blocked {
        error!("Some parts are not cached. Run `partfetch fetch-parts` while online first.");
    }

    finish(report)?;

    info!("Build complete");
    Ok(())
}

/// Turn a report into the command result
fn finish(report: FetchReport) -> Result<()> {
    if !report.is_success() {
        error!(
            "{} of {} build(s) failed",
            report.errors.len(),
            report.attempted
        );
    }
    report.into_result()
}
