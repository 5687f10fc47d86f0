//! CLI entry point for the ck-live engine.
//!
//! This binary builds the locale and asset views of an application, persists
//! the merge state, and keeps the views current while local packages change.
//!
//! # Usage
//!
//! ```bash
//! ck-live [OPTIONS] <COMMAND>
//!
//! # Merge every package and write ck-gen/ plus the state file
//! ck-live build --manifest ./ck-live.json
//!
//! # Reload local packages as they change
//! ck-live watch
//!
//! # Show the segment lists of a state file
//! ck-live inspect --json
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use ckl_core::{AppManifest, WatchConfig};
use ckl_resources::output::{assets_output_dir, install_assets, locales_output_dir, write_locales};
use ckl_resources::{FinalLocaleCultureSet, FinalResourceAssetSet, build_resources};
use ckl_state::{LiveState, StateSummary};
use ckl_watcher::{
    EventBatchStats, FileWatcher, LiveSession, LocalPackagesFilter, SessionOutcome, WatchError,
};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Incremental locale and asset merge engine.
///
/// Merges the resources of an application's packages in dependency order and
/// keeps the result current while local packages are edited.
#[derive(Parser)]
#[command(name = "ck-live", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Path to the application manifest.
    ///
    /// Defaults to `./ck-live.json` if not specified.
    #[arg(short, long, global = true, env = "CK_LIVE_MANIFEST")]
    manifest: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Merge every package, write generated output and the state file.
    Build,

    /// Resume from the state file and reload local packages on change.
    Watch,

    /// Print the segment lists of a state file.
    Inspect {
        /// State file to read (defaults to the manifest's state file).
        #[arg(short, long)]
        state: Option<Utf8PathBuf>,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

/// How a watched session ended.
enum SessionEnd {
    /// The state file changed.
    Reset,
    /// A shutdown signal arrived or the watcher stopped.
    Stopped,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// `notify` is filtered to `warn` level.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Loads the manifest named on the command line, or `./ck-live.json`.
fn load_manifest(cli: &Cli) -> color_eyre::Result<AppManifest> {
    let path = cli
        .manifest
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from(AppManifest::DEFAULT_FILE_NAME));

    if !path.is_file() {
        return Err(eyre!("Manifest does not exist: {path}"));
    }

    AppManifest::load(&path).wrap_err_with(|| format!("Invalid manifest: {path}"))
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs a full build.
///
/// A merge conflict aborts before anything is written.
fn run_build(manifest: &AppManifest) -> color_eyre::Result<()> {
    info!(root = %manifest.root, packages = manifest.packages.len(), "Starting build");

    let locals = manifest.local_packages();
    let locales = build_resources::<FinalLocaleCultureSet>(manifest, &locals)?;
    let assets = build_resources::<FinalResourceAssetSet>(manifest, &locals)?;

    let output = manifest.output_dir();
    let locale_report = write_locales(locales.view(), &locales_output_dir(&output, &manifest.config.layout))?;

    // A full build has no previous view to diff against.
    let assets_dir = assets_output_dir(&output);
    if assets_dir.exists() {
        std::fs::remove_dir_all(&assets_dir).wrap_err_with(|| format!("Failed to clear {assets_dir}"))?;
    }
    let asset_report = install_assets(assets.view(), None, &assets_dir)?;

    let state = LiveState::from_resources(locals, &locales, &assets);
    let state_file = manifest.state_file();
    state.write(&state_file)?;

    info!(
        state_file = %state_file,
        locale_files = locale_report.written,
        assets = asset_report.written,
        "Build complete"
    );

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write!(handle, "{}", StateSummary::from(&state))?;
    Ok(())
}

/// Runs live sessions until a shutdown signal arrives.
///
/// A reset reopens the session from the rebuilt state file. When the state
/// file cannot be used, waits for it to change.
async fn run_watch(manifest: &AppManifest) -> color_eyre::Result<()> {
    let config = &manifest.config;
    if !config.watch.enabled {
        return Err(eyre!("File watching is disabled in the manifest"));
    }
    let state_file = manifest.state_file();

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        let end = match LiveSession::open(&state_file, &manifest.root, config) {
            Ok(session) => {
                let session = session.with_output(manifest.output_dir());
                tokio::select! {
                    end = watch_session(session, &config.watch) => end?,
                    () = &mut shutdown => SessionEnd::Stopped,
                }
            }
            Err(error) if error.needs_rebuild() => {
                warn!(error = %error, "Cannot resume from the state file, waiting for a build");
                tokio::select! {
                    changed = wait_for_state_file(&state_file, &config.watch) => {
                        if changed? { SessionEnd::Reset } else { SessionEnd::Stopped }
                    }
                    () = &mut shutdown => SessionEnd::Stopped,
                }
            }
            Err(error) => return Err(error.into()),
        };

        match end {
            SessionEnd::Reset => info!("Reopening live session"),
            SessionEnd::Stopped => break,
        }
    }

    info!("Watch stopped");
    Ok(())
}

/// Applies debounced batches to one session until it is reset.
async fn watch_session(mut session: LiveSession, config: &WatchConfig) -> Result<SessionEnd, WatchError> {
    let roots = session.watch_roots();
    let mut watcher = FileWatcher::new(&roots, config, session.filter()).await?;
    info!(roots = roots.len(), "Watching for changes");

    let end = loop {
        let Some(batch) = watcher.recv_batch().await else {
            break SessionEnd::Stopped;
        };
        let stats = EventBatchStats::from_batch(&batch);
        debug!(
            events = stats.total_events,
            files = stats.unique_files,
            reset = stats.reset,
            "Batch received"
        );

        let outcomes = session.process_batch(&batch);
        if outcomes.iter().any(SessionOutcome::is_reset) {
            break SessionEnd::Reset;
        }
        report_outcomes(&outcomes);
    };

    watcher.shutdown().await?;
    Ok(end)
}

/// Waits until the state file changes. Returns `false` when the watcher
/// stopped first.
async fn wait_for_state_file(state_file: &Utf8Path, config: &WatchConfig) -> Result<bool, WatchError> {
    let Some(dir) = state_file.parent() else {
        return Err(WatchError::path_not_found(state_file));
    };
    std::fs::create_dir_all(dir)?;

    let filter = LocalPackagesFilter::new(state_file, Vec::new());
    let mut watcher = FileWatcher::new(&[dir.to_path_buf()], config, filter).await?;
    let changed = watcher.recv().await.is_some();
    watcher.shutdown().await?;
    Ok(changed)
}

/// Logs the outcome of one batch.
fn report_outcomes(outcomes: &[SessionOutcome]) {
    let mut reloaded = 0usize;
    let mut failed = 0usize;
    for outcome in outcomes {
        match outcome {
            SessionOutcome::Reloaded { kind, package } => {
                reloaded += 1;
                info!(kind = %kind, package = %package.name(), "Reloaded");
            }
            SessionOutcome::Removed { kind, package } => {
                reloaded += 1;
                info!(kind = %kind, package = %package.name(), "Resource folder removed");
            }
            SessionOutcome::ReloadFailed { .. } => failed += 1,
            SessionOutcome::FolderChanged { folder, sub_path } => {
                info!(folder = %folder, path = %sub_path, "Watched folder changed");
            }
            SessionOutcome::Unchanged { package } => {
                debug!(package = %package.name(), "Nothing to reload");
            }
            SessionOutcome::Ignored | SessionOutcome::Reset => {}
        }
    }
    if failed > 0 {
        warn!(reloaded, failed, "Some reloads failed; previous resources kept");
    }
}

/// Resolves on ctrl-c, or on SIGTERM on Unix.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(error) => {
                warn!(error = %error, "Cannot listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Received shutdown signal");
}

/// Prints the segment lists of a state file.
fn run_inspect(state_file: &Utf8Path, json: bool) -> color_eyre::Result<()> {
    let state = LiveState::read(state_file)?;
    let summary = StateSummary::from(&state);

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    if json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| eyre!("Failed to serialize JSON: {e}"))?;
        writeln!(handle, "{json}")?;
    } else {
        write!(handle, "{summary}")?;
    }
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Route to appropriate command
    match &cli.command {
        Commands::Build => run_build(&load_manifest(&cli)?),
        Commands::Watch => run_watch(&load_manifest(&cli)?).await,
        Commands::Inspect { state, json } => {
            let state_file = match state {
                Some(path) => path.clone(),
                None => load_manifest(&cli)?.state_file(),
            };
            run_inspect(&state_file, *json)
        }
    }
}
