//! Sitewatch - build-time checks and dev-time health tracking
//!
//! Main entry point for the command-line host.
//!
//! # Overview
//!
//! The binary plays the role of the bundler host: it loads the layered settings,
//! installs logging, then drives the plugins through the lifecycle the chosen command
//! needs:
//! - `check`: load hooks of the rule scanner and link validator
//! - `build`: full build lifecycle over the sources and an emitted output directory
//! - `dev`: socket bridge, file tracking and live feeds until Ctrl-C
//! - `health`: print the persisted health score
//!
//! # Exit status
//!
//! `check` and `build` exit with status 1 when an error-severity finding aborts a
//! module load. Every other failure is reported and exits with the anyhow error.

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use sitewatch::cli::{Cli, Commands};
use sitewatch::models::OutputOptions;
use sitewatch::plugin::discover_modules;
use sitewatch::server::transport;
use sitewatch::services::bundle_from_dir;
use sitewatch::state::FileStateStore;
use sitewatch::{
    APP_NAME, ConfigManager, DevServer, PluginError, Settings, SiteStateManager, VERSION, output,
    plugins,
};
use std::process::ExitCode;
use std::sync::Arc;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.cmd == Commands::Version {
        println!("{}", VERSION);
        return Ok(ExitCode::SUCCESS);
    }

    let root = Utf8PathBuf::from(cli.root.as_deref().unwrap_or("."));
    let config_manager = ConfigManager::new(&root)?;
    let settings = config_manager.load_settings()?;

    // Keep the guard alive so buffered log lines are flushed on exit
    let _guard = sitewatch::logging::setup_logging_with_console(
        &settings.log_path(),
        APP_NAME,
        cli.verbose,
        true,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    match cli.cmd {
        Commands::Check { paths } => run_check(&settings, paths),
        Commands::Build { out_dir } => run_build(&settings, &out_dir),
        Commands::Dev => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .thread_name("sitewatch-worker")
                .build()?;
            runtime.block_on(run_dev(&settings))?;
            // Watcher callbacks and socket tasks must not outlive the session
            runtime.shutdown_timeout(std::time::Duration::from_secs(5));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Health => run_health(&settings),
        Commands::Version => Ok(ExitCode::SUCCESS),
    }
}

/// Map a host result onto the process exit code.
fn exit_code(result: Result<(), PluginError>) -> Result<ExitCode> {
    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) if e.is_build_failure() => {
            eprintln!("❌ {}", e);
            Ok(ExitCode::from(1))
        }
        Err(e) => Err(e.into()),
    }
}

fn run_check(settings: &Settings, paths: Vec<String>) -> Result<ExitCode> {
    let modules = if paths.is_empty() {
        discover_modules(&settings.root)
    } else {
        paths
    };
    tracing::info!("Checking {} module(s)", modules.len());

    let mut host = plugins::check_host(settings);
    let result = host.load_modules(&modules);
    if result.is_ok() {
        println!("✅ {} module(s) checked", modules.len());
    }
    exit_code(result)
}

fn run_build(settings: &Settings, out_dir: &str) -> Result<ExitCode> {
    let out_dir = Utf8Path::new(out_dir);
    let out_dir = if out_dir.is_absolute() {
        out_dir.to_path_buf()
    } else {
        settings.root.join(out_dir)
    };

    let bundle = bundle_from_dir(&out_dir)
        .with_context(|| format!("Failed to read build output: {}", out_dir))?;
    let modules = discover_modules(&settings.root);
    let options = OutputOptions {
        dir: Some(out_dir.clone()),
    };

    let mut host = plugins::standard_host(settings)?;
    let result = host.run_build(&modules, &options, &bundle).map(|report| {
        println!(
            "✅ Build hooks completed: {} module(s), {} plugin(s) in {} ms",
            report.modules, report.plugins, report.elapsed_ms
        );
    });
    exit_code(result)
}

async fn run_dev(settings: &Settings) -> Result<()> {
    let server = DevServer::new();
    let mut host = plugins::standard_host(settings)?;
    let mut session = host.start_dev(&server);
    if session.is_empty() {
        tracing::warn!("No plugin registered a dev integration");
    } else {
        tracing::info!("Dev integrations running: {:?}", session.names());
    }

    let addr = settings.socket_addr()?;
    let listener = transport::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind socket bridge on {}", addr))?;
    let bridge = transport::serve(server, listener);
    println!("👀 Watching {} (socket bridge on {})", settings.root, addr);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    tracing::info!("Shutting down dev integrations");
    bridge.abort();
    session.stop();
    Ok(())
}

fn run_health(settings: &Settings) -> Result<ExitCode> {
    let store = FileStateStore::new(&settings.log_path())?;
    let manager = SiteStateManager::load(Arc::new(store), settings.tracker.clone());
    let state = manager.snapshot();

    output::print_health(&state.health);
    println!(
        "  {} file(s), {} component(s), {} route(s), {} recorded change(s)",
        state.total_files,
        state.components.len(),
        state.routes.len(),
        state.changes.len()
    );
    Ok(ExitCode::SUCCESS)
}
