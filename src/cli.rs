//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "sitewatch",
    version,
    about = "Build-time checks and dev-time health tracking for a web project",
    long_about = "Sitewatch scans sources against lint rules, validates links, records bundle metrics and tracks file changes into a health score.\n\nConfiguration precedence: SITEWATCH_* env > sitewatch.yaml > defaults.",
    after_help = "Examples:\n  sitewatch check\n  sitewatch check src/App.tsx src/pages/Home.tsx\n  sitewatch build --out-dir dist\n  sitewatch dev --root ./site",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = "SITEWATCH_ROOT",
        help = "Project root holding sitewatch.yaml (default: current dir)"
    )]
    pub root: Option<String>,

    #[arg(short, long, global = true, action = clap::ArgAction::SetTrue, help = "Log at debug level")]
    pub verbose: bool,

    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    Version,
    /// Run the rule scanner and link validator over source files
    #[command(
        about = "Scan sources and validate links",
        long_about = "Run the load-time checks over the given files, or every file under src/ when none are given. Exits with status 1 when an error-severity rule match aborts the check.",
        after_help = "Examples:\n  sitewatch check\n  sitewatch check src/App.tsx"
    )]
    Check {
        #[arg(help = "Files to check (default: all files under src/)")]
        paths: Vec<String>,
    },
    /// Run the full build lifecycle against an emitted output directory
    #[command(
        about = "Run build hooks and record bundle metrics",
        long_about = "Run every plugin's build hooks over the source tree, then summarize the files in the output directory as the emitted bundle and record a performance metric."
    )]
    Build {
        #[arg(long, default_value = "dist", help = "Bundler output directory, relative to the root")]
        out_dir: String,
    },
    /// Start the socket bridge with live checks, metrics and file tracking
    #[command(
        about = "Run the dev-time integrations until Ctrl-C",
        long_about = "Watch the project, push memory and health updates and answer socket requests over line-delimited JSON on the ws_url address. Ctrl-C stops every integration."
    )]
    Dev,
    /// Print the persisted health score
    Health,
}
