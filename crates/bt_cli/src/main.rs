//! buildtools — derives a patched, compilable server source tree.
//!
//! Provides `buildtools run` for the full clone → remap → decompile → patch →
//! snapshot → compile pipeline, `buildtools fingerprint` to inspect the
//! artifact cache key, and `buildtools patch` / `buildtools diff` to apply and
//! author patch directories by hand.

#![warn(missing_docs)]

mod context;
mod derive;
mod diff;
mod fingerprint;
mod maven;
mod patch;
mod run;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// buildtools — cached derivation-and-patch pipeline.
#[derive(Parser, Debug)]
#[command(name = "buildtools", version, about = "Builds patched server sources")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Root directory holding the checkouts and the work directory.
    #[arg(long, global = true)]
    pub work_dir: Option<PathBuf>,

    /// Path to a custom `buildtools.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full pipeline.
    Run(RunArgs),
    /// Print the mapping revisions, the fingerprint and the cache status.
    Fingerprint,
    /// Apply a patch directory onto a clean tree.
    Patch(PatchArgs),
    /// Write patches for every source an edited tree changes.
    Diff(DiffArgs),
}

/// Arguments for the `buildtools run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Stop after the snapshot; do not invoke Maven builds or Spigot patches.
    #[arg(long)]
    pub skip_compile: bool,
}

/// Arguments for the `buildtools patch` subcommand.
#[derive(Parser, Debug)]
pub struct PatchArgs {
    /// Directory of patch files.
    #[arg(long)]
    pub patches: PathBuf,

    /// Root of the clean source tree.
    #[arg(long)]
    pub clean: PathBuf,

    /// Root the patched sources are written under.
    #[arg(long)]
    pub target: PathBuf,

    /// Override the configured context fuzz.
    #[arg(long)]
    pub fuzz: Option<usize>,

    /// Override the configured maximum hunk offset.
    #[arg(long)]
    pub max_offset: Option<usize>,
}

/// Arguments for the `buildtools diff` subcommand.
#[derive(Parser, Debug)]
pub struct DiffArgs {
    /// Root of the clean source tree.
    #[arg(long)]
    pub clean: PathBuf,

    /// Root of the edited source tree.
    #[arg(long)]
    pub edited: PathBuf,

    /// Directory the patch files are written to.
    #[arg(long)]
    pub out: PathBuf,

    /// Context lines around each change.
    #[arg(long, default_value_t = 3)]
    pub context: usize,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Optional root directory; defaults to the current directory.
    pub work_dir: Option<PathBuf>,
    /// Optional path to a custom config file.
    pub config: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        work_dir: cli.work_dir,
        config: cli.config,
    };
    init_logging(&global);

    let result = match cli.command {
        Command::Run(ref args) => run::run(args, &global),
        Command::Fingerprint => fingerprint::run(&global),
        Command::Patch(ref args) => patch::run(args, &global),
        Command::Diff(ref args) => diff::run(args, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(1);
        }
    }
}

/// Default filter directive for the given verbosity flags. `RUST_LOG`
/// overrides it.
fn default_directive(global: &GlobalArgs) -> &'static str {
    if global.quiet {
        "error"
    } else if global.verbose {
        "debug"
    } else {
        "info"
    }
}

fn init_logging(global: &GlobalArgs) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(global)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
