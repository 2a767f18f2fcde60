//! ConfigPump CLI
//!
//! Command-line tools for keeping Panorama configuration in sync.
//!
//! # Commands
//!
//! - `normalize` - Pretty-print a configuration document
//! - `diff` - Count added, removed and changed lines between two documents
//! - `extract` - Keep only the subtrees matched by XPath selectors
//! - `scope` - List the selectors deduced from a rendered configuration
//! - `status` - Show drift between a pulled and a rendered configuration
//! - `pull` - Export the remote configuration and store its scoped part
//! - `push` - Push a rendered configuration and commit it
//! - `push-and-pull` - Push, then pull on success

mod commands;

use clap::{Args, Parser, Subcommand};
use configpump_engine::SyncKind;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// ConfigPump command-line tools.
#[derive(Parser)]
#[command(name = "configpump")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Connection and target options shared by the sync commands.
#[derive(Args)]
pub struct SyncArgs {
    /// Plugin settings file (JSON)
    #[arg(short, long)]
    pub settings: PathBuf,

    /// Connection template to use
    #[arg(short, long)]
    pub template: String,

    /// Device name, used for the import file name
    #[arg(short, long)]
    pub device: String,

    /// Rendered configuration file
    #[arg(short, long)]
    pub rendered: PathBuf,

    /// Where to store the pulled configuration
    #[arg(short, long)]
    pub output: PathBuf,

    /// File with manual XPath entries, one per line
    #[arg(short = 'x', long)]
    pub xpath_file: Option<PathBuf>,

    /// Write the job report here instead of stdout
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Pretty-print a configuration document
    Normalize {
        /// Input file
        file: PathBuf,
    },

    /// Count line changes between two documents
    Diff {
        /// Current document
        current: PathBuf,

        /// New document
        new: PathBuf,

        /// Ignore leading and trailing whitespace of each line
        #[arg(short, long)]
        ignore_whitespace: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Keep only the subtrees matched by XPath selectors
    Extract {
        /// Input file
        file: PathBuf,

        /// Selector to keep (repeatable)
        #[arg(short = 'p', long = "xpath")]
        xpaths: Vec<String>,

        /// Deduce selectors from this rendered configuration
        #[arg(short, long)]
        scope_from: Option<PathBuf>,
    },

    /// List the selectors deduced from a rendered configuration
    Scope {
        /// Rendered configuration file
        rendered: PathBuf,
    },

    /// Show drift between a pulled and a rendered configuration
    Status {
        /// Pulled remote configuration
        remote: PathBuf,

        /// Rendered configuration
        rendered: PathBuf,

        /// File with manual XPath entries, one per line
        #[arg(short = 'x', long)]
        xpath_file: Option<PathBuf>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Export the remote configuration and store its scoped part
    Pull(SyncArgs),

    /// Push a rendered configuration and commit it
    Push(SyncArgs),

    /// Push, then pull on success
    PushAndPull(SyncArgs),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Normalize { file } => commands::xml::normalize(&file)?,
        Commands::Diff {
            current,
            new,
            ignore_whitespace,
            format,
        } => commands::xml::diff(&current, &new, ignore_whitespace, &format)?,
        Commands::Extract {
            file,
            xpaths,
            scope_from,
        } => commands::xml::extract(&file, xpaths, scope_from.as_deref())?,
        Commands::Scope { rendered } => commands::xml::scope(&rendered)?,
        Commands::Status {
            remote,
            rendered,
            xpath_file,
            format,
        } => commands::status::run(&remote, &rendered, xpath_file.as_deref(), &format)?,
        Commands::Pull(args) => commands::sync::run(SyncKind::Pull, &args)?,
        Commands::Push(args) => commands::sync::run(SyncKind::Push, &args)?,
        Commands::PushAndPull(args) => commands::sync::run(SyncKind::PushAndPull, &args)?,
    }

    Ok(())
}
