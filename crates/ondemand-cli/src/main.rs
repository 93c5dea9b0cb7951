#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use miette::Result;
use ondemand_core::Config;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ondemand")]
#[command(author, version, about = "Load TypeScript/JSX modules on demand", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Debug mode: log resolution decisions, keep temp modules, record failures
    #[arg(long, global = true, env = "ONDEMAND_DEBUG")]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Transform a module and load it through Node.js
    Load {
        /// Entry file (.ts, .tsx, .jsx, .js)
        entry: PathBuf,

        /// Node.js binary to use instead of the one on PATH
        #[arg(long, value_name = "PATH")]
        node: Option<PathBuf>,
    },

    /// Print the loadable ES module generated for a file
    Transform {
        /// Entry file (.ts, .tsx, .jsx, .js)
        entry: PathBuf,
    },

    /// Pin the UI runtime and renderer to the project's installed copies
    Lock,

    /// Manage the on-disk cache
    Cache {
        #[command(subcommand)]
        cache_cmd: CacheCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
enum CacheCommands {
    /// Remove the cache directory
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let config = Config::new(cwd)
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json)
        .with_debug(cli.debug);

    logging::init(config.verbosity, config.json_logs, config.debug);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Load { entry, node }) => {
            commands::load::run(&config, &entry, node.as_deref(), cli.json)
        }
        Some(Commands::Transform { entry }) => commands::transform::run(&config, &entry, cli.json),
        Some(Commands::Lock) => commands::lock::run(&config, cli.json),
        Some(Commands::Cache { cache_cmd }) => match cache_cmd {
            CacheCommands::Clear => commands::cache::clear(&config, cli.json),
        },
    }
}
