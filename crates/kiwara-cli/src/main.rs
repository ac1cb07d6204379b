#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use clap::Parser;
use kiwara_core::LogLevel;
use miette::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kiwara")]
#[command(author, version, about = "A linter for npm dependency trees", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Resolve a package's dependency tree and run the rules against it
    Lint {
        /// Root package, e.g. "react", "react@18" or "@types/node@^20"
        package: String,

        /// Deepest level to resolve (root = 0)
        #[arg(long, value_name = "N")]
        depth: Option<usize>,

        /// Follow devDependencies instead of dependencies
        #[arg(long)]
        dev: bool,

        /// Comma-separated rules to run (default: all built-in rules, minus download-count with --from-dir)
        #[arg(long, value_delimiter = ',', value_name = "RULES")]
        rules: Vec<String>,

        /// Weekly downloads below this are reported by download-count
        #[arg(long, value_name = "N")]
        min_downloads: Option<u64>,

        /// Versions per package name above this are reported by version-sprawl
        #[arg(long, value_name = "N")]
        max_versions: Option<usize>,

        /// Direct dependencies above this are reported by max-direct-dependencies
        #[arg(long, value_name = "N")]
        max_direct: Option<usize>,

        /// Maximum number of concurrent fetches
        #[arg(long, value_name = "N")]
        concurrency: Option<usize>,

        /// npm registry URL
        #[arg(long, env = "KIWARA_NPM_REGISTRY", value_name = "URL")]
        registry: Option<String>,

        /// Read packuments from `<name>.json` files in a folder instead of the registry
        #[arg(long, value_name = "PATH")]
        from_dir: Option<PathBuf>,

        /// Core log level: none, error, warn, info or log
        #[arg(long, value_parser = parse_log_level, value_name = "LEVEL")]
        log_level: Option<LogLevel>,
    },
}

fn parse_log_level(s: &str) -> std::result::Result<LogLevel, String> {
    LogLevel::parse(s).ok_or_else(|| format!("unknown log level '{s}'"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose, cli.json);

    match cli.command {
        Some(Commands::Version) | None => commands::version::run(),
        Some(Commands::Lint {
            package,
            depth,
            dev,
            rules,
            min_downloads,
            max_versions,
            max_direct,
            concurrency,
            registry,
            from_dir,
            log_level,
        }) => {
            let action = commands::lint::LintAction {
                package,
                max_depth: depth,
                dev,
                rules,
                min_downloads,
                max_versions,
                max_direct,
                concurrency,
                registry,
                from_dir,
                log_level,
            };
            let code = commands::lint::run(action, cli.json)?;
            std::process::exit(code);
        }
    }
}
