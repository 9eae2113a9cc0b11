//! sqlscope command-line interface

mod analyze;
mod catalog;
mod output;

use clap::{Parser, Subcommand};
use sqlscope::SqlDialect;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// SQL semantic analysis tool
#[derive(Parser)]
#[command(name = "sqlscope")]
#[command(author, version, about = "Semantic resolution and type inference for SQL", long_about = None)]
struct Cli {
    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output file (default: stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    color: String,

    /// Print JSON instead of a report
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a query against a catalog
    Analyze {
        /// Catalog document (JSON)
        catalog: PathBuf,

        /// SQL text, or - to read stdin
        sql: String,

        /// Analysis options file (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Schema searched for unqualified table names
        #[arg(long)]
        search_path: Option<String>,

        /// Deepest allowed query nesting
        #[arg(long)]
        max_depth: Option<usize>,

        /// SQL dialect (generic, postgres, mysql, sqlite)
        #[arg(short, long)]
        dialect: Option<SqlDialect>,
    },

    /// Validate a catalog document and print it
    Catalog {
        /// Catalog document (JSON)
        file: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug,sqlparser=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    human_panic::setup_panic!();

    let cli = Cli::parse();

    output::setup_colors(&cli.color);
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Analyze {
            catalog,
            sql,
            config,
            search_path,
            max_depth,
            dialect,
        } => analyze::analyze(analyze::AnalyzeConfig {
            catalog,
            sql,
            config,
            search_path,
            max_depth,
            dialect,
            json: cli.json,
            output_file: cli.output,
        }),

        Commands::Catalog { file } => catalog::show(catalog::CatalogConfig {
            file,
            json: cli.json,
            output_file: cli.output,
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(1);
    }
}
