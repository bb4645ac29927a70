//! aiie CLI: score teaching cases, grade attempts, and inspect rule bases.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "aiie",
    version,
    about = "Imaging appropriateness scoring and assessment analytics"
)]
struct Cli {
    /// Config file path (defaults to ./aiie.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Custom rule base TOML (defaults to the built-in rules)
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank a case's imaging options with factor breakdowns
    Score {
        /// Path to a case bank file or directory
        #[arg(long)]
        cases: PathBuf,

        /// Case ID to score
        #[arg(long)]
        case: String,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Grade an assessment attempt against a case bank
    Grade {
        /// Path to a case bank file or directory
        #[arg(long)]
        cases: PathBuf,

        /// Attempt file (.json or .toml)
        #[arg(long)]
        attempt: PathBuf,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Write the JSON report to this path
        #[arg(long)]
        output: Option<PathBuf>,

        /// Exit code 1 if the attempt did not pass
        #[arg(long)]
        fail_on_fail: bool,
    },

    /// Validate case bank TOML files
    Validate {
        /// Path to a case bank file or directory
        #[arg(long)]
        cases: PathBuf,
    },

    /// List the evidence rules in the active rule base
    Rules {
        /// Only rules that apply to this modality ID
        #[arg(long)]
        modality: Option<String>,

        /// Output format: text, json, toml
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Create a starter config, case bank, and attempt file
    Init,
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("aiie=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Score {
            cases,
            case,
            format,
        } => commands::score::execute(cases, case, format, cli.config, cli.rules),
        Commands::Grade {
            cases,
            attempt,
            format,
            output,
            fail_on_fail,
        } => commands::grade::execute(cases, attempt, format, output, fail_on_fail, cli.config),
        Commands::Validate { cases } => commands::validate::execute(cases, cli.rules),
        Commands::Rules { modality, format } => commands::rules::execute(modality, format, cli.rules),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
