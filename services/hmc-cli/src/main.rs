//! `hmc`: fuzzy-logic hydrometeor classification of polarimetric radar
//! fields.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hmc_cli::commands::{self, ClassifyOptions};
use hmc_cli::report::render_registry;

#[derive(Parser, Debug)]
#[command(name = "hmc")]
#[command(about = "Fuzzy-logic hydrometeor classification for polarimetric radar")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log level
    #[arg(long, default_value = "info", env = "HMC_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "HMC_LOG_FORMAT", global = true)]
    log_format: LogFormat,

    /// Worker threads for the parallel stages (default: one per core)
    #[arg(long, env = "HMC_THREADS", global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a field file
    Classify {
        /// Run configuration (YAML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Membership table (JSON, YAML or text); overrides the run config
        #[arg(short, long)]
        table: Option<PathBuf>,

        /// Input fields (JSON or YAML)
        #[arg(short, long)]
        fields: PathBuf,

        /// Report destination (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Probability threshold; overrides the run config
        #[arg(long)]
        threshold: Option<f32>,

        /// Include per-class probability fields in the report
        #[arg(long)]
        probabilities: bool,
    },

    /// Validate a membership table and describe it
    InspectTable {
        /// Run configuration (for the registry and default table)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Membership table; overrides the run config
        #[arg(short, long)]
        table: Option<PathBuf>,

        /// Write the table back out, format chosen by extension
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// List the hydrometeor classes in axis order
    Classes {
        /// Run configuration (for a custom registry)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.log_format);

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    match args.command {
        Command::Classify {
            config,
            table,
            fields,
            output,
            threshold,
            probabilities,
        } => {
            info!(fields = %fields.display(), "Starting classification");
            let run = commands::resolve_run_config(config.as_deref())?;
            let options = ClassifyOptions {
                table,
                fields,
                threshold,
                probabilities,
            };
            let report = commands::classify(&run, &options)?;
            if output.is_some() {
                eprint!("{}", report.render_summary());
            }
            commands::write_report(&report, output.as_deref(), run.output.pretty)?;
        }
        Command::InspectTable {
            config,
            table,
            export,
        } => {
            let run = commands::resolve_run_config(config.as_deref())?;
            let report = commands::inspect_table(&run, table.as_deref(), export.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Classes { config } => {
            let registry = commands::registry_for(config.as_deref())?;
            print!("{}", render_registry(&registry));
        }
    }

    Ok(())
}

/// Logs go to stderr so reports can be piped from stdout.
fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}
