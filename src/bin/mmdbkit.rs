mod cli_utils;
mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use commands::{cmd_build, cmd_inspect, cmd_query, BuildOptions};

#[derive(Parser)]
#[command(name = "mmdbkit")]
#[command(
    about = "Build, query and inspect MaxMind-format IP prefix databases",
    long_about = "mmdbkit - Build, query and inspect MaxMind-format IP prefix databases\n\n\
    Databases map IPv4/IPv6 networks (CIDR ranges) to structured records and are\n\
    queried through memory-mapped files with zero-copy loading.\n\n\
    Examples:\n\
      mmdbkit build networks.json -o networks.mmdb\n\
      mmdbkit query networks.mmdb 192.168.1.1\n\
      mmdbkit inspect networks.mmdb --json\n\n\
    Logging goes to stderr; set RUST_LOG or pass -v/-vv for more detail."
)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v: debug, -vv: trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query a database for an IP address
    Query {
        /// Path to the database file
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// IPv4 or IPv6 address to look up
        #[arg(value_name = "IP")]
        query: String,

        /// Quiet mode - no output, only exit code (0 = found, 1 = not found)
        #[arg(short, long)]
        quiet: bool,
    },

    /// Show a database's metadata and region sizes
    Inspect {
        /// Path to the database file
        #[arg(value_name = "DATABASE")]
        database: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Build a database from a JSON list of networks
    Build {
        /// JSON array of {"key": "10.0.0.0/8", "data": {...}}
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output database file
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        /// Record size in bits: 24, 28 or 32 (default: narrowest that fits)
        #[arg(short, long, value_parser = ["24", "28", "32"])]
        record_size: Option<String>,

        /// Build an IPv4-only tree (IPv6 entries are rejected)
        #[arg(long)]
        ipv4: bool,

        /// Custom database type name for metadata (e.g., "MyCompany-GeoIP")
        #[arg(short = 't', long, value_name = "NAME")]
        database_type: Option<String>,

        /// Description text
        #[arg(short = 'd', long)]
        description: Option<String>,

        /// Language code for description (default: "en")
        #[arg(long, default_value = "en")]
        desc_lang: String,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "mmdbkit=debug",
        _ => "mmdbkit=trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Query {
            database,
            query,
            quiet,
        } => cmd_query(database, query, quiet),
        Commands::Inspect { database, json } => cmd_inspect(database, json),
        Commands::Build {
            input,
            output,
            record_size,
            ipv4,
            database_type,
            description,
            desc_lang,
        } => cmd_build(BuildOptions {
            input,
            output,
            record_size,
            ipv4,
            database_type,
            description,
            desc_lang,
        }),
    }
}
