//! CLI tool to run chain (.chain) files against JSON records.
//!
//! Usage:
//!   chain-run <chains.chain> <input.jsonl>
//!   chain-run <chains.chain> <input.json> -o <partition.json> --bucket valid
//!
//! Diagnostics are logged to stderr; set `RUST_LOG` to adjust the filter.

use clap::{Parser, ValueEnum};
use record_chains::{Bucket, Partition, StreamDriver, parse_records, registry_from_text};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

/// Which part of the partition to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum BucketArg {
    /// All four buckets as one JSON object
    All,
    Processed,
    Valid,
    Invalid,
    Errors,
}

/// Run a chain file against JSON records and write the partitioned result.
#[derive(Parser)]
#[command(name = "chain-run")]
struct Cli {
    /// Chain definition file (.chain)
    chains: String,

    /// Input records: a JSON array or JSON Lines (or /dev/stdin)
    input: String,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Bucket to write
    #[arg(short, long, value_enum, default_value_t = BucketArg::All)]
    bucket: BucketArg,

    /// Log chain progress at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

fn render(partition: &Partition, bucket: BucketArg) -> serde_json::Result<String> {
    match bucket {
        BucketArg::All => serde_json::to_string_pretty(partition),
        BucketArg::Processed => serde_json::to_string_pretty(&partition.processed),
        BucketArg::Valid => serde_json::to_string_pretty(partition.bucket(Bucket::Valid)),
        BucketArg::Invalid => serde_json::to_string_pretty(partition.bucket(Bucket::Invalid)),
        BucketArg::Errors => serde_json::to_string_pretty(partition.bucket(Bucket::Errors)),
    }
}

fn main() {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let chain_text = match fs::read_to_string(&cli.chains) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading chain file '{}': {e}", cli.chains);
            process::exit(1);
        }
    };

    let input_text = match fs::read_to_string(&cli.input) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading input file '{}': {e}", cli.input);
            process::exit(1);
        }
    };

    let registry = match registry_from_text(&chain_text) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Chain file error in '{}': {e}", cli.chains);
            process::exit(1);
        }
    };

    let records = match parse_records(&input_text) {
        Ok(records) => records,
        Err(e) => {
            eprintln!("Input error in '{}': {e}", cli.input);
            process::exit(1);
        }
    };

    if cli.verbose {
        eprintln!("Chains: {} ({})", cli.chains, registry.kinds().join(", "));
        eprintln!("Input:  {}", cli.input);
        eprintln!("Output: {}", cli.output.as_deref().unwrap_or("(stdout)"));
    }

    let partition = StreamDriver::new(&registry).process_stream(records);

    let output = match render(&partition, cli.bucket) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error rendering output: {e}");
            process::exit(1);
        }
    };

    if let Some(out_path) = &cli.output {
        if let Some(parent) = Path::new(out_path.as_str()).parent()
            && !parent.as_os_str().is_empty()
            && fs::create_dir_all(parent).is_err()
        {
            eprintln!("Error creating output directory for '{out_path}'");
            process::exit(1);
        }
        if let Err(e) = fs::write(out_path, format!("{output}\n")) {
            eprintln!("Error writing output file '{out_path}': {e}");
            process::exit(1);
        }
    } else if let Err(e) = writeln!(io::stdout(), "{output}") {
        eprintln!("Error writing output: {e}");
        process::exit(1);
    }

    eprintln!(
        "Processed {} records: {}",
        partition.total(),
        partition.counts()
    );
}
