//! Importer Service - Loads protest exports into the relational store
//!
//! Usage:
//!   protest-importer protesto2.csv
//!   protest-importer --dry-run --encoding windows-1252 export.csv
//!   protest-importer --json protesto2.csv > summary.json
//!
//! Database settings are read from the environment (or `.env`):
//! DB_URL, or DB_HOST / DB_PORT / DB_USER / DB_PASSWORD / DB_NAME.
//!
//! Exit status: 0 when the file was processed (even with rejected rows),
//! 1 when the import was aborted.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use protest_importer::config::{DEFAULT_DELIMITER, DEFAULT_PROGRESS_EVERY};
use protest_importer::{DbConfig, ImportOptions, ImportSummary};

#[derive(Parser, Debug)]
#[command(
    name = "protest-importer",
    about = "Imports protest records from a delimited export into the database"
)]
struct Args {
    /// Source file
    #[arg(default_value = "protesto2.csv")]
    file: PathBuf,

    /// Field delimiter (a comma would clash with decimal-comma amounts)
    #[arg(long, default_value_t = DEFAULT_DELIMITER as char)]
    delimiter: char,

    /// Source file encoding (WHATWG label, e.g. utf-8, windows-1252)
    #[arg(long, default_value = "utf-8")]
    encoding: String,

    /// Log progress every N rows
    #[arg(long, default_value_t = DEFAULT_PROGRESS_EVERY)]
    progress_every: u64,

    /// Dry run - validate rows without connecting to the database
    #[arg(long, default_value = "false")]
    dry_run: bool,

    /// Print the summary as JSON on stdout
    #[arg(long, default_value = "false")]
    json: bool,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    init_tracing();

    if let Err(err) = run().await {
        error!(error = %err, "import aborted");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    let options = ImportOptions::new(
        args.delimiter,
        &args.encoding,
        args.progress_every,
        args.dry_run,
    )
    .context("Invalid command line options")?;

    // Dry runs never connect, so database settings are irrelevant there.
    let db = if options.dry_run {
        DbConfig::default()
    } else {
        DbConfig::from_env().context("Invalid database configuration")?
    };

    let summary = protest_importer::run(&db, &args.file, &options)
        .await
        .with_context(|| format!("Import of {} failed", args.file.display()))?;

    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

fn print_summary(summary: &ImportSummary) {
    if summary.dry_run {
        println!("\n=== Validation Complete (dry run) ===");
    } else {
        println!("\n=== Import Complete ===");
    }
    println!("Run ID: {}", summary.run_id);
    println!("Rows processed: {}", summary.processed);
    println!("Successful imports: {}", summary.imported);
    println!("Rejected rows: {}", summary.failed);
    if !summary.dry_run {
        println!("Guarantors recorded: {}", summary.guarantors);
        println!(
            "Clients: {} new, {} matched",
            summary.resolution.clients_created, summary.resolution.clients_matched
        );
        println!(
            "Contracts: {} new, {} matched",
            summary.resolution.contracts_created, summary.resolution.contracts_matched
        );
    }

    if !summary.failures.is_empty() {
        println!("\nRejected rows (first {}):", summary.failures.len());
        for failure in &summary.failures {
            match failure.line {
                Some(line) => println!("  row {} (line {}): {}", failure.row, line, failure.error),
                None => println!("  row {}: {}", failure.row, failure.error),
            }
        }
        if summary.failed as usize > summary.failures.len() {
            println!("  ... and {} more", summary.failed as usize - summary.failures.len());
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["protest-importer"]);
        assert_eq!(args.file, PathBuf::from("protesto2.csv"));
        assert_eq!(args.delimiter, ';');
        assert_eq!(args.encoding, "utf-8");
        assert_eq!(args.progress_every, 1000);
        assert!(!args.dry_run);
        assert!(!args.json);
    }

    #[test]
    fn test_args_flags() {
        let args = Args::parse_from([
            "protest-importer",
            "--dry-run",
            "--json",
            "--delimiter",
            "|",
            "--encoding",
            "windows-1252",
            "--progress-every",
            "500",
            "export.csv",
        ]);
        assert_eq!(args.file, PathBuf::from("export.csv"));
        assert_eq!(args.delimiter, '|');
        assert_eq!(args.encoding, "windows-1252");
        assert_eq!(args.progress_every, 500);
        assert!(args.dry_run);
        assert!(args.json);
    }
}
