//! CLI administration tool for legacy-redirector.
//!
//! Creates, bulk-loads and verifies redirect rules directly against the
//! store, without going through the HTTP surface.
//!
//! # Usage
//!
//! ```bash
//! # Add one redirect (destination: path, URL or post id)
//! cargo run --bin admin -- insert /old-page /new-page
//!
//! # Bulk import `from,to` rows
//! cargo run --bin admin -- import-csv --csv redirects.csv --skip-dupes
//!
//! # Probe unverified rules and update their status
//! cargo run --bin admin -- verify --status unverified --format table
//!
//! # List outbound destination hosts
//! cargo run --bin admin -- find-domains
//!
//! # Check database connection
//! cargo run --bin admin -- db check
//! ```
//!
//! # Environment Variables
//!
//! Same as the server, see [`legacy_redirector::config::Config`].

use legacy_redirector::application::services::{
    ImportFailure, ImportOptions, ImportReport, VerificationReport,
};
use legacy_redirector::config::{self, Config};
use legacy_redirector::domain::entities::VerificationNotice;
use legacy_redirector::domain::repositories::StatusFilter;
use legacy_redirector::server;
use legacy_redirector::utils::csv_pairs::parse_pairs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// CLI tool for managing legacy redirects.
#[derive(Parser)]
#[command(name = "admin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand)]
enum Commands {
    /// Add a single redirect rule
    Insert {
        /// Legacy path or URL to redirect from
        from: String,

        /// Destination path, absolute URL or numeric post id
        to: String,
    },

    /// Bulk import redirects from a `from,to` CSV file
    ImportCsv {
        /// Path to the CSV file
        #[arg(long)]
        csv: PathBuf,

        /// Silently skip sources that already have a rule
        #[arg(long)]
        skip_dupes: bool,

        /// Check every row without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Probe stored redirects and update their verification status
    Verify {
        /// Rules to verify: unverified, verified or all
        #[arg(long, default_value = "unverified")]
        status: StatusFilter,

        /// Output format for notices
        #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// Also report rules that passed
        #[arg(short, long)]
        verbose: bool,
    },

    /// List hosts that redirects point to
    FindDomains,

    /// Database operations
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
}

/// Database operation subcommands.
#[derive(Subcommand)]
enum DbAction {
    /// Check database connection and apply migrations
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = config::load_from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Insert { from, to } => handle_insert(&config, &from, &to).await?,
        Commands::ImportCsv {
            csv,
            skip_dupes,
            dry_run,
        } => {
            let options = ImportOptions {
                skip_duplicates: skip_dupes,
                dry_run,
            };
            handle_import(&config, csv, options).await?
        }
        Commands::Verify {
            status,
            format,
            verbose,
        } => handle_verify(&config, status, format, verbose).await?,
        Commands::FindDomains => handle_find_domains(&config).await?,
        Commands::Db { action } => handle_db_action(&config, action).await?,
    }

    Ok(())
}

async fn handle_insert(config: &Config, from: &str, to: &str) -> Result<()> {
    let stores = server::build_stores(config).await?;
    let service = server::build_redirect_service(config, &stores);

    let rule = service
        .insert_pair(from, to)
        .await
        .map_err(|e| anyhow::anyhow!("Couldn't insert {} -> {}: {}", from, to, e))?;

    println!("{}", "✅ Redirect created".green().bold());
    println!("  ID:   {}", rule.id.to_string().bright_black());
    println!("  From: {}", rule.from_path.cyan());
    println!("  To:   {}", rule.destination.to_string().cyan());

    Ok(())
}

/// Imports a CSV file and prints per-row problems.
///
/// # CSV Format
///
/// ```text
/// /old-path,/new-path
/// /old-post,1234
/// /outbound,https://partner.example/landing
/// ```
async fn handle_import(config: &Config, path: PathBuf, options: ImportOptions) -> Result<()> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Invalid 'csv' file: {}", path.display()))?;
    let pairs = parse_pairs(&content)?;

    let stores = server::build_stores(config).await?;
    let service = server::build_redirect_service(config, &stores);

    let title = if options.dry_run {
        "📥 Checking redirects (dry run)"
    } else {
        "📥 Importing redirects"
    };
    println!("{} ({} rows)", title.bright_blue().bold(), pairs.len());
    println!();

    let report = service.import(pairs, options).await;
    print_import_report(&report, options.dry_run);

    Ok(())
}

fn print_import_report(report: &ImportReport, dry_run: bool) {
    for failure in &report.duplicates {
        print_import_failure("DUPLICATE".yellow(), failure);
    }
    for failure in &report.failures {
        print_import_failure("FAILED".red(), failure);
    }
    if !report.duplicates.is_empty() || !report.failures.is_empty() {
        println!();
    }

    let inserted_label = if dry_run { "Would insert:" } else { "Inserted:" };
    println!(
        "  {:<13} {}",
        inserted_label,
        report.inserted.to_string().bright_green().bold()
    );
    println!("  {:<13} {}", "Skipped:", report.skipped.to_string().bright_white());
    println!(
        "  {:<13} {}",
        "Duplicates:",
        report.duplicates.len().to_string().yellow()
    );
    println!(
        "  {:<13} {}",
        "Failed:",
        report.failures.len().to_string().red()
    );
    println!();
}

fn print_import_failure(label: ColoredString, failure: &ImportFailure) {
    println!(
        "  {} row {}: {} -> {} ({})",
        label,
        failure.row,
        failure.from.cyan(),
        failure.to.cyan(),
        failure.reason
    );
}

/// Runs a verification pass and renders its notices.
///
/// Notices go to stdout in the requested format; the summary is written to
/// stderr so `--format json|csv` output can be piped.
async fn handle_verify(
    config: &Config,
    filter: StatusFilter,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let stores = server::build_stores(config).await?;
    let service = server::build_verification_service(config, &stores, verbose)?;

    eprintln!(
        "{}",
        format!("🔍 Verifying redirects ({})", filter).bright_blue().bold()
    );

    let report = service
        .run(filter)
        .await
        .map_err(|e| anyhow::anyhow!("Verification failed: {}", e))?;

    let mut notices = report.notices.clone();
    notices.extend(report.update_failures.iter().cloned());

    match format {
        OutputFormat::Table => print_notice_table(&notices),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&notices)?),
        OutputFormat::Csv => print_notice_csv(&notices)?,
    }

    print_verification_summary(&report);

    Ok(())
}

fn print_notice_table(notices: &[VerificationNotice]) {
    if notices.is_empty() {
        println!("{}", "  No notices".green());
        return;
    }

    println!(
        "  {:<8} {:<40} {:<40} {}",
        "ID".bright_white().bold(),
        "From".bright_white().bold(),
        "To".bright_white().bold(),
        "Message".bright_white().bold()
    );
    println!("  {}", "─".repeat(110).bright_black());

    for notice in notices {
        println!(
            "  {:<8} {:<40} {:<40} {}",
            notice.id.to_string().bright_black(),
            notice.from_url.cyan(),
            notice.to_url.cyan(),
            notice.message
        );
    }
    println!();
}

fn print_notice_csv(notices: &[VerificationNotice]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(std::io::stdout());
    for notice in notices {
        writer.serialize(notice)?;
    }
    writer.flush()?;
    Ok(())
}

fn print_verification_summary(report: &VerificationReport) {
    eprintln!();
    eprintln!(
        "  Processed: {} of {}",
        report.processed.to_string().bright_white().bold(),
        report.total
    );
    eprintln!(
        "  Verified:  {}",
        report.verified.to_string().bright_green().bold()
    );
    eprintln!("  Failed:    {}", report.failed.to_string().red().bold());
    eprintln!(
        "  Status changes: {} promoted, {} demoted",
        report.promoted.to_string().green(),
        report.demoted.to_string().yellow()
    );
    if !report.update_failures.is_empty() {
        eprintln!(
            "  {}",
            format!("⚠️  {} status updates failed", report.update_failures.len()).red()
        );
    }
    eprintln!();
}

async fn handle_find_domains(config: &Config) -> Result<()> {
    let stores = server::build_stores(config).await?;
    let service = server::build_redirect_service(config, &stores);

    let domains = service
        .find_domains()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list domains: {}", e))?;

    println!(
        "{}",
        format!("Found {} unique outbound domains", domains.len())
            .bright_blue()
            .bold()
    );
    for domain in &domains {
        println!("{}", domain);
    }

    Ok(())
}

/// Handles database diagnostic commands.
async fn handle_db_action(config: &Config, action: DbAction) -> Result<()> {
    match action {
        DbAction::Check => {
            println!("{}", "🔍 Checking database connection...".bright_blue());

            let pool = server::connect_database(config).await?;
            sqlx::query("SELECT 1").fetch_one(&pool).await?;

            println!("{}", "✅ Database connection OK".green().bold());
        }
    }

    Ok(())
}
