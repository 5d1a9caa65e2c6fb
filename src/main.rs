use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod audit;
mod checks;
mod input;
mod models;
mod report;

#[derive(Parser)]
#[command(name = "journal-audit")]
#[command(about = "Rule-based violation auditor for digitized grade journals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks over an extraction document and write a date-stamped report
    Audit {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Print journals from a saved report, worst first
    Summary {
        #[arg(long)]
        report: PathBuf,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Render a saved report as markdown
    Report {
        #[arg(long)]
        report: PathBuf,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Flatten a saved report to CSV, one row per violation kind
    Export {
        #[arg(long)]
        report: PathBuf,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let today = Utc::now().date_naive();

    match cli.command {
        Commands::Audit { input, out_dir } => {
            let document = input::load_document(&input)?;
            let summary = audit::audit_run(&document);
            let path = report::write_summary(&summary, &out_dir, today)?;

            println!("Report written to {}.", path.display());
            println!(
                "Journals with violations: {}. Total violations: {}.",
                summary.journals.len(),
                summary.violations_found
            );
        }
        Commands::Summary { report, limit } => {
            let summary = report::load_summary(&report)?;

            if summary.journals.is_empty() {
                println!("No violations recorded in this report.");
                return Ok(());
            }

            let mut journals = summary.journals;
            journals.sort_by(|a, b| b.violations_count.cmp(&a.violations_count));

            println!("Journals by violation count:");
            for entry in journals.iter().take(limit) {
                println!(
                    "- {} (ID {}) {} violations: {}",
                    entry.journal_name,
                    entry.journal_id,
                    entry.violations_count,
                    entry.violation_kinds.join(", ")
                );
            }
        }
        Commands::Report { report, out } => {
            let summary = report::load_summary(&report)?;
            let markdown = report::build_markdown(&summary, today);
            std::fs::write(&out, markdown)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { report, out } => {
            let summary = report::load_summary(&report)?;
            let rows = report::export_csv(&summary, &out)?;
            println!("Exported {rows} rows to {}.", out.display());
        }
    }

    Ok(())
}
