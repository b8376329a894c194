// Voter list extraction CLI
// Feeds pre-recognized page text through the extraction pipeline

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use yaadi::accumulator::ExtractionResult;
use yaadi::models::JobConfig;
use yaadi::{ExtractionJob, JobSummary, TextDirSource};

#[derive(Parser)]
#[command(
    name = "yaadi",
    about = "Extract structured voter records from OCR page text"
)]
struct Cli {
    /// Directory containing one UTF-8 .txt file per page, in page order
    pages_dir: PathBuf,

    /// Checkpoint/output path (JSON, overwritten atomically after each page)
    #[arg(short, long, default_value = "voters.checkpoint.json")]
    output: PathBuf,

    /// Job identifier used in the checkpoint
    #[arg(long, default_value = "local")]
    job_id: String,

    /// Constituency label (मतदार संघ) stamped on every record
    #[arg(long)]
    matadaar_sangh: String,

    /// Election type label stamped on every record
    #[arg(long)]
    election_type: String,

    /// Ward label stamped on every record
    #[arg(long)]
    ward: String,

    /// First page to process (1-based, inclusive)
    #[arg(long)]
    start_page: Option<usize>,

    /// Last page to process (1-based, inclusive)
    #[arg(long)]
    end_page: Option<usize>,
}

fn print_summary(summary: &JobSummary, result: &ExtractionResult, config: &JobConfig) {
    let totals = result.totals();

    println!("\n===============================================");
    println!("        VOTER LIST EXTRACTION SUMMARY");
    println!("===============================================\n");

    println!("Job: {} ({:?})", summary.job_id, summary.status);
    println!("Pages Processed: {}", summary.pages_processed);
    println!("Candidates Seen: {}", totals.candidates);
    println!("Records Extracted: {}", summary.record_count);
    println!("Candidates Rejected: {}", totals.rejected);

    if !summary.skipped.is_empty() {
        println!("\nSKIPPED PAGES:");
        for skip in &summary.skipped {
            println!("  - page {}: {}", skip.page, skip.reason);
        }
    }

    if !result.rejections().is_empty() {
        println!("\nREJECTION LOG (last 10):");
        let tail = result.rejections().iter().rev().take(10);
        for rejection in tail {
            println!(
                "  - page {}: {:?} ({})",
                rejection.page, rejection.raw, rejection.reason
            );
        }
    }

    // Data quality counts, column by column.
    let total = result.record_count();
    let names = result.records().filter(|r| r.name.is_some()).count();
    let ages = result.records().filter(|r| r.age.is_some()).count();
    let genders = result
        .records()
        .filter(|r| !r.missing_fields.contains("gender"))
        .count();
    println!("\nDATA QUALITY:");
    println!("  Names:   {} / {}", names, total);
    println!("  Ages:    {} / {}", ages, total);
    println!("  Genders: {} / {}", genders, total);

    println!("\nOutput columns: {}", ExtractionResult::header_row().join(" | "));
    println!(
        "Metadata: {} / {} / ward {}",
        config.constituency, config.election_type, config.ward
    );
    println!("===============================================");
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let config = JobConfig::new(&cli.matadaar_sangh, &cli.election_type, &cli.ward)
        .with_page_range(cli.start_page, cli.end_page);

    let mut source = match TextDirSource::new(&cli.pages_dir) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error reading pages directory: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let mut job = match ExtractionJob::new(&cli.job_id, config, &cli.output) {
        Ok(job) => job,
        Err(err) => {
            eprintln!("Error: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match job.run(&mut source) {
        Ok(summary) => {
            print_summary(&summary, job.result(), job.config());
            println!("Checkpoint written to: {}", cli.output.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            // The last checkpoint, if any, is still the usable partial result.
            eprintln!("Error: {}", err);
            eprintln!(
                "Partial result: {} records accumulated; last checkpoint (if written): {}",
                job.result().record_count(),
                cli.output.display()
            );
            ExitCode::FAILURE
        }
    }
}
