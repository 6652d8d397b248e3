use crate::infra::{load_dataset, open_ledger, resolve, review_service};
use applicant_review::config::AppConfig;
use applicant_review::error::AppError;
use applicant_review::telemetry;
use applicant_review::workflows::intake::{applicant_workbook, report::summary_rows, SurveySummary};
use applicant_review::workflows::voting::{
    AggregationEngine, ApplicantTally, CsvVoteLog, JudgeTally, VoteEvent, VoteLedger,
    VoteSubmission,
};
use applicant_review::workflows::workbook::{publish, CsvWorkbookWriter};
use chrono::Local;
use clap::Args;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Default)]
pub(crate) struct IntakeSummaryArgs {
    /// Survey export to read (defaults to REVIEW_EXPORT_PATH)
    #[arg(long)]
    pub(crate) export: Option<PathBuf>,
    /// Print the summary as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct IntakeWorkbookArgs {
    /// Survey export to read (defaults to REVIEW_EXPORT_PATH)
    #[arg(long)]
    pub(crate) export: Option<PathBuf>,
    /// Workbook target (defaults to REVIEW_WORKBOOK_PATH)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct CastVoteArgs {
    #[arg(long)]
    pub(crate) judge: String,
    #[arg(long)]
    pub(crate) applicant: String,
    /// Approve, Reject or Maybe
    #[arg(long)]
    pub(crate) status: String,
    /// Whole number from 1 to 5
    #[arg(long)]
    pub(crate) rating: i64,
    #[arg(long)]
    pub(crate) comment: Option<String>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ResultsArgs {}

#[derive(Args, Debug, Default)]
pub(crate) struct ExportResultsArgs {
    /// Results workbook target (defaults to REVIEW_RESULTS_PATH)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

fn load_config() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;
    Ok(config)
}

pub(crate) fn run_intake_summary(args: IntakeSummaryArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let export = resolve(args.export, &config.review.export_path);
    let dataset = load_dataset(&export)?;
    let summary = SurveySummary::build(&dataset, Local::now().naive_local());

    if args.json {
        let rendered = serde_json::to_string_pretty(&summary).map_err(std::io::Error::from)?;
        println!("{rendered}");
        return Ok(());
    }

    println!("Survey export: {}", export.display());
    for row in summary_rows(&summary) {
        println!("{}", row.join("\t"));
    }
    Ok(())
}

pub(crate) fn run_intake_workbook(args: IntakeWorkbookArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let export = resolve(args.export, &config.review.export_path);
    let output = resolve(args.output, &config.review.workbook_path);

    let written = write_applicant_workbook(&export, &output)?;
    println!("Applicant workbook written to {}", written.display());
    if written != output {
        println!("  {} was in use; wrote the backup instead", output.display());
    }
    Ok(())
}

pub(crate) fn write_applicant_workbook(export: &Path, output: &Path) -> Result<PathBuf, AppError> {
    let dataset = load_dataset(export)?;
    let workbook = applicant_workbook(&dataset, Local::now().naive_local());
    Ok(publish(&CsvWorkbookWriter, &workbook, output)?)
}

pub(crate) fn run_cast_vote(args: CastVoteArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let ledger = open_ledger(&config.review.ledger_path)?;
    let event = cast_vote(&ledger, args)?;

    println!(
        "Recorded {} ({}/5) for {} by {} (version {})",
        event.status, event.rating, event.applicant_name, event.judge_name, event.version
    );
    if let (Some(status), Some(rating)) = (event.original_status, event.original_rating) {
        println!("  Changed from: {} | {}/5", status, rating);
    }
    Ok(())
}

pub(crate) fn cast_vote(
    ledger: &VoteLedger<CsvVoteLog>,
    args: CastVoteArgs,
) -> Result<VoteEvent, AppError> {
    let CastVoteArgs {
        judge,
        applicant,
        status,
        rating,
        comment,
    } = args;

    Ok(ledger.record(&VoteSubmission {
        judge_name: judge,
        applicant_name: applicant,
        status,
        rating,
        comment,
    })?)
}

pub(crate) fn run_results(_args: ResultsArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let dataset = load_dataset(&config.review.export_path)?;
    let ledger = open_ledger(&config.review.ledger_path)?;
    let engine = AggregationEngine::new(&ledger);

    render_applicant_tallies(&engine.summarize_by_applicant(&dataset.applicant_names())?);
    render_judge_tallies(&engine.summarize_by_judge()?);
    Ok(())
}

fn render_applicant_tallies(tallies: &[ApplicantTally]) {
    println!("Vote summary by applicant");
    for tally in tallies {
        println!(
            "- {}: {} vote(s), {} approve / {} reject / {} maybe, avg rating {}",
            tally.applicant,
            tally.total_votes,
            tally.approve_count,
            tally.reject_count,
            tally.maybe_count,
            tally.average_label()
        );
    }
}

fn render_judge_tallies(tallies: &[JudgeTally]) {
    if tallies.is_empty() {
        println!("\nJudge activity: no votes recorded");
        return;
    }

    println!("\nJudge activity");
    for tally in tallies {
        println!(
            "- {}: {} vote(s), {} approve / {} reject / {} maybe",
            tally.judge,
            tally.votes_cast,
            tally.approve_count,
            tally.reject_count,
            tally.maybe_count
        );
    }
}

pub(crate) fn run_export_results(args: ExportResultsArgs) -> Result<(), AppError> {
    let config = load_config()?;
    let service = review_service(&config.review, args.output)?;
    let written = service.export_results()?;

    println!("Results workbook written to {}", written.display());
    if written != service.results_path() {
        println!(
            "  {} was in use; wrote the backup instead",
            service.results_path().display()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use applicant_review::workflows::voting::VoteStatus;
    use std::fs;

    const EXPORT: &str = "Q3\tQ25_1\n\
Name\tFamiliarity\n\
{\"ImportId\":\"QID3\"}\t\n\
Jane Doe\t3\n";

    fn args(status: &str, rating: i64) -> CastVoteArgs {
        CastVoteArgs {
            judge: "Alice".to_string(),
            applicant: "Jane Doe".to_string(),
            status: status.to_string(),
            rating,
            comment: None,
        }
    }

    #[test]
    fn cast_vote_chains_revisions_in_the_file_log() {
        let dir = tempfile::tempdir().expect("tempdir");
        let ledger = open_ledger(&dir.path().join("votes.csv")).expect("ledger opens");

        cast_vote(&ledger, args("Approve", 4)).expect("first vote");
        let revised = cast_vote(&ledger, args("reject", 2)).expect("revision");
        assert_eq!(revised.version, 2);
        assert_eq!(revised.original_status, Some(VoteStatus::Approve));

        assert!(matches!(
            cast_vote(&ledger, args("Approve", 0)),
            Err(AppError::Review(_))
        ));
        assert_eq!(ledger.events().expect("reads").len(), 2);
    }

    #[test]
    fn applicant_workbook_is_written_from_the_export() {
        let dir = tempfile::tempdir().expect("tempdir");
        let export = dir.path().join("responses.tsv");
        fs::write(&export, EXPORT).expect("export written");
        let output = dir.path().join("applicant_report");

        let written = write_applicant_workbook(&export, &output).expect("workbook");
        assert_eq!(written, output);

        let sheet = fs::read_to_string(output.join("02_Jane Doe.csv")).expect("applicant sheet");
        assert!(sheet.contains("Familiarity,Moderately familiar"));
    }

    #[test]
    fn missing_export_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = write_applicant_workbook(&dir.path().join("absent.tsv"), dir.path());
        assert!(matches!(result, Err(AppError::Intake(_))));
    }
}
