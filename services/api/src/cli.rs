use crate::commands::{
    run_cast_vote, run_export_results, run_intake_summary, run_intake_workbook, run_results,
    CastVoteArgs, ExportResultsArgs, IntakeSummaryArgs, IntakeWorkbookArgs, ResultsArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use applicant_review::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Applicant Review",
    about = "Parse survey exports and run the judge voting panel from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Inspect the survey export and generate the applicant workbook
    Intake {
        #[command(subcommand)]
        command: IntakeCommand,
    },
    /// Cast votes and report results from the vote ledger
    Votes {
        #[command(subcommand)]
        command: VotesCommand,
    },
}

#[derive(Subcommand, Debug)]
enum IntakeCommand {
    /// Print the summary breakdowns of the survey export
    Summary(IntakeSummaryArgs),
    /// Write the Summary sheet plus one sheet per applicant
    Workbook(IntakeWorkbookArgs),
}

#[derive(Subcommand, Debug)]
enum VotesCommand {
    /// Cast or revise a judge's vote
    Cast(CastVoteArgs),
    /// Print per-applicant and per-judge tallies
    Results(ResultsArgs),
    /// Write the results workbook
    Export(ExportResultsArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Intake {
            command: IntakeCommand::Summary(args),
        } => run_intake_summary(args),
        Command::Intake {
            command: IntakeCommand::Workbook(args),
        } => run_intake_workbook(args),
        Command::Votes {
            command: VotesCommand::Cast(args),
        } => run_cast_vote(args),
        Command::Votes {
            command: VotesCommand::Results(args),
        } => run_results(args),
        Command::Votes {
            command: VotesCommand::Export(args),
        } => run_export_results(args),
    }
}
