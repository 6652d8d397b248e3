use applicant_review::config::ReviewConfig;
use applicant_review::error::AppError;
use applicant_review::workflows::intake::{SurveyDataset, SurveyImporter};
use applicant_review::workflows::voting::{CsvVoteLog, ReviewService, VoteLedger};
use applicant_review::workflows::workbook::CsvWorkbookWriter;
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn load_dataset(export_path: &Path) -> Result<SurveyDataset, AppError> {
    Ok(SurveyImporter::from_path(export_path)?)
}

pub(crate) fn open_ledger(ledger_path: &Path) -> Result<VoteLedger<CsvVoteLog>, AppError> {
    Ok(VoteLedger::new(CsvVoteLog::open(ledger_path)?))
}

/// File-backed review service: parsed export, CSV vote log, CSV workbook writer.
pub(crate) fn review_service(
    review: &ReviewConfig,
    results_path: Option<PathBuf>,
) -> Result<ReviewService<CsvVoteLog>, AppError> {
    let dataset = load_dataset(&review.export_path)?;
    let ledger = open_ledger(&review.ledger_path)?;
    Ok(ReviewService::new(
        Arc::new(dataset),
        ledger,
        Arc::new(CsvWorkbookWriter),
        results_path.unwrap_or_else(|| review.results_path.clone()),
    ))
}

pub(crate) fn resolve(path: Option<PathBuf>, default: &Path) -> PathBuf {
    path.unwrap_or_else(|| default.to_path_buf())
}
