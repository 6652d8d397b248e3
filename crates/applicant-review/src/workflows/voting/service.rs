use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::aggregation::{AggregationEngine, ApplicantTally, JudgeTally};
use super::domain::{InvalidVoteError, VoteEvent, VoteSubmission};
use super::export::results_workbook;
use super::ledger::{LedgerError, VoteLedger, VoteLog};
use crate::workflows::intake::{Response, SurveyDataset};
use crate::workflows::workbook::{publish, WorkbookError, WorkbookWriter};

/// Identity of the judge making a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgeSession {
    judge_name: String,
}

impl JudgeSession {
    pub fn new(judge_name: &str) -> Result<Self, InvalidVoteError> {
        let judge_name = judge_name.trim();
        if judge_name.is_empty() {
            return Err(InvalidVoteError::MissingJudge);
        }
        Ok(Self {
            judge_name: judge_name.to_string(),
        })
    }

    pub fn judge_name(&self) -> &str {
        &self.judge_name
    }
}

/// Vote body submitted on behalf of the session judge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub applicant_name: String,
    pub status: String,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicantListing {
    pub name: String,
    pub lab: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicantDetail {
    pub name: String,
    pub lab: String,
    pub responses: Vec<Response>,
    pub votes: Vec<VoteEvent>,
}

/// Review panel operations over a parsed survey and the vote ledger.
pub struct ReviewService<L> {
    dataset: Arc<SurveyDataset>,
    ledger: VoteLedger<L>,
    writer: Arc<dyn WorkbookWriter>,
    results_path: PathBuf,
}

impl<L: VoteLog> ReviewService<L> {
    pub fn new(
        dataset: Arc<SurveyDataset>,
        ledger: VoteLedger<L>,
        writer: Arc<dyn WorkbookWriter>,
        results_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            dataset,
            ledger,
            writer,
            results_path: results_path.into(),
        }
    }

    pub fn dataset(&self) -> &SurveyDataset {
        &self.dataset
    }

    pub fn ledger(&self) -> &VoteLedger<L> {
        &self.ledger
    }

    pub fn results_path(&self) -> &Path {
        &self.results_path
    }

    pub fn applicants(&self) -> Vec<ApplicantListing> {
        self.dataset
            .applicants()
            .map(|record| ApplicantListing {
                name: record.name.clone(),
                lab: self.lab_of(&record.name),
            })
            .collect()
    }

    /// Survey responses plus every judge's current vote.
    pub fn applicant(&self, name: &str) -> Result<ApplicantDetail, ReviewServiceError> {
        let record = self
            .dataset
            .applicant(name)
            .ok_or_else(|| ReviewServiceError::UnknownApplicant(name.to_string()))?;

        Ok(ApplicantDetail {
            name: record.name.clone(),
            lab: self.lab_of(&record.name),
            responses: record.responses().to_vec(),
            votes: self.ledger.all_for(&record.name)?,
        })
    }

    /// Cast or revise the session judge's vote for a known applicant.
    pub fn cast_vote(
        &self,
        session: &JudgeSession,
        ballot: Ballot,
    ) -> Result<VoteEvent, ReviewServiceError> {
        let submission = VoteSubmission {
            judge_name: session.judge_name().to_string(),
            applicant_name: ballot.applicant_name.trim().to_string(),
            status: ballot.status,
            rating: ballot.rating,
            comment: ballot.comment,
        };
        submission.validate().map_err(LedgerError::from)?;
        self.ensure_known(&submission.applicant_name)?;

        Ok(self.ledger.record(&submission)?)
    }

    pub fn my_vote(
        &self,
        session: &JudgeSession,
        applicant: &str,
    ) -> Result<Option<VoteEvent>, ReviewServiceError> {
        self.ensure_known(applicant)?;
        Ok(self.ledger.latest(session.judge_name(), applicant)?)
    }

    /// Tallies for every parsed applicant, in name order.
    pub fn applicant_results(&self) -> Result<Vec<ApplicantTally>, ReviewServiceError> {
        let names = self.dataset.applicant_names();
        Ok(AggregationEngine::new(&self.ledger).summarize_by_applicant(&names)?)
    }

    pub fn judge_results(&self) -> Result<Vec<JudgeTally>, ReviewServiceError> {
        Ok(AggregationEngine::new(&self.ledger).summarize_by_judge()?)
    }

    /// Write the results workbook, returning the path actually used.
    pub fn export_results(&self) -> Result<PathBuf, ReviewServiceError> {
        let latest = self.ledger.latest_votes()?;
        let workbook = results_workbook(&latest, &self.dataset.applicant_names());
        Ok(publish(self.writer.as_ref(), &workbook, &self.results_path)?)
    }

    fn ensure_known(&self, applicant: &str) -> Result<(), ReviewServiceError> {
        match self.dataset.applicant(applicant) {
            Some(_) => Ok(()),
            None => Err(ReviewServiceError::UnknownApplicant(applicant.to_string())),
        }
    }

    fn lab_of(&self, applicant: &str) -> String {
        self.dataset.lab_of(applicant).unwrap_or_default().to_string()
    }
}

/// Error raised by the review service.
#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error("unknown applicant '{0}'")]
    UnknownApplicant(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Workbook(#[from] WorkbookError),
}
