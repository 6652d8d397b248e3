//! Multi-judge voting over the parsed applicants.
//!
//! Every vote is an immutable [`VoteEvent`] appended to a [`VoteLedger`]; a change
//! of mind is a new event with the next version and the superseded status and
//! rating carried in its `original_*` fields. Rollups and exports only ever look
//! at the latest event per judge and applicant.

pub mod aggregation;
pub mod domain;
pub mod export;
pub mod ledger;
pub mod router;
pub mod service;

pub use aggregation::{AggregationEngine, ApplicantTally, JudgeTally};
pub use domain::{InvalidVoteError, VoteEvent, VoteStatus, VoteSubmission};
pub use export::results_workbook;
pub use ledger::{CsvVoteLog, InMemoryVoteLog, LedgerError, VoteLedger, VoteLog, VoteLogError};
pub use router::{review_router, JUDGE_HEADER, SECRET_HEADER};
pub use service::{
    ApplicantDetail, ApplicantListing, Ballot, JudgeSession, ReviewService, ReviewServiceError,
};
