use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{Local, NaiveDateTime, Timelike};
use tracing::{info, warn};

use super::domain::{InvalidVoteError, VoteEvent, VoteSubmission};

/// Column order of the persisted vote log.
pub const LOG_COLUMNS: [&str; 9] = [
    "timestamp",
    "judge_name",
    "applicant_name",
    "status",
    "rating",
    "comment",
    "original_status",
    "original_rating",
    "vote_version",
];

/// `(judge, applicant)` key of the latest-vote view.
pub type VoteKey = (String, String);

/// Storage behind the ledger. Implementations only ever append.
pub trait VoteLog: Send + Sync {
    fn append(&self, event: &VoteEvent) -> Result<(), VoteLogError>;
    /// Every stored event in append order.
    fn events(&self) -> Result<Vec<VoteEvent>, VoteLogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum VoteLogError {
    #[error("vote log {path} is unavailable: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("vote log {path} could not be encoded or decoded: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// CSV file log with the header written once, when the file is created.
#[derive(Debug, Clone)]
pub struct CsvVoteLog {
    path: PathBuf,
}

impl CsvVoteLog {
    /// Open the log, creating a header-only file when none exists yet.
    pub fn open<P: Into<PathBuf>>(path: P) -> Result<Self, VoteLogError> {
        let log = Self { path: path.into() };
        let io_error = |source| VoteLogError::Io {
            path: log.path.clone(),
            source,
        };

        let needs_header = match fs::metadata(&log.path) {
            Ok(meta) => meta.len() == 0,
            Err(err) if err.kind() == io::ErrorKind::NotFound => true,
            Err(err) => return Err(io_error(err)),
        };

        if needs_header {
            if let Some(parent) = log.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(io_error)?;
            }
            let mut writer = csv::Writer::from_path(&log.path).map_err(|source| log.csv_error(source))?;
            writer
                .write_record(LOG_COLUMNS)
                .map_err(|source| log.csv_error(source))?;
            writer.flush().map_err(io_error)?;
            info!(path = %log.path.display(), "vote log created");
        }

        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn csv_error(&self, source: csv::Error) -> VoteLogError {
        VoteLogError::Csv {
            path: self.path.clone(),
            source,
        }
    }
}

impl VoteLog for CsvVoteLog {
    fn append(&self, event: &VoteEvent) -> Result<(), VoteLogError> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|source| VoteLogError::Io {
                path: self.path.clone(),
                source,
            })?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .serialize(event)
            .map_err(|source| self.csv_error(source))?;
        writer.flush().map_err(|source| VoteLogError::Io {
            path: self.path.clone(),
            source,
        })
    }

    fn events(&self) -> Result<Vec<VoteEvent>, VoteLogError> {
        let mut reader = match csv::Reader::from_path(&self.path) {
            Ok(reader) => reader,
            Err(err) => {
                if let csv::ErrorKind::Io(io_err) = err.kind() {
                    if io_err.kind() == io::ErrorKind::NotFound {
                        return Ok(Vec::new());
                    }
                }
                return Err(self.csv_error(err));
            }
        };

        let mut events = Vec::new();
        for (index, row) in reader.deserialize::<VoteEvent>().enumerate() {
            match row {
                Ok(event) => events.push(event),
                Err(err) if matches!(err.kind(), csv::ErrorKind::Io(_)) => {
                    return Err(self.csv_error(err));
                }
                Err(err) => {
                    warn!(
                        path = %self.path.display(),
                        row = index + 2,
                        error = %err,
                        "skipping unreadable vote log row"
                    );
                }
            }
        }
        Ok(events)
    }
}

/// Volatile log for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryVoteLog {
    events: Mutex<Vec<VoteEvent>>,
}

impl InMemoryVoteLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VoteLog for InMemoryVoteLog {
    fn append(&self, event: &VoteEvent) -> Result<(), VoteLogError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }

    fn events(&self) -> Result<Vec<VoteEvent>, VoteLogError> {
        Ok(self
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Invalid(#[from] InvalidVoteError),
    #[error(transparent)]
    Log(#[from] VoteLogError),
}

/// Append-only vote store with revision chaining and latest-vote resolution.
///
/// `record` is serialized by a single append lock so that the version computed
/// from the prior latest event cannot collide with a concurrent append. Reads
/// take a fresh snapshot of the log and never lock.
pub struct VoteLedger<L> {
    log: L,
    append_lock: Mutex<()>,
}

impl<L: VoteLog> VoteLedger<L> {
    pub fn new(log: L) -> Self {
        Self {
            log,
            append_lock: Mutex::new(()),
        }
    }

    pub fn log(&self) -> &L {
        &self.log
    }

    pub fn record(&self, submission: &VoteSubmission) -> Result<VoteEvent, LedgerError> {
        let now = Local::now().naive_local();
        let now = now.with_nanosecond(0).unwrap_or(now);
        self.record_at(submission, now)
    }

    /// Validate, chain onto the pair's prior latest event and append.
    pub fn record_at(
        &self,
        submission: &VoteSubmission,
        timestamp: NaiveDateTime,
    ) -> Result<VoteEvent, LedgerError> {
        let vote = submission.validate()?;

        let _guard = self
            .append_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let prior = self.latest(&vote.judge_name, &vote.applicant_name)?;

        let event = VoteEvent {
            timestamp,
            judge_name: vote.judge_name,
            applicant_name: vote.applicant_name,
            status: vote.status,
            rating: vote.rating,
            comment: vote.comment,
            original_status: prior.as_ref().map(|prior| prior.status),
            original_rating: prior.as_ref().map(|prior| prior.rating),
            version: prior.as_ref().map_or(1, |prior| prior.version + 1),
        };
        self.log.append(&event)?;

        info!(
            judge = %event.judge_name,
            applicant = %event.applicant_name,
            status = %event.status,
            rating = event.rating,
            version = event.version,
            "vote recorded"
        );
        Ok(event)
    }

    /// Highest version for the pair; ties go to the later timestamp, then the later append.
    pub fn latest(&self, judge: &str, applicant: &str) -> Result<Option<VoteEvent>, LedgerError> {
        let events = self.log.events()?;
        Ok(events
            .into_iter()
            .enumerate()
            .filter(|(_, event)| event.judge_name == judge && event.applicant_name == applicant)
            .max_by_key(|(index, event)| (event.version, event.timestamp, *index))
            .map(|(_, event)| event))
    }

    /// Every judge's latest event for `applicant`, in judge-name order.
    pub fn all_for(&self, applicant: &str) -> Result<Vec<VoteEvent>, LedgerError> {
        Ok(self
            .latest_votes()?
            .into_values()
            .filter(|event| event.applicant_name == applicant)
            .collect())
    }

    /// Snapshot of the latest event for every `(judge, applicant)` pair.
    pub fn latest_votes(&self) -> Result<BTreeMap<VoteKey, VoteEvent>, LedgerError> {
        Ok(latest_per_pair(self.log.events()?))
    }

    pub fn events(&self) -> Result<Vec<VoteEvent>, LedgerError> {
        Ok(self.log.events()?)
    }
}

/// Reduce an append-ordered event list to the latest-vote view.
pub fn latest_per_pair(events: Vec<VoteEvent>) -> BTreeMap<VoteKey, VoteEvent> {
    let mut latest: BTreeMap<VoteKey, VoteEvent> = BTreeMap::new();
    for event in events {
        let key = (event.judge_name.clone(), event.applicant_name.clone());
        let supersedes = latest.get(&key).map_or(true, |current| {
            (event.version, event.timestamp) >= (current.version, current.timestamp)
        });
        if supersedes {
            latest.insert(key, event);
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::voting::domain::VoteStatus;
    use chrono::NaiveDate;

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 3)
            .and_then(|date| date.and_hms_opt(hour, minute, 0))
            .expect("valid timestamp")
    }

    fn vote(judge: &str, applicant: &str, status: &str, rating: i64, comment: &str) -> VoteSubmission {
        VoteSubmission {
            judge_name: judge.to_string(),
            applicant_name: applicant.to_string(),
            status: status.to_string(),
            rating,
            comment: Some(comment.to_string()),
        }
    }

    fn event(judge: &str, version: u32, timestamp: NaiveDateTime, rating: u8) -> VoteEvent {
        VoteEvent {
            timestamp,
            judge_name: judge.to_string(),
            applicant_name: "Bob".to_string(),
            status: VoteStatus::Maybe,
            rating,
            comment: None,
            original_status: None,
            original_rating: None,
            version,
        }
    }

    #[test]
    fn revision_chains_onto_prior_latest_vote() {
        let ledger = VoteLedger::new(InMemoryVoteLog::new());
        ledger
            .record_at(&vote("Alice", "Bob", "Approve", 4, ""), at(9, 0))
            .expect("first vote");
        ledger
            .record_at(&vote("Alice", "Bob", "Reject", 2, "changed"), at(9, 5))
            .expect("revision");

        let latest = ledger.latest("Alice", "Bob").expect("reads").expect("vote");
        assert_eq!(latest.version, 2);
        assert_eq!(latest.status, VoteStatus::Reject);
        assert_eq!(latest.original_status, Some(VoteStatus::Approve));
        assert_eq!(latest.original_rating, Some(4));
        assert_eq!(latest.comment.as_deref(), Some("changed"));
    }

    #[test]
    fn every_revision_appends_and_versions_increase() {
        let ledger = VoteLedger::new(InMemoryVoteLog::new());
        let mut previous: Option<VoteEvent> = None;
        for (step, (status, rating)) in [("Maybe", 3), ("Approve", 5), ("Reject", 1), ("Maybe", 2)]
            .into_iter()
            .enumerate()
        {
            let event = ledger
                .record_at(&vote("Carol", "Dana", status, rating, ""), at(10, step as u32))
                .expect("records");
            assert_eq!(event.version as usize, step + 1);
            assert_eq!(ledger.events().expect("reads").len(), step + 1);
            assert_eq!(event.original_status, previous.as_ref().map(|p| p.status));
            assert_eq!(event.original_rating, previous.as_ref().map(|p| p.rating));
            previous = Some(event);
        }
    }

    #[test]
    fn invalid_votes_leave_the_log_untouched() {
        let ledger = VoteLedger::new(InMemoryVoteLog::new());
        let err = ledger
            .record_at(&vote("Alice", "Bob", "Approve", 6, ""), at(9, 0))
            .expect_err("rating out of range");
        assert!(matches!(
            err,
            LedgerError::Invalid(InvalidVoteError::RatingOutOfRange(6))
        ));
        assert!(ledger
            .record_at(&vote("Alice", "Bob", "Veto", 3, ""), at(9, 0))
            .is_err());
        assert!(ledger.events().expect("reads").is_empty());
    }

    #[test]
    fn latest_breaks_ties_by_timestamp_then_append_order() {
        let log = InMemoryVoteLog::new();
        log.append(&event("Alice", 2, at(9, 10), 1)).expect("append");
        log.append(&event("Alice", 2, at(9, 5), 2)).expect("append");
        log.append(&event("Alice", 1, at(11, 0), 3)).expect("append");
        let ledger = VoteLedger::new(log);
        assert_eq!(ledger.latest("Alice", "Bob").expect("reads").expect("vote").rating, 1);

        ledger
            .log()
            .append(&event("Alice", 2, at(9, 10), 4))
            .expect("append");
        assert_eq!(ledger.latest("Alice", "Bob").expect("reads").expect("vote").rating, 4);

        let snapshot = ledger.latest_votes().expect("reads");
        assert_eq!(snapshot[&("Alice".to_string(), "Bob".to_string())].rating, 4);
    }

    #[test]
    fn all_for_returns_one_latest_vote_per_judge_in_name_order() {
        let ledger = VoteLedger::new(InMemoryVoteLog::new());
        ledger.record_at(&vote("Zed", "Bob", "Approve", 5, ""), at(9, 0)).expect("vote");
        ledger.record_at(&vote("Amy", "Bob", "Maybe", 3, ""), at(9, 1)).expect("vote");
        ledger.record_at(&vote("Amy", "Bob", "Approve", 4, ""), at(9, 2)).expect("vote");
        ledger.record_at(&vote("Amy", "Cy", "Reject", 1, ""), at(9, 3)).expect("vote");

        let votes = ledger.all_for("Bob").expect("reads");
        let judges: Vec<&str> = votes.iter().map(|e| e.judge_name.as_str()).collect();
        assert_eq!(judges, vec!["Amy", "Zed"]);
        assert_eq!(votes[0].version, 2);
    }

    #[test]
    fn csv_log_persists_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("votes.csv");

        let ledger = VoteLedger::new(CsvVoteLog::open(&path).expect("opens"));
        assert!(ledger.events().expect("reads").is_empty());
        let header = fs::read_to_string(&path).expect("header written");
        assert_eq!(header.trim_end(), LOG_COLUMNS.join(","));

        ledger
            .record_at(&vote("Alice", "Bob", "Approve", 4, "Strong, clear fit"), at(9, 0))
            .expect("records");
        ledger
            .record_at(&vote("Alice", "Bob", "Reject", 2, ""), at(9, 5))
            .expect("records");

        let reopened = VoteLedger::new(CsvVoteLog::open(&path).expect("reopens"));
        let events = reopened.events().expect("reads");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].comment.as_deref(), Some("Strong, clear fit"));
        assert_eq!(events[0].original_status, None);
        assert_eq!(events[1].version, 2);
        assert_eq!(events[1].original_rating, Some(4));
        assert_eq!(events[1].timestamp, at(9, 5));

        let contents = fs::read_to_string(&path).expect("log");
        assert_eq!(contents.matches("timestamp,").count(), 1);
        assert!(contents.contains("2026-02-03 09:05:00,Alice,Bob,Reject,2,,Approve,4,2"));
    }

    #[test]
    fn csv_log_reads_float_spelled_integers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("votes.csv");
        fs::write(
            &path,
            "timestamp,judge_name,applicant_name,status,rating,comment,original_status,original_rating,vote_version\n\
             2026-02-03 09:00:00,Alice,Bob,Approve,4.0,,,,1.0\n\
             not a timestamp,Alice,Bob,Approve,4,,,,1\n\
             2026-02-03 09:05:00,Alice,Bob,Maybe,3,,Approve,4.0,2\n",
        )
        .expect("seed log");

        let ledger = VoteLedger::new(CsvVoteLog::open(&path).expect("opens"));
        let events = ledger.events().expect("reads");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].rating, 4);
        assert_eq!(events[0].version, 1);
        assert_eq!(events[1].original_rating, Some(4));

        let next = ledger
            .record_at(&vote("Alice", "Bob", "Approve", 5, ""), at(9, 10))
            .expect("records");
        assert_eq!(next.version, 3);
        assert_eq!(next.original_status, Some(VoteStatus::Maybe));
    }
}
