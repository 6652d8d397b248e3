use std::collections::BTreeMap;

use serde::Serialize;

use super::domain::{VoteEvent, VoteStatus};
use super::ledger::{LedgerError, VoteKey, VoteLedger, VoteLog};

/// Vote rollup for one applicant over the latest-vote view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApplicantTally {
    pub applicant: String,
    pub approve_count: usize,
    pub reject_count: usize,
    pub maybe_count: usize,
    pub average_rating: Option<f64>,
    pub total_votes: usize,
}

impl ApplicantTally {
    /// Two decimals, or `N/A` when nobody has voted.
    pub fn average_label(&self) -> String {
        match self.average_rating {
            Some(average) => format!("{average:.2}"),
            None => "N/A".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JudgeTally {
    pub judge: String,
    pub votes_cast: usize,
    pub approve_count: usize,
    pub reject_count: usize,
    pub maybe_count: usize,
}

/// Stateless rollups; every call reads a fresh latest-vote snapshot.
pub struct AggregationEngine<'a, L> {
    ledger: &'a VoteLedger<L>,
}

impl<'a, L: VoteLog> AggregationEngine<'a, L> {
    pub fn new(ledger: &'a VoteLedger<L>) -> Self {
        Self { ledger }
    }

    pub fn summarize_by_applicant<S: AsRef<str>>(
        &self,
        applicants: &[S],
    ) -> Result<Vec<ApplicantTally>, LedgerError> {
        Ok(tally_applicants(&self.ledger.latest_votes()?, applicants))
    }

    pub fn summarize_by_judge(&self) -> Result<Vec<JudgeTally>, LedgerError> {
        Ok(tally_judges(&self.ledger.latest_votes()?))
    }
}

/// One tally per requested name, in request order, including names nobody voted on.
pub fn tally_applicants<S: AsRef<str>>(
    latest: &BTreeMap<VoteKey, VoteEvent>,
    applicants: &[S],
) -> Vec<ApplicantTally> {
    applicants
        .iter()
        .map(|name| {
            let name = name.as_ref();
            let votes: Vec<&VoteEvent> = latest
                .values()
                .filter(|event| event.applicant_name == name)
                .collect();
            let total: u32 = votes.iter().map(|event| u32::from(event.rating)).sum();

            ApplicantTally {
                applicant: name.to_string(),
                approve_count: count_status(&votes, VoteStatus::Approve),
                reject_count: count_status(&votes, VoteStatus::Reject),
                maybe_count: count_status(&votes, VoteStatus::Maybe),
                average_rating: (!votes.is_empty())
                    .then(|| f64::from(total) / votes.len() as f64),
                total_votes: votes.len(),
            }
        })
        .collect()
}

/// Judges with at least one vote, in name order.
pub fn tally_judges(latest: &BTreeMap<VoteKey, VoteEvent>) -> Vec<JudgeTally> {
    let mut by_judge: BTreeMap<&str, Vec<&VoteEvent>> = BTreeMap::new();
    for event in latest.values() {
        by_judge.entry(event.judge_name.as_str()).or_default().push(event);
    }

    by_judge
        .into_iter()
        .map(|(judge, votes)| JudgeTally {
            judge: judge.to_string(),
            votes_cast: votes.len(),
            approve_count: count_status(&votes, VoteStatus::Approve),
            reject_count: count_status(&votes, VoteStatus::Reject),
            maybe_count: count_status(&votes, VoteStatus::Maybe),
        })
        .collect()
}

fn count_status(votes: &[&VoteEvent], status: VoteStatus) -> usize {
    votes.iter().filter(|event| event.status == status).count()
}
