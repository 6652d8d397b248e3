use std::collections::BTreeMap;

use super::aggregation::{tally_applicants, tally_judges};
use super::domain::{VoteEvent, TIMESTAMP_FORMAT};
use super::ledger::VoteKey;
use crate::workflows::workbook::Workbook;

pub const SUMMARY_SHEET: &str = "Summary";
pub const ALL_VOTES_SHEET: &str = "All Votes";
pub const JUDGE_SUMMARY_SHEET: &str = "Judge Summary";

/// Summary, All Votes and Judge Summary sheets built from the latest-vote view.
pub fn results_workbook<S: AsRef<str>>(
    latest: &BTreeMap<VoteKey, VoteEvent>,
    applicants: &[S],
) -> Workbook {
    let mut workbook = Workbook::new();

    let mut summary = vec![header(&[
        "Applicant",
        "Total Votes",
        "Approve",
        "Reject",
        "Maybe",
        "Avg Rating",
    ])];
    for tally in tally_applicants(latest, applicants) {
        summary.push(vec![
            tally.applicant.clone(),
            tally.total_votes.to_string(),
            tally.approve_count.to_string(),
            tally.reject_count.to_string(),
            tally.maybe_count.to_string(),
            tally.average_label(),
        ]);
    }
    workbook.add_sheet(SUMMARY_SHEET, summary);

    let mut events: Vec<&VoteEvent> = latest.values().collect();
    events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
    let mut votes = vec![header(&[
        "timestamp",
        "judge_name",
        "applicant_name",
        "status",
        "rating",
        "comment",
    ])];
    votes.extend(events.into_iter().map(|event| {
        vec![
            event.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            event.judge_name.clone(),
            event.applicant_name.clone(),
            event.status.label().to_string(),
            event.rating.to_string(),
            event.comment.clone().unwrap_or_default(),
        ]
    }));
    workbook.add_sheet(ALL_VOTES_SHEET, votes);

    let mut judges = vec![header(&["Judge", "Votes Cast", "Approve", "Reject", "Maybe"])];
    judges.extend(tally_judges(latest).into_iter().map(|tally| {
        vec![
            tally.judge,
            tally.votes_cast.to_string(),
            tally.approve_count.to_string(),
            tally.reject_count.to_string(),
            tally.maybe_count.to_string(),
        ]
    }));
    workbook.add_sheet(JUDGE_SUMMARY_SHEET, judges);

    workbook
}

fn header(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|cell| cell.to_string()).collect()
}
