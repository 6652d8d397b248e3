use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use super::domain::{ApplicantRecord, LabGrouping, Question, SurveyDataset};
use super::mapping::{EXCLUDED_QUESTION_IDS, LAB_COLUMN, UNKNOWN_LAB};
use super::normalizer::normalize_response;

const ID_ROW: usize = 0;
const TEXT_ROW: usize = 1;
const FIRST_DATA_ROW: usize = 3;

/// Structural problems that make an export unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedExportError {
    #[error("export has {found} rows; expected three header rows and at least one response")]
    TooFewRows { found: usize },
    #[error("no question column (Q<number>) found in the identifier row")]
    MissingQuestionColumns,
    #[error("question block starting at column {start} has no question text")]
    NoRetainedQuestions { start: usize },
}

/// Rebuild per-applicant records from the raw rows of a survey export.
///
/// Row 0 carries question identifiers, row 1 question text, row 2 import
/// metadata (ignored); every later row is one response.
pub fn parse_rows<R: AsRef<str>>(rows: &[Vec<R>]) -> Result<SurveyDataset, MalformedExportError> {
    if rows.len() < FIRST_DATA_ROW + 1 {
        return Err(MalformedExportError::TooFewRows { found: rows.len() });
    }

    let ids = &rows[ID_ROW];
    let texts = &rows[TEXT_ROW];

    let start = ids
        .iter()
        .position(|id| is_question_id(clean_id(id.as_ref())))
        .ok_or(MalformedExportError::MissingQuestionColumns)?;

    let questions = retained_questions(ids, texts, start);
    let name_column = questions
        .first()
        .map(|question| question.column_index)
        .ok_or(MalformedExportError::NoRetainedQuestions { start })?;

    let mut applicants: BTreeMap<String, ApplicantRecord> = BTreeMap::new();
    let mut lab_by_applicant: HashMap<String, String> = HashMap::new();

    for (offset, row) in rows[FIRST_DATA_ROW..].iter().enumerate() {
        let line = FIRST_DATA_ROW + offset + 1;
        let name = cell(row, name_column).trim();
        if name.is_empty() {
            debug!(line, "skipping response without an applicant name");
            continue;
        }

        let mut record = ApplicantRecord::new(name.to_string());
        for question in &questions {
            let answer = normalize_response(cell(row, question.column_index), question);
            record.insert(&question.text, answer);
        }

        let lab = match cell(row, LAB_COLUMN).trim() {
            "" => UNKNOWN_LAB,
            lab => lab,
        };
        lab_by_applicant.insert(name.to_string(), lab.to_string());

        if applicants.insert(name.to_string(), record).is_some() {
            warn!(line, applicant = name, "duplicate applicant name; keeping the later response");
        }
    }

    let mut labs = LabGrouping::new();
    for (applicant, lab) in lab_by_applicant {
        labs.entry(lab).or_default().insert(applicant);
    }

    Ok(SurveyDataset::new(questions, applicants, labs))
}

fn retained_questions<R: AsRef<str>>(ids: &[R], texts: &[R], start: usize) -> Vec<Question> {
    (start..texts.len())
        .filter_map(|column| {
            let id = clean_id(ids.get(column).map(|id| id.as_ref()).unwrap_or_default());
            let text = texts[column].as_ref().trim();
            if EXCLUDED_QUESTION_IDS.contains(&id) || text.is_empty() {
                return None;
            }

            Some(Question {
                id: id.to_string(),
                text: text.to_string(),
                column_index: column,
            })
        })
        .collect()
}

/// `Q` followed by a digit; rules out `Q_RecaptchaScore` style metadata.
fn is_question_id(id: &str) -> bool {
    let mut chars = id.chars();
    chars.next() == Some('Q') && chars.next().is_some_and(|ch| ch.is_ascii_digit())
}

fn clean_id(id: &str) -> &str {
    id.trim_start_matches('\u{feff}').trim()
}

/// Ragged rows read missing trailing cells as blank.
fn cell<R: AsRef<str>>(row: &[R], column: usize) -> &str {
    row.get(column).map(|value| value.as_ref()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::intake::mapping::NO_RESPONSE;

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    fn header() -> Vec<Vec<String>> {
        rows(&[
            &["StartDate", "Q_RecaptchaScore", "Q3", "Source", "Q4", "Q40", "Q25_1", "Q99"],
            &["Start", "Recaptcha", "Full name", "Source", "Which unit?", "Supervisor email", "Familiarity with AI", "  "],
            &["{\"ImportId\":\"startDate\"}", "", "", "", "", "", "", ""],
        ])
    }

    #[test]
    fn too_few_rows_is_malformed() {
        let only_headers = header();
        assert_eq!(
            parse_rows(&only_headers).unwrap_err(),
            MalformedExportError::TooFewRows { found: 3 }
        );
    }

    #[test]
    fn missing_question_marker_is_malformed() {
        let data = rows(&[
            &["StartDate", "Q_Lang", "QID"],
            &["Start", "Language", "Something"],
            &["", "", ""],
            &["2025-01-01", "EN", "x"],
        ]);
        assert_eq!(
            parse_rows(&data).unwrap_err(),
            MalformedExportError::MissingQuestionColumns
        );
    }

    #[test]
    fn question_block_without_text_is_malformed() {
        let data = rows(&[&["Q3", "Q4"], &["", " "], &["", ""], &["Jane", "Unit"]]);
        assert_eq!(
            parse_rows(&data).unwrap_err(),
            MalformedExportError::NoRetainedQuestions { start: 0 }
        );
    }

    #[test]
    fn filters_metadata_and_blank_question_columns() {
        let mut data = header();
        data.extend(rows(&[&["x", "0.9", "Jane Doe", "anonymous", "Unit A", "boss@example.com", "4", "ignored"]]));

        let dataset = parse_rows(&data).expect("parses");
        let ids: Vec<&str> = dataset.questions().iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["Q3", "Q4", "Q25_1"]);
        assert_eq!(dataset.question("Q25_1").expect("indexed").column_index, 6);
        assert!(dataset.question("Q40").is_none());

        let jane = dataset.applicant("Jane Doe").expect("record");
        assert_eq!(jane.responses().len(), 3);
        assert_eq!(jane.answer("Familiarity with AI"), Some("Very familiar"));
        assert_eq!(jane.answer("Supervisor email"), None);
    }

    #[test]
    fn ragged_rows_and_blank_names() {
        let mut data = header();
        data.extend(rows(&[
            &["x", "", "  Ada Lovelace  ", "", "Unit B"],
            &["x", "", "   ", "", "Unit C", "", "2"],
            &["x"],
            &["x", "", "Grace Hopper", "", "", "", "", "", "", ""],
        ]));

        let dataset = parse_rows(&data).expect("parses");
        assert_eq!(dataset.applicant_count(), 2);

        let ada = dataset.applicant("Ada Lovelace").expect("trimmed name");
        assert_eq!(ada.answer("Which unit?"), Some("Unit B"));
        assert_eq!(ada.answer("Familiarity with AI"), Some(NO_RESPONSE));

        for record in dataset.applicants() {
            assert_eq!(record.responses().len(), dataset.questions().len());
        }
    }

    #[test]
    fn duplicate_names_keep_the_last_response() {
        let mut data = header();
        data.extend(rows(&[
            &["x", "", "Jane Doe", "", "Unit A", "", "1"],
            &["x", "", "Jane Doe", "", "Unit A", "", "5"],
        ]));

        let dataset = parse_rows(&data).expect("parses");
        assert_eq!(dataset.applicant_count(), 1);
        assert_eq!(
            dataset.answer("Jane Doe", "Q25_1"),
            Some("Extremely familiar")
        );
    }

    #[test]
    fn labs_come_from_the_fixed_column() {
        let mut ids: Vec<String> = (0..20).map(|i| format!("Meta{i}")).collect();
        ids[2] = "Q3".to_string();
        ids[LAB_COLUMN] = "Q4".to_string();
        let mut texts: Vec<String> = vec![String::new(); 20];
        texts[2] = "Name".to_string();
        texts[LAB_COLUMN] = "Unit".to_string();

        let mut with_lab = vec![String::new(); 20];
        with_lab[2] = "Ada".to_string();
        with_lab[LAB_COLUMN] = " Robotics Lab ".to_string();
        let mut without_lab = vec![String::new(); 3];
        without_lab[2] = "Grace".to_string();

        let data = vec![ids, texts, vec![], with_lab, without_lab];
        let dataset = parse_rows(&data).expect("parses");

        let robotics = dataset.labs().get("Robotics Lab").expect("lab bucket");
        assert!(robotics.contains("Ada"));
        let unknown = dataset.labs().get(UNKNOWN_LAB).expect("unknown bucket");
        assert!(unknown.contains("Grace"));
        assert_eq!(dataset.lab_of("Grace"), Some(UNKNOWN_LAB));
    }

    #[test]
    fn familiarity_scenario_maps_scale_labels() {
        let data = rows(&[
            &["Q3", "Q4", "Q25_1"],
            &["Name", "Unit", "Familiarity"],
            &["", "", ""],
            &["Jane Doe", "Unit A", "3"],
        ]);

        let dataset = parse_rows(&data).expect("parses");
        let jane = dataset.applicant("Jane Doe").expect("record");
        assert_eq!(jane.answer("Familiarity"), Some("Moderately familiar"));
    }

    #[test]
    fn byte_order_mark_on_identifiers_is_ignored() {
        let data = rows(&[
            &["\u{feff}Q3", "Q4"],
            &["Name", "Unit"],
            &["", ""],
            &["Jane", "Unit A"],
        ]);
        let dataset = parse_rows(&data).expect("parses");
        assert_eq!(dataset.questions()[0].id, "Q3");
    }
}
