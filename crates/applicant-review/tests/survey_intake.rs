use std::fs;
use std::io::Cursor;

use applicant_review::workflows::intake::{
    applicant_workbook, normalize_response, parse_rows, MalformedExportError, Question,
    SurveyImporter, SurveySummary,
};
use applicant_review::workflows::workbook::{publish, CsvWorkbookWriter};
use chrono::{NaiveDate, NaiveDateTime};

fn utf16le(text: &str) -> Vec<u8> {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

fn generated_at() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, 1)
        .and_then(|date| date.and_hms_opt(8, 0, 0))
        .expect("valid timestamp")
}

/// Builds an export with the lab in column 19, as the survey tool lays it out.
fn export_text() -> String {
    let mut ids: Vec<String> = vec![
        "StartDate", "Source", "Q3", "Q24", "Q25_1", "Q25_2", "Q40", "Q33", "Q_hidden",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    let mut texts: Vec<String> = vec![
        "Start Date",
        "Source",
        "Full name",
        "Experience level",
        "Familiarity with AI",
        "Familiarity with design",
        "Internal notes",
        "Biggest challenges",
        "",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    while ids.len() < 20 {
        ids.push(format!("Extra{}", ids.len()));
        texts.push(String::new());
    }
    ids[19] = "Q19_lab".to_string();
    texts[19] = "Lab".to_string();

    let data = |cells: &[&str], lab: &str| {
        let mut row: Vec<String> = cells.iter().map(|cell| cell.to_string()).collect();
        row.resize(19, String::new());
        row.push(lab.to_string());
        row.join("\t")
    };

    let mut lines = vec![
        ids.join("\t"),
        texts.join("\t"),
        "{\"ImportId\":\"startDate\"}".to_string(),
        data(
            &["2026-01-05", "anonymous", "Jane Doe", "Intermediate (5-10 years)", "3", "", "secret", "Hiring \u{2014} and \u{201c}funding\u{201d}"],
            "Robotics",
        ),
        data(&["2026-01-06", "anonymous", "   "], "Robotics"),
        data(&["2026-01-07", "anonymous", "Omar Haddad", "", "5", "2"], ""),
    ];
    lines.push(String::new());
    lines.join("\n")
}

#[test]
fn utf16_export_becomes_keyed_applicant_records() {
    let dataset = SurveyImporter::from_reader(Cursor::new(utf16le(&export_text())))
        .expect("export parses");

    let ids: Vec<&str> = dataset.questions().iter().map(|q| q.id.as_str()).collect();
    assert!(ids.starts_with(&["Q3", "Q24", "Q25_1", "Q25_2", "Q33"]));
    assert!(!ids.contains(&"Q40"));
    assert!(!ids.contains(&"Q_hidden"));
    assert!(!ids.contains(&"Source"));

    assert_eq!(dataset.applicant_names(), vec!["Jane Doe", "Omar Haddad"]);
    assert_eq!(
        dataset.answer("Jane Doe", "Q25_1"),
        Some("Moderately familiar")
    );
    assert_eq!(dataset.answer("Jane Doe", "Q25_2"), Some("[No response]"));
    assert_eq!(
        dataset.answer("Jane Doe", "Q33"),
        Some("Hiring - and \"funding\"")
    );
    assert_eq!(dataset.answer("Omar Haddad", "Q33"), Some("[No response]"));

    for record in dataset.applicants() {
        assert_eq!(record.responses().len(), dataset.questions().len());
    }

    assert_eq!(dataset.lab_of("Jane Doe"), Some("Robotics"));
    assert_eq!(dataset.lab_of("Omar Haddad"), Some("Unknown"));
}

#[test]
fn summary_and_workbook_are_generated_from_the_dataset() {
    let dataset = SurveyImporter::from_reader(Cursor::new(utf16le(&export_text())))
        .expect("export parses");

    let summary = SurveySummary::build(&dataset, generated_at());
    assert_eq!(summary.total_applicants, 2);
    assert_eq!(summary.familiarity.len(), 2);
    assert!((summary.familiarity[0].average - 4.0).abs() < f64::EPSILON);

    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("applicant_report");
    let workbook = applicant_workbook(&dataset, generated_at());
    let written = publish(&CsvWorkbookWriter, &workbook, &target).expect("workbook written");
    assert_eq!(written, target);

    let summary_sheet = fs::read_to_string(target.join("01_Summary.csv")).expect("summary sheet");
    assert!(summary_sheet.contains("Total Applicants,2"));
    assert!(summary_sheet.contains("Robotics,1,Jane Doe"));
    let jane = fs::read_to_string(target.join("02_Jane Doe.csv")).expect("applicant sheet");
    assert!(jane.starts_with("Question,Response\n"));
    assert!(jane.contains("Familiarity with AI,Moderately familiar"));
    assert!(target.join("03_Omar Haddad.csv").exists());
}

#[test]
fn structural_problems_are_fatal() {
    let too_short: Vec<Vec<&str>> = vec![vec!["Q3"], vec!["Name"], vec![]];
    assert_eq!(
        parse_rows(&too_short).expect_err("needs data rows"),
        MalformedExportError::TooFewRows { found: 3 }
    );

    let no_questions: Vec<Vec<&str>> = vec![
        vec!["StartDate", "Q_meta"],
        vec!["Start", "Meta"],
        vec![],
        vec!["2026-01-01", "x"],
    ];
    assert_eq!(
        parse_rows(&no_questions).expect_err("no question block"),
        MalformedExportError::MissingQuestionColumns
    );
}

#[test]
fn normalization_is_idempotent_on_sample_answers() {
    let question = Question {
        id: "Q33".to_string(),
        text: "Biggest challenges".to_string(),
        column_index: 7,
    };
    for raw in [
        "  Budget\u{2026} and time\r\nmostly ",
        "\u{2018}quoted\u{2019}\tanswer",
        "emoji \u{1F680} only",
        "\u{1F680}",
        "",
    ] {
        let once = normalize_response(raw, &question);
        assert_eq!(normalize_response(&once, &question), once, "input {raw:?}");
    }
}
