use chrono::NaiveDateTime;

use super::domain::SurveyDataset;
use super::mapping::EXPERIENCE_LEVELS;
use super::summary::SurveySummary;
use super::themes::{CategoryCount, ThemeCount};
use crate::workflows::workbook::Workbook;

const SUMMARY_SHEET: &str = "Summary";
const SHORT_LEVELS: &[&str] = &["Entry", "Novice", "Intermediate", "Advanced", "Expert"];

/// Summary sheet followed by one Question/Response sheet per applicant, sorted by name.
pub fn applicant_workbook(dataset: &SurveyDataset, generated_at: NaiveDateTime) -> Workbook {
    let summary = SurveySummary::build(dataset, generated_at);
    let mut workbook = Workbook::new();
    workbook.add_sheet(SUMMARY_SHEET, summary_rows(&summary));

    for record in dataset.applicants() {
        let mut rows = vec![cells(&["Question", "Response"])];
        rows.extend(
            record
                .responses()
                .iter()
                .map(|response| vec![response.question.clone(), response.answer.clone()]),
        );
        workbook.add_sheet(&record.name, rows);
    }

    workbook
}

pub fn summary_rows(summary: &SurveySummary) -> Vec<Vec<String>> {
    let mut rows = vec![
        cells(&["Metric", "Value"]),
        vec!["Total Applicants".into(), summary.total_applicants.to_string()],
        vec!["Total Questions".into(), summary.total_questions.to_string()],
        vec![
            "Report Generated".into(),
            summary.generated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ],
        Vec::new(),
    ];

    section(&mut rows, "Unit/Lab Participation Breakdown");
    rows.push(cells(&["Lab/Unit", "Count", "Applicants"]));
    for lab in &summary.lab_participation {
        rows.push(vec![
            lab.lab.clone(),
            lab.count.to_string(),
            lab.applicants.join(", "),
        ]);
    }

    section(&mut rows, "Experience Level Distribution");
    if let Some(levels) = &summary.experience_distribution {
        rows.push(cells(&["Experience Level", "Count"]));
        for level in levels {
            rows.push(vec![level.level.to_string(), level.count.to_string()]);
        }
    }

    section(&mut rows, "Familiarity Ratings Analysis");
    for entry in &summary.familiarity {
        let label: String = entry.question.chars().take(60).collect();
        rows.push(vec![format!("{label} (Avg: {:.2}/5)", entry.average)]);
    }

    section(&mut rows, "Experience by Lab (Cross-Tab)");
    if let Some(cross_tab) = &summary.experience_by_lab {
        let mut header = vec!["Lab".to_string()];
        header.extend(SHORT_LEVELS.iter().map(|level| level.to_string()));
        debug_assert_eq!(SHORT_LEVELS.len(), EXPERIENCE_LEVELS.len());
        rows.push(header);
        for row in cross_tab {
            let mut line = vec![row.lab.clone()];
            line.extend(row.counts.iter().map(usize::to_string));
            rows.push(line);
        }
    }

    section(&mut rows, "Workshop Attendance");
    if let Some(attendance) = summary.workshop_attendance {
        rows.push(cells(&["Attendance Type", "Count"]));
        rows.push(vec!["Can attend all".into(), attendance.can_attend_all.to_string()]);
        rows.push(vec!["Has conflicts".into(), attendance.has_conflicts.to_string()]);
    }

    section(&mut rows, "Qualitative Analysis: Themes & Patterns");
    theme_block(&mut rows, "Common Challenges (from Q33)", summary.challenges.as_deref());
    theme_block(&mut rows, "Top Motivations/Goals (from Q21)", summary.motivations.as_deref());
    theme_block(&mut rows, "Key Strengths Cited (from Q18)", summary.strengths.as_deref());

    section(&mut rows, "Capability Inventory");
    rows.push(cells(&["Expertise Areas (from Q22)"]));
    if let Some(expertise) = &summary.expertise {
        category_lines(&mut rows, expertise, "  • No expertise areas identified");
    }
    rows.push(Vec::new());

    rows.push(cells(&["Military/Leadership Experience"]));
    if summary.military_leadership.is_empty() {
        rows.push(cells(&["  • None identified"]));
    }
    for name in &summary.military_leadership {
        rows.push(vec![format!("  • {name}")]);
    }
    rows.push(Vec::new());

    rows.push(cells(&["Research Focus Areas"]));
    category_lines(&mut rows, &summary.research_focus, "  • No research focus identified");

    rows
}

fn section(rows: &mut Vec<Vec<String>>, title: &str) {
    if rows.last().is_some_and(|row| !row.is_empty()) {
        rows.push(Vec::new());
    }
    rows.push(vec![title.to_string()]);
}

fn theme_block(rows: &mut Vec<Vec<String>>, title: &str, themes: Option<&[ThemeCount]>) {
    rows.push(vec![title.to_string()]);
    if let Some(themes) = themes {
        if themes.is_empty() {
            rows.push(cells(&["  • No themes extracted"]));
        }
        for theme in themes {
            rows.push(vec![format!("  • {} ({}x)", capitalize(&theme.theme), theme.count)]);
        }
    }
    rows.push(Vec::new());
}

fn category_lines(rows: &mut Vec<Vec<String>>, categories: &[CategoryCount], empty: &str) {
    if categories.is_empty() {
        rows.push(vec![empty.to_string()]);
    }
    for entry in categories {
        rows.push(vec![format!("  • {}: {} applicant(s)", entry.category, entry.count)]);
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn cells(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::intake::parse_rows;
    use chrono::NaiveDate;

    fn generated_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 1, 15)
            .and_then(|date| date.and_hms_opt(9, 30, 0))
            .expect("valid timestamp")
    }

    #[test]
    fn workbook_has_summary_and_one_sheet_per_applicant() {
        let rows: Vec<Vec<&str>> = vec![
            vec!["Q3", "Q25_1", "Q33"],
            vec!["Name", "Familiarity", "Challenges"],
            vec![],
            vec!["Grace: Hopper", "2", "Compilers compilers"],
            vec!["Ada", "", ""],
        ];
        let dataset = parse_rows(&rows).expect("parses");

        let workbook = applicant_workbook(&dataset, generated_at());
        let names: Vec<&str> = workbook.sheets().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Summary", "Ada", "Grace Hopper"]);

        let grace = workbook.sheet("Grace Hopper").expect("applicant sheet");
        assert_eq!(grace.rows[0], vec!["Question", "Response"]);
        assert_eq!(grace.rows[2], vec!["Familiarity", "Slightly familiar"]);

        let summary = workbook.sheet("Summary").expect("summary sheet");
        assert_eq!(summary.rows[1], vec!["Total Applicants", "2"]);
        assert_eq!(summary.rows[3], vec!["Report Generated", "2026-01-15 09:30:00"]);
        let flat: Vec<String> = summary.rows.iter().flatten().cloned().collect();
        assert!(flat.contains(&"Familiarity (Avg: 2.00/5)".to_string()));
        assert!(flat.contains(&"  • Compilers (2x)".to_string()));
    }
}
