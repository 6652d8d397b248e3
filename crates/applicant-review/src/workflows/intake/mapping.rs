use std::collections::HashMap;
use std::sync::OnceLock;

/// Placeholder stored for every blank answer.
pub const NO_RESPONSE: &str = "[No response]";

/// Bucket for applicants whose unit/lab cell is blank or missing.
pub const UNKNOWN_LAB: &str = "Unknown";

/// Zero-based column holding "Which unit are you part of?" in the export layout.
pub(crate) const LAB_COLUMN: usize = 19;

/// Source and admin metadata inside the question block (Q40 is the supervisor e-mail).
pub(crate) const EXCLUDED_QUESTION_IDS: &[&str] = &["Source", "Q40"];

pub const EXPERIENCE_QUESTION: &str = "Q24";
pub const WORKSHOP_QUESTION: &str = "Q30";
pub const CHALLENGES_QUESTION: &str = "Q33";
pub const MOTIVATION_QUESTION: &str = "Q21";
pub const SELECTION_QUESTION: &str = "Q18";
pub const BACKGROUND_QUESTION: &str = "Q22";

/// Questions answered on the five-point familiarity scale.
pub const FAMILIARITY_QUESTIONS: &[&str] = &["Q25_1", "Q25_2"];

const FAMILIARITY_SCALE: &[(&str, &str)] = &[
    ("1", "Not familiar at all"),
    ("2", "Slightly familiar"),
    ("3", "Moderately familiar"),
    ("4", "Very familiar"),
    ("5", "Extremely familiar"),
];

/// Experience levels in ascending order, as offered by Q24.
pub const EXPERIENCE_LEVELS: &[&str] = &[
    "Entry level (0-2 years)",
    "Novice (2-5 years)",
    "Intermediate (5-10 years)",
    "Advanced (10-15 years)",
    "Expert (15+ years)",
];

pub(crate) fn is_scale_question(question_id: &str) -> bool {
    FAMILIARITY_QUESTIONS.contains(&question_id)
}

pub(crate) fn scale_label(code: &str) -> Option<&'static str> {
    FAMILIARITY_SCALE
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map(|(_, label)| *label)
}

/// Reverse lookup used when averaging already-normalized familiarity answers.
pub(crate) fn scale_score(label: &str) -> Option<u8> {
    scale_scores().get(label).copied()
}

fn scale_scores() -> &'static HashMap<&'static str, u8> {
    static SCORES: OnceLock<HashMap<&'static str, u8>> = OnceLock::new();
    SCORES.get_or_init(|| {
        FAMILIARITY_SCALE
            .iter()
            .enumerate()
            .map(|(index, (_, label))| (*label, index as u8 + 1))
            .collect()
    })
}
