use chrono::NaiveDateTime;
use serde::Serialize;

use super::domain::SurveyDataset;
use super::mapping::{
    scale_score, BACKGROUND_QUESTION, CHALLENGES_QUESTION, EXPERIENCE_LEVELS,
    EXPERIENCE_QUESTION, FAMILIARITY_QUESTIONS, MOTIVATION_QUESTION, NO_RESPONSE,
    SELECTION_QUESTION, WORKSHOP_QUESTION,
};
use super::themes::{self, CategoryCount, ThemeCount};

#[derive(Debug, Clone, Serialize)]
pub struct LabParticipation {
    pub lab: String,
    pub count: usize,
    pub applicants: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelCount {
    pub level: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FamiliarityAverage {
    pub question: String,
    pub average: f64,
    pub responses: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LabExperienceRow {
    pub lab: String,
    /// Aligned with [`EXPERIENCE_LEVELS`].
    pub counts: Vec<usize>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct WorkshopAttendance {
    pub can_attend_all: usize,
    pub has_conflicts: usize,
}

/// Derived breakdowns shown on the workbook's summary sheet.
///
/// Sections tied to a question the export does not contain are `None`.
#[derive(Debug, Clone, Serialize)]
pub struct SurveySummary {
    pub generated_at: NaiveDateTime,
    pub total_applicants: usize,
    pub total_questions: usize,
    pub lab_participation: Vec<LabParticipation>,
    pub experience_distribution: Option<Vec<LevelCount>>,
    pub familiarity: Vec<FamiliarityAverage>,
    pub experience_by_lab: Option<Vec<LabExperienceRow>>,
    pub workshop_attendance: Option<WorkshopAttendance>,
    pub challenges: Option<Vec<ThemeCount>>,
    pub motivations: Option<Vec<ThemeCount>>,
    pub strengths: Option<Vec<ThemeCount>>,
    pub expertise: Option<Vec<CategoryCount>>,
    pub military_leadership: Vec<String>,
    pub research_focus: Vec<CategoryCount>,
}

impl SurveySummary {
    pub fn build(dataset: &SurveyDataset, generated_at: NaiveDateTime) -> Self {
        let experience_distribution = experience_distribution(dataset);
        let experience_by_lab = experience_distribution
            .as_ref()
            .map(|_| experience_by_lab(dataset));

        Self {
            generated_at,
            total_applicants: dataset.applicant_count(),
            total_questions: dataset.questions().len(),
            lab_participation: lab_participation(dataset),
            experience_distribution,
            familiarity: familiarity(dataset),
            experience_by_lab,
            workshop_attendance: workshop_attendance(dataset),
            challenges: themes_for(dataset, CHALLENGES_QUESTION, 5),
            motivations: themes_for(dataset, MOTIVATION_QUESTION, 5),
            strengths: themes_for(dataset, SELECTION_QUESTION, 6),
            expertise: dataset.question(BACKGROUND_QUESTION).map(|_| {
                themes::expertise_areas(answered(dataset, BACKGROUND_QUESTION))
            }),
            military_leadership: military_leadership(dataset),
            research_focus: research_focus(dataset),
        }
    }
}

fn lab_participation(dataset: &SurveyDataset) -> Vec<LabParticipation> {
    let mut labs: Vec<LabParticipation> = dataset
        .labs()
        .iter()
        .map(|(lab, members)| LabParticipation {
            lab: lab.clone(),
            count: members.len(),
            applicants: members.iter().cloned().collect(),
        })
        .collect();
    labs.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.lab.cmp(&b.lab)));
    labs
}

fn experience_distribution(dataset: &SurveyDataset) -> Option<Vec<LevelCount>> {
    dataset.question(EXPERIENCE_QUESTION)?;

    Some(
        EXPERIENCE_LEVELS
            .iter()
            .map(|level| LevelCount {
                level: *level,
                count: dataset
                    .applicants()
                    .filter(|record| {
                        dataset.answer(&record.name, EXPERIENCE_QUESTION) == Some(*level)
                    })
                    .count(),
            })
            .collect(),
    )
}

fn familiarity(dataset: &SurveyDataset) -> Vec<FamiliarityAverage> {
    FAMILIARITY_QUESTIONS
        .iter()
        .filter_map(|id| {
            let question = dataset.question(id)?;
            let scores: Vec<u8> = dataset
                .applicants()
                .filter_map(|record| record.answer(&question.text).and_then(scale_score))
                .collect();
            if scores.is_empty() {
                return None;
            }

            let total: u32 = scores.iter().map(|score| u32::from(*score)).sum();
            Some(FamiliarityAverage {
                question: question.text.clone(),
                average: f64::from(total) / scores.len() as f64,
                responses: scores.len(),
            })
        })
        .collect()
}

fn experience_by_lab(dataset: &SurveyDataset) -> Vec<LabExperienceRow> {
    dataset
        .labs()
        .iter()
        .map(|(lab, members)| LabExperienceRow {
            lab: lab.clone(),
            counts: EXPERIENCE_LEVELS
                .iter()
                .map(|level| {
                    members
                        .iter()
                        .filter(|name| dataset.answer(name, EXPERIENCE_QUESTION) == Some(*level))
                        .count()
                })
                .collect(),
        })
        .collect()
}

/// Blank, `N/A` or unanswered means no conflicts with the workshop dates.
fn workshop_attendance(dataset: &SurveyDataset) -> Option<WorkshopAttendance> {
    let question = dataset.question(WORKSHOP_QUESTION)?;
    let mut attendance = WorkshopAttendance {
        can_attend_all: 0,
        has_conflicts: 0,
    };

    for record in dataset.applicants() {
        let answer = record.answer(&question.text).unwrap_or_default().trim();
        let free = answer.is_empty()
            || answer.eq_ignore_ascii_case("n/a")
            || answer.eq_ignore_ascii_case(NO_RESPONSE);
        if free {
            attendance.can_attend_all += 1;
        } else {
            attendance.has_conflicts += 1;
        }
    }

    Some(attendance)
}

fn themes_for(dataset: &SurveyDataset, question_id: &str, max: usize) -> Option<Vec<ThemeCount>> {
    dataset.question(question_id)?;
    Some(themes::extract_themes(answered(dataset, question_id), max))
}

fn answered<'a>(dataset: &'a SurveyDataset, question_id: &'a str) -> impl Iterator<Item = &'a str> {
    dataset
        .applicants()
        .filter_map(move |record| dataset.answer(&record.name, question_id))
        .filter(|answer| !answer.contains(NO_RESPONSE))
}

/// Background and selection answers joined, one entry per applicant.
fn profile_texts(dataset: &SurveyDataset) -> Vec<(String, String)> {
    dataset
        .applicants()
        .map(|record| {
            let background = dataset
                .answer(&record.name, BACKGROUND_QUESTION)
                .unwrap_or_default();
            let selection = dataset
                .answer(&record.name, SELECTION_QUESTION)
                .unwrap_or_default();
            (record.name.clone(), format!("{background} {selection}"))
        })
        .collect()
}

fn military_leadership(dataset: &SurveyDataset) -> Vec<String> {
    if dataset.question(BACKGROUND_QUESTION).is_none()
        || dataset.question(SELECTION_QUESTION).is_none()
    {
        return Vec::new();
    }

    profile_texts(dataset)
        .into_iter()
        .filter(|(_, text)| themes::mentions_leadership(text))
        .map(|(name, _)| name)
        .collect()
}

fn research_focus(dataset: &SurveyDataset) -> Vec<CategoryCount> {
    let texts = profile_texts(dataset);
    themes::research_focus(texts.iter().map(|(_, text)| text.as_str()))
}
