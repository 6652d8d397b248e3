use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;

/// A retained survey question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    pub column_index: usize,
}

/// One normalized answer inside an applicant record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Response {
    pub question: String,
    pub answer: String,
}

/// Every retained question's answer for one applicant, in question order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicantRecord {
    pub name: String,
    responses: Vec<Response>,
}

impl ApplicantRecord {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            responses: Vec::new(),
        }
    }

    /// Keyed by question text: a repeated text keeps its first position and takes the new answer.
    pub(crate) fn insert(&mut self, question: &str, answer: String) {
        match self
            .responses
            .iter_mut()
            .find(|response| response.question == question)
        {
            Some(existing) => existing.answer = answer,
            None => self.responses.push(Response {
                question: question.to_string(),
                answer,
            }),
        }
    }

    pub fn answer(&self, question_text: &str) -> Option<&str> {
        self.responses
            .iter()
            .find(|response| response.question == question_text)
            .map(|response| response.answer.as_str())
    }

    pub fn responses(&self) -> &[Response] {
        &self.responses
    }
}

/// Unit/lab name to the applicants attributed to it.
pub type LabGrouping = BTreeMap<String, BTreeSet<String>>;

/// Result of one parse run. Read-only once built; a re-parse replaces it wholesale.
#[derive(Debug, Clone, Default)]
pub struct SurveyDataset {
    questions: Vec<Question>,
    question_index: HashMap<String, usize>,
    applicants: BTreeMap<String, ApplicantRecord>,
    labs: LabGrouping,
}

impl SurveyDataset {
    pub(crate) fn new(
        questions: Vec<Question>,
        applicants: BTreeMap<String, ApplicantRecord>,
        labs: LabGrouping,
    ) -> Self {
        let mut question_index = HashMap::with_capacity(questions.len());
        for (position, question) in questions.iter().enumerate() {
            question_index.entry(question.id.clone()).or_insert(position);
        }

        Self {
            questions,
            question_index,
            applicants,
            labs,
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn question(&self, id: &str) -> Option<&Question> {
        self.question_index
            .get(id)
            .map(|position| &self.questions[*position])
    }

    /// Applicants sorted by name.
    pub fn applicants(&self) -> impl Iterator<Item = &ApplicantRecord> {
        self.applicants.values()
    }

    pub fn applicant(&self, name: &str) -> Option<&ApplicantRecord> {
        self.applicants.get(name)
    }

    pub fn applicant_names(&self) -> Vec<String> {
        self.applicants.keys().cloned().collect()
    }

    pub fn applicant_count(&self) -> usize {
        self.applicants.len()
    }

    pub fn labs(&self) -> &LabGrouping {
        &self.labs
    }

    pub fn lab_of(&self, applicant: &str) -> Option<&str> {
        self.labs
            .iter()
            .find(|(_, members)| members.contains(applicant))
            .map(|(lab, _)| lab.as_str())
    }

    /// Answer to the question with `question_id`, if both exist.
    pub fn answer(&self, applicant: &str, question_id: &str) -> Option<&str> {
        let question = self.question(question_id)?;
        self.applicant(applicant)?.answer(&question.text)
    }
}
