use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use super::mapping::NO_RESPONSE;

const STOP_WORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "is", "are", "be",
    "been", "being", "have", "has", "had", "do", "does", "did", "will", "would", "could",
    "should", "may", "might", "must", "i", "you", "he", "she", "it", "we", "they", "me", "him",
    "her", "us", "them", "this", "that", "these", "those", "my", "your", "his", "its", "our",
    "their", "from", "by", "with", "as", "if", "no", "not", "more", "most", "other", "than",
    "very", "so", "too", "any", "all", "each", "every", "both", "few", "some", "such", "what",
    "which", "who", "whom", "why", "where", "when", "how",
];

const EXPERTISE_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "AI/Machine Learning",
        &["ai", "ml", "machine learning", "artificial intelligence", "deep learning", "neural", "llm"],
    ),
    (
        "Engineering",
        &["engineering", "engineer", "aerospace", "systems", "electrical", "mechanical", "software", "hardware"],
    ),
    (
        "Design (HCD/UX)",
        &["design", "human-centered", "ux", "user experience", "industrial", "hcd"],
    ),
    ("Cybersecurity", &["cybersecurity", "security", "cyber", "encryption"]),
    ("Data Science", &["data", "analytics", "analysis", "database", "statistical"]),
    ("Research", &["research", "researcher"]),
    (
        "Leadership/Management",
        &["manager", "lead", "officer", "director", "management", "leadership"],
    ),
    (
        "Military",
        &["military", "marine", "army", "navy", "air force", "infantry", "commissioned"],
    ),
    ("Policy/Government", &["policy", "government", "federal", "political"]),
];

const MILITARY_KEYWORDS: &[&str] = &[
    "military", "marine", "army", "navy", "officer", "infantry", "manager", "lead", "leadership",
    "director", "commissioned",
];

const RESEARCH_KEYWORDS: &[(&str, &[&str])] = &[
    ("AI/ML", &["ai", "machine learning", "neural", "deep learning", "llm"]),
    (
        "Human-Centered Design",
        &["human-centered", "hcd", "user research", "user experience"],
    ),
    ("Systems Engineering", &["systems", "engineering", "integration"]),
    ("Policy", &["policy", "governance", "political"]),
    ("Sustainability", &["sustainability", "environment", "climate"]),
    ("Social Impact", &["social", "community", "equity", "public"]),
];

/// A recurring word and how often it appeared.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ThemeCount {
    pub theme: String,
    pub count: usize,
}

/// Applicants matching a capability category.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CategoryCount {
    pub category: &'static str,
    pub count: usize,
}

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\b[a-z]+\b").expect("word pattern compiles"))
}

fn has_content(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && !text.to_uppercase().contains(&NO_RESPONSE.to_uppercase())
}

/// Most frequent content words, ties kept in first-seen order.
pub(crate) fn extract_themes<'a, I>(texts: I, max_themes: usize) -> Vec<ThemeCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut first_seen: Vec<String> = Vec::new();

    for text in texts {
        if !has_content(text) || text.trim().eq_ignore_ascii_case("n/a") {
            continue;
        }

        let lowered = text.to_lowercase();
        for word in word_pattern().find_iter(&lowered).map(|m| m.as_str()) {
            if word.len() <= 3 || STOP_WORDS.contains(&word) {
                continue;
            }
            let count = counts.entry(word.to_string()).or_insert(0);
            if *count == 0 {
                first_seen.push(word.to_string());
            }
            *count += 1;
        }
    }

    let mut themes: Vec<ThemeCount> = first_seen
        .into_iter()
        .map(|theme| {
            let count = counts[&theme];
            ThemeCount { theme, count }
        })
        .collect();
    themes.sort_by(|a, b| b.count.cmp(&a.count));
    themes.truncate(max_themes);
    themes
}

/// Each applicant counts at most once per category.
pub(crate) fn expertise_areas<'a, I>(texts: I) -> Vec<CategoryCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let texts: Vec<&str> = texts.into_iter().filter(|text| has_content(text)).collect();
    categorize(&texts, EXPERTISE_KEYWORDS)
}

pub(crate) fn research_focus<'a, I>(texts: I) -> Vec<CategoryCount>
where
    I: IntoIterator<Item = &'a str>,
{
    let texts: Vec<&str> = texts.into_iter().collect();
    categorize(&texts, RESEARCH_KEYWORDS)
}

pub(crate) fn mentions_leadership(text: &str) -> bool {
    let lowered = text.to_lowercase();
    MILITARY_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

fn categorize(texts: &[&str], table: &[(&'static str, &[&str])]) -> Vec<CategoryCount> {
    let mut results: Vec<CategoryCount> = table
        .iter()
        .map(|(category, keywords)| {
            let count = texts
                .iter()
                .filter(|text| {
                    let lowered = text.to_lowercase();
                    keywords.iter().any(|keyword| lowered.contains(keyword))
                })
                .count();
            CategoryCount {
                category: *category,
                count,
            }
        })
        .filter(|entry| entry.count > 0)
        .collect();
    results.sort_by(|a, b| b.count.cmp(&a.count));
    results
}
