use super::domain::Question;
use super::mapping::{is_scale_question, scale_label, NO_RESPONSE};

/// Clean one answer cell for storage and display.
pub fn normalize_response(raw: &str, question: &Question) -> String {
    let sanitized = sanitize_text(raw);
    let value = sanitized.trim();
    if value.is_empty() {
        return NO_RESPONSE.to_string();
    }

    // Codes are matched after sanitizing so a second pass sees the same value.
    if is_scale_question(&question.id) {
        if let Some(label) = scale_label(value) {
            return label.to_string();
        }
    }
    value.to_string()
}

/// Fold typographic punctuation to ASCII and drop anything outside printable Latin-1.
///
/// Line feeds survive so multi-paragraph answers keep their shape; tabs become
/// spaces and carriage returns are folded into line feeds.
pub fn sanitize_text(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\u{2014}' | '\u{2013}' => output.push('-'),
            '\u{201c}' | '\u{201d}' => output.push('"'),
            '\u{2018}' | '\u{2019}' => output.push('\''),
            '\u{2026}' => output.push_str("..."),
            '\t' => output.push(' '),
            '\r' => {
                if chars.peek() != Some(&'\n') {
                    output.push('\n');
                }
            }
            ch if is_printable_latin1(ch) || ch == '\n' => output.push(ch),
            _ => {}
        }
    }

    output
}

fn is_printable_latin1(ch: char) -> bool {
    matches!(ch, ' '..='~' | '\u{a0}'..='\u{ff}')
}
