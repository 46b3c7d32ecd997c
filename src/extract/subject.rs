//! Subject sanitizer — derives a readable subject line from what is left of
//! a message once the temporal expression is excised.
//!
//! The stoplist is a flat table of literal words so another locale can be
//! swapped in without touching the logic.

use std::sync::LazyLock;

use regex::Regex;

use super::datetime::DateTimeMatch;

/// Fallback subject when nothing usable survives the cleanup.
pub const DEFAULT_SUBJECT: &str = "Meeting";

/// Scheduling filler stripped from subjects, Spanish and English. Multi-word
/// phrases come first so they win over their own fragments.
const STOPLIST: &[&str] = &[
    "remind me to",
    "set up",
    "agéndame",
    "agendame",
    "recuérdame",
    "recuerdame",
    "agendar",
    "agenda",
    "programar",
    "programa",
    "reunión",
    "reunion",
    "cita",
    "evento",
    "schedule",
    "appointment",
    "meeting",
    "event",
    "book",
    // Bare articles and prepositions.
    "el",
    "la",
    "los",
    "las",
    "un",
    "una",
    "para",
    "por",
    "del",
    "de",
    "en",
    "a",
    "the",
    "an",
    "at",
    "on",
    "for",
    "to",
    "of",
    "in",
];

fn stoplist_re() -> &'static Regex {
    static RE: LazyLock<Regex> = LazyLock::new(|| {
        let words = STOPLIST
            .iter()
            .map(|w| regex::escape(w))
            .collect::<Vec<_>>()
            .join("|");
        Regex::new(&format!(r"(?i)\b(?:{words})\b")).unwrap()
    });
    &RE
}

/// Remove the authoritative temporal span (once) and the stoplist, collapse
/// whitespace, and capitalize. Empty results fall back to [`DEFAULT_SUBJECT`].
pub fn sanitize(normalized: &str, matched: &DateTimeMatch) -> String {
    let (start, end) = matched.span;
    let mut remainder = String::with_capacity(normalized.len());
    remainder.push_str(&normalized[..start]);
    remainder.push(' ');
    remainder.push_str(&normalized[end..]);

    tidy(&remainder)
}

/// Stoplist cleanup for text with no temporal span to excise.
pub fn tidy(text: &str) -> String {
    let stripped = stoplist_re().replace_all(text, " ");
    let collapsed = stripped
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let trimmed = collapsed
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | ';' | ':' | '-'))
        .to_string();

    if trimmed.is_empty() {
        return DEFAULT_SUBJECT.to_string();
    }
    capitalize_first(&trimmed)
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::datetime::search_datetime;
    use chrono::NaiveDate;

    fn reference() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 9, 2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn subject_of(normalized: &str) -> String {
        let m = search_datetime(normalized, reference()).expect("temporal match");
        sanitize(normalized, &m)
    }

    #[test]
    fn removes_span_and_filler() {
        assert_eq!(subject_of("agenda reunión con Carlos mañana 13:00"), "Con Carlos");
    }

    #[test]
    fn falls_back_to_default_when_empty() {
        assert_eq!(subject_of("agenda una reunión mañana 13:00"), DEFAULT_SUBJECT);
    }

    #[test]
    fn capitalizes_first_letter() {
        assert_eq!(subject_of("dentista mañana 09:00"), "Dentista");
    }

    #[test]
    fn keeps_content_words_either_side_of_span() {
        assert_eq!(
            subject_of("revisión mañana 10:00 presupuesto"),
            "Revisión presupuesto"
        );
    }

    #[test]
    fn strips_trailing_punctuation() {
        assert_eq!(subject_of("cena con Laura, mañana 21:00"), "Cena con Laura");
    }

    #[test]
    fn english_filler_removed() {
        assert_eq!(
            subject_of("schedule a meeting with the design team tomorrow 15:00"),
            "With design team"
        );
    }

    #[test]
    fn stoplist_matches_whole_words_only() {
        // "encargo" contains "en"; "plan" contains "la". Neither is touched.
        assert_eq!(subject_of("encargo plan mañana 10:00"), "Encargo plan");
    }

    #[test]
    fn tidy_without_span_cleans_filler() {
        assert_eq!(tidy("agenda una reunión"), DEFAULT_SUBJECT);
        assert_eq!(tidy("presupuesto anual"), "Presupuesto anual");
    }
}
