//! Appointment extraction pipeline — free text in, date/time/subject out.
//!
//! Three stages, each unit-testable on its own:
//! 1. [`normalize`] rewrites informal clock tokens into canonical `HH:MM`.
//! 2. [`search_datetime`] finds and resolves the authoritative temporal
//!    expression against a reference instant.
//! 3. [`sanitize`] turns the rest of the message into a subject line.
//!
//! The pipeline is a pure function of its inputs: validation (past instants,
//! subject length) belongs to the caller.

pub mod datetime;
pub mod normalize;
pub mod subject;

pub use datetime::{search_datetime, DateTimeMatch};
pub use normalize::normalize;
pub use subject::{sanitize, DEFAULT_SUBJECT};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Transient result of parsing one inbound message. Absent date and time
/// signal extraction failure; the subject always carries something.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionCandidate {
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub subject: String,
}

impl ExtractionCandidate {
    /// Whether a date/time expression was found at all.
    pub fn has_instant(&self) -> bool {
        self.date.is_some() && self.time.is_some()
    }
}

/// Run the full pipeline over one message.
pub fn extract_appointment(text: &str, reference: NaiveDateTime) -> ExtractionCandidate {
    let normalized = normalize(text);
    match search_datetime(&normalized, reference) {
        Some(matched) => ExtractionCandidate {
            date: Some(matched.resolved.date()),
            time: Some(matched.resolved.time()),
            subject: sanitize(&normalized, &matched),
        },
        None => ExtractionCandidate {
            date: None,
            time: None,
            subject: subject::tidy(&normalized),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 9, 2)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn full_pipeline_informal_time() {
        let candidate = extract_appointment("agenda reunión con Carlos mañana 1pm", reference());
        assert_eq!(candidate.date, NaiveDate::from_ymd_opt(2026, 9, 3));
        assert_eq!(candidate.time, NaiveTime::from_hms_opt(13, 0, 0));
        assert_eq!(candidate.subject, "Con Carlos");
    }

    #[test]
    fn no_temporal_content_yields_empty_candidate() {
        let candidate = extract_appointment("muchas gracias", reference());
        assert!(!candidate.has_instant());
        assert_eq!(candidate.subject, "Muchas gracias");
    }

    #[test]
    fn subject_defaults_when_only_filler_remains() {
        let candidate = extract_appointment("agéndame una cita mañana a las 4pm", reference());
        assert!(candidate.has_instant());
        assert_eq!(candidate.time, NaiveTime::from_hms_opt(16, 0, 0));
        assert_eq!(candidate.subject, DEFAULT_SUBJECT);
    }

    #[test]
    fn connective_stripped_before_search() {
        // "a las 5pm" normalizes to "17:00" before the date search runs.
        let candidate = extract_appointment("cena el viernes a las 5pm", reference());
        assert_eq!(candidate.time, NaiveTime::from_hms_opt(17, 0, 0));
        // Reference is Wednesday 2026-09-02; Friday is the 4th.
        assert_eq!(candidate.date, NaiveDate::from_ymd_opt(2026, 9, 4));
        assert_eq!(candidate.subject, "Cena");
    }
}
