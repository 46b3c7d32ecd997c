//! Temporal normalizer — rewrites informal clock tokens into a canonical
//! 24-hour form and drops the connective words that precede them, so the
//! date search downstream only ever sees `HH:MM`.
//!
//! Pure text transform. Malformed tokens are left untouched.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Rewrite `1pm` / `11 am` style tokens to zero-padded `HH:00` and strip
/// the connectives ("a la", "a las", "at") in front of a clock reference.
pub fn normalize(raw: &str) -> String {
    static AMPM: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)\b(\d{1,2})\s?(am|pm)\b").unwrap());

    let rewritten = AMPM.replace_all(raw, |caps: &Captures| {
        let hour: u32 = match caps[1].parse() {
            Ok(h) => h,
            Err(_) => return caps[0].to_string(),
        };
        if hour == 0 || hour > 12 {
            // Not a valid 12-hour clock reading; pass through unchanged.
            return caps[0].to_string();
        }
        let meridiem = caps[2].to_ascii_lowercase();
        let h24 = match (meridiem.as_str(), hour) {
            ("am", 12) => 0,
            ("am", h) => h,
            ("pm", 12) => 12,
            (_, h) => h + 12,
        };
        format!("{h24:02}:00")
    });

    strip_time_connectives(&rewritten)
}

/// Remove "a la(s)" and "at" immediately before a clock token. The regex
/// crate has no lookahead, so the digit is captured and put back.
fn strip_time_connectives(text: &str) -> String {
    static ES_CONNECTIVE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)\ba las? (\d)").unwrap());
    static EN_CONNECTIVE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?i)\bat (\d{1,2}:)").unwrap());

    let text = ES_CONNECTIVE.replace_all(text, "$1");
    EN_CONNECTIVE.replace_all(&text, "$1").into_owned()
}
