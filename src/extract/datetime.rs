//! Language-aware date/time search over normalized message text.
//!
//! The scanner finds every temporal token it knows (relative day words,
//! weekday names, explicit dates, clock times) in Spanish or English,
//! merges adjacent tokens into expressions, and resolves each expression
//! against a reference instant. Incomplete expressions borrow their missing
//! parts from the reference and prefer the next future occurrence. When a
//! message contains several expressions, the right-most one is
//! authoritative: trailing clauses carry the actual scheduling detail more
//! often than leading filler.

use std::sync::LazyLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use regex::Regex;

/// A resolved date/time expression found in a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeMatch {
    /// Resolved absolute instant, minute resolution.
    pub resolved: NaiveDateTime,
    /// Byte span of the authoritative expression in the searched text.
    pub span: (usize, usize),
    /// The exact substring that was matched, for excision by the caller.
    pub text: String,
}

// ─── Token dictionaries ───────────────────────────────────────────────────────

const ES_MONTHS: &[(&str, u32)] = &[
    ("enero", 1),
    ("febrero", 2),
    ("marzo", 3),
    ("abril", 4),
    ("mayo", 5),
    ("junio", 6),
    ("julio", 7),
    ("agosto", 8),
    ("septiembre", 9),
    ("setiembre", 9),
    ("octubre", 10),
    ("noviembre", 11),
    ("diciembre", 12),
];

const EN_MONTHS: &[(&str, u32)] = &[
    ("january", 1),
    ("february", 2),
    ("march", 3),
    ("april", 4),
    ("may", 5),
    ("june", 6),
    ("july", 7),
    ("august", 8),
    ("september", 9),
    ("october", 10),
    ("november", 11),
    ("december", 12),
];

const WEEKDAYS: &[(&str, Weekday)] = &[
    ("lunes", Weekday::Mon),
    ("martes", Weekday::Tue),
    ("miércoles", Weekday::Wed),
    ("miercoles", Weekday::Wed),
    ("jueves", Weekday::Thu),
    ("viernes", Weekday::Fri),
    ("sábado", Weekday::Sat),
    ("sabado", Weekday::Sat),
    ("domingo", Weekday::Sun),
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// Words allowed between two tokens of the same expression.
const GAP_WORDS: &[&str] = &[
    "el", "la", "los", "las", "este", "esta", "a", "de", "del", "en", "por", "at", "on", "the",
    "this",
];

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    ES_MONTHS
        .iter()
        .chain(EN_MONTHS.iter())
        .find(|(n, _)| *n == lower)
        .map(|(_, m)| *m)
}

fn weekday_value(name: &str) -> Option<Weekday> {
    let lower = name.to_lowercase();
    WEEKDAYS
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|(_, w)| *w)
}

fn alternation(names: impl Iterator<Item = &'static str>) -> String {
    names.collect::<Vec<_>>().join("|")
}

// ─── Scanner ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenValue {
    /// Fully specified calendar date.
    Absolute(NaiveDate),
    /// Day and month, year possibly implied by the reference.
    MonthDay {
        day: u32,
        month: u32,
        year: Option<i32>,
    },
    /// Offset in whole days from the reference ("hoy" 0, "mañana" 1, ...).
    RelativeDays(i64),
    /// Named weekday, resolved to its next occurrence.
    OnWeekday(Weekday),
    /// Time of day.
    Clock(NaiveTime),
}

#[derive(Debug, Clone)]
struct Token {
    start: usize,
    end: usize,
    value: TokenValue,
}

static RE_ISO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap());

static RE_SLASH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{1,2})/(\d{1,2})(?:/(\d{4}|\d{2}))?\b").unwrap());

static RE_ES_MONTHDAY: LazyLock<Regex> = LazyLock::new(|| {
    let months = alternation(ES_MONTHS.iter().map(|(n, _)| *n));
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})\s+de\s+({months})(?:\s+de\s+(\d{{4}}))?\b"
    ))
    .unwrap()
});

static RE_EN_MONTH_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    let months = alternation(EN_MONTHS.iter().map(|(n, _)| *n));
    Regex::new(&format!(
        r"(?i)\b({months})\s+(\d{{1,2}})(?:st|nd|rd|th)?(?:,?\s+(\d{{4}}))?\b"
    ))
    .unwrap()
});

static RE_EN_DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    let months = alternation(EN_MONTHS.iter().map(|(n, _)| *n));
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})\s+(?:of\s+)?({months})(?:\s+(\d{{4}}))?\b"
    ))
    .unwrap()
});

static RE_RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(pasado\s+mañana|day\s+after\s+tomorrow|mañana|tomorrow|hoy|today)\b")
        .unwrap()
});

static RE_WEEKDAY: LazyLock<Regex> = LazyLock::new(|| {
    let days = alternation(WEEKDAYS.iter().map(|(n, _)| *n));
    Regex::new(&format!(
        r"(?i)\b(?:(?:el|este|the|this|next|pr[oó]ximo)\s+)*({days})\b"
    ))
    .unwrap()
});

static RE_CLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").unwrap());

/// Collect every temporal token in the text, one entry per regex hit.
fn scan_tokens(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();

    for caps in RE_ISO.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let year = caps[1].parse::<i32>().ok();
        let month = caps[2].parse::<u32>().ok();
        let day = caps[3].parse::<u32>().ok();
        if let (Some(y), Some(mo), Some(d)) = (year, month, day) {
            if let Some(date) = NaiveDate::from_ymd_opt(y, mo, d) {
                tokens.push(Token {
                    start: m.start(),
                    end: m.end(),
                    value: TokenValue::Absolute(date),
                });
            }
        }
    }

    for caps in RE_SLASH.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let day: u32 = match caps[1].parse() {
            Ok(d) => d,
            Err(_) => continue,
        };
        let month: u32 = match caps[2].parse() {
            Ok(mo) => mo,
            Err(_) => continue,
        };
        if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
            continue;
        }
        let year = caps.get(3).and_then(|y| y.as_str().parse::<i32>().ok()).map(
            |y| if y < 100 { 2000 + y } else { y },
        );
        tokens.push(Token {
            start: m.start(),
            end: m.end(),
            value: TokenValue::MonthDay { day, month, year },
        });
    }

    for caps in RE_ES_MONTHDAY.captures_iter(text) {
        push_month_day(&mut tokens, &caps, 1, 2, 3);
    }
    for caps in RE_EN_MONTH_FIRST.captures_iter(text) {
        push_month_day(&mut tokens, &caps, 2, 1, 3);
    }
    for caps in RE_EN_DAY_FIRST.captures_iter(text) {
        push_month_day(&mut tokens, &caps, 1, 2, 3);
    }

    for caps in RE_RELATIVE.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let word = caps[1].to_lowercase();
        let days = if word.contains("pasado") || word.contains("after") {
            2
        } else if word.contains("mañana") || word == "tomorrow" {
            1
        } else {
            0
        };
        tokens.push(Token {
            start: m.start(),
            end: m.end(),
            value: TokenValue::RelativeDays(days),
        });
    }

    for caps in RE_WEEKDAY.captures_iter(text) {
        let m = caps.get(0).unwrap();
        if let Some(weekday) = weekday_value(&caps[1]) {
            tokens.push(Token {
                start: m.start(),
                end: m.end(),
                value: TokenValue::OnWeekday(weekday),
            });
        }
    }

    for caps in RE_CLOCK.captures_iter(text) {
        let m = caps.get(0).unwrap();
        let (h, min) = (caps[1].parse::<u32>(), caps[2].parse::<u32>());
        if let (Ok(h), Ok(min)) = (h, min) {
            if let Some(time) = NaiveTime::from_hms_opt(h, min, 0) {
                tokens.push(Token {
                    start: m.start(),
                    end: m.end(),
                    value: TokenValue::Clock(time),
                });
            }
        }
    }

    dedupe_overlapping(tokens)
}

/// Keep the longest token when two overlap (e.g. "mañana" inside
/// "pasado mañana" when both regexes fire on the same stretch).
fn dedupe_overlapping(mut tokens: Vec<Token>) -> Vec<Token> {
    tokens.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then((b.end - b.start).cmp(&(a.end - a.start)))
    });
    let mut result: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut last_end = 0;
    for token in tokens {
        if token.start >= last_end {
            last_end = token.end;
            result.push(token);
        }
    }
    result
}

fn push_month_day(
    tokens: &mut Vec<Token>,
    caps: &regex::Captures<'_>,
    day_idx: usize,
    month_idx: usize,
    year_idx: usize,
) {
    let m = match caps.get(0) {
        Some(m) => m,
        None => return,
    };
    let day: u32 = match caps[day_idx].parse() {
        Ok(d) => d,
        Err(_) => return,
    };
    let month = match month_number(&caps[month_idx]) {
        Some(mo) => mo,
        None => return,
    };
    if !(1..=31).contains(&day) {
        return;
    }
    let year = caps
        .get(year_idx)
        .and_then(|y| y.as_str().parse::<i32>().ok());
    tokens.push(Token {
        start: m.start(),
        end: m.end(),
        value: TokenValue::MonthDay { day, month, year },
    });
}

// ─── Expression grouping & resolution ─────────────────────────────────────────

/// Split the token stream into expressions: runs of tokens separated only by
/// whitespace and connective words.
fn group_expressions(text: &str, tokens: &[Token]) -> Vec<Vec<Token>> {
    let mut groups: Vec<Vec<Token>> = Vec::new();
    for token in tokens {
        if let Some(group) = groups.last_mut() {
            let prev_end = group.last().map(|t| t.end).unwrap_or(0);
            if is_connective_gap(&text[prev_end..token.start]) {
                group.push(token.clone());
                continue;
            }
        }
        groups.push(vec![token.clone()]);
    }
    groups
}

fn is_connective_gap(gap: &str) -> bool {
    gap.split_whitespace().all(|word| {
        let clean = word
            .trim_matches(|c: char| matches!(c, ',' | '.' | ';' | ':'))
            .to_lowercase();
        clean.is_empty() || GAP_WORDS.contains(&clean.as_str())
    })
}

/// Resolve one expression against the reference instant, preferring future
/// occurrences for incomplete dates. Returns `None` when the combination is
/// not a real calendar instant.
fn resolve_group(tokens: &[Token], reference: NaiveDateTime) -> Option<NaiveDateTime> {
    let mut date_value = None;
    let mut time_value = None;
    for token in tokens {
        match token.value {
            TokenValue::Clock(t) => time_value = Some(t),
            other => date_value = Some(other),
        }
    }

    let ref_minute = truncate_to_minute(reference);
    // Missing components come from the reference, dateparser-style.
    let effective_time = time_value.unwrap_or_else(|| ref_minute.time());

    let date = match date_value {
        Some(TokenValue::Absolute(d)) => d,
        Some(TokenValue::MonthDay {
            day,
            month,
            year: Some(y),
        }) => NaiveDate::from_ymd_opt(y, month, day)?,
        Some(TokenValue::MonthDay {
            day,
            month,
            year: None,
        }) => {
            let this_year = NaiveDate::from_ymd_opt(reference.year(), month, day);
            match this_year {
                Some(d) if d.and_time(effective_time) >= ref_minute => d,
                _ => NaiveDate::from_ymd_opt(reference.year() + 1, month, day)?,
            }
        }
        Some(TokenValue::RelativeDays(n)) => reference.date() + Duration::days(n),
        Some(TokenValue::OnWeekday(target)) => {
            let offset = (target.num_days_from_monday() + 7
                - reference.weekday().num_days_from_monday())
                % 7;
            let mut date = reference.date() + Duration::days(i64::from(offset));
            if offset == 0 && date.and_time(effective_time) < ref_minute {
                date += Duration::days(7);
            }
            date
        }
        Some(TokenValue::Clock(_)) => return None,
        None => {
            // Time only: today, or the next day once the time has passed.
            let time = time_value?;
            let mut instant = reference.date().and_time(time);
            if instant < ref_minute {
                instant += Duration::days(1);
            }
            return Some(instant);
        }
    };

    Some(date.and_time(effective_time))
}

fn truncate_to_minute(instant: NaiveDateTime) -> NaiveDateTime {
    let time = instant.time();
    let truncated = NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time);
    instant.date().and_time(truncated)
}

/// Search for date/time expressions and resolve the authoritative one.
///
/// The right-most resolvable expression wins. Returns `None` when nothing in
/// the text parses as a date or time.
pub fn search_datetime(text: &str, reference: NaiveDateTime) -> Option<DateTimeMatch> {
    let tokens = scan_tokens(text);
    let groups = group_expressions(text, &tokens);

    groups
        .iter()
        .rev()
        .find_map(|group| {
            let resolved = resolve_group(group, reference)?;
            let start = group.first()?.start;
            let end = group.last()?.end;
            Some(DateTimeMatch {
                resolved,
                span: (start, end),
                text: text[start..end].to_string(),
            })
        })
}
