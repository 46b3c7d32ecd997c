//! The operation boundary: typed requests in, user-facing reply strings out.
//!
//! Every failure class is converted into a reply here — extraction misses,
//! validation rejections, duplicate slots, missing ids, and backend outages
//! all end as text for the chat surface. Nothing propagates past this module
//! except at construction time.
//!
//! The pre-store policy checks (no past instants, subjects capped at 100
//! characters) live here, not in the store, so the store stays reusable.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::{error, warn};

use crate::conversation::{ConversationBuffer, TurnRole};
use crate::db::{AppointmentStore, CreateOutcome, DatabaseError, DATE_FORMAT, TIME_FORMAT};
use crate::extract::extract_appointment;
use crate::llm::{BackendError, LlmClient};

/// Hard cap on stored subject length, in characters.
pub const MAX_SUBJECT_CHARS: usize = 100;

// ─── Personas and prompts ─────────────────────────────────────────────────────

const CHAT_SYSTEM: &str =
    "You are Agendabot, a helpful and professional meeting assistant. Answer concisely.";
const TIP_SYSTEM: &str = "You are an expert in workplace productivity.";
const AGENDA_SYSTEM: &str = "You are an experienced executive assistant.";

const TIP_PROMPT: &str = "Give one brief, professional tip for running effective meetings.";

// ─── Requests ─────────────────────────────────────────────────────────────────

/// The inbound command surface. The chat transport (external collaborator)
/// delivers these shapes; the stand-in CLI parses them from slash commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Create an appointment from raw free text.
    Schedule(String),
    /// All appointments for the requesting owner.
    List,
    /// Appointments on one date (`YYYY-MM-DD`).
    FindByDate(String),
    /// Replace the subject of appointment `id`.
    EditSubject { id: i64, subject: String },
    /// Move appointment `id` to a new date and time.
    Reschedule { id: i64, date: String, time: String },
    /// Remove every appointment on one date.
    DeleteByDate(String),
    /// Remove every appointment for the owner.
    PurgeAll,
    /// Backend reachability probe.
    Status,
    /// One-shot meeting tip.
    Tip,
    /// Summarize the given text.
    Summarize(String),
    /// Draft a meeting agenda for a topic.
    AgendaOutline(String),
    /// Draft a formal email from an idea.
    EmailDraft(String),
    /// Usage overview.
    Help,
    /// Anything that is not a command: free chat.
    Chat(String),
}

impl Request {
    /// Parse one line of the stand-in transport. Unknown slash commands fall
    /// back to [`Request::Help`]; plain text is free chat.
    pub fn parse(line: &str) -> Request {
        let line = line.trim();
        if !line.starts_with('/') {
            return Request::Chat(line.to_string());
        }

        let mut parts = line.splitn(2, char::is_whitespace);
        let command = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or("").trim().to_string();

        match command {
            "/schedule" => Request::Schedule(rest),
            "/list" => Request::List,
            "/day" => Request::FindByDate(rest),
            "/edit" => match split_id(&rest) {
                Some((id, subject)) => Request::EditSubject { id, subject },
                None => Request::Help,
            },
            "/move" => {
                let mut args = rest.split_whitespace();
                match (
                    args.next().and_then(|s| s.parse().ok()),
                    args.next(),
                    args.next(),
                ) {
                    (Some(id), Some(date), Some(time)) => Request::Reschedule {
                        id,
                        date: date.to_string(),
                        time: time.to_string(),
                    },
                    _ => Request::Help,
                }
            }
            "/clear" => Request::DeleteByDate(rest),
            "/purge" => Request::PurgeAll,
            "/status" => Request::Status,
            "/tip" => Request::Tip,
            "/summarize" => Request::Summarize(rest),
            "/agenda" => Request::AgendaOutline(rest),
            "/email" => Request::EmailDraft(rest),
            _ => Request::Help,
        }
    }
}

fn split_id(rest: &str) -> Option<(i64, String)> {
    let mut parts = rest.splitn(2, char::is_whitespace);
    let id = parts.next()?.parse().ok()?;
    let text = parts.next()?.trim().to_string();
    if text.is_empty() {
        return None;
    }
    Some((id, text))
}

// ─── Assistant ────────────────────────────────────────────────────────────────

/// Request handler wiring the extraction pipeline, the store, the
/// conversation buffer and the backend together.
pub struct Assistant<C: LlmClient> {
    store: AppointmentStore,
    backend: C,
    buffer: ConversationBuffer,
}

impl<C: LlmClient> Assistant<C> {
    pub fn new(store: AppointmentStore, backend: C) -> Self {
        Self {
            store,
            backend,
            buffer: ConversationBuffer::new(),
        }
    }

    pub fn store(&self) -> &AppointmentStore {
        &self.store
    }

    /// Handle one request on behalf of `owner_id`, with `now` as the
    /// reference instant for extraction and validation.
    pub fn handle(&mut self, owner_id: i64, request: Request, now: NaiveDateTime) -> String {
        match request {
            Request::Schedule(text) => self.schedule_from_text(owner_id, &text, now),
            Request::List => self.list(owner_id),
            Request::FindByDate(date) => self.find_by_date(owner_id, &date),
            Request::EditSubject { id, subject } => self.edit_subject(owner_id, id, &subject),
            Request::Reschedule { id, date, time } => {
                self.reschedule(owner_id, id, &date, &time)
            }
            Request::DeleteByDate(date) => self.delete_by_date(owner_id, &date),
            Request::PurgeAll => self.purge_all(owner_id),
            Request::Status => self.status(),
            Request::Tip => self.tool_call(TIP_PROMPT.to_string(), TIP_SYSTEM),
            Request::Summarize(text) => self.summarize(&text),
            Request::AgendaOutline(topic) => self.agenda_outline(&topic),
            Request::EmailDraft(idea) => self.email_draft(&idea),
            Request::Help => help_text(),
            Request::Chat(text) => self.chat(&text),
        }
    }

    // ── Scheduling ──────────────────────────────────────────

    fn schedule_from_text(&mut self, owner_id: i64, text: &str, now: NaiveDateTime) -> String {
        let candidate = extract_appointment(text, now);

        let (date, time) = match (candidate.date, candidate.time) {
            (Some(date), Some(time)) => (date, time),
            _ => {
                return "I couldn't find a date or time in that message. Try something like \
                        \"team sync tomorrow at 10:00\"."
                    .to_string()
            }
        };

        if date.and_time(time) < now {
            return "That moment is already in the past. Give me a future date or time."
                .to_string();
        }
        let subject_chars = candidate.subject.chars().count();
        if subject_chars > MAX_SUBJECT_CHARS {
            return format!(
                "That subject is too long ({subject_chars} characters, max {MAX_SUBJECT_CHARS}). \
                 Shorten it and try again."
            );
        }

        match self.store.create(owner_id, date, time, &candidate.subject) {
            Ok(CreateOutcome::Created(appointment)) => format!(
                "Scheduled #{}: {} on {} at {}.",
                appointment.id,
                appointment.subject,
                appointment.date.format(DATE_FORMAT),
                appointment.time.format(TIME_FORMAT),
            ),
            Ok(CreateOutcome::Duplicate) => {
                "You already have an appointment at that exact date and time.".to_string()
            }
            Err(e) => internal_error("create", &e),
        }
    }

    fn list(&self, owner_id: i64) -> String {
        match self.store.list_all(owner_id) {
            Ok(appointments) if appointments.is_empty() => {
                "No appointments on the books.".to_string()
            }
            Ok(appointments) => {
                let mut reply = String::from("Your appointments:\n");
                for a in appointments {
                    reply.push_str(&format!(
                        "#{} {} {} — {}\n",
                        a.id,
                        a.date.format(DATE_FORMAT),
                        a.time.format(TIME_FORMAT),
                        a.subject
                    ));
                }
                reply.trim_end().to_string()
            }
            Err(e) => internal_error("list", &e),
        }
    }

    fn find_by_date(&self, owner_id: i64, date: &str) -> String {
        let date = match parse_date(date) {
            Some(d) => d,
            None => return date_usage(),
        };
        match self.store.find_by_date(owner_id, date) {
            Ok(appointments) if appointments.is_empty() => {
                format!("Nothing scheduled on {}.", date.format(DATE_FORMAT))
            }
            Ok(appointments) => {
                let mut reply = format!("On {}:\n", date.format(DATE_FORMAT));
                for a in appointments {
                    reply.push_str(&format!(
                        "#{} {} — {}\n",
                        a.id,
                        a.time.format(TIME_FORMAT),
                        a.subject
                    ));
                }
                reply.trim_end().to_string()
            }
            Err(e) => internal_error("find_by_date", &e),
        }
    }

    fn edit_subject(&self, owner_id: i64, id: i64, subject: &str) -> String {
        let subject_chars = subject.chars().count();
        if subject_chars > MAX_SUBJECT_CHARS {
            return format!(
                "That subject is too long ({subject_chars} characters, max {MAX_SUBJECT_CHARS}). \
                 Shorten it and try again."
            );
        }
        match self.store.update_subject(owner_id, id, subject) {
            Ok(true) => format!("Subject of #{id} updated."),
            Ok(false) => format!("No appointment #{id} found."),
            Err(e) => internal_error("update_subject", &e),
        }
    }

    fn reschedule(&self, owner_id: i64, id: i64, date: &str, time: &str) -> String {
        let date = match parse_date(date) {
            Some(d) => d,
            None => return date_usage(),
        };
        let time = match parse_time(time) {
            Some(t) => t,
            None => return time_usage(),
        };
        match self.store.reschedule(owner_id, id, date, time) {
            Ok(true) => format!(
                "Appointment #{id} moved to {} at {}.",
                date.format(DATE_FORMAT),
                time.format(TIME_FORMAT)
            ),
            Ok(false) => format!("No appointment #{id} found."),
            Err(e) => internal_error("reschedule", &e),
        }
    }

    fn delete_by_date(&self, owner_id: i64, date: &str) -> String {
        let date = match parse_date(date) {
            Some(d) => d,
            None => return date_usage(),
        };
        match self.store.delete_by_date(owner_id, date) {
            Ok(0) => format!("Nothing scheduled on {}.", date.format(DATE_FORMAT)),
            Ok(n) => format!("Removed {n} appointment(s) on {}.", date.format(DATE_FORMAT)),
            Err(e) => internal_error("delete_by_date", &e),
        }
    }

    fn purge_all(&self, owner_id: i64) -> String {
        match self.store.purge_all(owner_id) {
            Ok(0) => "Your calendar was already empty.".to_string(),
            Ok(n) => format!("Cleared {n} appointment(s). Your calendar is empty."),
            Err(e) => internal_error("purge_all", &e),
        }
    }

    // ── Backend-powered operations ──────────────────────────

    fn status(&self) -> String {
        match self.backend.ping() {
            Ok(()) => "ONLINE. The language model is ready.".to_string(),
            Err(e) => {
                warn!("backend status probe failed: {e}");
                "OFFLINE. The language model is not reachable.".to_string()
            }
        }
    }

    fn summarize(&mut self, text: &str) -> String {
        if text.trim().is_empty() {
            return "Add the text after the command, e.g. /summarize <long text>.".to_string();
        }
        self.tool_call(format!("Summarize this briefly: {text}"), CHAT_SYSTEM)
    }

    fn agenda_outline(&mut self, topic: &str) -> String {
        if topic.trim().is_empty() {
            return "Add the topic after the command, e.g. /agenda product launch.".to_string();
        }
        self.tool_call(
            format!("Write a structured meeting agenda with time slots for the topic: {topic}"),
            AGENDA_SYSTEM,
        )
    }

    fn email_draft(&mut self, idea: &str) -> String {
        if idea.trim().is_empty() {
            return "Add the idea after the command, e.g. /email request a quote from the vendor."
                .to_string();
        }
        self.tool_call(
            format!(
                "Write a formal, professional email about: {idea}. Include a subject line."
            ),
            CHAT_SYSTEM,
        )
    }

    /// One-shot structured call; failures become fixed apologetic replies.
    fn tool_call(&mut self, prompt: String, system: &str) -> String {
        match self.backend.generate(&prompt, system) {
            Ok(reply) => reply,
            Err(e) => backend_failure_reply(&e),
        }
    }

    fn chat(&mut self, text: &str) -> String {
        let context = self.buffer.context_prompt();
        let prompt = if context.is_empty() {
            text.to_string()
        } else {
            format!("{context}User: {text}")
        };

        match self.backend.generate(&prompt, CHAT_SYSTEM) {
            Ok(reply) => {
                self.buffer.append(TurnRole::User, text);
                self.buffer.append(TurnRole::Assistant, &reply);
                reply
            }
            Err(e) => backend_failure_reply(&e),
        }
    }
}

// ─── Reply helpers ────────────────────────────────────────────────────────────

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

fn parse_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), TIME_FORMAT).ok()
}

fn date_usage() -> String {
    "Dates look like YYYY-MM-DD, e.g. 2026-09-15.".to_string()
}

fn time_usage() -> String {
    "Times look like HH:MM (24-hour), e.g. 14:30.".to_string()
}

fn internal_error(operation: &str, e: &DatabaseError) -> String {
    error!("appointment store failure in {operation}: {e}");
    "Internal error while accessing the appointment ledger. Please try again.".to_string()
}

fn backend_failure_reply(e: &BackendError) -> String {
    match e {
        BackendError::Connection(url) => {
            error!("backend unreachable at {url}");
            "I cannot reach the language model right now. Is the backend running?".to_string()
        }
        BackendError::Timeout(secs) => {
            error!("backend timed out after {secs}s");
            "The model is taking too long to answer. Try again with a shorter message."
                .to_string()
        }
        other => {
            error!("backend call failed: {other}");
            "Something went wrong while processing your request.".to_string()
        }
    }
}

fn help_text() -> String {
    "Commands:\n\
     /schedule <free text>   capture an appointment from plain language\n\
     /list                   all your appointments\n\
     /day <YYYY-MM-DD>       appointments on one date\n\
     /edit <id> <subject>    rename an appointment\n\
     /move <id> <date> <time> reschedule an appointment\n\
     /clear <YYYY-MM-DD>     remove a whole day\n\
     /purge                  remove everything\n\
     /status                 is the language model up?\n\
     /tip                    a quick meeting tip\n\
     /summarize <text>       summarize a long text\n\
     /agenda <topic>         draft a meeting agenda\n\
     /email <idea>           draft a formal email\n\
     Anything else is free chat."
        .to_string()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
