//! Appointment ledger — owner-scoped CRUD over the `appointments` table.
//!
//! The store owns a single connection behind a mutex; every multi-step
//! operation (duplicate-check-then-insert, delete-then-maybe-reset-sequence)
//! runs inside one transaction so concurrent callers cannot interleave
//! between the check and the write.
//!
//! Ids come from SQLite's AUTOINCREMENT: monotonically increasing, stable
//! across updates, never reused while any row exists. `purge_all` clears the
//! sequence once the table is globally empty, so a fresh ledger starts over
//! from 1.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use super::sqlite::{open_database, open_memory_database};
use super::DatabaseError;

/// Canonical storage form for dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Canonical storage form for times (24-hour, minute resolution).
pub const TIME_FORMAT: &str = "%H:%M";

// ─── Types ────────────────────────────────────────────────────────────────────

/// A persisted appointment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub owner_id: i64,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub subject: String,
}

/// Result of a `create` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Appointment),
    /// An appointment with the same (owner, date, time) already exists.
    /// Not an error: the call is a no-op.
    Duplicate,
}

// ─── Store ────────────────────────────────────────────────────────────────────

/// Owner of all appointment records and their id sequence.
pub struct AppointmentStore {
    conn: Mutex<Connection>,
}

impl AppointmentStore {
    /// Open (or create) the ledger at the given path and run migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_database(path)?),
        })
    }

    /// In-memory ledger (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(open_memory_database()?),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, DatabaseError> {
        self.conn.lock().map_err(|_| DatabaseError::LockPoisoned)
    }

    /// Insert a new appointment unless the exact (owner, date, time) slot is
    /// already taken. Check and insert share one transaction.
    pub fn create(
        &self,
        owner_id: i64,
        date: NaiveDate,
        time: NaiveTime,
        subject: &str,
    ) -> Result<CreateOutcome, DatabaseError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let date_s = date.format(DATE_FORMAT).to_string();
        let time_s = time.format(TIME_FORMAT).to_string();

        let taken: bool = tx.query_row(
            "SELECT COUNT(*) > 0 FROM appointments
             WHERE owner_id = ?1 AND date = ?2 AND time = ?3",
            params![owner_id, date_s, time_s],
            |row| row.get(0),
        )?;
        if taken {
            return Ok(CreateOutcome::Duplicate);
        }

        tx.execute(
            "INSERT INTO appointments (owner_id, date, time, subject)
             VALUES (?1, ?2, ?3, ?4)",
            params![owner_id, date_s, time_s, subject],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(CreateOutcome::Created(Appointment {
            id,
            owner_id,
            date,
            time,
            subject: subject.to_string(),
        }))
    }

    /// All of an owner's appointments, ordered by (date, time) ascending.
    pub fn list_all(&self, owner_id: i64) -> Result<Vec<Appointment>, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, date, time, subject FROM appointments
             WHERE owner_id = ?1
             ORDER BY date ASC, time ASC",
        )?;
        let rows = stmt.query_map(params![owner_id], map_appointment)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::from)
    }

    /// An owner's appointments on one date, ordered by time ascending.
    pub fn find_by_date(
        &self,
        owner_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, DatabaseError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, date, time, subject FROM appointments
             WHERE owner_id = ?1 AND date = ?2
             ORDER BY time ASC",
        )?;
        let rows = stmt.query_map(
            params![owner_id, date.format(DATE_FORMAT).to_string()],
            map_appointment,
        )?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(DatabaseError::from)
    }

    /// Replace the subject of one appointment. Returns false if the id does
    /// not exist for this owner. Id, date and time are untouched.
    pub fn update_subject(
        &self,
        owner_id: i64,
        id: i64,
        new_subject: &str,
    ) -> Result<bool, DatabaseError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE appointments SET subject = ?1 WHERE id = ?2 AND owner_id = ?3",
            params![new_subject, id, owner_id],
        )?;
        Ok(changed > 0)
    }

    /// Move one appointment to a new slot, overwriting date and time in
    /// place. The old slot is released, not archived. Returns false if the
    /// id does not exist for this owner.
    pub fn reschedule(
        &self,
        owner_id: i64,
        id: i64,
        new_date: NaiveDate,
        new_time: NaiveTime,
    ) -> Result<bool, DatabaseError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE appointments SET date = ?1, time = ?2 WHERE id = ?3 AND owner_id = ?4",
            params![
                new_date.format(DATE_FORMAT).to_string(),
                new_time.format(TIME_FORMAT).to_string(),
                id,
                owner_id
            ],
        )?;
        Ok(changed > 0)
    }

    /// Delete all of an owner's appointments on one date. Returns how many
    /// rows were removed (0 = nothing matched).
    pub fn delete_by_date(
        &self,
        owner_id: i64,
        date: NaiveDate,
    ) -> Result<usize, DatabaseError> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM appointments WHERE owner_id = ?1 AND date = ?2",
            params![owner_id, date.format(DATE_FORMAT).to_string()],
        )?;
        Ok(removed)
    }

    /// Delete all of an owner's appointments. If the table is globally empty
    /// afterwards (across all owners), the id sequence resets so the next
    /// create starts from 1 again. Delete, count and reset share one
    /// transaction.
    pub fn purge_all(&self, owner_id: i64) -> Result<usize, DatabaseError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let removed = tx.execute(
            "DELETE FROM appointments WHERE owner_id = ?1",
            params![owner_id],
        )?;

        let remaining: i64 =
            tx.query_row("SELECT COUNT(*) FROM appointments", [], |row| row.get(0))?;
        if remaining == 0 {
            tx.execute("DELETE FROM sqlite_sequence WHERE name = 'appointments'", [])?;
        }

        tx.commit()?;
        Ok(removed)
    }
}

fn map_appointment(row: &Row<'_>) -> rusqlite::Result<Appointment> {
    let date_s: String = row.get(2)?;
    let time_s: String = row.get(3)?;
    let date = NaiveDate::parse_from_str(&date_s, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let time = NaiveTime::parse_from_str(&time_s, TIME_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Appointment {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        date,
        time,
        subject: row.get(4)?,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> AppointmentStore {
        AppointmentStore::open_in_memory().expect("open_in_memory")
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    fn t(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, TIME_FORMAT).unwrap()
    }

    fn must_create(store: &AppointmentStore, owner: i64, date: &str, time: &str, subject: &str) -> Appointment {
        match store.create(owner, d(date), t(time), subject).unwrap() {
            CreateOutcome::Created(a) => a,
            CreateOutcome::Duplicate => panic!("unexpected duplicate for {date} {time}"),
        }
    }

    #[test]
    fn create_assigns_monotonic_ids() {
        let store = store();
        let a = must_create(&store, 1, "2026-09-01", "10:00", "Standup");
        let b = must_create(&store, 1, "2026-09-01", "11:00", "Review");
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn create_duplicate_is_noop() {
        let store = store();
        must_create(&store, 1, "2026-09-01", "10:00", "Standup");
        let second = store.create(1, d("2026-09-01"), t("10:00"), "Standup").unwrap();
        assert_eq!(second, CreateOutcome::Duplicate);
        assert_eq!(store.list_all(1).unwrap().len(), 1);
    }

    #[test]
    fn near_duplicates_are_accepted() {
        // Only exact (owner, date, time) matches are rejected; one minute
        // apart is two appointments.
        let store = store();
        must_create(&store, 1, "2026-09-01", "10:00", "Standup");
        must_create(&store, 1, "2026-09-01", "10:01", "Standup");
        assert_eq!(store.list_all(1).unwrap().len(), 2);
    }

    #[test]
    fn same_slot_different_owners_both_stored() {
        let store = store();
        must_create(&store, 1, "2026-09-01", "10:00", "Standup");
        must_create(&store, 2, "2026-09-01", "10:00", "Dentist");
        assert_eq!(store.list_all(1).unwrap().len(), 1);
        assert_eq!(store.list_all(2).unwrap().len(), 1);
    }

    #[test]
    fn list_all_ordered_by_date_then_time() {
        let store = store();
        must_create(&store, 1, "2026-09-02", "09:00", "B");
        must_create(&store, 1, "2026-09-01", "15:00", "A2");
        must_create(&store, 1, "2026-09-01", "08:30", "A1");

        let all = store.list_all(1).unwrap();
        let subjects: Vec<&str> = all.iter().map(|a| a.subject.as_str()).collect();
        assert_eq!(subjects, vec!["A1", "A2", "B"]);
    }

    #[test]
    fn list_all_scoped_to_owner() {
        let store = store();
        must_create(&store, 1, "2026-09-01", "10:00", "Mine");
        must_create(&store, 2, "2026-09-01", "11:00", "Theirs");
        let mine = store.list_all(1).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].subject, "Mine");
    }

    #[test]
    fn find_by_date_ordered_by_time() {
        let store = store();
        must_create(&store, 1, "2026-09-01", "16:00", "Late");
        must_create(&store, 1, "2026-09-01", "09:00", "Early");
        must_create(&store, 1, "2026-09-02", "10:00", "Other day");

        let day = store.find_by_date(1, d("2026-09-01")).unwrap();
        assert_eq!(day.len(), 2);
        assert_eq!(day[0].subject, "Early");
        assert_eq!(day[1].subject, "Late");
    }

    #[test]
    fn find_by_date_empty_when_nothing_matches() {
        let store = store();
        assert!(store.find_by_date(1, d("2026-09-01")).unwrap().is_empty());
    }

    #[test]
    fn update_subject_keeps_id_date_time() {
        let store = store();
        let a = must_create(&store, 1, "2026-09-01", "10:00", "Old subject");
        assert!(store.update_subject(1, a.id, "New subject").unwrap());

        let all = store.list_all(1).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, a.id);
        assert_eq!(all[0].date, a.date);
        assert_eq!(all[0].time, a.time);
        assert_eq!(all[0].subject, "New subject");
    }

    #[test]
    fn update_subject_unknown_id() {
        let store = store();
        assert!(!store.update_subject(1, 42, "Anything").unwrap());
    }

    #[test]
    fn update_subject_scoped_to_owner() {
        let store = store();
        let a = must_create(&store, 1, "2026-09-01", "10:00", "Mine");
        // Another owner cannot edit by guessing the id.
        assert!(!store.update_subject(2, a.id, "Hijacked").unwrap());
        assert_eq!(store.list_all(1).unwrap()[0].subject, "Mine");
    }

    #[test]
    fn reschedule_moves_record_in_place() {
        let store = store();
        let a = must_create(&store, 1, "2026-09-01", "10:00", "Sync");
        assert!(store.reschedule(1, a.id, d("2026-09-03"), t("14:30")).unwrap());

        // Exactly one record for that id, at the new slot.
        let all = store.list_all(1).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, a.id);
        assert_eq!(all[0].date, d("2026-09-03"));
        assert_eq!(all[0].time, t("14:30"));
        // Nothing left at the old slot.
        assert!(store.find_by_date(1, d("2026-09-01")).unwrap().is_empty());
    }

    #[test]
    fn reschedule_unknown_id() {
        let store = store();
        assert!(!store.reschedule(1, 9, d("2026-09-03"), t("14:30")).unwrap());
    }

    #[test]
    fn reschedule_scoped_to_owner() {
        let store = store();
        let a = must_create(&store, 1, "2026-09-01", "10:00", "Mine");
        assert!(!store.reschedule(2, a.id, d("2026-09-09"), t("09:00")).unwrap());
        assert_eq!(store.list_all(1).unwrap()[0].date, d("2026-09-01"));
    }

    #[test]
    fn delete_by_date_counts_removed_rows() {
        let store = store();
        must_create(&store, 1, "2026-09-01", "10:00", "A");
        must_create(&store, 1, "2026-09-01", "11:00", "B");
        must_create(&store, 1, "2026-09-02", "10:00", "C");

        assert_eq!(store.delete_by_date(1, d("2026-09-01")).unwrap(), 2);
        assert_eq!(store.delete_by_date(1, d("2026-09-01")).unwrap(), 0);
        assert_eq!(store.list_all(1).unwrap().len(), 1);
    }

    #[test]
    fn purge_resets_sequence_when_globally_empty() {
        let store = store();
        must_create(&store, 1, "2026-09-01", "10:00", "A");
        must_create(&store, 1, "2026-09-02", "10:00", "B");
        must_create(&store, 1, "2026-09-03", "10:00", "C");

        assert_eq!(store.purge_all(1).unwrap(), 3);

        // Store is globally empty: ids start over.
        let fresh = must_create(&store, 1, "2026-09-05", "10:00", "Fresh");
        assert_eq!(fresh.id, 1);
    }

    #[test]
    fn purge_keeps_sequence_while_other_owners_have_records() {
        let store = store();
        must_create(&store, 1, "2026-09-01", "10:00", "Mine");
        let theirs = must_create(&store, 2, "2026-09-01", "11:00", "Theirs");

        assert_eq!(store.purge_all(1).unwrap(), 1);

        // Owner 2 still has rows: the next id keeps increasing.
        let next = must_create(&store, 1, "2026-09-02", "10:00", "Again");
        assert!(next.id > theirs.id);
    }

    #[test]
    fn purge_empty_store_is_harmless() {
        let store = store();
        assert_eq!(store.purge_all(1).unwrap(), 0);
    }

    #[test]
    fn ledger_persists_across_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("agendabot.db");

        {
            let store = AppointmentStore::open(&path).unwrap();
            must_create(&store, 1, "2026-09-01", "10:00", "Standup");
        }

        let store = AppointmentStore::open(&path).unwrap();
        let all = store.list_all(1).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].subject, "Standup");

        // The id sequence also survives the reopen.
        let next = must_create(&store, 1, "2026-09-02", "10:00", "Review");
        assert_eq!(next.id, 2);
    }

    #[test]
    fn id_not_reused_after_partial_delete() {
        let store = store();
        let a = must_create(&store, 1, "2026-09-01", "10:00", "A");
        must_create(&store, 1, "2026-09-02", "10:00", "B");
        store.delete_by_date(1, d("2026-09-02")).unwrap();

        // Rows still exist, so the freed id must not come back.
        let c = must_create(&store, 1, "2026-09-03", "10:00", "C");
        assert!(c.id > a.id + 1);
    }
}
