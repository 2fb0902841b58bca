use crate::Database;
use crate::models::{EventRow, MyEventRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, ErrorCode, TransactionBehavior};
use tracing::debug;

/// Registrations for one user joined against events. Driven by the
/// (username, event_id) primary key, so the registrations side is a pure
/// index search and the key already yields event_id order (no sort step).
const MY_EVENTS_SQL: &str = "SELECT e.name, e.fee
     FROM registrations r
     JOIN events e ON e.id = r.event_id
     WHERE r.username = ?1
     ORDER BY r.event_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInsert {
    Created,
    UsernameTaken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationInsert {
    Created,
    AlreadyRegistered,
    EventNotFound,
}

impl Database {
    // -- Users --

    /// Insert a user, reporting a taken username instead of failing.
    pub fn insert_user(&self, username: &str, password: &str) -> Result<UserInsert> {
        self.with_conn_mut(|conn| {
            match conn.execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                (username, password),
            ) {
                Ok(_) => Ok(UserInsert::Created),
                Err(e) if is_unique_violation(&e) => Ok(UserInsert::UsernameTaken),
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, username))
    }

    // -- Events --

    pub fn insert_event(&self, name: &str, fee: i64) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute("INSERT INTO events (name, fee) VALUES (?1, ?2)", (name, fee))?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Insert `events` only if the events table is empty. Returns how many
    /// rows were written.
    pub fn seed_events(&self, events: &[(String, i64)]) -> Result<usize> {
        if events.is_empty() {
            return Ok(0);
        }

        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let existing: i64 = tx.query_row("SELECT COUNT(*) FROM events", [], |r| r.get(0))?;
            if existing > 0 {
                debug!("Skipping event seed, {} events already present", existing);
                return Ok(0);
            }

            {
                let mut stmt = tx.prepare("INSERT INTO events (name, fee) VALUES (?1, ?2)")?;
                for (name, fee) in events {
                    stmt.execute((name, fee))?;
                }
            }
            tx.commit()?;
            Ok(events.len())
        })
    }

    pub fn event_exists(&self, event_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM events WHERE id = ?1", [event_id], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn list_events(&self) -> Result<Vec<EventRow>> {
        self.with_conn(query_events)
    }

    // -- Registrations --

    /// Register `username` for `event_id`. The existence check and the
    /// insert share one write transaction, so a row is never written for a
    /// missing event and a repeat call leaves the single existing row alone.
    pub fn insert_registration(&self, username: &str, event_id: i64) -> Result<RegistrationInsert> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

            let exists = tx
                .query_row("SELECT 1 FROM events WHERE id = ?1", [event_id], |_| Ok(()))
                .optional()?
                .is_some();
            if !exists {
                return Ok(RegistrationInsert::EventNotFound);
            }

            let inserted = tx.execute(
                "INSERT OR IGNORE INTO registrations (username, event_id) VALUES (?1, ?2)",
                rusqlite::params![username, event_id],
            )?;
            tx.commit()?;

            Ok(if inserted == 0 {
                RegistrationInsert::AlreadyRegistered
            } else {
                RegistrationInsert::Created
            })
        })
    }

    pub fn list_events_for_user(&self, username: &str) -> Result<Vec<MyEventRow>> {
        self.with_conn(|conn| query_events_for_user(conn, username))
    }

    pub fn count_registrations(&self, username: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM registrations WHERE username = ?1",
                [username],
                |r| r.get(0),
            )?)
        })
    }

    /// Query plan of the my-events join, one line per plan step.
    pub fn explain_my_events(&self, username: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("EXPLAIN QUERY PLAN {}", MY_EVENTS_SQL))?;
            let steps = stmt
                .query_map([username], |row| row.get::<_, String>(3))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(steps)
        })
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
            && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
    )
}

fn query_user(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare_cached("SELECT username, password, created_at FROM users WHERE username = ?1")?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                username: row.get(0)?,
                password: row.get(1)?,
                created_at: row.get(2)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_events(conn: &Connection) -> Result<Vec<EventRow>> {
    let mut stmt = conn.prepare_cached("SELECT id, name, fee FROM events ORDER BY id")?;

    let rows = stmt
        .query_map([], |row| {
            Ok(EventRow {
                id: row.get(0)?,
                name: row.get(1)?,
                fee: row.get(2)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_events_for_user(conn: &Connection, username: &str) -> Result<Vec<MyEventRow>> {
    let mut stmt = conn.prepare_cached(MY_EVENTS_SQL)?;

    let rows = stmt
        .query_map([username], |row| {
            Ok(MyEventRow {
                name: row.get(0)?,
                fee: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreOptions;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn open() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db"), &StoreOptions::default()).unwrap();
        (dir, db)
    }

    #[test]
    fn duplicate_username_reported() {
        let (_dir, db) = open();
        assert_eq!(db.insert_user("alice", "pw1").unwrap(), UserInsert::Created);
        assert_eq!(db.insert_user("alice", "other").unwrap(), UserInsert::UsernameTaken);

        let user = db.get_user("alice").unwrap().unwrap();
        assert_eq!(user.password, "pw1");
        assert!(!user.created_at.is_empty());
    }

    #[test]
    fn missing_user_is_none() {
        let (_dir, db) = open();
        assert!(db.get_user("nobody").unwrap().is_none());
    }

    #[test]
    fn registration_is_idempotent() {
        let (_dir, db) = open();
        let id = db.insert_event("Hack Night", 500).unwrap();

        assert_eq!(db.insert_registration("alice", id).unwrap(), RegistrationInsert::Created);
        assert_eq!(
            db.insert_registration("alice", id).unwrap(),
            RegistrationInsert::AlreadyRegistered
        );
        assert_eq!(db.count_registrations("alice").unwrap(), 1);
    }

    #[test]
    fn unknown_event_writes_nothing() {
        let (_dir, db) = open();
        assert_eq!(
            db.insert_registration("alice", 42).unwrap(),
            RegistrationInsert::EventNotFound
        );
        assert_eq!(db.count_registrations("alice").unwrap(), 0);
        assert!(!db.event_exists(42).unwrap());
    }

    #[test]
    fn my_events_joins_fee_and_name() {
        let (_dir, db) = open();
        let hack = db.insert_event("Hack Night", 500).unwrap();
        let talk = db.insert_event("Tech Talk", 0).unwrap();
        db.insert_event("Unvisited", 100).unwrap();

        db.insert_registration("alice", talk).unwrap();
        db.insert_registration("alice", hack).unwrap();
        db.insert_registration("bob", hack).unwrap();

        let rows = db.list_events_for_user("alice").unwrap();
        let got: Vec<(String, i64)> = rows.into_iter().map(|r| (r.name, r.fee)).collect();
        assert_eq!(
            got,
            vec![("Hack Night".to_string(), 500), ("Tech Talk".to_string(), 0)]
        );
        assert!(db.list_events_for_user("carol").unwrap().is_empty());
    }

    #[test]
    fn seed_only_fills_empty_table() {
        let (_dir, db) = open();
        let seed = vec![("Hack Night".to_string(), 500), ("Workshop".to_string(), 250)];

        assert_eq!(db.seed_events(&seed).unwrap(), 2);
        assert_eq!(db.seed_events(&seed).unwrap(), 0);

        let events = db.list_events().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, 1);
        assert_eq!(events[0].name, "Hack Night");
    }

    #[test]
    fn my_events_plan_searches_registrations() {
        let (_dir, db) = open();
        let id = db.insert_event("Hack Night", 500).unwrap();
        db.insert_registration("alice", id).unwrap();

        let plan = db.explain_my_events("alice").unwrap();
        assert!(!plan.is_empty());
        assert!(
            plan.iter().all(|step| !step.starts_with("SCAN r")),
            "registrations scanned: {plan:?}"
        );
        assert!(
            plan.iter().all(|step| !step.contains("TEMP B-TREE")),
            "my-events sorts: {plan:?}"
        );
    }

    #[test]
    fn reopen_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reopen.db");
        {
            let db = Database::open(&path, &StoreOptions::default()).unwrap();
            db.insert_user("alice", "pw1").unwrap();
        }
        let db = Database::open(&path, &StoreOptions::default()).unwrap();
        assert!(db.get_user("alice").unwrap().is_some());
    }

    #[test]
    fn concurrent_registrations_leave_one_row() {
        let (_dir, db) = open();
        let db = Arc::new(db);
        let id = db.insert_event("Hack Night", 500).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let db = db.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        db.insert_registration("alice", id).unwrap();
                        db.list_events_for_user("alice").unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(db.count_registrations("alice").unwrap(), 1);
    }
}
