//! SQLite persistence layer.
//!
//! RULE: Only store.rs talks to the database.
//! The engine reaches it through the Persistence trait and never executes SQL.

use rusqlite::{Connection, OptionalExtension, params};
use crate::{
    collaborators::Persistence,
    error::SimResult,
    event::{EventLogEntry, SimEvent},
    snapshot::SimSnapshot,
    types::DayNumber,
};

pub struct SimStore {
    conn: Connection,
}

impl SimStore {
    /// Open (or create) the simulation database at `path`.
    pub fn open(path: &str) -> SimResult<Self> {
        let conn = Connection::open(path)?;
        // WAL mode: better concurrent read performance.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> SimResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> SimResult<()> {
        self.conn.execute_batch(include_str!("../../migrations/001_foundation.sql"))?;
        Ok(())
    }

    // ── Run ────────────────────────────────────────────────────

    /// Returns false when the run already exists.
    pub fn insert_run(&self, run_id: &str, seed: u64, version: &str) -> SimResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO run (run_id, seed, version, started_at) VALUES (?1, ?2, ?3, ?4)",
            params![run_id, seed as i64, version, chrono::Utc::now().timestamp()],
        )?;
        Ok(inserted == 1)
    }

    pub fn run_seed(&self, run_id: &str) -> SimResult<Option<u64>> {
        let seed = self
            .conn
            .query_row("SELECT seed FROM run WHERE run_id = ?1", params![run_id], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?;
        Ok(seed.map(|s| s as u64))
    }

    // ── Event log ──────────────────────────────────────────────

    pub fn append_event(&self, entry: &EventLogEntry) -> SimResult<()> {
        insert_event(&self.conn, entry)
    }

    pub fn events_for_day(&self, run_id: &str, day: DayNumber) -> SimResult<Vec<EventLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, run_id, day, source, event_type, payload
             FROM event_log WHERE run_id = ?1 AND day = ?2
             ORDER BY id ASC"
        )?;
        let entries = stmt.query_map(params![run_id, day as i64], |row| {
            Ok(EventLogEntry {
                id:         Some(row.get(0)?),
                run_id:     row.get(1)?,
                day:        row.get::<_, i64>(2)? as u64,
                source:     row.get(3)?,
                event_type: row.get(4)?,
                payload:    row.get(5)?,
            })
        })?.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn event_count(&self, run_id: &str) -> SimResult<u64> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM event_log WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    // ── Snapshot ───────────────────────────────────────────────

    pub fn save_snapshot(&self, run_id: &str, day: DayNumber, state_json: &str) -> SimResult<()> {
        self.conn.execute(
            "INSERT INTO snapshot (run_id, day, state_json) VALUES (?1, ?2, ?3)",
            params![run_id, day as i64, state_json],
        )?;
        Ok(())
    }

    /// The most recently written snapshot for the run.
    pub fn latest_snapshot(&self, run_id: &str) -> SimResult<Option<(DayNumber, String)>> {
        let result = self
            .conn
            .query_row(
                "SELECT day, state_json FROM snapshot
                 WHERE run_id = ?1
                 ORDER BY id DESC LIMIT 1",
                params![run_id],
                |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, String>(1)?)),
            )
            .optional()?;
        Ok(result)
    }

    pub fn snapshot_count(&self, run_id: &str) -> SimResult<u64> {
        let n: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM snapshot WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }
}

impl Persistence for SimStore {
    fn register_run(&mut self, run_id: &str, seed: u64) -> SimResult<bool> {
        self.insert_run(run_id, seed, env!("CARGO_PKG_VERSION"))
    }

    fn save(&mut self, snapshot: &SimSnapshot) -> SimResult<()> {
        self.save_snapshot(&snapshot.run_id, snapshot.day_number, &snapshot.to_json()?)
    }

    fn load(&self, run_id: &str) -> SimResult<Option<String>> {
        Ok(self.latest_snapshot(run_id)?.map(|(_, json)| json))
    }

    fn append_events(&mut self, run_id: &str, day: DayNumber, events: &[SimEvent]) -> SimResult<()> {
        let tx = self.conn.transaction()?;
        for event in events {
            let entry = EventLogEntry::from_event(run_id, day, event.source(), event)?;
            insert_event(&tx, &entry)?;
        }
        tx.commit()?;
        Ok(())
    }
}

fn insert_event(conn: &Connection, entry: &EventLogEntry) -> SimResult<()> {
    conn.execute(
        "INSERT INTO event_log (run_id, day, source, event_type, payload)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            entry.run_id,
            entry.day as i64,
            entry.source,
            entry.event_type,
            entry.payload,
        ],
    )?;
    Ok(())
}
