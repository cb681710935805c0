//! Shared store handle — the crate's concurrency discipline.
//!
//! Handlers have no multi-statement transaction guarantee from the
//! storage layer, so every check-then-act sequence runs while holding
//! this single connection lock: mutations are serialized per store.
//! The schema's unique indexes and CHECK constraints back the same
//! invariants at the row level.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::Connection;

use crate::db::{self, DatabaseError};
use crate::error::CareError;

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at `path` and run migrations.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(db::open_database(path)?),
        })
    }

    /// In-memory store (for testing).
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Ok(Self {
            conn: Mutex::new(db::open_memory_database()?),
        })
    }

    /// Acquire the connection for one operation. Held across the whole
    /// read-decide-write sequence of the calling service function.
    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, CareError> {
        self.conn.lock().map_err(|_| CareError::LockPoisoned)
    }
}
