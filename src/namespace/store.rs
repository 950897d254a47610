//! Namespace persistence using SQLite.
//!
//! Stores registered namespaces so they survive Flux restarts.
//! `entity_count` is runtime-derived and not persisted.

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::sync::Mutex;

use super::Namespace;

/// Persists namespace records in SQLite.
pub struct NamespaceStore {
    conn: Mutex<Connection>,
}

impl NamespaceStore {
    /// Opens (or creates) the SQLite database and ensures the table exists.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open namespace DB at {}", db_path))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_table()?;
        Ok(store)
    }

    fn create_table(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS namespaces (
                id         TEXT PRIMARY KEY,
                name       TEXT UNIQUE NOT NULL,
                token      TEXT NOT NULL,
                created_at TEXT NOT NULL
            );",
        )
        .context("Failed to create namespaces table")?;
        Ok(())
    }

    /// Inserts a new namespace. Fails if id or name already exists.
    pub fn insert(&self, ns: &Namespace) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO namespaces (id, name, token, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![ns.id, ns.name, ns.token, ns.created_at.to_rfc3339()],
        )
        .context("Failed to insert namespace")?;
        Ok(())
    }

    /// Deletes a namespace by name. Returns Ok(()) whether or not the row exists.
    pub fn delete(&self, name: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM namespaces WHERE name = ?1", params![name])
            .context("Failed to delete namespace")?;
        Ok(())
    }

    /// Returns all persisted namespaces ordered by creation time.
    pub fn load_all(&self) -> Result<Vec<Namespace>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, name, token, created_at FROM namespaces ORDER BY created_at ASC",
            )
            .context("Failed to prepare load_all query")?;
        let rows = stmt
            .query_map([], |row| {
                let id: String = row.get(0)?;
                let name: String = row.get(1)?;
                let token: String = row.get(2)?;
                let created_at_str: String = row.get(3)?;
                Ok((id, name, token, created_at_str))
            })
            .context("Failed to query namespaces")?;

        let mut namespaces = Vec::new();
        for row in rows {
            let (id, name, token, created_at_str) = row.context("Failed to read namespace row")?;
            let created_at = created_at_str
                .parse()
                .with_context(|| format!("Failed to parse created_at for namespace {}", id))?;
            namespaces.push(Namespace {
                id,
                name,
                token,
                created_at,
                entity_count: 0,
            });
        }
        Ok(namespaces)
    }
}
