//! Generic connector config storage.
//!
//! Stores user-defined HTTP polling sources in SQLite. Each source defines a URL,
//! poll interval, entity key/namespace, and optional auth.
//!
//! # Credential storage
//! Generic tokens are NOT stored in this table. They are stored in the existing
//! CredentialStore under `user_id="generic"`, `connector_name=<source-id>`.
//! This reuses all encryption/access-control infrastructure without new plumbing.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Auth scheme for a generic HTTP source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AuthType {
    /// No authentication.
    None,
    /// `Authorization: Bearer <token>` header. Token from CredentialStore.
    BearerToken,
    /// Custom API key header. Token from CredentialStore.
    ApiKeyHeader { header_name: String },
}

/// Config for a single generic HTTP polling source.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenericSourceConfig {
    /// Unique source ID (UUIDv4).
    pub id: String,
    /// Human-readable label shown in the UI.
    pub name: String,
    /// URL to poll.
    pub url: String,
    /// How often to poll (seconds).
    pub poll_interval_secs: u64,
    /// Fixed string or JSON path expression used as the Flux entity key.
    pub entity_key: String,
    /// Flux namespace to publish entities under.
    pub namespace: String,
    /// Authentication scheme (token stored separately in CredentialStore).
    pub auth_type: AuthType,
    /// When this source was created.
    pub created_at: DateTime<Utc>,
    /// Optional Flux namespace token for auth-enabled Flux instances.
    pub flux_namespace_token: Option<String>,
}

/// Persists generic source configs in SQLite.
pub struct GenericConfigStore {
    conn: Mutex<Connection>,
}

impl GenericConfigStore {
    /// Opens (or creates) the SQLite database and ensures the table exists.
    pub fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open generic config DB at {}", db_path))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_table()?;
        store.migrate()?;
        Ok(store)
    }

    /// Creates the `generic_sources` table if it does not already exist.
    pub fn create_table(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS generic_sources (
                id                TEXT PRIMARY KEY,
                name              TEXT NOT NULL,
                url               TEXT NOT NULL,
                poll_interval_secs INTEGER NOT NULL,
                entity_key        TEXT NOT NULL,
                namespace         TEXT NOT NULL,
                auth_type_json    TEXT NOT NULL,
                created_at        TEXT NOT NULL,
                flux_namespace_token TEXT
            );",
        )
        .context("Failed to create generic_sources table")?;
        Ok(())
    }

    /// Adds `flux_namespace_token` column to existing databases.
    fn migrate(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let result = conn.execute_batch(
            "ALTER TABLE generic_sources ADD COLUMN flux_namespace_token TEXT;",
        );
        if let Err(e) = result {
            if !e.to_string().contains("duplicate column") {
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Inserts a new generic source config. Fails if `id` already exists.
    pub fn insert(&self, config: &GenericSourceConfig) -> Result<()> {
        let auth_json =
            serde_json::to_string(&config.auth_type).context("Failed to serialize auth_type")?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO generic_sources
                (id, name, url, poll_interval_secs, entity_key, namespace, auth_type_json, created_at, flux_namespace_token)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                config.id,
                config.name,
                config.url,
                config.poll_interval_secs as i64,
                config.entity_key,
                config.namespace,
                auth_json,
                config.created_at.to_rfc3339(),
                config.flux_namespace_token,
            ],
        )
        .context("Failed to insert generic source config")?;
        Ok(())
    }

    /// Returns a single source by ID, or `None` if not found.
    pub fn get(&self, id: &str) -> Result<Option<GenericSourceConfig>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, url, poll_interval_secs, entity_key, namespace, auth_type_json, created_at, flux_namespace_token
             FROM generic_sources WHERE id = ?1",
        )?;
        let mut rows = stmt.query(params![id])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row_to_config(row)?))
        } else {
            Ok(None)
        }
    }

    /// Returns all source configs ordered by creation time.
    pub fn list(&self) -> Result<Vec<GenericSourceConfig>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, url, poll_interval_secs, entity_key, namespace, auth_type_json, created_at, flux_namespace_token
             FROM generic_sources ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(row_to_config(row).expect("row_to_config failed"))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list generic source configs")
    }

    /// Deletes a source by ID. No-op if the ID does not exist.
    pub fn delete(&self, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM generic_sources WHERE id = ?1", params![id])
            .context("Failed to delete generic source config")?;
        Ok(())
    }
}

fn row_to_config(row: &rusqlite::Row<'_>) -> rusqlite::Result<GenericSourceConfig> {
    let id: String = row.get(0)?;
    let name: String = row.get(1)?;
    let url: String = row.get(2)?;
    let poll_interval_secs: i64 = row.get(3)?;
    let entity_key: String = row.get(4)?;
    let namespace: String = row.get(5)?;
    let auth_type_json: String = row.get(6)?;
    let created_at_str: String = row.get(7)?;
    let flux_namespace_token: Option<String> = row.get(8)?;

    let auth_type: AuthType =
        serde_json::from_str(&auth_type_json).expect("Failed to deserialize auth_type");
    let created_at: DateTime<Utc> =
        created_at_str.parse().expect("Failed to parse created_at");

    Ok(GenericSourceConfig {
        id,
        name,
        url,
        poll_interval_secs: poll_interval_secs as u64,
        entity_key,
        namespace,
        auth_type,
        created_at,
        flux_namespace_token,
    })
}
