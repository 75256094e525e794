use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::layout::LayoutDocument;
use crate::repository::{parse_layout_blob, LayoutRepository};

/// SQLite-backed account settings table holding one layout blob per account.
pub struct SettingsDb {
    conn: Connection,
}

impl SettingsDb {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|err| {
                    StoreError::Unavailable(format!(
                        "could not create settings directory {}: {}",
                        parent.display(),
                        err
                    ))
                })?;
            }
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let settings_db = Self { conn };
        settings_db.initialize_schema()?;
        settings_db.migrate()?;
        Ok(settings_db)
    }

    fn initialize_schema(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS account_settings (
                account_id TEXT PRIMARY KEY,
                dashboard_layout TEXT,
                updated_at INTEGER NOT NULL DEFAULT 0
            )",
            [],
        )?;
        Ok(())
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        // Older databases predate the updated_at column
        let mut stmt = self.conn.prepare("PRAGMA table_info(account_settings)")?;
        let columns = stmt.query_map([], |row| row.get::<_, String>(1))?;
        let mut has_updated_at = false;
        for col in columns {
            if col? == "updated_at" {
                has_updated_at = true;
                break;
            }
        }

        if !has_updated_at {
            debug!("Adding updated_at column to account_settings");
            self.conn.execute(
                "ALTER TABLE account_settings ADD COLUMN updated_at INTEGER NOT NULL DEFAULT 0",
                [],
            )?;
        }
        Ok(())
    }

    /// Returns the raw stored layout blob for an account.
    pub fn layout_blob(&self, account_id: &str) -> Result<Option<String>, rusqlite::Error> {
        let blob: Option<Option<String>> = self
            .conn
            .query_row(
                "SELECT dashboard_layout FROM account_settings WHERE account_id = ?1",
                params![account_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(blob.flatten())
    }

    /// Writes a raw layout blob, replacing any previous value.
    pub fn put_layout_blob(&self, account_id: &str, blob: &str) -> Result<(), rusqlite::Error> {
        let updated_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs() as i64)
            .unwrap_or_default();
        self.conn.execute(
            "INSERT INTO account_settings (account_id, dashboard_layout, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(account_id) DO UPDATE SET
                dashboard_layout = excluded.dashboard_layout,
                updated_at = excluded.updated_at",
            params![account_id, blob, updated_at],
        )?;
        Ok(())
    }

    pub fn layout_updated_at(&self, account_id: &str) -> Result<Option<i64>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT updated_at FROM account_settings WHERE account_id = ?1",
                params![account_id],
                |row| row.get(0),
            )
            .optional()
    }
}

impl LayoutRepository for SettingsDb {
    fn load(&self, account_id: &str) -> Result<Option<LayoutDocument>, StoreError> {
        Ok(self
            .layout_blob(account_id)?
            .and_then(|blob| parse_layout_blob(account_id, &blob)))
    }

    fn save(&mut self, account_id: &str, document: &LayoutDocument) -> Result<(), StoreError> {
        let blob = serde_json::to_string(document)?;
        self.put_layout_blob(account_id, &blob)?;
        Ok(())
    }
}
