// SPDX-License-Identifier: Apache-2.0

use crate::StoreError;
use rusqlite::Connection;
use std::path::Path;

pub const SCHEMA_VERSION: i64 = 1;

pub fn open(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path).map_err(|e| StoreError(e.to_string()))?;
    conn.execute_batch(
        "
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        PRAGMA foreign_keys=ON;
        ",
    )
    .map_err(|e| StoreError(e.to_string()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection, StoreError> {
    let conn = Connection::open_in_memory().map_err(|e| StoreError(e.to_string()))?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")
        .map_err(|e| StoreError(e.to_string()))?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS pages (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          parent_id INTEGER REFERENCES pages(id),
          kind TEXT NOT NULL,
          title TEXT NOT NULL,
          slug TEXT NOT NULL,
          live INTEGER NOT NULL DEFAULT 0,
          moderation TEXT NOT NULL DEFAULT 'draft',
          owner_id INTEGER,
          dimension TEXT,
          indicator_type TEXT,
          geographic_scale TEXT,
          frequency TEXT,
          entry_author TEXT,
          body TEXT NOT NULL,
          created_at INTEGER NOT NULL,
          updated_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_pages_parent_kind ON pages(parent_id, kind, live);
        CREATE INDEX IF NOT EXISTS idx_pages_kind_live ON pages(kind, live);
        CREATE VIRTUAL TABLE IF NOT EXISTS page_fts USING fts5(title, body_text);
        CREATE TABLE IF NOT EXISTS audit_log (
          id INTEGER PRIMARY KEY,
          entity_kind TEXT NOT NULL,
          entity_id INTEGER NOT NULL,
          action TEXT NOT NULL,
          changed_by INTEGER,
          changed_at INTEGER NOT NULL,
          snapshot TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_audit_log_changed_at ON audit_log(changed_at);
        CREATE TABLE IF NOT EXISTS change_log (
          id INTEGER PRIMARY KEY,
          entity_kind TEXT NOT NULL,
          entity_id INTEGER NOT NULL,
          actor_id INTEGER,
          timestamp INTEGER NOT NULL,
          object_repr TEXT NOT NULL,
          changes TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_change_log_timestamp ON change_log(timestamp);
        CREATE TABLE IF NOT EXISTS users (
          id INTEGER PRIMARY KEY,
          username TEXT NOT NULL UNIQUE,
          email TEXT NOT NULL,
          first_name TEXT NOT NULL DEFAULT '',
          last_name TEXT NOT NULL DEFAULT '',
          is_active INTEGER NOT NULL DEFAULT 1
        );
        CREATE INDEX IF NOT EXISTS idx_users_email ON users(email COLLATE NOCASE);
        CREATE TABLE IF NOT EXISTS role_members (
          user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
          role TEXT NOT NULL,
          PRIMARY KEY (user_id, role)
        );
        CREATE TABLE IF NOT EXISTS role_permissions (
          role TEXT NOT NULL,
          permission TEXT NOT NULL,
          PRIMARY KEY (role, permission)
        );
        CREATE TABLE IF NOT EXISTS wiki_meta (
          k TEXT PRIMARY KEY,
          v TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| StoreError(e.to_string()))?;
    conn.execute(
        "INSERT OR REPLACE INTO wiki_meta (k, v) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )
    .map_err(|e| StoreError(e.to_string()))?;
    Ok(())
}
