use crate::{now_millis, StoreError};
use adaptwiki_model::{AuditAction, AuditLogEntry, PageEvent, PageKind, UserId};
use rusqlite::Connection;
use tracing::error;

/// Append one audit row with an explicit timestamp.
pub fn append(
    conn: &Connection,
    entity_kind: PageKind,
    entity_id: i64,
    action: &str,
    changed_by: Option<UserId>,
    changed_at: i64,
    snapshot: &serde_json::Value,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO audit_log (entity_kind, entity_id, action, changed_by, changed_at, snapshot)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            entity_kind.as_str(),
            entity_id,
            action,
            changed_by.map(|u| u.0),
            changed_at,
            snapshot.to_string(),
        ],
    )
    .map_err(|e| StoreError(e.to_string()))?;
    Ok(())
}

/// Audit recorder entry point, invoked by the page repository directly
/// after each successful mutation. Best effort: a failed insert is
/// reported to the operator log and never propagated to the caller.
pub fn record(conn: &Connection, event: &PageEvent) {
    let result = match event {
        PageEvent::Saved {
            snapshot,
            actor,
            created,
        } => {
            let action = if *created {
                AuditAction::Create
            } else {
                AuditAction::Update
            };
            serde_json::to_value(snapshot)
                .map_err(|e| StoreError(e.to_string()))
                .and_then(|value| {
                    append(
                        conn,
                        snapshot.kind,
                        snapshot.id,
                        action.as_str(),
                        *actor,
                        now_millis(),
                        &value,
                    )
                })
        }
        PageEvent::Deleted { snapshot } => serde_json::to_value(snapshot)
            .map_err(|e| StoreError(e.to_string()))
            .and_then(|value| {
                append(
                    conn,
                    snapshot.kind,
                    snapshot.id,
                    AuditAction::Delete.as_str(),
                    None,
                    now_millis(),
                    &value,
                )
            }),
    };
    if let Err(e) = result {
        error!(error = %e, "audit log write failed; continuing");
    }
}

/// Newest-first audit rows, at most `limit`.
pub fn recent(conn: &Connection, limit: usize) -> Result<Vec<AuditLogEntry>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, entity_kind, entity_id, action, changed_by, changed_at, snapshot
             FROM audit_log ORDER BY changed_at DESC, id DESC LIMIT ?1",
        )
        .map_err(|e| StoreError(e.to_string()))?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<i64>>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, String>(6)?,
            ))
        })
        .map_err(|e| StoreError(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError(e.to_string()))?;

    let mut entries = Vec::with_capacity(rows.len());
    for (id, kind_raw, entity_id, action, changed_by, changed_at, snapshot_raw) in rows {
        let Some(entity_kind) = PageKind::parse(&kind_raw) else {
            continue;
        };
        let snapshot =
            serde_json::from_str(&snapshot_raw).unwrap_or(serde_json::Value::Null);
        entries.push(AuditLogEntry {
            id,
            entity_kind,
            entity_id,
            action,
            changed_by: changed_by.map(UserId),
            changed_at,
            snapshot,
        });
    }
    Ok(entries)
}
