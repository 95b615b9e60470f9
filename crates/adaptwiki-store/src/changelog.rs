use crate::{now_millis, StoreError};
use adaptwiki_model::{ChangeSet, FieldChange, PageKind, PageRecord, UserId};
use rusqlite::Connection;
use tracing::error;

/// One persisted field-diff row. The second source of the merged history
/// feed; rows are restricted to the four tracked kinds by construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeLogEntry {
    pub id: i64,
    pub entity_kind: PageKind,
    pub entity_id: i64,
    pub actor: Option<UserId>,
    pub timestamp: i64,
    pub object_repr: String,
    pub changes: ChangeSet,
}

/// Field-level diff of two page versions: title, live flag and every body
/// field; only changed fields appear.
#[must_use]
pub fn diff_pages(old: &PageRecord, new: &PageRecord) -> ChangeSet {
    let mut changes = ChangeSet::new();
    if old.title != new.title {
        changes.insert(
            "title".to_string(),
            FieldChange(old.title.clone(), new.title.clone()),
        );
    }
    if old.live != new.live {
        changes.insert(
            "live".to_string(),
            FieldChange(old.live.to_string(), new.live.to_string()),
        );
    }
    let old_fields = old.body.fields();
    for (name, new_value) in new.body.fields() {
        let old_value = old_fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
            .unwrap_or("");
        if old_value != new_value {
            changes.insert(
                name.to_string(),
                FieldChange(old_value.to_string(), new_value.to_string()),
            );
        }
    }
    changes
}

pub fn append(
    conn: &Connection,
    entity_kind: PageKind,
    entity_id: i64,
    actor: Option<UserId>,
    timestamp: i64,
    object_repr: &str,
    changes: &ChangeSet,
) -> Result<(), StoreError> {
    let changes_json =
        serde_json::to_string(changes).map_err(|e| StoreError(e.to_string()))?;
    conn.execute(
        "INSERT INTO change_log (entity_kind, entity_id, actor_id, timestamp, object_repr, changes)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            entity_kind.as_str(),
            entity_id,
            actor.map(|u| u.0),
            timestamp,
            object_repr,
            changes_json,
        ],
    )
    .map_err(|e| StoreError(e.to_string()))?;
    Ok(())
}

/// Diff recorder for updates. Best effort like the audit recorder; an empty
/// diff writes nothing.
pub fn record_update(
    conn: &Connection,
    old: &PageRecord,
    new: &PageRecord,
    actor: Option<UserId>,
) {
    let changes = diff_pages(old, new);
    if changes.is_empty() {
        return;
    }
    if let Err(e) = append(
        conn,
        new.kind(),
        new.id.0,
        actor,
        now_millis(),
        &new.title,
        &changes,
    ) {
        error!(error = %e, "change log write failed; continuing");
    }
}

/// Newest-first change rows, at most `limit`.
pub fn recent(conn: &Connection, limit: usize) -> Result<Vec<ChangeLogEntry>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, entity_kind, entity_id, actor_id, timestamp, object_repr, changes
             FROM change_log ORDER BY timestamp DESC, id DESC LIMIT ?1",
        )
        .map_err(|e| StoreError(e.to_string()))?;
    let rows = stmt
        .query_map([limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, Option<i64>>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, String>(6)?,
            ))
        })
        .map_err(|e| StoreError(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError(e.to_string()))?;

    let mut entries = Vec::with_capacity(rows.len());
    for (id, kind_raw, entity_id, actor, timestamp, object_repr, changes_raw) in rows {
        let Some(entity_kind) = PageKind::parse(&kind_raw) else {
            continue;
        };
        let changes: ChangeSet = serde_json::from_str(&changes_raw).unwrap_or_default();
        entries.push(ChangeLogEntry {
            id,
            entity_kind,
            entity_id,
            actor: actor.map(UserId),
            timestamp,
            object_repr,
            changes,
        });
    }
    Ok(entries)
}
