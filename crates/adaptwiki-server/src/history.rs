use adaptwiki_model::{
    action_label, HistorySource, MergedHistoryEntry, UserId, EXCLUDED_DIFF_FIELDS,
};
use adaptwiki_store::{audit, changelog, users, StoreError};
use rusqlite::Connection;
use std::collections::HashMap;

/// Both sources are read and the merged feed truncated at this many rows.
pub const HISTORY_LIMIT: usize = 100;

struct NameCache<'a> {
    conn: &'a Connection,
    names: HashMap<i64, Option<String>>,
}

impl<'a> NameCache<'a> {
    fn new(conn: &'a Connection) -> Self {
        Self {
            conn,
            names: HashMap::new(),
        }
    }

    fn resolve(&mut self, user: Option<UserId>) -> Result<Option<String>, StoreError> {
        let Some(id) = user else { return Ok(None) };
        if let Some(cached) = self.names.get(&id.0) {
            return Ok(cached.clone());
        }
        let name = users::get(self.conn, id)?.map(|u| u.display_name());
        self.names.insert(id.0, name.clone());
        Ok(name)
    }
}

/// Merge the lifecycle log and the field-diff log into one feed: newest
/// first, stable on equal timestamps (lifecycle rows keep their position
/// ahead of diff rows), truncated to [`HISTORY_LIMIT`]. Read-only; either
/// source may be empty.
pub fn merged_history(conn: &Connection) -> Result<Vec<MergedHistoryEntry>, StoreError> {
    let mut names = NameCache::new(conn);
    let mut combined: Vec<MergedHistoryEntry> = Vec::new();

    for entry in audit::recent(conn, HISTORY_LIMIT)? {
        let subject_title = entry
            .snapshot
            .get("title")
            .and_then(|t| t.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| "Deleted page".to_string());
        combined.push(MergedHistoryEntry {
            timestamp: entry.changed_at,
            user: names.resolve(entry.changed_by)?,
            action: action_label(&entry.action),
            subject_title,
            kind: entry.entity_kind.as_str().to_string(),
            changes: None,
            source: HistorySource::Lifecycle,
        });
    }

    for entry in changelog::recent(conn, HISTORY_LIMIT)? {
        let mut changes = entry.changes;
        changes.retain(|field, _| !EXCLUDED_DIFF_FIELDS.contains(&field.as_str()));
        let subject_title = if entry.object_repr.is_empty() {
            format!("{} #{}", entry.entity_kind.as_str(), entry.entity_id)
        } else {
            entry.object_repr
        };
        combined.push(MergedHistoryEntry {
            timestamp: entry.timestamp,
            user: names.resolve(entry.actor)?,
            action: action_label("update"),
            subject_title,
            kind: entry.entity_kind.as_str().to_string(),
            changes: Some(changes),
            source: HistorySource::Diff,
        });
    }

    combined.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    combined.truncate(HISTORY_LIMIT);
    Ok(combined)
}
