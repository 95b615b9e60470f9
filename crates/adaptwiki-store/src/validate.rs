use crate::{StoreError, PageWriteError};
use adaptwiki_model::{is_legal_child, kind_spec, PageId, PageKind, ValidationError};
use rusqlite::{Connection, OptionalExtension};

const INDICATOR_SELF_CAP_ERROR: &str = "An Indicator can only have up to 3 Metrics.";

/// Number of live children of `kind` under `parent_id`, excluding
/// `exclude` when given.
pub fn live_child_count(
    conn: &Connection,
    parent_id: PageId,
    kind: PageKind,
    exclude: Option<PageId>,
) -> Result<usize, StoreError> {
    let count: i64 = match exclude {
        Some(id) => conn
            .query_row(
                "SELECT COUNT(*) FROM pages WHERE parent_id = ?1 AND kind = ?2 AND live = 1 AND id != ?3",
                rusqlite::params![parent_id.0, kind.as_str(), id.0],
                |row| row.get(0),
            )
            .map_err(|e| StoreError(e.to_string()))?,
        None => conn
            .query_row(
                "SELECT COUNT(*) FROM pages WHERE parent_id = ?1 AND kind = ?2 AND live = 1",
                rusqlite::params![parent_id.0, kind.as_str()],
                |row| row.get(0),
            )
            .map_err(|e| StoreError(e.to_string()))?,
    };
    Ok(count as usize)
}

pub(crate) fn parent_kind_of(
    conn: &Connection,
    parent_id: PageId,
) -> Result<Option<PageKind>, StoreError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT kind FROM pages WHERE id = ?1",
            [parent_id.0],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError(e.to_string()))?;
    Ok(raw.as_deref().and_then(PageKind::parse))
}

/// Validation phase of a create-or-update. Read-only; a failure blocks
/// persistence and is surfaced to the editing workflow, never dropped.
///
/// `existing` is the candidate's id when it is already persisted. The
/// sibling-count read is not coupled to the later write; two concurrent
/// creations under the same parent can jointly exceed a cap (documented
/// gap, see DESIGN.md).
pub fn validate_candidate(
    conn: &Connection,
    kind: PageKind,
    parent_id: Option<PageId>,
    existing: Option<PageId>,
) -> Result<(), PageWriteError> {
    let parent_kind = match parent_id {
        Some(pid) => {
            let Some(pk) = parent_kind_of(conn, pid)? else {
                return Err(ValidationError::new("parent", "Parent page does not exist.").into());
            };
            Some(pk)
        }
        None => None,
    };

    if !is_legal_child(parent_kind, kind) {
        let under = match parent_kind {
            Some(pk) => format!("under a {}", pk.label()),
            None => "at the top level".to_string(),
        };
        return Err(ValidationError::title(format!(
            "A {} cannot be created {under}.",
            kind.label()
        ))
        .into());
    }

    let spec = kind_spec(kind);
    if let (Some(cap), Some(pid), Some(expected_parent)) =
        (spec.sibling_cap, parent_id, spec.parent_kinds.first())
    {
        // A parent of some other kind is governed by the legality check
        // above; the cap only applies under the declared container kind.
        if parent_kind == Some(*expected_parent) {
            let mut count = live_child_count(conn, pid, kind, existing)?;
            if existing.is_none() {
                count += 1;
            }
            if count > cap {
                let message = spec
                    .cap_error
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("At most {cap} live {} pages allowed.", kind.label()));
                return Err(ValidationError::title(message).into());
            }
        }
    }

    // An Indicator checks its own children only once it has a persisted
    // identity; a brand-new one cannot have children yet. Asymmetric by
    // design of the original workflow.
    if kind == PageKind::Indicator {
        if let Some(id) = existing {
            let metrics = live_child_count(conn, id, PageKind::Metric, None)?;
            if metrics > 3 {
                return Err(ValidationError::title(INDICATOR_SELF_CAP_ERROR).into());
            }
        }
    }

    Ok(())
}
