use crate::{audit, changelog, now_millis, validate, PageWriteError, StoreError};
use adaptwiki_model::{
    slugify, AuditSnapshot, ModerationState, NewPage, PageBody, PageEvent, PageId, PageKind,
    PageRecord, UserId, ValidationError,
};
use rusqlite::{Connection, OptionalExtension};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdatePage {
    pub title: Option<String>,
    pub body: Option<PageBody>,
    pub live: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationVerb {
    Submit,
    Approve,
    Reject,
    Cancel,
}

impl ModerationVerb {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Submit => "submit",
            Self::Approve => "approve",
            Self::Reject => "reject",
            Self::Cancel => "cancel",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "submit" => Some(Self::Submit),
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

fn row_to_page(row: &rusqlite::Row<'_>) -> rusqlite::Result<PageRecord> {
    let id: i64 = row.get(0)?;
    let parent_id: Option<i64> = row.get(1)?;
    let kind_raw: String = row.get(2)?;
    let title: String = row.get(3)?;
    let slug: String = row.get(4)?;
    let live: bool = row.get::<_, i64>(5)? != 0;
    let moderation_raw: String = row.get(6)?;
    let owner: Option<i64> = row.get(7)?;
    let body_raw: String = row.get(8)?;
    let created_at: i64 = row.get(9)?;
    let updated_at: i64 = row.get(10)?;
    let page = PageRecord {
        id: PageId(id),
        parent_id: parent_id.map(PageId),
        title,
        slug,
        live,
        moderation: ModerationState::parse(&moderation_raw).unwrap_or(ModerationState::Draft),
        owner: owner.map(UserId),
        body: serde_json::from_str(&body_raw).unwrap_or_else(|_| {
            PageBody::empty(PageKind::parse(&kind_raw).unwrap_or(PageKind::Indicator))
        }),
        created_at,
        updated_at,
    };
    Ok(page)
}

const PAGE_COLUMNS: &str =
    "id, parent_id, kind, title, slug, live, moderation, owner_id, body, created_at, updated_at";

pub fn get_page(conn: &Connection, id: PageId) -> Result<Option<PageRecord>, StoreError> {
    conn.query_row(
        &format!("SELECT {PAGE_COLUMNS} FROM pages WHERE id = ?1"),
        [id.0],
        row_to_page,
    )
    .optional()
    .map_err(|e| StoreError(e.to_string()))
}

fn searchable_text(body: &PageBody) -> String {
    body.fields()
        .iter()
        .map(|(_, v)| *v)
        .filter(|v| !v.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn upsert_fts(conn: &Connection, page: &PageRecord) -> Result<(), StoreError> {
    conn.execute("DELETE FROM page_fts WHERE rowid = ?1", [page.id.0])
        .map_err(|e| StoreError(e.to_string()))?;
    conn.execute(
        "INSERT INTO page_fts (rowid, title, body_text) VALUES (?1, ?2, ?3)",
        rusqlite::params![page.id.0, page.title, searchable_text(&page.body)],
    )
    .map_err(|e| StoreError(e.to_string()))?;
    Ok(())
}

fn insert_row(conn: &Connection, page: &PageRecord) -> Result<PageId, StoreError> {
    let body_json =
        serde_json::to_string(&page.body).map_err(|e| StoreError(e.to_string()))?;
    conn.execute(
        "INSERT INTO pages (parent_id, kind, title, slug, live, moderation, owner_id,
                            dimension, indicator_type, geographic_scale, frequency, entry_author,
                            body, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        rusqlite::params![
            page.parent_id.map(|p| p.0),
            page.kind().as_str(),
            page.title,
            page.slug,
            page.live as i64,
            page.moderation.as_str(),
            page.owner.map(|u| u.0),
            page.body.dimension(),
            page.body.indicator_type(),
            page.body.geographic_scale(),
            page.body.frequency(),
            page.body.entry_author(),
            body_json,
            page.created_at,
            page.updated_at,
        ],
    )
    .map_err(|e| StoreError(e.to_string()))?;
    Ok(PageId(conn.last_insert_rowid()))
}

fn update_row(conn: &Connection, page: &PageRecord) -> Result<(), StoreError> {
    let body_json =
        serde_json::to_string(&page.body).map_err(|e| StoreError(e.to_string()))?;
    conn.execute(
        "UPDATE pages SET parent_id = ?2, title = ?3, slug = ?4, live = ?5, moderation = ?6,
                          owner_id = ?7, dimension = ?8, indicator_type = ?9,
                          geographic_scale = ?10, frequency = ?11, entry_author = ?12,
                          body = ?13, updated_at = ?14
         WHERE id = ?1",
        rusqlite::params![
            page.id.0,
            page.parent_id.map(|p| p.0),
            page.title,
            page.slug,
            page.live as i64,
            page.moderation.as_str(),
            page.owner.map(|u| u.0),
            page.body.dimension(),
            page.body.indicator_type(),
            page.body.geographic_scale(),
            page.body.frequency(),
            page.body.entry_author(),
            body_json,
            page.updated_at,
        ],
    )
    .map_err(|e| StoreError(e.to_string()))?;
    upsert_fts(conn, page)
}

pub fn create_page(conn: &Connection, new: &NewPage) -> Result<PageRecord, PageWriteError> {
    let kind = new.body.kind();
    validate::validate_candidate(conn, kind, new.parent_id, None)?;

    let now = now_millis();
    let mut page = PageRecord {
        id: PageId(0),
        parent_id: new.parent_id,
        title: new.title.clone(),
        slug: new
            .slug
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slugify(&new.title)),
        live: new.live,
        moderation: ModerationState::Draft,
        owner: new.owner,
        body: new.body.clone(),
        created_at: now,
        updated_at: now,
    };
    page.id = insert_row(conn, &page)?;
    upsert_fts(conn, &page)?;
    audit::record(
        conn,
        &PageEvent::Saved {
            snapshot: AuditSnapshot::of(&page),
            actor: page.owner,
            created: true,
        },
    );
    Ok(page)
}

pub fn update_page(
    conn: &Connection,
    id: PageId,
    update: &UpdatePage,
    actor: Option<UserId>,
) -> Result<PageRecord, PageWriteError> {
    let Some(old) = get_page(conn, id)? else {
        return Err(ValidationError::new("id", "Page does not exist.").into());
    };
    let mut page = old.clone();
    if let Some(title) = &update.title {
        page.title = title.clone();
    }
    if let Some(body) = &update.body {
        if body.kind() != old.kind() {
            return Err(
                ValidationError::title("A page cannot change its kind.").into(),
            );
        }
        page.body = body.clone();
    }
    if let Some(live) = update.live {
        page.live = live;
    }

    validate::validate_candidate(conn, page.kind(), page.parent_id, Some(id))?;

    page.updated_at = now_millis();
    update_row(conn, &page)?;
    changelog::record_update(conn, &old, &page, actor.or(page.owner));
    audit::record(
        conn,
        &PageEvent::Saved {
            snapshot: AuditSnapshot::of(&page),
            actor: actor.or(page.owner),
            created: false,
        },
    );
    Ok(page)
}

/// Delete a page and its whole subtree, deepest pages first. Each removed
/// page gets its own delete audit row with the snapshot captured before
/// removal and no actor (deletion context does not reliably carry one).
pub fn delete_page(conn: &Connection, id: PageId) -> Result<usize, PageWriteError> {
    let mut stmt = conn
        .prepare(
            "WITH RECURSIVE subtree(id, depth) AS (
               SELECT id, 0 FROM pages WHERE id = ?1
               UNION ALL
               SELECT p.id, s.depth + 1 FROM pages p JOIN subtree s ON p.parent_id = s.id
             )
             SELECT p.id, p.title, p.kind FROM pages p
             JOIN subtree s ON s.id = p.id ORDER BY s.depth DESC",
        )
        .map_err(|e| StoreError(e.to_string()))?;
    let doomed = stmt
        .query_map([id.0], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })
        .map_err(|e| StoreError(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError(e.to_string()))?;
    drop(stmt);

    if doomed.is_empty() {
        return Err(ValidationError::new("id", "Page does not exist.").into());
    }

    for (page_id, title, kind_raw) in &doomed {
        let snapshot = AuditSnapshot {
            id: *page_id,
            title: title.clone(),
            kind: PageKind::parse(kind_raw).unwrap_or(PageKind::Indicator),
        };
        conn.execute("DELETE FROM page_fts WHERE rowid = ?1", [*page_id])
            .map_err(|e| StoreError(e.to_string()))?;
        conn.execute("DELETE FROM pages WHERE id = ?1", [*page_id])
            .map_err(|e| StoreError(e.to_string()))?;
        audit::record(conn, &PageEvent::Deleted { snapshot });
    }
    Ok(doomed.len())
}

/// Moderation transition. Approval publishes the page. Illegal transitions
/// surface as field-keyed validation errors.
pub fn transition_moderation(
    conn: &Connection,
    id: PageId,
    verb: ModerationVerb,
    actor: Option<UserId>,
) -> Result<PageRecord, PageWriteError> {
    let Some(old) = get_page(conn, id)? else {
        return Err(ValidationError::new("id", "Page does not exist.").into());
    };
    let next = match (verb, old.moderation) {
        (ModerationVerb::Submit, ModerationState::Draft | ModerationState::Rejected) => {
            ModerationState::Submitted
        }
        (ModerationVerb::Approve, ModerationState::Submitted) => ModerationState::Approved,
        (ModerationVerb::Reject, ModerationState::Submitted) => ModerationState::Rejected,
        (ModerationVerb::Cancel, ModerationState::Submitted) => ModerationState::Draft,
        (verb, state) => {
            return Err(ValidationError::new(
                "moderation",
                format!("Cannot {} a page in state {}.", verb.as_str(), state.as_str()),
            )
            .into());
        }
    };

    let mut page = old.clone();
    page.moderation = next;
    if next == ModerationState::Approved {
        page.live = true;
    }
    page.updated_at = now_millis();
    update_row(conn, &page)?;
    changelog::record_update(conn, &old, &page, actor.or(page.owner));
    audit::record(
        conn,
        &PageEvent::Saved {
            snapshot: AuditSnapshot::of(&page),
            actor: actor.or(page.owner),
            created: false,
        },
    );
    Ok(page)
}
