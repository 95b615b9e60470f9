use crate::kind::PageKind;
use crate::page::{PageRecord, UserId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
}

impl AuditAction {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl Display for AuditAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Summary of the affected page, captured at event time. Deliberately small:
/// enough to render a history row after the page itself is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSnapshot {
    pub id: i64,
    pub title: String,
    pub kind: PageKind,
}

impl AuditSnapshot {
    #[must_use]
    pub fn of(page: &PageRecord) -> Self {
        Self {
            id: page.id.0,
            title: page.title.clone(),
            kind: page.kind(),
        }
    }
}

/// Lifecycle event the page repository hands to the audit recorder after a
/// successful mutation. Explicit invocation; there is no hidden listener
/// registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    Saved {
        snapshot: AuditSnapshot,
        actor: Option<UserId>,
        created: bool,
    },
    Deleted {
        snapshot: AuditSnapshot,
    },
}

/// One append-only audit row. `action` is stored as raw text so the history
/// view can resolve labels for codes it does not know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub entity_kind: PageKind,
    pub entity_id: i64,
    pub action: String,
    pub changed_by: Option<UserId>,
    pub changed_at: i64,
    pub snapshot: serde_json::Value,
}
