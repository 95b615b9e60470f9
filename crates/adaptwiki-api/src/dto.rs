// SPDX-License-Identifier: Apache-2.0

use adaptwiki_model::{Capability, ChangeSet, MergedHistoryEntry, PageBody, Role};
use adaptwiki_query::{FacetOptions, KindCounts, PageWindow, SearchHit};
use serde::{Deserialize, Serialize};

/// Partial page edit; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdatePageRequest {
    pub title: Option<String>,
    pub body: Option<PageBody>,
    pub live: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: Option<String>,
    pub kind: Option<String>,
    pub results: Vec<SearchHit>,
    pub page: PageWindow,
    pub counts: KindCounts,
    pub facets: FacetOptions,
}

/// One rendered history row; the nullable source fields are already
/// resolved to their display fallbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub timestamp: i64,
    pub user: String,
    pub action: String,
    pub title: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub changes: Option<ChangeSet>,
    pub source: String,
}

impl From<MergedHistoryEntry> for HistoryRow {
    fn from(entry: MergedHistoryEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            user: entry.user.unwrap_or_else(|| "Unknown".to_string()),
            action: entry.action,
            title: entry.subject_title,
            kind: entry.kind,
            changes: entry.changes,
            source: entry.source.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub logs: Vec<HistoryRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub capability: Capability,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
