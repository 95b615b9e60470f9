use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Framework bookkeeping fields that carry no editorial meaning; stripped
/// from diff change sets before display.
pub const EXCLUDED_DIFF_FIELDS: [&str; 3] = [
    "live_revision",
    "last_published_at",
    "has_unpublished_changes",
];

/// `(old, new)` pair for one changed field, serialized as a two-element
/// array to match the change-log row format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldChange(pub String, pub String);

pub type ChangeSet = BTreeMap<String, FieldChange>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySource {
    Lifecycle,
    Diff,
}

impl HistorySource {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lifecycle => "lifecycle",
            Self::Diff => "diff",
        }
    }
}

/// One row of the merged history feed. Derived on read, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergedHistoryEntry {
    pub timestamp: i64,
    pub user: Option<String>,
    pub action: String,
    pub subject_title: String,
    pub kind: String,
    pub changes: Option<ChangeSet>,
    pub source: HistorySource,
}

/// Resolve the display label for a raw action code. Unregistered codes fall
/// back to a title-cased slug-to-words transform.
#[must_use]
pub fn action_label(code: &str) -> String {
    match code {
        "create" => "Created".to_string(),
        "update" => "Updated".to_string(),
        "delete" => "Deleted".to_string(),
        other => title_case_slug(other),
    }
}

fn title_case_slug(code: &str) -> String {
    let mut out = String::with_capacity(code.len());
    for (i, word) in code
        .split(|c: char| c == '.' || c == '_' || c == '-' || c == ' ')
        .filter(|w| !w.is_empty())
        .enumerate()
    {
        if i > 0 {
            out.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            for uc in first.to_uppercase() {
                out.push(uc);
            }
        }
        for c in chars {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
        }
    }
    out
}
