// SPDX-License-Identifier: Apache-2.0

use crate::kind::PageKind;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub i64);

impl Display for PageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl Display for UserId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user-recoverable validation failure, keyed by the offending field.
///
/// The message text is part of the UI contract and must be surfaced verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn title(message: impl Into<String>) -> Self {
        Self::new("title", message)
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct IndicatorBody {
    pub description: String,
    pub dimension: String,
    pub indicator_type: String,
    pub entry_author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct MetricBody {
    pub description: String,
    pub purpose: String,
    pub entry_author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct MethodBody {
    pub description: String,
    pub resolution: String,
    pub advantages: String,
    pub limitations: String,
    pub use_case: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct SopBody {
    pub definition: String,
    pub data_sources: String,
    pub units: String,
    pub frequency: String,
    pub geographic_scale: String,
    pub technical_capacity: String,
    pub activities_and_steps: String,
    pub options_enhancing_robustness: String,
    pub options_reducing_costs: String,
    pub available_tools_and_code: String,
    pub references: String,
    pub visual_content: String,
    pub flagship_method_status: String,
    pub entry_author: String,
}

/// Kind-specific page payload, discriminated by the `kind` tag on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageBody {
    Indicator(IndicatorBody),
    Metric(MetricBody),
    Method(MethodBody),
    Sop(SopBody),
}

impl PageBody {
    #[must_use]
    pub const fn kind(&self) -> PageKind {
        match self {
            Self::Indicator(_) => PageKind::Indicator,
            Self::Metric(_) => PageKind::Metric,
            Self::Method(_) => PageKind::Method,
            Self::Sop(_) => PageKind::Sop,
        }
    }

    #[must_use]
    pub fn empty(kind: PageKind) -> Self {
        match kind {
            PageKind::Indicator => Self::Indicator(IndicatorBody::default()),
            PageKind::Metric => Self::Metric(MetricBody::default()),
            PageKind::Method => Self::Method(MethodBody::default()),
            PageKind::Sop => Self::Sop(SopBody::default()),
        }
    }

    /// Every body field as `(name, value)` pairs, in declaration order.
    /// Drives both the field-diff change log and the search text.
    #[must_use]
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            Self::Indicator(b) => vec![
                ("description", b.description.as_str()),
                ("dimension", b.dimension.as_str()),
                ("indicator_type", b.indicator_type.as_str()),
                ("entry_author", b.entry_author.as_str()),
            ],
            Self::Metric(b) => vec![
                ("description", b.description.as_str()),
                ("purpose", b.purpose.as_str()),
                ("entry_author", b.entry_author.as_str()),
            ],
            Self::Method(b) => vec![
                ("description", b.description.as_str()),
                ("resolution", b.resolution.as_str()),
                ("advantages", b.advantages.as_str()),
                ("limitations", b.limitations.as_str()),
                ("use_case", b.use_case.as_str()),
            ],
            Self::Sop(b) => vec![
                ("definition", b.definition.as_str()),
                ("data_sources", b.data_sources.as_str()),
                ("units", b.units.as_str()),
                ("frequency", b.frequency.as_str()),
                ("geographic_scale", b.geographic_scale.as_str()),
                ("technical_capacity", b.technical_capacity.as_str()),
                ("activities_and_steps", b.activities_and_steps.as_str()),
                (
                    "options_enhancing_robustness",
                    b.options_enhancing_robustness.as_str(),
                ),
                ("options_reducing_costs", b.options_reducing_costs.as_str()),
                (
                    "available_tools_and_code",
                    b.available_tools_and_code.as_str(),
                ),
                ("references", b.references.as_str()),
                ("visual_content", b.visual_content.as_str()),
                ("flagship_method_status", b.flagship_method_status.as_str()),
                ("entry_author", b.entry_author.as_str()),
            ],
        }
    }

    #[must_use]
    pub fn entry_author(&self) -> Option<&str> {
        match self {
            Self::Indicator(b) => Some(b.entry_author.as_str()),
            Self::Metric(b) => Some(b.entry_author.as_str()),
            Self::Sop(b) => Some(b.entry_author.as_str()),
            Self::Method(_) => None,
        }
    }

    #[must_use]
    pub fn dimension(&self) -> Option<&str> {
        match self {
            Self::Indicator(b) => Some(b.dimension.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn indicator_type(&self) -> Option<&str> {
        match self {
            Self::Indicator(b) => Some(b.indicator_type.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn geographic_scale(&self) -> Option<&str> {
        match self {
            Self::Sop(b) => Some(b.geographic_scale.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn frequency(&self) -> Option<&str> {
        match self {
            Self::Sop(b) => Some(b.frequency.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationState {
    Draft,
    Submitted,
    Approved,
    Rejected,
}

impl ModerationState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "draft" => Some(Self::Draft),
            "submitted" => Some(Self::Submitted),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    pub id: PageId,
    pub parent_id: Option<PageId>,
    pub title: String,
    pub slug: String,
    pub live: bool,
    pub moderation: ModerationState,
    pub owner: Option<UserId>,
    pub body: PageBody,
    pub created_at: i64,
    pub updated_at: i64,
}

impl PageRecord {
    #[must_use]
    pub const fn kind(&self) -> PageKind {
        self.body.kind()
    }
}

/// Input for page creation; the store assigns id, slug (when absent) and
/// timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPage {
    #[serde(default)]
    pub parent_id: Option<PageId>,
    pub title: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub live: bool,
    #[serde(default)]
    pub owner: Option<UserId>,
    pub body: PageBody,
}

#[must_use]
pub fn slugify(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            for lc in c.to_lowercase() {
                out.push(lc);
            }
        } else {
            pending_dash = true;
        }
    }
    out
}
