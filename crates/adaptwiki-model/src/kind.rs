// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    Indicator,
    Metric,
    Method,
    Sop,
}

pub const ALL_KINDS: [PageKind; 4] = [
    PageKind::Indicator,
    PageKind::Metric,
    PageKind::Method,
    PageKind::Sop,
];

impl PageKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Indicator => "indicator",
            Self::Metric => "metric",
            Self::Method => "method",
            Self::Sop => "sop",
        }
    }

    /// Human-facing singular label, as shown in history rows and messages.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Indicator => "Indicator",
            Self::Metric => "Metric",
            Self::Method => "Method",
            Self::Sop => "SOP",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "indicator" => Some(Self::Indicator),
            "metric" => Some(Self::Metric),
            "method" => Some(Self::Method),
            "sop" => Some(Self::Sop),
            _ => None,
        }
    }
}

impl Display for PageKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static hierarchy rules for one page kind.
///
/// `parent_kinds` empty means the kind lives directly under the Home root.
/// `sibling_cap` bounds the number of live pages of this kind under a single
/// parent; `cap_error` is the exact message surfaced when the cap is hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindSpec {
    pub kind: PageKind,
    pub parent_kinds: &'static [PageKind],
    pub child_kinds: &'static [PageKind],
    pub sibling_cap: Option<usize>,
    pub cap_error: Option<&'static str>,
}

static KIND_TABLE: [KindSpec; 4] = [
    KindSpec {
        kind: PageKind::Indicator,
        parent_kinds: &[],
        child_kinds: &[PageKind::Metric],
        sibling_cap: None,
        cap_error: None,
    },
    KindSpec {
        kind: PageKind::Metric,
        parent_kinds: &[PageKind::Indicator],
        child_kinds: &[PageKind::Method, PageKind::Sop],
        sibling_cap: Some(3),
        cap_error: Some("Each Indicator can only have up to 3 Metrics."),
    },
    KindSpec {
        kind: PageKind::Method,
        parent_kinds: &[PageKind::Metric],
        child_kinds: &[],
        sibling_cap: None,
        cap_error: None,
    },
    KindSpec {
        kind: PageKind::Sop,
        parent_kinds: &[PageKind::Metric],
        child_kinds: &[],
        sibling_cap: Some(3),
        cap_error: Some("Each Metric can only have up to 3 SOPs."),
    },
];

#[must_use]
pub fn kind_spec(kind: PageKind) -> &'static KindSpec {
    match kind {
        PageKind::Indicator => &KIND_TABLE[0],
        PageKind::Metric => &KIND_TABLE[1],
        PageKind::Method => &KIND_TABLE[2],
        PageKind::Sop => &KIND_TABLE[3],
    }
}

/// Legality of nesting `child` under a parent of `parent_kind`.
///
/// `parent_kind` of `None` is the Home root.
#[must_use]
pub fn is_legal_child(parent_kind: Option<PageKind>, child: PageKind) -> bool {
    let spec = kind_spec(child);
    match parent_kind {
        None => spec.parent_kinds.is_empty(),
        Some(p) => spec.parent_kinds.contains(&p),
    }
}
