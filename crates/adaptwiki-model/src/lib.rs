// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Domain model for the AdaptWiki catalog.
//!
//! Pure data types and static rule tables; no I/O. The hierarchy rules live
//! in one lookup table ([`kind_spec`]) consulted uniformly by the store's
//! validator.

mod audit;
mod history;
mod identity;
mod kind;
mod page;

pub use audit::{AuditAction, AuditLogEntry, AuditSnapshot, PageEvent};
pub use history::{
    action_label, ChangeSet, FieldChange, HistorySource, MergedHistoryEntry, EXCLUDED_DIFF_FIELDS,
};
pub use identity::{
    capability_for, AdminPermission, Capability, IdentityClaims, RealmAccess, Role, UserRecord,
    ALL_ROLES,
};
pub use kind::{is_legal_child, kind_spec, KindSpec, PageKind, ALL_KINDS};
pub use page::{
    slugify, IndicatorBody, MethodBody, MetricBody, ModerationState, NewPage, PageBody, PageId,
    PageRecord, SopBody, UserId, ValidationError,
};

pub const CRATE_NAME: &str = "adaptwiki-model";
