#![forbid(unsafe_code)]
//! SQLite persistence for AdaptWiki.
//!
//! The page repository runs the hierarchy validator before every write and
//! hands a [`adaptwiki_model::PageEvent`] to the audit recorder after each
//! successful mutation (explicit invocation, no listener registry). Audit
//! and change-log writes are best effort: their failures are logged and do
//! not block the triggering operation.

use adaptwiki_model::ValidationError;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

pub mod audit;
pub mod changelog;
pub mod pages;
pub mod schema;
pub mod users;
pub mod validate;

#[cfg(test)]
mod users_tests;

pub use changelog::ChangeLogEntry;
pub use pages::{ModerationVerb, UpdatePage};
pub use schema::{init_schema, open, open_in_memory, SCHEMA_VERSION};

pub const CRATE_NAME: &str = "adaptwiki-store";

#[derive(Debug)]
pub struct StoreError(pub String);

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for StoreError {}

/// A page write either fails validation (user-recoverable, field-keyed) or
/// fails in the store itself.
#[derive(Debug)]
pub enum PageWriteError {
    Invalid(ValidationError),
    Store(StoreError),
}

impl Display for PageWriteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(e) => write!(f, "{e}"),
            Self::Store(e) => write!(f, "{e}"),
        }
    }
}
impl std::error::Error for PageWriteError {}

impl From<ValidationError> for PageWriteError {
    fn from(e: ValidationError) -> Self {
        Self::Invalid(e)
    }
}

impl From<StoreError> for PageWriteError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
