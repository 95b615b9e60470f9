#![forbid(unsafe_code)]
//! Federated-identity handling for AdaptWiki.
//!
//! The identity provider verifies tokens and hands over claims; this crate
//! owns everything after that: resolving or creating the local account,
//! refreshing its fields, reconciling role-group membership in full, and
//! deriving the capability level for the current request.

mod permissions;
mod session;
mod sync;

#[cfg(test)]
mod sync_tests;

pub use permissions::{ensure_group_permissions, role_permissions};
pub use session::{SessionSigner, DEFAULT_SESSION_TTL_SECS};
pub use sync::{sync_login, SyncedUser};

pub const CRATE_NAME: &str = "adaptwiki-auth";

#[derive(Debug)]
pub struct AuthError(pub String);

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for AuthError {}
