use crate::page::UserId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// The three role groups the identity provider may assert. Any other realm
/// role is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    Administrator,
    Reviewer,
    ContentDeveloper,
}

pub const ALL_ROLES: [Role; 3] = [Role::Administrator, Role::Reviewer, Role::ContentDeveloper];

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Administrator => "Administrator",
            Self::Reviewer => "Reviewer",
            Self::ContentDeveloper => "ContentDeveloper",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "Administrator" => Some(Self::Administrator),
            "Reviewer" => Some(Self::Reviewer),
            "ContentDeveloper" => Some(Self::ContentDeveloper),
            _ => None,
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Access level derived from current group membership. Recomputed at every
/// login; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    None,
    Staff,
    Admin,
}

#[must_use]
pub fn capability_for(roles: &BTreeSet<Role>) -> Capability {
    if roles.contains(&Role::Administrator) {
        Capability::Admin
    } else if roles.is_empty() {
        Capability::None
    } else {
        Capability::Staff
    }
}

/// Admin-area capabilities granted to role groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminPermission {
    AccessAdmin,
    AddPage,
    ChangePage,
    PublishPage,
    LockPage,
    UnlockPage,
    ApproveModeration,
    AddImage,
    ChangeImage,
    AddDocument,
    ChangeDocument,
}

impl AdminPermission {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessAdmin => "access_admin",
            Self::AddPage => "add_page",
            Self::ChangePage => "change_page",
            Self::PublishPage => "publish_page",
            Self::LockPage => "lock_page",
            Self::UnlockPage => "unlock_page",
            Self::ApproveModeration => "approve_moderation",
            Self::AddImage => "add_image",
            Self::ChangeImage => "change_image",
            Self::AddDocument => "add_document",
            Self::ChangeDocument => "change_document",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "access_admin" => Some(Self::AccessAdmin),
            "add_page" => Some(Self::AddPage),
            "change_page" => Some(Self::ChangePage),
            "publish_page" => Some(Self::PublishPage),
            "lock_page" => Some(Self::LockPage),
            "unlock_page" => Some(Self::UnlockPage),
            "approve_moderation" => Some(Self::ApproveModeration),
            "add_image" => Some(Self::AddImage),
            "change_image" => Some(Self::ChangeImage),
            "add_document" => Some(Self::AddDocument),
            "change_document" => Some(Self::ChangeDocument),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealmAccess {
    pub roles: Vec<String>,
}

/// Verified claims handed over by the identity provider integration.
/// Unknown claim fields are ignored on purpose; providers attach plenty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityClaims {
    pub email: Option<String>,
    pub preferred_username: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
    pub realm_access: Option<RealmAccess>,
}

impl IdentityClaims {
    /// Realm roles intersected with the locally known role set.
    #[must_use]
    pub fn known_roles(&self) -> BTreeSet<Role> {
        self.realm_access
            .as_ref()
            .map(|ra| ra.roles.iter().filter_map(|r| Role::parse(r)).collect())
            .unwrap_or_default()
    }

    /// Trimmed, non-empty email, or `None` (a login without one fails
    /// closed).
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_active: bool,
}

impl UserRecord {
    /// Display name for history rows: full name when present, else username.
    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}
