use adaptwiki_model::{AdminPermission, Role, ALL_ROLES};
use adaptwiki_store::users;
use crate::AuthError;
use rusqlite::Connection;

/// Admin-area grants per role group.
///
/// Administrator gets the full set; Reviewer can edit, lock and publish and
/// approve moderation but not create; ContentDeveloper can create and edit
/// (and upload media) but not publish.
#[must_use]
pub const fn role_permissions(role: Role) -> &'static [AdminPermission] {
    match role {
        Role::Administrator => &[
            AdminPermission::AccessAdmin,
            AdminPermission::AddPage,
            AdminPermission::ChangePage,
            AdminPermission::PublishPage,
            AdminPermission::LockPage,
            AdminPermission::UnlockPage,
            AdminPermission::ApproveModeration,
            AdminPermission::AddImage,
            AdminPermission::ChangeImage,
            AdminPermission::AddDocument,
            AdminPermission::ChangeDocument,
        ],
        Role::Reviewer => &[
            AdminPermission::AccessAdmin,
            AdminPermission::ChangePage,
            AdminPermission::PublishPage,
            AdminPermission::LockPage,
            AdminPermission::UnlockPage,
            AdminPermission::ApproveModeration,
        ],
        Role::ContentDeveloper => &[
            AdminPermission::AccessAdmin,
            AdminPermission::AddPage,
            AdminPermission::ChangePage,
            AdminPermission::AddImage,
            AdminPermission::ChangeImage,
            AdminPermission::AddDocument,
            AdminPermission::ChangeDocument,
        ],
    }
}

/// Materialize the permission set of every role group that does not have
/// one yet. Existing grants are left untouched so a local administrator can
/// tailor them.
pub fn ensure_group_permissions(conn: &Connection) -> Result<(), AuthError> {
    for role in ALL_ROLES {
        if !users::role_has_permissions(conn, role).map_err(|e| AuthError(e.to_string()))? {
            users::grant_permissions(conn, role, role_permissions(role))
                .map_err(|e| AuthError(e.to_string()))?;
        }
    }
    Ok(())
}
