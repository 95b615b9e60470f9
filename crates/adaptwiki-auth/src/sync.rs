use crate::permissions::ensure_group_permissions;
use crate::AuthError;
use adaptwiki_model::{capability_for, Capability, IdentityClaims, Role, UserRecord};
use adaptwiki_store::users;
use rusqlite::Connection;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedUser {
    pub user: UserRecord,
    pub roles: BTreeSet<Role>,
    pub capability: Capability,
}

/// Per-login synchronization of a federated identity.
///
/// Resolution is by case-insensitive email; a claims document without one
/// resolves to no user (fail closed) rather than an error. A new account
/// starts with zero role groups and zero capability; every login refreshes
/// name fields and fully reconciles group membership, so an upstream
/// revocation is applied on the next login. Capability is recomputed from
/// the resulting membership and never cached.
pub fn sync_login(
    conn: &Connection,
    claims: &IdentityClaims,
) -> Result<Option<SyncedUser>, AuthError> {
    let Some(email) = claims.email() else {
        return Ok(None);
    };

    let user = match users::find_by_email(conn, email).map_err(|e| AuthError(e.to_string()))? {
        Some(existing) => refresh_user(conn, existing, claims, email)?,
        None => create_user(conn, claims, email)?,
    };

    ensure_group_permissions(conn)?;
    users::set_role_membership(conn, user.id, &claims.known_roles())
        .map_err(|e| AuthError(e.to_string()))?;

    let roles = users::roles_of(conn, user.id).map_err(|e| AuthError(e.to_string()))?;
    let capability = capability_for(&roles);
    Ok(Some(SyncedUser {
        user,
        roles,
        capability,
    }))
}

fn create_user(
    conn: &Connection,
    claims: &IdentityClaims,
    email: &str,
) -> Result<UserRecord, AuthError> {
    let preferred = claims
        .preferred_username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty());
    let mut username = preferred.unwrap_or(email);
    if users::username_taken(conn, username, None).map_err(|e| AuthError(e.to_string()))? {
        // Fall back to the email address before giving up.
        if username != email
            && !users::username_taken(conn, email, None).map_err(|e| AuthError(e.to_string()))?
        {
            username = email;
        } else {
            return Err(AuthError(format!("username already taken: {username}")));
        }
    }
    users::create(
        conn,
        username,
        email,
        claims.given_name.as_deref().unwrap_or(""),
        claims.family_name.as_deref().unwrap_or(""),
    )
    .map_err(|e| AuthError(e.to_string()))
}

fn refresh_user(
    conn: &Connection,
    mut user: UserRecord,
    claims: &IdentityClaims,
    email: &str,
) -> Result<UserRecord, AuthError> {
    user.first_name = claims.given_name.clone().unwrap_or_default();
    user.last_name = claims.family_name.clone().unwrap_or_default();
    user.email = email.to_string();
    user.is_active = true;

    // Adopt a changed preferred username only when no other account holds it.
    if let Some(preferred) = claims
        .preferred_username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty() && *u != user.username)
    {
        if !users::username_taken(conn, preferred, Some(user.id))
            .map_err(|e| AuthError(e.to_string()))?
        {
            user.username = preferred.to_string();
        }
    }

    users::update(conn, &user).map_err(|e| AuthError(e.to_string()))?;
    Ok(user)
}
