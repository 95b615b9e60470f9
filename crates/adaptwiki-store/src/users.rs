use crate::StoreError;
use adaptwiki_model::{AdminPermission, Role, UserId, UserRecord, ALL_ROLES};
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeSet;

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    Ok(UserRecord {
        id: UserId(row.get(0)?),
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        is_active: row.get::<_, i64>(5)? != 0,
    })
}

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, is_active";

/// Case-insensitive email lookup; the oldest account wins when several
/// share an address.
pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<UserRecord>, StoreError> {
    conn.query_row(
        &format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?1 COLLATE NOCASE ORDER BY id LIMIT 1"
        ),
        [email],
        row_to_user,
    )
    .optional()
    .map_err(|e| StoreError(e.to_string()))
}

pub fn get(conn: &Connection, id: UserId) -> Result<Option<UserRecord>, StoreError> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id.0],
        row_to_user,
    )
    .optional()
    .map_err(|e| StoreError(e.to_string()))
}

pub fn username_taken(
    conn: &Connection,
    username: &str,
    exclude: Option<UserId>,
) -> Result<bool, StoreError> {
    let count: i64 = match exclude {
        Some(id) => conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE username = ?1 AND id != ?2",
                rusqlite::params![username, id.0],
                |row| row.get(0),
            )
            .map_err(|e| StoreError(e.to_string()))?,
        None => conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE username = ?1",
                [username],
                |row| row.get(0),
            )
            .map_err(|e| StoreError(e.to_string()))?,
    };
    Ok(count > 0)
}

pub fn create(
    conn: &Connection,
    username: &str,
    email: &str,
    first_name: &str,
    last_name: &str,
) -> Result<UserRecord, StoreError> {
    conn.execute(
        "INSERT INTO users (username, email, first_name, last_name, is_active)
         VALUES (?1, ?2, ?3, ?4, 1)",
        rusqlite::params![username, email, first_name, last_name],
    )
    .map_err(|e| StoreError(e.to_string()))?;
    let id = conn.last_insert_rowid();
    Ok(UserRecord {
        id: UserId(id),
        username: username.to_string(),
        email: email.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        is_active: true,
    })
}

pub fn update(conn: &Connection, user: &UserRecord) -> Result<(), StoreError> {
    conn.execute(
        "UPDATE users SET username = ?2, email = ?3, first_name = ?4, last_name = ?5, is_active = ?6
         WHERE id = ?1",
        rusqlite::params![
            user.id.0,
            user.username,
            user.email,
            user.first_name,
            user.last_name,
            user.is_active as i64,
        ],
    )
    .map_err(|e| StoreError(e.to_string()))?;
    Ok(())
}

pub fn roles_of(conn: &Connection, user: UserId) -> Result<BTreeSet<Role>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT role FROM role_members WHERE user_id = ?1")
        .map_err(|e| StoreError(e.to_string()))?;
    let rows = stmt
        .query_map([user.0], |row| row.get::<_, String>(0))
        .map_err(|e| StoreError(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError(e.to_string()))?;
    Ok(rows.iter().filter_map(|r| Role::parse(r)).collect())
}

/// Full membership reconciliation: after this call the user belongs to
/// exactly `desired`. Upstream revocations are applied, not just grants.
pub fn set_role_membership(
    conn: &Connection,
    user: UserId,
    desired: &BTreeSet<Role>,
) -> Result<(), StoreError> {
    for role in ALL_ROLES {
        if desired.contains(&role) {
            conn.execute(
                "INSERT OR IGNORE INTO role_members (user_id, role) VALUES (?1, ?2)",
                rusqlite::params![user.0, role.as_str()],
            )
            .map_err(|e| StoreError(e.to_string()))?;
        } else {
            conn.execute(
                "DELETE FROM role_members WHERE user_id = ?1 AND role = ?2",
                rusqlite::params![user.0, role.as_str()],
            )
            .map_err(|e| StoreError(e.to_string()))?;
        }
    }
    Ok(())
}

pub fn active_members_of(conn: &Connection, role: Role) -> Result<Vec<UserRecord>, StoreError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users u
             JOIN role_members m ON m.user_id = u.id
             WHERE m.role = ?1 AND u.is_active = 1 ORDER BY u.id"
        ))
        .map_err(|e| StoreError(e.to_string()))?;
    let members = stmt
        .query_map([role.as_str()], row_to_user)
        .map_err(|e| StoreError(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError(e.to_string()));
    members
}

pub fn role_has_permissions(conn: &Connection, role: Role) -> Result<bool, StoreError> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM role_permissions WHERE role = ?1",
            [role.as_str()],
            |row| row.get(0),
        )
        .map_err(|e| StoreError(e.to_string()))?;
    Ok(count > 0)
}

pub fn grant_permissions(
    conn: &Connection,
    role: Role,
    permissions: &[AdminPermission],
) -> Result<(), StoreError> {
    for p in permissions {
        conn.execute(
            "INSERT OR IGNORE INTO role_permissions (role, permission) VALUES (?1, ?2)",
            rusqlite::params![role.as_str(), p.as_str()],
        )
        .map_err(|e| StoreError(e.to_string()))?;
    }
    Ok(())
}

/// Union of the permission sets of the user's current role groups.
pub fn permissions_of(
    conn: &Connection,
    user: UserId,
) -> Result<BTreeSet<AdminPermission>, StoreError> {
    let mut stmt = conn
        .prepare(
            "SELECT DISTINCT p.permission FROM role_permissions p
             JOIN role_members m ON m.role = p.role
             WHERE m.user_id = ?1",
        )
        .map_err(|e| StoreError(e.to_string()))?;
    let rows = stmt
        .query_map([user.0], |row| row.get::<_, String>(0))
        .map_err(|e| StoreError(e.to_string()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError(e.to_string()))?;
    Ok(rows.iter().filter_map(|p| AdminPermission::parse(p)).collect())
}
