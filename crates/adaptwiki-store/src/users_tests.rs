use crate::{schema, users};
use adaptwiki_model::{AdminPermission, Role};
use rusqlite::Connection;
use std::collections::BTreeSet;

fn wiki() -> Connection {
    schema::open_in_memory().expect("open memory db")
}

#[test]
fn email_lookup_is_case_insensitive() {
    let conn = wiki();
    users::create(&conn, "ariver", "A.River@example.org", "A", "River").expect("create");
    let found = users::find_by_email(&conn, "a.river@EXAMPLE.org").expect("lookup");
    assert_eq!(found.expect("user").username, "ariver");
}

#[test]
fn membership_reconciliation_removes_revoked_roles() {
    let conn = wiki();
    let user = users::create(&conn, "bshore", "b@example.org", "", "").expect("create");

    let mut desired: BTreeSet<Role> = BTreeSet::new();
    desired.insert(Role::Administrator);
    desired.insert(Role::Reviewer);
    users::set_role_membership(&conn, user.id, &desired).expect("grant");
    assert_eq!(users::roles_of(&conn, user.id).expect("roles"), desired);

    let mut narrowed: BTreeSet<Role> = BTreeSet::new();
    narrowed.insert(Role::Reviewer);
    users::set_role_membership(&conn, user.id, &narrowed).expect("narrow");
    assert_eq!(users::roles_of(&conn, user.id).expect("roles"), narrowed);

    users::set_role_membership(&conn, user.id, &BTreeSet::new()).expect("revoke all");
    assert!(users::roles_of(&conn, user.id).expect("roles").is_empty());
}

#[test]
fn permissions_follow_group_membership() {
    let conn = wiki();
    let user = users::create(&conn, "cdell", "c@example.org", "", "").expect("create");
    users::grant_permissions(
        &conn,
        Role::Reviewer,
        &[AdminPermission::AccessAdmin, AdminPermission::PublishPage],
    )
    .expect("grant perms");

    let mut desired: BTreeSet<Role> = BTreeSet::new();
    desired.insert(Role::Reviewer);
    users::set_role_membership(&conn, user.id, &desired).expect("grant");

    let perms = users::permissions_of(&conn, user.id).expect("perms");
    assert!(perms.contains(&AdminPermission::PublishPage));
    assert!(!perms.contains(&AdminPermission::ApproveModeration));

    users::set_role_membership(&conn, user.id, &BTreeSet::new()).expect("revoke");
    assert!(users::permissions_of(&conn, user.id).expect("perms").is_empty());
}

#[test]
fn inactive_members_are_not_notification_recipients() {
    let conn = wiki();
    let mut user = users::create(&conn, "dmoor", "d@example.org", "D", "Moor").expect("create");
    let mut desired: BTreeSet<Role> = BTreeSet::new();
    desired.insert(Role::Reviewer);
    users::set_role_membership(&conn, user.id, &desired).expect("grant");
    assert_eq!(
        users::active_members_of(&conn, Role::Reviewer).expect("members").len(),
        1
    );

    user.is_active = false;
    users::update(&conn, &user).expect("deactivate");
    assert!(users::active_members_of(&conn, Role::Reviewer)
        .expect("members")
        .is_empty());
}
