use crate::sync::sync_login;
use adaptwiki_model::{Capability, IdentityClaims, RealmAccess, Role};
use adaptwiki_store::{schema, users};
use rusqlite::Connection;

fn wiki() -> Connection {
    schema::open_in_memory().expect("open memory db")
}

fn claims(email: &str, username: &str, roles: &[&str]) -> IdentityClaims {
    IdentityClaims {
        email: Some(email.to_string()),
        preferred_username: Some(username.to_string()),
        given_name: Some("Alex".to_string()),
        family_name: Some("Rivers".to_string()),
        realm_access: Some(RealmAccess {
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }),
    }
}

#[test]
fn missing_email_fails_closed_without_error() {
    let conn = wiki();
    let mut c = claims("x@example.org", "x", &["Administrator"]);
    c.email = None;
    assert!(sync_login(&conn, &c).expect("sync").is_none());
    c.email = Some("   ".to_string());
    assert!(sync_login(&conn, &c).expect("sync").is_none());
}

#[test]
fn first_login_creates_a_least_privilege_account() {
    let conn = wiki();
    let synced = sync_login(&conn, &claims("a@example.org", "ariver", &["SomeOtherRealmRole"]))
        .expect("sync")
        .expect("user");
    assert_eq!(synced.user.username, "ariver");
    assert_eq!(synced.user.first_name, "Alex");
    assert!(synced.roles.is_empty());
    assert_eq!(synced.capability, Capability::None);
}

#[test]
fn known_realm_roles_map_to_groups_and_capability() {
    let conn = wiki();
    let synced = sync_login(
        &conn,
        &claims("a@example.org", "ariver", &["Reviewer", "UnrelatedRole"]),
    )
    .expect("sync")
    .expect("user");
    assert_eq!(synced.roles.len(), 1);
    assert!(synced.roles.contains(&Role::Reviewer));
    assert_eq!(synced.capability, Capability::Staff);

    let admin = sync_login(&conn, &claims("b@example.org", "bshore", &["Administrator"]))
        .expect("sync")
        .expect("user");
    assert_eq!(admin.capability, Capability::Admin);
}

#[test]
fn upstream_revocation_is_applied_on_the_next_login() {
    let conn = wiki();
    sync_login(
        &conn,
        &claims("a@example.org", "ariver", &["Administrator", "Reviewer"]),
    )
    .expect("sync")
    .expect("user");

    let demoted = sync_login(&conn, &claims("a@example.org", "ariver", &[]))
        .expect("sync")
        .expect("user");
    assert!(demoted.roles.is_empty());
    assert_eq!(demoted.capability, Capability::None);
    assert!(users::roles_of(&conn, demoted.user.id)
        .expect("roles")
        .is_empty());
}

#[test]
fn resolution_is_by_case_insensitive_email() {
    let conn = wiki();
    let first = sync_login(&conn, &claims("A.River@Example.org", "ariver", &[]))
        .expect("sync")
        .expect("user");
    let second = sync_login(&conn, &claims("a.river@example.ORG", "ariver", &[]))
        .expect("sync")
        .expect("user");
    assert_eq!(first.user.id, second.user.id);
}

#[test]
fn preferred_username_is_adopted_only_when_free() {
    let conn = wiki();
    users::create(&conn, "taken", "other@example.org", "", "").expect("existing");
    let synced = sync_login(&conn, &claims("a@example.org", "ariver", &[]))
        .expect("sync")
        .expect("user");
    assert_eq!(synced.user.username, "ariver");

    // Renaming onto an occupied username is skipped…
    let conflicted = sync_login(&conn, &claims("a@example.org", "taken", &[]))
        .expect("sync")
        .expect("user");
    assert_eq!(conflicted.user.username, "ariver");

    // …and a fresh one is adopted.
    let renamed = sync_login(&conn, &claims("a@example.org", "rivers-a", &[]))
        .expect("sync")
        .expect("user");
    assert_eq!(renamed.user.username, "rivers-a");
}

#[test]
fn group_permission_sets_are_configured_on_first_materialization() {
    let conn = wiki();
    let synced = sync_login(&conn, &claims("a@example.org", "ariver", &["ContentDeveloper"]))
        .expect("sync")
        .expect("user");
    let perms = users::permissions_of(&conn, synced.user.id).expect("perms");
    assert!(perms.contains(&adaptwiki_model::AdminPermission::AddPage));
    assert!(!perms.contains(&adaptwiki_model::AdminPermission::PublishPage));
}
