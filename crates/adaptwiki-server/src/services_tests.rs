use crate::config::ServerConfig;
use crate::notify::RecordingMailer;
use crate::services::{self, Actor, ContactForm};
use adaptwiki_api::ApiErrorCode;
use adaptwiki_auth::SessionSigner;
use adaptwiki_model::{
    Capability, IdentityClaims, IndicatorBody, MetricBody, NewPage, PageBody, RealmAccess,
};
use adaptwiki_store::{schema, ModerationVerb};
use rusqlite::Connection;

fn wiki() -> Connection {
    schema::open_in_memory().expect("open memory db")
}

fn signer() -> SessionSigner {
    SessionSigner::new(b"services-test-secret", 3600).expect("signer")
}

fn claims(email: &str, username: &str, roles: &[&str]) -> IdentityClaims {
    IdentityClaims {
        email: Some(email.to_string()),
        preferred_username: Some(username.to_string()),
        given_name: None,
        family_name: None,
        realm_access: Some(RealmAccess {
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }),
    }
}

/// Log a user in through the real sync path and resolve them the way a
/// request would.
fn actor(conn: &Connection, email: &str, username: &str, roles: &[&str]) -> Actor {
    let signer = signer();
    let response =
        services::login(conn, &signer, &claims(email, username, roles), 1_000).expect("login");
    services::resolve_actor(conn, &signer, Some(&response.token), 1_500).expect("actor")
}

fn draft_indicator(title: &str) -> NewPage {
    NewPage {
        parent_id: None,
        title: title.to_string(),
        slug: None,
        live: false,
        owner: None,
        body: PageBody::Indicator(IndicatorBody::default()),
    }
}

#[test]
fn login_without_email_is_unauthorized() {
    let conn = wiki();
    let mut c = claims("a@example.org", "ariver", &[]);
    c.email = None;
    let err = services::login(&conn, &signer(), &c, 1_000).expect_err("must fail");
    assert_eq!(err.code, ApiErrorCode::Unauthorized);
}

#[test]
fn login_issues_a_token_that_resolves_back_to_the_user() {
    let conn = wiki();
    let s = signer();
    let response =
        services::login(&conn, &s, &claims("a@example.org", "ariver", &["Reviewer"]), 1_000)
            .expect("login");
    assert_eq!(response.capability, Capability::Staff);
    let resolved = services::resolve_actor(&conn, &s, Some(&response.token), 1_500).expect("actor");
    assert_eq!(resolved.user.username, "ariver");
    assert_eq!(resolved.capability, Capability::Staff);
}

#[test]
fn history_is_restricted_to_staff() {
    let conn = wiki();
    let nobody = actor(&conn, "n@example.org", "nobody", &[]);
    let err = services::history(&conn, &nobody).expect_err("must be forbidden");
    assert_eq!(err.code, ApiErrorCode::Forbidden);

    let reviewer = actor(&conn, "r@example.org", "reviewer", &["Reviewer"]);
    services::history(&conn, &reviewer).expect("allowed");
}

#[test]
fn page_creation_requires_the_add_page_permission() {
    let conn = wiki();
    let reviewer = actor(&conn, "r@example.org", "reviewer", &["Reviewer"]);
    let err = services::create_page(&conn, &reviewer, draft_indicator("Drought"))
        .expect_err("reviewers cannot create");
    assert_eq!(err.code, ApiErrorCode::Forbidden);

    let dev = actor(&conn, "d@example.org", "dev", &["ContentDeveloper"]);
    let page = services::create_page(&conn, &dev, draft_indicator("Drought")).expect("created");
    assert_eq!(page.owner, Some(dev.user.id));
}

#[test]
fn cardinality_violations_surface_the_exact_field_error() {
    let conn = wiki();
    let dev = actor(&conn, "d@example.org", "dev", &["ContentDeveloper"]);
    let ind = services::create_page(&conn, &dev, draft_indicator("Drought")).expect("indicator");
    for i in 1..=3 {
        let metric = NewPage {
            parent_id: Some(ind.id),
            title: format!("Metric {i}"),
            slug: None,
            live: true,
            owner: None,
            body: PageBody::Metric(MetricBody::default()),
        };
        services::create_page(&conn, &dev, metric).expect("metric");
    }
    let fourth = NewPage {
        parent_id: Some(ind.id),
        title: "Metric 4".to_string(),
        slug: None,
        live: true,
        owner: None,
        body: PageBody::Metric(MetricBody::default()),
    };
    let err = services::create_page(&conn, &dev, fourth).expect_err("over cap");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);
    let field_errors = &err.details["field_errors"];
    assert_eq!(field_errors[0]["field"], "title");
    assert_eq!(
        field_errors[0]["message"],
        "Each Indicator can only have up to 3 Metrics."
    );
}

#[tokio::test]
async fn moderation_walks_the_workflow_and_notifies() {
    let conn = wiki();
    let config = ServerConfig::default();
    let mailer = RecordingMailer::default();

    let reviewer = actor(&conn, "r@example.org", "reviewer", &["Reviewer"]);
    let dev = actor(&conn, "d@example.org", "dev", &["ContentDeveloper"]);
    let page = services::create_page(&conn, &dev, draft_indicator("Drought")).expect("page");

    let (submitted, emails) =
        services::moderate_page(&conn, &config, &dev, page.id, ModerationVerb::Submit)
            .expect("submit");
    services::send_notifications(&mailer, emails).await;
    assert!(!submitted.live);
    assert_eq!(
        mailer.sent_subjects(),
        vec!["Page submitted for review: Drought".to_string()]
    );
    let to = mailer.sent.lock().expect("sent")[0].to.clone();
    assert_eq!(to, reviewer.user.email);

    let (approved, emails) =
        services::moderate_page(&conn, &config, &reviewer, page.id, ModerationVerb::Approve)
            .expect("approve");
    services::send_notifications(&mailer, emails).await;
    assert!(approved.live);
    let subjects = mailer.sent_subjects();
    assert_eq!(subjects.len(), 2);
    assert_eq!(subjects[1], "Your page has been approved: Drought");
    // Approval notice goes to the page owner.
    assert_eq!(mailer.sent.lock().expect("sent")[1].to, dev.user.email);
}

#[tokio::test]
async fn approval_requires_the_moderation_permission() {
    let conn = wiki();
    let config = ServerConfig::default();
    let mailer = RecordingMailer::default();

    let dev = actor(&conn, "d@example.org", "dev", &["ContentDeveloper"]);
    let page = services::create_page(&conn, &dev, draft_indicator("Drought")).expect("page");
    let (_, emails) =
        services::moderate_page(&conn, &config, &dev, page.id, ModerationVerb::Submit)
            .expect("submit");
    services::send_notifications(&mailer, emails).await;

    let err = services::moderate_page(&conn, &config, &dev, page.id, ModerationVerb::Approve)
        .expect_err("developers cannot approve");
    assert_eq!(err.code, ApiErrorCode::Forbidden);
}

#[tokio::test]
async fn notification_failure_does_not_fail_the_transition() {
    let conn = wiki();
    let config = ServerConfig::default();
    let mailer = RecordingMailer::failing();

    actor(&conn, "r@example.org", "reviewer", &["Reviewer"]);
    let dev = actor(&conn, "d@example.org", "dev", &["ContentDeveloper"]);
    let page = services::create_page(&conn, &dev, draft_indicator("Drought")).expect("page");
    let (submitted, emails) =
        services::moderate_page(&conn, &config, &dev, page.id, ModerationVerb::Submit)
            .expect("transition persists despite mail failure");
    services::send_notifications(&mailer, emails).await;
    assert_eq!(
        submitted.moderation,
        adaptwiki_model::ModerationState::Submitted
    );
}

#[tokio::test]
async fn forms_validate_fields_with_the_standard_messages() {
    let config = ServerConfig::default();
    let mailer = RecordingMailer::default();
    let form = ContactForm {
        name: String::new(),
        email: "not-an-email".to_string(),
        message: "hello".to_string(),
    };
    let err = services::become_editor(&config, &mailer, &form)
        .await
        .expect_err("invalid form");
    assert_eq!(err.code, ApiErrorCode::ValidationFailed);
    let field_errors = err.details["field_errors"].as_array().expect("array").clone();
    assert_eq!(field_errors.len(), 2);
    assert_eq!(field_errors[0]["field"], "name");
    assert_eq!(field_errors[0]["message"], "This field is required.");
    assert_eq!(field_errors[1]["field"], "email");
    assert_eq!(field_errors[1]["message"], "Enter a valid email address.");
    assert!(mailer.sent_subjects().is_empty());
}

#[tokio::test]
async fn editor_application_sends_notice_and_confirmation() {
    let config = ServerConfig::default();
    let mailer = RecordingMailer::default();
    let form = ContactForm {
        name: "Alex Rivers".to_string(),
        email: "a.rivers@example.org".to_string(),
        message: "I would like to help.".to_string(),
    };
    services::become_editor(&config, &mailer, &form)
        .await
        .expect("accepted");
    let sent = mailer.sent.lock().expect("sent").clone();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, config.site_inbox);
    assert_eq!(sent[0].subject, "New Editor Application from Alex Rivers");
    assert_eq!(sent[1].to, "a.rivers@example.org");
    assert_eq!(sent[1].subject, "Your Editor Application - AdaptWiki");
    assert!(sent[1].body.contains("5 business days"));
}

#[tokio::test]
async fn mail_failure_surfaces_a_generic_error_without_transport_detail() {
    let config = ServerConfig::default();
    let mailer = RecordingMailer::failing();
    let form = ContactForm {
        name: "Alex".to_string(),
        email: "a@example.org".to_string(),
        message: "feedback".to_string(),
    };
    let err = services::feedback(&config, &mailer, &form)
        .await
        .expect_err("mail down");
    assert_eq!(err.code, ApiErrorCode::Internal);
    assert_eq!(
        err.message,
        "There was an error sending your feedback. Please try again later."
    );
    assert!(!err.message.contains("smtp"));
}
