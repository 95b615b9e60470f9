use crate::config::ServerConfig;
use crate::history::merged_history;
use crate::notify::{self, Mailer};
use adaptwiki_api::{
    parse_search_params, ApiError, ApiErrorCode, HistoryResponse, HistoryRow, LoginResponse,
    MessageResponse, SearchResponse,
};
use adaptwiki_auth::{sync_login, AuthError, SessionSigner};
use adaptwiki_model::{
    AdminPermission, Capability, IdentityClaims, NewPage, PageId, PageRecord, Role, UserRecord,
};
use adaptwiki_query::search_pages;
use adaptwiki_store::{pages, users, ModerationVerb, PageWriteError, UpdatePage};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{error, warn};

/// The authenticated caller, resolved per request. Capability and
/// permissions are re-derived from current group membership every time.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user: UserRecord,
    pub roles: BTreeSet<Role>,
    pub capability: Capability,
    pub permissions: BTreeSet<AdminPermission>,
}

fn internal(err: impl std::fmt::Display, context: &str) -> ApiError {
    error!(error = %err, context, "request failed");
    ApiError::internal("internal error")
}

pub fn resolve_actor(
    conn: &Connection,
    signer: &SessionSigner,
    bearer: Option<&str>,
    now_secs: i64,
) -> Result<Actor, ApiError> {
    let token = bearer.ok_or_else(ApiError::unauthorized)?;
    let user_id = signer
        .verify(token, now_secs)
        .map_err(|_| ApiError::unauthorized())?;
    let user = users::get(conn, user_id)
        .map_err(|e| internal(e, "load user"))?
        .filter(|u| u.is_active)
        .ok_or_else(ApiError::unauthorized)?;
    let roles = users::roles_of(conn, user.id).map_err(|e| internal(e, "load roles"))?;
    let permissions =
        users::permissions_of(conn, user.id).map_err(|e| internal(e, "load permissions"))?;
    let capability = adaptwiki_model::capability_for(&roles);
    Ok(Actor {
        user,
        roles,
        capability,
        permissions,
    })
}

pub fn require_capability(actor: &Actor, min: Capability) -> Result<(), ApiError> {
    if actor.capability >= min {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}

pub fn require_permission(actor: &Actor, permission: AdminPermission) -> Result<(), ApiError> {
    if actor.permissions.contains(&permission) {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}

fn map_write_error(err: PageWriteError) -> ApiError {
    match err {
        PageWriteError::Invalid(e) => ApiError::validation_failed(&e.field, &e.message),
        PageWriteError::Store(e) => internal(e, "page write"),
    }
}

pub fn login(
    conn: &Connection,
    signer: &SessionSigner,
    claims: &IdentityClaims,
    now_secs: i64,
) -> Result<LoginResponse, ApiError> {
    let synced = match sync_login(conn, claims) {
        Ok(Some(synced)) => synced,
        // Claims without a usable email resolve to no user: fail closed.
        Ok(None) => return Err(ApiError::unauthorized()),
        Err(AuthError(e)) => return Err(internal(e, "role sync")),
    };
    let token = signer
        .issue(synced.user.id, now_secs)
        .map_err(|e| internal(e, "issue session"))?;
    Ok(LoginResponse {
        token,
        username: synced.user.username,
        capability: synced.capability,
        roles: synced.roles.into_iter().collect(),
    })
}

pub fn search(
    conn: &Connection,
    raw: &BTreeMap<String, String>,
) -> Result<SearchResponse, ApiError> {
    let request = parse_search_params(raw);
    let outcome = search_pages(conn, &request).map_err(|e| internal(e, "search"))?;
    Ok(SearchResponse {
        query: request.filter.query.clone(),
        kind: request.filter.kind.map(|k| k.as_str().to_string()),
        results: outcome.hits,
        page: outcome.page,
        counts: outcome.counts,
        facets: outcome.facets,
    })
}

pub fn history(conn: &Connection, actor: &Actor) -> Result<HistoryResponse, ApiError> {
    require_capability(actor, Capability::Staff)?;
    let logs = merged_history(conn)
        .map_err(|e| internal(e, "merged history"))?
        .into_iter()
        .map(HistoryRow::from)
        .collect();
    Ok(HistoryResponse { logs })
}

pub fn create_page(
    conn: &Connection,
    actor: &Actor,
    mut new: NewPage,
) -> Result<PageRecord, ApiError> {
    require_permission(actor, AdminPermission::AddPage)?;
    new.owner = Some(actor.user.id);
    pages::create_page(conn, &new).map_err(map_write_error)
}

pub fn get_page(conn: &Connection, actor: &Actor, id: PageId) -> Result<PageRecord, ApiError> {
    require_capability(actor, Capability::Staff)?;
    pages::get_page(conn, id)
        .map_err(|e| internal(e, "load page"))?
        .ok_or_else(|| ApiError::not_found("page"))
}

pub fn update_page(
    conn: &Connection,
    actor: &Actor,
    id: PageId,
    update: &UpdatePage,
) -> Result<PageRecord, ApiError> {
    require_permission(actor, AdminPermission::ChangePage)?;
    pages::update_page(conn, id, update, Some(actor.user.id)).map_err(map_write_error)
}

pub fn delete_page(conn: &Connection, actor: &Actor, id: PageId) -> Result<usize, ApiError> {
    require_capability(actor, Capability::Admin)?;
    pages::delete_page(conn, id).map_err(map_write_error)
}

/// Reviewers get review traffic; with no active reviewer it falls back to
/// the administrators.
fn review_recipients(conn: &Connection) -> Result<Vec<UserRecord>, ApiError> {
    let reviewers =
        users::active_members_of(conn, Role::Reviewer).map_err(|e| internal(e, "recipients"))?;
    if !reviewers.is_empty() {
        return Ok(reviewers);
    }
    users::active_members_of(conn, Role::Administrator).map_err(|e| internal(e, "recipients"))
}

/// Notification sends happen after the transition is persisted; a failure
/// must not misreport the transition as failed.
pub async fn send_notifications(mailer: &dyn Mailer, emails: Vec<notify::OutboundEmail>) {
    for email in emails {
        if let Err(e) = mailer.send(&email).await {
            warn!(error = %e, to = %email.to, "notification send failed");
        }
    }
}

/// Run a moderation transition and return the page together with the
/// notifications it produced. Sending is the caller's job (through
/// [`send_notifications`]) so the database handle is released first.
pub fn moderate_page(
    conn: &Connection,
    config: &ServerConfig,
    actor: &Actor,
    id: PageId,
    verb: ModerationVerb,
) -> Result<(PageRecord, Vec<notify::OutboundEmail>), ApiError> {
    match verb {
        ModerationVerb::Approve | ModerationVerb::Reject => {
            require_permission(actor, AdminPermission::ApproveModeration)?;
        }
        ModerationVerb::Submit | ModerationVerb::Cancel => {
            require_capability(actor, Capability::Staff)?;
        }
    }

    let page =
        pages::transition_moderation(conn, id, verb, Some(actor.user.id)).map_err(map_write_error)?;

    let emails = match verb {
        ModerationVerb::Submit => review_recipients(conn)?
            .iter()
            .map(|r| notify::submission_email(config, &r.email, &page.title, page.kind().as_str()))
            .collect(),
        ModerationVerb::Cancel => review_recipients(conn)?
            .iter()
            .map(|r| notify::cancellation_email(config, &r.email, &page.title))
            .collect(),
        ModerationVerb::Approve | ModerationVerb::Reject => {
            let owner = match page.owner {
                Some(owner_id) => users::get(conn, owner_id).map_err(|e| internal(e, "owner"))?,
                None => None,
            };
            match owner {
                Some(owner) if verb == ModerationVerb::Approve => {
                    vec![notify::approval_email(config, &owner.email, &page.title)]
                }
                Some(owner) => vec![notify::rejection_email(config, &owner.email, &page.title)],
                None => Vec::new(),
            }
        }
    };
    Ok((page, emails))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

fn email_is_valid(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn validate_contact_form(form: &ContactForm) -> Vec<(&'static str, &'static str)> {
    let mut errors = Vec::new();
    if form.name.trim().is_empty() {
        errors.push(("name", "This field is required."));
    } else if form.name.chars().count() > 100 {
        errors.push(("name", "Ensure this value has at most 100 characters."));
    }
    if form.email.trim().is_empty() {
        errors.push(("email", "This field is required."));
    } else if !email_is_valid(form.email.trim()) {
        errors.push(("email", "Enter a valid email address."));
    }
    if form.message.trim().is_empty() {
        errors.push(("message", "This field is required."));
    }
    errors
}

fn validation_errors(errors: &[(&str, &str)]) -> ApiError {
    let field_errors: Vec<_> = errors
        .iter()
        .map(|(field, message)| json!({"field": field, "message": message}))
        .collect();
    ApiError::new(
        ApiErrorCode::ValidationFailed,
        "validation failed",
        json!({ "field_errors": field_errors }),
    )
}

async fn send_form_emails(
    mailer: &dyn Mailer,
    emails: Vec<notify::OutboundEmail>,
    generic_error: &str,
) -> Result<(), ApiError> {
    for email in emails {
        if let Err(e) = mailer.send(&email).await {
            // Logged for the operator; the caller only sees a generic
            // message with no transport detail.
            error!(error = %e, to = %email.to, "form email send failed");
            return Err(ApiError::internal(generic_error));
        }
    }
    Ok(())
}

pub async fn become_editor(
    config: &ServerConfig,
    mailer: &dyn Mailer,
    form: &ContactForm,
) -> Result<MessageResponse, ApiError> {
    let errors = validate_contact_form(form);
    if !errors.is_empty() {
        return Err(validation_errors(&errors));
    }
    let emails = notify::editor_application_emails(
        config,
        form.name.trim(),
        form.email.trim(),
        form.message.trim(),
    );
    send_form_emails(
        mailer,
        emails,
        "There was an error sending your application. Please try again later.",
    )
    .await?;
    Ok(MessageResponse {
        message: "Your application has been submitted successfully! Check your email for confirmation."
            .to_string(),
    })
}

pub async fn feedback(
    config: &ServerConfig,
    mailer: &dyn Mailer,
    form: &ContactForm,
) -> Result<MessageResponse, ApiError> {
    let errors = validate_contact_form(form);
    if !errors.is_empty() {
        return Err(validation_errors(&errors));
    }
    let emails =
        notify::feedback_emails(config, form.name.trim(), form.email.trim(), form.message.trim());
    send_form_emails(
        mailer,
        emails,
        "There was an error sending your feedback. Please try again later.",
    )
    .await?;
    Ok(MessageResponse {
        message: "Your feedback has been submitted successfully! Thank you for helping us improve."
            .to_string(),
    })
}
