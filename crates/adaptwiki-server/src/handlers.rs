use crate::services::{self, ContactForm};
use crate::{now_secs, AppState};
use adaptwiki_api::{ApiError, ApiErrorCode, UpdatePageRequest};
use adaptwiki_model::{IdentityClaims, NewPage, PageId};
use adaptwiki_store::{ModerationVerb, UpdatePage};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::collections::{BTreeMap, HashMap};

pub(crate) fn api_error_response(err: ApiError) -> Response {
    let status = match err.code {
        ApiErrorCode::InvalidParameter | ApiErrorCode::ValidationFailed => StatusCode::BAD_REQUEST,
        ApiErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ApiErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
        ApiErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(json!({"error": err}))).into_response()
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

pub(crate) async fn healthz_handler() -> Response {
    Json(json!({"status": "ok"})).into_response()
}

pub(crate) async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let conn = state.db.lock().await;
    let raw: BTreeMap<String, String> = params.into_iter().collect();
    match services::search(&conn, &raw) {
        Ok(body) => Json(body).into_response(),
        Err(err) => api_error_response(err),
    }
}

pub(crate) async fn login_handler(
    State(state): State<AppState>,
    Json(claims): Json<IdentityClaims>,
) -> Response {
    let conn = state.db.lock().await;
    match services::login(&conn, &state.signer, &claims, now_secs()) {
        Ok(body) => Json(body).into_response(),
        Err(err) => api_error_response(err),
    }
}

pub(crate) async fn history_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let conn = state.db.lock().await;
    let result = services::resolve_actor(&conn, &state.signer, bearer(&headers), now_secs())
        .and_then(|actor| services::history(&conn, &actor));
    match result {
        Ok(body) => Json(body).into_response(),
        Err(err) => api_error_response(err),
    }
}

pub(crate) async fn create_page_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(new): Json<NewPage>,
) -> Response {
    let conn = state.db.lock().await;
    let result = services::resolve_actor(&conn, &state.signer, bearer(&headers), now_secs())
        .and_then(|actor| services::create_page(&conn, &actor, new));
    match result {
        Ok(page) => (StatusCode::CREATED, Json(page)).into_response(),
        Err(err) => api_error_response(err),
    }
}

pub(crate) async fn get_page_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let conn = state.db.lock().await;
    let result = services::resolve_actor(&conn, &state.signer, bearer(&headers), now_secs())
        .and_then(|actor| services::get_page(&conn, &actor, PageId(id)));
    match result {
        Ok(page) => Json(page).into_response(),
        Err(err) => api_error_response(err),
    }
}

pub(crate) async fn update_page_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(request): Json<UpdatePageRequest>,
) -> Response {
    let update = UpdatePage {
        title: request.title,
        body: request.body,
        live: request.live,
    };
    let conn = state.db.lock().await;
    let result = services::resolve_actor(&conn, &state.signer, bearer(&headers), now_secs())
        .and_then(|actor| services::update_page(&conn, &actor, PageId(id), &update));
    match result {
        Ok(page) => Json(page).into_response(),
        Err(err) => api_error_response(err),
    }
}

pub(crate) async fn delete_page_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let conn = state.db.lock().await;
    let result = services::resolve_actor(&conn, &state.signer, bearer(&headers), now_secs())
        .and_then(|actor| services::delete_page(&conn, &actor, PageId(id)));
    match result {
        Ok(removed) => Json(json!({"removed": removed})).into_response(),
        Err(err) => api_error_response(err),
    }
}

pub(crate) async fn moderation_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, action)): Path<(i64, String)>,
) -> Response {
    let Some(verb) = ModerationVerb::parse(&action) else {
        return api_error_response(ApiError::not_found("moderation action"));
    };
    // The database handle is released before any notification goes out.
    let result = {
        let conn = state.db.lock().await;
        services::resolve_actor(&conn, &state.signer, bearer(&headers), now_secs()).and_then(
            |actor| services::moderate_page(&conn, &state.config, &actor, PageId(id), verb),
        )
    };
    match result {
        Ok((page, emails)) => {
            services::send_notifications(state.mailer.as_ref(), emails).await;
            Json(page).into_response()
        }
        Err(err) => api_error_response(err),
    }
}

pub(crate) async fn become_editor_handler(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> Response {
    match services::become_editor(&state.config, state.mailer.as_ref(), &form).await {
        Ok(body) => Json(body).into_response(),
        Err(err) => api_error_response(err),
    }
}

pub(crate) async fn feedback_handler(
    State(state): State<AppState>,
    Json(form): Json<ContactForm>,
) -> Response {
    match services::feedback(&state.config, state.mailer.as_ref(), &form).await {
        Ok(body) => Json(body).into_response(),
        Err(err) => api_error_response(err),
    }
}
