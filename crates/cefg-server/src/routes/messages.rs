//! Contact-form messages and the bulk read/unread actions for reviewing them.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use cefg_core::ContactSubmission;
use serde::Deserialize;
use tracing::info;

use super::{method_not_allowed, ApiError, ApiResult};
use crate::state::AppState;

/// Messages per page in the review listing.
pub const MESSAGES_PAGE_SIZE: usize = 25;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/contact/", post(submit_message).fallback(method_not_allowed))
}

/// Review routes. Mounted behind the admin token check.
pub fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/messages/", get(list_messages))
        .route(
            "/admin/messages/mark-read/",
            post(mark_read).fallback(method_not_allowed),
        )
        .route(
            "/admin/messages/mark-unread/",
            post(mark_unread).fallback(method_not_allowed),
        )
}

#[derive(Deserialize)]
struct ListParams {
    is_read: Option<String>,
    page: Option<String>,
}

#[derive(Deserialize)]
struct IdsBody {
    ids: Vec<i64>,
}

/// POST /contact/: store a contact-form message.
async fn submit_message(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let msg = ContactSubmission::from_slice(&body)?;
    let id = state.store.add_message(&msg)?;
    info!("New contact message {} ({})", id, msg.subject);
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

/// GET /admin/messages/?is_read=&page=: newest first, paginated.
async fn list_messages(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> ApiResult {
    let is_read = match params.is_read.as_deref().map(str::trim) {
        None | Some("") => None,
        Some("true") | Some("1") => Some(true),
        Some("false") | Some("0") => Some(false),
        Some(_) => return Err(ApiError::bad_request("is_read must be true or false")),
    };
    let page = match params.page.as_deref().map(str::trim) {
        None | Some("") => 1,
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| ApiError::bad_request("page must be a positive integer"))?,
    };
    let in_range = (page - 1)
        .checked_mul(MESSAGES_PAGE_SIZE)
        .is_some_and(|offset| i64::try_from(offset).is_ok());
    if !in_range {
        return Err(ApiError::bad_request("page is out of range"));
    }

    let (messages, total) = state
        .store
        .list_messages(is_read, page, MESSAGES_PAGE_SIZE)?;

    Ok(Json(serde_json::json!({
        "messages": messages,
        "total": total,
        "page": page,
        "page_size": MESSAGES_PAGE_SIZE,
    })))
}

/// POST /admin/messages/mark-read/: `{ids: [...]}`.
async fn mark_read(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    set_read_flag(&state, &body, true)
}

/// POST /admin/messages/mark-unread/: `{ids: [...]}`.
async fn mark_unread(State(state): State<Arc<AppState>>, body: Bytes) -> ApiResult {
    set_read_flag(&state, &body, false)
}

fn set_read_flag(state: &AppState, body: &[u8], is_read: bool) -> ApiResult {
    let req: IdsBody = serde_json::from_slice(body)
        .map_err(|_| ApiError::bad_request("Body must be {\"ids\": [integer, ...]}"))?;
    let updated = state.store.set_messages_read(&req.ids, is_read)?;
    let label = if is_read { "read" } else { "unread" };
    Ok(Json(serde_json::json!({
        "updated": updated,
        "message": format!("{} message(s) marked as {}.", updated, label),
    })))
}
