//! HTTP route handlers.
//!
//! All handlers are thin - they delegate to the hub for state access.

use axum::{
    extract::{Query, State},
    http::{header, HeaderValue},
    middleware,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};

use crate::api::ws::ws_handler;
use crate::api::AppState;
use crate::error::{HubError, HubResult};
use crate::protocol_constants::{SERVER_HEADER, TAGS_CONTENT_TYPE, WS_PATH};

// ─────────────────────────────────────────────────────────────────────────────
// Query Parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Raw query of `/item` and `/tags`, validated by hand so malformed values
/// get the hub's JSON error body instead of axum's rejection text.
#[derive(Deserialize)]
struct ItemQuery {
    id: Option<String>,
    timeline: Option<String>,
}

impl ItemQuery {
    fn id(&self) -> HubResult<u32> {
        let raw = self
            .id
            .as_deref()
            .ok_or_else(|| HubError::InvalidRequest("missing id".into()))?;
        parse_item_id(raw)
    }

    fn timeline(&self) -> bool {
        self.timeline
            .as_deref()
            .is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
    }
}

/// Decimal digits only, within `u32`.
fn parse_item_id(raw: &str) -> HubResult<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(HubError::InvalidRequest(format!("invalid id: {:?}", raw)));
    }
    raw.parse()
        .map_err(|_| HubError::InvalidRequest(format!("id out of range: {}", raw)))
}

// ─────────────────────────────────────────────────────────────────────────────
// Router
// ─────────────────────────────────────────────────────────────────────────────

/// Creates the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(get_snapshot))
        .route("/item", get(get_item))
        .route("/tags", get(get_tags))
        .route(WS_PATH, get(ws_handler))
        .layer(middleware::map_response(set_server_header))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(tracing::Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(tracing::Level::DEBUG)),
        )
        .with_state(state)
}

async fn set_server_header(mut response: Response) -> Response {
    response
        .headers_mut()
        .insert(header::SERVER, HeaderValue::from_static(SERVER_HEADER));
    response
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

fn json_response(body: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], body).into_response()
}

/// Full state snapshot.
async fn get_snapshot(State(state): State<AppState>) -> HubResult<Response> {
    let body = state.hub()?.snapshot_json(false)?;
    Ok(json_response(body))
}

/// Item details, with the marker timeline when `timeline=true`.
async fn get_item(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
) -> HubResult<Response> {
    let id = query.id()?;
    log::debug!("[HTTP] Item {} requested (timeline: {})", id, query.timeline());
    let body = state.hub()?.item_info_json(id, query.timeline())?;
    Ok(json_response(body))
}

/// Serialized tag list of an item.
async fn get_tags(
    State(state): State<AppState>,
    Query(query): Query<ItemQuery>,
) -> HubResult<Response> {
    let id = query.id()?;
    log::debug!("[HTTP] Tags of item {} requested", id);
    let tags = state.hub()?.item_tags(id)?;
    Ok(([(header::CONTENT_TYPE, TAGS_CONTENT_TYPE)], tags).into_response())
}
