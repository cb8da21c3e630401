//! HTTP surface for the preview pipeline.
//!
//! A single authenticated `GET` route. Authentication runs before URL validation,
//! and URL validation runs before any outbound request.

use crate::{PreviewError, PreviewMode, PreviewService};
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, Request, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub const DEFAULT_ROUTE: &str = "/api/link-preview";

/// Decides whether a request carries a valid session.
pub trait AuthGate: Send + Sync {
    fn is_authenticated(&self, headers: &HeaderMap) -> bool;
}

/// Accepts `Authorization: Bearer <token>` for any token in a fixed set.
#[derive(Debug, Clone, Default)]
pub struct BearerTokenGate {
    tokens: HashSet<String>,
}

impl BearerTokenGate {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
        }
    }
}

impl AuthGate for BearerTokenGate {
    fn is_authenticated(&self, headers: &HeaderMap) -> bool {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| self.tokens.contains(token.trim()))
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PreviewService>,
    pub auth: Arc<dyn AuthGate>,
}

#[derive(Debug, Deserialize)]
pub struct LinkPreviewQuery {
    url: Option<String>,
    mode: Option<String>,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

impl IntoResponse for PreviewError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        error_response(status, self.to_string())
    }
}

/// Rejects requests without a valid session before any extractor runs.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.auth.is_authenticated(request.headers()) {
        debug!(path = %request.uri().path(), "Rejected unauthenticated request");
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }
    next.run(request).await
}

#[instrument(level = "debug", skip_all)]
pub async fn link_preview_handler(
    State(state): State<AppState>,
    query: Result<Query<LinkPreviewQuery>, QueryRejection>,
) -> Response {
    let params = match query {
        Ok(Query(params)) => params,
        Err(rejection) => {
            debug!(error = %rejection, "Malformed query string");
            return error_response(StatusCode::BAD_REQUEST, rejection.body_text());
        }
    };

    let Some(url) = params.url.filter(|u| !u.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "URL is required");
    };
    let mode = PreviewMode::from_param(params.mode.as_deref());

    match state.service.generate_preview(&url, mode).await {
        Ok(response) => {
            debug!(url = %url, title = %response.preview.title, "Preview generated");
            Json(response).into_response()
        }
        Err(e) => {
            e.log();
            e.into_response()
        }
    }
}

pub fn router(state: AppState, route: &str) -> Router {
    Router::new()
        .route(route, get(link_preview_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
}

/// Serves the preview route until the process is stopped.
pub async fn serve(addr: SocketAddr, route: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %addr, route = %route, "Link preview server listening");
    axum::serve(listener, router(state, route)).await
}
