use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header},
    response::Response,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::chat::{ChatCapability, ChatSnapshot, ChatWidget, QueryDisposition};
use crate::config::{AppConfig, PagesConfig};
use crate::events::sse_event;
use crate::page::{Page, PageInfo, PageStore, PageTemplate, PanelInfo, Theme};
use crate::panel::{PanelError, PanelKind, PanelSnapshot, SelectOutcome};
use crate::portfolio::{self, Education, Experience, FunFact, Profile, TechCategory};

/// How long an inject request waits for its query to be picked up.
const INJECT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

type ApiError = (StatusCode, String);

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Live page loads.
    pub pages: PageStore,
    /// Resolved configuration.
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Build state from configuration, resolving the chat capability once.
    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let capability = ChatCapability::from_settings(&config.chat);
        Self::with_capability(config, capability)
    }

    pub fn with_capability(config: Arc<AppConfig>, capability: ChatCapability) -> Self {
        let template = PageTemplate::new(capability)
            .with_timings(config.transition.timings(), config.transition.policy());
        Self {
            pages: PageStore::new(template),
            config,
        }
    }

    fn chat_enabled(&self) -> bool {
        self.pages.template().chat.is_enabled()
    }
}

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>) -> anyhow::Result<()> {
    let state = AppState::from_config(config.clone());

    let _reaper = spawn_page_reaper(state.pages.clone(), config.pages);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// Periodically drop pages that have been idle too long.
pub fn spawn_page_reaper(pages: PageStore, settings: PagesConfig) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(settings.reap_interval());
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = pages.cleanup_expired_with_timeout(settings.idle_timeout());
            if removed > 0 {
                info!(name: "pages.reaped", removed, remaining = pages.len(), "Idle pages reaped");
            }
        }
    })
}

/// All HTTP routes, with tracing and CORS.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/portfolio", get(api_portfolio))
        .route("/api/pages", post(api_create_page))
        .route("/api/pages/{id}", get(api_get_page).delete(api_delete_page))
        .route("/api/pages/{id}/events", get(api_page_events))
        .route("/api/pages/{id}/panels/{panel}", get(api_get_panel))
        .route("/api/pages/{id}/panels/{panel}/select", post(api_select))
        .route("/api/pages/{id}/panels/{panel}/back", post(api_back))
        .route("/api/pages/{id}/theme/toggle", post(api_toggle_theme))
        .route("/api/pages/{id}/chat", get(api_chat_snapshot))
        .route("/api/pages/{id}/chat/open", post(api_chat_open))
        .route("/api/pages/{id}/chat/close", post(api_chat_close))
        .route("/api/pages/{id}/chat/messages", post(api_chat_send))
        .route("/api/pages/{id}/chat/inject", post(api_chat_inject))
        .route("/api/pages/{id}/ask", post(api_ask))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ─────────────────────────────────────────────────────────────────────────────
// Lookups
// ─────────────────────────────────────────────────────────────────────────────

fn lookup_page(state: &AppState, id: &str) -> Result<Page, ApiError> {
    state
        .pages
        .get(id)
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("page not found: {id}")))
}

fn lookup_chat(page: &Page) -> Result<Arc<ChatWidget>, ApiError> {
    page.chat()
        .widget()
        .cloned()
        .ok_or_else(|| (StatusCode::NOT_FOUND, "chat is disabled".to_string()))
}

fn parse_panel(panel: &str) -> Result<PanelKind, ApiError> {
    panel
        .parse()
        .map_err(|e: PanelError| (StatusCode::NOT_FOUND, e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Portfolio
// ─────────────────────────────────────────────────────────────────────────────

/// Static page content.
#[derive(Debug, Serialize)]
struct PortfolioResponse {
    profile: &'static Profile,
    tech_stack: &'static [TechCategory],
    fun_facts: &'static [FunFact],
    experiences: &'static [Experience],
    education: &'static [Education],
    chat_enabled: bool,
}

/// GET /api/portfolio
async fn api_portfolio(State(state): State<AppState>) -> Json<PortfolioResponse> {
    Json(PortfolioResponse {
        profile: portfolio::profile(),
        tech_stack: portfolio::tech_stack(),
        fun_facts: portfolio::fun_facts(),
        experiences: portfolio::experiences(),
        education: portfolio::education(),
        chat_enabled: state.chat_enabled(),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Pages
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreatePageRequest {
    /// Client's `prefers-color-scheme: dark`.
    prefers_dark: bool,
}

/// POST /api/pages
async fn api_create_page(
    State(state): State<AppState>,
    req: Option<Json<CreatePageRequest>>,
) -> (StatusCode, Json<PageInfo>) {
    let Json(req) = req.unwrap_or_default();
    let page = state.pages.create(req.prefers_dark);
    (StatusCode::CREATED, Json(page.info()))
}

/// GET /api/pages/{id}
async fn api_get_page(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PageInfo>, ApiError> {
    let page = lookup_page(&state, &id)?;
    Ok(Json(page.info()))
}

/// DELETE /api/pages/{id}
async fn api_delete_page(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    match state.pages.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT,
        None => StatusCode::NOT_FOUND,
    }
}

/// GET /api/pages/{id}/events - SSE stream of page events.
async fn api_page_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let page = lookup_page(&state, &id)?;
    let mut rx = page.subscribe();
    drop(page);

    let sse_stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => yield Ok::<String, std::convert::Infallible>(sse_event(&event)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(page_id = %id, skipped, "SSE subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    };

    Ok(build_sse_response(Body::from_stream(sse_stream)))
}

fn build_sse_response(body: Body) -> Response {
    let mut resp = Response::new(body);
    let h = resp.headers_mut();
    h.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    h.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    h.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    h.insert("X-Accel-Buffering", HeaderValue::from_static("no"));
    resp
}

// ─────────────────────────────────────────────────────────────────────────────
// Panels
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/pages/{id}/panels/{panel}
async fn api_get_panel(
    State(state): State<AppState>,
    Path((id, panel)): Path<(String, String)>,
) -> Result<Json<PanelInfo>, ApiError> {
    let page = lookup_page(&state, &id)?;
    let kind = parse_panel(&panel)?;
    Ok(Json(page.panel(kind)))
}

#[derive(Debug, Deserialize)]
struct SelectRequest {
    id: String,
}

#[derive(Debug, Serialize)]
struct SelectResponse {
    outcome: SelectOutcome,
    snapshot: PanelSnapshot,
}

/// POST /api/pages/{id}/panels/{panel}/select
async fn api_select(
    State(state): State<AppState>,
    Path((id, panel)): Path<(String, String)>,
    Json(req): Json<SelectRequest>,
) -> Result<Json<SelectResponse>, ApiError> {
    let page = lookup_page(&state, &id)?;
    let kind = parse_panel(&panel)?;
    let outcome = page
        .select(kind, &req.id)
        .map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    Ok(Json(SelectResponse {
        outcome,
        snapshot: page.panel(kind).snapshot,
    }))
}

/// POST /api/pages/{id}/panels/{panel}/back
async fn api_back(
    State(state): State<AppState>,
    Path((id, panel)): Path<(String, String)>,
) -> Result<Json<PanelSnapshot>, ApiError> {
    let page = lookup_page(&state, &id)?;
    let kind = parse_panel(&panel)?;
    page.back(kind);
    Ok(Json(page.panel(kind).snapshot))
}

#[derive(Debug, Serialize)]
struct ThemeResponse {
    theme: Theme,
}

/// POST /api/pages/{id}/theme/toggle
async fn api_toggle_theme(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ThemeResponse>, ApiError> {
    let page = lookup_page(&state, &id)?;
    Ok(Json(ThemeResponse {
        theme: page.toggle_theme(),
    }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────────────────

/// GET /api/pages/{id}/chat
async fn api_chat_snapshot(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatSnapshot>, ApiError> {
    let page = lookup_page(&state, &id)?;
    let chat = lookup_chat(&page)?;
    Ok(Json(chat.snapshot()))
}

/// POST /api/pages/{id}/chat/open
async fn api_chat_open(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatSnapshot>, ApiError> {
    let page = lookup_page(&state, &id)?;
    let chat = lookup_chat(&page)?;
    chat.open().await;
    Ok(Json(chat.snapshot()))
}

/// POST /api/pages/{id}/chat/close
async fn api_chat_close(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ChatSnapshot>, ApiError> {
    let page = lookup_page(&state, &id)?;
    let chat = lookup_chat(&page)?;
    chat.close();
    Ok(Json(chat.snapshot()))
}

#[derive(Debug, Deserialize)]
struct SendRequest {
    text: String,
}

/// POST /api/pages/{id}/chat/messages - Send and wait for the reply.
async fn api_chat_send(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SendRequest>,
) -> Result<Json<ChatSnapshot>, ApiError> {
    let page = lookup_page(&state, &id)?;
    let chat = lookup_chat(&page)?;
    chat.send(&req.text).await;
    Ok(Json(chat.snapshot()))
}

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
}

/// Outcome reported for an injected query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum QueryStatus {
    Submitted,
    AlreadyHandled,
    Superseded,
    /// Not picked up within the acknowledgement window; still queued.
    Pending,
}

impl From<QueryDisposition> for QueryStatus {
    fn from(d: QueryDisposition) -> Self {
        match d {
            QueryDisposition::Submitted => Self::Submitted,
            QueryDisposition::AlreadyHandled => Self::AlreadyHandled,
            QueryDisposition::Superseded => Self::Superseded,
        }
    }
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    status: QueryStatus,
}

/// Run the injection in the background and wait briefly for its callback.
///
/// The callback fires once the user message is appended, so the response
/// does not wait for the model's reply.
async fn dispatch_query(page: Page, query: String) -> Result<Json<QueryResponse>, ApiError> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        page.ask(&query, move |d| {
            let _ = tx.send(d);
        })
        .await;
    });

    let status = match tokio::time::timeout(INJECT_ACK_TIMEOUT, rx).await {
        Ok(Ok(d)) => QueryStatus::from(d),
        Ok(Err(_)) => {
            return Err((StatusCode::UNPROCESSABLE_ENTITY, "query was not accepted".to_string()));
        }
        Err(_) => QueryStatus::Pending,
    };
    Ok(Json(QueryResponse { status }))
}

fn validate_query(page: &Page, query: &str) -> Result<(), ApiError> {
    lookup_chat(page)?;
    if query.trim().is_empty() {
        return Err((StatusCode::UNPROCESSABLE_ENTITY, "query must not be blank".to_string()));
    }
    Ok(())
}

/// POST /api/pages/{id}/chat/inject
async fn api_chat_inject(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let page = lookup_page(&state, &id)?;
    validate_query(&page, &req.query)?;
    dispatch_query(page, req.query).await
}

/// POST /api/pages/{id}/ask - The "Ask AI" card.
async fn api_ask(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let page = lookup_page(&state, &id)?;
    validate_query(&page, &req.query)?;
    tracing::info!(page_id = %id, query_length = req.query.len(), "Ask AI query received");
    dispatch_query(page, req.query).await
}
