//! HTTP transport for the lesson backend.
//!
//! Axum router with JSON error bodies, a request-body limit, CORS restricted
//! to the configured origin, and per-request logging plus in-memory metrics.

use axum::{
    Json, Router,
    body::Body,
    extract::{
        DefaultBodyLimit, FromRequest, MatchedPath, Request, State, rejection::JsonRejection,
    },
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::{cmp::Ordering, collections::HashMap, sync::Arc, time::Instant};
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use uuid::Uuid;

use crate::catalog::LegacyPeriodRow;
use crate::clients::LessonModel;
use crate::config::Config;
use crate::error::{LessonForgeError, Result};
use crate::lessons::LessonService;
use crate::schemas::{GenerateRequest, GenerateResponse, SuggestRequest, SuggestResponse};

const LATENCY_WINDOW: usize = 256;
/// Metrics key shared by every request no route matched
const FALLBACK_ROUTE: &str = "<fallback>";

/// Shared state for HTTP server
#[derive(Clone)]
pub struct HttpState {
    pub config: Arc<Config>,
    pub service: Arc<LessonService>,
    pub metrics: Arc<Mutex<HttpMetrics>>,
    pub started_at: DateTime<Utc>,
}

impl HttpState {
    pub fn new(config: Arc<Config>, model: Arc<dyn LessonModel>) -> Self {
        Self {
            service: Arc::new(LessonService::new(config.clone(), model)),
            config,
            metrics: Arc::new(Mutex::new(HttpMetrics::new())),
            started_at: Utc::now(),
        }
    }
}

/// Metrics for HTTP server
#[derive(Debug, Clone)]
pub struct HttpMetrics {
    pub total_requests: u64,
    pub errors_total: u64,
    pub latencies: Vec<f64>, // ring buffer for p95
    /// Keyed by route pattern, never by raw path
    pub routes_count: HashMap<String, u64>,
}

impl HttpMetrics {
    fn new() -> Self {
        Self {
            total_requests: 0,
            errors_total: 0,
            latencies: Vec::with_capacity(LATENCY_WINDOW),
            routes_count: HashMap::new(),
        }
    }

    fn record(&mut self, route: &str, status: StatusCode, latency_ms: f64) {
        self.latencies.push(latency_ms);
        if self.latencies.len() > LATENCY_WINDOW {
            self.latencies.remove(0);
        }
        if status.is_server_error() || status.is_client_error() {
            self.errors_total = self.errors_total.saturating_add(1);
        }
        self.total_requests = self.total_requests.saturating_add(1);
        *self.routes_count.entry(route.to_string()).or_default() += 1;
    }

    /// (avg, p95) over the latency window
    fn latency_stats(&self) -> (Option<f64>, Option<f64>) {
        if self.latencies.is_empty() {
            return (None, None);
        }
        let sum: f64 = self.latencies.iter().sum();
        let avg = sum / self.latencies.len() as f64;
        let mut sorted = self.latencies.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let p95_idx = ((sorted.len() as f64 * 0.95) as usize).min(sorted.len() - 1);
        (Some(avg), sorted.get(p95_idx).copied())
    }
}

/// `Json` extractor whose rejections use the API's `{ error, status }` body.
/// Missing or wrong content types keep axum's 415.
pub struct JsonBody<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> Response {
    let status = rejection.status();
    let message = match &rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Unsupported Media Type: use application/json".to_string()
        }
        other => other.body_text(),
    };
    tracing::debug!("Rejected JSON body ({}): {}", status, rejection.body_text());
    (
        status,
        Json(json!({ "error": message, "status": status.as_u16() })),
    )
        .into_response()
}

/// Health check endpoint; never calls the provider
pub async fn health_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let provider = &state.config.provider;
    let metrics = state.metrics.lock().await.clone();
    let (_, p95_latency_ms) = metrics.latency_stats();

    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "provider": state.service.provider_name(),
        "models": {
            "suggest": provider.suggest_model,
            "generate": provider.generate_model,
        },
        "model_region": provider.location,
        "runtime_region": state.config.runtime.runtime_region.as_deref().unwrap_or("unknown"),
        "api_key_configured": state.config.runtime.gemini_api_key.is_some(),
        "started_at": state.started_at,
        "uptime_secs": (Utc::now() - state.started_at).num_seconds(),
        "total_requests": metrics.total_requests,
        "p95_latency_ms": p95_latency_ms,
    }))
}

/// Connectivity probe: one tiny provider call
pub async fn diag_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let report = state.service.probe().await;
    let status = if report.ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

pub async fn metrics_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let metrics = state.metrics.lock().await.clone();
    let (avg_latency_ms, p95_latency_ms) = metrics.latency_stats();

    let mut routes: Vec<_> = metrics.routes_count.iter().collect();
    routes.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    let routes: Vec<_> = routes
        .into_iter()
        .map(|(route, count)| json!({ "route": route, "count": count }))
        .collect();

    Json(json!({
        "metrics_version": "1",
        "total_requests": metrics.total_requests,
        "errors_total": metrics.errors_total,
        "avg_latency_ms": avg_latency_ms,
        "p95_latency_ms": p95_latency_ms,
        "routes": routes,
    }))
}

/// Periods with their topics, for the UI's pickers
pub async fn options_handler(State(state): State<HttpState>) -> impl IntoResponse {
    Json(json!({ "periods": state.config.periods }))
}

/// Older UI shape: `{ items: [{ tv, label, ka }] }`
pub async fn tijdvakken_handler(State(state): State<HttpState>) -> impl IntoResponse {
    let items: Vec<LegacyPeriodRow> = state.config.periods.iter().map(Into::into).collect();
    Json(json!({ "items": items }))
}

/// The causes list the enhancer falls back to
pub async fn causes_handler(State(state): State<HttpState>) -> impl IntoResponse {
    Json(json!({ "causes": state.service.enhancer().default_causes() }))
}

pub async fn suggest_handler(
    State(state): State<HttpState>,
    JsonBody(req): JsonBody<SuggestRequest>,
) -> Result<Json<SuggestResponse>> {
    let suggestions = state.service.suggest(&req).await?;
    Ok(Json(SuggestResponse::ok(suggestions)))
}

pub async fn generate_handler(
    State(state): State<HttpState>,
    JsonBody(req): JsonBody<GenerateRequest>,
) -> Result<Json<GenerateResponse>> {
    let enhancement = state.service.generate(&req).await?;
    let outcome = enhancement.outcome();
    let report = enhancement.report().cloned();
    Ok(Json(GenerateResponse {
        status: "ok",
        markdown: enhancement.into_markdown(),
        enhancement: outcome,
        report,
        generated_at: Utc::now(),
    }))
}

async fn fallback_handler() -> LessonForgeError {
    LessonForgeError::NotFound
}

/// Exact configured origin, or any origin for `*`
fn cors_layer(allowed_origin: &str) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);
    let origin = allowed_origin.trim();
    if origin == "*" {
        return base.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => base.allow_origin(AllowOrigin::exact(value)),
        Err(e) => {
            tracing::warn!("Invalid ALLOWED_ORIGIN {:?} ({}); no origin allowed", origin, e);
            base
        }
    }
}

/// Build the application router
pub fn build_router(state: HttpState) -> Router {
    let config = state.config.clone();

    Router::new()
        .route("/health", get(health_handler))
        .route("/diag", get(diag_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/options", get(options_handler))
        .route("/api/tijdvakken", get(tijdvakken_handler))
        .route("/api/causes", get(causes_handler))
        .route("/api/suggest", post(suggest_handler))
        .route("/api/generate", post(generate_handler))
        .fallback(fallback_handler)
        .layer(DefaultBodyLimit::max(config.server.body_limit_bytes))
        .layer(cors_layer(&config.server.allowed_origin))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            |State(metrics): State<Arc<Mutex<HttpMetrics>>>,
             req: axum::http::Request<Body>,
             next: Next| async move {
                let request_id = Uuid::new_v4();
                let method = req.method().clone();
                let path = req.uri().path().to_string();
                let route = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_else(|| FALLBACK_ROUTE.to_string());
                let start = Instant::now();

                let resp = next.run(req).await;

                let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
                let status = resp.status();
                tracing::info!(
                    %request_id,
                    %method,
                    path = %path,
                    status = status.as_u16(),
                    latency_ms = latency_ms as u64,
                    "request"
                );
                metrics.lock().await.record(&route, status, latency_ms);
                resp
            },
        ))
        .with_state(state)
}

/// Start the HTTP server
pub async fn start_http_server(config: Arc<Config>, model: Arc<dyn LessonModel>) -> Result<()> {
    if config.server.allowed_origin.trim() == "*" {
        tracing::warn!("CORS allows any origin; set ALLOWED_ORIGIN for production");
    }

    let bind = config.server.bind;
    let app = build_router(HttpState::new(config.clone(), model));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind HTTP listener: {}", e))?;

    tracing::info!(
        "Starting HTTP server on {} (suggest={}, generate={})",
        bind,
        config.provider.suggest_model,
        config.provider.generate_model
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

    Ok(())
}
