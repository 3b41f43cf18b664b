use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sake_core::domain::record::{parse_records, DrinkingRecord, Menu};
use sake_core::domain::recommendation::RecommendationResult;
use sake_core::domain::taste::TasteProfile;
use sake_core::service::SakeAdvisor;
use sake_core::storage::{HistoryStore, PgHistoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = sake_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let pool: Option<PgPool> = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match sake_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed; history store disabled");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed; history store disabled");
                None
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "DATABASE_URL missing; history store disabled");
            None
        }
    };

    let advisor = match SakeAdvisor::from_settings(&settings) {
        Ok(advisor) => Some(advisor),
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "model client unavailable; non-empty invocations will return 503");
            None
        }
    };

    let state = AppState {
        advisor,
        store: pool.map(|p| Arc::new(PgHistoryStore::new(p)) as Arc<dyn HistoryStore>),
        history_limit: settings.history_limit,
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/invocations", post(invocations))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    advisor: Option<SakeAdvisor>,
    store: Option<Arc<dyn HistoryStore>>,
    history_limit: i64,
}

#[derive(Debug, Deserialize)]
struct InvocationRequest {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    drinking_records: Option<Vec<Value>>,
    #[serde(default)]
    menu_brands: Option<Vec<String>>,
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    StoreUnavailable,
    ModelNotConfigured,
    ModelUnreachable,
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::StoreUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "history store is not configured".to_string(),
            ),
            ApiError::ModelNotConfigured => (
                StatusCode::SERVICE_UNAVAILABLE,
                "model client is not configured".to_string(),
            ),
            ApiError::ModelUnreachable => (
                StatusCode::BAD_GATEWAY,
                "model could not be reached".to_string(),
            ),
            ApiError::Internal(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(error = %e, "invocation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

async fn invocations(
    State(state): State<AppState>,
    payload: Result<Json<InvocationRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let result = dispatch(&state, req).await?;
    Ok(Json(json!({ "result": result })))
}

async fn dispatch(state: &AppState, req: InvocationRequest) -> Result<Value, ApiError> {
    let kind = req.kind.as_str();
    if !matches!(kind, "recommendation" | "taste_analysis") {
        return Err(ApiError::BadRequest(format!("unknown invocation type: {kind}")));
    }

    let menu = match (kind, req.menu_brands.as_deref()) {
        ("recommendation", Some(brands)) => {
            Some(Menu::new(brands).map_err(|e| ApiError::BadRequest(e.to_string()))?)
        }
        _ => None,
    };

    let history = load_history(state, req.user_id.as_deref(), req.drinking_records).await?;
    tracing::info!(kind, records = history.len(), "invocation received");

    // An empty history is answered without the model.
    if history.is_empty() {
        let result = if kind == "recommendation" {
            serde_json::to_value(RecommendationResult::no_history())
        } else {
            serde_json::to_value(TasteProfile::no_history())
        };
        return result.map_err(|e| ApiError::Internal(e.into()));
    }

    let advisor = state.advisor.as_ref().ok_or(ApiError::ModelNotConfigured)?;
    let result = if kind == "recommendation" {
        let result = advisor
            .build_recommendations(&history, menu.as_ref())
            .await
            .map_err(|e| {
                tracing::error!(error_kind = e.kind(), error = %e, "recommendation failed");
                ApiError::ModelUnreachable
            })?;
        serde_json::to_value(result)
    } else {
        serde_json::to_value(advisor.build_taste_profile(&history).await)
    };

    result.map_err(|e| ApiError::Internal(e.into()))
}

/// Inline records win; otherwise the store is queried by `user_id`.
async fn load_history(
    state: &AppState,
    user_id: Option<&str>,
    inline: Option<Vec<Value>>,
) -> Result<Vec<DrinkingRecord>, ApiError> {
    if let Some(raw) = inline {
        return Ok(parse_records(raw));
    }

    let user_id = user_id
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("user_id or drinking_records is required".to_string()))?;
    let store = state.store.as_ref().ok_or(ApiError::StoreUnavailable)?;

    store
        .records_for_user(user_id, state.history_limit)
        .await
        .map_err(ApiError::Internal)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &sake_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
