use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use streaksense_core::acquire::ReportService;
use streaksense_core::domain::freshness::FreshnessPolicy;
use streaksense_core::domain::report::AnalysisReport;
use streaksense_core::llm::anthropic::AnthropicClient;
use streaksense_core::llm::error::GeneratorError;
use streaksense_core::storage::reports::PgReportStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = streaksense_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let service = build_service(&settings).await;
    if service.is_none() {
        tracing::error!("report service unavailable; starting API in degraded mode");
    }

    let state = AppState { service };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/reports/:date", get(get_report_for_date))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

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

async fn build_service(
    settings: &streaksense_core::config::Settings,
) -> Option<Arc<ReportService>> {
    let pool = match settings.require_database_url() {
        Ok(db_url) => match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
        {
            Ok(pool) => match streaksense_core::storage::migrate(&pool).await {
                Ok(()) => Some(pool),
                Err(e) => {
                    sentry_anyhow::capture_anyhow(&e);
                    tracing::error!(error = %e, "db migrations failed");
                    None
                }
            },
            Err(e) => {
                let err = anyhow::Error::new(e);
                sentry_anyhow::capture_anyhow(&err);
                tracing::error!(error = %err, "db connect failed");
                None
            }
        },
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "DATABASE_URL missing");
            None
        }
    }?;

    let generator = match AnthropicClient::from_settings(settings) {
        Ok(client) => client,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "generator client unavailable");
            return None;
        }
    };

    Some(Arc::new(ReportService::new(
        Arc::new(PgReportStore::new(pool)),
        Arc::new(generator),
        FreshnessPolicy::from_settings(settings),
    )))
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    service: Option<Arc<ReportService>>,
}

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

async fn get_report_for_date(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let Some(service) = &state.service else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "report service unavailable",
        ));
    };

    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "date must be YYYY-MM-DD"))?;

    match service.acquire_report(date).await {
        Ok(report) => Ok(Json(report)),
        Err(err) => {
            let (status, message) = match err.downcast_ref::<GeneratorError>() {
                Some(refusal @ GeneratorError::BackendRefusal { .. }) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, refusal.to_string())
                }
                Some(GeneratorError::SchemaViolation { .. })
                | Some(GeneratorError::Transport { .. }) => (
                    StatusCode::BAD_GATEWAY,
                    "report generation failed".to_string(),
                ),
                None => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_string(),
                ),
            };
            if status.is_server_error() {
                sentry_anyhow::capture_anyhow(&err);
            }
            let chain = format!("{err:#}");
            tracing::error!(%date, error = %chain, "report acquisition failed");
            Err(api_error(status, message))
        }
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(
    settings: &streaksense_core::config::Settings,
) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
