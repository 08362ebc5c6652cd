use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};

use tower_http::services::ServeDir;
use tracing::{info, warn};

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "slowdown")]
use super::slowdown_request;
use super::{
    log_requests,
    metrics::{init_metrics, metrics_handler},
    state::*,
    RequestsLoggingLevel, ServerConfig,
};
use crate::ledger::{added_message, redeemed_message, LedgerError, PointLedger};
use crate::store::HistoryEntry;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: String,
}

#[derive(Serialize)]
struct SettingsResponse {
    redemption_cost: u32,
    accrual_amount: u32,
    max_accrual_amount: u32,
    reward_name: String,
}

#[derive(Serialize)]
struct BalanceResponse {
    phone_number: String,
    points: u32,
}

#[derive(Serialize)]
struct PointsChangedResponse {
    phone_number: String,
    points: u32,
    message: String,
}

#[derive(Deserialize, Debug, Default)]
struct AccrueBody {
    amount: Option<u32>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// A failed request rendered as a JSON error response.
enum ApiError {
    Ledger(LedgerError),
    InvalidBody(JsonRejection),
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Ledger(err) if err.is_validation() => StatusCode::BAD_REQUEST,
            ApiError::Ledger(
                LedgerError::InsufficientPoints { .. } | LedgerError::BalanceOverflow { .. },
            ) => StatusCode::CONFLICT,
            ApiError::Ledger(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Ledger(err) => {
                if status == StatusCode::BAD_GATEWAY {
                    warn!("Store failure while serving request: {}", err);
                }
                ErrorBody {
                    error: err.kind(),
                    message: err.user_message(),
                }
            }
            ApiError::InvalidBody(rejection) => ErrorBody {
                error: "invalid_body",
                message: format!(
                    "Please send the amount as JSON, e.g. {{\"amount\": 1}} ({})",
                    rejection.body_text()
                ),
            },
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: state.version.clone(),
    };
    Json(stats)
}

async fn get_settings(State(ledger): State<GuardedPointLedger>) -> Json<SettingsResponse> {
    let settings = ledger.settings();
    Json(SettingsResponse {
        redemption_cost: settings.redemption_cost,
        accrual_amount: settings.accrual_amount,
        max_accrual_amount: settings.max_accrual_amount,
        reward_name: settings.reward_name.clone(),
    })
}

async fn get_points(
    State(ledger): State<GuardedPointLedger>,
    Path(phone): Path<String>,
) -> ApiResult<BalanceResponse> {
    let phone = ledger.validate_phone(&phone)?;
    let points = ledger.get_balance(&phone).await?;
    Ok(Json(BalanceResponse {
        phone_number: phone.to_string(),
        points,
    }))
}

async fn post_accrue(
    State(ledger): State<GuardedPointLedger>,
    Path(phone): Path<String>,
    body: Result<Option<Json<AccrueBody>>, JsonRejection>,
) -> ApiResult<PointsChangedResponse> {
    let phone = ledger.validate_phone(&phone)?;
    let amount = body?
        .and_then(|Json(body)| body.amount)
        .unwrap_or(ledger.settings().accrual_amount);
    let points = ledger.add_points(&phone, amount).await?;
    Ok(Json(PointsChangedResponse {
        phone_number: phone.to_string(),
        points,
        message: added_message(amount, points),
    }))
}

async fn post_redeem(
    State(ledger): State<GuardedPointLedger>,
    Path(phone): Path<String>,
) -> ApiResult<PointsChangedResponse> {
    let phone = ledger.validate_phone(&phone)?;
    let points = ledger.redeem(&phone).await?;
    Ok(Json(PointsChangedResponse {
        phone_number: phone.to_string(),
        points,
        message: redeemed_message(ledger.settings(), points),
    }))
}

async fn get_redemptions(
    State(ledger): State<GuardedPointLedger>,
) -> ApiResult<Vec<HistoryEntry>> {
    Ok(Json(ledger.list_history().await?))
}

pub fn make_app(config: ServerConfig, ledger: Arc<PointLedger>) -> Router {
    let state = ServerState::new(config.clone(), ledger);

    let points_routes: Router<ServerState> = Router::new()
        .route("/{phone}", get(get_points))
        .route("/{phone}/accrue", post(post_accrue))
        .route("/{phone}/redeem", post(post_redeem));

    let api_routes: Router = Router::new()
        .route("/settings", get(get_settings))
        .route("/redemptions", get(get_redemptions))
        .nest("/points", points_routes)
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new().route("/", get(home)).with_state(state.clone()),
    };

    let mut app: Router = home_router.nest("/v1", api_routes);

    #[cfg(feature = "slowdown")]
    {
        app = app.layer(middleware::from_fn(slowdown_request));
    }
    app = app.layer(middleware::from_fn_with_state(state, log_requests));

    app
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(
    ledger: Arc<PointLedger>,
    requests_logging_level: RequestsLoggingLevel,
    port: u16,
    metrics_port: u16,
    frontend_dir_path: Option<String>,
) -> Result<()> {
    init_metrics();

    let config = ServerConfig {
        requests_logging_level,
        port,
        metrics_port,
        frontend_dir_path,
    };
    let app = make_app(config, ledger);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind kiosk server to port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics server to port {}", metrics_port))?;

    info!("Kiosk API listening on port {}", port);
    info!("Metrics available at port {}", metrics_port);

    tokio::try_join!(
        async { axum::serve(listener, app).await },
        async { axum::serve(metrics_listener, make_metrics_app()).await },
    )?;
    Ok(())
}
