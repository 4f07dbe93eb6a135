use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use slipway_core::intake::CreateServiceRequest;
use slipway_core::service::ServiceRecord;

use crate::error::AppError;
use crate::state::AppState;

fn to_external(record: &ServiceRecord) -> Result<serde_json::Value, AppError> {
    Ok(serde_json::to_value(record)?)
}

/// POST /v1/services: register a service and admit it for reconciliation.
pub async fn create_service(
    State(app): State<AppState>,
    Json(body): Json<CreateServiceRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let record = app.intake.create(body).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "service": to_external(&record)? })),
    ))
}

/// GET /v1/services/:name: one service record.
pub async fn get_service(
    State(app): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let intake = app.intake.clone();
    let record = tokio::task::spawn_blocking(move || intake.get(&name))
        .await
        .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;
    Ok(Json(serde_json::json!({ "service": to_external(&record)? })))
}

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub next_token: String,
}

fn default_max_results() -> usize {
    100
}

/// GET /v1/services: one page of services ordered by name.
/// `next_token` is returned when the page filled up.
pub async fn list_services(
    State(app): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, AppError> {
    let intake = app.intake.clone();
    let max_results = params.max_results;
    let records = tokio::task::spawn_blocking(move || {
        intake.list(max_results, &params.next_token)
    })
    .await
    .map_err(|e| AppError(anyhow::anyhow!("task join error: {e}")))??;

    let next_token = if records.len() >= max_results {
        records.last().map(|r| r.name.clone())
    } else {
        None
    };
    let services = records
        .iter()
        .map(to_external)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(serde_json::json!({
        "services": services,
        "next_token": next_token,
    })))
}
