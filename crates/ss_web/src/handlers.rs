use std::any::Any;
use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use ss_core::SheetRecord;
use ss_scrappers::pipeline::{open_workbook, workbook_reference};
use tracing::info;

use crate::{error::ApiError, AppState};

pub async fn scrape(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let report = state.run_pass().await?;
    if report.rows_read == 0 {
        return Err(ApiError::not_found("No rows found in the worksheet"));
    }

    info!(persisted = report.persisted(), "Trigger handled");
    Ok(Json(json!({
        "message": "News articles and tweets scraped and saved successfully!",
        "report": report,
    })))
}

pub async fn dataset(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BTreeMap<String, Vec<SheetRecord>>>, ApiError> {
    let book = open_workbook(&state.settings, state.sheets.as_ref()).await?;
    let names = state.processor.sheets();

    let mut data = BTreeMap::new();
    for name in [&names.news, &names.tweets] {
        let rows = book.get_rows(name).await?;
        data.insert(name.clone(), rows);
    }

    if data.values().all(Vec::is_empty) {
        return Err(ApiError::not_found("No data found in the destination worksheets"));
    }
    Ok(Json(data))
}

pub async fn health(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    workbook_reference(&state.settings, state.sheets.as_ref())?;
    Ok(Json(json!({ "status": "ok" })))
}

pub async fn not_found() -> ApiError {
    ApiError::not_found("Resource not found")
}

pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "An internal error occurred" })),
    )
        .into_response()
}
