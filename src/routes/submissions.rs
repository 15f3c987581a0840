use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::error::AppError;
use crate::models::NewSubmission;
use crate::state::SharedState;
use crate::store::Fields;

pub async fn create(
    State(state): State<SharedState>,
    payload: Result<Json<NewSubmission>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(input) = payload.map_err(|rejection| {
        tracing::warn!("create_submission rejected body ({})", rejection.status());
        AppError::from(rejection)
    })?;

    let created = state.submissions.create(input).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Submission received",
            "id": created.id,
            "data": created.data,
        })),
    ))
}

pub async fn list(State(state): State<SharedState>) -> Result<Json<Vec<Fields>>, AppError> {
    let records = state.submissions.list().await?;
    Ok(Json(records))
}
