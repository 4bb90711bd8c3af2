use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{Map, Value};

use super::{
    ApiErr, ApiState,
    dto::{RecordResponse, column_values},
};

pub async fn list_records(
    State(state): State<ApiState>,
    Path((project_id, kind)): Path<(i32, String)>,
) -> Result<Json<Vec<RecordResponse>>, ApiErr> {
    // a missing project reads as an error, not as an empty list
    state.projects.get(project_id).await?;
    let records = state.records.list(&kind, project_id).await?;
    Ok(Json(records.into_iter().map(Into::into).collect()))
}

pub async fn create_record(
    State(state): State<ApiState>,
    Path((project_id, kind)): Path<(i32, String)>,
    Json(body): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<RecordResponse>), ApiErr> {
    let record = state
        .records
        .create(&kind, project_id, &column_values(body))
        .await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

pub async fn get_record(
    State(state): State<ApiState>,
    Path((project_id, kind, id)): Path<(i32, String, i32)>,
) -> Result<Json<RecordResponse>, ApiErr> {
    let record = state.records.get(&kind, project_id, id).await?;
    Ok(Json(record.into()))
}

pub async fn update_record(
    State(state): State<ApiState>,
    Path((project_id, kind, id)): Path<(i32, String, i32)>,
    Json(body): Json<Map<String, Value>>,
) -> Result<Json<RecordResponse>, ApiErr> {
    let record = state
        .records
        .update(&kind, project_id, id, &column_values(body))
        .await?;
    Ok(Json(record.into()))
}

pub async fn delete_record(
    State(state): State<ApiState>,
    Path((project_id, kind, id)): Path<(i32, String, i32)>,
) -> Result<StatusCode, ApiErr> {
    state.records.delete(&kind, project_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
