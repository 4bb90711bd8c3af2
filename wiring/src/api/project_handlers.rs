use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};

use super::{
    ApiErr, ApiState,
    dto::{
        CreateProjectRequest, DeleteProjectQuery, DeletedResponse, PreviewKindResponse,
        ProjectResponse, ProjectSummaryResponse,
    },
};

pub async fn list_projects(
    State(state): State<ApiState>,
) -> Result<Json<Vec<ProjectSummaryResponse>>, ApiErr> {
    let projects = state.projects.list().await?;
    Ok(Json(projects.into_iter().map(Into::into).collect()))
}

pub async fn create_project(
    State(state): State<ApiState>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), ApiErr> {
    let project = state
        .projects
        .create(&body.name, body.description.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(project.into())))
}

/// Implicit project for a client that has none selected yet.
pub async fn create_default_project(
    State(state): State<ApiState>,
) -> Result<(StatusCode, Json<ProjectResponse>), ApiErr> {
    let project = state.projects.create_default().await?;
    Ok((StatusCode::CREATED, Json(project.into())))
}

pub async fn get_project(
    State(state): State<ApiState>,
    Path(id): Path<i32>,
) -> Result<Json<ProjectSummaryResponse>, ApiErr> {
    Ok(Json(state.projects.summary(id).await?.into()))
}

pub async fn delete_project(
    State(state): State<ApiState>,
    Path(id): Path<i32>,
    Query(params): Query<DeleteProjectQuery>,
) -> Result<Json<DeletedResponse>, ApiErr> {
    let deleted = state.projects.delete(id, params.active_project).await?;
    Ok(Json(DeletedResponse { deleted }))
}

pub async fn clear_project(
    State(state): State<ApiState>,
    Path(id): Path<i32>,
) -> Result<Json<DeletedResponse>, ApiErr> {
    let deleted = state.projects.clear(id).await?;
    Ok(Json(DeletedResponse { deleted }))
}

pub async fn preview_project(
    State(state): State<ApiState>,
    Path(id): Path<i32>,
) -> Result<Json<Vec<PreviewKindResponse>>, ApiErr> {
    let preview = state.projects.preview(id).await?;
    Ok(Json(preview.into_iter().map(Into::into).collect()))
}
