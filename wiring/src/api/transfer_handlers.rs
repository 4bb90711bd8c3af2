use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderName, header},
    response::{IntoResponse, Json},
};

use crate::export::{self, XLSX_MIME};
use crate::import;
use crate::sheet::{self, SheetData};

use super::{
    ApiErr, ApiState,
    dto::{ImportQuery, ImportResponse},
};

const TOTAL_RECORDS: HeaderName = HeaderName::from_static("x-total-records");

fn attachment(file_name: &str) -> String {
    format!("attachment; filename=\"{file_name}\"")
}

async fn parse_workbook(body: Bytes) -> Result<Vec<SheetData>, ApiErr> {
    tokio::task::spawn_blocking(move || sheet::read_workbook(&body))
        .await
        .map_err(ApiErr::internal)?
        .map_err(ApiErr::unprocessable)
}

/// Raw `.xlsx` body. `?kind=` limits the import to one sheet.
pub async fn import_workbook(
    State(state): State<ApiState>,
    Path(project_id): Path<i32>,
    Query(params): Query<ImportQuery>,
    body: Bytes,
) -> Result<Json<ImportResponse>, ApiErr> {
    state.projects.get(project_id).await?;
    let sheets = parse_workbook(body).await?;

    let response: ImportResponse = match params.kind {
        Some(kind) => import::import_sheet(&state.records, project_id, &kind, &sheets)
            .await?
            .into(),
        None => import::import_workbook(&state.records, project_id, &sheets)
            .await?
            .into(),
    };
    Ok(Json(response))
}

pub async fn export_xlsx(
    State(state): State<ApiState>,
    Path(project_id): Path<i32>,
) -> Result<impl IntoResponse, ApiErr> {
    let file = export::export_project(&state.records, project_id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, XLSX_MIME.to_string()),
            (header::CONTENT_DISPOSITION, attachment(&file.file_name)),
            (TOTAL_RECORDS, file.total_records.to_string()),
        ],
        file.bytes,
    ))
}

pub async fn export_pdf(
    State(state): State<ApiState>,
    Path(project_id): Path<i32>,
) -> Result<impl IntoResponse, ApiErr> {
    let file = export::export_project(&state.records, project_id).await?;
    let pdf = state.converter.convert_to_pdf(&file.bytes).await?;
    let pdf_name = file.file_name.replace(".xlsx", ".pdf");
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, attachment(&pdf_name)),
            (TOTAL_RECORDS, file.total_records.to_string()),
        ],
        pdf,
    ))
}

/// Convert an uploaded workbook without touching any project.
pub async fn convert_pdf(
    State(state): State<ApiState>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiErr> {
    if body.is_empty() {
        return Err(ApiErr::unprocessable("No file uploaded"));
    }
    let pdf = state.converter.convert_to_pdf(&body).await?;
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, attachment("converted.pdf")),
        ],
        pdf,
    ))
}
