use axum::{extract::Path, response::Json};

use crate::schema;

use super::{ApiErr, dto::KindResponse};

pub async fn list_kinds() -> Json<Vec<KindResponse>> {
    Json(schema::kinds().iter().map(KindResponse::from).collect())
}

pub async fn get_kind(Path(kind): Path<String>) -> Result<Json<KindResponse>, ApiErr> {
    let kind = schema::lookup(&kind).map_err(|e| ApiErr::not_found(e.to_string()))?;
    Ok(Json(KindResponse::from(kind)))
}
