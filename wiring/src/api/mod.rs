use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tower_http::normalize_path::NormalizePathLayer;
use tower_http::services::ServeDir;
use tower_http::set_header::response::SetResponseHeaderLayer;

use crate::config::ServerConfig;
use crate::convert::{ConversionError, DocumentConverter};
use crate::export::ExportError;
use crate::import::ImportError;
use crate::projects::ProjectStore;
use crate::store::{RecordStore, StoreError};

pub mod dto;
pub mod project_handlers;
pub mod record_handlers;
pub mod schema_handlers;
pub mod transfer_handlers;

/// Uploaded workbooks can be well past axum's 2 MB default.
const UPLOAD_LIMIT: usize = 64 * 1024 * 1024;

// ---------- shared state ----------

#[derive(Clone)]
pub struct ApiState {
    pub projects: ProjectStore,
    pub records: RecordStore,
    pub converter: Arc<dyn DocumentConverter>,
}

impl ApiState {
    pub fn new(db: DatabaseConnection, converter: Arc<dyn DocumentConverter>) -> Self {
        Self {
            projects: ProjectStore::new(db.clone()),
            records: RecordStore::new(db),
            converter,
        }
    }
}

// ---------- error type ----------

/// A JSON error response: `{"error": "..."}` with an HTTP status.
#[derive(Debug)]
pub struct ApiErr(StatusCode, String);

impl ApiErr {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self(status, msg.into())
    }

    pub fn internal(e: impl std::fmt::Display) -> Self {
        tracing::error!(error = %e, "request failed");
        Self(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self(StatusCode::NOT_FOUND, msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self(StatusCode::CONFLICT, msg.into())
    }

    pub fn unprocessable(msg: impl Into<String>) -> Self {
        Self(StatusCode::UNPROCESSABLE_ENTITY, msg.into())
    }

    pub fn status(&self) -> StatusCode {
        self.0
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.1 });
        (self.0, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiErr {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UnknownKind(_)
            | StoreError::ProjectNotFound(_)
            | StoreError::RecordNotFound { .. } => ApiErr::not_found(e.to_string()),
            StoreError::EmptySubmission | StoreError::InvalidName => {
                ApiErr::unprocessable(e.to_string())
            }
            StoreError::ActiveProject(_) => ApiErr::conflict(e.to_string()),
            StoreError::Storage(_) => ApiErr::internal(e),
        }
    }
}

impl From<ImportError> for ApiErr {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::UnknownKind(_) | ImportError::ProjectNotFound(_) => {
                ApiErr::not_found(e.to_string())
            }
            ImportError::Workbook(_)
            | ImportError::SheetNotFound { .. }
            | ImportError::MissingColumns { .. } => ApiErr::unprocessable(e.to_string()),
            ImportError::Storage(inner) => inner.into(),
        }
    }
}

impl From<ExportError> for ApiErr {
    fn from(e: ExportError) -> Self {
        match e {
            ExportError::ProjectNotFound(_) => ApiErr::not_found(e.to_string()),
            ExportError::Storage(inner) => inner.into(),
            ExportError::Xlsx(_) => ApiErr::internal(e),
        }
    }
}

impl From<ConversionError> for ApiErr {
    fn from(e: ConversionError) -> Self {
        match e {
            ConversionError::Timeout(_) => ApiErr::new(StatusCode::GATEWAY_TIMEOUT, e.to_string()),
            _ => ApiErr::new(StatusCode::BAD_GATEWAY, e.to_string()),
        }
    }
}

// ---------- router ----------

pub fn api_router(state: ApiState, config: &ServerConfig) -> Router {
    let allowed_origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = if allowed_origins.is_empty() {
        CorsLayer::new() // no origins allowed = same-origin only
    } else {
        CorsLayer::new()
            .allow_origin(allowed_origins)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
            .expose_headers([header::CONTENT_DISPOSITION])
    };

    let mut router = Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .nest("/api/v1", api_v1());
    if let Some(dir) = &config.ui_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(cors)
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(NormalizePathLayer::trim_trailing_slash())
        .with_state(state)
}

fn api_v1() -> Router<ApiState> {
    Router::new()
        // registry
        .route("/kinds", get(schema_handlers::list_kinds))
        .route("/kinds/{kind}", get(schema_handlers::get_kind))
        // projects
        .route(
            "/projects",
            get(project_handlers::list_projects).post(project_handlers::create_project),
        )
        .route("/projects/auto", post(project_handlers::create_default_project))
        .route(
            "/projects/{id}",
            get(project_handlers::get_project).delete(project_handlers::delete_project),
        )
        .route("/projects/{id}/clear", post(project_handlers::clear_project))
        .route("/projects/{id}/preview", get(project_handlers::preview_project))
        // records
        .route(
            "/projects/{id}/records/{kind}",
            get(record_handlers::list_records).post(record_handlers::create_record),
        )
        .route(
            "/projects/{id}/records/{kind}/{record_id}",
            get(record_handlers::get_record)
                .put(record_handlers::update_record)
                .delete(record_handlers::delete_record),
        )
        // spreadsheet transfer
        .route(
            "/projects/{id}/import",
            post(transfer_handlers::import_workbook).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
        .route("/projects/{id}/export", get(transfer_handlers::export_xlsx))
        .route("/projects/{id}/export/pdf", get(transfer_handlers::export_pdf))
        .route(
            "/convert/pdf",
            post(transfer_handlers::convert_pdf).layer(DefaultBodyLimit::max(UPLOAD_LIMIT)),
        )
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn store_errors_map_to_statuses() {
        let cases = [
            (StoreError::UnknownKind("x".into()), StatusCode::NOT_FOUND),
            (StoreError::ProjectNotFound(1), StatusCode::NOT_FOUND),
            (
                StoreError::RecordNotFound { kind: "circuit", id: 1 },
                StatusCode::NOT_FOUND,
            ),
            (StoreError::EmptySubmission, StatusCode::UNPROCESSABLE_ENTITY),
            (StoreError::InvalidName, StatusCode::UNPROCESSABLE_ENTITY),
            (StoreError::ActiveProject(1), StatusCode::CONFLICT),
            (
                StoreError::Storage(sea_orm::DbErr::Custom("boom".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiErr::from(err).status(), status);
        }
    }

    #[test]
    fn conversion_timeout_is_gateway_timeout() {
        let err = ConversionError::Timeout(std::time::Duration::from_secs(3));
        assert_eq!(ApiErr::from(err).status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ApiErr::from(ConversionError::MissingOutput).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[tokio::test]
    async fn health_and_security_headers() {
        let app = testing::router(testing::state().await);
        let res = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(res.headers()[header::X_FRAME_OPTIONS], "DENY");
    }
}
