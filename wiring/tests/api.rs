use std::sync::Arc;

use axum::body::Bytes;
use axum::http::StatusCode;
use axum_test::TestServer;
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use serde_json::{Value, json};
use wiring::api::{ApiState, api_router};
use wiring::config::ServerConfig;
use wiring::convert::{ConversionError, DocumentConverter};

struct FakePdf;

#[async_trait::async_trait]
impl DocumentConverter for FakePdf {
    async fn convert_to_pdf(&self, _: &[u8]) -> Result<Vec<u8>, ConversionError> {
        Ok(b"%PDF-1.7 test".to_vec())
    }
}

async fn server() -> TestServer {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    let state = ApiState::new(db, Arc::new(FakePdf));
    TestServer::try_new(api_router(state, &ServerConfig::default())).unwrap()
}

async fn create_project(server: &TestServer, name: &str) -> i64 {
    let res = server
        .post("/api/v1/projects")
        .json(&json!({"name": name, "description": "test"}))
        .await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    res.json::<Value>()["id"].as_i64().unwrap()
}

#[tokio::test]
async fn registry_lists_eight_kinds_with_hints() {
    let server = server().await;
    let kinds = server.get("/api/v1/kinds").await.json::<Value>();
    let kinds = kinds.as_array().unwrap();
    assert_eq!(kinds.len(), 8);
    assert_eq!(kinds[0]["name"], "StationDrawing");
    assert_eq!(kinds[0]["columns"][1], "Station ID");

    let circuit = server.get("/api/v1/kinds/circuit").await.json::<Value>();
    assert_eq!(circuit["columns"].as_array().unwrap().len(), 8);
    assert!(!circuit["hint"].as_str().unwrap().is_empty());

    let missing = server.get("/api/v1/kinds/Circuit").await;
    assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn records_are_scoped_and_counted() {
    let server = server().await;
    let a = create_project(&server, "A").await;
    let b = create_project(&server, "B").await;

    for id in ["C1", "C2"] {
        let res = server
            .post(&format!("/api/v1/projects/{a}/records/circuit"))
            .json(&json!({"circuit_id": id}))
            .await;
        assert_eq!(res.status_code(), StatusCode::CREATED);
    }

    let list_a = server
        .get(&format!("/api/v1/projects/{a}/records/circuit"))
        .await
        .json::<Value>();
    assert_eq!(list_a.as_array().unwrap().len(), 2);
    assert_eq!(list_a[0]["values"]["circuit_id"], "C1");

    let list_b = server
        .get(&format!("/api/v1/projects/{b}/records/circuit"))
        .await
        .json::<Value>();
    assert!(list_b.as_array().unwrap().is_empty());

    let summary = server.get(&format!("/api/v1/projects/{a}")).await.json::<Value>();
    assert_eq!(summary["total"], 2);
    let circuit_count = summary["counts"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["kind"] == "circuit")
        .unwrap()["count"]
        .clone();
    assert_eq!(circuit_count, 2);

    let projects = server.get("/api/v1/projects").await.json::<Value>();
    assert_eq!(projects[0]["id"], b);
}

#[tokio::test]
async fn auto_project_gets_generated_name() {
    let server = server().await;
    let res = server.post("/api/v1/projects/auto").await;
    assert_eq!(res.status_code(), StatusCode::CREATED);
    let body = res.json::<Value>();
    assert!(body["name"].as_str().unwrap().starts_with("RailwayProject_"));
    assert_eq!(body["description"], "Generated from XLSX builder");
}

#[tokio::test]
async fn export_import_round_trip_over_http() {
    let server = server().await;
    let src = create_project(&server, "Source").await;
    server
        .post(&format!("/api/v1/projects/{src}/records/terminal"))
        .json(&json!({"circuit_id": "C1", "terminal_id": "T1", "spare": "no"}))
        .await;
    server
        .post(&format!("/api/v1/projects/{src}/records/terminal"))
        .json(&json!({"circuit_id": "C1", "terminal_id": "T2"}))
        .await;

    let export = server.get(&format!("/api/v1/projects/{src}/export")).await;
    assert_eq!(export.status_code(), StatusCode::OK);
    assert_eq!(export.header("x-total-records"), "2");
    let bytes = export.as_bytes().clone();

    let dst = create_project(&server, "Copy").await;
    let res = server
        .post(&format!("/api/v1/projects/{dst}/import"))
        .bytes(bytes)
        .await;
    assert_eq!(res.status_code(), StatusCode::OK);
    let body = res.json::<Value>();
    assert_eq!(body["imported"], 2);
    assert_eq!(body["errors"], 0);

    let copied = server
        .get(&format!("/api/v1/projects/{dst}/records/terminal"))
        .await
        .json::<Value>();
    assert_eq!(copied[0]["values"]["terminal_id"], "T1");
    assert_eq!(copied[0]["values"]["spare"], "no");
    assert_eq!(copied[1]["values"]["terminal_id"], "T2");
    assert_eq!(copied[1]["values"]["spare"], "");
}

#[tokio::test]
async fn clear_then_delete_project() {
    let server = server().await;
    let keep = create_project(&server, "Keep").await;
    let p = create_project(&server, "Temp").await;
    server
        .post(&format!("/api/v1/projects/{p}/records/group"))
        .json(&json!({"group_id": "G1"}))
        .await;

    let cleared = server.post(&format!("/api/v1/projects/{p}/clear")).await;
    assert_eq!(cleared.json::<Value>()["deleted"], 1);

    let refused = server
        .delete(&format!("/api/v1/projects/{p}"))
        .add_query_param("active_project", p)
        .await;
    assert_eq!(refused.status_code(), StatusCode::CONFLICT);

    let deleted = server
        .delete(&format!("/api/v1/projects/{p}"))
        .add_query_param("active_project", keep)
        .await;
    assert_eq!(deleted.status_code(), StatusCode::OK);

    let gone = server.get(&format!("/api/v1/projects/{p}/preview")).await;
    assert_eq!(gone.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pdf_endpoints_use_converter() {
    let server = server().await;
    let p = create_project(&server, "Pdf").await;

    let res = server.get(&format!("/api/v1/projects/{p}/export/pdf")).await;
    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(res.header("content-type"), "application/pdf");
    assert!(res.as_bytes().starts_with(b"%PDF"));

    let empty = server.post("/api/v1/convert/pdf").bytes(Bytes::new()).await;
    assert_eq!(empty.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
}
