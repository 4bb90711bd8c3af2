//! Project export: one sheet per kind, registry order.

use chrono::{DateTime, Local};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use sea_orm::{ConnectionTrait, DbErr, TransactionTrait};

use crate::entity::project;
use crate::schema;
use crate::store::{self, Record, RecordStore, StoreError};

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Most characters a single xlsx cell holds.
pub const XLSX_MAX_CELL_CHARS: usize = 32_767;

#[derive(Debug)]
pub enum ExportError {
    ProjectNotFound(i32),
    Storage(StoreError),
    Xlsx(XlsxError),
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::ProjectNotFound(id) => write!(f, "Project {id} not found"),
            ExportError::Storage(e) => write!(f, "{e}"),
            ExportError::Xlsx(e) => write!(f, "Failed to write workbook: {e}"),
        }
    }
}

impl std::error::Error for ExportError {}

impl From<StoreError> for ExportError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::ProjectNotFound(id) => ExportError::ProjectNotFound(id),
            other => ExportError::Storage(other),
        }
    }
}

impl From<DbErr> for ExportError {
    fn from(e: DbErr) -> Self {
        ExportError::Storage(StoreError::Storage(e))
    }
}

impl From<XlsxError> for ExportError {
    fn from(e: XlsxError) -> Self {
        ExportError::Xlsx(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSheet {
    pub title: &'static str,
    pub header: Vec<&'static str>,
    /// Cell text per record; absent values are "".
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub sheets: Vec<ExportSheet>,
    pub total_records: usize,
}

/// A rendered export ready to hand to a client.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub total_records: usize,
}

/// Collect every kind's records for the project from one read
/// transaction. Kinds without records still get a header-only sheet.
pub async fn build_document(
    store: &RecordStore,
    project_id: i32,
) -> Result<ExportDocument, ExportError> {
    let txn = store.db().begin().await?;
    let doc = document_in(&txn, project_id).await?;
    txn.commit().await?;
    Ok(doc)
}

async fn document_in<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
) -> Result<ExportDocument, DbErr> {
    let mut sheets = Vec::with_capacity(schema::kinds().len());
    let mut total_records = 0;
    for kind in schema::kinds() {
        let rows: Vec<Vec<String>> = store::list_in(conn, kind, project_id)
            .await?
            .iter()
            .map(cell_texts)
            .collect();
        total_records += rows.len();
        sheets.push(ExportSheet {
            title: kind.name,
            header: kind.headers().collect(),
            rows,
        });
    }
    Ok(ExportDocument {
        sheets,
        total_records,
    })
}

/// Record text per column, cut to what one xlsx cell can hold.
fn cell_texts(record: &Record) -> Vec<String> {
    record
        .kind
        .headers()
        .zip(record.texts())
        .map(|(column, mut text)| {
            if let Some((cut, _)) = text.char_indices().nth(XLSX_MAX_CELL_CHARS) {
                tracing::warn!(
                    kind = record.kind.name,
                    record_id = record.id,
                    column,
                    chars = text.chars().count(),
                    "value truncated to xlsx cell limit"
                );
                text.truncate(cut);
            }
            text
        })
        .collect()
}

pub fn render_xlsx(doc: &ExportDocument) -> Result<Vec<u8>, ExportError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();

    for sheet in &doc.sheets {
        let ws = workbook.add_worksheet();
        ws.set_name(sheet.title)?;

        for (col, name) in sheet.header.iter().enumerate() {
            ws.write_string_with_format(0, col as u16, *name, &bold)?;
        }
        for (idx, row) in sheet.rows.iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    ws.write_string(idx as u32 + 1, col as u16, value)?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

/// `RAILWAYPROJECT_ID<id>_<name>_<timestamp>.xlsx`
pub fn file_name(project: &project::Model, at: DateTime<Local>) -> String {
    let name: String = project
        .name
        .chars()
        .map(|c| {
            // header-safe: ASCII only
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "RAILWAYPROJECT_ID{}_{}_{}.xlsx",
        project.id,
        name,
        at.format("%Y%m%d_%H%M%S")
    )
}

/// Project row and every kind are read in the same transaction.
pub async fn export_project(
    store: &RecordStore,
    project_id: i32,
) -> Result<ExportFile, ExportError> {
    let txn = store.db().begin().await?;
    let project = store::project_in(&txn, project_id).await?;
    let doc = document_in(&txn, project_id).await?;
    txn.commit().await?;

    let bytes = render_xlsx(&doc)?;
    tracing::info!(
        project_id,
        total_records = doc.total_records,
        "project exported"
    );
    Ok(ExportFile {
        file_name: file_name(&project, Local::now()),
        bytes,
        total_records: doc.total_records,
    })
}
