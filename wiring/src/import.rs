//! Bulk import of spreadsheet sheets into a project.
//!
//! Header matching is case-insensitive and column order in the sheet is
//! free. A header mismatch aborts before anything is written; a bad data
//! row is counted and skipped.

use calamine::Data;
use sea_orm::{ConnectionTrait, DbErr, TransactionTrait};

use crate::schema::{self, KindDef};
use crate::sheet::{SheetData, cell_text};
use crate::store::{self, RecordStore, StoreError};

#[derive(Debug)]
pub enum ImportError {
    UnknownKind(String),
    Workbook(String),
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },
    MissingColumns {
        sheet: String,
        missing: Vec<String>,
    },
    ProjectNotFound(i32),
    Storage(StoreError),
}

impl std::fmt::Display for ImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImportError::UnknownKind(k) => write!(f, "Unknown sheet: {k}"),
            ImportError::Workbook(e) => write!(f, "{e}"),
            ImportError::SheetNotFound { sheet, available } => write!(
                f,
                "Sheet '{sheet}' not found. Available sheets: {}",
                available.join(", ")
            ),
            ImportError::MissingColumns { sheet, missing } => write!(
                f,
                "Missing columns in sheet '{sheet}': {}",
                missing.join(", ")
            ),
            ImportError::ProjectNotFound(id) => write!(f, "Project {id} not found"),
            ImportError::Storage(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ImportError {}

impl From<DbErr> for ImportError {
    fn from(e: DbErr) -> Self {
        ImportError::Storage(StoreError::Storage(e))
    }
}

impl From<StoreError> for ImportError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UnknownKind(k) => ImportError::UnknownKind(k),
            StoreError::ProjectNotFound(id) => ImportError::ProjectNotFound(id),
            other => ImportError::Storage(other),
        }
    }
}

/// A data row that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based row number in the sheet.
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub kind: &'static str,
    pub sheet: String,
    pub imported: usize,
    pub errors: usize,
    pub row_errors: Vec<RowError>,
}

impl ImportSummary {
    pub fn message(&self) -> String {
        match (self.imported, self.errors) {
            (0, 0) => format!("No valid data found in sheet '{}'", self.sheet),
            (n, 0) => format!("Imported {n} rows into {}", self.kind),
            (n, e) => format!("Imported {n} rows into {}, {e} rows failed", self.kind),
        }
    }
}

/// Result of importing every recognised sheet of a workbook.
#[derive(Debug, Clone, Default)]
pub struct WorkbookImport {
    pub sheets: Vec<ImportSummary>,
    /// Kinds with no matching sheet in the workbook.
    pub skipped: Vec<&'static str>,
}

impl WorkbookImport {
    pub fn imported(&self) -> usize {
        self.sheets.iter().map(|s| s.imported).sum()
    }

    pub fn errors(&self) -> usize {
        self.sheets.iter().map(|s| s.errors).sum()
    }
}

/// Import the sheet matching `kind` into `project_id` in one transaction.
pub async fn import_sheet(
    store: &RecordStore,
    project_id: i32,
    kind: &str,
    sheets: &[SheetData],
) -> Result<ImportSummary, ImportError> {
    let kind = schema::lookup(kind).map_err(|e| ImportError::UnknownKind(e.0))?;

    let txn = store.db().begin().await?;
    store::project_in(&txn, project_id).await?;

    let sheet = sheets
        .iter()
        .find(|s| schema::names_match(&s.name, kind.name))
        .ok_or_else(|| ImportError::SheetNotFound {
            sheet: kind.name.to_string(),
            available: sheets.iter().map(|s| s.name.clone()).collect(),
        })?;
    let positions = match_headers(kind, sheet)?;

    let summary = persist(&txn, project_id, kind, sheet, &positions).await?;
    txn.commit().await?;

    log_summary(project_id, &summary);
    Ok(summary)
}

/// Import every sheet whose title names a kind. All matched sheets have
/// their headers checked before any of them is written, and all of them
/// are written in one transaction.
pub async fn import_workbook(
    store: &RecordStore,
    project_id: i32,
    sheets: &[SheetData],
) -> Result<WorkbookImport, ImportError> {
    let txn = store.db().begin().await?;
    store::project_in(&txn, project_id).await?;

    let mut plan = Vec::new();
    let mut result = WorkbookImport::default();
    for kind in schema::kinds() {
        match sheets
            .iter()
            .find(|s| schema::find_sheet(&s.name).is_some_and(|k| k.name == kind.name))
        {
            Some(sheet) => plan.push((kind, sheet, match_headers(kind, sheet)?)),
            None => result.skipped.push(kind.name),
        }
    }

    for (kind, sheet, positions) in plan {
        result
            .sheets
            .push(persist(&txn, project_id, kind, sheet, &positions).await?);
    }
    txn.commit().await?;

    for summary in &result.sheets {
        log_summary(project_id, summary);
    }
    Ok(result)
}

/// Position of every declared column in the header row.
fn match_headers(kind: &KindDef, sheet: &SheetData) -> Result<Vec<usize>, ImportError> {
    let headers: Vec<String> = sheet
        .rows
        .first()
        .map(|row| {
            row.iter()
                .map(|cell| cell_text(cell).unwrap_or_default())
                .collect()
        })
        .unwrap_or_default();

    let mut positions = Vec::with_capacity(kind.columns.len());
    let mut missing = Vec::new();
    for column in kind.columns {
        match headers.iter().position(|h| {
            schema::names_match(h, column.header) || schema::names_match(h, column.storage)
        }) {
            Some(idx) => positions.push(idx),
            None => missing.push(column.header.to_string()),
        }
    }

    if missing.is_empty() {
        Ok(positions)
    } else {
        Err(ImportError::MissingColumns {
            sheet: sheet.name.clone(),
            missing,
        })
    }
}

/// Values for one data row; `Ok(None)` for a blank row.
fn candidate(row: &[Data], positions: &[usize]) -> Result<Option<Vec<Option<String>>>, String> {
    let mut values = Vec::with_capacity(positions.len());
    for &idx in positions {
        let value = match row.get(idx) {
            Some(cell) => cell_text(cell).map_err(|e| format!("column {}: {e}", idx + 1))?,
            None => String::new(),
        };
        values.push(store::non_blank(&value));
    }
    if store::is_blank(&values) {
        Ok(None)
    } else {
        Ok(Some(values))
    }
}

async fn persist<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
    kind: &'static KindDef,
    sheet: &SheetData,
    positions: &[usize],
) -> Result<ImportSummary, DbErr> {
    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    for (idx, row) in sheet.rows.iter().enumerate().skip(1) {
        match candidate(row, positions) {
            Ok(Some(values)) => rows.push(values),
            Ok(None) => {}
            Err(message) => {
                tracing::warn!(kind = kind.name, row = idx + 1, error = %message, "skipping row");
                row_errors.push(RowError {
                    row: idx + 1,
                    message,
                });
            }
        }
    }

    let imported = store::insert_batch_in(conn, kind, project_id, rows).await?;
    Ok(ImportSummary {
        kind: kind.name,
        sheet: sheet.name.clone(),
        imported,
        errors: row_errors.len(),
        row_errors,
    })
}

fn log_summary(project_id: i32, summary: &ImportSummary) {
    tracing::info!(
        project_id,
        kind = summary.kind,
        imported = summary.imported,
        errors = summary.errors,
        "sheet imported"
    );
}
