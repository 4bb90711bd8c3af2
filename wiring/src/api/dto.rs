use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entity::project;
use crate::import::{ImportSummary, RowError, WorkbookImport};
use crate::projects::{KindCount, KindRecords, ProjectSummary};
use crate::schema::KindDef;
use crate::store::{ColumnValues, Record};

// ---------- registry ----------

#[derive(Debug, Serialize)]
pub struct KindResponse {
    pub name: &'static str,
    pub hint: &'static str,
    /// Column headers in declared order.
    pub columns: Vec<&'static str>,
}

impl From<&'static KindDef> for KindResponse {
    fn from(k: &'static KindDef) -> Self {
        Self {
            name: k.name,
            hint: k.hint,
            columns: k.headers().collect(),
        }
    }
}

// ---------- projects ----------

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteProjectQuery {
    /// The caller's current project; deleting it is refused.
    pub active_project: Option<i32>,
}

#[derive(Debug, Serialize, Clone)]
pub struct ProjectResponse {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_date: NaiveDateTime,
    pub updated_date: NaiveDateTime,
}

impl From<project::Model> for ProjectResponse {
    fn from(m: project::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            description: m.description,
            created_date: m.created_date,
            updated_date: m.updated_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct KindCountResponse {
    pub kind: &'static str,
    pub count: u64,
}

impl From<KindCount> for KindCountResponse {
    fn from(c: KindCount) -> Self {
        Self {
            kind: c.kind,
            count: c.count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectSummaryResponse {
    #[serde(flatten)]
    pub project: ProjectResponse,
    pub counts: Vec<KindCountResponse>,
    pub total: u64,
}

impl From<ProjectSummary> for ProjectSummaryResponse {
    fn from(s: ProjectSummary) -> Self {
        Self {
            project: s.project.into(),
            counts: s.counts.into_iter().map(Into::into).collect(),
            total: s.total,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: u64,
}

#[derive(Debug, Serialize)]
pub struct PreviewKindResponse {
    pub kind: &'static str,
    pub columns: Vec<&'static str>,
    pub records: Vec<RecordResponse>,
}

impl From<KindRecords> for PreviewKindResponse {
    fn from(k: KindRecords) -> Self {
        Self {
            kind: k.kind.name,
            columns: k.kind.headers().collect(),
            records: k.records.into_iter().map(Into::into).collect(),
        }
    }
}

// ---------- records ----------

#[derive(Debug, Serialize)]
pub struct RecordResponse {
    pub id: i32,
    pub project_id: i32,
    pub created_date: NaiveDateTime,
    /// Header → text; every declared column present, absent as "".
    pub values: Map<String, Value>,
}

impl From<Record> for RecordResponse {
    fn from(r: Record) -> Self {
        let values = r
            .kind
            .headers()
            .zip(r.texts())
            .map(|(h, v)| (h.to_string(), Value::String(v)))
            .collect();
        Self {
            id: r.id,
            project_id: r.project_id,
            created_date: r.created_date,
            values,
        }
    }
}

/// Form body: header → value. Scalars are taken as text, null as empty.
pub fn column_values(body: Map<String, Value>) -> ColumnValues {
    body.into_iter()
        .map(|(k, v)| {
            let text = match v {
                Value::Null => String::new(),
                Value::String(s) => s,
                other => other.to_string(),
            };
            (k, text)
        })
        .collect()
}

// ---------- import ----------

#[derive(Debug, Deserialize)]
pub struct ImportQuery {
    /// Import one kind; all recognised sheets when absent.
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RowErrorResponse {
    pub row: usize,
    pub message: String,
}

impl From<RowError> for RowErrorResponse {
    fn from(e: RowError) -> Self {
        Self {
            row: e.row,
            message: e.message,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImportSheetResponse {
    pub kind: &'static str,
    pub sheet: String,
    pub imported: usize,
    pub errors: usize,
    pub message: String,
    pub row_errors: Vec<RowErrorResponse>,
}

impl From<ImportSummary> for ImportSheetResponse {
    fn from(s: ImportSummary) -> Self {
        Self {
            message: s.message(),
            kind: s.kind,
            sheet: s.sheet,
            imported: s.imported,
            errors: s.errors,
            row_errors: s.row_errors.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub message: String,
    pub imported: usize,
    pub errors: usize,
    pub sheets: Vec<ImportSheetResponse>,
    pub skipped: Vec<&'static str>,
}

impl From<ImportSummary> for ImportResponse {
    fn from(s: ImportSummary) -> Self {
        Self {
            message: s.message(),
            imported: s.imported,
            errors: s.errors,
            sheets: vec![s.into()],
            skipped: Vec::new(),
        }
    }
}

impl From<WorkbookImport> for ImportResponse {
    fn from(w: WorkbookImport) -> Self {
        let imported = w.imported();
        let errors = w.errors();
        let message = if imported == 0 && errors == 0 {
            "No valid data found".to_string()
        } else {
            format!(
                "Imported {imported} rows from {} sheets, {errors} rows failed",
                w.sheets.len()
            )
        };
        Self {
            message,
            imported,
            errors,
            sheets: w.sheets.into_iter().map(Into::into).collect(),
            skipped: w.skipped,
        }
    }
}
