//! Generic, project-scoped CRUD over the record tables.
//!
//! There is no per-kind code here: statements are assembled from the
//! [`KindDef`] returned by the schema registry. Every statement filters on
//! `project_id`, so a record is never visible outside its project.

use std::collections::HashMap;

use chrono::{NaiveDateTime, Utc};
use sea_orm::sea_query::{Alias, Expr, Func, Order, Query, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryResult, StatementBuilder, TransactionTrait,
};

use crate::entity::project;
use crate::schema::{self, KindDef, UnknownKind};

/// Submitted form values keyed by column header.
pub type ColumnValues = HashMap<String, String>;

#[derive(Debug)]
pub enum StoreError {
    UnknownKind(String),
    ProjectNotFound(i32),
    RecordNotFound { kind: &'static str, id: i32 },
    EmptySubmission,
    InvalidName,
    ActiveProject(i32),
    Storage(DbErr),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::UnknownKind(k) => write!(f, "Unknown sheet: {k}"),
            StoreError::ProjectNotFound(id) => write!(f, "Project {id} not found"),
            StoreError::RecordNotFound { kind, id } => write!(f, "Row {id} not found in {kind}"),
            StoreError::EmptySubmission => write!(f, "Please fill at least one field"),
            StoreError::InvalidName => write!(f, "Project name is required"),
            StoreError::ActiveProject(id) => write!(
                f,
                "Cannot delete current project {id}. Switch to another project first."
            ),
            StoreError::Storage(e) => write!(f, "Database error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<DbErr> for StoreError {
    fn from(e: DbErr) -> Self {
        StoreError::Storage(e)
    }
}

impl From<UnknownKind> for StoreError {
    fn from(e: UnknownKind) -> Self {
        StoreError::UnknownKind(e.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub kind: &'static KindDef,
    pub id: i32,
    pub project_id: i32,
    pub created_date: NaiveDateTime,
    /// One slot per declared column, in declared order. `None` = empty.
    pub values: Vec<Option<String>>,
}

impl Record {
    pub fn value(&self, header: &str) -> Option<&str> {
        let idx = self.kind.position(header)?;
        self.values[idx].as_deref()
    }

    /// Column values as display text, absent rendered as "".
    pub fn texts(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|v| v.clone().unwrap_or_default())
            .collect()
    }
}

/// Trim every declared column; blank and missing both become `None`.
/// Keys that are not columns of `kind` are dropped.
pub fn normalize(kind: &KindDef, values: &ColumnValues) -> Vec<Option<String>> {
    let mut out = vec![None; kind.columns.len()];
    for (key, value) in values {
        if let Some(idx) = kind.position(key) {
            out[idx] = non_blank(value);
        }
    }
    out
}

pub(crate) fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub(crate) fn is_blank(values: &[Option<String>]) -> bool {
    values.iter().all(Option::is_none)
}

#[derive(Clone)]
pub struct RecordStore {
    db: DatabaseConnection,
}

impl RecordStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// All records of `kind` in the project, ascending id.
    pub async fn list(&self, kind: &str, project_id: i32) -> Result<Vec<Record>, StoreError> {
        let kind = schema::lookup(kind)?;
        Ok(list_in(&self.db, kind, project_id).await?)
    }

    pub async fn get(&self, kind: &str, project_id: i32, id: i32) -> Result<Record, StoreError> {
        let kind = schema::lookup(kind)?;
        find_in(&self.db, kind, project_id, id)
            .await?
            .ok_or(StoreError::RecordNotFound {
                kind: kind.name,
                id,
            })
    }

    pub async fn count(&self, kind: &str, project_id: i32) -> Result<u64, StoreError> {
        let kind = schema::lookup(kind)?;
        Ok(count_in(&self.db, kind, project_id).await?)
    }

    /// Per-kind counts for one project, in registry order.
    pub async fn counts(&self, project_id: i32) -> Result<Vec<(&'static str, u64)>, StoreError> {
        let mut counts = Vec::with_capacity(schema::kinds().len());
        for kind in schema::kinds() {
            counts.push((kind.name, count_in(&self.db, kind, project_id).await?));
        }
        Ok(counts)
    }

    pub async fn create(
        &self,
        kind: &str,
        project_id: i32,
        values: &ColumnValues,
    ) -> Result<Record, StoreError> {
        let kind = schema::lookup(kind)?;
        let values = normalize(kind, values);
        if is_blank(&values) {
            return Err(StoreError::EmptySubmission);
        }

        let txn = self.db.begin().await?;
        project_in(&txn, project_id).await?;
        let id = insert_in(&txn, kind, project_id, values).await?;
        touch_project(&txn, project_id).await?;
        let record = find_in(&txn, kind, project_id, id)
            .await?
            .ok_or(DbErr::RecordNotInserted)?;
        txn.commit().await?;

        tracing::debug!(kind = kind.name, project_id, record_id = id, "record created");
        Ok(record)
    }

    /// Overwrites every declared column; id, project and creation time stay.
    pub async fn update(
        &self,
        kind: &str,
        project_id: i32,
        id: i32,
        values: &ColumnValues,
    ) -> Result<Record, StoreError> {
        let kind = schema::lookup(kind)?;
        let values = normalize(kind, values);

        let txn = self.db.begin().await?;
        if find_in(&txn, kind, project_id, id).await?.is_none() {
            return Err(StoreError::RecordNotFound {
                kind: kind.name,
                id,
            });
        }
        if is_blank(&values) {
            return Err(StoreError::EmptySubmission);
        }

        let assignments: Vec<(Alias, SimpleExpr)> = kind
            .columns
            .iter()
            .zip(values)
            .map(|(c, v)| (Alias::new(c.storage), Expr::value(v)))
            .collect();
        let update = Query::update()
            .table(Alias::new(kind.table))
            .values(assignments)
            .and_where(Expr::col(Alias::new("id")).eq(id))
            .and_where(Expr::col(Alias::new("project_id")).eq(project_id))
            .to_owned();
        execute(&txn, &update).await?;
        touch_project(&txn, project_id).await?;

        let record = find_in(&txn, kind, project_id, id)
            .await?
            .ok_or(StoreError::RecordNotFound {
                kind: kind.name,
                id,
            })?;
        txn.commit().await?;

        tracing::debug!(kind = kind.name, project_id, record_id = id, "record updated");
        Ok(record)
    }

    pub async fn delete(&self, kind: &str, project_id: i32, id: i32) -> Result<(), StoreError> {
        let kind = schema::lookup(kind)?;

        let txn = self.db.begin().await?;
        let delete = Query::delete()
            .from_table(Alias::new(kind.table))
            .and_where(Expr::col(Alias::new("id")).eq(id))
            .and_where(Expr::col(Alias::new("project_id")).eq(project_id))
            .to_owned();
        if execute(&txn, &delete).await? == 0 {
            return Err(StoreError::RecordNotFound {
                kind: kind.name,
                id,
            });
        }
        touch_project(&txn, project_id).await?;
        txn.commit().await?;

        tracing::debug!(kind = kind.name, project_id, record_id = id, "record deleted");
        Ok(())
    }

    /// Insert pre-normalised rows in one transaction. Blank rows are skipped.
    /// Returns the number of rows written.
    pub async fn insert_batch(
        &self,
        kind: &'static KindDef,
        project_id: i32,
        rows: Vec<Vec<Option<String>>>,
    ) -> Result<usize, StoreError> {
        let txn = self.db.begin().await?;
        project_in(&txn, project_id).await?;
        let written = insert_batch_in(&txn, kind, project_id, rows).await?;
        txn.commit().await?;
        Ok(written)
    }
}

// ---------- statement helpers (work on a connection or a transaction) ----------

async fn query_all<C, S>(conn: &C, stmt: &S) -> Result<Vec<QueryResult>, DbErr>
where
    C: ConnectionTrait,
    S: StatementBuilder,
{
    let backend = conn.get_database_backend();
    conn.query_all(backend.build(stmt)).await
}

async fn query_one<C, S>(conn: &C, stmt: &S) -> Result<Option<QueryResult>, DbErr>
where
    C: ConnectionTrait,
    S: StatementBuilder,
{
    let backend = conn.get_database_backend();
    conn.query_one(backend.build(stmt)).await
}

/// Returns rows affected.
async fn execute<C, S>(conn: &C, stmt: &S) -> Result<u64, DbErr>
where
    C: ConnectionTrait,
    S: StatementBuilder,
{
    let backend = conn.get_database_backend();
    Ok(conn.execute(backend.build(stmt)).await?.rows_affected())
}

fn select_records(kind: &KindDef, project_id: i32) -> sea_orm::sea_query::SelectStatement {
    Query::select()
        .columns([
            Alias::new("id"),
            Alias::new("project_id"),
            Alias::new("created_date"),
        ])
        .columns(kind.columns.iter().map(|c| Alias::new(c.storage)))
        .from(Alias::new(kind.table))
        .and_where(Expr::col(Alias::new("project_id")).eq(project_id))
        .to_owned()
}

fn read_record(kind: &'static KindDef, row: &QueryResult) -> Result<Record, DbErr> {
    let mut values = Vec::with_capacity(kind.columns.len());
    for column in kind.columns {
        let value: Option<String> = row.try_get("", column.storage)?;
        values.push(value.as_deref().and_then(non_blank));
    }
    Ok(Record {
        kind,
        id: row.try_get("", "id")?,
        project_id: row.try_get("", "project_id")?,
        created_date: row.try_get("", "created_date")?,
        values,
    })
}

pub(crate) async fn list_in<C: ConnectionTrait>(
    conn: &C,
    kind: &'static KindDef,
    project_id: i32,
) -> Result<Vec<Record>, DbErr> {
    let select = select_records(kind, project_id)
        .order_by(Alias::new("id"), Order::Asc)
        .to_owned();
    query_all(conn, &select)
        .await?
        .iter()
        .map(|row| read_record(kind, row))
        .collect()
}

async fn find_in<C: ConnectionTrait>(
    conn: &C,
    kind: &'static KindDef,
    project_id: i32,
    id: i32,
) -> Result<Option<Record>, DbErr> {
    let select = select_records(kind, project_id)
        .and_where(Expr::col(Alias::new("id")).eq(id))
        .to_owned();
    match query_one(conn, &select).await? {
        Some(row) => Ok(Some(read_record(kind, &row)?)),
        None => Ok(None),
    }
}

pub(crate) async fn count_in<C: ConnectionTrait>(
    conn: &C,
    kind: &KindDef,
    project_id: i32,
) -> Result<u64, DbErr> {
    let select = Query::select()
        .expr_as(
            Func::count(Expr::col(Alias::new("id"))),
            Alias::new("total"),
        )
        .from(Alias::new(kind.table))
        .and_where(Expr::col(Alias::new("project_id")).eq(project_id))
        .to_owned();
    let total: i64 = match query_one(conn, &select).await? {
        Some(row) => row.try_get("", "total")?,
        None => 0,
    };
    Ok(total as u64)
}

async fn insert_in<C: ConnectionTrait>(
    conn: &C,
    kind: &KindDef,
    project_id: i32,
    values: Vec<Option<String>>,
) -> Result<i32, DbErr> {
    let mut columns = vec![Alias::new("project_id"), Alias::new("created_date")];
    columns.extend(kind.columns.iter().map(|c| Alias::new(c.storage)));

    let mut exprs = vec![
        Expr::value(project_id),
        Expr::value(Utc::now().naive_utc()),
    ];
    exprs.extend(values.into_iter().map(Expr::value));

    let insert = Query::insert()
        .into_table(Alias::new(kind.table))
        .columns(columns)
        .values(exprs)
        .map_err(|e| DbErr::Custom(e.to_string()))?
        .returning_col(Alias::new("id"))
        .to_owned();

    let row = query_one(conn, &insert)
        .await?
        .ok_or(DbErr::RecordNotInserted)?;
    row.try_get("", "id")
}

/// Remove every record of every kind in the project. Returns the count.
pub(crate) async fn delete_all_in<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
) -> Result<u64, DbErr> {
    let mut deleted = 0;
    for kind in schema::kinds() {
        let delete = Query::delete()
            .from_table(Alias::new(kind.table))
            .and_where(Expr::col(Alias::new("project_id")).eq(project_id))
            .to_owned();
        deleted += execute(conn, &delete).await?;
    }
    Ok(deleted)
}

/// Blank rows are skipped; the project row is touched only when something
/// was written. The caller owns the transaction.
pub(crate) async fn insert_batch_in<C: ConnectionTrait>(
    conn: &C,
    kind: &KindDef,
    project_id: i32,
    rows: Vec<Vec<Option<String>>>,
) -> Result<usize, DbErr> {
    let mut written = 0;
    for values in rows {
        if is_blank(&values) {
            continue;
        }
        insert_in(conn, kind, project_id, values).await?;
        written += 1;
    }
    if written > 0 {
        touch_project(conn, project_id).await?;
    }
    Ok(written)
}

pub(crate) async fn project_in<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
) -> Result<project::Model, StoreError> {
    project::Entity::find_by_id(project_id)
        .one(conn)
        .await?
        .ok_or(StoreError::ProjectNotFound(project_id))
}

pub(crate) async fn touch_project<C: ConnectionTrait>(
    conn: &C,
    project_id: i32,
) -> Result<(), DbErr> {
    project::Entity::update_many()
        .col_expr(
            project::Column::UpdatedDate,
            Expr::value(Utc::now().naive_utc()),
        )
        .filter(project::Column::Id.eq(project_id))
        .exec(conn)
        .await?;
    Ok(())
}
