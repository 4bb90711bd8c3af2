use chrono::{Local, Utc};
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryOrder, Set,
    TransactionTrait,
};

use crate::entity::project;
use crate::schema::{self, KindDef};
use crate::store::{self, Record, StoreError};

pub const DEFAULT_DESCRIPTION: &str = "Generated from XLSX builder";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KindCount {
    pub kind: &'static str,
    pub count: u64,
}

/// A project together with its per-kind record counts.
#[derive(Debug, Clone)]
pub struct ProjectSummary {
    pub project: project::Model,
    pub counts: Vec<KindCount>,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct KindRecords {
    pub kind: &'static KindDef,
    pub records: Vec<Record>,
}

#[derive(Clone)]
pub struct ProjectStore {
    db: DatabaseConnection,
}

impl ProjectStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<project::Model, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::InvalidName);
        }
        let now = Utc::now().naive_utc();
        let model = project::ActiveModel {
            name: Set(name.to_string()),
            description: Set(description.and_then(store::non_blank)),
            created_date: Set(now),
            updated_date: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        tracing::info!(project_id = model.id, name = %model.name, "project created");
        Ok(model)
    }

    /// Project created implicitly when a caller has no active project yet.
    pub async fn create_default(&self) -> Result<project::Model, StoreError> {
        let name = format!("RailwayProject_{}", Local::now().format("%Y%m%d_%H%M%S"));
        self.create(&name, Some(DEFAULT_DESCRIPTION)).await
    }

    pub async fn get(&self, id: i32) -> Result<project::Model, StoreError> {
        project::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::ProjectNotFound(id))
    }

    /// Newest first, each with counts.
    pub async fn list(&self) -> Result<Vec<ProjectSummary>, StoreError> {
        let projects = project::Entity::find()
            .order_by_desc(project::Column::CreatedDate)
            .order_by_desc(project::Column::Id)
            .all(&self.db)
            .await?;

        let mut out = Vec::with_capacity(projects.len());
        for p in projects {
            out.push(self.summarize(p).await?);
        }
        Ok(out)
    }

    pub async fn summary(&self, id: i32) -> Result<ProjectSummary, StoreError> {
        let project = self.get(id).await?;
        self.summarize(project).await
    }

    async fn summarize(&self, project: project::Model) -> Result<ProjectSummary, StoreError> {
        let mut counts = Vec::with_capacity(schema::kinds().len());
        for kind in schema::kinds() {
            counts.push(KindCount {
                kind: kind.name,
                count: store::count_in(&self.db, kind, project.id).await?,
            });
        }
        let total = counts.iter().map(|c| c.count).sum();
        Ok(ProjectSummary {
            project,
            counts,
            total,
        })
    }

    /// Delete every record of every kind; the project itself stays.
    pub async fn clear(&self, id: i32) -> Result<u64, StoreError> {
        let txn = self.db.begin().await?;
        if project::Entity::find_by_id(id).one(&txn).await?.is_none() {
            return Err(StoreError::ProjectNotFound(id));
        }
        let deleted = store::delete_all_in(&txn, id).await?;
        store::touch_project(&txn, id).await?;
        txn.commit().await?;

        tracing::info!(project_id = id, deleted, "project cleared");
        Ok(deleted)
    }

    /// Delete the project and its records. `active` is the caller's current
    /// project, which may not be deleted.
    pub async fn delete(&self, id: i32, active: Option<i32>) -> Result<u64, StoreError> {
        if active == Some(id) {
            return Err(StoreError::ActiveProject(id));
        }

        let txn = self.db.begin().await?;
        let project = project::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(StoreError::ProjectNotFound(id))?;
        let deleted = store::delete_all_in(&txn, id).await?;
        project.delete(&txn).await?;
        txn.commit().await?;

        tracing::info!(project_id = id, deleted, "project deleted");
        Ok(deleted)
    }

    /// Every kind in registry order with the project's records.
    pub async fn preview(&self, id: i32) -> Result<Vec<KindRecords>, StoreError> {
        self.get(id).await?;
        let mut out = Vec::with_capacity(schema::kinds().len());
        for kind in schema::kinds() {
            out.push(KindRecords {
                kind,
                records: store::list_in(&self.db, kind, id).await?,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ColumnValues, RecordStore};
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup() -> (ProjectStore, RecordStore) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        (ProjectStore::new(db.clone()), RecordStore::new(db))
    }

    fn circuit(id: &str) -> ColumnValues {
        ColumnValues::from([("circuit_id".to_string(), id.to_string())])
    }

    #[tokio::test]
    async fn test_create_requires_name() {
        let (projects, _) = setup().await;
        assert!(matches!(
            projects.create("   ", None).await.unwrap_err(),
            StoreError::InvalidName
        ));

        let p = projects.create("  Yard A ", Some("  ")).await.unwrap();
        assert_eq!(p.name, "Yard A");
        assert_eq!(p.description, None);
    }

    #[tokio::test]
    async fn test_create_default_uses_generated_name() {
        let (projects, _) = setup().await;
        let p = projects.create_default().await.unwrap();
        assert!(p.name.starts_with("RailwayProject_"));
        assert_eq!(p.name.len(), "RailwayProject_".len() + 15);
        assert_eq!(p.description.as_deref(), Some(DEFAULT_DESCRIPTION));
    }

    #[tokio::test]
    async fn test_get_missing_project() {
        let (projects, _) = setup().await;
        assert!(matches!(
            projects.get(7).await.unwrap_err(),
            StoreError::ProjectNotFound(7)
        ));
    }

    #[tokio::test]
    async fn test_list_newest_first_with_counts() {
        let (projects, records) = setup().await;
        let old = projects.create("Old", None).await.unwrap();
        let new = projects.create("New", None).await.unwrap();
        records.create("circuit", old.id, &circuit("C1")).await.unwrap();
        records.create("circuit", old.id, &circuit("C2")).await.unwrap();

        let list = projects.list().await.unwrap();
        assert_eq!(list[0].project.id, new.id);
        assert_eq!(list[1].project.id, old.id);
        assert_eq!(list[1].total, 2);
        assert_eq!(list[1].counts.len(), 8);
        assert!(list[1].counts.contains(&KindCount { kind: "circuit", count: 2 }));
        assert_eq!(list[0].total, 0);
    }

    #[tokio::test]
    async fn test_record_write_bumps_updated_date() {
        let (projects, records) = setup().await;
        let p = projects.create("P", None).await.unwrap();
        records.create("circuit", p.id, &circuit("C1")).await.unwrap();
        let after = projects.get(p.id).await.unwrap();
        assert!(after.updated_date >= p.updated_date);
        assert_eq!(after.created_date, p.created_date);
    }

    #[tokio::test]
    async fn test_clear_keeps_project() {
        let (projects, records) = setup().await;
        let p = projects.create("P", None).await.unwrap();
        let other = projects.create("Other", None).await.unwrap();
        records.create("circuit", p.id, &circuit("C1")).await.unwrap();
        records
            .create(
                "terminal",
                p.id,
                &ColumnValues::from([("symbol".to_string(), "T".to_string())]),
            )
            .await
            .unwrap();
        records.create("circuit", other.id, &circuit("X")).await.unwrap();

        assert_eq!(projects.clear(p.id).await.unwrap(), 2);
        assert_eq!(projects.summary(p.id).await.unwrap().total, 0);
        assert_eq!(projects.summary(other.id).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_delete_refuses_active_project() {
        let (projects, _) = setup().await;
        let p = projects.create("P", None).await.unwrap();
        assert!(matches!(
            projects.delete(p.id, Some(p.id)).await.unwrap_err(),
            StoreError::ActiveProject(_)
        ));
        assert!(projects.get(p.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_removes_children() {
        let (projects, records) = setup().await;
        let p = projects.create("P", None).await.unwrap();
        let active = projects.create("Active", None).await.unwrap();
        records.create("circuit", p.id, &circuit("C1")).await.unwrap();

        assert_eq!(projects.delete(p.id, Some(active.id)).await.unwrap(), 1);
        assert!(projects.get(p.id).await.is_err());
        assert_eq!(records.count("circuit", p.id).await.unwrap(), 0);
        assert!(matches!(
            projects.delete(p.id, None).await.unwrap_err(),
            StoreError::ProjectNotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_preview_lists_every_kind() {
        let (projects, records) = setup().await;
        let p = projects.create("P", None).await.unwrap();
        records.create("circuit", p.id, &circuit("C1")).await.unwrap();

        let preview = projects.preview(p.id).await.unwrap();
        assert_eq!(preview.len(), 8);
        assert_eq!(preview[0].kind.name, "StationDrawing");
        let circuits = preview.iter().find(|k| k.kind.name == "circuit").unwrap();
        assert_eq!(circuits.records.len(), 1);
    }
}
