pub use sea_orm_migration::prelude::*;

mod m20261002_000001_create_railway_projects;
mod m20261002_000002_create_record_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261002_000001_create_railway_projects::Migration),
            Box::new(m20261002_000002_create_record_tables::Migration),
        ]
    }
}
