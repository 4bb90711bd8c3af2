use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RailwayProjects::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RailwayProjects::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RailwayProjects::Name).string_len(200).not_null())
                    .col(ColumnDef::new(RailwayProjects::Description).text().null())
                    .col(
                        ColumnDef::new(RailwayProjects::CreatedDate)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(RailwayProjects::UpdatedDate)
                            .timestamp()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RailwayProjects::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum RailwayProjects {
    Table,
    Id,
    Name,
    Description,
    CreatedDate,
    UpdatedDate,
}
