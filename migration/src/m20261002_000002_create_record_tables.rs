use sea_orm_migration::prelude::*;

/// Storage tables for the eight record kinds, with their text columns in
/// declared order. Kept in step with `wiring::schema`.
const RECORD_TABLES: &[(&str, &[&str])] = &[
    (
        "station_drawing",
        &[
            "checksum",
            "station_id",
            "diagram_name",
            "station_name",
            "station_code",
            "version",
            "date",
            "drawn_by",
            "checked_by",
            "division",
            "zone",
            "total_sheet",
            "designation1",
            "designation2",
            "designation3",
        ],
    ),
    (
        "junction_box",
        &[
            "station_id",
            "junction_id",
            "junction_name",
            "latitude",
            "longitude",
            "junction_size",
            "junction_row",
        ],
    ),
    (
        "circuit",
        &[
            "circuit_id",
            "circuit_name",
            "junction_box",
            "junction_name",
            "row",
            "position",
            "terminal",
            "start_no",
        ],
    ),
    (
        "terminal",
        &[
            "circuit_id",
            "terminal_id",
            "terminal_name",
            "symbol",
            "input_left",
            "input_right",
            "spare",
            "input_connected",
            "output_connected",
            "output_left",
            "output_right",
        ],
    ),
    (
        "group_table",
        &["circuit_id", "group_id", "terminal_no", "input_output", "text"],
    ),
    (
        "terminal_header",
        &[
            "circuit_id",
            "header_type",
            "terminal_start",
            "terminal_end",
            "input_output",
            "text",
        ],
    ),
    (
        "choke_table",
        &[
            "circuit_id",
            "choke_id",
            "input_terminal",
            "output_terminal",
            "terminal_name",
        ],
    ),
    (
        "resistor_table",
        &[
            "circuit_id",
            "resistor_id",
            "input_terminal",
            "output_terminal",
            "resistor_name",
        ],
    ),
];

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (table, columns) in RECORD_TABLES {
            let mut create = Table::create();
            create
                .table(Alias::new(*table))
                .if_not_exists()
                .col(
                    ColumnDef::new(Record::Id)
                        .integer()
                        .not_null()
                        .auto_increment()
                        .primary_key(),
                )
                .col(ColumnDef::new(Record::ProjectId).integer().not_null());

            for column in columns.iter() {
                create.col(ColumnDef::new(Alias::new(*column)).text().null());
            }

            create
                .col(
                    ColumnDef::new(Record::CreatedDate)
                        .timestamp()
                        .not_null()
                        .default(Expr::current_timestamp()),
                )
                .foreign_key(
                    ForeignKey::create()
                        .name(format!("fk_{table}_project"))
                        .from(Alias::new(*table), Record::ProjectId)
                        .to(RailwayProjects::Table, RailwayProjects::Id)
                        .on_delete(ForeignKeyAction::NoAction),
                );

            manager.create_table(create.to_owned()).await?;

            manager
                .create_index(
                    Index::create()
                        .name(format!("idx_{table}_project_id"))
                        .table(Alias::new(*table))
                        .col(Record::ProjectId)
                        .to_owned(),
                )
                .await?;
        }
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for (table, _) in RECORD_TABLES.iter().rev() {
            manager
                .drop_table(Table::drop().table(Alias::new(*table)).to_owned())
                .await?;
        }
        Ok(())
    }
}

/// Columns shared by every record table.
#[derive(Iden)]
enum Record {
    Id,
    ProjectId,
    CreatedDate,
}

#[derive(Iden)]
enum RailwayProjects {
    Table,
    Id,
}
