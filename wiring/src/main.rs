use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use sea_orm::Database;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use wiring::api::{ApiState, api_router};
use wiring::config::{ServerConfig, redact_db_url};
use wiring::convert::{DocumentConverter, SofficeConverter};
use wiring::projects::ProjectStore;
use wiring::store::RecordStore;
use wiring::{export, import, sheet};

#[derive(Parser)]
#[command(name = "wiring", about = "Railway station wiring documentation builder")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API (default)
    Serve,
    /// Manage projects
    Project {
        #[command(subcommand)]
        action: ProjectAction,
    },
    /// Import an .xlsx workbook into a project
    Import {
        file: PathBuf,
        /// Target project; a new one is created when omitted
        #[arg(long)]
        project: Option<i32>,
        /// Import only this kind's sheet
        #[arg(long)]
        kind: Option<String>,
    },
    /// Export a project as .xlsx
    Export {
        #[arg(long)]
        project: i32,
        /// Output path; defaults to the generated file name
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Convert an .xlsx workbook to PDF
    Convert {
        file: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ProjectAction {
    /// Create a project
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// List projects with record counts
    List,
    /// Delete a project and all its records
    Delete {
        #[arg(long)]
        id: i32,
    },
    /// Delete all records of a project, keeping the project
    Clear {
        #[arg(long)]
        id: i32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Init structured logging (respects RUST_LOG; defaults to info)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load .env if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = ServerConfig::from_env();
    let converter: Arc<dyn DocumentConverter> = Arc::new(SofficeConverter::new(
        config.soffice_bin.clone(),
        config.convert_timeout,
    ));

    // conversion needs no database
    let command = match cli.command {
        Some(Commands::Convert { file, out }) => {
            return convert_file(converter.as_ref(), file, out).await;
        }
        other => other,
    };

    tracing::info!(database = %redact_db_url(&config.database_url), "connecting to database");

    let db = Database::connect(&config.database_url).await?;
    Migrator::up(&db, None).await?;

    tracing::info!("database initialized");

    match command {
        None | Some(Commands::Serve) => serve(ApiState::new(db, converter), &config).await?,
        Some(Commands::Project { action }) => {
            handle_project_action(ProjectStore::new(db), action).await?
        }
        Some(Commands::Import {
            file,
            project,
            kind,
        }) => import_file(ProjectStore::new(db.clone()), RecordStore::new(db), file, project, kind)
            .await?,
        Some(Commands::Export { project, out }) => {
            export_file(RecordStore::new(db), project, out).await?
        }
        Some(Commands::Convert { .. }) => {}
    }

    Ok(())
}

async fn serve(state: ApiState, config: &ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "API online");
    axum::serve(listener, api_router(state, config)).await?;
    Ok(())
}

async fn handle_project_action(
    projects: ProjectStore,
    action: ProjectAction,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ProjectAction::Create { name, description } => {
            let project = projects.create(&name, description.as_deref()).await?;
            println!("{}\t{}", project.id, project.name);
        }
        ProjectAction::List => {
            for summary in projects.list().await? {
                println!(
                    "{}\t{}\t{} records\t{}",
                    summary.project.id,
                    summary.project.name,
                    summary.total,
                    summary.project.created_date.format("%Y-%m-%d %H:%M")
                );
            }
        }
        ProjectAction::Delete { id } => {
            let deleted = projects.delete(id, None).await?;
            println!("Deleted project {id} and {deleted} records");
        }
        ProjectAction::Clear { id } => {
            let deleted = projects.clear(id).await?;
            println!("Cleared {deleted} records from project {id}");
        }
    }
    Ok(())
}

async fn import_file(
    projects: ProjectStore,
    records: RecordStore,
    file: PathBuf,
    project: Option<i32>,
    kind: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(&file).await?;
    let sheets = sheet::read_workbook(&bytes)?;

    let project_id = match project {
        Some(id) => projects.get(id).await?.id,
        None => {
            let created = projects.create_default().await?;
            tracing::info!(project_id = created.id, name = %created.name, "created project for import");
            created.id
        }
    };

    match kind {
        Some(kind) => {
            let summary = import::import_sheet(&records, project_id, &kind, &sheets).await?;
            println!("{}", summary.message());
        }
        None => {
            let result = import::import_workbook(&records, project_id, &sheets).await?;
            for summary in &result.sheets {
                println!("{}", summary.message());
            }
            if !result.skipped.is_empty() {
                println!("No sheet for: {}", result.skipped.join(", "));
            }
        }
    }
    Ok(())
}

async fn export_file(
    records: RecordStore,
    project: i32,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = export::export_project(&records, project).await?;
    let path = out.unwrap_or_else(|| PathBuf::from(&file.file_name));
    tokio::fs::write(&path, &file.bytes).await?;
    println!(
        "Exported {} records from project {project} to {}",
        file.total_records,
        path.display()
    );
    Ok(())
}

async fn convert_file(
    converter: &dyn DocumentConverter,
    file: PathBuf,
    out: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = tokio::fs::read(&file).await?;
    let pdf = converter.convert_to_pdf(&bytes).await?;
    let path = out.unwrap_or_else(|| file.with_extension("pdf"));
    tokio::fs::write(&path, pdf).await?;
    println!("Wrote {}", path.display());
    Ok(())
}
