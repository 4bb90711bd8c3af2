//! Spreadsheet to PDF conversion through an external office suite.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use uuid::Uuid;

#[derive(Debug)]
pub enum ConversionError {
    Spawn(String),
    Timeout(Duration),
    Failed { status: Option<i32>, stderr: String },
    MissingOutput,
    Io(std::io::Error),
}

impl std::fmt::Display for ConversionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionError::Spawn(e) => write!(f, "Could not start converter: {e}"),
            ConversionError::Timeout(d) => {
                write!(f, "PDF conversion timed out after {}s", d.as_secs())
            }
            ConversionError::Failed { status, stderr } => match status {
                Some(code) => write!(f, "PDF conversion failed (exit {code}): {stderr}"),
                None => write!(f, "PDF conversion failed: {stderr}"),
            },
            ConversionError::MissingOutput => write!(f, "PDF conversion produced no output"),
            ConversionError::Io(e) => write!(f, "PDF conversion I/O error: {e}"),
        }
    }
}

impl std::error::Error for ConversionError {}

impl From<std::io::Error> for ConversionError {
    fn from(e: std::io::Error) -> Self {
        ConversionError::Io(e)
    }
}

#[async_trait::async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert_to_pdf(&self, xlsx: &[u8]) -> Result<Vec<u8>, ConversionError>;
}

/// Runs `soffice --headless --convert-to pdf` in a scratch directory.
#[derive(Debug, Clone)]
pub struct SofficeConverter {
    binary: PathBuf,
    timeout: Duration,
}

impl SofficeConverter {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    async fn run(&self, workdir: &Path, xlsx: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let input = workdir.join("input.xlsx");
        tokio::fs::write(&input, xlsx).await?;

        let mut cmd = Command::new(&self.binary);
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(workdir)
            .arg(&input)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        // dropping the future on timeout kills the child
        let output = match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(res) => res.map_err(|e| ConversionError::Spawn(e.to_string()))?,
            Err(_) => return Err(ConversionError::Timeout(self.timeout)),
        };

        if !output.status.success() {
            return Err(ConversionError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        match tokio::fs::read(workdir.join("input.pdf")).await {
            Ok(pdf) => Ok(pdf),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ConversionError::MissingOutput)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait::async_trait]
impl DocumentConverter for SofficeConverter {
    async fn convert_to_pdf(&self, xlsx: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let workdir = std::env::temp_dir().join(format!("wiring-convert-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&workdir).await?;

        let result = self.run(&workdir, xlsx).await;

        if let Err(e) = tokio::fs::remove_dir_all(&workdir).await {
            tracing::warn!(dir = %workdir.display(), error = %e, "failed to remove scratch dir");
        }
        match &result {
            Ok(pdf) => tracing::info!(bytes = pdf.len(), "converted workbook to pdf"),
            Err(e) => tracing::error!(error = %e, "pdf conversion failed"),
        }
        result
    }
}
