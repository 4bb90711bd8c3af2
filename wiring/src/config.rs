use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://wiring.db?mode=rwc";

/// Runtime settings read from `WD_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_url: String,
    pub bind_addr: String,
    /// Comma-separated list; empty means same-origin only.
    pub cors_allowed_origins: Vec<String>,
    pub ui_dir: Option<PathBuf>,
    pub soffice_bin: PathBuf,
    pub convert_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            bind_addr: "127.0.0.1:5080".to_string(),
            cors_allowed_origins: Vec::new(),
            ui_dir: None,
            soffice_bin: PathBuf::from("soffice"),
            convert_timeout: Duration::from_secs(60),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let convert_timeout = match non_empty("WD_CONVERT_TIMEOUT_SECS") {
            Some(v) => match v.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!(value = %v, "invalid WD_CONVERT_TIMEOUT_SECS, using default");
                    defaults.convert_timeout
                }
            },
            None => defaults.convert_timeout,
        };

        Self {
            database_url: non_empty("WD_DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: non_empty("WD_BIND_ADDR").unwrap_or(defaults.bind_addr),
            cors_allowed_origins: get("WD_CORS_ALLOWED_ORIGINS")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            ui_dir: non_empty("WD_UI_DIR").map(PathBuf::from),
            soffice_bin: non_empty("WD_SOFFICE_BIN")
                .map(PathBuf::from)
                .unwrap_or(defaults.soffice_bin),
            convert_timeout,
        }
    }
}

/// Database URL fit for logs: the query string is dropped and any password
/// in the userinfo becomes `****`.
pub fn redact_db_url(url: &str) -> String {
    let base = url.split_once('?').map_or(url, |(base, _)| base);
    let Some((scheme, rest)) = base.split_once("://") else {
        return base.to_string();
    };
    match rest.rsplit_once('@') {
        Some((userinfo, host)) => match userinfo.split_once(':') {
            Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
            None => base.to_string(),
        },
        None => base.to_string(),
    }
}
