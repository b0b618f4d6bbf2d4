use std::path::PathBuf;

/// Relay configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// PostgreSQL connection string. When unset, the relay runs on the
    /// in-memory store (messages survive only via local backups).
    pub database_url: Option<String>,
    /// Directory for timestamped message-log snapshots.
    pub backup_dir: PathBuf,
    /// Directory for the best-effort secondary mirror. Unset disables it.
    pub mirror_dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(4000),
            database_url: std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            backup_dir: std::env::var("BACKUP_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./backups")),
            mirror_dir: std::env::var("MIRROR_DIR")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
        }
    }
}
