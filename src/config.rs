use anyhow::Result;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub upload: UploadConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Optional model override sent with every question
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    /// Advisory only; the service enforces its own limit
    pub max_file_size_mb: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub filter: String,
    pub log_dir: PathBuf,
}

impl UploadConfig {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 120,
                model: None,
            },
            upload: UploadConfig {
                max_file_size_mb: 50,
            },
            logging: LoggingConfig {
                filter: "askmydoc=info".to_string(),
                log_dir: default_log_dir(),
            },
        }
    }
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("askmydoc")
        .join("logs")
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            service: ServiceConfig {
                base_url: env::var("ASKMYDOC_API_URL")
                    .unwrap_or(defaults.service.base_url),
                timeout_secs: env::var("ASKMYDOC_TIMEOUT_SECS")
                    .unwrap_or_else(|_| defaults.service.timeout_secs.to_string())
                    .parse()?,
                model: env::var("ASKMYDOC_MODEL")
                    .ok()
                    .filter(|m| !m.trim().is_empty()),
            },
            upload: UploadConfig {
                max_file_size_mb: env::var("MAX_FILE_SIZE_MB")
                    .unwrap_or_else(|_| defaults.upload.max_file_size_mb.to_string())
                    .parse()?,
            },
            logging: LoggingConfig {
                filter: env::var("RUST_LOG").unwrap_or(defaults.logging.filter),
                log_dir: env::var("ASKMYDOC_LOG_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.logging.log_dir),
            },
        })
    }
}
