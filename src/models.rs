use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::types::{AppError, AppResult};

/// Extensions the ingestion service accepts
pub const SPREADSHEET_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

// Wire types, shaped after the document service's JSON bodies

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub filename: Option<String>,
    pub tables_created: Vec<String>,
    pub row_count: u64,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryRequest<'a> {
    pub question: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    // The service sends null when no SQL was executed
    #[serde(default)]
    pub sql_queries: Option<Vec<String>>,
    #[serde(default)]
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub types: Vec<String>,
    pub row_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub tables: BTreeMap<String, TableSchema>,
    pub total_tables: usize,
    pub total_rows: u64,
}

// Domain types handed to the session controller

/// Result of a successful upload. Only the latest one is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSummary {
    pub tables_created: Vec<String>,
    pub row_count: u64,
}

impl UploadSummary {
    pub fn table_count(&self) -> usize {
        self.tables_created.len()
    }
}

impl From<UploadResponse> for UploadSummary {
    fn from(resp: UploadResponse) -> Self {
        Self {
            tables_created: resp.tables_created,
            row_count: resp.row_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub text: String,
    pub sql_queries: Vec<String>,
    pub model_name: String,
}

impl From<QueryResponse> for Answer {
    fn from(resp: QueryResponse) -> Self {
        Self {
            text: resp.answer,
            sql_queries: resp.sql_queries.unwrap_or_default(),
            model_name: resp.model,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetAck {
    pub confirmed: bool,
    pub message: Option<String>,
}

impl From<ResetResponse> for ResetAck {
    fn from(resp: ResetResponse) -> Self {
        // A 2xx without a status field still counts as confirmation
        let confirmed = resp
            .status
            .as_deref()
            .map_or(true, |s| s.eq_ignore_ascii_case("success"));
        Self {
            confirmed,
            message: resp.message,
        }
    }
}

/// A file read into memory, waiting to be uploaded
#[derive(Debug, Clone, PartialEq)]
pub struct FileBlob {
    pub name: String,
    pub data: Bytes,
}

impl FileBlob {
    pub fn new(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk. The blob keeps only the file name, not the path.
    pub async fn from_path(path: &Path) -> AppResult<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::Validation(format!("Not a file: {}", path.display())))?
            .to_string();

        let data = tokio::fs::read(path).await.map_err(|e| {
            AppError::Validation(format!("Cannot read {}: {}", path.display(), e))
        })?;

        Ok(Self::new(name, data))
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_spreadsheet(&self) -> bool {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                SPREADSHEET_EXTENSIONS
                    .iter()
                    .any(|allowed| ext.eq_ignore_ascii_case(allowed))
            })
            .unwrap_or(false)
    }

    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}
