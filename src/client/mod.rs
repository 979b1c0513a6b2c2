//! Remote document service
//!
//! Typed facade over the service that ingests spreadsheets and answers
//! questions about them. Every failure is normalized into [`AppError`].

pub mod http;

pub use http::HttpRemoteService;

use crate::models::{Answer, DatasetSchema, FileBlob, ResetAck, UploadSummary};
use crate::types::AppResult;
use async_trait::async_trait;

/// Operations the session controller relies on.
///
/// Implementations must not retry `upload` or `query` on their own: a
/// repeated upload can duplicate tables and a repeated query re-runs a costly
/// generation. Retries are always user-initiated resubmissions.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// Upload one or more spreadsheet files. `files` must be non-empty.
    async fn upload(&self, files: &[FileBlob]) -> AppResult<UploadSummary>;

    /// Ask a question against the loaded tables.
    async fn query(&self, question: &str) -> AppResult<Answer>;

    /// Clear the server-side conversational memory.
    async fn reset_memory(&self) -> AppResult<ResetAck>;

    /// Describe the loaded tables.
    async fn schema(&self) -> AppResult<DatasetSchema>;
}
