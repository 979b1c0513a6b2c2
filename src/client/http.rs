// HTTP implementation of the remote document service
// Endpoints:
//   POST {base}/upload/        multipart, one "files" part per spreadsheet
//   POST {base}/query/         {"question": "...", "model": "..."?}
//   POST {base}/query/reset
//   GET  {base}/upload/schema

use crate::client::RemoteService;
use crate::config::ServiceConfig;
use crate::models::{
    Answer, DatasetSchema, FileBlob, QueryRequest, QueryResponse, ResetAck, ResetResponse,
    UploadResponse, UploadSummary,
};
use crate::types::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

const UPLOAD_PATH: &str = "upload/";
const QUERY_PATH: &str = "query/";
const RESET_PATH: &str = "query/reset";
const SCHEMA_PATH: &str = "upload/schema";

// Error bodies are surfaced verbatim; keep plain-text ones short enough to display
const MAX_PLAIN_ERROR_LEN: usize = 300;

pub struct HttpRemoteService {
    client: Client,
    base_url: String,
    model: Option<String>,
}

impl HttpRemoteService {
    pub fn new(config: &ServiceConfig) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turn a response into `T`, or into a `Service` error carrying the
    /// remote's own message when the status is not a success.
    async fn read_json<T: DeserializeOwned>(response: Response, operation: &str) -> AppResult<T> {
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body)
                .unwrap_or_else(|| format!("{} failed with status {}", operation, status));
            warn!("{} rejected by service ({}): {}", operation, status, message);
            return Err(AppError::service(Some(status.as_u16()), message));
        }

        response.json::<T>().await.map_err(AppError::from)
    }
}

/// Pull a human-readable message out of a failure body.
///
/// Looks at `message`, then `detail`, then `error`. FastAPI validation
/// failures put a list of `{msg}` objects under `detail`; those are joined.
fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    let value: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(v) => v,
        Err(_) => {
            if trimmed.len() <= MAX_PLAIN_ERROR_LEN && !trimmed.starts_with('<') {
                return Some(trimmed.to_string());
            }
            return None;
        }
    };

    for key in ["message", "detail", "error"] {
        match value.get(key) {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => {
                return Some(s.clone());
            }
            Some(serde_json::Value::Array(items)) => {
                let msgs: Vec<&str> = items
                    .iter()
                    .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                    .collect();
                if !msgs.is_empty() {
                    return Some(msgs.join("; "));
                }
            }
            _ => {}
        }
    }

    None
}

#[async_trait]
impl RemoteService for HttpRemoteService {
    async fn upload(&self, files: &[FileBlob]) -> AppResult<UploadSummary> {
        if files.is_empty() {
            return Err(AppError::Validation(
                "Select at least one file to upload".to_string(),
            ));
        }

        let mut form = Form::new();
        for blob in files {
            let part = Part::bytes(blob.data.to_vec())
                .file_name(blob.name.clone())
                .mime_str(&blob.mime_type())?;
            form = form.part("files", part);
        }

        info!("Uploading {} file(s) to {}", files.len(), self.base_url);

        let response = self
            .client
            .post(self.endpoint(UPLOAD_PATH))
            .multipart(form)
            .send()
            .await?;

        let body: UploadResponse = Self::read_json(response, "Upload").await?;
        debug!(
            "Upload created {} table(s), {} row(s)",
            body.tables_created.len(),
            body.row_count
        );

        Ok(body.into())
    }

    async fn query(&self, question: &str) -> AppResult<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Validation("Question is empty".to_string()));
        }

        let request = QueryRequest {
            question,
            model: self.model.as_deref(),
        };

        info!("Sending question ({} chars)", question.len());

        let response = self
            .client
            .post(self.endpoint(QUERY_PATH))
            .json(&request)
            .send()
            .await?;

        let body: QueryResponse = Self::read_json(response, "Query").await?;
        debug!(
            "Answer from model {} with {} SQL statement(s)",
            body.model,
            body.sql_queries.as_ref().map_or(0, |q| q.len())
        );

        Ok(body.into())
    }

    async fn reset_memory(&self) -> AppResult<ResetAck> {
        let response = self.client.post(self.endpoint(RESET_PATH)).send().await?;
        let body: ResetResponse = Self::read_json(response, "Reset").await?;
        Ok(body.into())
    }

    async fn schema(&self) -> AppResult<DatasetSchema> {
        let response = self.client.get(self.endpoint(SCHEMA_PATH)).send().await?;
        Self::read_json(response, "Schema").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn service_for(url: String) -> HttpRemoteService {
        HttpRemoteService::new(&ServiceConfig {
            base_url: url,
            timeout_secs: 5,
            model: None,
        })
        .unwrap()
    }

    #[test]
    fn test_extract_error_message() {
        assert_eq!(
            extract_error_message(r#"{"detail":"Invalid file type: a.csv"}"#).as_deref(),
            Some("Invalid file type: a.csv")
        );
        assert_eq!(
            extract_error_message(r#"{"message":"quota exceeded","detail":"ignored"}"#).as_deref(),
            Some("quota exceeded")
        );
        assert_eq!(
            extract_error_message(r#"{"error":"boom"}"#).as_deref(),
            Some("boom")
        );
        assert_eq!(
            extract_error_message(
                r#"{"detail":[{"loc":["body","question"],"msg":"field required"}]}"#
            )
            .as_deref(),
            Some("field required")
        );
        assert_eq!(
            extract_error_message("Internal Server Error").as_deref(),
            Some("Internal Server Error")
        );
        assert_eq!(extract_error_message(""), None);
        assert_eq!(extract_error_message(r#"{"status":"failed"}"#), None);
        assert_eq!(extract_error_message("<html><body>502</body></html>"), None);
    }

    #[test]
    fn test_trailing_slash_is_normalized() {
        let service = service_for("http://localhost:8000/".to_string());
        assert_eq!(service.base_url(), "http://localhost:8000");
        assert_eq!(service.endpoint(QUERY_PATH), "http://localhost:8000/query/");
    }

    #[tokio::test]
    async fn test_upload_sends_multipart_files() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/upload/")
            .match_header("content-type", Matcher::Regex("multipart/form-data".into()))
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex(r#"name="files"; filename="sales_2024.xlsx""#.into()),
                Matcher::Regex(r#"filename="costs.xlsx""#.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "filename": "2 files",
                    "tables_created": ["sales_2024_sales", "costs_q1"],
                    "row_count": 142,
                    "status": "success"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let service = service_for(server.url());
        let summary = service
            .upload(&[
                FileBlob::new("sales_2024.xlsx", vec![0u8; 16]),
                FileBlob::new("costs.xlsx", vec![1u8; 8]),
            ])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(summary.table_count(), 2);
        assert_eq!(summary.row_count, 142);
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_selection_locally() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/upload/").expect(0).create_async().await;

        let service = service_for(server.url());
        let err = service.upload(&[]).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upload_surfaces_detail_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/upload/")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"detail":"Invalid file type: notes.txt"}"#)
            .create_async()
            .await;

        let service = service_for(server.url());
        let err = service
            .upload(&[FileBlob::new("notes.txt", vec![1u8])])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            AppError::service(Some(400), "Invalid file type: notes.txt")
        );
    }

    #[tokio::test]
    async fn test_query_round_trip() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/query/")
            .match_body(Matcher::Json(json!({"question": "Total revenue?"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "question": "Total revenue?",
                    "answer": "Total revenue is $125,333",
                    "sql_queries": ["SELECT SUM(revenue) FROM sales_2024_sales"],
                    "model": "gpt-4o-mini",
                    "timestamp": "2024-05-01T10:00:00"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let service = service_for(server.url());
        let answer = service.query("  Total revenue?  ").await.unwrap();

        mock.assert_async().await;
        assert_eq!(answer.text, "Total revenue is $125,333");
        assert_eq!(answer.sql_queries.len(), 1);
        assert_eq!(answer.model_name, "gpt-4o-mini");
    }

    #[tokio::test]
    async fn test_query_sends_model_override() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/query/")
            .match_body(Matcher::Json(json!({"question": "hi", "model": "mistral"})))
            .with_status(200)
            .with_body(r#"{"answer":"hello","sql_queries":[],"model":"mistral"}"#)
            .create_async()
            .await;

        let service = HttpRemoteService::new(&ServiceConfig {
            base_url: server.url(),
            timeout_secs: 5,
            model: Some("mistral".to_string()),
        })
        .unwrap();
        service.query("hi").await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_query_generic_message_without_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query/")
            .with_status(503)
            .create_async()
            .await;

        let service = service_for(server.url());
        let err = service.query("anything").await.unwrap_err();

        match err {
            AppError::Service { status, message } => {
                assert_eq!(status, Some(503));
                assert!(message.starts_with("Query failed with status 503"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_success_body_is_service_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query/")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let service = service_for(server.url());
        let err = service.query("anything").await.unwrap_err();
        assert!(matches!(err, AppError::Service { .. }));
    }

    #[tokio::test]
    async fn test_reset_and_schema() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/query/reset")
            .with_status(200)
            .with_body(r#"{"status":"success","message":"Agent memory reset"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/upload/schema")
            .with_status(200)
            .with_body(
                json!({
                    "tables": {
                        "sales_2024_sales": {
                            "columns": ["country", "revenue"],
                            "types": ["TEXT", "REAL"],
                            "row_count": 142
                        }
                    },
                    "total_tables": 1,
                    "total_rows": 142
                })
                .to_string(),
            )
            .create_async()
            .await;

        let service = service_for(server.url());

        let ack = service.reset_memory().await.unwrap();
        assert!(ack.confirmed);
        assert_eq!(ack.message.as_deref(), Some("Agent memory reset"));

        let schema = service.schema().await.unwrap();
        assert_eq!(schema.total_tables, 1);
        assert_eq!(schema.tables["sales_2024_sales"].columns, vec!["country", "revenue"]);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        // Port 1 is reserved and nothing listens there
        let service = service_for("http://127.0.0.1:1".to_string());
        let err = service.reset_memory().await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }
}
