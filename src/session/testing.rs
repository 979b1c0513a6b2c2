// Scripted RemoteService used by the session tests

use crate::client::RemoteService;
use crate::models::{Answer, DatasetSchema, FileBlob, ResetAck, UploadSummary};
use crate::types::{AppError, AppResult};
use async_trait::async_trait;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Replies are consumed in order; an exhausted script answers with a
/// service error so a missing expectation shows up in the transcript.
#[derive(Default)]
pub(crate) struct FakeService {
    uploads: Mutex<VecDeque<AppResult<UploadSummary>>>,
    answers: Mutex<VecDeque<AppResult<Answer>>>,
    resets: Mutex<VecDeque<AppResult<ResetAck>>>,
    upload_calls: AtomicUsize,
    query_calls: AtomicUsize,
    reset_calls: AtomicUsize,
    uploaded_names: Mutex<Vec<Vec<String>>>,
}

impl FakeService {
    pub(crate) fn with_upload(self, reply: AppResult<UploadSummary>) -> Self {
        self.uploads.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn with_answer(self, reply: AppResult<Answer>) -> Self {
        self.answers.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn with_reset(self, reply: AppResult<ResetAck>) -> Self {
        self.resets.lock().unwrap().push_back(reply);
        self
    }

    pub(crate) fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn query_calls(&self) -> usize {
        self.query_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn reset_calls(&self) -> usize {
        self.reset_calls.load(Ordering::SeqCst)
    }

    /// File names of every upload call, in call order
    pub(crate) fn uploaded_names(&self) -> Vec<Vec<String>> {
        self.uploaded_names.lock().unwrap().clone()
    }

    fn next<T>(queue: &Mutex<VecDeque<AppResult<T>>>, what: &str) -> AppResult<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::service(None, format!("no scripted {}", what))))
    }
}

#[async_trait]
impl RemoteService for FakeService {
    async fn upload(&self, files: &[FileBlob]) -> AppResult<UploadSummary> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        self.uploaded_names
            .lock()
            .unwrap()
            .push(files.iter().map(|f| f.name.clone()).collect());
        Self::next(&self.uploads, "upload")
    }

    async fn query(&self, _question: &str) -> AppResult<Answer> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.answers, "answer")
    }

    async fn reset_memory(&self) -> AppResult<ResetAck> {
        self.reset_calls.fetch_add(1, Ordering::SeqCst);
        Self::next(&self.resets, "reset")
    }

    async fn schema(&self) -> AppResult<DatasetSchema> {
        Ok(DatasetSchema {
            tables: BTreeMap::new(),
            total_tables: 0,
            total_rows: 0,
        })
    }
}

pub(crate) fn summary(tables: &[&str], rows: u64) -> UploadSummary {
    UploadSummary {
        tables_created: tables.iter().map(|t| t.to_string()).collect(),
        row_count: rows,
    }
}

pub(crate) fn answer(text: &str, sql: &[&str], model: &str) -> Answer {
    Answer {
        text: text.to_string(),
        sql_queries: sql.iter().map(|s| s.to_string()).collect(),
        model_name: model.to_string(),
    }
}
