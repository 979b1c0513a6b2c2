//! Session State
//!
//! The authoritative in-memory model of one session. Fields are private:
//! only the controller mutates them, through methods that keep the
//! invariants (append-only transcript, dataset flag set by uploads only).

use crate::models::{Answer, UploadSummary};
use chrono::{DateTime, Utc};

/// The single in-flight operation, if any
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pending {
    #[default]
    None,
    Uploading,
    Asking,
    Resetting,
}

impl Pending {
    pub fn is_idle(&self) -> bool {
        matches!(self, Pending::None)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Pending::None => "idle",
            Pending::Uploading => "upload",
            Pending::Asking => "question",
            Pending::Resetting => "memory reset",
        }
    }
}

/// Message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    User,
    Ai,
    System,
    Error,
}

/// A transcript entry. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: MessageKind,
    pub content: String,
    /// SQL provenance; empty for everything but some ai messages
    pub sql_queries: Vec<String>,
    pub model_name: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn new(kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            kind,
            content: content.into(),
            sql_queries: Vec::new(),
            model_name: None,
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageKind::User, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageKind::System, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, content)
    }

    pub fn ai(answer: Answer) -> Self {
        let model_name = Some(answer.model_name).filter(|m| !m.trim().is_empty());
        Self {
            sql_queries: answer.sql_queries,
            model_name,
            ..Self::new(MessageKind::Ai, answer.text)
        }
    }

    /// Whether the renderer should show the "SQL Queries Used" section
    pub fn has_provenance(&self) -> bool {
        !self.sql_queries.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    has_dataset: bool,
    messages: Vec<Message>,
    pending: Pending,
    last_upload_summary: Option<UploadSummary>,
}

impl SessionState {
    pub fn has_dataset(&self) -> bool {
        self.has_dataset
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn pending(&self) -> Pending {
        self.pending
    }

    pub fn last_upload_summary(&self) -> Option<&UploadSummary> {
        self.last_upload_summary.as_ref()
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn set_pending(&mut self, pending: Pending) {
        self.pending = pending;
    }

    /// The only path that sets `has_dataset`
    pub(crate) fn record_upload(&mut self, summary: UploadSummary) {
        self.has_dataset = true;
        self.last_upload_summary = Some(summary);
    }
}
