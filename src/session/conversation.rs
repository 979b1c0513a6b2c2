//! Question answering against the loaded dataset

use super::{Message, Outcome, OperationTask, Pending, SessionController};
use crate::models::Answer;
use crate::types::{AppError, AppResult};
use tracing::{info, warn};

pub const NO_DATASET_WARNING: &str =
    "Please upload at least one Excel file before asking questions.";

impl SessionController {
    /// Start answering `question`.
    ///
    /// The user message is appended before the task is returned, so it is
    /// always in the transcript ahead of its answer or error.
    pub fn begin_ask(&mut self, question: &str) -> AppResult<OperationTask> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Validation("Question is empty".to_string()));
        }
        // Warned even while another operation is in flight
        if !self.state.has_dataset() {
            self.append(Message::system(NO_DATASET_WARNING));
            return Err(AppError::Precondition(NO_DATASET_WARNING.to_string()));
        }
        self.ensure_idle()?;

        self.append(Message::user(question));

        let service = self.service();
        let question = question.to_string();
        Ok(self.start(Pending::Asking, async move {
            Outcome::Answered(service.query(&question).await)
        }))
    }

    /// Ask and wait for the answer. An empty question is a silent no-op.
    ///
    /// Remote failures end up in the transcript, not in the return value.
    pub async fn ask(&mut self, question: &str) -> AppResult<()> {
        let task = match self.begin_ask(question) {
            Ok(task) => task,
            Err(AppError::Validation(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        self.run(task).await;
        Ok(())
    }

    pub(super) fn apply_answer(&mut self, result: AppResult<Answer>) {
        match result {
            Ok(answer) => {
                info!(
                    "Answer received from {} ({} SQL statement(s))",
                    answer.model_name,
                    answer.sql_queries.len()
                );
                self.append(Message::ai(answer));
            }
            Err(e) => {
                warn!("Question failed: {}", e);
                self.append(Message::error(format!("Error: {}", e)));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{answer, summary, FakeService};
    use super::super::{MessageKind, PendingSelection};
    use super::*;
    use crate::models::FileBlob;
    use std::sync::Arc;

    async fn with_dataset(fake: FakeService) -> (SessionController, Arc<FakeService>) {
        let fake = Arc::new(fake.with_upload(Ok(summary(&["sales_2024_sales"], 142))));
        let mut controller = SessionController::new(fake.clone());
        controller
            .set_selection(PendingSelection::new(vec![FileBlob::new(
                "sales_2024.xlsx",
                vec![1u8],
            )]))
            .unwrap();
        controller.upload().await.unwrap();
        (controller, fake)
    }

    #[tokio::test]
    async fn test_question_without_dataset_warns_once() {
        let fake = Arc::new(FakeService::default());
        let mut controller = SessionController::new(fake.clone());

        let err = controller.ask("What is the total revenue?").await.unwrap_err();

        assert!(matches!(err, AppError::Precondition(_)));
        assert_eq!(fake.query_calls(), 0);
        let messages = controller.state().messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::System);
        assert_eq!(messages[0].content, NO_DATASET_WARNING);
        assert!(controller.state().pending().is_idle());
    }

    #[tokio::test]
    async fn test_blank_question_is_ignored() {
        let (mut controller, fake) = with_dataset(FakeService::default()).await;
        let before = controller.state().messages().len();

        controller.ask("   \n\t").await.unwrap();

        assert_eq!(controller.state().messages().len(), before);
        assert_eq!(fake.query_calls(), 0);
    }

    #[tokio::test]
    async fn test_answer_without_provenance() {
        let (mut controller, _fake) = with_dataset(
            FakeService::default().with_answer(Ok(answer("Total revenue is $125,333", &[], "gpt-x"))),
        )
        .await;

        controller.ask("  Total revenue?  ").await.unwrap();

        let messages = controller.state().messages();
        let n = messages.len();
        assert_eq!(messages[n - 2].kind, MessageKind::User);
        assert_eq!(messages[n - 2].content, "Total revenue?");

        let ai = &messages[n - 1];
        assert_eq!(ai.kind, MessageKind::Ai);
        assert_eq!(ai.content, "Total revenue is $125,333");
        assert!(!ai.has_provenance());
        assert_eq!(ai.model_name.as_deref(), Some("gpt-x"));
    }

    #[tokio::test]
    async fn test_answer_keeps_sql_order() {
        let (mut controller, _fake) = with_dataset(FakeService::default().with_answer(Ok(
            answer("42", &["SELECT 1", "SELECT 2"], "gpt-4o-mini"),
        )))
        .await;

        controller.ask("q").await.unwrap();

        let ai = controller.state().last_message().unwrap();
        assert_eq!(ai.sql_queries, vec!["SELECT 1", "SELECT 2"]);
    }

    #[tokio::test]
    async fn test_failed_query_then_recovery() {
        let (mut controller, fake) = with_dataset(
            FakeService::default()
                .with_answer(Err(AppError::Transport("connection refused".into())))
                .with_answer(Ok(answer("Fine now", &[], "gpt-x"))),
        )
        .await;
        let before = controller.state().messages().len();

        controller.ask("first").await.unwrap();

        let messages = controller.state().messages();
        assert_eq!(messages.len(), before + 2);
        let errors: Vec<_> = messages[before..]
            .iter()
            .filter(|m| m.kind == MessageKind::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].content, "Error: Network error: connection refused");
        assert!(controller.state().pending().is_idle());

        controller.ask("second").await.unwrap();
        let last = controller.state().last_message().unwrap();
        assert_eq!(last.kind, MessageKind::Ai);
        assert_eq!(last.content, "Fine now");
        assert_eq!(fake.query_calls(), 2);
    }

    #[tokio::test]
    async fn test_second_question_rejected_while_pending() {
        let (mut controller, fake) = with_dataset(
            FakeService::default()
                .with_answer(Ok(answer("first answer", &[], "gpt-x")))
                .with_answer(Ok(answer("never used", &[], "gpt-x"))),
        )
        .await;
        let before = controller.state().messages().len();

        let first = controller.begin_ask("first").unwrap();
        assert_eq!(controller.state().pending(), Pending::Asking);

        let second = controller.begin_ask("second");
        assert!(matches!(second, Err(AppError::Busy(Pending::Asking))));

        controller.run(first).await;

        let contents: Vec<_> = controller.state().messages()[before..]
            .iter()
            .map(|m| (m.kind, m.content.as_str()))
            .collect();
        assert_eq!(
            contents,
            vec![
                (MessageKind::User, "first"),
                (MessageKind::Ai, "first answer"),
            ]
        );
        assert_eq!(fake.query_calls(), 1);
    }

    #[tokio::test]
    async fn test_question_during_first_upload_warns() {
        let fake = Arc::new(FakeService::default().with_upload(Ok(summary(&["t"], 1))));
        let mut controller = SessionController::new(fake.clone());
        controller
            .set_selection(PendingSelection::new(vec![FileBlob::new("t.xlsx", vec![1u8])]))
            .unwrap();

        let upload = controller.begin_upload().unwrap();
        let before = controller.state().messages().len();
        let err = controller.ask("too early").await.unwrap_err();
        assert!(matches!(err, AppError::Precondition(_)));
        assert_eq!(controller.state().messages().len(), before + 1);
        assert_eq!(controller.state().pending(), Pending::Uploading);

        controller.run(upload).await;
        assert!(controller.state().has_dataset());
        assert_eq!(fake.query_calls(), 0);
    }

    #[tokio::test]
    async fn test_question_without_dataset_warns_while_resetting() {
        let fake = Arc::new(FakeService::default().with_reset(Ok(crate::models::ResetAck {
            confirmed: true,
            message: None,
        })));
        let mut controller = SessionController::new(fake.clone());

        let reset = controller.begin_reset().unwrap();
        let err = controller.begin_ask("What is the total revenue?").err().unwrap();

        assert!(matches!(err, AppError::Precondition(_)));
        let warnings = controller
            .state()
            .messages()
            .iter()
            .filter(|m| m.kind == MessageKind::System && m.content == NO_DATASET_WARNING)
            .count();
        assert_eq!(warnings, 1);
        assert_eq!(controller.state().pending(), Pending::Resetting);

        controller.run(reset).await;
        assert!(controller.state().pending().is_idle());
        assert_eq!(fake.query_calls(), 0);
    }

    #[tokio::test]
    async fn test_question_with_dataset_rejected_during_reupload() {
        let (mut controller, fake) = with_dataset(
            FakeService::default().with_upload(Ok(summary(&["t2"], 2))),
        )
        .await;
        controller
            .set_selection(PendingSelection::new(vec![FileBlob::new("t2.xlsx", vec![1u8])]))
            .unwrap();

        let upload = controller.begin_upload().unwrap();
        let before = controller.state().messages().len();
        let err = controller.ask("too early").await.unwrap_err();
        assert_eq!(err, AppError::Busy(Pending::Uploading));
        assert_eq!(controller.state().messages().len(), before);

        controller.run(upload).await;
        assert_eq!(fake.query_calls(), 0);
    }
}
