//! Server-side memory reset
//!
//! Only the remote conversational memory is cleared. The transcript, the
//! dataset flag and the upload summary stay as they are.

use super::{Message, Outcome, OperationTask, Pending, SessionController};
use crate::models::ResetAck;
use crate::types::AppResult;
use tracing::{info, warn};

const RESET_CONFIRMATION: &str = "Conversation memory has been reset.";

impl SessionController {
    pub fn begin_reset(&mut self) -> AppResult<OperationTask> {
        self.ensure_idle()?;

        let service = self.service();
        Ok(self.start(Pending::Resetting, async move {
            Outcome::Reset(service.reset_memory().await)
        }))
    }

    /// Reset and wait. Safe to call again after a failure.
    pub async fn reset_memory(&mut self) -> AppResult<()> {
        let task = self.begin_reset()?;
        self.run(task).await;
        Ok(())
    }

    pub(super) fn apply_reset(&mut self, result: AppResult<ResetAck>) {
        match result {
            Ok(ack) if ack.confirmed => {
                info!("Server memory reset");
                let text = ack
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| RESET_CONFIRMATION.to_string());
                self.append(Message::system(text));
            }
            Ok(_) => {
                warn!("Reset not confirmed by service");
                self.append(Message::error(
                    "Error resetting memory: the service did not confirm the reset",
                ));
            }
            Err(e) => {
                warn!("Reset failed: {}", e);
                self.append(Message::error(format!("Error resetting memory: {}", e)));
            }
        }
    }
}
