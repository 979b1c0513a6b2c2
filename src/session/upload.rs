//! Upload coordination
//!
//! Drives the pending selection through the remote upload and records the
//! resulting dataset summary.

use super::{Message, Outcome, OperationTask, Pending, PendingSelection, SessionController, SessionEvent};
use crate::models::UploadSummary;
use crate::types::{AppError, AppResult};
use std::path::Path;
use tracing::{info, warn};

impl SessionController {
    /// Replace the unsubmitted batch with `selection`.
    ///
    /// Refused while an upload is in flight: that upload clears the
    /// selection on success and would drop the new batch with it.
    pub fn set_selection(&mut self, selection: PendingSelection) -> AppResult<()> {
        self.ensure_not_uploading()?;
        self.selection = selection;
        self.emit_selection();
        Ok(())
    }

    /// Read `paths` and make them the new batch. Both click-to-browse and
    /// dropped files end up here.
    pub async fn select_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> AppResult<usize> {
        self.ensure_not_uploading()?;
        let selection = PendingSelection::load(paths).await?;
        let count = selection.len();
        self.set_selection(selection)?;
        info!("Selected {} file(s) for upload", count);
        Ok(count)
    }

    /// Drop one file from the batch by index
    pub fn remove_file(&mut self, index: usize) -> AppResult<String> {
        self.ensure_not_uploading()?;
        let removed = self.selection.remove(index).ok_or_else(|| {
            AppError::Validation(format!(
                "No file at position {} ({} selected)",
                index + 1,
                self.selection.len()
            ))
        })?;
        self.emit_selection();
        Ok(removed.name)
    }

    pub fn clear_selection(&mut self) -> AppResult<()> {
        self.ensure_not_uploading()?;
        self.selection.clear();
        self.emit_selection();
        Ok(())
    }

    /// Start uploading the current selection.
    pub fn begin_upload(&mut self) -> AppResult<OperationTask> {
        if self.selection.is_empty() {
            return Err(AppError::Validation(
                "Please select files to upload".to_string(),
            ));
        }
        self.ensure_idle()?;

        let files = self.selection.files().to_vec();
        self.append(Message::system(format!(
            "Uploading {} {}...",
            files.len(),
            plural(files.len(), "file", "files")
        )));

        let service = self.service();
        Ok(self.start(Pending::Uploading, async move {
            Outcome::Uploaded(service.upload(&files).await)
        }))
    }

    /// Upload the current selection and wait for the result.
    ///
    /// Only local rejections are returned as errors; a failed upload is
    /// reported in the transcript.
    pub async fn upload(&mut self) -> AppResult<()> {
        let task = self.begin_upload()?;
        self.run(task).await;
        Ok(())
    }

    pub(super) fn apply_upload(&mut self, result: AppResult<UploadSummary>) {
        match result {
            Ok(summary) => {
                info!(
                    "Dataset loaded: {} table(s), {} row(s)",
                    summary.table_count(),
                    summary.row_count
                );
                self.append(Message::system(describe_summary(&summary)));
                self.state.record_upload(summary.clone());
                self.emit(SessionEvent::DatasetLoaded(summary));
                self.selection.clear();
                self.emit_selection();
            }
            Err(e) => {
                warn!("Upload failed: {}", e);
                self.append(Message::error(format!("Error uploading files: {}", e)));
            }
        }
    }

    fn ensure_not_uploading(&self) -> AppResult<()> {
        if self.state.pending() == Pending::Uploading {
            return Err(AppError::Busy(Pending::Uploading));
        }
        Ok(())
    }

    fn emit_selection(&self) {
        self.emit(SessionEvent::SelectionChanged(self.selection.len()));
    }
}

pub fn describe_summary(summary: &UploadSummary) -> String {
    let tables = summary.table_count();
    let mut text = format!(
        "Upload complete: {} {} loaded ({} {})",
        tables,
        plural(tables, "table", "tables"),
        summary.row_count,
        plural(summary.row_count as usize, "row", "rows"),
    );
    if !summary.tables_created.is_empty() {
        text.push_str(": ");
        text.push_str(&summary.tables_created.join(", "));
    }
    text
}

fn plural(n: usize, one: &'static str, many: &'static str) -> &'static str {
    if n == 1 {
        one
    } else {
        many
    }
}
