use tokio::sync::mpsc;

use crate::core::error::{AppError, Result};
use crate::features::files::models::FileCategory;

/// Request to copy a file's bytes from `source` into durable storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub file_id: i64,
    pub source: String,
    pub category: FileCategory,
}

/// Sending half of the upload worker's channel
#[derive(Clone)]
pub struct UploadQueue {
    sender: mpsc::UnboundedSender<UploadTask>,
}

impl UploadQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UploadTask>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Hand a task to the worker without waiting for it to run
    pub fn submit(&self, task: UploadTask) -> Result<()> {
        let file_id = task.file_id;
        self.sender.send(task).map_err(|_| {
            AppError::Internal(format!(
                "Upload worker is not running; cannot queue file {}",
                file_id
            ))
        })?;

        tracing::debug!("Queued upload for file {}", file_id);
        Ok(())
    }
}
