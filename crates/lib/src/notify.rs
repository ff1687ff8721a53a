//! Admin notification dispatch.
//!
//! Submission intake enqueues exactly one notice per successful submission
//! and never waits for delivery; the transport behind the queue (SMTP or
//! otherwise) is an external collaborator with its own retry policy. A full
//! or closed queue is logged by the caller, never surfaced to the client.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

/// The message handed to the dispatcher after a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionNotice {
    pub submission_id: String,
    pub form_name: String,
    pub submitter_contact: String,
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("notification queue is closed")]
    QueueClosed,
}

#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Hands the notice off for asynchronous delivery. Must not block on the
    /// delivery itself.
    async fn enqueue(&self, notice: SubmissionNotice) -> Result<(), NotifyError>;
}

/// Dispatcher backed by an unbounded in-process queue with a worker task
/// that owns delivery.
pub struct QueueDispatcher {
    tx: mpsc::UnboundedSender<SubmissionNotice>,
}

impl QueueDispatcher {
    /// Spawns the delivery worker and returns the enqueue handle. The worker
    /// runs until every handle is dropped.
    pub fn spawn(admin_contact: String) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<SubmissionNotice>();
        tokio::spawn(async move {
            while let Some(notice) = rx.recv().await {
                // Hand-off point for the mail transport.
                info!(
                    submission_id = %notice.submission_id,
                    form = %notice.form_name,
                    submitter = %notice.submitter_contact,
                    admin = %admin_contact,
                    "admin notified of new submission"
                );
            }
        });
        Self { tx }
    }
}

#[async_trait]
impl NotificationDispatcher for QueueDispatcher {
    async fn enqueue(&self, notice: SubmissionNotice) -> Result<(), NotifyError> {
        self.tx.send(notice).map_err(|_| NotifyError::QueueClosed)
    }
}

/// Test dispatcher that records every notice instead of delivering it.
#[derive(Default)]
pub struct RecordingDispatcher {
    notices: Mutex<Vec<SubmissionNotice>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<SubmissionNotice> {
        self.notices.lock().expect("notices lock poisoned").clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn enqueue(&self, notice: SubmissionNotice) -> Result<(), NotifyError> {
        self.notices
            .lock()
            .expect("notices lock poisoned")
            .push(notice);
        Ok(())
    }
}
