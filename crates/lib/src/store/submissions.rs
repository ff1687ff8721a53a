//! Submission intake and review store.
//!
//! `submit` is the load-bearing operation: it resolves the form, runs the
//! full validation pass (required fields gated by conditional visibility,
//! then per-type value checks), writes the submission row and every document
//! row in a single transaction, and finally hands one notice to the
//! notification dispatcher. Notification failures are logged and never
//! surfaced; a file-storage failure mid-transaction rolls back the
//! submission row too, so no orphaned documents or half-written submissions
//! can exist.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};
use turso::{params, Connection, Database, Value as TursoValue};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::files::FileStorage;
use crate::notify::{NotificationDispatcher, SubmissionNotice};
use crate::provider::SqliteProvider;
use crate::store::forms::fields_for;
use crate::types::{
    opt_text, AnswerMap, Document, Field, Form, Submission, SubmissionStatus, Submitter,
    UploadedFile, DOCUMENT_COLUMNS, FORM_COLUMNS, SUBMISSION_COLUMNS,
};
use crate::validation::validate_answers;

#[derive(Clone)]
pub struct SubmissionStore {
    db: Database,
    files: Arc<dyn FileStorage>,
    dispatcher: Arc<dyn NotificationDispatcher>,
}

impl SubmissionStore {
    pub fn new(
        provider: &SqliteProvider,
        files: Arc<dyn FileStorage>,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            db: provider.db.clone(),
            files,
            dispatcher,
        }
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        self.db
            .connect()
            .map_err(|e| StoreError::StorageConnection(e.to_string()))
    }

    /// Creates a submission against an active form.
    ///
    /// Validation failures abort before any write and carry the complete
    /// error set. Uploads are keyed by field name; a name that matches no
    /// field of the form is skipped with a warning. The submission row and
    /// all document rows commit or roll back together.
    pub async fn submit(
        &self,
        form_id: &str,
        answers: AnswerMap,
        submitter: Option<Submitter>,
        uploads: HashMap<String, Vec<UploadedFile>>,
    ) -> Result<Submission, StoreError> {
        let conn = self.connect()?;

        let form = active_form(&conn, form_id).await?;
        let fields = fields_for(&conn, form_id).await?;

        let errors = validate_answers(&fields, &answers);
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }

        let submission_id = Uuid::new_v4().to_string();
        super::begin_immediate(&conn).await?;
        let written = self
            .write_submission(&conn, &submission_id, &form, &fields, &answers, &submitter, uploads)
            .await;
        match written {
            Ok(document_count) => {
                conn.execute("COMMIT", ()).await?;
                info!(
                    submission_id = %submission_id,
                    form = %form.name,
                    documents = document_count,
                    "submission recorded"
                );
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", ()).await;
                return Err(e);
            }
        }

        let submission = self.get(&submission_id).await?;

        // Fire-and-forget: a queue failure must never fail the submission.
        let notice = SubmissionNotice {
            submission_id: submission.id.clone(),
            form_name: form.name.clone(),
            submitter_contact: submitter
                .map(|s| s.contact)
                .unwrap_or_else(|| "anonymous".to_string()),
        };
        if let Err(e) = self.dispatcher.enqueue(notice).await {
            warn!(
                submission_id = %submission.id,
                error = %e,
                "failed to enqueue admin notification"
            );
        }

        Ok(submission)
    }

    #[allow(clippy::too_many_arguments)]
    async fn write_submission(
        &self,
        conn: &Connection,
        submission_id: &str,
        form: &Form,
        fields: &[Field],
        answers: &AnswerMap,
        submitter: &Option<Submitter>,
        uploads: HashMap<String, Vec<UploadedFile>>,
    ) -> Result<usize, StoreError> {
        conn.execute(
            "INSERT INTO submissions (id, form_id, user_id, data) VALUES (?, ?, ?, ?)",
            vec![
                TursoValue::Text(submission_id.to_string()),
                TursoValue::Text(form.id.clone()),
                opt_text(submitter.as_ref().map(|s| s.user_id.as_str())),
                TursoValue::Text(serde_json::to_string(answers)?),
            ],
        )
        .await?;

        let mut document_count = 0;
        for (field_name, blobs) in uploads {
            let Some(field) = fields.iter().find(|f| f.name == field_name) else {
                warn!(
                    form = %form.name,
                    field = %field_name,
                    "uploaded file targets no field of this form, skipping"
                );
                continue;
            };

            for blob in blobs {
                let stored = self.files.store(&blob.bytes, &blob.file_name).await?;
                conn.execute(
                    "INSERT INTO documents (id, submission_id, field_id, file_ref, byte_len) \
                     VALUES (?, ?, ?, ?, ?)",
                    vec![
                        TursoValue::Text(Uuid::new_v4().to_string()),
                        TursoValue::Text(submission_id.to_string()),
                        TursoValue::Text(field.id.clone()),
                        TursoValue::Text(stored.reference),
                        TursoValue::Integer(stored.byte_len as i64),
                    ],
                )
                .await?;
                document_count += 1;
            }
        }
        Ok(document_count)
    }

    pub async fn get(&self, id: &str) -> Result<Submission, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = ?"),
                params![id.to_string()],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("submission '{id}'")))?;
        Submission::try_from(&row)
    }

    /// Every submission, newest first.
    pub async fn list_all(&self) -> Result<Vec<Submission>, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM submissions ORDER BY submitted_at DESC"
                ),
                (),
            )
            .await?;
        collect_submissions(&mut rows).await
    }

    /// The submissions of one user, newest first.
    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Submission>, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE user_id = ? \
                     ORDER BY submitted_at DESC"
                ),
                params![user_id.to_string()],
            )
            .await?;
        collect_submissions(&mut rows).await
    }

    /// Flat status change; there is no review workflow beyond this.
    pub async fn set_status(
        &self,
        id: &str,
        status: SubmissionStatus,
    ) -> Result<Submission, StoreError> {
        let conn = self.connect()?;
        self.get(id).await?;
        conn.execute(
            "UPDATE submissions SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            params![status.as_str().to_string(), id.to_string()],
        )
        .await?;
        self.get(id).await
    }

    /// Deletes a submission and its documents in one transaction.
    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.connect()?;
        self.get(id).await?;

        super::begin_immediate(&conn).await?;
        let result = async {
            conn.execute(
                "DELETE FROM documents WHERE submission_id = ?",
                params![id.to_string()],
            )
            .await?;
            conn.execute(
                "DELETE FROM submissions WHERE id = ?",
                params![id.to_string()],
            )
            .await?;
            Ok::<(), StoreError>(())
        }
        .await;
        match result {
            Ok(()) => {
                conn.execute("COMMIT", ()).await?;
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }

    /// The documents of one submission, oldest upload first.
    pub async fn documents_for(&self, submission_id: &str) -> Result<Vec<Document>, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {DOCUMENT_COLUMNS} FROM documents WHERE submission_id = ? \
                     ORDER BY uploaded_at ASC"
                ),
                params![submission_id.to_string()],
            )
            .await?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next().await? {
            documents.push(Document::try_from(&row)?);
        }
        Ok(documents)
    }
}

/// Resolves a form for intake. Missing and inactive forms are both reported
/// as `NotFound`; an inactive form accepts no submissions.
async fn active_form(conn: &Connection, form_id: &str) -> Result<Form, StoreError> {
    let mut rows = conn
        .query(
            &format!("SELECT {FORM_COLUMNS} FROM forms WHERE id = ?"),
            params![form_id.to_string()],
        )
        .await?;
    let row = rows
        .next()
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("form '{form_id}'")))?;
    let form = Form::try_from(&row)?;
    if !form.is_active {
        return Err(StoreError::NotFound(format!("form '{form_id}'")));
    }
    Ok(form)
}

async fn collect_submissions(rows: &mut turso::Rows) -> Result<Vec<Submission>, StoreError> {
    let mut submissions = Vec::new();
    while let Some(row) = rows.next().await? {
        submissions.push(Submission::try_from(&row)?);
    }
    Ok(submissions)
}
