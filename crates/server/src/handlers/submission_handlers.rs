//! # Submission Route Handlers
//!
//! Intake is a single multipart request: a `form_id` part, a `data` part
//! holding the JSON answer map, and any number of file parts named after the
//! file field they answer. Every submission endpoint requires a login;
//! review and deletion additionally require an admin.

use crate::{
    auth::middleware::CurrentActor,
    errors::AppError,
    handlers::respond,
    state::AppState,
    types::ApiResponse,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::Multipart;
use chrono::{DateTime, Utc};
use onboard::{
    AnswerMap, Document, Submission, SubmissionStatus, Submitter, UploadedFile,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

/// The wire shape of a submission. `documents` is only populated on the
/// detail endpoint.
#[derive(Serialize)]
pub struct SubmissionView {
    pub id: String,
    #[serde(rename = "form")]
    pub form_id: String,
    #[serde(rename = "user")]
    pub user_id: Option<String>,
    pub data: AnswerMap,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<DocumentView>>,
}

#[derive(Serialize)]
pub struct DocumentView {
    pub id: String,
    #[serde(rename = "field")]
    pub field_id: String,
    pub file: String,
    pub size: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Submission> for SubmissionView {
    fn from(submission: Submission) -> Self {
        SubmissionView {
            id: submission.id,
            form_id: submission.form_id,
            user_id: submission.user_id,
            data: submission.data,
            status: submission.status,
            submitted_at: submission.submitted_at,
            updated_at: submission.updated_at,
            documents: None,
        }
    }
}

impl From<Document> for DocumentView {
    fn from(document: Document) -> Self {
        DocumentView {
            id: document.id,
            field_id: document.field_id,
            file: document.file_ref,
            size: document.byte_len,
            uploaded_at: document.uploaded_at,
        }
    }
}

/// Accepts a submission, answers and attachments in one multipart body.
/// Any authenticated user.
pub async fn create_submission_handler(
    State(app_state): State<AppState>,
    actor: CurrentActor,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<SubmissionView>>), AppError> {
    let user = actor.require_user()?;

    let mut form_id: Option<String> = None;
    let mut answers: Option<AnswerMap> = None;
    let mut uploads: HashMap<String, Vec<UploadedFile>> = HashMap::new();

    while let Some(field) = multipart.next_field().await.map_err(anyhow::Error::from)? {
        let name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(str::to_string);

        if let Some(file_name) = file_name {
            // Any part carrying a filename is an attachment, keyed by the
            // field it answers.
            let bytes = field.bytes().await.map_err(anyhow::Error::from)?.to_vec();
            uploads
                .entry(name)
                .or_default()
                .push(UploadedFile { file_name, bytes });
            continue;
        }

        match name.as_str() {
            "form_id" => {
                form_id = Some(field.text().await.map_err(anyhow::Error::from)?);
            }
            "data" => {
                let raw = field.text().await.map_err(anyhow::Error::from)?;
                let value: Value = serde_json::from_str(&raw).map_err(|e| {
                    AppError::BadRequest(format!("'data' is not valid JSON: {e}"))
                })?;
                match value {
                    Value::Object(map) => answers = Some(map),
                    _ => {
                        return Err(AppError::BadRequest(
                            "'data' must be a JSON object keyed by field name.".to_string(),
                        ))
                    }
                }
            }
            other => info!("Ignoring unknown multipart part: {other}"),
        }
    }

    let form_id = form_id
        .ok_or_else(|| AppError::BadRequest("Missing 'form_id' part.".to_string()))?;
    let answers = answers.unwrap_or_default();

    let submitter = Submitter {
        contact: user.contact_address(),
        user_id: user.id,
    };

    let submission = app_state
        .submissions
        .submit(&form_id, answers, Some(submitter), uploads)
        .await?;

    Ok((
        StatusCode::CREATED,
        respond("Submission received.", submission.into()),
    ))
}

/// Every submission, newest first. Any authenticated user.
pub async fn list_submissions_handler(
    State(app_state): State<AppState>,
    actor: CurrentActor,
) -> Result<Json<ApiResponse<Vec<SubmissionView>>>, AppError> {
    actor.require_user()?;
    let submissions = app_state.submissions.list_all().await?;
    Ok(respond(
        "OK",
        submissions.into_iter().map(SubmissionView::from).collect(),
    ))
}

/// The caller's own submissions, newest first.
pub async fn my_submissions_handler(
    State(app_state): State<AppState>,
    actor: CurrentActor,
) -> Result<Json<ApiResponse<Vec<SubmissionView>>>, AppError> {
    let user = actor.require_user()?;
    let submissions = app_state.submissions.list_for_user(&user.id).await?;
    Ok(respond(
        "OK",
        submissions.into_iter().map(SubmissionView::from).collect(),
    ))
}

/// One submission with its documents. The submitter or an admin.
pub async fn get_submission_handler(
    State(app_state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SubmissionView>>, AppError> {
    let user = actor.require_user()?;
    let submission = app_state.submissions.get(&id).await?;
    if !user.is_admin() && submission.user_id.as_deref() != Some(user.id.as_str()) {
        return Err(AppError::Forbidden(
            "You do not have permission to view this submission.".to_string(),
        ));
    }

    let documents = app_state.submissions.documents_for(&id).await?;
    let mut view = SubmissionView::from(submission);
    view.documents = Some(documents.into_iter().map(DocumentView::from).collect());
    Ok(respond("OK", view))
}

#[derive(Deserialize)]
pub struct StatusUpdateRequest {
    pub status: SubmissionStatus,
}

/// Moves a submission to a new review status. Admin only.
pub async fn update_submission_handler(
    State(app_state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<ApiResponse<SubmissionView>>, AppError> {
    actor.require_admin()?;
    let submission = app_state.submissions.set_status(&id, payload.status).await?;
    Ok(respond("Submission updated successfully.", submission.into()))
}

/// Deletes a submission and its documents. Admin only.
pub async fn delete_submission_handler(
    State(app_state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    actor.require_admin()?;
    app_state.submissions.delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
