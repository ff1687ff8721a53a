//! # Form Route Handlers
//!
//! CRUD over form definitions. Reads are open so clients can fetch the forms
//! they need to fill; every mutation is admin only.

use crate::{
    auth::middleware::CurrentActor,
    errors::AppError,
    handlers::{field_handlers::FieldView, respond},
    state::AppState,
    types::ApiResponse,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use onboard::{Form, FormPatch, NewForm};
use serde::{Deserialize, Serialize};

/// The wire shape of a form, with its ordered field list nested.
#[derive(Serialize)]
pub struct FormView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub created_by: Option<String>,
    pub version: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fields: Vec<FieldView>,
}

impl From<Form> for FormView {
    fn from(form: Form) -> Self {
        FormView {
            id: form.id,
            name: form.name,
            description: form.description,
            created_by: form.created_by,
            version: form.version,
            is_active: form.is_active,
            created_at: form.created_at,
            updated_at: form.updated_at,
            fields: form.fields.into_iter().map(FieldView::from).collect(),
        }
    }
}

#[derive(Deserialize)]
pub struct CreateFormRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Creates a form. Admin only; the creator is recorded.
pub async fn create_form_handler(
    State(app_state): State<AppState>,
    actor: CurrentActor,
    Json(payload): Json<CreateFormRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FormView>>), AppError> {
    let admin = actor.require_admin()?;
    let form = app_state
        .forms
        .create_form(NewForm {
            name: payload.name,
            description: payload.description,
            created_by: Some(admin.id),
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        respond("Form created successfully.", form.into()),
    ))
}

/// Lists every form, name order, fields nested.
pub async fn list_forms_handler(
    State(app_state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<FormView>>>, AppError> {
    let forms = app_state.forms.list_forms().await?;
    Ok(respond("OK", forms.into_iter().map(FormView::from).collect()))
}

pub async fn get_form_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<FormView>>, AppError> {
    let form = app_state.forms.get_form(&id).await?;
    Ok(respond("OK", form.into()))
}

/// Applies a partial update to a form. Admin only.
pub async fn update_form_handler(
    State(app_state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    Json(patch): Json<FormPatch>,
) -> Result<Json<ApiResponse<FormView>>, AppError> {
    actor.require_admin()?;
    let form = app_state.forms.update_form(&id, patch).await?;
    Ok(respond("Form updated successfully.", form.into()))
}

/// Deletes a form and everything under it. Admin only.
pub async fn delete_form_handler(
    State(app_state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    actor.require_admin()?;
    app_state.forms.delete_form(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
