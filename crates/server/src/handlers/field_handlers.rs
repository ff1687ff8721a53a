//! # Field Route Handlers
//!
//! CRUD over the typed fields of a form. As with forms, reads are open and
//! mutations are admin only.

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
use chrono::{DateTime, Utc};
use onboard::{ConditionalOperator, Field, FieldPatch, FieldSpec, FieldType};
use serde::Serialize;
use serde_json::Value;

/// The wire shape of a field.
#[derive(Serialize)]
pub struct FieldView {
    pub id: String,
    #[serde(rename = "form")]
    pub form_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub options: Value,
    pub is_required: bool,
    pub order: i64,
    pub is_conditional: bool,
    pub conditional_field: Option<String>,
    pub conditional_operator: Option<ConditionalOperator>,
    pub conditional_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Field> for FieldView {
    fn from(field: Field) -> Self {
        FieldView {
            id: field.id,
            form_id: field.form_id,
            name: field.name,
            field_type: field.field_type,
            options: field.options,
            is_required: field.is_required,
            order: field.order,
            is_conditional: field.is_conditional,
            conditional_field: field.conditional_field,
            conditional_operator: field.conditional_operator,
            conditional_value: field.conditional_value,
            created_at: field.created_at,
        }
    }
}

/// Adds a field to a form. Admin only.
pub async fn create_field_handler(
    State(app_state): State<AppState>,
    actor: CurrentActor,
    Path(form_id): Path<String>,
    Json(spec): Json<FieldSpec>,
) -> Result<(StatusCode, Json<ApiResponse<FieldView>>), AppError> {
    actor.require_admin()?;
    let field = app_state.forms.add_field(&form_id, spec).await?;
    Ok((
        StatusCode::CREATED,
        respond("Field created successfully.", field.into()),
    ))
}

/// The ordered field list of one form.
pub async fn list_form_fields_handler(
    State(app_state): State<AppState>,
    Path(form_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<FieldView>>>, AppError> {
    let fields = app_state.forms.list_fields(&form_id).await?;
    Ok(respond(
        "OK",
        fields.into_iter().map(FieldView::from).collect(),
    ))
}

/// Every field across all forms, grouped by form.
pub async fn list_fields_handler(
    State(app_state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<FieldView>>>, AppError> {
    let fields = app_state.forms.list_all_fields().await?;
    Ok(respond(
        "OK",
        fields.into_iter().map(FieldView::from).collect(),
    ))
}

pub async fn get_field_handler(
    State(app_state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<FieldView>>, AppError> {
    let field = app_state.forms.get_field(&id).await?;
    Ok(respond("OK", field.into()))
}

/// Applies a partial update to a field. Admin only.
pub async fn update_field_handler(
    State(app_state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
    Json(patch): Json<FieldPatch>,
) -> Result<Json<ApiResponse<FieldView>>, AppError> {
    actor.require_admin()?;
    let field = app_state.forms.update_field(&id, patch).await?;
    Ok(respond("Field updated successfully.", field.into()))
}

/// Deletes a field and its documents. Admin only.
pub async fn delete_field_handler(
    State(app_state): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    actor.require_admin()?;
    app_state.forms.delete_field(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
