//! Domain types for the onboarding form model.
//!
//! Forms are runtime-defined templates made of typed fields; submissions
//! carry an open answer map keyed by field name. Enum values are persisted
//! as snake_case strings, timestamps as `%Y-%m-%d %H:%M:%S` UTC.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use turso::{Row, Value as TursoValue};

use crate::errors::StoreError;

/// The answers of one submission: field name to arbitrary JSON value.
pub type AnswerMap = serde_json::Map<String, Value>;

/// The fixed set of field types a form can be composed of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Dropdown,
    Checkbox,
    File,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::Dropdown => "dropdown",
            FieldType::Checkbox => "checkbox",
            FieldType::File => "file",
        }
    }
}

impl FromStr for FieldType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(FieldType::Text),
            "number" => Ok(FieldType::Number),
            "date" => Ok(FieldType::Date),
            "dropdown" => Ok(FieldType::Dropdown),
            "checkbox" => Ok(FieldType::Checkbox),
            "file" => Ok(FieldType::File),
            other => Err(StoreError::DataIntegrity(format!(
                "unknown field type '{other}'"
            ))),
        }
    }
}

/// Comparison operator for conditionally visible fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionalOperator {
    EqualTo,
    GreaterThan,
    LessThan,
    NotEqualTo,
}

impl ConditionalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionalOperator::EqualTo => "equal_to",
            ConditionalOperator::GreaterThan => "greater_than",
            ConditionalOperator::LessThan => "less_than",
            ConditionalOperator::NotEqualTo => "not_equal_to",
        }
    }
}

impl FromStr for ConditionalOperator {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "equal_to" => Ok(ConditionalOperator::EqualTo),
            "greater_than" => Ok(ConditionalOperator::GreaterThan),
            "less_than" => Ok(ConditionalOperator::LessThan),
            "not_equal_to" => Ok(ConditionalOperator::NotEqualTo),
            other => Err(StoreError::DataIntegrity(format!(
                "unknown conditional operator '{other}'"
            ))),
        }
    }
}

/// Review status of a submission. A flat enum, not a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(SubmissionStatus::Pending),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            other => Err(StoreError::DataIntegrity(format!(
                "unknown submission status '{other}'"
            ))),
        }
    }
}

/// A named, versioned form template. `fields` is populated on read paths,
/// ordered by `(order, name)`.
#[derive(Debug, Clone, Serialize)]
pub struct Form {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Cleared (not cascaded) when the creating user is deleted.
    pub created_by: Option<String>,
    pub version: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub fields: Vec<Field>,
}

/// A single typed question within a form. `name` is unique per form, not
/// globally. `options` is an open JSON document whose shape depends on
/// `field_type` and is interpreted at validation time, never by the store.
#[derive(Debug, Clone, Serialize)]
pub struct Field {
    pub id: String,
    pub form_id: String,
    pub name: String,
    pub field_type: FieldType,
    pub options: Value,
    pub is_required: bool,
    pub order: i64,
    pub is_conditional: bool,
    /// Id of the controlling field. Must belong to the same form; the
    /// storage layer does not enforce this, the visibility evaluator does.
    pub conditional_field: Option<String>,
    pub conditional_operator: Option<ConditionalOperator>,
    pub conditional_value: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One user's response to a form.
#[derive(Debug, Clone, Serialize)]
pub struct Submission {
    pub id: String,
    pub form_id: String,
    /// Cleared when the submitting account is deleted.
    pub user_id: Option<String>,
    pub data: AnswerMap,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A file uploaded in answer to a specific field of a specific submission.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub id: String,
    pub submission_id: String,
    pub field_id: String,
    /// Opaque reference handed back by the file storage collaborator.
    pub file_ref: String,
    pub byte_len: i64,
    pub uploaded_at: DateTime<Utc>,
}

/// Input for creating a form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// Partial update of a form. `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub version: Option<i64>,
    pub is_active: Option<bool>,
}

/// Input for adding a field to a form.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default = "default_options")]
    pub options: Value,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub order: i64,
    #[serde(default)]
    pub is_conditional: bool,
    #[serde(default)]
    pub conditional_field: Option<String>,
    #[serde(default)]
    pub conditional_operator: Option<ConditionalOperator>,
    #[serde(default)]
    pub conditional_value: Option<String>,
}

fn default_options() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Partial update of a field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldPatch {
    pub name: Option<String>,
    pub field_type: Option<FieldType>,
    pub options: Option<Value>,
    pub is_required: Option<bool>,
    pub order: Option<i64>,
    pub is_conditional: Option<bool>,
    pub conditional_field: Option<Option<String>>,
    pub conditional_operator: Option<Option<ConditionalOperator>>,
    pub conditional_value: Option<Option<String>>,
}

/// Identity stamped onto a submission, plus the contact handed to the
/// notification dispatcher.
#[derive(Debug, Clone)]
pub struct Submitter {
    pub user_id: String,
    pub contact: String,
}

/// A file blob received alongside a submission, before it reaches storage.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        .map_err(|e| StoreError::DataIntegrity(format!("failed to parse date '{raw}': {e}")))
}

pub(crate) fn text_or_none(row: &Row, idx: usize) -> Result<Option<String>, StoreError> {
    Ok(match row.get_value(idx)? {
        TursoValue::Text(s) => Some(s),
        _ => None,
    })
}

/// Maps an optional string onto a bindable SQL value.
pub(crate) fn opt_text(value: Option<&str>) -> TursoValue {
    match value {
        Some(s) => TursoValue::Text(s.to_string()),
        None => TursoValue::Null,
    }
}

pub(crate) const FORM_COLUMNS: &str =
    "id, name, description, created_by, version, is_active, created_at, updated_at";

impl TryFrom<&Row> for Form {
    type Error = StoreError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        let created_at: String = row.get(6)?;
        let updated_at: String = row.get(7)?;
        Ok(Form {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            created_by: text_or_none(row, 3)?,
            version: row.get(4)?,
            is_active: row.get::<i64>(5)? != 0,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
            fields: Vec::new(),
        })
    }
}

pub(crate) const FIELD_COLUMNS: &str = "id, form_id, name, field_type, options, is_required, \
     field_order, is_conditional, conditional_field_id, conditional_operator, \
     conditional_value, created_at";

impl TryFrom<&Row> for Field {
    type Error = StoreError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        let field_type: String = row.get(3)?;
        let options_raw: String = row.get(4)?;
        let operator = text_or_none(row, 9)?
            .map(|s| s.parse::<ConditionalOperator>())
            .transpose()?;
        let created_at: String = row.get(11)?;
        Ok(Field {
            id: row.get(0)?,
            form_id: row.get(1)?,
            name: row.get(2)?,
            field_type: field_type.parse()?,
            options: serde_json::from_str(&options_raw)
                .map_err(|e| StoreError::DataIntegrity(format!("malformed options: {e}")))?,
            is_required: row.get::<i64>(5)? != 0,
            order: row.get(6)?,
            is_conditional: row.get::<i64>(7)? != 0,
            conditional_field: text_or_none(row, 8)?,
            conditional_operator: operator,
            conditional_value: text_or_none(row, 10)?,
            created_at: parse_timestamp(&created_at)?,
        })
    }
}

pub(crate) const SUBMISSION_COLUMNS: &str =
    "id, form_id, user_id, data, status, submitted_at, updated_at";

impl TryFrom<&Row> for Submission {
    type Error = StoreError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        let data_raw: String = row.get(3)?;
        let status: String = row.get(4)?;
        let data: Value = serde_json::from_str(&data_raw)
            .map_err(|e| StoreError::DataIntegrity(format!("malformed answer map: {e}")))?;
        let data = match data {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::DataIntegrity(format!(
                    "answer map is not a JSON object: {other}"
                )))
            }
        };
        let submitted_at: String = row.get(5)?;
        let updated_at: String = row.get(6)?;
        Ok(Submission {
            id: row.get(0)?,
            form_id: row.get(1)?,
            user_id: text_or_none(row, 2)?,
            data,
            status: status.parse()?,
            submitted_at: parse_timestamp(&submitted_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }
}

pub(crate) const DOCUMENT_COLUMNS: &str =
    "id, submission_id, field_id, file_ref, byte_len, uploaded_at";

impl TryFrom<&Row> for Document {
    type Error = StoreError;

    fn try_from(row: &Row) -> Result<Self, Self::Error> {
        let uploaded_at: String = row.get(5)?;
        Ok(Document {
            id: row.get(0)?,
            submission_id: row.get(1)?,
            field_id: row.get(2)?,
            file_ref: row.get(3)?,
            byte_len: row.get(4)?,
            uploaded_at: parse_timestamp(&uploaded_at)?,
        })
    }
}
