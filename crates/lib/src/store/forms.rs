//! Form definition store.
//!
//! Forms own their fields: field names are unique per form (the same name
//! may recur in another form), field lists are always returned ordered by
//! `(field_order, name)`, and deleting a form cascades to its fields, its
//! submissions, and every document under either.

use tracing::info;
use turso::{params, Connection, Database, Value as TursoValue};
use uuid::Uuid;

use crate::errors::StoreError;
use crate::provider::SqliteProvider;
use crate::types::{
    opt_text, Field, FieldPatch, FieldSpec, Form, FormPatch, NewForm, FIELD_COLUMNS, FORM_COLUMNS,
};

#[derive(Clone)]
pub struct FormStore {
    db: Database,
}

impl FormStore {
    pub fn new(provider: &SqliteProvider) -> Self {
        Self {
            db: provider.db.clone(),
        }
    }

    fn connect(&self) -> Result<Connection, StoreError> {
        self.db
            .connect()
            .map_err(|e| StoreError::StorageConnection(e.to_string()))
    }

    /// Creates a form, failing with `DuplicateName` if the name is taken.
    /// The name is globally unique; the creator reference is optional and
    /// survives as NULL if that user is ever deleted.
    pub async fn create_form(&self, new: NewForm) -> Result<Form, StoreError> {
        let conn = self.connect()?;

        let mut rows = conn
            .query(
                "SELECT 1 FROM forms WHERE name = ? LIMIT 1",
                params![new.name.clone()],
            )
            .await?;
        if rows.next().await?.is_some() {
            return Err(StoreError::DuplicateName(new.name));
        }

        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO forms (id, name, description, created_by) VALUES (?, ?, ?, ?)",
            vec![
                TursoValue::Text(id.clone()),
                TursoValue::Text(new.name.clone()),
                TursoValue::Text(new.description),
                opt_text(new.created_by.as_deref()),
            ],
        )
        .await?;

        info!(form = %new.name, id = %id, "created form");
        self.get_form(&id).await
    }

    /// Fetches one form with its ordered field list.
    pub async fn get_form(&self, id: &str) -> Result<Form, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {FORM_COLUMNS} FROM forms WHERE id = ?"),
                params![id.to_string()],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("form '{id}'")))?;
        let mut form = Form::try_from(&row)?;
        form.fields = fields_for(&conn, id).await?;
        Ok(form)
    }

    /// Lists every form sorted by name ascending, fields nested and ordered.
    pub async fn list_forms(&self) -> Result<Vec<Form>, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {FORM_COLUMNS} FROM forms ORDER BY name ASC"),
                (),
            )
            .await?;

        let mut forms = Vec::new();
        while let Some(row) = rows.next().await? {
            forms.push(Form::try_from(&row)?);
        }
        for form in &mut forms {
            form.fields = fields_for(&conn, &form.id).await?;
        }
        Ok(forms)
    }

    /// Applies a partial update. Renaming onto an existing name fails with
    /// `DuplicateName`; `updated_at` is always bumped.
    pub async fn update_form(&self, id: &str, patch: FormPatch) -> Result<Form, StoreError> {
        let conn = self.connect()?;
        let existing = self.get_form(id).await?;

        if let Some(name) = &patch.name {
            if *name != existing.name {
                let mut rows = conn
                    .query(
                        "SELECT 1 FROM forms WHERE name = ? LIMIT 1",
                        params![name.clone()],
                    )
                    .await?;
                if rows.next().await?.is_some() {
                    return Err(StoreError::DuplicateName(name.clone()));
                }
            }
        }

        let mut sets = vec!["updated_at = CURRENT_TIMESTAMP".to_string()];
        let mut bindings: Vec<TursoValue> = Vec::new();
        if let Some(name) = patch.name {
            sets.push("name = ?".to_string());
            bindings.push(TursoValue::Text(name));
        }
        if let Some(description) = patch.description {
            sets.push("description = ?".to_string());
            bindings.push(TursoValue::Text(description));
        }
        if let Some(version) = patch.version {
            sets.push("version = ?".to_string());
            bindings.push(TursoValue::Integer(version));
        }
        if let Some(is_active) = patch.is_active {
            sets.push("is_active = ?".to_string());
            bindings.push(TursoValue::Integer(is_active as i64));
        }
        bindings.push(TursoValue::Text(id.to_string()));

        let sql = format!("UPDATE forms SET {} WHERE id = ?", sets.join(", "));
        conn.execute(&sql, bindings).await?;

        self.get_form(id).await
    }

    /// Deletes a form and everything hanging off it: fields, submissions,
    /// and the documents of both, in one transaction.
    pub async fn delete_form(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.connect()?;
        ensure_form_exists(&conn, id).await?;

        super::begin_immediate(&conn).await?;
        let result = cascade_delete_form(&conn, id).await;
        match result {
            Ok(()) => {
                conn.execute("COMMIT", ()).await?;
                info!(form_id = %id, "deleted form and its dependents");
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute("ROLLBACK", ()).await;
                Err(e)
            }
        }
    }

    /// Adds a field to a form, failing with `DuplicateFieldName` when the
    /// form already has a field of that name. The conditional reference is
    /// stored as given; same-form scoping is the visibility evaluator's job.
    pub async fn add_field(&self, form_id: &str, spec: FieldSpec) -> Result<Field, StoreError> {
        let conn = self.connect()?;
        ensure_form_exists(&conn, form_id).await?;

        let mut rows = conn
            .query(
                "SELECT 1 FROM fields WHERE form_id = ? AND name = ? LIMIT 1",
                params![form_id.to_string(), spec.name.clone()],
            )
            .await?;
        if rows.next().await?.is_some() {
            return Err(StoreError::DuplicateFieldName(spec.name));
        }

        let id = Uuid::new_v4().to_string();
        conn.execute(
            "INSERT INTO fields (id, form_id, name, field_type, options, is_required, \
             field_order, is_conditional, conditional_field_id, conditional_operator, \
             conditional_value) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            vec![
                TursoValue::Text(id.clone()),
                TursoValue::Text(form_id.to_string()),
                TursoValue::Text(spec.name),
                TursoValue::Text(spec.field_type.as_str().to_string()),
                TursoValue::Text(serde_json::to_string(&spec.options)?),
                TursoValue::Integer(spec.is_required as i64),
                TursoValue::Integer(spec.order),
                TursoValue::Integer(spec.is_conditional as i64),
                opt_text(spec.conditional_field.as_deref()),
                opt_text(spec.conditional_operator.map(|op| op.as_str())),
                opt_text(spec.conditional_value.as_deref()),
            ],
        )
        .await?;

        self.get_field(&id).await
    }

    pub async fn get_field(&self, id: &str) -> Result<Field, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!("SELECT {FIELD_COLUMNS} FROM fields WHERE id = ?"),
                params![id.to_string()],
            )
            .await?;
        let row = rows
            .next()
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("field '{id}'")))?;
        Field::try_from(&row)
    }

    /// The ordered field list of one form.
    pub async fn list_fields(&self, form_id: &str) -> Result<Vec<Field>, StoreError> {
        let conn = self.connect()?;
        ensure_form_exists(&conn, form_id).await?;
        fields_for(&conn, form_id).await
    }

    /// Every field across all forms, grouped by form and canonically ordered.
    pub async fn list_all_fields(&self) -> Result<Vec<Field>, StoreError> {
        let conn = self.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "SELECT {FIELD_COLUMNS} FROM fields ORDER BY form_id, field_order ASC, name ASC"
                ),
                (),
            )
            .await?;
        let mut fields = Vec::new();
        while let Some(row) = rows.next().await? {
            fields.push(Field::try_from(&row)?);
        }
        Ok(fields)
    }

    /// Applies a partial field update. Renaming within the form checks the
    /// per-form uniqueness rule.
    pub async fn update_field(&self, id: &str, patch: FieldPatch) -> Result<Field, StoreError> {
        let conn = self.connect()?;
        let existing = self.get_field(id).await?;

        if let Some(name) = &patch.name {
            if *name != existing.name {
                let mut rows = conn
                    .query(
                        "SELECT 1 FROM fields WHERE form_id = ? AND name = ? LIMIT 1",
                        params![existing.form_id.clone(), name.clone()],
                    )
                    .await?;
                if rows.next().await?.is_some() {
                    return Err(StoreError::DuplicateFieldName(name.clone()));
                }
            }
        }

        let mut sets: Vec<String> = Vec::new();
        let mut bindings: Vec<TursoValue> = Vec::new();
        if let Some(name) = patch.name {
            sets.push("name = ?".to_string());
            bindings.push(TursoValue::Text(name));
        }
        if let Some(field_type) = patch.field_type {
            sets.push("field_type = ?".to_string());
            bindings.push(TursoValue::Text(field_type.as_str().to_string()));
        }
        if let Some(options) = patch.options {
            sets.push("options = ?".to_string());
            bindings.push(TursoValue::Text(serde_json::to_string(&options)?));
        }
        if let Some(is_required) = patch.is_required {
            sets.push("is_required = ?".to_string());
            bindings.push(TursoValue::Integer(is_required as i64));
        }
        if let Some(order) = patch.order {
            sets.push("field_order = ?".to_string());
            bindings.push(TursoValue::Integer(order));
        }
        if let Some(is_conditional) = patch.is_conditional {
            sets.push("is_conditional = ?".to_string());
            bindings.push(TursoValue::Integer(is_conditional as i64));
        }
        if let Some(conditional_field) = patch.conditional_field {
            sets.push("conditional_field_id = ?".to_string());
            bindings.push(opt_text(conditional_field.as_deref()));
        }
        if let Some(conditional_operator) = patch.conditional_operator {
            sets.push("conditional_operator = ?".to_string());
            bindings.push(opt_text(conditional_operator.map(|op| op.as_str())));
        }
        if let Some(conditional_value) = patch.conditional_value {
            sets.push("conditional_value = ?".to_string());
            bindings.push(opt_text(conditional_value.as_deref()));
        }

        if !sets.is_empty() {
            bindings.push(TursoValue::Text(id.to_string()));
            let sql = format!("UPDATE fields SET {} WHERE id = ?", sets.join(", "));
            conn.execute(&sql, bindings).await?;
        }

        self.get_field(id).await
    }

    /// Deletes a field and its documents in one transaction.
    pub async fn delete_field(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.connect()?;
        // NotFound before we touch anything.
        self.get_field(id).await?;

        super::begin_immediate(&conn).await?;
        let result = async {
            conn.execute(
                "DELETE FROM documents WHERE field_id = ?",
                params![id.to_string()],
            )
            .await?;
            conn.execute("DELETE FROM fields WHERE id = ?", params![id.to_string()])
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
}

async fn ensure_form_exists(conn: &Connection, form_id: &str) -> Result<(), StoreError> {
    let mut rows = conn
        .query(
            "SELECT 1 FROM forms WHERE id = ? LIMIT 1",
            params![form_id.to_string()],
        )
        .await?;
    if rows.next().await?.is_none() {
        return Err(StoreError::NotFound(format!("form '{form_id}'")));
    }
    Ok(())
}

/// Canonical per-form field ordering, applied on every read path.
pub(crate) async fn fields_for(
    conn: &Connection,
    form_id: &str,
) -> Result<Vec<Field>, StoreError> {
    let mut rows = conn
        .query(
            &format!(
                "SELECT {FIELD_COLUMNS} FROM fields WHERE form_id = ? \
                 ORDER BY field_order ASC, name ASC"
            ),
            params![form_id.to_string()],
        )
        .await?;
    let mut fields = Vec::new();
    while let Some(row) = rows.next().await? {
        fields.push(Field::try_from(&row)?);
    }
    Ok(fields)
}

async fn cascade_delete_form(conn: &Connection, form_id: &str) -> Result<(), StoreError> {
    conn.execute(
        "DELETE FROM documents WHERE submission_id IN \
         (SELECT id FROM submissions WHERE form_id = ?)",
        params![form_id.to_string()],
    )
    .await?;
    conn.execute(
        "DELETE FROM documents WHERE field_id IN (SELECT id FROM fields WHERE form_id = ?)",
        params![form_id.to_string()],
    )
    .await?;
    conn.execute(
        "DELETE FROM submissions WHERE form_id = ?",
        params![form_id.to_string()],
    )
    .await?;
    conn.execute(
        "DELETE FROM fields WHERE form_id = ?",
        params![form_id.to_string()],
    )
    .await?;
    conn.execute(
        "DELETE FROM forms WHERE id = ?",
        params![form_id.to_string()],
    )
    .await?;
    Ok(())
}
