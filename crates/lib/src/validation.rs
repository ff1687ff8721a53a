//! Answer-map validation against a form's field definitions.
//!
//! The set of fields is only known at runtime per form, so `options` is
//! persisted as an open JSON document and read back here through
//! [`FieldOptions`], a per-type tagged view (schema-on-read). Validation
//! always accumulates the complete error set, keyed by field name.

use serde_json::Value;

use crate::conditional::is_field_active;
use crate::errors::ValidationErrors;
use crate::types::{AnswerMap, Field, FieldType};

/// Type-specific constraints read out of a field's open `options` document.
/// Unknown or malformed option keys are ignored rather than rejected; the
/// store never schema-validates what admins put in there.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOptions {
    Text { max_length: Option<u64> },
    Number { min: Option<f64>, max: Option<f64> },
    Date,
    Dropdown { choices: Vec<String> },
    Checkbox,
    File,
}

impl FieldOptions {
    pub fn read(field_type: FieldType, options: &Value) -> Self {
        match field_type {
            FieldType::Text => FieldOptions::Text {
                max_length: options.get("max_length").and_then(Value::as_u64),
            },
            FieldType::Number => FieldOptions::Number {
                min: number_option(options, "min"),
                max: number_option(options, "max"),
            },
            FieldType::Date => FieldOptions::Date,
            // Choices may be stored either as a bare array or under a
            // "choices" key; admin tooling has produced both shapes.
            FieldType::Dropdown => {
                let raw = match options {
                    Value::Array(items) => Some(items),
                    _ => options.get("choices").and_then(Value::as_array),
                };
                FieldOptions::Dropdown {
                    choices: raw
                        .map(|items| {
                            items
                                .iter()
                                .filter_map(|v| v.as_str().map(str::to_string))
                                .collect()
                        })
                        .unwrap_or_default(),
                }
            }
            FieldType::Checkbox => FieldOptions::Checkbox,
            FieldType::File => FieldOptions::File,
        }
    }
}

fn number_option(options: &Value, key: &str) -> Option<f64> {
    match options.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Validates an answer map against a form's fields, returning every error
/// found. An empty result means the submission may proceed.
///
/// A required field only counts as missing when it is active for this answer
/// map; hidden conditional fields are never enforced. Values supplied for
/// inactive fields are ignored entirely. File fields are satisfied by
/// uploaded documents, not by inline answers, so they are only checked for
/// presence.
pub fn validate_answers(fields: &[Field], answers: &AnswerMap) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    for field in fields {
        if !is_field_active(field, fields, answers) {
            continue;
        }

        let answer = answers.get(&field.name).filter(|v| !v.is_null());
        let Some(value) = answer else {
            if field.is_required && field.field_type != FieldType::File {
                errors.add(&field.name, "This field is required.");
            }
            continue;
        };

        let options = FieldOptions::read(field.field_type, &field.options);
        for message in check_value(&options, value) {
            errors.add(&field.name, message);
        }
    }

    errors
}

fn check_value(options: &FieldOptions, value: &Value) -> Vec<String> {
    let mut messages = Vec::new();
    match options {
        FieldOptions::Text { max_length } => {
            let Some(text) = value.as_str() else {
                messages.push("Enter a valid string.".to_string());
                return messages;
            };
            if let Some(max) = max_length {
                if text.chars().count() as u64 > *max {
                    messages.push(format!(
                        "Ensure this value has at most {max} characters."
                    ));
                }
            }
        }
        FieldOptions::Number { min, max } => {
            let Some(number) = numeric_value(value) else {
                messages.push("Enter a number.".to_string());
                return messages;
            };
            if let Some(min) = min {
                if number < *min {
                    messages.push(format!("Ensure this value is at least {min}."));
                }
            }
            if let Some(max) = max {
                if number > *max {
                    messages.push(format!("Ensure this value is at most {max}."));
                }
            }
        }
        FieldOptions::Date => {
            let parsed = value
                .as_str()
                .and_then(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
            if parsed.is_none() {
                messages.push("Enter a valid date in YYYY-MM-DD format.".to_string());
            }
        }
        FieldOptions::Dropdown { choices } => {
            // An empty choice list means the admin gave no constraint.
            if !choices.is_empty() {
                let selected = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                if !choices.contains(&selected) {
                    messages.push(format!("'{selected}' is not a valid choice."));
                }
            }
        }
        FieldOptions::Checkbox => {
            let valid = match value {
                Value::Bool(_) => true,
                Value::String(s) => matches!(s.as_str(), "true" | "false"),
                _ => false,
            };
            if !valid {
                messages.push("Enter a valid boolean.".to_string());
            }
        }
        FieldOptions::File => {}
    }
    messages
}

fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConditionalOperator;
    use chrono::Utc;
    use serde_json::json;

    fn field(name: &str, field_type: FieldType, required: bool, options: Value) -> Field {
        Field {
            id: format!("id-{name}"),
            form_id: "form-1".to_string(),
            name: name.to_string(),
            field_type,
            options,
            is_required: required,
            order: 0,
            is_conditional: false,
            conditional_field: None,
            conditional_operator: None,
            conditional_value: None,
            created_at: Utc::now(),
        }
    }

    fn map(entries: &[(&str, Value)]) -> AnswerMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn missing_required_fields_are_all_reported() {
        let fields = vec![
            field("full_name", FieldType::Text, true, json!({})),
            field("income", FieldType::Number, true, json!({})),
            field("notes", FieldType::Text, false, json!({})),
        ];
        let errors = validate_answers(&fields, &AnswerMap::new());
        assert!(errors.contains("full_name"));
        assert!(errors.contains("income"));
        assert!(!errors.contains("notes"));
    }

    #[test]
    fn null_answers_count_as_missing() {
        let fields = vec![field("full_name", FieldType::Text, true, json!({}))];
        let errors = validate_answers(&fields, &map(&[("full_name", Value::Null)]));
        assert!(errors.contains("full_name"));
    }

    #[test]
    fn number_bounds_come_from_the_options_document() {
        let fields = vec![field(
            "loan_amount",
            FieldType::Number,
            true,
            json!({"min": 1000, "max": 100000}),
        )];

        let ok = validate_answers(&fields, &map(&[("loan_amount", json!(50000))]));
        assert!(ok.is_empty());

        let low = validate_answers(&fields, &map(&[("loan_amount", json!("500"))]));
        assert!(low.contains("loan_amount"));

        let not_a_number = validate_answers(&fields, &map(&[("loan_amount", json!("soon"))]));
        assert_eq!(
            not_a_number.messages("loan_amount").unwrap(),
            ["Enter a number."]
        );
    }

    #[test]
    fn dropdown_choices_accept_both_stored_shapes() {
        let bare = field(
            "account_type",
            FieldType::Dropdown,
            true,
            json!(["savings", "current"]),
        );
        let keyed = field(
            "account_type",
            FieldType::Dropdown,
            true,
            json!({"choices": ["savings", "current"]}),
        );

        for f in [bare, keyed] {
            let fields = vec![f];
            assert!(
                validate_answers(&fields, &map(&[("account_type", json!("savings"))])).is_empty()
            );
            let bad = validate_answers(&fields, &map(&[("account_type", json!("offshore"))]));
            assert!(bad.contains("account_type"));
        }
    }

    #[test]
    fn checkbox_and_date_values_are_shape_checked() {
        let fields = vec![
            field("agreed", FieldType::Checkbox, true, json!({})),
            field("start_date", FieldType::Date, true, json!({})),
        ];
        let good = validate_answers(
            &fields,
            &map(&[("agreed", json!(true)), ("start_date", json!("2024-02-29"))]),
        );
        assert!(good.is_empty());

        let bad = validate_answers(
            &fields,
            &map(&[("agreed", json!("maybe")), ("start_date", json!("Feb 29"))]),
        );
        assert!(bad.contains("agreed"));
        assert!(bad.contains("start_date"));
    }

    #[test]
    fn required_file_fields_are_not_enforced_against_the_answer_map() {
        let fields = vec![field("payslip", FieldType::File, true, json!({}))];
        assert!(validate_answers(&fields, &AnswerMap::new()).is_empty());
    }

    #[test]
    fn inactive_conditional_required_field_is_not_missing() {
        let income = field("income", FieldType::Number, true, json!({}));
        let mut proof = field("proof_of_income", FieldType::Text, true, json!({}));
        proof.is_conditional = true;
        proof.conditional_field = Some(income.id.clone());
        proof.conditional_operator = Some(ConditionalOperator::GreaterThan);
        proof.conditional_value = Some("50000".to_string());
        let fields = vec![income, proof];

        // Below the threshold the conditional field is hidden.
        let below = validate_answers(&fields, &map(&[("income", json!("40000"))]));
        assert!(below.is_empty());

        // Above it, its absence is an error.
        let above = validate_answers(&fields, &map(&[("income", json!("60000"))]));
        assert_eq!(
            above.messages("proof_of_income").unwrap(),
            ["This field is required."]
        );
    }

    #[test]
    fn text_max_length_is_enforced() {
        let fields = vec![field(
            "company_name",
            FieldType::Text,
            false,
            json!({"max_length": 5}),
        )];
        let errors = validate_answers(&fields, &map(&[("company_name", json!("Acme Holdings"))]));
        assert!(errors.contains("company_name"));
    }
}
