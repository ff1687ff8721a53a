//! Conditional visibility evaluator.
//!
//! A conditional field is active (visible and, if required, enforceable)
//! only when the answer given for its controlling field satisfies the
//! configured operator against the configured threshold. Both sides are
//! coerced to numbers when both parse as numbers, otherwise compared as
//! strings; ordering operators fail closed on non-numeric input.

use serde_json::Value;
use tracing::warn;

use crate::types::{AnswerMap, ConditionalOperator, Field};

/// Decides whether `field` is active for the given answer map.
///
/// `form_fields` must be the full field list of the field's form; it is used
/// to resolve the controlling field's name. A conditional field whose
/// controlling field cannot be resolved within the same form, or whose
/// operator/threshold configuration is incomplete, is treated as inactive.
pub fn is_field_active(field: &Field, form_fields: &[Field], answers: &AnswerMap) -> bool {
    if !field.is_conditional {
        return true;
    }

    let (Some(controller_id), Some(operator), Some(threshold)) = (
        field.conditional_field.as_deref(),
        field.conditional_operator,
        field.conditional_value.as_deref(),
    ) else {
        warn!(
            field = %field.name,
            "conditional field is missing its operator or threshold, treating as inactive"
        );
        return false;
    };

    // The controlling field must belong to the same form. The store does not
    // enforce that invariant, so a dangling or cross-form reference resolves
    // to nothing here and the field stays hidden.
    let Some(controller) = form_fields.iter().find(|f| f.id == controller_id) else {
        warn!(
            field = %field.name,
            controller_id,
            "conditional field references a field outside its form, treating as inactive"
        );
        return false;
    };

    // No answer for the controlling field means the field is hidden and
    // never required.
    let Some(answer) = answers.get(&controller.name) else {
        return false;
    };

    compare(operator, answer, threshold)
}

fn compare(operator: ConditionalOperator, answer: &Value, threshold: &str) -> bool {
    let answer = scalar_string(answer);
    let numeric = answer
        .trim()
        .parse::<f64>()
        .ok()
        .zip(threshold.trim().parse::<f64>().ok());

    match operator {
        ConditionalOperator::EqualTo => match numeric {
            Some((a, b)) => a == b,
            None => answer == threshold,
        },
        ConditionalOperator::NotEqualTo => match numeric {
            Some((a, b)) => a != b,
            None => answer != threshold,
        },
        // Ordering requires numbers on both sides; anything else is inactive.
        ConditionalOperator::GreaterThan => numeric.map(|(a, b)| a > b).unwrap_or(false),
        ConditionalOperator::LessThan => numeric.map(|(a, b)| a < b).unwrap_or(false),
    }
}

/// Flattens a JSON answer value to the string form used for comparison.
fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;
    use chrono::Utc;
    use serde_json::json;

    fn field(id: &str, name: &str) -> Field {
        Field {
            id: id.to_string(),
            form_id: "form-1".to_string(),
            name: name.to_string(),
            field_type: FieldType::Text,
            options: json!({}),
            is_required: false,
            order: 0,
            is_conditional: false,
            conditional_field: None,
            conditional_operator: None,
            conditional_value: None,
            created_at: Utc::now(),
        }
    }

    fn conditional(
        id: &str,
        name: &str,
        controller: &str,
        operator: ConditionalOperator,
        threshold: &str,
    ) -> Field {
        Field {
            is_conditional: true,
            conditional_field: Some(controller.to_string()),
            conditional_operator: Some(operator),
            conditional_value: Some(threshold.to_string()),
            ..field(id, name)
        }
    }

    fn answers(value: Value) -> AnswerMap {
        let mut map = AnswerMap::new();
        map.insert("income".to_string(), value);
        map
    }

    #[test]
    fn non_conditional_field_is_always_active() {
        let plain = field("f1", "income");
        assert!(is_field_active(&plain, &[plain.clone()], &AnswerMap::new()));
    }

    #[test]
    fn greater_than_threshold_activates_and_deactivates() {
        let income = field("f1", "income");
        let proof = conditional(
            "f2",
            "proof_of_income",
            "f1",
            ConditionalOperator::GreaterThan,
            "50000",
        );
        let fields = vec![income, proof.clone()];

        assert!(is_field_active(&proof, &fields, &answers(json!("60000"))));
        assert!(!is_field_active(&proof, &fields, &answers(json!("40000"))));
        // Numeric answers behave the same as their string form.
        assert!(is_field_active(&proof, &fields, &answers(json!(60000))));
    }

    #[test]
    fn missing_controlling_answer_means_inactive() {
        let income = field("f1", "income");
        let proof = conditional(
            "f2",
            "proof_of_income",
            "f1",
            ConditionalOperator::GreaterThan,
            "50000",
        );
        let fields = vec![income, proof.clone()];
        assert!(!is_field_active(&proof, &fields, &AnswerMap::new()));
    }

    #[test]
    fn equality_compares_numerically_when_both_sides_parse() {
        let income = field("f1", "income");
        let dependent = conditional(
            "f2",
            "extra",
            "f1",
            ConditionalOperator::EqualTo,
            "50000.0",
        );
        let fields = vec![income, dependent.clone()];
        assert!(is_field_active(
            &dependent,
            &fields,
            &answers(json!("50000"))
        ));
    }

    #[test]
    fn equality_falls_back_to_string_comparison() {
        let account = field("f1", "income");
        let dependent = conditional("f2", "extra", "f1", ConditionalOperator::EqualTo, "yes");
        let fields = vec![account, dependent.clone()];
        assert!(is_field_active(&dependent, &fields, &answers(json!("yes"))));
        assert!(!is_field_active(&dependent, &fields, &answers(json!("no"))));
    }

    #[test]
    fn not_equal_to_matches_value_inequality() {
        let account = field("f1", "income");
        let dependent = conditional("f2", "extra", "f1", ConditionalOperator::NotEqualTo, "none");
        let fields = vec![account, dependent.clone()];
        assert!(is_field_active(
            &dependent,
            &fields,
            &answers(json!("salary"))
        ));
        assert!(!is_field_active(
            &dependent,
            &fields,
            &answers(json!("none"))
        ));
    }

    #[test]
    fn ordering_fails_closed_on_non_numeric_input() {
        let income = field("f1", "income");
        let proof = conditional(
            "f2",
            "proof_of_income",
            "f1",
            ConditionalOperator::GreaterThan,
            "50000",
        );
        let fields = vec![income, proof.clone()];
        assert!(!is_field_active(
            &proof,
            &fields,
            &answers(json!("a lot of money"))
        ));

        let text_threshold = conditional(
            "f3",
            "other",
            "f1",
            ConditionalOperator::LessThan,
            "plenty",
        );
        assert!(!is_field_active(
            &text_threshold,
            &fields,
            &answers(json!("100"))
        ));
    }

    #[test]
    fn dangling_controller_reference_is_inactive() {
        let proof = conditional(
            "f2",
            "proof_of_income",
            "missing-field",
            ConditionalOperator::EqualTo,
            "x",
        );
        let fields = vec![proof.clone()];
        assert!(!is_field_active(&proof, &fields, &answers(json!("x"))));
    }

    #[test]
    fn incomplete_conditional_configuration_is_inactive() {
        let income = field("f1", "income");
        let mut broken = conditional(
            "f2",
            "proof_of_income",
            "f1",
            ConditionalOperator::EqualTo,
            "x",
        );
        broken.conditional_value = None;
        let fields = vec![income, broken.clone()];
        assert!(!is_field_active(&broken, &fields, &answers(json!("x"))));
    }
}
