//! Condition, group and expression types plus their validation and matching logic.

use std::collections::HashMap;

use campaign_core::types::new_id;
use campaign_core::ValidationError;
use serde::{Deserialize, Serialize};

use crate::catalog::{FieldCatalog, FieldDefinition, FieldType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    GreaterThan,
    LessThan,
    In,
    NotIn,
}

impl ConditionOperator {
    /// `in`/`not_in` take a list value; every other operator takes a scalar.
    pub fn takes_list(&self) -> bool {
        matches!(self, ConditionOperator::In | ConditionOperator::NotIn)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "not_equals",
            ConditionOperator::Contains => "contains",
            ConditionOperator::NotContains => "not_contains",
            ConditionOperator::GreaterThan => "greater_than",
            ConditionOperator::LessThan => "less_than",
            ConditionOperator::In => "in",
            ConditionOperator::NotIn => "not_in",
        }
    }
}

impl std::fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

/// Condition value. Serialized as a bare JSON scalar or array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConditionValue {
    Boolean(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl ConditionValue {
    /// Whether this scalar is of the kind a field of `field_type` compares against.
    pub fn fits_scalar(&self, field_type: FieldType) -> bool {
        matches!(
            (field_type, self),
            (FieldType::Number, ConditionValue::Number(_))
                | (FieldType::Boolean, ConditionValue::Boolean(_))
                | (FieldType::String, ConditionValue::Text(_))
                // array fields compare against a single element
                | (FieldType::Array, ConditionValue::Text(_))
        )
    }

    /// Value a condition takes after its field is (re)selected.
    pub fn reset_for(field_type: FieldType) -> Self {
        match field_type {
            FieldType::Number => ConditionValue::Number(0.0),
            _ => ConditionValue::Text(String::new()),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, ConditionValue::List(_))
    }

    /// Converts to the list shape used by `in`/`not_in`.
    pub fn into_list(self) -> Vec<String> {
        match self {
            ConditionValue::List(items) => items,
            ConditionValue::Text(text) => parse_list(&text),
            ConditionValue::Number(n) => vec![render_number(n)],
            ConditionValue::Boolean(b) => vec![b.to_string()],
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            ConditionValue::Boolean(_) => "boolean",
            ConditionValue::Number(_) => "number",
            ConditionValue::Text(_) => "string",
            ConditionValue::List(_) => "list",
        }
    }
}

/// Comma-separated free text to a trimmed list with empty entries dropped.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn render_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub id: String,
    pub field: String,
    pub operator: ConditionOperator,
    pub value: ConditionValue,
    #[serde(rename = "type")]
    pub value_type: FieldType,
}

impl Condition {
    /// A fresh condition on `field` with its default operator and reset value.
    pub fn for_field(field: &FieldDefinition) -> Self {
        Self {
            id: new_id(),
            field: field.key.clone(),
            operator: field.default_operator(),
            value: ConditionValue::reset_for(field.field_type),
            value_type: field.field_type,
        }
    }

    /// Full type check against the catalog.
    pub fn validate(&self, catalog: &FieldCatalog) -> Result<(), ValidationError> {
        let field = catalog
            .get(&self.field)
            .ok_or_else(|| ValidationError::UnknownField(self.field.clone()))?;

        if !field.allows(self.operator) {
            return Err(ValidationError::OperatorNotAllowed {
                field: self.field.clone(),
                operator: self.operator.to_string(),
            });
        }

        let mismatch = |reason: String| ValidationError::ValueMismatch {
            field: self.field.clone(),
            operator: self.operator.to_string(),
            reason,
        };

        if self.operator.takes_list() {
            return match &self.value {
                ConditionValue::List(items) if items.is_empty() => {
                    Err(mismatch("list must not be empty".to_string()))
                }
                ConditionValue::List(_) => Ok(()),
                other => Err(mismatch(format!("expected a list, got {}", other.kind()))),
            };
        }

        if self.value.fits_scalar(field.field_type) {
            Ok(())
        } else {
            Err(mismatch(format!(
                "expected a {} scalar, got {}",
                field.field_type.as_str(),
                self.value.kind()
            )))
        }
    }

    /// Whether a customer's attributes satisfy this condition.
    /// A missing attribute never matches.
    pub fn matches(&self, attributes: &HashMap<String, serde_json::Value>) -> bool {
        lookup(attributes, &self.field)
            .map(|actual| compare_values(actual, self.operator, &self.value))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub id: String,
    pub operator: LogicalOperator,
    pub conditions: Vec<Condition>,
}

impl ConditionGroup {
    pub fn seeded(catalog: &FieldCatalog) -> Self {
        Self {
            id: new_id(),
            operator: LogicalOperator::And,
            conditions: vec![Condition::for_field(catalog.default_field())],
        }
    }

    pub fn matches(&self, attributes: &HashMap<String, serde_json::Value>) -> bool {
        match self.operator {
            LogicalOperator::And => self.conditions.iter().all(|c| c.matches(attributes)),
            LogicalOperator::Or => self.conditions.iter().any(|c| c.matches(attributes)),
        }
    }
}

/// The full rule tree of a segment: groups combined with AND.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentExpression {
    pub groups: Vec<ConditionGroup>,
}

impl SegmentExpression {
    pub fn new(groups: Vec<ConditionGroup>) -> Self {
        Self { groups }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn condition_count(&self) -> usize {
        self.groups.iter().map(|g| g.conditions.len()).sum()
    }

    /// Non-empty, and no group without conditions.
    pub fn ensure_persistable(&self) -> Result<(), ValidationError> {
        if self.groups.is_empty() {
            return Err(ValidationError::MissingConditions);
        }
        if let Some(group) = self.groups.iter().find(|g| g.conditions.is_empty()) {
            return Err(ValidationError::EmptyGroup(group.id.clone()));
        }
        Ok(())
    }

    /// Persist-eligibility plus a type check of every condition.
    pub fn validate_against(&self, catalog: &FieldCatalog) -> Result<(), ValidationError> {
        self.ensure_persistable()?;
        self.groups
            .iter()
            .flat_map(|g| g.conditions.iter())
            .try_for_each(|c| c.validate(catalog))
    }

    /// An empty expression matches nobody.
    pub fn matches(&self, attributes: &HashMap<String, serde_json::Value>) -> bool {
        !self.groups.is_empty() && self.groups.iter().all(|g| g.matches(attributes))
    }
}

/// Resolves `key` directly, then as a dot path into nested objects.
fn lookup<'a>(
    attributes: &'a HashMap<String, serde_json::Value>,
    key: &str,
) -> Option<&'a serde_json::Value> {
    if let Some(value) = attributes.get(key) {
        return Some(value);
    }
    let mut parts = key.split('.');
    let mut current = attributes.get(parts.next()?)?;
    for part in parts {
        current = current.get(part)?;
    }
    Some(current)
}

pub fn compare_values(
    actual: &serde_json::Value,
    operator: ConditionOperator,
    expected: &ConditionValue,
) -> bool {
    if actual.is_null() {
        return false;
    }
    match operator {
        ConditionOperator::Equals => scalar_equals(actual, expected),
        ConditionOperator::NotEquals => !scalar_equals(actual, expected),
        ConditionOperator::GreaterThan => {
            numeric_cmp(actual, expected).is_some_and(|o| o == std::cmp::Ordering::Greater)
        }
        ConditionOperator::LessThan => {
            numeric_cmp(actual, expected).is_some_and(|o| o == std::cmp::Ordering::Less)
        }
        ConditionOperator::Contains => contains(actual, expected),
        ConditionOperator::NotContains => !contains(actual, expected),
        ConditionOperator::In => in_list(actual, expected),
        ConditionOperator::NotIn => !in_list(actual, expected),
    }
}

fn scalar_equals(actual: &serde_json::Value, expected: &ConditionValue) -> bool {
    match expected {
        ConditionValue::Number(n) => actual.as_f64() == Some(*n),
        ConditionValue::Boolean(b) => actual.as_bool() == Some(*b),
        ConditionValue::Text(s) => actual.as_str() == Some(s.as_str()),
        ConditionValue::List(items) => actual.as_array().is_some_and(|arr| {
            arr.len() == items.len()
                && arr
                    .iter()
                    .zip(items)
                    .all(|(a, e)| render_json(a).as_deref() == Some(e.as_str()))
        }),
    }
}

fn contains(actual: &serde_json::Value, expected: &ConditionValue) -> bool {
    let ConditionValue::Text(needle) = expected else {
        return false;
    };
    match actual {
        serde_json::Value::String(s) => s.contains(needle.as_str()),
        serde_json::Value::Array(items) => {
            items.iter().any(|i| i.as_str() == Some(needle.as_str()))
        }
        _ => false,
    }
}

fn in_list(actual: &serde_json::Value, expected: &ConditionValue) -> bool {
    let ConditionValue::List(list) = expected else {
        return false;
    };
    let member =
        |v: &serde_json::Value| render_json(v).is_some_and(|s| list.iter().any(|e| e == &s));
    match actual {
        serde_json::Value::Array(items) => items.iter().any(member),
        other => member(other),
    }
}

fn numeric_cmp(a: &serde_json::Value, b: &ConditionValue) -> Option<std::cmp::Ordering> {
    let a_num = a.as_f64()?;
    let ConditionValue::Number(b_num) = b else {
        return None;
    };
    a_num.partial_cmp(b_num)
}

fn render_json(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => n.as_f64().map(render_number),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(value: serde_json::Value) -> HashMap<String, serde_json::Value> {
        serde_json::from_value(value).unwrap()
    }

    fn condition(field: &str, operator: ConditionOperator, value: ConditionValue) -> Condition {
        let value_type = match &value {
            ConditionValue::List(_) => FieldType::Array,
            ConditionValue::Number(_) => FieldType::Number,
            ConditionValue::Boolean(_) => FieldType::Boolean,
            ConditionValue::Text(_) => FieldType::String,
        };
        Condition {
            id: new_id(),
            field: field.to_string(),
            operator,
            value,
            value_type,
        }
    }

    #[test]
    fn test_parse_list_trims_and_filters() {
        assert_eq!(parse_list("a, b ,c"), vec!["a", "b", "c"]);
        assert_eq!(parse_list(" , x,, "), vec!["x"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_value_serializes_flat() {
        let c = condition(
            "customer_profile.city",
            ConditionOperator::In,
            ConditionValue::List(vec!["Austin".into(), "Boston".into()]),
        );
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["value"], json!(["Austin", "Boston"]));
        assert_eq!(json["type"], json!("array"));
        assert_eq!(json["operator"], json!("in"));

        let back: Condition = serde_json::from_value(json).unwrap();
        assert_eq!(back, c);
    }

    #[test]
    fn test_group_operator_wire_name() {
        assert_eq!(serde_json::to_string(&LogicalOperator::Or).unwrap(), "\"OR\"");
    }

    #[test]
    fn test_validate_operator_not_allowed() {
        let catalog = FieldCatalog::standard();
        let c = condition(
            "customer_profile.email_opt_in",
            ConditionOperator::GreaterThan,
            ConditionValue::Number(1.0),
        );
        assert!(matches!(
            c.validate(&catalog),
            Err(ValidationError::OperatorNotAllowed { .. })
        ));
    }

    #[test]
    fn test_validate_value_shape() {
        let catalog = FieldCatalog::standard();

        let scalar_for_in = condition(
            "customer_profile.city",
            ConditionOperator::In,
            ConditionValue::Text("Austin".into()),
        );
        assert!(matches!(
            scalar_for_in.validate(&catalog),
            Err(ValidationError::ValueMismatch { .. })
        ));

        let text_for_number = condition(
            "customer_profile.age",
            ConditionOperator::GreaterThan,
            ConditionValue::Text("30".into()),
        );
        assert!(text_for_number.validate(&catalog).is_err());

        let ok = condition(
            "customer_profile.age",
            ConditionOperator::GreaterThan,
            ConditionValue::Number(30.0),
        );
        assert!(ok.validate(&catalog).is_ok());
    }

    #[test]
    fn test_validate_unknown_field() {
        let catalog = FieldCatalog::standard();
        let c = condition("nope", ConditionOperator::Equals, ConditionValue::Text("x".into()));
        assert_eq!(
            c.validate(&catalog),
            Err(ValidationError::UnknownField("nope".to_string()))
        );
    }

    #[test]
    fn test_ensure_persistable() {
        let empty = SegmentExpression::default();
        assert_eq!(
            empty.ensure_persistable(),
            Err(ValidationError::MissingConditions)
        );

        let catalog = FieldCatalog::standard();
        let mut group = ConditionGroup::seeded(&catalog);
        group.conditions.clear();
        let id = group.id.clone();
        let expr = SegmentExpression::new(vec![group]);
        assert_eq!(expr.ensure_persistable(), Err(ValidationError::EmptyGroup(id)));

        let expr = SegmentExpression::new(vec![ConditionGroup::seeded(&catalog)]);
        assert!(expr.ensure_persistable().is_ok());
        assert!(expr.validate_against(&catalog).is_ok());
    }

    #[test]
    fn test_matching_operators() {
        let customer = attrs(json!({
            "customer_profile.age": 34,
            "customer_profile.city": "San Francisco",
            "customer_profile.interests": ["running", "travel"],
            "customer_profile.email_opt_in": true
        }));

        use ConditionOperator::*;
        let num = ConditionValue::Number;
        let text = |s: &str| ConditionValue::Text(s.to_string());
        let list = |items: &[&str]| {
            ConditionValue::List(items.iter().map(|i| i.to_string()).collect())
        };

        let cases = vec![
            ("customer_profile.age", GreaterThan, num(30.0), true),
            ("customer_profile.age", LessThan, num(30.0), false),
            ("customer_profile.age", Equals, num(34.0), true),
            ("customer_profile.city", Contains, text("Francisco"), true),
            ("customer_profile.city", NotContains, text("Francisco"), false),
            ("customer_profile.interests", Contains, text("travel"), true),
            ("customer_profile.age", In, list(&["34", "35"]), true),
            ("customer_profile.interests", NotIn, list(&["golf"]), true),
            ("customer_profile.email_opt_in", Equals, ConditionValue::Boolean(true), true),
            ("customer_profile.gender", NotEquals, text("f"), false),
        ];

        for (field, operator, value, expected) in cases {
            let c = condition(field, operator, value);
            assert_eq!(c.matches(&customer), expected, "{field} {operator}");
        }
    }

    #[test]
    fn test_nested_lookup() {
        let customer = attrs(json!({ "customer_profile": { "age": 41 } }));
        let c = condition(
            "customer_profile.age",
            ConditionOperator::GreaterThan,
            ConditionValue::Number(40.0),
        );
        assert!(c.matches(&customer));
    }

    #[test]
    fn test_groups_combine_with_and() {
        let catalog = FieldCatalog::standard();
        let customer = attrs(json!({ "customer_profile.age": 25, "transaction.total_spend": 50 }));

        let mut young = ConditionGroup::seeded(&catalog);
        young.conditions = vec![condition(
            "customer_profile.age",
            ConditionOperator::LessThan,
            ConditionValue::Number(30.0),
        )];

        let mut spenders = ConditionGroup::seeded(&catalog);
        spenders.operator = LogicalOperator::Or;
        spenders.conditions = vec![
            condition(
                "transaction.total_spend",
                ConditionOperator::GreaterThan,
                ConditionValue::Number(100.0),
            ),
            condition(
                "transaction.total_spend",
                ConditionOperator::Equals,
                ConditionValue::Number(50.0),
            ),
        ];

        let expr = SegmentExpression::new(vec![young.clone(), spenders.clone()]);
        assert!(expr.matches(&customer));

        spenders.conditions.pop();
        let expr = SegmentExpression::new(vec![young, spenders]);
        assert!(!expr.matches(&customer));

        assert!(!SegmentExpression::default().matches(&customer));
    }
}
