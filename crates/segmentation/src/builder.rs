//! Segment expression builder: the editing operations behind the condition editor.
//!
//! Every condition stays well-typed for its field: switching a field resets the
//! operator and value, and switching to `in`/`not_in` turns the value into a list.

use std::sync::Arc;

use campaign_core::ValidationError;
use tracing::debug;

use crate::catalog::{FieldCatalog, FieldType};
use crate::predicates::{
    parse_list, Condition, ConditionGroup, ConditionOperator, ConditionValue, LogicalOperator,
    SegmentExpression,
};
use crate::service::{preview_count, SegmentEvaluationService};

/// Partial update for a single condition.
#[derive(Debug, Clone, Default)]
pub struct ConditionPatch {
    pub field: Option<String>,
    pub operator: Option<ConditionOperator>,
    pub value: Option<ConditionValue>,
}

impl ConditionPatch {
    pub fn field(key: impl Into<String>) -> Self {
        Self {
            field: Some(key.into()),
            ..Default::default()
        }
    }

    pub fn operator(operator: ConditionOperator) -> Self {
        Self {
            operator: Some(operator),
            ..Default::default()
        }
    }

    pub fn value(value: ConditionValue) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }
}

pub struct SegmentExpressionBuilder {
    catalog: Arc<FieldCatalog>,
    groups: Vec<ConditionGroup>,
    preview_count: Option<u64>,
}

impl SegmentExpressionBuilder {
    pub fn new(catalog: Arc<FieldCatalog>) -> Self {
        Self {
            catalog,
            groups: Vec::new(),
            preview_count: None,
        }
    }

    /// Start from an existing expression, e.g. when editing a saved segment.
    pub fn from_expression(catalog: Arc<FieldCatalog>, expression: SegmentExpression) -> Self {
        Self {
            catalog,
            groups: expression.groups,
            preview_count: None,
        }
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    pub fn groups(&self) -> &[ConditionGroup] {
        &self.groups
    }

    pub fn group(&self, group_id: &str) -> Option<&ConditionGroup> {
        self.groups.iter().find(|g| g.id == group_id)
    }

    pub fn expression(&self) -> SegmentExpression {
        SegmentExpression::new(self.groups.clone())
    }

    pub fn into_expression(self) -> SegmentExpression {
        SegmentExpression::new(self.groups)
    }

    /// Appends a group seeded with one default condition and returns its id.
    pub fn add_group(&mut self) -> String {
        let group = ConditionGroup::seeded(&self.catalog);
        let id = group.id.clone();
        debug!(group_id = %id, "Condition group added");
        self.groups.push(group);
        id
    }

    /// Removes the group. The expression may become empty.
    pub fn remove_group(&mut self, group_id: &str) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| g.id != group_id);
        self.groups.len() != before
    }

    /// Appends a default condition to the group and returns its id.
    pub fn add_condition(&mut self, group_id: &str) -> Option<String> {
        let condition = Condition::for_field(self.catalog.default_field());
        let id = condition.id.clone();
        let group = self.group_mut(group_id)?;
        group.conditions.push(condition);
        Some(id)
    }

    /// Removes a condition unless it is the last one in its group.
    /// Returns whether anything was removed.
    pub fn remove_condition(&mut self, group_id: &str, condition_id: &str) -> bool {
        let Some(group) = self.group_mut(group_id) else {
            return false;
        };
        if group.conditions.len() <= 1 {
            return false;
        }
        let before = group.conditions.len();
        group.conditions.retain(|c| c.id != condition_id);
        group.conditions.len() != before
    }

    pub fn can_remove_condition(&self, group_id: &str) -> bool {
        self.group(group_id)
            .map(|g| g.conditions.len() > 1)
            .unwrap_or(false)
    }

    /// Applies a partial update. Returns `Ok(false)` if the ids are unknown.
    pub fn update_condition(
        &mut self,
        group_id: &str,
        condition_id: &str,
        patch: ConditionPatch,
    ) -> Result<bool, ValidationError> {
        let catalog = Arc::clone(&self.catalog);
        let Some(condition) = self.condition_mut(group_id, condition_id) else {
            return Ok(false);
        };

        let mut next = condition.clone();

        if let Some(field_key) = patch.field {
            if field_key != next.field {
                let field = catalog
                    .get(&field_key)
                    .ok_or_else(|| ValidationError::UnknownField(field_key.clone()))?;
                next = Condition {
                    id: next.id,
                    ..Condition::for_field(field)
                };
            }
        }

        if let Some(operator) = patch.operator {
            let field = catalog
                .get(&next.field)
                .ok_or_else(|| ValidationError::UnknownField(next.field.clone()))?;
            if !field.allows(operator) {
                return Err(ValidationError::OperatorNotAllowed {
                    field: next.field.clone(),
                    operator: operator.to_string(),
                });
            }
            if operator.takes_list() && !next.operator.takes_list() {
                let value = std::mem::replace(&mut next.value, ConditionValue::List(Vec::new()));
                next.value = ConditionValue::List(value.into_list());
                next.value_type = FieldType::Array;
            }
            // leaving in/not_in keeps the list as-is
            next.operator = operator;
        }

        if let Some(value) = patch.value {
            if next.operator.takes_list() != value.is_list() {
                return Err(ValidationError::ValueMismatch {
                    field: next.field.clone(),
                    operator: next.operator.to_string(),
                    reason: if value.is_list() {
                        "operator takes a scalar".to_string()
                    } else {
                        "operator takes a list".to_string()
                    },
                });
            }
            if value.is_list() {
                next.value_type = FieldType::Array;
            } else {
                let field = catalog
                    .get(&next.field)
                    .ok_or_else(|| ValidationError::UnknownField(next.field.clone()))?;
                if !value.fits_scalar(field.field_type) {
                    return Err(ValidationError::ValueMismatch {
                        field: next.field.clone(),
                        operator: next.operator.to_string(),
                        reason: format!(
                            "expected a {} scalar, got {}",
                            field.field_type.as_str(),
                            value.kind()
                        ),
                    });
                }
                next.value_type = field.field_type;
            }
            next.value = value;
        }

        debug!(
            condition_id = %next.id,
            field = %next.field,
            operator = %next.operator,
            "Condition updated"
        );
        *condition = next;
        Ok(true)
    }

    /// Interprets raw text typed into a condition's value input.
    pub fn set_value_input(
        &mut self,
        group_id: &str,
        condition_id: &str,
        raw: &str,
    ) -> Result<bool, ValidationError> {
        let catalog = Arc::clone(&self.catalog);
        let Some(condition) = self.condition_mut(group_id, condition_id) else {
            return Ok(false);
        };

        if condition.operator.takes_list() {
            condition.value = ConditionValue::List(parse_list(raw));
            condition.value_type = FieldType::Array;
            return Ok(true);
        }

        let field_type = catalog
            .get(&condition.field)
            .map(|f| f.field_type)
            .ok_or_else(|| ValidationError::UnknownField(condition.field.clone()))?;

        let invalid = |expected: &str| ValidationError::InvalidInput {
            expected: expected.to_string(),
            input: raw.to_string(),
        };

        condition.value = match field_type {
            FieldType::Number => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    ConditionValue::Number(0.0)
                } else {
                    trimmed
                        .parse::<f64>()
                        .ok()
                        .filter(|n| n.is_finite())
                        .map(ConditionValue::Number)
                        .ok_or_else(|| invalid("number"))?
                }
            }
            FieldType::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => ConditionValue::Boolean(true),
                "false" => ConditionValue::Boolean(false),
                _ => return Err(invalid("boolean")),
            },
            FieldType::String | FieldType::Array => ConditionValue::Text(raw.to_string()),
        };
        condition.value_type = field_type;
        Ok(true)
    }

    pub fn update_group_operator(&mut self, group_id: &str, operator: LogicalOperator) -> bool {
        match self.group_mut(group_id) {
            Some(group) => {
                group.operator = operator;
                true
            }
            None => false,
        }
    }

    pub fn can_preview(&self) -> bool {
        !self.groups.is_empty()
    }

    pub fn preview_count(&self) -> Option<u64> {
        self.preview_count
    }

    /// Asks the evaluator for the matching customer count.
    /// Not invoked for an empty expression; a failed call records `None`.
    pub async fn preview(&mut self, evaluator: &dyn SegmentEvaluationService) -> Option<u64> {
        if !self.can_preview() {
            return None;
        }
        let expression = self.expression();
        self.preview_count = preview_count(evaluator, &expression).await;
        self.preview_count
    }

    fn group_mut(&mut self, group_id: &str) -> Option<&mut ConditionGroup> {
        self.groups.iter_mut().find(|g| g.id == group_id)
    }

    fn condition_mut(&mut self, group_id: &str, condition_id: &str) -> Option<&mut Condition> {
        self.group_mut(group_id)?
            .conditions
            .iter_mut()
            .find(|c| c.id == condition_id)
    }
}
