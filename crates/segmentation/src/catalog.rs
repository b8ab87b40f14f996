//! Field catalog: the fixed set of customer attributes a condition may target.

use campaign_core::ValidationError;
use serde::{Deserialize, Serialize};

use crate::predicates::ConditionOperator;

/// Declared type of a catalog field (and of a condition's value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Array,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Array => "array",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub key: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Allowed operators; the first one is the default for new conditions.
    pub operators: Vec<ConditionOperator>,
}

impl FieldDefinition {
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        field_type: FieldType,
        operators: Vec<ConditionOperator>,
    ) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            field_type,
            operators,
        }
    }

    pub fn default_operator(&self) -> ConditionOperator {
        self.operators
            .first()
            .copied()
            .unwrap_or(ConditionOperator::Equals)
    }

    pub fn allows(&self, operator: ConditionOperator) -> bool {
        self.operators.contains(&operator)
    }
}

/// Ordered, non-empty catalog. The first field seeds every new condition.
#[derive(Debug, Clone, Serialize)]
pub struct FieldCatalog {
    fields: Vec<FieldDefinition>,
}

impl FieldCatalog {
    pub fn new(fields: Vec<FieldDefinition>) -> Result<Self, ValidationError> {
        if fields.is_empty() {
            return Err(ValidationError::InvalidCatalog(
                "catalog must contain at least one field".to_string(),
            ));
        }
        for (i, field) in fields.iter().enumerate() {
            if field.operators.is_empty() {
                return Err(ValidationError::InvalidCatalog(format!(
                    "field {} has no operators",
                    field.key
                )));
            }
            if fields[..i].iter().any(|f| f.key == field.key) {
                return Err(ValidationError::InvalidCatalog(format!(
                    "duplicate field {}",
                    field.key
                )));
            }
        }
        Ok(Self { fields })
    }

    /// Customer profile, transaction and engagement attributes offered by the console.
    pub fn standard() -> Self {
        use ConditionOperator::*;

        let numeric = vec![GreaterThan, LessThan, Equals, NotEquals, In, NotIn];
        let categorical = vec![Equals, NotEquals, In, NotIn];
        let text = vec![Equals, NotEquals, Contains, NotContains, In, NotIn];
        let flag = vec![Equals, NotEquals];

        Self {
            fields: vec![
                FieldDefinition::new(
                    "customer_profile.age",
                    "Age",
                    FieldType::Number,
                    numeric.clone(),
                ),
                FieldDefinition::new(
                    "customer_profile.gender",
                    "Gender",
                    FieldType::String,
                    categorical.clone(),
                ),
                FieldDefinition::new(
                    "customer_profile.city",
                    "City",
                    FieldType::String,
                    text.clone(),
                ),
                FieldDefinition::new(
                    "customer_profile.loyalty_tier",
                    "Loyalty Tier",
                    FieldType::String,
                    categorical,
                ),
                FieldDefinition::new(
                    "customer_profile.email_opt_in",
                    "Email Opt-in",
                    FieldType::Boolean,
                    flag.clone(),
                ),
                FieldDefinition::new(
                    "customer_profile.interests",
                    "Interests",
                    FieldType::Array,
                    vec![Contains, NotContains, In, NotIn],
                ),
                FieldDefinition::new(
                    "transaction.total_spend",
                    "Total Spend",
                    FieldType::Number,
                    numeric.clone(),
                ),
                FieldDefinition::new(
                    "transaction.order_count",
                    "Order Count",
                    FieldType::Number,
                    numeric.clone(),
                ),
                FieldDefinition::new(
                    "transaction.days_since_last_purchase",
                    "Days Since Last Purchase",
                    FieldType::Number,
                    numeric,
                ),
                FieldDefinition::new(
                    "engagement.last_channel",
                    "Last Engaged Channel",
                    FieldType::String,
                    text,
                ),
                FieldDefinition::new(
                    "engagement.app_active",
                    "Active App User",
                    FieldType::Boolean,
                    flag,
                ),
            ],
        }
    }

    pub fn default_field(&self) -> &FieldDefinition {
        &self.fields[0]
    }

    pub fn get(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl<'de> Deserialize<'de> for FieldCatalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let fields = Vec::<FieldDefinition>::deserialize(deserializer)?;
        FieldCatalog::new(fields).map_err(serde::de::Error::custom)
    }
}
