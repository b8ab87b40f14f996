use thiserror::Error;

pub type CampaignResult<T> = Result<T, CampaignError>;

#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Carries the collaborator's message verbatim so it can be shown as-is.
    #[error("{0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CampaignError {
    /// The text an inline banner should display for this error.
    pub fn display_message(&self) -> String {
        match self {
            CampaignError::Validation(v) => v.to_string(),
            other => other.to_string(),
        }
    }
}

/// Local, synchronous validation failures. Raised before any remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Segment name is required")]
    MissingSegmentName,

    #[error("At least one condition is required")]
    MissingConditions,

    #[error("Condition group {0} has no conditions")]
    EmptyGroup(String),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Operator {operator} is not allowed for field {field}")]
    OperatorNotAllowed { field: String, operator: String },

    #[error("Value for field {field} does not match operator {operator}: {reason}")]
    ValueMismatch {
        field: String,
        operator: String,
        reason: String,
    },

    #[error("Invalid {expected} input: {input:?}")]
    InvalidInput { expected: String, input: String },

    #[error("Field catalog is invalid: {0}")]
    InvalidCatalog(String),

    #[error("Too many tags (limit {0})")]
    TooManyTags(usize),

    #[error("Campaign name is required")]
    MissingCampaignName,

    #[error("Campaign end date must not be before its start date")]
    InvalidSchedule,

    #[error("At least one segment must be selected")]
    NoSegmentsSelected,

    #[error("Control group percentage must be between {min} and {max}, got {actual}")]
    ControlGroupPercentage { min: u8, max: u8, actual: u8 },

    #[error("At least one offer must be selected")]
    NoOffersSelected,

    #[error("Every selected offer must be mapped to at least one segment")]
    IncompleteMapping,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages_are_user_facing() {
        assert_eq!(
            ValidationError::MissingSegmentName.to_string(),
            "Segment name is required"
        );
        assert_eq!(
            ValidationError::MissingConditions.to_string(),
            "At least one condition is required"
        );
    }

    #[test]
    fn test_display_message() {
        let err = CampaignError::from(ValidationError::MissingSegmentName);
        assert_eq!(err.display_message(), "Segment name is required");

        let err = CampaignError::Persistence("Segment name already exists".to_string());
        assert_eq!(err.display_message(), "Segment name already exists");
    }
}
