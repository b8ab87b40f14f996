//! Contracts for the two remote collaborators: segment evaluation (preview)
//! and segment persistence (create/update).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::predicates::SegmentExpression;

/// A persisted segment as returned by the persistence service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub conditions: SegmentExpression,
    #[serde(default)]
    pub customer_count: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Flat create/update payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPayload {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub conditions: SegmentExpression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResult {
    pub count: u64,
}

/// Estimates how many customers an expression matches.
#[async_trait]
pub trait SegmentEvaluationService: Send + Sync {
    async fn preview(&self, expression: &SegmentExpression) -> anyhow::Result<PreviewResult>;
}

/// Stores segments. Error messages are shown to the user verbatim.
#[async_trait]
pub trait SegmentPersistenceService: Send + Sync {
    async fn create(&self, payload: SegmentPayload) -> anyhow::Result<Segment>;
    async fn update(&self, id: &str, payload: SegmentPayload) -> anyhow::Result<Segment>;
}

/// Runs one preview call. Failures are logged and reported as `None`.
pub async fn preview_count(
    evaluator: &dyn SegmentEvaluationService,
    expression: &SegmentExpression,
) -> Option<u64> {
    metrics::counter!("segments.previews").increment(1);
    match evaluator.preview(expression).await {
        Ok(result) => {
            debug!(count = result.count, groups = expression.len(), "Segment preview");
            Some(result.count)
        }
        Err(e) => {
            warn!(error = %e, "Segment preview failed");
            metrics::counter!("segments.preview_failures").increment(1);
            None
        }
    }
}
