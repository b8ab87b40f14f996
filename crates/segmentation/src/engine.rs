//! Local segmentation engine: evaluates expressions against in-memory customer profiles.
//!
//! Stands in for the remote evaluation service in development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::predicates::SegmentExpression;
use crate::service::{PreviewResult, SegmentEvaluationService};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: String,
    /// Attribute values keyed by catalog field key, or nested by path segment.
    pub attributes: HashMap<String, serde_json::Value>,
}

pub struct LocalSegmentEvaluator {
    customers: DashMap<String, CustomerProfile>,
}

impl LocalSegmentEvaluator {
    pub fn new() -> Self {
        Self {
            customers: DashMap::new(),
        }
    }

    pub fn with_customers(customers: impl IntoIterator<Item = CustomerProfile>) -> Self {
        let evaluator = Self::new();
        for customer in customers {
            evaluator.register_customer(customer);
        }
        evaluator
    }

    pub fn register_customer(&self, customer: CustomerProfile) {
        self.customers.insert(customer.customer_id.clone(), customer);
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    pub fn count_matches(&self, expression: &SegmentExpression) -> u64 {
        self.customers
            .iter()
            .filter(|c| expression.matches(&c.value().attributes))
            .count() as u64
    }

    pub fn matching_customers(&self, expression: &SegmentExpression) -> Vec<String> {
        let mut ids: Vec<String> = self
            .customers
            .iter()
            .filter(|c| expression.matches(&c.value().attributes))
            .map(|c| c.key().clone())
            .collect();
        ids.sort();
        ids
    }
}

impl Default for LocalSegmentEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SegmentEvaluationService for LocalSegmentEvaluator {
    async fn preview(&self, expression: &SegmentExpression) -> anyhow::Result<PreviewResult> {
        Ok(PreviewResult {
            count: self.count_matches(expression),
        })
    }
}
