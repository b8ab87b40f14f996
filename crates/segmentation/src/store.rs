//! In-memory segment store backed by DashMap.
//!
//! Implements the persistence contract for development and testing; production
//! talks to the remote segment service through the same trait.

use std::sync::Arc;

use anyhow::{anyhow, bail};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tracing::info;
use uuid::Uuid;

use crate::engine::LocalSegmentEvaluator;
use crate::service::{Segment, SegmentPayload, SegmentPersistenceService};

pub struct InMemorySegmentStore {
    segments: DashMap<String, Segment>,
    evaluator: Option<Arc<LocalSegmentEvaluator>>,
}

impl InMemorySegmentStore {
    pub fn new() -> Self {
        Self {
            segments: DashMap::new(),
            evaluator: None,
        }
    }

    /// Resolve `customer_count` on every write using a local evaluator.
    pub fn with_evaluator(evaluator: Arc<LocalSegmentEvaluator>) -> Self {
        Self {
            segments: DashMap::new(),
            evaluator: Some(evaluator),
        }
    }

    pub fn get(&self, id: &str) -> Option<Segment> {
        self.segments.get(id).map(|s| s.value().clone())
    }

    /// Newest first.
    pub fn list(&self) -> Vec<Segment> {
        let mut segments: Vec<Segment> = self.segments.iter().map(|s| s.value().clone()).collect();
        segments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        segments
    }

    pub fn delete(&self, id: &str) -> bool {
        self.segments.remove(id).is_some()
    }

    fn name_taken(&self, name: &str, except: Option<&str>) -> bool {
        self.segments.iter().any(|s| {
            s.value().name.eq_ignore_ascii_case(name) && Some(s.key().as_str()) != except
        })
    }

    fn count_for(&self, payload: &SegmentPayload) -> Option<u64> {
        self.evaluator
            .as_ref()
            .map(|e| e.count_matches(&payload.conditions))
    }
}

impl Default for InMemorySegmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SegmentPersistenceService for InMemorySegmentStore {
    async fn create(&self, payload: SegmentPayload) -> anyhow::Result<Segment> {
        if self.name_taken(&payload.name, None) {
            bail!("A segment named \"{}\" already exists", payload.name);
        }
        let now = Utc::now();
        let segment = Segment {
            id: Uuid::new_v4().to_string(),
            customer_count: self.count_for(&payload),
            name: payload.name,
            description: payload.description,
            tags: payload.tags,
            conditions: payload.conditions,
            created_at: now,
            updated_at: now,
        };
        self.segments.insert(segment.id.clone(), segment.clone());
        info!(segment_id = %segment.id, name = %segment.name, "Segment created");
        Ok(segment)
    }

    async fn update(&self, id: &str, payload: SegmentPayload) -> anyhow::Result<Segment> {
        if self.name_taken(&payload.name, Some(id)) {
            bail!("A segment named \"{}\" already exists", payload.name);
        }
        let customer_count = self.count_for(&payload);
        let mut entry = self
            .segments
            .get_mut(id)
            .ok_or_else(|| anyhow!("Segment {id} not found"))?;
        let segment = entry.value_mut();
        segment.name = payload.name;
        segment.description = payload.description;
        segment.tags = payload.tags;
        segment.conditions = payload.conditions;
        segment.customer_count = customer_count;
        segment.updated_at = Utc::now();
        info!(segment_id = %id, "Segment updated");
        Ok(segment.clone())
    }
}
