//! Segment editor: form state for creating or editing a segment.

use std::sync::Arc;

use campaign_core::config::SegmentConfig;
use campaign_core::{CampaignError, CampaignResult, ValidationError};
use tracing::{info, warn};

use crate::builder::SegmentExpressionBuilder;
use crate::catalog::FieldCatalog;
use crate::service::{Segment, SegmentEvaluationService, SegmentPayload, SegmentPersistenceService};

pub struct SegmentEditor {
    segment_id: Option<String>,
    pub name: String,
    pub description: String,
    tags: Vec<String>,
    max_tags: usize,
    builder: SegmentExpressionBuilder,
    error: Option<String>,
}

impl SegmentEditor {
    pub fn new(catalog: Arc<FieldCatalog>, config: &SegmentConfig) -> Self {
        Self {
            segment_id: None,
            name: String::new(),
            description: String::new(),
            tags: Vec::new(),
            max_tags: config.max_tags,
            builder: SegmentExpressionBuilder::new(catalog),
            error: None,
        }
    }

    /// Opens an existing segment; submitting updates it in place.
    pub fn edit(catalog: Arc<FieldCatalog>, config: &SegmentConfig, segment: &Segment) -> Self {
        Self {
            segment_id: Some(segment.id.clone()),
            name: segment.name.clone(),
            description: segment.description.clone(),
            tags: segment.tags.clone(),
            max_tags: config.max_tags,
            builder: SegmentExpressionBuilder::from_expression(catalog, segment.conditions.clone()),
            error: None,
        }
    }

    /// Loads a draft payload, e.g. one read from a file. Tags go through
    /// [`SegmentEditor::add_tag`], so the tag limit applies.
    pub fn from_payload(
        catalog: Arc<FieldCatalog>,
        config: &SegmentConfig,
        payload: SegmentPayload,
    ) -> Result<Self, ValidationError> {
        let mut editor = Self::new(Arc::clone(&catalog), config);
        editor.name = payload.name;
        editor.description = payload.description;
        editor.builder = SegmentExpressionBuilder::from_expression(catalog, payload.conditions);
        for tag in &payload.tags {
            editor.add_tag(tag)?;
        }
        Ok(editor)
    }

    pub fn segment_id(&self) -> Option<&str> {
        self.segment_id.as_deref()
    }

    pub fn is_editing(&self) -> bool {
        self.segment_id.is_some()
    }

    pub fn builder(&self) -> &SegmentExpressionBuilder {
        &self.builder
    }

    pub fn builder_mut(&mut self) -> &mut SegmentExpressionBuilder {
        &mut self.builder
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Commits a typed tag: trimmed, lower-cased, appended only if new.
    /// Returns whether the tag list changed.
    pub fn add_tag(&mut self, input: &str) -> Result<bool, ValidationError> {
        let tag = input.trim().to_lowercase();
        if tag.is_empty() || self.tags.contains(&tag) {
            return Ok(false);
        }
        if self.tags.len() >= self.max_tags {
            return Err(ValidationError::TooManyTags(self.max_tags));
        }
        self.tags.push(tag);
        Ok(true)
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    /// Inline error banner text, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn preview_count(&self) -> Option<u64> {
        self.builder.preview_count()
    }

    pub async fn preview(&mut self, evaluator: &dyn SegmentEvaluationService) -> Option<u64> {
        self.builder.preview(evaluator).await
    }

    /// Checks the submit preconditions and builds the payload.
    pub fn validate(&self) -> Result<SegmentPayload, ValidationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(ValidationError::MissingSegmentName);
        }
        let conditions = self.builder.expression();
        conditions.ensure_persistable()?;
        Ok(SegmentPayload {
            name: name.to_string(),
            description: self.description.trim().to_string(),
            tags: self.tags.clone(),
            conditions,
        })
    }

    /// Validates, then creates or updates the segment. On failure the form
    /// keeps its data and the message is kept for the inline banner.
    pub async fn submit(
        &mut self,
        store: &dyn SegmentPersistenceService,
    ) -> CampaignResult<Segment> {
        let payload = match self.validate() {
            Ok(payload) => payload,
            Err(e) => {
                self.error = Some(e.to_string());
                return Err(e.into());
            }
        };

        let result = match &self.segment_id {
            Some(id) => store.update(id, payload).await,
            None => store.create(payload).await,
        };

        match result {
            Ok(segment) => {
                info!(
                    segment_id = %segment.id,
                    groups = segment.conditions.len(),
                    tags = segment.tags.len(),
                    "Segment saved"
                );
                metrics::counter!("segments.persisted").increment(1);
                self.error = None;
                self.segment_id = Some(segment.id.clone());
                Ok(segment)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(error = %message, "Segment save failed");
                self.error = Some(message.clone());
                Err(CampaignError::Persistence(message))
            }
        }
    }
}
