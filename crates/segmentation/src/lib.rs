//! Segment condition builder: field catalog, rule-group expressions, the
//! editing operations behind the segment modal, and the preview/persistence
//! contracts with a local evaluator and in-memory store.

pub mod builder;
pub mod catalog;
pub mod editor;
pub mod engine;
pub mod predicates;
pub mod service;
pub mod store;

pub use builder::{ConditionPatch, SegmentExpressionBuilder};
pub use catalog::{FieldCatalog, FieldDefinition, FieldType};
pub use editor::SegmentEditor;
pub use engine::{CustomerProfile, LocalSegmentEvaluator};
pub use predicates::{
    Condition, ConditionGroup, ConditionOperator, ConditionValue, LogicalOperator,
    SegmentExpression,
};
pub use service::{
    PreviewResult, Segment, SegmentEvaluationService, SegmentPayload, SegmentPersistenceService,
};
pub use store::InMemorySegmentStore;
