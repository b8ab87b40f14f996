//! Audience arithmetic for the campaign wizard.
//!
//! Sizes are summed over the selection as-is. Customers that belong to several
//! selected segments are counted once per segment; when more than one segment
//! is selected the wizard only warns that the totals may overlap.

use serde::{Deserialize, Serialize};

use crate::models::{CampaignSegment, ControlGroup};

pub const OVERLAP_WARNING: &str =
    "Multiple segments selected: customers in more than one segment may be counted more than once.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudienceSummary {
    pub total_audience_size: u64,
    pub control_group_size: u64,
    pub target_group_size: u64,
    pub segment_count: usize,
    pub overlap_warning: bool,
}

/// Derives audience sizes from the current selection. Nothing is cached.
pub struct AudienceCalculator<'a> {
    segments: &'a [CampaignSegment],
    control_group: &'a ControlGroup,
}

impl<'a> AudienceCalculator<'a> {
    pub fn new(segments: &'a [CampaignSegment], control_group: &'a ControlGroup) -> Self {
        Self {
            segments,
            control_group,
        }
    }

    pub fn total_audience_size(&self) -> u64 {
        self.segments.iter().map(|s| s.customer_count).sum()
    }

    pub fn control_group_size(&self) -> u64 {
        self.control_group.control_size(self.total_audience_size())
    }

    pub fn target_group_size(&self) -> u64 {
        self.control_group.target_size(self.total_audience_size())
    }

    pub fn overlap_warning(&self) -> bool {
        self.segments.len() > 1
    }

    pub fn summary(&self) -> AudienceSummary {
        let total = self.total_audience_size();
        let control = self.control_group.control_size(total);
        AudienceSummary {
            total_audience_size: total,
            control_group_size: control,
            target_group_size: total.saturating_sub(control),
            segment_count: self.segments.len(),
            overlap_warning: self.overlap_warning(),
        }
    }
}
