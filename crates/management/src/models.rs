//! Campaign wizard domain types: selected segments and offers, control group,
//! offer-segment mappings and the request a finished wizard produces.

use campaign_core::config::ControlGroupConfig;
use campaign_core::types::{CampaignChannel, ControlGroupType, OfferType, UniversalFrequency};
use campaign_core::ValidationError;
use campaign_segmentation::{Segment, SegmentExpression};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ─── Segment ───────────────────────────────────────────────────────────────

/// Snapshot of a segment taken when it is selected for a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignSegment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub customer_count: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub criteria: SegmentExpression,
}

impl From<Segment> for CampaignSegment {
    fn from(segment: Segment) -> Self {
        Self {
            id: segment.id,
            name: segment.name,
            description: segment.description,
            // an unresolved count contributes nothing to audience totals
            customer_count: segment.customer_count.unwrap_or(0),
            created_at: segment.created_at,
            criteria: segment.conditions,
        }
    }
}

// ─── Offer ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignOffer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub offer_type: OfferType,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
}

/// Segments that receive one offer. `priority` is stored but not interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferSegmentMapping {
    pub offer_id: String,
    pub segment_ids: Vec<String>,
    pub priority: u32,
}

// ─── Control group ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlGroup {
    pub enabled: bool,
    pub percentage: u8,
    #[serde(rename = "type", default)]
    pub group_type: ControlGroupType,
    #[serde(default)]
    pub universal_frequency: UniversalFrequency,
}

impl ControlGroup {
    pub fn from_config(config: &ControlGroupConfig) -> Self {
        Self {
            enabled: true,
            percentage: config.default_percentage,
            group_type: config.default_type,
            universal_frequency: UniversalFrequency::default(),
        }
    }

    /// Refresh cadence, only meaningful for a universal control group.
    pub fn frequency(&self) -> Option<UniversalFrequency> {
        match self.group_type {
            ControlGroupType::Universal => Some(self.universal_frequency),
            ControlGroupType::Standard => None,
        }
    }

    /// Percentage must lie in `[min, max]` while the group is enabled.
    pub fn validate(&self, min: u8, max: u8) -> Result<(), ValidationError> {
        if self.enabled && !(min..=max).contains(&self.percentage) {
            return Err(ValidationError::ControlGroupPercentage {
                min,
                max,
                actual: self.percentage,
            });
        }
        Ok(())
    }

    /// `round(total * percentage / 100)`, halves rounded up; zero when disabled.
    /// Percentages above 100 count as 100, so the control never exceeds the total.
    pub fn control_size(&self, total_audience: u64) -> u64 {
        if !self.enabled {
            return 0;
        }
        let percentage = self.percentage.min(100);
        let scaled = total_audience as u128 * percentage as u128;
        ((scaled + 50) / 100) as u64
    }

    pub fn target_size(&self, total_audience: u64) -> u64 {
        total_audience.saturating_sub(self.control_size(total_audience))
    }
}

impl Default for ControlGroup {
    fn default() -> Self {
        Self::from_config(&ControlGroupConfig::default())
    }
}

// ─── Campaign ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignDetails {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub channel: CampaignChannel,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

/// What a completed wizard commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateCampaignRequest {
    pub name: String,
    pub description: String,
    pub channel: CampaignChannel,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub segment_ids: Vec<String>,
    pub control_group: ControlGroup,
    pub offers: Vec<OfferSegmentMapping>,
    pub total_audience_size: u64,
    pub target_group_size: u64,
    pub control_group_size: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn control(enabled: bool, percentage: u8) -> ControlGroup {
        ControlGroup {
            enabled,
            percentage,
            ..ControlGroup::default()
        }
    }

    #[test]
    fn test_control_size_rounds_half_up() {
        assert_eq!(control(true, 10).control_size(350), 35);
        assert_eq!(control(true, 10).control_size(345), 35); // 34.5
        assert_eq!(control(true, 10).control_size(344), 34); // 34.4
        assert_eq!(control(true, 15).control_size(0), 0);
        assert_eq!(control(true, 20).control_size(u64::MAX / 10), u64::MAX / 50);
    }

    #[test]
    fn test_disabled_control_group() {
        let cg = control(false, 10);
        assert_eq!(cg.control_size(350), 0);
        assert_eq!(cg.target_size(350), 350);
        // percentage is ignored while disabled
        assert!(control(false, 0).validate(1, 20).is_ok());
    }

    #[test]
    fn test_out_of_range_percentage_is_capped() {
        let cg = control(true, 150);
        assert_eq!(cg.control_size(350), 350);
        assert_eq!(cg.target_size(350), 0);
        assert_eq!(control(true, u8::MAX).control_size(u64::MAX), u64::MAX);
        assert!(cg.validate(1, 20).is_err());
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(control(true, 1).validate(1, 20).is_ok());
        assert!(control(true, 20).validate(1, 20).is_ok());
        assert_eq!(
            control(true, 21).validate(1, 20),
            Err(ValidationError::ControlGroupPercentage {
                min: 1,
                max: 20,
                actual: 21
            })
        );
        assert!(control(true, 0).validate(1, 20).is_err());
    }

    #[test]
    fn test_frequency_only_for_universal() {
        let mut cg = ControlGroup::default();
        assert_eq!(cg.frequency(), None);
        cg.group_type = ControlGroupType::Universal;
        cg.universal_frequency = UniversalFrequency::Quarterly;
        assert_eq!(cg.frequency(), Some(UniversalFrequency::Quarterly));
    }

    #[test]
    fn test_segment_snapshot() {
        let now = Utc::now();
        let segment = Segment {
            id: "seg-1".to_string(),
            name: "Lapsed".to_string(),
            description: String::new(),
            tags: vec![],
            conditions: SegmentExpression::default(),
            customer_count: None,
            created_at: now,
            updated_at: now,
        };
        let snapshot = CampaignSegment::from(segment);
        assert_eq!(snapshot.id, "seg-1");
        assert_eq!(snapshot.customer_count, 0);
    }
}
