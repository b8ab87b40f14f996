//! Campaign creation wizard.
//!
//! The whole wizard is one serializable [`WizardState`]. Every user action is
//! applied by the pure [`reduce`] function; [`CampaignWizard`] owns the state
//! and turns a completed wizard into a [`CreateCampaignRequest`].

use campaign_core::config::AppConfig;
use campaign_core::types::{CampaignChannel, ControlGroupType, UniversalFrequency};
use campaign_core::{CampaignResult, ValidationError};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::audience::{AudienceCalculator, AudienceSummary, OVERLAP_WARNING};
use crate::models::{
    CampaignDetails, CampaignOffer, CampaignSegment, ControlGroup, CreateCampaignRequest,
};
use crate::offers::OfferSegmentMapper;

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Details,
    Audience,
    Offers,
    Mapping,
    Review,
}

impl WizardStep {
    pub fn next(self) -> Option<WizardStep> {
        match self {
            WizardStep::Details => Some(WizardStep::Audience),
            WizardStep::Audience => Some(WizardStep::Offers),
            WizardStep::Offers => Some(WizardStep::Mapping),
            WizardStep::Mapping => Some(WizardStep::Review),
            WizardStep::Review => None,
        }
    }

    pub fn previous(self) -> Option<WizardStep> {
        match self {
            WizardStep::Details => None,
            WizardStep::Audience => Some(WizardStep::Details),
            WizardStep::Offers => Some(WizardStep::Audience),
            WizardStep::Mapping => Some(WizardStep::Offers),
            WizardStep::Review => Some(WizardStep::Mapping),
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Limits and defaults the reducer applies, taken from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WizardRules {
    pub min_control_percentage: u8,
    pub max_control_percentage: u8,
    pub default_control_percentage: u8,
    pub default_control_type: ControlGroupType,
    pub default_priority: u32,
}

impl From<&AppConfig> for WizardRules {
    fn from(config: &AppConfig) -> Self {
        Self {
            min_control_percentage: config.control_group.min_percentage,
            max_control_percentage: config.control_group.max_percentage,
            default_control_percentage: config.control_group.default_percentage,
            default_control_type: config.control_group.default_type,
            default_priority: config.segments.default_priority,
        }
    }
}

impl Default for WizardRules {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WizardState {
    #[serde(default)]
    pub step: WizardStep,
    #[serde(default)]
    pub details: CampaignDetails,
    #[serde(default)]
    pub segments: Vec<CampaignSegment>,
    #[serde(default)]
    pub control_group: ControlGroup,
    #[serde(default)]
    pub offers: Vec<CampaignOffer>,
    #[serde(default)]
    pub mapper: OfferSegmentMapper,
    #[serde(default)]
    pub rules: WizardRules,
}

impl WizardState {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_rules(WizardRules::from(config))
    }

    /// A blank wizard on step one.
    pub fn with_rules(rules: WizardRules) -> Self {
        Self {
            control_group: ControlGroup {
                enabled: true,
                percentage: rules.default_control_percentage,
                group_type: rules.default_control_type,
                universal_frequency: UniversalFrequency::default(),
            },
            mapper: OfferSegmentMapper::with_default_priority(rules.default_priority),
            rules,
            ..Self::default()
        }
    }

    pub fn audience(&self) -> AudienceSummary {
        AudienceCalculator::new(&self.segments, &self.control_group).summary()
    }

    /// Whether `step`'s requirements are met.
    pub fn validate_step(&self, step: WizardStep) -> Result<(), ValidationError> {
        match step {
            WizardStep::Details => {
                if self.details.name.trim().is_empty() {
                    return Err(ValidationError::MissingCampaignName);
                }
                if let (Some(start), Some(end)) = (self.details.start_date, self.details.end_date)
                {
                    if end < start {
                        return Err(ValidationError::InvalidSchedule);
                    }
                }
                Ok(())
            }
            WizardStep::Audience => {
                if self.segments.is_empty() {
                    return Err(ValidationError::NoSegmentsSelected);
                }
                self.control_group.validate(
                    self.rules.min_control_percentage,
                    self.rules.max_control_percentage,
                )
            }
            WizardStep::Offers => {
                if self.offers.is_empty() {
                    return Err(ValidationError::NoOffersSelected);
                }
                Ok(())
            }
            WizardStep::Mapping => {
                if self.mapper.can_advance(&self.offers) {
                    Ok(())
                } else {
                    Err(ValidationError::IncompleteMapping)
                }
            }
            WizardStep::Review => Ok(()),
        }
    }

    pub fn can_advance(&self) -> bool {
        self.step.next().is_some() && self.validate_step(self.step).is_ok()
    }

    /// Non-blocking banners for the current step.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if matches!(self.step, WizardStep::Audience | WizardStep::Review)
            && self.audience().overlap_warning
        {
            warnings.push(OVERLAP_WARNING.to_string());
        }
        if self.step == WizardStep::Mapping {
            for offer in self.mapper.unmapped_offers(&self.offers) {
                warnings.push(format!(
                    "Offer \"{}\" is not mapped to any segment",
                    offer.name
                ));
            }
        }
        warnings
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum WizardAction {
    SetName(String),
    SetDescription(String),
    SetChannel(CampaignChannel),
    SetSchedule {
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    },
    SelectSegment(CampaignSegment),
    DeselectSegment(String),
    SetControlGroupEnabled(bool),
    SetControlGroupPercentage(u8),
    SetControlGroupType(ControlGroupType),
    SetUniversalFrequency(UniversalFrequency),
    SelectOffer(CampaignOffer),
    DeselectOffer(String),
    DuplicateOffer(String),
    ToggleMapping {
        offer_id: String,
        segment_id: String,
    },
    Next,
    Back,
    Cancel,
}

/// Applies one action. Never fails: actions that do not apply leave the
/// state unchanged.
pub fn reduce(mut state: WizardState, action: WizardAction) -> WizardState {
    match action {
        WizardAction::SetName(name) => state.details.name = name,
        WizardAction::SetDescription(description) => state.details.description = description,
        WizardAction::SetChannel(channel) => state.details.channel = channel,
        WizardAction::SetSchedule {
            start_date,
            end_date,
        } => {
            state.details.start_date = start_date;
            state.details.end_date = end_date;
        }
        WizardAction::SelectSegment(segment) => {
            if !state.segments.iter().any(|s| s.id == segment.id) {
                state.segments.push(segment);
            }
        }
        WizardAction::DeselectSegment(segment_id) => {
            state.segments.retain(|s| s.id != segment_id);
            state.mapper.prune(&state.offers, &state.segments);
        }
        WizardAction::SetControlGroupEnabled(enabled) => state.control_group.enabled = enabled,
        WizardAction::SetControlGroupPercentage(percentage) => {
            state.control_group.percentage = percentage
        }
        WizardAction::SetControlGroupType(group_type) => {
            state.control_group.group_type = group_type
        }
        WizardAction::SetUniversalFrequency(frequency) => {
            state.control_group.universal_frequency = frequency
        }
        WizardAction::SelectOffer(offer) => {
            if !state.offers.iter().any(|o| o.id == offer.id) {
                state.offers.push(offer);
            }
        }
        WizardAction::DeselectOffer(offer_id) => {
            state.offers.retain(|o| o.id != offer_id);
            state.mapper.prune(&state.offers, &state.segments);
        }
        WizardAction::DuplicateOffer(offer_id) => {
            let copy = state
                .offers
                .iter()
                .find(|o| o.id == offer_id)
                .map(|o| OfferSegmentMapper::duplicate_offer(o, &state.offers));
            if let Some(copy) = copy {
                state.offers.push(copy);
            }
        }
        WizardAction::ToggleMapping {
            offer_id,
            segment_id,
        } => {
            let known = state.offers.iter().any(|o| o.id == offer_id)
                && state.segments.iter().any(|s| s.id == segment_id);
            if known {
                state.mapper.toggle_mapping(&offer_id, &segment_id);
            }
        }
        WizardAction::Next => match state.validate_step(state.step) {
            Ok(()) => {
                if let Some(next) = state.step.next() {
                    debug!(from = ?state.step, to = ?next, "Wizard advanced");
                    state.step = next;
                }
            }
            Err(e) => debug!(step = ?state.step, reason = %e, "Wizard step incomplete"),
        },
        WizardAction::Back => {
            if let Some(previous) = state.step.previous() {
                state.step = previous;
            }
        }
        WizardAction::Cancel => {
            debug!("Wizard cancelled");
            return WizardState::with_rules(state.rules);
        }
    }
    state
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

pub struct CampaignWizard {
    state: WizardState,
}

impl CampaignWizard {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            state: WizardState::new(config),
        }
    }

    pub fn from_state(state: WizardState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn into_state(self) -> WizardState {
        self.state
    }

    pub fn dispatch(&mut self, action: WizardAction) -> &WizardState {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action);
        &self.state
    }

    pub fn step(&self) -> WizardStep {
        self.state.step
    }

    pub fn can_advance(&self) -> bool {
        self.state.can_advance()
    }

    pub fn audience_summary(&self) -> AudienceSummary {
        self.state.audience()
    }

    pub fn estimated_reach(&self, offer_id: &str) -> u64 {
        self.state
            .mapper
            .estimated_reach(offer_id, &self.state.segments)
    }

    pub fn warnings(&self) -> Vec<String> {
        self.state.warnings()
    }

    /// Checks every step and builds the request. The wizard state is left
    /// untouched either way.
    pub fn submit(&self) -> CampaignResult<CreateCampaignRequest> {
        let state = &self.state;
        for step in [
            WizardStep::Details,
            WizardStep::Audience,
            WizardStep::Offers,
            WizardStep::Mapping,
        ] {
            state.validate_step(step)?;
        }

        let audience = state.audience();
        let request = CreateCampaignRequest {
            name: state.details.name.trim().to_string(),
            description: state.details.description.clone(),
            channel: state.details.channel,
            start_date: state.details.start_date,
            end_date: state.details.end_date,
            segment_ids: state.segments.iter().map(|s| s.id.clone()).collect(),
            control_group: state.control_group,
            offers: state.mapper.mappings_for(&state.offers),
            total_audience_size: audience.total_audience_size,
            target_group_size: audience.target_group_size,
            control_group_size: audience.control_group_size,
        };

        info!(
            name = %request.name,
            segments = request.segment_ids.len(),
            offers = request.offers.len(),
            total_audience = request.total_audience_size,
            "Campaign request ready"
        );
        metrics::counter!("campaigns.wizard_submitted").increment(1);
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::types::OfferType;
    use campaign_segmentation::SegmentExpression;
    use chrono::Utc;

    fn segment(id: &str, customer_count: u64) -> CampaignSegment {
        CampaignSegment {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            customer_count,
            created_at: Utc::now(),
            criteria: SegmentExpression::default(),
        }
    }

    fn offer(id: &str) -> CampaignOffer {
        CampaignOffer {
            id: id.to_string(),
            name: format!("Offer {id}"),
            description: String::new(),
            offer_type: OfferType::Cashback,
            value: 5.0,
            valid_until: None,
        }
    }

    fn wizard() -> CampaignWizard {
        CampaignWizard::new(&AppConfig::default())
    }

    /// Drives a wizard to the mapping step with two segments and two offers.
    fn at_mapping_step() -> CampaignWizard {
        let mut w = wizard();
        w.dispatch(WizardAction::SetName("Spring Sale".to_string()));
        w.dispatch(WizardAction::Next);
        w.dispatch(WizardAction::SelectSegment(segment("s1", 100)));
        w.dispatch(WizardAction::SelectSegment(segment("s2", 250)));
        w.dispatch(WizardAction::Next);
        w.dispatch(WizardAction::SelectOffer(offer("o1")));
        w.dispatch(WizardAction::SelectOffer(offer("o2")));
        w.dispatch(WizardAction::Next);
        assert_eq!(w.step(), WizardStep::Mapping);
        w
    }

    fn toggle(offer_id: &str, segment_id: &str) -> WizardAction {
        WizardAction::ToggleMapping {
            offer_id: offer_id.to_string(),
            segment_id: segment_id.to_string(),
        }
    }

    // -----------------------------------------------------------------------
    // Step gates
    // -----------------------------------------------------------------------

    #[test]
    fn test_details_requires_name() {
        let mut w = wizard();
        w.dispatch(WizardAction::SetName("   ".to_string()));
        assert!(!w.can_advance());
        w.dispatch(WizardAction::Next);
        assert_eq!(w.step(), WizardStep::Details);

        w.dispatch(WizardAction::SetName("Spring Sale".to_string()));
        w.dispatch(WizardAction::Next);
        assert_eq!(w.step(), WizardStep::Audience);
    }

    #[test]
    fn test_details_rejects_inverted_schedule() {
        let mut w = wizard();
        w.dispatch(WizardAction::SetName("Spring Sale".to_string()));
        w.dispatch(WizardAction::SetSchedule {
            start_date: NaiveDate::from_ymd_opt(2026, 5, 10),
            end_date: NaiveDate::from_ymd_opt(2026, 5, 1),
        });
        assert_eq!(
            w.state().validate_step(WizardStep::Details),
            Err(ValidationError::InvalidSchedule)
        );
    }

    #[test]
    fn test_audience_step_checks_control_group() {
        let mut w = wizard();
        w.dispatch(WizardAction::SetName("Spring Sale".to_string()));
        w.dispatch(WizardAction::Next);
        assert!(!w.can_advance());

        w.dispatch(WizardAction::SelectSegment(segment("s1", 100)));
        w.dispatch(WizardAction::SetControlGroupPercentage(25));
        assert!(!w.can_advance());

        w.dispatch(WizardAction::SetControlGroupEnabled(false));
        assert!(w.can_advance());
    }

    #[test]
    fn test_mapping_gate() {
        let mut w = at_mapping_step();
        assert!(!w.can_advance());

        w.dispatch(toggle("o1", "s1"));
        assert!(!w.can_advance());
        assert_eq!(
            w.warnings(),
            vec!["Offer \"Offer o2\" is not mapped to any segment".to_string()]
        );
        w.dispatch(WizardAction::Next);
        assert_eq!(w.step(), WizardStep::Mapping);

        w.dispatch(toggle("o2", "s2"));
        assert!(w.can_advance());
        assert!(w.warnings().is_empty());
        w.dispatch(WizardAction::Next);
        assert_eq!(w.step(), WizardStep::Review);
        assert!(!w.can_advance());
    }

    #[test]
    fn test_toggle_ignores_unselected_ids() {
        let mut w = at_mapping_step();
        w.dispatch(toggle("o1", "unknown"));
        w.dispatch(toggle("unknown", "s1"));
        assert!(w.state().mapper.mappings().is_empty());
    }

    #[test]
    fn test_back_is_ungated() {
        let mut w = at_mapping_step();
        w.dispatch(WizardAction::Back);
        assert_eq!(w.step(), WizardStep::Offers);
        w.dispatch(WizardAction::Back);
        w.dispatch(WizardAction::Back);
        w.dispatch(WizardAction::Back);
        assert_eq!(w.step(), WizardStep::Details);
    }

    // -----------------------------------------------------------------------
    // Selection changes
    // -----------------------------------------------------------------------

    #[test]
    fn test_deselect_prunes_mappings() {
        let mut w = at_mapping_step();
        w.dispatch(toggle("o1", "s1"));
        w.dispatch(toggle("o2", "s1"));
        w.dispatch(toggle("o2", "s2"));

        w.dispatch(WizardAction::DeselectSegment("s1".to_string()));
        assert!(w.state().mapper.segments_for("o1").is_empty());
        assert_eq!(w.state().mapper.segments_for("o2"), &["s2".to_string()]);

        w.dispatch(WizardAction::DeselectOffer("o1".to_string()));
        assert!(w.can_advance());
    }

    #[test]
    fn test_duplicate_offer_starts_unmapped() {
        let mut w = at_mapping_step();
        w.dispatch(toggle("o1", "s1"));
        w.dispatch(toggle("o2", "s1"));
        assert!(w.can_advance());

        w.dispatch(WizardAction::DuplicateOffer("o1".to_string()));
        let copy = w.state().offers.last().unwrap().clone();
        assert!(copy.id.starts_with("o1-copy-"));
        assert!(w.state().mapper.segments_for(&copy.id).is_empty());
        assert!(!w.can_advance());
    }

    #[test]
    fn test_duplicating_twice_gives_distinct_ids() {
        let mut w = at_mapping_step();
        w.dispatch(WizardAction::DuplicateOffer("o1".to_string()));
        w.dispatch(WizardAction::DuplicateOffer("o1".to_string()));

        let ids: Vec<String> = w.state().offers.iter().map(|o| o.id.clone()).collect();
        assert_eq!(ids.len(), 4);
        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 4);

        w.dispatch(toggle(&ids[3], "s1"));
        assert_eq!(w.state().mapper.segments_for(&ids[3]), &["s1".to_string()]);
        assert!(w.state().mapper.segments_for(&ids[2]).is_empty());
    }

    #[test]
    fn test_oversized_control_percentage_does_not_panic() {
        let mut w = wizard();
        w.dispatch(WizardAction::SelectSegment(segment("s1", 350)));
        w.dispatch(WizardAction::SetControlGroupPercentage(150));
        let summary = w.audience_summary();
        assert_eq!(summary.control_group_size, 350);
        assert_eq!(summary.target_group_size, 0);

        let mut state: WizardState = serde_json::from_value(serde_json::json!({
            "step": "audience",
            "segments": [segment("s1", 350), segment("s2", 10)],
            "control_group": {"enabled": true, "percentage": 200}
        }))
        .unwrap();
        assert_eq!(CampaignWizard::from_state(state.clone()).warnings().len(), 1);
        state = reduce(state, WizardAction::Next);
        assert_eq!(state.step, WizardStep::Audience);
    }

    #[test]
    fn test_selecting_same_segment_twice_is_ignored() {
        let mut w = wizard();
        w.dispatch(WizardAction::SelectSegment(segment("s1", 100)));
        w.dispatch(WizardAction::SelectSegment(segment("s1", 100)));
        assert_eq!(w.audience_summary().total_audience_size, 100);
    }

    #[test]
    fn test_overlap_warning_on_audience_step() {
        let mut w = wizard();
        w.dispatch(WizardAction::SetName("Spring Sale".to_string()));
        w.dispatch(WizardAction::Next);
        w.dispatch(WizardAction::SelectSegment(segment("s1", 100)));
        assert!(w.warnings().is_empty());
        w.dispatch(WizardAction::SelectSegment(segment("s2", 250)));
        assert_eq!(w.warnings(), vec![OVERLAP_WARNING.to_string()]);
    }

    #[test]
    fn test_cancel_discards_state() {
        let mut w = at_mapping_step();
        w.dispatch(toggle("o1", "s1"));
        w.dispatch(WizardAction::SetControlGroupPercentage(15));
        w.dispatch(WizardAction::Cancel);

        let state = w.state();
        assert_eq!(state.step, WizardStep::Details);
        assert!(state.details.name.is_empty());
        assert!(state.segments.is_empty());
        assert!(state.offers.is_empty());
        assert!(state.mapper.mappings().is_empty());
        assert_eq!(state.control_group.percentage, 10);
    }

    // -----------------------------------------------------------------------
    // Submit
    // -----------------------------------------------------------------------

    #[test]
    fn test_submit_builds_request() {
        let mut w = at_mapping_step();
        w.dispatch(toggle("o1", "s1"));
        w.dispatch(toggle("o2", "s1"));
        w.dispatch(toggle("o2", "s2"));
        assert_eq!(w.estimated_reach("o2"), 350);

        let request = w.submit().unwrap();
        assert_eq!(request.name, "Spring Sale");
        assert_eq!(request.segment_ids, vec!["s1".to_string(), "s2".to_string()]);
        assert_eq!(request.total_audience_size, 350);
        assert_eq!(request.control_group_size, 35);
        assert_eq!(request.target_group_size, 315);
        assert_eq!(request.offers.len(), 2);
        assert!(request.offers.iter().all(|m| m.priority == 1));
    }

    #[test]
    fn test_submit_incomplete_mapping_fails() {
        let mut w = at_mapping_step();
        w.dispatch(toggle("o1", "s1"));
        let err = w.submit().unwrap_err();
        assert_eq!(
            err.display_message(),
            "Every selected offer must be mapped to at least one segment"
        );
    }

    #[test]
    fn test_state_round_trips_through_json() {
        let mut w = at_mapping_step();
        w.dispatch(toggle("o1", "s1"));
        let json = serde_json::to_string(w.state()).unwrap();
        let restored: WizardState = serde_json::from_str(&json).unwrap();
        assert_eq!(&restored, w.state());
    }
}
