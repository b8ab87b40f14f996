//! Campaign creation wizard: audience composition, offer-segment mapping and
//! the reducer-driven wizard state that produces a campaign request.

pub mod audience;
pub mod models;
pub mod offers;
pub mod wizard;

pub use audience::{AudienceCalculator, AudienceSummary};
pub use models::{
    CampaignDetails, CampaignOffer, CampaignSegment, ControlGroup, CreateCampaignRequest,
    OfferSegmentMapping,
};
pub use offers::OfferSegmentMapper;
pub use wizard::{reduce, CampaignWizard, WizardAction, WizardRules, WizardState, WizardStep};
