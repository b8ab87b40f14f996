//! Shared identifiers and enums used by the segmentation and management crates.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fresh opaque identifier for client-side objects (conditions, groups, offers).
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlGroupType {
    /// Held out for this campaign only.
    #[default]
    Standard,
    /// Shared across campaigns on a recurring cadence.
    Universal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniversalFrequency {
    #[default]
    Monthly,
    Quarterly,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignChannel {
    #[default]
    Email,
    Sms,
    Push,
    InApp,
    Web,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferType {
    #[default]
    Discount,
    Cashback,
    Bundle,
    FreeShipping,
    Points,
}
