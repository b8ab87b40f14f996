//! Offer-to-segment mapping for the campaign wizard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{CampaignOffer, CampaignSegment, OfferSegmentMapping};

fn default_priority() -> u32 {
    1
}

/// Many-to-many association between selected offers and selected segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfferSegmentMapper {
    #[serde(default)]
    mappings: Vec<OfferSegmentMapping>,
    #[serde(default = "default_priority")]
    default_priority: u32,
}

impl OfferSegmentMapper {
    pub fn new() -> Self {
        Self::with_default_priority(default_priority())
    }

    pub fn with_default_priority(default_priority: u32) -> Self {
        Self {
            mappings: Vec::new(),
            default_priority,
        }
    }

    pub fn mappings(&self) -> &[OfferSegmentMapping] {
        &self.mappings
    }

    pub fn segments_for(&self, offer_id: &str) -> &[String] {
        self.mappings
            .iter()
            .find(|m| m.offer_id == offer_id)
            .map(|m| m.segment_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_mapped(&self, offer_id: &str, segment_id: &str) -> bool {
        self.segments_for(offer_id).iter().any(|s| s == segment_id)
    }

    /// Adds the pair if absent, removes it if present. Returns whether the pair
    /// is mapped afterwards.
    pub fn toggle_mapping(&mut self, offer_id: &str, segment_id: &str) -> bool {
        match self.mappings.iter_mut().find(|m| m.offer_id == offer_id) {
            Some(mapping) => {
                if let Some(pos) = mapping.segment_ids.iter().position(|s| s == segment_id) {
                    mapping.segment_ids.remove(pos);
                    false
                } else {
                    mapping.segment_ids.push(segment_id.to_string());
                    true
                }
            }
            None => {
                self.mappings.push(OfferSegmentMapping {
                    offer_id: offer_id.to_string(),
                    segment_ids: vec![segment_id.to_string()],
                    priority: self.default_priority,
                });
                true
            }
        }
    }

    /// Sum of `customer_count` over the selected segments mapped to the offer.
    pub fn estimated_reach(&self, offer_id: &str, segments: &[CampaignSegment]) -> u64 {
        let mapped = self.segments_for(offer_id);
        segments
            .iter()
            .filter(|s| mapped.contains(&s.id))
            .map(|s| s.customer_count)
            .sum()
    }

    /// At least one offer, and every offer mapped to at least one segment.
    pub fn can_advance(&self, offers: &[CampaignOffer]) -> bool {
        !offers.is_empty() && self.unmapped_offers(offers).is_empty()
    }

    pub fn unmapped_offers<'o>(&self, offers: &'o [CampaignOffer]) -> Vec<&'o CampaignOffer> {
        offers
            .iter()
            .filter(|o| self.segments_for(&o.id).is_empty())
            .collect()
    }

    /// Drops mappings that refer to offers or segments no longer selected.
    pub fn prune(&mut self, offers: &[CampaignOffer], segments: &[CampaignSegment]) {
        self.mappings
            .retain(|m| offers.iter().any(|o| o.id == m.offer_id));
        for mapping in &mut self.mappings {
            mapping
                .segment_ids
                .retain(|id| segments.iter().any(|s| &s.id == id));
        }
    }

    /// Mappings for the given offers, in offer order. Unmapped offers get an
    /// empty entry with the default priority.
    pub fn mappings_for(&self, offers: &[CampaignOffer]) -> Vec<OfferSegmentMapping> {
        offers
            .iter()
            .map(|o| {
                self.mappings
                    .iter()
                    .find(|m| m.offer_id == o.id)
                    .cloned()
                    .unwrap_or_else(|| OfferSegmentMapping {
                        offer_id: o.id.clone(),
                        segment_ids: Vec::new(),
                        priority: self.default_priority,
                    })
            })
            .collect()
    }

    /// Copies an offer under a fresh `{id}-copy-{millis}` id that no offer in
    /// `existing` uses. The copy starts unmapped.
    pub fn duplicate_offer(offer: &CampaignOffer, existing: &[CampaignOffer]) -> CampaignOffer {
        Self::duplicate_offer_at(offer, existing, Utc::now())
    }

    /// Bumps the timestamp past any id already taken.
    pub fn duplicate_offer_at(
        offer: &CampaignOffer,
        existing: &[CampaignOffer],
        at: DateTime<Utc>,
    ) -> CampaignOffer {
        let mut millis = at.timestamp_millis();
        let mut id = format!("{}-copy-{}", offer.id, millis);
        while existing.iter().any(|o| o.id == id) {
            millis += 1;
            id = format!("{}-copy-{}", offer.id, millis);
        }
        CampaignOffer {
            id,
            ..offer.clone()
        }
    }
}

impl Default for OfferSegmentMapper {
    fn default() -> Self {
        Self::new()
    }
}
