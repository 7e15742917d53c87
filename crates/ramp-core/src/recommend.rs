//! Next-item recommendation and display ordering.
//!
//! Pure functions of (catalog, completed set, tier); same inputs always
//! produce the same item.

use crate::access::can_access;
use crate::model::{Catalog, ContentItem, ItemRole, Tier};

fn completed(completed_ids: &[String], id: &str) -> bool {
    completed_ids.iter().any(|c| c == id)
}

/// Sort key: explicit rank ascending, unranked last, title as tiebreak.
fn rank_key(item: &ContentItem) -> (u32, String) {
    (item.rank.unwrap_or(u32::MAX), item.title.clone())
}

/// Pick the single next item to present.
///
/// Priority: the lowest-rank incomplete remedial item when the learner is
/// at risk; else the lowest-rank accessible remedial item (optional
/// remediation); else the lowest-rank accessible incomplete item. `None`
/// when nothing incomplete and accessible remains.
pub fn next_recommended(
    catalog: &Catalog,
    completed_ids: &[String],
    tier: Tier,
) -> Option<ContentItem> {
    if tier == Tier::AtRisk {
        let gated = catalog
            .remedial()
            .filter(|i| !completed(completed_ids, &i.id))
            .min_by_key(|i| rank_key(i));
        if let Some(item) = gated {
            return Some(item.clone());
        }
    }

    let optional_remedial = catalog
        .all()
        .filter(|i| i.role == ItemRole::Remedial)
        .filter(|i| !completed(completed_ids, &i.id))
        .filter(|i| can_access(i, completed_ids, tier, catalog))
        .min_by_key(|i| rank_key(i));
    if let Some(item) = optional_remedial {
        return Some(item.clone());
    }

    catalog
        .all()
        .filter(|i| !completed(completed_ids, &i.id))
        .filter(|i| can_access(i, completed_ids, tier, catalog))
        .min_by_key(|i| rank_key(i))
        .cloned()
}

/// Full display ordering for module lists. Completed items first, then (for
/// high flyers) challenge items, then remedial, then mandatory, then rank
/// with title tiebreak. Display order only; gating never consults this.
pub fn sort_modules_by_order(
    catalog: &Catalog,
    completed_ids: &[String],
    tier: Tier,
) -> Vec<ContentItem> {
    let mut items: Vec<ContentItem> = catalog.modules.clone();
    items.sort_by_key(|i| {
        let done = if completed(completed_ids, &i.id) { 0u8 } else { 1 };
        let challenge = if tier == Tier::HighFlyer && i.role == ItemRole::Challenge {
            0u8
        } else {
            1
        };
        let remedial = if i.role == ItemRole::Remedial { 0u8 } else { 1 };
        let mandatory = if i.mandatory { 0u8 } else { 1 };
        (done, challenge, remedial, mandatory, rank_key(i))
    });
    items
}
