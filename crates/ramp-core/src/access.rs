//! Prerequisite and access gating.
//!
//! Pure functions over a resolved catalog and a learner's completed set.
//! At-risk learners sit behind a global remedial gate: nothing non-remedial
//! opens until every remedial item in the catalog is done.

use crate::model::{Catalog, ContentItem, ItemRole, Tier};
use tracing::debug;

fn completed(completed_ids: &[String], id: &str) -> bool {
    completed_ids.iter().any(|c| c == id)
}

/// Remedial items in the catalog not yet completed.
fn incomplete_remedial<'a>(catalog: &'a Catalog, completed_ids: &[String]) -> Vec<&'a ContentItem> {
    catalog
        .remedial()
        .filter(|i| !completed(completed_ids, &i.id))
        .collect()
}

/// Whether the learner may open `item` right now.
///
/// Rules in order: completed items are always re-enterable; at-risk learners
/// must clear every remedial item before anything non-remedial; otherwise
/// every declared prerequisite must be completed.
pub fn can_access(
    item: &ContentItem,
    completed_ids: &[String],
    tier: Tier,
    catalog: &Catalog,
) -> bool {
    if completed(completed_ids, &item.id) {
        return true;
    }

    if tier == Tier::AtRisk && item.role != ItemRole::Remedial {
        if !incomplete_remedial(catalog, completed_ids).is_empty() {
            return false;
        }
    }

    item.prerequisites
        .iter()
        .all(|p| completed(completed_ids, p))
}

/// The items blocking access to `item`: the incomplete remedial set when the
/// at-risk gate applies, otherwise the unmet declared prerequisites.
/// Prerequisite ids not present in the catalog are dropped.
pub fn unmet_prerequisites(
    item: &ContentItem,
    completed_ids: &[String],
    tier: Tier,
    catalog: &Catalog,
) -> Vec<ContentItem> {
    if completed(completed_ids, &item.id) {
        return Vec::new();
    }

    if tier == Tier::AtRisk && item.role != ItemRole::Remedial {
        let gate = incomplete_remedial(catalog, completed_ids);
        if !gate.is_empty() {
            return gate.into_iter().cloned().collect();
        }
    }

    item.prerequisites
        .iter()
        .filter(|p| !completed(completed_ids, p))
        .filter_map(|p| {
            let resolved = catalog.find(p);
            if resolved.is_none() {
                debug!("dangling prerequisite {} on {} dropped", p, item.id);
            }
            resolved
        })
        .cloned()
        .collect()
}
