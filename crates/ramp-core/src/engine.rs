//! Engine facade: the public surface the presentation layer calls.
//!
//! Wires the control flow together: a mutation updates the profile, runs the
//! tier state machine, invalidates the catalog cache on tier change, then
//! re-evaluates onboarding against the rookie catalog. Every mutator returns
//! the updated profile snapshot plus the domain events it produced, and each
//! is safe to re-run.

use crate::access;
use crate::catalog::{CatalogResolver, ContentSource};
use crate::events::DomainEvent;
use crate::learner::{LearnerProfile, SubProgressKind};
use crate::model::{Catalog, ContentItem, Tier};
use crate::recommend;
use crate::requirements::{self, OnboardingRequirements};
use crate::tiers;
use chrono::Utc;
use std::time::Duration;

/// Result of one mutator call.
#[derive(Debug, Clone)]
pub struct MutationOutcome {
    pub profile: LearnerProfile,
    pub events: Vec<DomainEvent>,
}

pub struct Engine<S: ContentSource> {
    resolver: CatalogResolver<S>,
}

impl<S: ContentSource> Engine<S> {
    pub fn new(source: S, cache_ttl: Duration) -> Self {
        Self {
            resolver: CatalogResolver::new(source, cache_ttl),
        }
    }

    /// Catalog for the learner's current tier and team.
    pub async fn resolve_catalog(&mut self, profile: &LearnerProfile) -> Catalog {
        self.resolver.resolve(profile.tier, &profile.id.team).await
    }

    pub async fn can_access(&mut self, profile: &LearnerProfile, item_id: &str) -> bool {
        let catalog = self.resolve_catalog(profile).await;
        match catalog.find(item_id) {
            Some(item) => access::can_access(item, &profile.completed_ids, profile.tier, &catalog),
            None => false,
        }
    }

    pub async fn unmet_prerequisites(
        &mut self,
        profile: &LearnerProfile,
        item_id: &str,
    ) -> Vec<ContentItem> {
        let catalog = self.resolve_catalog(profile).await;
        match catalog.find(item_id) {
            Some(item) => {
                access::unmet_prerequisites(item, &profile.completed_ids, profile.tier, &catalog)
            }
            None => Vec::new(),
        }
    }

    pub async fn next_recommended(&mut self, profile: &LearnerProfile) -> Option<ContentItem> {
        let catalog = self.resolve_catalog(profile).await;
        recommend::next_recommended(&catalog, &profile.completed_ids, profile.tier)
    }

    pub async fn sorted_modules(&mut self, profile: &LearnerProfile) -> Vec<ContentItem> {
        let catalog = self.resolve_catalog(profile).await;
        recommend::sort_modules_by_order(&catalog, &profile.completed_ids, profile.tier)
    }

    /// Onboarding status, always judged against the rookie catalog.
    pub async fn evaluate(&mut self, profile: &LearnerProfile) -> OnboardingRequirements {
        let rookie = self.resolver.resolve(Tier::Rookie, &profile.id.team).await;
        requirements::evaluate(profile, &rookie)
    }

    /// Record an item completion with an optional assessment score.
    /// Re-completing an already-completed item only refreshes the score map.
    pub async fn complete_item(
        &mut self,
        profile: &mut LearnerProfile,
        item_id: &str,
        score: Option<f64>,
    ) -> MutationOutcome {
        profile.mark_completed(item_id);
        if let Some(score) = score {
            profile.record_score(item_id, score);
        }

        let mut events = Vec::new();
        if let Some(score) = score {
            let catalog = self.resolve_catalog(profile).await;
            let tier_events = tiers::apply_score(profile, score, &catalog, Utc::now());
            if tier_events
                .iter()
                .any(|e| matches!(e, DomainEvent::TierChanged { .. }))
            {
                // The variant selection for the old tier is no longer valid.
                self.resolver.invalidate_team(&profile.id.team);
            }
            events.extend(tier_events);
        }

        events.extend(self.reevaluate_onboarding(profile).await);
        MutationOutcome {
            profile: profile.clone(),
            events,
        }
    }

    /// Record sub-module progress (content or media viewed). Never affects
    /// tier or onboarding state.
    pub async fn mark_sub_progress(
        &mut self,
        profile: &mut LearnerProfile,
        item_id: &str,
        kind: SubProgressKind,
    ) -> MutationOutcome {
        profile.mark_sub_progress(item_id, kind);
        MutationOutcome {
            profile: profile.clone(),
            events: Vec::new(),
        }
    }

    pub async fn mark_procedure_complete(
        &mut self,
        profile: &mut LearnerProfile,
        item_id: &str,
    ) -> MutationOutcome {
        profile.completed_procedures.insert(item_id.to_string());
        let events = self.reevaluate_onboarding(profile).await;
        MutationOutcome {
            profile: profile.clone(),
            events,
        }
    }

    pub async fn mark_tool_explored(
        &mut self,
        profile: &mut LearnerProfile,
        item_id: &str,
    ) -> MutationOutcome {
        profile.explored_tools.insert(item_id.to_string());
        let events = self.reevaluate_onboarding(profile).await;
        MutationOutcome {
            profile: profile.clone(),
            events,
        }
    }

    async fn reevaluate_onboarding(&mut self, profile: &mut LearnerProfile) -> Vec<DomainEvent> {
        let reqs = self.evaluate(profile).await;
        let events = tiers::apply_onboarding(profile, &reqs, Utc::now());
        if events
            .iter()
            .any(|e| matches!(e, DomainEvent::TierChanged { .. }))
        {
            self.resolver.invalidate_team(&profile.id.team);
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticSource;
    use crate::model::{ContentKind, RawCatalog};

    fn fixture_source() -> StaticSource {
        let items = vec![
            crate::model::ContentItem::new("m1", "Intro", ContentKind::Module).mandatory(),
            crate::model::ContentItem::new("m2", "Next", ContentKind::Module)
                .with_prerequisites(&["m1"]),
            crate::model::ContentItem::new("r1", "Refresher", ContentKind::Module)
                .with_category("Remedial")
                .with_affinity(&[Tier::AtRisk]),
            crate::model::ContentItem::new("p1", "Escalation", ContentKind::Procedure).mandatory(),
            crate::model::ContentItem::new("t1", "Dashboard", ContentKind::Tool),
        ];
        StaticSource {
            raw: RawCatalog {
                items,
                variants: vec![],
            },
            fail: false,
        }
    }

    fn engine() -> Engine<StaticSource> {
        Engine::new(fixture_source(), Duration::from_secs(60))
    }

    #[tokio::test]
    async fn test_complete_item_idempotent() {
        let mut engine = engine();
        let mut profile = LearnerProfile::new("sam", "support");
        let first = engine.complete_item(&mut profile, "m1", Some(80.0)).await;
        let second = engine.complete_item(&mut profile, "m1", Some(85.0)).await;

        assert_eq!(first.profile.completed_ids, second.profile.completed_ids);
        assert_eq!(second.profile.scores.get("m1"), Some(&85.0));
        assert!(second.events.is_empty());
    }

    #[tokio::test]
    async fn test_low_score_triggers_at_risk_and_cache_invalidation() {
        let mut engine = engine();
        let mut profile = LearnerProfile::new("sam", "support");

        let rookie_catalog = engine.resolve_catalog(&profile).await;
        assert!(rookie_catalog.find("r1").is_none());

        let outcome = engine.complete_item(&mut profile, "m1", Some(40.0)).await;
        assert_eq!(outcome.profile.tier, Tier::AtRisk);
        assert!(outcome
            .events
            .iter()
            .any(|e| matches!(e, DomainEvent::AtRiskEntered { .. })));

        // Fresh catalog for the new tier includes the remedial item.
        let at_risk_catalog = engine.resolve_catalog(&profile).await;
        assert!(at_risk_catalog.find("r1").is_some());
    }

    #[tokio::test]
    async fn test_next_recommended_respects_tier() {
        let mut engine = engine();
        let mut profile = LearnerProfile::new("sam", "support");
        engine.complete_item(&mut profile, "m1", Some(30.0)).await;
        assert_eq!(profile.tier, Tier::AtRisk);

        let next = engine.next_recommended(&profile).await.unwrap();
        assert_eq!(next.id, "r1");
    }

    #[tokio::test]
    async fn test_onboarding_completion_flow() {
        let mut engine = engine();
        let mut profile = LearnerProfile::new("sam", "support");

        engine.complete_item(&mut profile, "m1", Some(85.0)).await;
        engine.mark_procedure_complete(&mut profile, "p1").await;
        for tool in ["t1", "t2", "t3"] {
            let outcome = engine.mark_tool_explored(&mut profile, tool).await;
            if tool == "t3" {
                assert!(outcome
                    .events
                    .iter()
                    .any(|e| matches!(e, DomainEvent::OnboardingCompleted { .. })));
            } else {
                assert!(outcome.events.is_empty());
            }
        }

        assert!(profile.onboarding_complete);
        assert_eq!(profile.tier, Tier::HighFlyer);

        // Further mutations never re-emit the completion event.
        let outcome = engine.mark_tool_explored(&mut profile, "t4").await;
        assert!(outcome.events.is_empty());
    }

    #[tokio::test]
    async fn test_queries_for_unknown_items() {
        let mut engine = engine();
        let profile = LearnerProfile::new("sam", "support");
        assert!(!engine.can_access(&profile, "ghost").await);
        assert!(engine.unmet_prerequisites(&profile, "ghost").await.is_empty());
    }

    #[tokio::test]
    async fn test_sub_progress_emits_no_events() {
        let mut engine = engine();
        let mut profile = LearnerProfile::new("sam", "support");
        let outcome = engine
            .mark_sub_progress(&mut profile, "m1", SubProgressKind::Media)
            .await;
        assert!(outcome.events.is_empty());
        assert!(outcome.profile.sub_progress.get("m1").unwrap().media_viewed);
    }
}
