//! Tier state machine.
//!
//! Score-triggered transitions between ROOKIE and AT_RISK, plus promotion to
//! HIGH_FLYER driven by the onboarding evaluator or by sustained performance
//! after onboarding. There is no path out of HIGH_FLYER.
//!
//! Recovery policy: an at-risk learner returns to rookie when a score of 70+
//! arrives, the running average is 70+, and either every remedial item or
//! every mandatory at-risk item is complete. The same rule applies on every
//! re-check; there is no separate stricter login-time variant.

use crate::events::DomainEvent;
use crate::learner::LearnerProfile;
use crate::model::{Catalog, ItemRole, Tier};
use crate::requirements::{OnboardingRequirements, PASSING_SCORE};
use chrono::{DateTime, Utc};
use tracing::info;

/// Score below which a rookie is pulled into remediation.
pub const AT_RISK_THRESHOLD: f64 = 50.0;
/// Score at which an onboarded learner is promoted on performance alone.
pub const PROMOTION_SCORE: f64 = 90.0;

/// Whether the at-risk recovery completion condition holds: all remedial
/// items done, or all mandatory items of the at-risk catalog done.
fn recovery_completion_met(profile: &LearnerProfile, catalog: &Catalog) -> bool {
    let remedial_done = catalog
        .all()
        .filter(|i| i.role == ItemRole::Remedial)
        .all(|i| profile.is_completed(&i.id));
    let mandatory_done = catalog
        .all()
        .filter(|i| i.mandatory)
        .all(|i| profile.is_completed(&i.id));
    remedial_done || mandatory_done
}

fn enter_at_risk(
    profile: &mut LearnerProfile,
    score: f64,
    now: DateTime<Utc>,
) -> Vec<DomainEvent> {
    let from = profile.tier;
    profile.push_tier(Tier::AtRisk, now);
    profile.interventions_received += 1;
    info!(
        "{} entered at_risk on score {} (intervention #{})",
        profile.id, score, profile.interventions_received
    );
    vec![
        DomainEvent::TierChanged {
            learner: profile.id.clone(),
            from,
            to: Tier::AtRisk,
        },
        DomainEvent::AtRiskEntered {
            learner: profile.id.clone(),
            score_context: Some(score),
        },
        DomainEvent::InterventionRecorded {
            learner: profile.id.clone(),
            count: profile.interventions_received,
        },
    ]
}

/// React to a new assessment score. The catalog is the one resolved for the
/// learner's current tier. Returns the emitted events; empty when no
/// transition fired.
pub fn apply_score(
    profile: &mut LearnerProfile,
    score: f64,
    catalog: &Catalog,
    now: DateTime<Utc>,
) -> Vec<DomainEvent> {
    match profile.tier {
        Tier::Rookie => {
            if score < AT_RISK_THRESHOLD {
                return enter_at_risk(profile, score, now);
            }
            if profile.onboarding_complete && score >= PROMOTION_SCORE {
                let from = profile.tier;
                profile.push_tier(Tier::HighFlyer, now);
                info!("{} promoted to high_flyer on score {}", profile.id, score);
                return vec![DomainEvent::TierChanged {
                    learner: profile.id.clone(),
                    from,
                    to: Tier::HighFlyer,
                }];
            }
            Vec::new()
        }
        Tier::AtRisk => {
            if score >= PASSING_SCORE
                && recovery_completion_met(profile, catalog)
                && profile.average_score() >= PASSING_SCORE
            {
                let from = profile.tier;
                profile.push_tier(Tier::Rookie, now);
                info!("{} recovered from at_risk on score {}", profile.id, score);
                return vec![
                    DomainEvent::TierChanged {
                        learner: profile.id.clone(),
                        from,
                        to: Tier::Rookie,
                    },
                    DomainEvent::AtRiskRecovered {
                        learner: profile.id.clone(),
                        score_context: Some(score),
                    },
                ];
            }
            Vec::new()
        }
        // Terminal for this core; no demotion path.
        Tier::HighFlyer => Vec::new(),
    }
}

/// React to a fresh evaluator verdict. Sets the irreversible onboarding flag
/// and promotes to HIGH_FLYER exactly once; re-evaluating later never
/// re-emits the completion event.
pub fn apply_onboarding(
    profile: &mut LearnerProfile,
    reqs: &OnboardingRequirements,
    now: DateTime<Utc>,
) -> Vec<DomainEvent> {
    if !reqs.overall_complete {
        return Vec::new();
    }
    if !profile.complete_onboarding(now) {
        return Vec::new();
    }

    let mut events = Vec::new();
    if profile.tier != Tier::HighFlyer {
        let from = profile.tier;
        profile.push_tier(Tier::HighFlyer, now);
        events.push(DomainEvent::TierChanged {
            learner: profile.id.clone(),
            from,
            to: Tier::HighFlyer,
        });
    }
    info!("{} completed onboarding", profile.id);
    events.push(DomainEvent::OnboardingCompleted {
        learner: profile.id.clone(),
    });
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentItem, ContentKind};
    use crate::requirements::evaluate;

    fn remedial_catalog() -> Catalog {
        let mut c = Catalog::default();
        for n in 0..3 {
            let mut item = ContentItem::new(&format!("r{}", n), "Refresher", ContentKind::Module)
                .with_category("Remedial");
            item.role = item.classify_role();
            c.push(item);
        }
        c.push(ContentItem::new("m1", "Intro", ContentKind::Module).mandatory());
        c
    }

    #[test]
    fn test_rookie_drops_to_at_risk_below_50() {
        let mut profile = LearnerProfile::new("sam", "support");
        profile.record_score("a1", 40.0);
        let events = apply_score(&mut profile, 40.0, &remedial_catalog(), Utc::now());

        assert_eq!(profile.tier, Tier::AtRisk);
        assert_eq!(profile.interventions_received, 1);
        assert_eq!(profile.tier_history.last().unwrap().tier, Tier::AtRisk);
        assert!(events
            .iter()
            .any(|e| matches!(e, DomainEvent::AtRiskEntered { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e, DomainEvent::InterventionRecorded { count: 1, .. })));
    }

    #[test]
    fn test_rookie_stays_at_50_and_above() {
        let mut profile = LearnerProfile::new("sam", "support");
        let events = apply_score(&mut profile, 50.0, &remedial_catalog(), Utc::now());
        assert_eq!(profile.tier, Tier::Rookie);
        assert!(events.is_empty());
    }

    #[test]
    fn test_at_risk_recovery_needs_remedial_completion() {
        let mut profile = LearnerProfile::new("sam", "support");
        profile.push_tier(Tier::AtRisk, Utc::now());
        profile.record_score("a1", 75.0);

        let events = apply_score(&mut profile, 75.0, &remedial_catalog(), Utc::now());
        assert_eq!(profile.tier, Tier::AtRisk, "remedial items incomplete");
        assert!(events.is_empty());
    }

    #[test]
    fn test_at_risk_recovers_after_remedial_and_passing_score() {
        let mut profile = LearnerProfile::new("sam", "support");
        profile.push_tier(Tier::AtRisk, Utc::now());
        for id in ["r0", "r1", "r2"] {
            profile.mark_completed(id);
        }
        profile.record_score("a1", 75.0);

        let events = apply_score(&mut profile, 75.0, &remedial_catalog(), Utc::now());
        assert_eq!(profile.tier, Tier::Rookie);
        assert!(events
            .iter()
            .any(|e| matches!(e, DomainEvent::AtRiskRecovered { .. })));
    }

    #[test]
    fn test_at_risk_recovers_via_mandatory_alternative() {
        // OR-policy: completing all mandatory at-risk items also satisfies
        // the completion condition.
        let mut profile = LearnerProfile::new("sam", "support");
        profile.push_tier(Tier::AtRisk, Utc::now());
        profile.mark_completed("m1");
        profile.record_score("a1", 80.0);

        let events = apply_score(&mut profile, 80.0, &remedial_catalog(), Utc::now());
        assert_eq!(profile.tier, Tier::Rookie);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_recovery_blocked_by_low_average() {
        let mut profile = LearnerProfile::new("sam", "support");
        profile.push_tier(Tier::AtRisk, Utc::now());
        for id in ["r0", "r1", "r2"] {
            profile.mark_completed(id);
        }
        profile.record_score("a1", 30.0);
        profile.record_score("a2", 75.0);

        // Average is 52.5: the passing score alone is not enough.
        let events = apply_score(&mut profile, 75.0, &remedial_catalog(), Utc::now());
        assert_eq!(profile.tier, Tier::AtRisk);
        assert!(events.is_empty());
    }

    #[test]
    fn test_performance_promotion_after_onboarding() {
        let mut profile = LearnerProfile::new("sam", "support");
        profile.complete_onboarding(Utc::now());
        let events = apply_score(&mut profile, 92.0, &remedial_catalog(), Utc::now());
        assert_eq!(profile.tier, Tier::HighFlyer);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_no_promotion_on_high_score_before_onboarding() {
        let mut profile = LearnerProfile::new("sam", "support");
        let events = apply_score(&mut profile, 95.0, &remedial_catalog(), Utc::now());
        assert_eq!(profile.tier, Tier::Rookie);
        assert!(events.is_empty());
    }

    #[test]
    fn test_high_flyer_is_terminal() {
        let mut profile = LearnerProfile::new("sam", "support");
        profile.push_tier(Tier::HighFlyer, Utc::now());
        let events = apply_score(&mut profile, 10.0, &remedial_catalog(), Utc::now());
        assert_eq!(profile.tier, Tier::HighFlyer);
        assert!(events.is_empty());
    }

    #[test]
    fn test_onboarding_promotion_emits_once() {
        let mut profile = LearnerProfile::new("sam", "support");
        profile.mark_completed("m1");
        for t in ["t1", "t2", "t3"] {
            profile.explored_tools.insert(t.into());
        }
        profile.record_score("m1", 85.0);
        let catalog = remedial_catalog();

        let reqs = evaluate(&profile, &catalog);
        assert!(reqs.overall_complete);

        let events = apply_onboarding(&mut profile, &reqs, Utc::now());
        assert_eq!(profile.tier, Tier::HighFlyer);
        assert!(profile.onboarding_complete);
        assert!(events
            .iter()
            .any(|e| matches!(e, DomainEvent::OnboardingCompleted { .. })));

        // Re-evaluating afterwards never re-emits.
        let reqs = evaluate(&profile, &catalog);
        let events = apply_onboarding(&mut profile, &reqs, Utc::now());
        assert!(events.is_empty());
    }
}
