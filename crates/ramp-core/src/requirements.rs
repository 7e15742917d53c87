//! Onboarding requirement evaluation.
//!
//! Always computed against the rookie catalog for the learner's team: a
//! learner who has since advanced is still judged against the bar they
//! originally had to clear. The weighted percentage is informational; the
//! boolean gate is the five-way AND.

use crate::learner::LearnerProfile;
use crate::model::{Catalog, Tier};
use serde::{Deserialize, Serialize};

/// Minimum number of distinct tools a learner must explore.
pub const MIN_TOOLS: u32 = 3;
/// Average assessment score required to pass.
pub const PASSING_SCORE: f64 = 70.0;

const WEIGHT_MODULES: f64 = 0.5;
const WEIGHT_PROCEDURES: f64 = 0.25;
const WEIGHT_TOOLS: f64 = 0.15;
const SCORE_BONUS: f64 = 10.0;

/// Progress on one counted criterion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CriterionProgress {
    pub required: u32,
    pub completed: u32,
    pub percentage: u32,
}

impl CriterionProgress {
    fn new(required: u32, completed: u32) -> Self {
        // Percentage is 0 when nothing is required; the boolean gate treats
        // an empty requirement as trivially satisfied instead.
        let percentage = if required == 0 {
            0
        } else {
            (completed.min(required) * 100) / required
        };
        Self {
            required,
            completed,
            percentage,
        }
    }

    pub fn satisfied(&self) -> bool {
        self.required == 0 || self.completed >= self.required
    }
}

/// Average-score criterion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreRequirement {
    pub required: f64,
    pub current: f64,
    pub passing: bool,
}

/// Derived onboarding status; recomputed on demand, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnboardingRequirements {
    pub modules: CriterionProgress,
    pub procedures: CriterionProgress,
    pub tools: CriterionProgress,
    pub average_score: ScoreRequirement,
    pub not_at_risk: bool,
    /// Weighted percentage, capped at 100. Informational only.
    pub overall_percentage: u32,
    /// The actual completion gate: all five sub-conditions must hold.
    pub overall_complete: bool,
}

/// Evaluate onboarding completion for a learner against the rookie catalog.
pub fn evaluate(profile: &LearnerProfile, rookie_catalog: &Catalog) -> OnboardingRequirements {
    let mandatory_modules: Vec<&str> = rookie_catalog
        .modules
        .iter()
        .filter(|m| m.mandatory)
        .map(|m| m.id.as_str())
        .collect();
    let modules_done = mandatory_modules
        .iter()
        .filter(|id| profile.is_completed(id))
        .count() as u32;
    let modules = CriterionProgress::new(mandatory_modules.len() as u32, modules_done);

    let mandatory_procedures: Vec<&str> = rookie_catalog
        .procedures
        .iter()
        .filter(|p| p.mandatory)
        .map(|p| p.id.as_str())
        .collect();
    let procedures_done = mandatory_procedures
        .iter()
        .filter(|id| profile.completed_procedures.contains(**id) || profile.is_completed(id))
        .count() as u32;
    let procedures = CriterionProgress::new(mandatory_procedures.len() as u32, procedures_done);

    let explored = profile.explored_tools.len() as u32;
    let tools = CriterionProgress::new(MIN_TOOLS, explored);

    let current = profile.average_score();
    let average_score = ScoreRequirement {
        required: PASSING_SCORE,
        current,
        passing: current >= PASSING_SCORE,
    };

    let not_at_risk = profile.tier != Tier::AtRisk;

    let weighted = modules.percentage as f64 * WEIGHT_MODULES
        + procedures.percentage as f64 * WEIGHT_PROCEDURES
        + tools.percentage as f64 * WEIGHT_TOOLS
        + if average_score.passing { SCORE_BONUS } else { 0.0 };
    let overall_percentage = weighted.round().min(100.0) as u32;

    let overall_complete = modules.satisfied()
        && procedures.satisfied()
        && tools.satisfied()
        && average_score.passing
        && not_at_risk;

    OnboardingRequirements {
        modules,
        procedures,
        tools,
        average_score,
        not_at_risk,
        overall_percentage,
        overall_complete,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContentItem, ContentKind};

    fn catalog(mandatory_modules: usize, mandatory_procedures: usize) -> Catalog {
        let mut c = Catalog::default();
        for n in 0..mandatory_modules {
            c.push(ContentItem::new(&format!("m{}", n), "M", ContentKind::Module).mandatory());
        }
        for n in 0..mandatory_procedures {
            c.push(
                ContentItem::new(&format!("p{}", n), "P", ContentKind::Procedure).mandatory(),
            );
        }
        c
    }

    #[test]
    fn test_passing_boundary_exact_70() {
        let mut profile = LearnerProfile::new("sam", "support");
        profile.record_score("a1", 70.0);
        let reqs = evaluate(&profile, &catalog(0, 0));
        assert!(reqs.average_score.passing);

        profile.record_score("a1", 69.999);
        let reqs = evaluate(&profile, &catalog(0, 0));
        assert!(!reqs.average_score.passing);
    }

    #[test]
    fn test_tools_percentage_truncates() {
        let mut profile = LearnerProfile::new("sam", "support");
        profile.explored_tools.insert("t1".into());
        profile.explored_tools.insert("t2".into());
        let reqs = evaluate(&profile, &catalog(0, 0));
        assert_eq!(reqs.tools.percentage, 66);

        profile.explored_tools.insert("t3".into());
        let reqs = evaluate(&profile, &catalog(0, 0));
        assert_eq!(reqs.tools.percentage, 100);

        // A fourth tool does not push past 100.
        profile.explored_tools.insert("t4".into());
        let reqs = evaluate(&profile, &catalog(0, 0));
        assert_eq!(reqs.tools.percentage, 100);
    }

    #[test]
    fn test_scenario_half_modules_passing_score() {
        // 4 mandatory modules, 2 done, scores [80, 60]:
        // modules 50% -> 25 weighted, passing bonus 10, total 35.
        let mut profile = LearnerProfile::new("sam", "support");
        profile.mark_completed("m0");
        profile.mark_completed("m1");
        profile.record_score("m0", 80.0);
        profile.record_score("m1", 60.0);
        let reqs = evaluate(&profile, &catalog(4, 0));
        assert_eq!(reqs.modules.percentage, 50);
        assert!(reqs.average_score.passing);
        assert_eq!(reqs.overall_percentage, 35);
        assert!(!reqs.overall_complete);
    }

    #[test]
    fn test_overall_complete_requires_all_five() {
        let mut profile = LearnerProfile::new("sam", "support");
        profile.mark_completed("m0");
        profile.completed_procedures.insert("p0".into());
        for t in ["t1", "t2", "t3"] {
            profile.explored_tools.insert(t.into());
        }
        profile.record_score("m0", 85.0);
        let c = catalog(1, 1);

        let reqs = evaluate(&profile, &c);
        assert!(reqs.overall_complete);

        // Any single failed sub-condition flips the gate.
        profile.tier = Tier::AtRisk;
        let reqs = evaluate(&profile, &c);
        assert!(!reqs.not_at_risk);
        assert!(!reqs.overall_complete);
    }

    #[test]
    fn test_weighted_percentage_capped() {
        let mut profile = LearnerProfile::new("sam", "support");
        profile.mark_completed("m0");
        profile.completed_procedures.insert("p0".into());
        for t in ["t1", "t2", "t3"] {
            profile.explored_tools.insert(t.into());
        }
        profile.record_score("m0", 95.0);
        let reqs = evaluate(&profile, &catalog(1, 1));
        assert_eq!(reqs.overall_percentage, 100);
    }

    #[test]
    fn test_empty_requirement_is_zero_percent_but_satisfied() {
        let profile = LearnerProfile::new("sam", "support");
        let reqs = evaluate(&profile, &catalog(0, 0));
        assert_eq!(reqs.modules.percentage, 0);
        assert!(reqs.modules.satisfied());
    }

    #[test]
    fn test_procedures_counted_from_either_record() {
        let mut profile = LearnerProfile::new("sam", "support");
        // One marked through the procedure path, one through item completion.
        profile.completed_procedures.insert("p0".into());
        profile.mark_completed("p1");
        let reqs = evaluate(&profile, &catalog(0, 2));
        assert_eq!(reqs.procedures.completed, 2);
        assert_eq!(reqs.procedures.percentage, 100);
    }
}
