//! Domain events emitted by the tier state machine and engine mutators.
//!
//! The core never formats notification messages or knows about delivery
//! channels; it hands these records to the notification collaborator.

use crate::learner::LearnerId;
use crate::model::Tier;
use serde::{Deserialize, Serialize};

/// An externally observable state change for one learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    TierChanged {
        learner: LearnerId,
        from: Tier,
        to: Tier,
    },
    AtRiskEntered {
        learner: LearnerId,
        /// Score that triggered the intervention, if score-triggered.
        score_context: Option<f64>,
    },
    AtRiskRecovered {
        learner: LearnerId,
        score_context: Option<f64>,
    },
    OnboardingCompleted {
        learner: LearnerId,
    },
    InterventionRecorded {
        learner: LearnerId,
        /// Total interventions recorded for this learner so far.
        count: u32,
    },
}

impl DomainEvent {
    pub fn learner(&self) -> &LearnerId {
        match self {
            Self::TierChanged { learner, .. }
            | Self::AtRiskEntered { learner, .. }
            | Self::AtRiskRecovered { learner, .. }
            | Self::OnboardingCompleted { learner }
            | Self::InterventionRecorded { learner, .. } => learner,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::TierChanged { .. } => "tier_changed",
            Self::AtRiskEntered { .. } => "at_risk_entered",
            Self::AtRiskRecovered { .. } => "at_risk_recovered",
            Self::OnboardingCompleted { .. } => "onboarding_completed",
            Self::InterventionRecorded { .. } => "intervention_recorded",
        }
    }

    /// Whether the notification collaborator must be told about this event.
    pub fn must_notify(&self) -> bool {
        matches!(
            self,
            Self::AtRiskEntered { .. }
                | Self::AtRiskRecovered { .. }
                | Self::OnboardingCompleted { .. }
        )
    }
}
