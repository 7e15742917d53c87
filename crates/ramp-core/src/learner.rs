//! Learner profile and progress bookkeeping.
//!
//! The profile is the single mutable record the engine operates on. Three
//! invariants hold at all times: the current tier equals the last tier
//! history entry, the completed-id set never shrinks, and the onboarding
//! flag is never cleared once set.

use crate::model::Tier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Identifies a learner within their team.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LearnerId {
    pub name: String,
    pub team: String,
}

impl LearnerId {
    pub fn new(name: &str, team: &str) -> Self {
        Self {
            name: name.to_string(),
            team: team.to_string(),
        }
    }
}

impl std::fmt::Display for LearnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.team)
    }
}

/// Per-item sub-module progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProgress {
    pub content_viewed: bool,
    pub media_viewed: bool,
}

/// Which part of a sub-module was consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubProgressKind {
    Content,
    Media,
}

/// One tier transition, appended on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRecord {
    pub tier: Tier,
    pub at: DateTime<Utc>,
}

/// The learner record. Created at first login, mutated by every completion
/// and tier event, never deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub id: LearnerId,
    pub tier: Tier,
    /// Completed item ids, insertion-ordered, set semantics.
    pub completed_ids: Vec<String>,
    /// Item id -> latest assessment score.
    pub scores: HashMap<String, f64>,
    /// Item id -> sub-module progress.
    pub sub_progress: HashMap<String, SubProgress>,
    pub completed_procedures: BTreeSet<String>,
    pub explored_tools: BTreeSet<String>,
    pub total_time_secs: u64,
    pub interventions_received: u32,
    pub onboarding_complete: bool,
    pub onboarding_completed_at: Option<DateTime<Utc>>,
    pub tier_history: Vec<TierRecord>,
}

impl LearnerProfile {
    pub fn new(name: &str, team: &str) -> Self {
        let now = Utc::now();
        Self {
            id: LearnerId::new(name, team),
            tier: Tier::Rookie,
            completed_ids: Vec::new(),
            scores: HashMap::new(),
            sub_progress: HashMap::new(),
            completed_procedures: BTreeSet::new(),
            explored_tools: BTreeSet::new(),
            total_time_secs: 0,
            interventions_received: 0,
            onboarding_complete: false,
            onboarding_completed_at: None,
            tier_history: vec![TierRecord {
                tier: Tier::Rookie,
                at: now,
            }],
        }
    }

    pub fn is_completed(&self, id: &str) -> bool {
        self.completed_ids.iter().any(|c| c == id)
    }

    /// Mark an item completed. Returns true when it was newly added;
    /// re-completing is a no-op against the set.
    pub fn mark_completed(&mut self, id: &str) -> bool {
        if self.is_completed(id) {
            return false;
        }
        self.completed_ids.push(id.to_string());
        true
    }

    pub fn record_score(&mut self, id: &str, score: f64) {
        self.scores.insert(id.to_string(), score);
    }

    /// Running average of all recorded scores; 0 when none.
    pub fn average_score(&self) -> f64 {
        if self.scores.is_empty() {
            return 0.0;
        }
        self.scores.values().sum::<f64>() / self.scores.len() as f64
    }

    pub fn mark_sub_progress(&mut self, id: &str, kind: SubProgressKind) {
        let entry = self.sub_progress.entry(id.to_string()).or_default();
        match kind {
            SubProgressKind::Content => entry.content_viewed = true,
            SubProgressKind::Media => entry.media_viewed = true,
        }
    }

    /// Move to a new tier, keeping the history invariant.
    pub fn push_tier(&mut self, tier: Tier, at: DateTime<Utc>) {
        self.tier = tier;
        self.tier_history.push(TierRecord { tier, at });
    }

    /// Set the onboarding flag. Returns true only on the first call;
    /// the flag is irreversible.
    pub fn complete_onboarding(&mut self, at: DateTime<Utc>) -> bool {
        if self.onboarding_complete {
            return false;
        }
        self.onboarding_complete = true;
        self.onboarding_completed_at = Some(at);
        true
    }
}
