//! Content catalog data model.
//!
//! Base content records come from the content backend; variants are
//! tier-scoped overlays merged onto them at resolution time. Items carry a
//! closed `ItemRole` computed once during resolution so downstream components
//! branch on a type, never on category strings.

use serde::{Deserialize, Serialize};

/// Category names the content team uses to flag remediation material.
pub const REMEDIAL_CATEGORIES: &[&str] = &["Remedial", "At-Risk Support"];

/// Learner performance tier.
/// Order is pinned for deterministic serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Rookie,
    AtRisk,
    HighFlyer,
}

impl Default for Tier {
    fn default() -> Self {
        Self::Rookie
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rookie => write!(f, "rookie"),
            Self::AtRisk => write!(f, "at_risk"),
            Self::HighFlyer => write!(f, "high_flyer"),
        }
    }
}

impl std::str::FromStr for Tier {
    type Err = String;

    /// Accepts both the wire spelling ("AT_RISK") and the serde spelling
    /// ("at_risk"); the content backend is not consistent about case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "rookie" => Ok(Self::Rookie),
            "at_risk" | "atrisk" => Ok(Self::AtRisk),
            "high_flyer" | "highflyer" => Ok(Self::HighFlyer),
            other => Err(format!("unknown tier: {}", other)),
        }
    }
}

/// Kind of content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Module,
    Procedure,
    Tool,
}

impl std::fmt::Display for ContentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Module => write!(f, "module"),
            Self::Procedure => write!(f, "procedure"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// Difficulty tag from the content backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::Beginner
    }
}

/// Role of an item in the adaptive flow, computed once at resolution time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRole {
    /// Regular catalog content.
    Standard,
    /// Brings an at-risk learner back to baseline; gates everything else.
    Remedial,
    /// Stretch content surfaced first for high flyers.
    Challenge,
}

impl Default for ItemRole {
    fn default() -> Self {
        Self::Standard
    }
}

/// A single content item as the core sees it after resolution.
/// Immutable within one resolution call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub kind: ContentKind,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub mandatory: bool,
    /// Explicit ordering rank; unranked items sort last.
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Ids of items that must be completed first.
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Tiers that may see this item; empty means every tier.
    #[serde(default)]
    pub tier_affinity: Vec<Tier>,
    /// Filled in by the catalog resolver.
    #[serde(default)]
    pub role: ItemRole,
}

impl ContentItem {
    pub fn new(id: &str, title: &str, kind: ContentKind) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            kind,
            category: String::new(),
            mandatory: false,
            rank: None,
            difficulty: Difficulty::Beginner,
            tags: Vec::new(),
            prerequisites: Vec::new(),
            tier_affinity: Vec::new(),
            role: ItemRole::Standard,
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn with_rank(mut self, rank: u32) -> Self {
        self.rank = Some(rank);
        self
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_prerequisites(mut self, ids: &[&str]) -> Self {
        self.prerequisites = ids.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_affinity(mut self, tiers: &[Tier]) -> Self {
        self.tier_affinity = tiers.to_vec();
        self
    }

    /// Whether the item belongs in the catalog resolved for `tier`.
    /// The at-risk catalog unions the rookie catalog with at-risk-only items
    /// so remediation always covers every rookie prerequisite.
    pub fn visible_to(&self, tier: Tier) -> bool {
        if self.tier_affinity.is_empty() {
            return true;
        }
        match tier {
            Tier::AtRisk => {
                self.tier_affinity.contains(&Tier::AtRisk)
                    || self.tier_affinity.contains(&Tier::Rookie)
            }
            t => self.tier_affinity.contains(&t),
        }
    }

    /// Classify the item's role. Remedial wins over challenge when both match.
    pub fn classify_role(&self) -> ItemRole {
        let remedial_category = REMEDIAL_CATEGORIES.contains(&self.category.as_str());
        let at_risk_only = self.tier_affinity.contains(&Tier::AtRisk)
            && !self.tier_affinity.contains(&Tier::Rookie);
        if remedial_category || at_risk_only {
            return ItemRole::Remedial;
        }

        let challenge = self.rank == Some(0)
            || self.tags.iter().any(|t| t == "challenge-pro")
            || self.title.to_lowercase().contains("pro:")
            || self.difficulty == Difficulty::Advanced;
        if challenge {
            ItemRole::Challenge
        } else {
            ItemRole::Standard
        }
    }
}

/// A tier-scoped override of a base content item.
/// Only the fields named in `change_set` are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentVariant {
    pub base_item_id: String,
    pub tier: Tier,
    /// Team the variant is scoped to; `None` applies to every team.
    #[serde(default)]
    pub team: Option<String>,
    /// Field names this variant is authorized to override.
    #[serde(default)]
    pub change_set: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub mandatory: Option<bool>,
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub prerequisites: Option<Vec<String>>,
}

/// Unresolved catalog data as fetched from the content backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawCatalog {
    pub items: Vec<ContentItem>,
    pub variants: Vec<ContentVariant>,
}

/// A resolved, tier-filtered catalog for one (tier, team) pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub modules: Vec<ContentItem>,
    pub procedures: Vec<ContentItem>,
    pub tools: Vec<ContentItem>,
}

impl Catalog {
    pub fn all(&self) -> impl Iterator<Item = &ContentItem> {
        self.modules
            .iter()
            .chain(self.procedures.iter())
            .chain(self.tools.iter())
    }

    pub fn find(&self, id: &str) -> Option<&ContentItem> {
        self.all().find(|i| i.id == id)
    }

    pub fn remedial(&self) -> impl Iterator<Item = &ContentItem> {
        self.all().filter(|i| i.role == ItemRole::Remedial)
    }

    pub fn len(&self) -> usize {
        self.modules.len() + self.procedures.len() + self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn push(&mut self, item: ContentItem) {
        match item.kind {
            ContentKind::Module => self.modules.push(item),
            ContentKind::Procedure => self.procedures.push(item),
            ContentKind::Tool => self.tools.push(item),
        }
    }
}
