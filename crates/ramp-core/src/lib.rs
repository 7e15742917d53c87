//! Core engine for the Ramp adaptive onboarding platform.
//!
//! Classifies each learner into a performance tier, gates content behind a
//! prerequisite graph and a global remediation gate, evaluates weighted
//! onboarding requirements, and resolves tier-specific content variants.
//! Everything here is computation over in-memory records; the content
//! backend, persistence, and notification delivery live behind traits and
//! are wired up by the daemon.

pub mod access;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod events;
pub mod learner;
pub mod model;
pub mod recommend;
pub mod requirements;
pub mod tiers;

pub use catalog::{CatalogCache, CatalogResolver, ContentSource, StaticSource};
pub use engine::{Engine, MutationOutcome};
pub use error::RampError;
pub use events::DomainEvent;
pub use learner::{LearnerId, LearnerProfile, SubProgress, SubProgressKind, TierRecord};
pub use model::{
    Catalog, ContentItem, ContentKind, ContentVariant, Difficulty, ItemRole, RawCatalog, Tier,
};
pub use requirements::{OnboardingRequirements, MIN_TOOLS, PASSING_SCORE};
