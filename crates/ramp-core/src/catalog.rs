//! Content catalog resolution and caching.
//!
//! Merges tier-scoped variant overlays onto base items, filters for the
//! requesting tier, classifies item roles, and validates the prerequisite
//! graph. Resolved catalogs are cached per (tier, team) with a short TTL;
//! the cache is an explicit object owned by the resolver, never
//! process-global, so the engine stays testable.

use crate::error::RampError;
use crate::model::{Catalog, ContentItem, ContentVariant, RawCatalog, Tier};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Boundary to the content-management backend.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetch all base items and variants for a team.
    async fn fetch(&self, team: &str) -> Result<RawCatalog, RampError>;
}

/// In-memory source for tests and fixtures.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    pub raw: RawCatalog,
    pub fail: bool,
}

#[async_trait]
impl ContentSource for StaticSource {
    async fn fetch(&self, _team: &str) -> Result<RawCatalog, RampError> {
        if self.fail {
            return Err(RampError::Backend("static source set to fail".into()));
        }
        Ok(self.raw.clone())
    }
}

struct CacheEntry {
    catalog: Catalog,
    inserted_at: Instant,
}

/// Per-(tier, team) catalog cache with TTL and last-good fallback.
pub struct CatalogCache {
    ttl: Duration,
    entries: HashMap<(Tier, String), CacheEntry>,
}

impl CatalogCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, tier: Tier, team: &str) -> Option<&Catalog> {
        self.entries
            .get(&(tier, team.to_string()))
            .filter(|e| e.inserted_at.elapsed() < self.ttl)
            .map(|e| &e.catalog)
    }

    /// Last known good catalog, ignoring the TTL. Used when the backend
    /// is unavailable.
    pub fn get_stale(&self, tier: Tier, team: &str) -> Option<&Catalog> {
        self.entries
            .get(&(tier, team.to_string()))
            .map(|e| &e.catalog)
    }

    pub fn insert(&mut self, tier: Tier, team: &str, catalog: Catalog) {
        self.entries.insert(
            (tier, team.to_string()),
            CacheEntry {
                catalog,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every tier's entry for a team. Called on tier change so the
    /// next resolution sees fresh variant selections.
    pub fn invalidate_team(&mut self, team: &str) {
        self.entries.retain(|(_, t), _| t != team);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves catalogs against a content source, caching per (tier, team).
pub struct CatalogResolver<S: ContentSource> {
    source: S,
    cache: CatalogCache,
}

impl<S: ContentSource> CatalogResolver<S> {
    pub fn new(source: S, ttl: Duration) -> Self {
        Self {
            source,
            cache: CatalogCache::new(ttl),
        }
    }

    /// Resolve the catalog for a (tier, team) pair. Never fails: on backend
    /// error the last good catalog for the key is served, or an empty
    /// catalog when none exists.
    pub async fn resolve(&mut self, tier: Tier, team: &str) -> Catalog {
        if let Some(cached) = self.cache.get(tier, team) {
            return cached.clone();
        }

        match self.source.fetch(team).await {
            Ok(raw) => {
                let catalog = build_catalog(&raw, tier, team);
                self.cache.insert(tier, team, catalog.clone());
                catalog
            }
            Err(err) => {
                warn!("catalog fetch failed for {}/{}: {}", tier, team, err);
                self.cache
                    .get_stale(tier, team)
                    .cloned()
                    .unwrap_or_default()
            }
        }
    }

    pub fn invalidate_team(&mut self, team: &str) {
        self.cache.invalidate_team(team);
    }
}

/// Build the resolved catalog for one tier: variant merge, tier filter,
/// role classification, prerequisite validation.
pub fn build_catalog(raw: &RawCatalog, tier: Tier, team: &str) -> Catalog {
    let known_ids: HashSet<&str> = raw.items.iter().map(|i| i.id.as_str()).collect();

    // First matching variant per (base, tier) is authoritative.
    let mut variants: HashMap<&str, &ContentVariant> = HashMap::new();
    for variant in &raw.variants {
        if variant.tier != tier {
            continue;
        }
        if let Some(scope) = &variant.team {
            if scope != team {
                continue;
            }
        }
        if !known_ids.contains(variant.base_item_id.as_str()) {
            warn!(
                "dropping variant: {}",
                RampError::MissingReference(variant.base_item_id.clone())
            );
            continue;
        }
        variants.entry(variant.base_item_id.as_str()).or_insert(variant);
    }

    let mut catalog = Catalog::default();
    for base in &raw.items {
        if !base.visible_to(tier) {
            continue;
        }
        let mut item = match variants.get(base.id.as_str()) {
            Some(variant) => apply_variant(base, variant),
            None => base.clone(),
        };
        item.role = item.classify_role();
        catalog.push(item);
    }

    validate_prerequisites(&mut catalog);
    catalog
}

/// Merge a variant onto its base item, replacing only change-set fields.
fn apply_variant(base: &ContentItem, variant: &ContentVariant) -> ContentItem {
    let mut item = base.clone();
    for field in &variant.change_set {
        match field.as_str() {
            "title" => {
                if let Some(v) = &variant.title {
                    item.title = v.clone();
                }
            }
            "category" => {
                if let Some(v) = &variant.category {
                    item.category = v.clone();
                }
            }
            "mandatory" => {
                if let Some(v) = variant.mandatory {
                    item.mandatory = v;
                }
            }
            "rank" | "order" => {
                if variant.rank.is_some() {
                    item.rank = variant.rank;
                }
            }
            "difficulty" => {
                if let Some(v) = variant.difficulty {
                    item.difficulty = v;
                }
            }
            "tags" => {
                if let Some(v) = &variant.tags {
                    item.tags = v.clone();
                }
            }
            "prerequisites" => {
                if let Some(v) = &variant.prerequisites {
                    item.prerequisites = v.clone();
                }
            }
            other => {
                warn!(
                    "variant for {} names unknown change-set field {:?}",
                    base.id, other
                );
            }
        }
    }
    item
}

/// Kahn's topological sort over declared prerequisites. Items left after the
/// sort sit on a cycle; their in-cycle prerequisite edges are dropped so
/// access checks cannot deadlock the learner.
fn validate_prerequisites(catalog: &mut Catalog) {
    let ids: HashSet<String> = catalog.all().map(|i| i.id.clone()).collect();

    let mut indegree: HashMap<String, usize> = HashMap::new();
    let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
    for item in catalog.all() {
        let declared = item
            .prerequisites
            .iter()
            .filter(|p| ids.contains(*p))
            .count();
        indegree.insert(item.id.clone(), declared);
        for prereq in &item.prerequisites {
            if ids.contains(prereq) {
                dependents
                    .entry(prereq.clone())
                    .or_default()
                    .push(item.id.clone());
            }
        }
    }

    let mut queue: Vec<String> = indegree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(id, _)| id.clone())
        .collect();
    let mut resolved = 0usize;
    while let Some(id) = queue.pop() {
        resolved += 1;
        if let Some(deps) = dependents.get(&id) {
            for dep in deps.clone() {
                if let Some(d) = indegree.get_mut(&dep) {
                    if *d > 0 {
                        *d -= 1;
                        if *d == 0 {
                            queue.push(dep);
                        }
                    }
                }
            }
        }
    }

    if resolved == indegree.len() {
        return;
    }

    // Leftover nodes are cycle members plus everything downstream of a
    // cycle; prune leaves of the leftover subgraph until only the actual
    // cycle members remain.
    let mut cyclic: HashSet<String> = indegree
        .iter()
        .filter(|(_, d)| **d > 0)
        .map(|(id, _)| id.clone())
        .collect();
    loop {
        let leaves: Vec<String> = cyclic
            .iter()
            .filter(|id| {
                dependents
                    .get(*id)
                    .map(|deps| !deps.iter().any(|d| cyclic.contains(d)))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();
        if leaves.is_empty() {
            break;
        }
        for leaf in leaves {
            cyclic.remove(&leaf);
        }
    }
    warn!(
        "repairing catalog: {}",
        RampError::CyclicPrerequisites(cyclic.iter().cloned().collect())
    );

    for bucket in [
        &mut catalog.modules,
        &mut catalog.procedures,
        &mut catalog.tools,
    ] {
        for item in bucket.iter_mut() {
            if cyclic.contains(&item.id) {
                item.prerequisites.retain(|p| !cyclic.contains(p));
            }
        }
    }
    debug!("catalog validated with {} cyclic items repaired", cyclic.len());
}
