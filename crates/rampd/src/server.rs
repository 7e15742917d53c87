//! HTTP API for rampd.
//!
//! Thin JSON wrappers around the engine. The recoverable error taxonomy
//! (backend unavailable, malformed records, dangling references) never
//! surfaces as a 5xx; handlers return best-effort results.

use crate::backend::HttpContentSource;
use crate::notify::Notifier;
use crate::store::{FlushQueue, ProfileStore};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use ramp_core::{
    Catalog, ContentItem, DomainEvent, Engine, LearnerProfile, OnboardingRequirements,
    SubProgressKind,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers.
pub struct AppState {
    pub engine: Mutex<Engine<HttpContentSource>>,
    pub profiles: Mutex<HashMap<String, LearnerProfile>>,
    pub store: Arc<ProfileStore>,
    pub flush: FlushQueue,
    pub notifier: Notifier,
    /// Best-effort settle delay after a tier change, before the next
    /// catalog fetch can observe the new tier.
    pub tier_settle: Duration,
}

type AppStateArc = Arc<AppState>;

#[derive(Debug, Deserialize)]
pub struct LearnerQuery {
    pub learner: String,
    pub team: String,
}

#[derive(Debug, Deserialize)]
pub struct MutationRequest {
    pub learner: String,
    pub team: String,
    pub item_id: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub kind: Option<SubProgressKind>,
}

#[derive(Debug, Serialize)]
pub struct MutationResponse {
    pub profile: LearnerProfile,
    pub events: Vec<DomainEvent>,
}

#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub accessible: bool,
    pub blocking: Vec<ContentItem>,
}

fn profile_key(learner: &str, team: &str) -> String {
    format!("{}@{}", learner, team)
}

async fn get_or_create(state: &AppState, learner: &str, team: &str) -> LearnerProfile {
    let mut profiles = state.profiles.lock().await;
    if let Some(profile) = profiles.get(&profile_key(learner, team)) {
        return profile.clone();
    }
    let profile = state
        .store
        .load(learner, team)
        .unwrap_or_else(|| {
            info!("creating profile for {}@{}", learner, team);
            LearnerProfile::new(learner, team)
        });
    profiles.insert(profile_key(learner, team), profile.clone());
    profile
}

async fn store_back(state: &AppState, profile: &LearnerProfile) {
    state.profiles.lock().await.insert(
        profile_key(&profile.id.name, &profile.id.team),
        profile.clone(),
    );
}

/// Common tail of every mutator: persist, notify, settle after tier change.
async fn finish_mutation(
    state: &AppState,
    profile: LearnerProfile,
    events: Vec<DomainEvent>,
) -> Json<MutationResponse> {
    store_back(state, &profile).await;
    state.flush.schedule(profile.clone()).await;
    state.notifier.dispatch(&events);
    if events
        .iter()
        .any(|e| matches!(e, DomainEvent::TierChanged { .. }))
    {
        // Give attribute propagation a moment before anyone re-fetches the
        // catalog for the new tier.
        tokio::time::sleep(state.tier_settle).await;
    }
    Json(MutationResponse { profile, events })
}

async fn get_catalog(
    State(state): State<AppStateArc>,
    Query(q): Query<LearnerQuery>,
) -> Json<Catalog> {
    let profile = get_or_create(&state, &q.learner, &q.team).await;
    let catalog = state.engine.lock().await.resolve_catalog(&profile).await;
    Json(catalog)
}

async fn get_modules(
    State(state): State<AppStateArc>,
    Query(q): Query<LearnerQuery>,
) -> Json<Vec<ContentItem>> {
    let profile = get_or_create(&state, &q.learner, &q.team).await;
    let modules = state.engine.lock().await.sorted_modules(&profile).await;
    Json(modules)
}

async fn get_next(
    State(state): State<AppStateArc>,
    Query(q): Query<LearnerQuery>,
) -> Json<Option<ContentItem>> {
    let profile = get_or_create(&state, &q.learner, &q.team).await;
    let next = state.engine.lock().await.next_recommended(&profile).await;
    Json(next)
}

async fn get_requirements(
    State(state): State<AppStateArc>,
    Query(q): Query<LearnerQuery>,
) -> Json<OnboardingRequirements> {
    let profile = get_or_create(&state, &q.learner, &q.team).await;
    let reqs = state.engine.lock().await.evaluate(&profile).await;
    Json(reqs)
}

async fn get_access(
    State(state): State<AppStateArc>,
    Path(item_id): Path<String>,
    Query(q): Query<LearnerQuery>,
) -> Json<AccessResponse> {
    let profile = get_or_create(&state, &q.learner, &q.team).await;
    let mut engine = state.engine.lock().await;
    let accessible = engine.can_access(&profile, &item_id).await;
    let blocking = if accessible {
        Vec::new()
    } else {
        engine.unmet_prerequisites(&profile, &item_id).await
    };
    Json(AccessResponse {
        accessible,
        blocking,
    })
}

async fn post_complete(
    State(state): State<AppStateArc>,
    Json(req): Json<MutationRequest>,
) -> Json<MutationResponse> {
    let mut profile = get_or_create(&state, &req.learner, &req.team).await;
    let outcome = state
        .engine
        .lock()
        .await
        .complete_item(&mut profile, &req.item_id, req.score)
        .await;
    finish_mutation(&state, outcome.profile, outcome.events).await
}

async fn post_progress(
    State(state): State<AppStateArc>,
    Json(req): Json<MutationRequest>,
) -> Json<MutationResponse> {
    let mut profile = get_or_create(&state, &req.learner, &req.team).await;
    let kind = req.kind.unwrap_or(SubProgressKind::Content);
    let outcome = state
        .engine
        .lock()
        .await
        .mark_sub_progress(&mut profile, &req.item_id, kind)
        .await;
    finish_mutation(&state, outcome.profile, outcome.events).await
}

async fn post_procedure(
    State(state): State<AppStateArc>,
    Json(req): Json<MutationRequest>,
) -> Json<MutationResponse> {
    let mut profile = get_or_create(&state, &req.learner, &req.team).await;
    let outcome = state
        .engine
        .lock()
        .await
        .mark_procedure_complete(&mut profile, &req.item_id)
        .await;
    finish_mutation(&state, outcome.profile, outcome.events).await
}

async fn post_tool(
    State(state): State<AppStateArc>,
    Json(req): Json<MutationRequest>,
) -> Json<MutationResponse> {
    let mut profile = get_or_create(&state, &req.learner, &req.team).await;
    let outcome = state
        .engine
        .lock()
        .await
        .mark_tool_explored(&mut profile, &req.item_id)
        .await;
    finish_mutation(&state, outcome.profile, outcome.events).await
}

pub fn router(state: AppStateArc) -> Router {
    Router::new()
        .route("/v1/catalog", get(get_catalog))
        .route("/v1/modules", get(get_modules))
        .route("/v1/next", get(get_next))
        .route("/v1/requirements", get(get_requirements))
        .route("/v1/access/:item_id", get(get_access))
        .route("/v1/complete", post(post_complete))
        .route("/v1/progress", post(post_progress))
        .route("/v1/procedure", post(post_procedure))
        .route("/v1/tool", post(post_tool))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until shutdown, then drain the flush queue.
pub async fn run(state: AppStateArc, listen_addr: &str) -> Result<()> {
    let app = router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    info!("listening on http://{}", listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;

    state.flush.shutdown().await;
    Ok(())
}
