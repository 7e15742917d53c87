//! Learner profile persistence.
//!
//! One JSON file per learner under the data dir. Writes are debounced: a
//! mutation schedules a flush after a quiet period, a newer mutation for the
//! same learner cancels and reschedules it, and shutdown flushes everything
//! still pending. The queue always writes the latest snapshot it was handed,
//! never an older one.

use anyhow::{Context, Result};
use ramp_core::LearnerProfile;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// File-backed profile store.
pub struct ProfileStore {
    dir: PathBuf,
}

fn file_key(name: &str, team: &str) -> String {
    let sanitize = |s: &str| {
        s.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect::<String>()
    };
    format!("{}__{}.json", sanitize(name), sanitize(team))
}

impl ProfileStore {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }

    pub fn save(&self, profile: &LearnerProfile) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating data dir {}", self.dir.display()))?;
        let path = self.dir.join(file_key(&profile.id.name, &profile.id.team));
        let json = serde_json::to_string_pretty(profile)?;
        // Write through a temp file so a crash never leaves a torn profile.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("writing profile {}", path.display()))?;
        Ok(())
    }

    pub fn load(&self, name: &str, team: &str) -> Option<LearnerProfile> {
        let path = self.dir.join(file_key(name, team));
        let raw = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("profile file {} unreadable: {}", path.display(), e);
                None
            }
        }
    }
}

struct Pending {
    handle: JoinHandle<()>,
    latest: LearnerProfile,
}

/// Debounced flush queue with one pending write per learner.
pub struct FlushQueue {
    store: Arc<ProfileStore>,
    quiet: Duration,
    pending: Arc<Mutex<HashMap<String, Pending>>>,
}

impl FlushQueue {
    pub fn new(store: Arc<ProfileStore>, quiet: Duration) -> Self {
        Self {
            store,
            quiet,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Schedule a write of this snapshot. Any flush already pending for the
    /// same learner is cancelled and replaced.
    pub async fn schedule(&self, profile: LearnerProfile) {
        let key = file_key(&profile.id.name, &profile.id.team);
        let mut pending = self.pending.lock().await;
        if let Some(old) = pending.remove(&key) {
            old.handle.abort();
        }

        let store = Arc::clone(&self.store);
        let map = Arc::clone(&self.pending);
        let quiet = self.quiet;
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            let taken = map.lock().await.remove(&task_key);
            if let Some(p) = taken {
                if let Err(e) = store.save(&p.latest) {
                    warn!("profile flush failed for {}: {}", p.latest.id, e);
                }
            }
        });

        pending.insert(
            key,
            Pending {
                handle,
                latest: profile,
            },
        );
    }

    /// Flush every pending profile immediately. Called on shutdown.
    pub async fn shutdown(&self) {
        let mut pending = self.pending.lock().await;
        let drained: Vec<Pending> = pending.drain().map(|(_, p)| p).collect();
        drop(pending);

        for p in drained {
            p.handle.abort();
            if let Err(e) = self.store.save(&p.latest) {
                warn!("shutdown flush failed for {}: {}", p.latest.id, e);
            }
        }
        info!("flush queue drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ramp_core::Tier;

    #[test]
    fn test_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());

        let mut profile = LearnerProfile::new("dana", "support");
        profile.mark_completed("m1");
        profile.record_score("m1", 82.0);
        store.save(&profile).unwrap();

        let loaded = store.load("dana", "support").unwrap();
        assert_eq!(loaded.id, profile.id);
        assert_eq!(loaded.completed_ids, profile.completed_ids);
        assert_eq!(loaded.tier, Tier::Rookie);
    }

    #[test]
    fn test_load_missing_profile() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path());
        assert!(store.load("ghost", "nowhere").is_none());
    }

    #[test]
    fn test_file_key_sanitizes() {
        let key = file_key("dana o'brien", "tier-1/support");
        assert!(!key.contains('/'));
        assert!(!key.contains('\''));
        assert!(key.ends_with(".json"));
    }

    #[tokio::test]
    async fn test_flush_queue_coalesces_rapid_mutations() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ProfileStore::new(dir.path()));
        let queue = FlushQueue::new(Arc::clone(&store), Duration::from_millis(50));

        let mut profile = LearnerProfile::new("dana", "support");
        queue.schedule(profile.clone()).await;
        profile.mark_completed("m1");
        queue.schedule(profile.clone()).await;
        profile.mark_completed("m2");
        queue.schedule(profile.clone()).await;

        tokio::time::sleep(Duration::from_millis(150)).await;

        // Only the latest snapshot was written.
        let loaded = store.load("dana", "support").unwrap();
        assert_eq!(loaded.completed_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_flushes_pending_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(ProfileStore::new(dir.path()));
        let queue = FlushQueue::new(Arc::clone(&store), Duration::from_secs(60));

        let mut profile = LearnerProfile::new("dana", "support");
        profile.mark_completed("m1");
        queue.schedule(profile).await;

        // Quiet period has not elapsed; shutdown must still write.
        queue.shutdown().await;
        let loaded = store.load("dana", "support").unwrap();
        assert_eq!(loaded.completed_ids, vec!["m1".to_string()]);
    }
}
