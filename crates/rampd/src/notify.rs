//! Notification dispatch for domain events.
//!
//! The core hands over structured events; this module decides where they
//! go. Every event is logged; must-notify events are additionally posted to
//! the configured webhook, fire-and-forget.

use ramp_core::DomainEvent;
use std::time::Duration;
use tracing::{info, warn};

pub struct Notifier {
    client: reqwest::Client,
    webhook_url: Option<String>,
}

impl Notifier {
    pub fn new(webhook_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_default();
        Self {
            client,
            webhook_url,
        }
    }

    /// Dispatch a batch of events from one mutation.
    pub fn dispatch(&self, events: &[DomainEvent]) {
        for event in events {
            info!("domain event {} for {}", event.kind(), event.learner());
            if !event.must_notify() {
                continue;
            }
            let Some(url) = self.webhook_url.clone() else {
                continue;
            };
            let client = self.client.clone();
            let payload = event.clone();
            tokio::spawn(async move {
                let result = client.post(&url).json(&payload).send().await;
                match result {
                    Ok(resp) if resp.status().is_success() => {}
                    Ok(resp) => warn!(
                        "webhook returned {} for {} event",
                        resp.status(),
                        payload.kind()
                    ),
                    Err(e) => warn!("webhook delivery failed: {}", e),
                }
            });
        }
    }
}
