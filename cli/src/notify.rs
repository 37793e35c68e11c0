//! Webhook alert delivery: JSON POST per alert at or above the configured
//! severity, rate limited so a burst cannot flood the receiver. Delivery
//! failures are logged and never propagate into the pipeline.

use std::time::{Duration, Instant};

use toolwatch_core::alerts::{Alert, AlertBroadcaster};

use crate::config::NotifyConfig;

pub struct WebhookNotifier {
    client: reqwest::Client,
    config: NotifyConfig,
    last_sent: Option<Instant>,
}

impl WebhookNotifier {
    pub fn new(config: NotifyConfig) -> Self {
        // Fails only when the TLS backend cannot initialize.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("webhook http client");
        Self {
            client,
            config,
            last_sent: None,
        }
    }

    fn should_send(&self, alert: &Alert, now: Instant) -> bool {
        if !self.config.enabled || self.config.webhook_url.is_none() {
            return false;
        }
        if alert.severity < self.config.min_severity {
            return false;
        }
        match self.last_sent {
            Some(at) => now.duration_since(at) >= Duration::from_secs(self.config.rate_limit_secs),
            None => true,
        }
    }

    pub async fn deliver(&mut self, alert: &Alert) {
        let now = Instant::now();
        if !self.should_send(alert, now) {
            return;
        }
        let url = match &self.config.webhook_url {
            Some(u) => u.clone(),
            None => return,
        };

        match self.client.post(&url).json(alert).send().await {
            Ok(resp) if resp.status().is_success() => {
                self.last_sent = Some(now);
                tracing::debug!(
                    target: "toolwatch.notify",
                    alert_id = %alert.id,
                    "webhook delivered"
                );
            }
            Ok(resp) => {
                tracing::warn!(
                    target: "toolwatch.notify",
                    status = %resp.status(),
                    "webhook rejected alert"
                );
            }
            Err(e) => {
                tracing::warn!(
                    target: "toolwatch.notify",
                    error = %e,
                    "webhook delivery failed"
                );
            }
        }
    }
}

/// Subscribe to the broadcast feed and deliver each alert. Lagged
/// receivers just skip ahead; the webhook is best-effort by design.
pub fn spawn(config: NotifyConfig, broadcaster: AlertBroadcaster) -> tokio::task::JoinHandle<()> {
    let mut rx = broadcaster.subscribe();
    tokio::spawn(async move {
        let mut notifier = WebhookNotifier::new(config);
        loop {
            match rx.recv().await {
                Ok(alert) => notifier.deliver(&alert).await,
                Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::debug!(
                        target: "toolwatch.notify",
                        missed,
                        "notifier lagged behind the alert feed"
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
