use tokio::sync::broadcast;

use crate::alerts::Alert;

/// Fan-out of newly stored alerts to real-time subscribers. Best-effort: a
/// disconnected or lagging subscriber misses messages and resyncs from a
/// fresh snapshot on reconnect, never from replayed history.
#[derive(Clone)]
pub struct AlertBroadcaster {
    tx: broadcast::Sender<Alert>,
}

impl AlertBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Alert> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn publish(&self, alert: &Alert) {
        // Err just means nobody is listening right now.
        if self.tx.send(alert.clone()).is_err() {
            tracing::debug!(
                target: "toolwatch.alerts",
                alert_id = %alert.id,
                "no subscribers connected, alert not fanned out"
            );
        }
    }
}

impl Default for AlertBroadcaster {
    fn default() -> Self {
        Self::new(64)
    }
}
