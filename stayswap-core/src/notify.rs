use stayswap_shared::events::NotificationEvent;
use tokio::sync::broadcast;

/// Fire-and-forget notification fan-out.
///
/// Implementations must never fail the caller: a lost notification is logged
/// and swallowed, it never rolls back engine state.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: NotificationEvent);
}

/// Publishes onto a broadcast channel (SSE subscribers, workers).
pub struct BroadcastNotifier {
    tx: broadcast::Sender<NotificationEvent>,
}

impl BroadcastNotifier {
    pub fn new(tx: broadcast::Sender<NotificationEvent>) -> Self {
        Self { tx }
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, event: NotificationEvent) {
        // Send only errors when there are no subscribers, which is fine.
        if let Err(e) = self.tx.send(event) {
            tracing::debug!("No notification subscribers: {}", e);
        }
    }
}

/// Logs notifications; the default sink for tests and local runs.
pub struct LoggingNotifier;

impl Notifier for LoggingNotifier {
    fn notify(&self, event: NotificationEvent) {
        tracing::info!("Notification: {:?}", event);
    }
}
