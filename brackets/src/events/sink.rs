//! Event sinks.

use super::models::BracketEvent;
use tokio::sync::broadcast;

/// Fire-and-forget receiver of bracket events
///
/// `emit` runs on the stage actor after a commit, so implementations must not
/// block or fail.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: BracketEvent);
}

/// Fans events out to any number of subscribers
///
/// Subscribers that fall behind lose the oldest events instead of slowing
/// the sender.
#[derive(Debug, Clone)]
pub struct BroadcastEventSink {
    sender: broadcast::Sender<BracketEvent>,
}

impl BroadcastEventSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BracketEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for BroadcastEventSink {
    fn emit(&self, event: BracketEvent) {
        if self.sender.send(event).is_err() {
            log::trace!("No event subscribers");
        }
    }
}

/// Writes every event to the log as JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl EventSink for LogEventSink {
    fn emit(&self, event: BracketEvent) {
        match serde_json::to_string(&event) {
            Ok(json) => log::info!("{}", json),
            Err(e) => log::warn!("Failed to encode {} event: {}", event.name(), e),
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn emit(&self, _event: BracketEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(stage_id: i64) -> BracketEvent {
        BracketEvent::TournamentCompleted {
            stage_id,
            winner: 0,
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let sink = BroadcastEventSink::new(8);
        let mut rx = sink.subscribe();
        sink.emit(event(1));
        assert_eq!(rx.recv().await.unwrap(), event(1));
    }

    #[test]
    fn test_broadcast_without_subscribers_does_not_fail() {
        let sink = BroadcastEventSink::new(8);
        sink.emit(event(1));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_drops_events() {
        let sink = BroadcastEventSink::new(2);
        let mut rx = sink.subscribe();
        for id in 0..5 {
            sink.emit(event(id));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert_eq!(rx.recv().await.unwrap(), event(3));
    }
}
