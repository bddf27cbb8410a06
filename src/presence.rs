use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::stream::Stream;
use serde::Serialize;
use std::{convert::Infallible, time::Duration};
use tokio::sync::broadcast;

use crate::AppState;

/// A "this user's derived state changed" signal, consumed by the presence
/// and unread-badge layer. `delta: None` means recompute from scratch.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum PresenceEvent {
    StatsChanged { uid: i64, delta: Option<i64> },
    /// Heartbeat
    Ping,
}

/// Shared presence broadcast state
#[derive(Clone)]
pub struct PresenceSignal {
    sender: broadcast::Sender<PresenceEvent>,
}

impl PresenceSignal {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1024);
        Self { sender }
    }

    /// Best-effort fire; a send with no subscribers is not an error.
    pub fn notify(&self, uid: i64, delta: Option<i64>) {
        let _ = self.sender.send(PresenceEvent::StatsChanged { uid, delta });
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PresenceEvent> {
        self.sender.subscribe()
    }
}

impl Default for PresenceSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// SSE stream handler
pub async fn stream_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.presence.subscribe();

    let stream = async_stream::stream! {
        loop {
            tokio::select! {
                // Receive broadcast events
                result = rx.recv() => {
                    match result {
                        Ok(event) => {
                            match serde_json::to_string(&event) {
                                Ok(json) => yield Ok(Event::default().data(json)),
                                Err(e) => {
                                    tracing::error!("Failed to serialize presence event: {}", e);
                                    continue;
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // Missed some events, log and continue
                            tracing::warn!("Presence client lagged, missed {} events", n);
                            continue;
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            break;
                        }
                    }
                }
                // Send periodic pings
                _ = tokio::time::sleep(Duration::from_secs(30)) => {
                    match serde_json::to_string(&PresenceEvent::Ping) {
                        Ok(json) => yield Ok(Event::default().data(json)),
                        Err(e) => {
                            tracing::error!("Failed to serialize ping event: {}", e);
                        }
                    }
                }
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_reaches_subscriber() {
        let signal = PresenceSignal::new();
        let mut rx = signal.subscribe();
        signal.notify(5, Some(10));
        match rx.recv().await.unwrap() {
            PresenceEvent::StatsChanged { uid, delta } => {
                assert_eq!(uid, 5);
                assert_eq!(delta, Some(10));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_notify_without_subscribers_is_silent() {
        let signal = PresenceSignal::new();
        signal.notify(1, None);
    }
}
