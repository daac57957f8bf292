//! Per-turn event stream to the client.

use blueprint::Delta;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// One event on the session's push channel. Exactly one `StreamComplete`
/// per turn, always last; cancellation suppresses it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AgentUpdate {
    TextDelta { text: String },
    GraphDelta { delta: Delta },
    ToolCallStarted { name: String, id: String },
    ToolCallCompleted { name: String, id: String, message: String },
    AskUser { question: String },
    Error { message: String },
    StreamComplete,
}

/// Turn-bound sender. A sink is created for one turn and compares its turn
/// number against the session's live counter on every push, so a
/// just-cancelled turn's tail (a tool call that was already running when
/// the next message arrived) cannot leak events into the new turn's stream.
#[derive(Clone)]
pub struct UpdateSink {
    tx: UnboundedSender<AgentUpdate>,
    current_turn: Arc<AtomicU64>,
    turn: u64,
}

impl UpdateSink {
    /// A sink bound to the counter's current value.
    pub fn bound(tx: UnboundedSender<AgentUpdate>, current_turn: Arc<AtomicU64>) -> Self {
        let turn = current_turn.load(Ordering::SeqCst);
        Self {
            tx,
            current_turn,
            turn,
        }
    }

    /// An ungated sink for session-level events outside any turn.
    pub fn unbound(tx: UnboundedSender<AgentUpdate>) -> Self {
        Self {
            tx,
            current_turn: Arc::new(AtomicU64::new(0)),
            turn: 0,
        }
    }

    /// Push an update; returns whether it was delivered. Stale-turn pushes
    /// and pushes to a disconnected receiver are dropped.
    pub fn push(&self, update: AgentUpdate) -> bool {
        if self.current_turn.load(Ordering::SeqCst) != self.turn {
            debug!(turn = self.turn, "dropping update from stale turn");
            return false;
        }
        self.tx.send(update).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    #[test]
    fn update_wire_shape_is_tagged_camel_case() {
        let update = AgentUpdate::ToolCallCompleted {
            name: "create_node".to_string(),
            id: "tc_1".to_string(),
            message: "Created".to_string(),
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], "toolCallCompleted");
        assert_eq!(json["name"], "create_node");

        let complete = serde_json::to_value(AgentUpdate::StreamComplete).unwrap();
        assert_eq!(complete["type"], "streamComplete");
    }

    #[test]
    fn stale_turn_updates_are_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let counter = Arc::new(AtomicU64::new(1));
        let sink = UpdateSink::bound(tx.clone(), counter.clone());

        assert!(sink.push(AgentUpdate::TextDelta {
            text: "live".to_string()
        }));

        // A new turn starts; the old sink goes stale.
        counter.fetch_add(1, Ordering::SeqCst);
        assert!(!sink.push(AgentUpdate::TextDelta {
            text: "stale".to_string()
        }));

        let fresh = UpdateSink::bound(tx, counter);
        assert!(fresh.push(AgentUpdate::StreamComplete));

        assert_eq!(
            rx.try_recv().unwrap(),
            AgentUpdate::TextDelta {
                text: "live".to_string()
            }
        );
        assert_eq!(rx.try_recv().unwrap(), AgentUpdate::StreamComplete);
        assert!(rx.try_recv().is_err());
    }
}
