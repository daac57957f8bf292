//! Per-client sessions and the single-flight turn rule.

use crate::{AgentOrchestrator, AgentUpdate, ServiceConfig, ToolRegistry, TurnOutcome, UpdateSink};
use blueprint::StateManager;
use llm::{ChatMessage, ProviderRegistry};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Everything a turn mutates, behind one async lock so at most one turn
/// runs per session. A new message cancels the turn in flight, then waits
/// here for it to unwind.
struct SessionState {
    state: StateManager,
    transcript: Vec<ChatMessage>,
}

struct Session {
    inner: tokio::sync::Mutex<SessionState>,
    tx: UnboundedSender<AgentUpdate>,
    cancel: Mutex<CancellationToken>,
    turn: Arc<AtomicU64>,
    provider_id: Mutex<Option<String>>,
}

/// Owns all live sessions. Sessions are fully independent; the only
/// cross-session state is the shared provider and tool registries.
pub struct SessionManager {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    providers: ProviderRegistry,
    orchestrator: AgentOrchestrator,
    config: ServiceConfig,
}

impl SessionManager {
    pub fn new(providers: ProviderRegistry, tools: ToolRegistry, config: ServiceConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            providers,
            orchestrator: AgentOrchestrator::new(tools, config.max_rounds),
            config,
        }
    }

    /// Open a session and return its update stream. The first event is a
    /// `FullSync` delta so the client starts from the complete graph.
    pub fn connect(&self, session_id: &str) -> UnboundedReceiver<AgentUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = StateManager::new();
        let _ = tx.send(AgentUpdate::GraphDelta {
            delta: state.full_sync(),
        });

        let session = Arc::new(Session {
            inner: tokio::sync::Mutex::new(SessionState {
                state,
                transcript: Vec::new(),
            }),
            tx,
            cancel: Mutex::new(CancellationToken::new()),
            turn: Arc::new(AtomicU64::new(0)),
            provider_id: Mutex::new(None),
        });
        info!(session_id, "session connected");
        self.sessions
            .lock()
            .expect("sessions lock poisoned")
            .insert(session_id.to_string(), session);
        rx
    }

    pub fn disconnect(&self, session_id: &str) {
        let removed = self
            .sessions
            .lock()
            .expect("sessions lock poisoned")
            .remove(session_id);
        if let Some(session) = removed {
            session
                .cancel
                .lock()
                .expect("cancel lock poisoned")
                .cancel();
            info!(session_id, "session disconnected");
        }
    }

    /// Select the provider for subsequent turns. Unknown names are resolved
    /// (and reported) at send time, not here.
    pub fn set_provider(&self, session_id: &str, provider_id: &str) {
        if let Some(session) = self.get(session_id) {
            info!(session_id, provider_id, "provider selected");
            *session
                .provider_id
                .lock()
                .expect("provider lock poisoned") = Some(provider_id.to_string());
        }
    }

    /// Run one turn. Cancels any turn in flight first (latest request
    /// wins), then drives the orchestrator to completion.
    pub async fn send_message(&self, session_id: &str, text: &str) -> Option<TurnOutcome> {
        let session = self.get(session_id)?;

        let cancel = {
            let mut guard = session.cancel.lock().expect("cancel lock poisoned");
            guard.cancel();
            *guard = CancellationToken::new();
            guard.clone()
        };
        session.turn.fetch_add(1, Ordering::SeqCst);
        let sink = UpdateSink::bound(session.tx.clone(), session.turn.clone());

        // Waits for the cancelled turn to release the session.
        let mut inner = session.inner.lock().await;

        let provider_id = session
            .provider_id
            .lock()
            .expect("provider lock poisoned")
            .clone()
            .unwrap_or_else(|| self.config.default_provider.clone());
        let Some(provider) = self.providers.get(&provider_id) else {
            warn!(session_id, provider_id = %provider_id, "provider not configured");
            sink.push(AgentUpdate::Error {
                message: format!("Provider '{provider_id}' is not configured"),
            });
            sink.push(AgentUpdate::StreamComplete);
            return Some(TurnOutcome::Completed);
        };

        let SessionState { state, transcript } = &mut *inner;
        let outcome = self
            .orchestrator
            .process_message(provider, state, transcript, text, &sink, &cancel)
            .await;
        Some(outcome)
    }

    /// Session-scoped undo. Pushes the resulting `FullSync` on success and
    /// nothing at all on an empty stack.
    pub async fn undo(&self, session_id: &str) {
        if let Some(session) = self.get(session_id) {
            let mut inner = session.inner.lock().await;
            match inner.state.undo() {
                Ok(Some(delta)) => {
                    let _ = session.tx.send(AgentUpdate::GraphDelta { delta });
                }
                Ok(None) => {}
                Err(e) => warn!(session_id, error = %e, "undo failed"),
            }
        }
    }

    pub async fn redo(&self, session_id: &str) {
        if let Some(session) = self.get(session_id) {
            let mut inner = session.inner.lock().await;
            match inner.state.redo() {
                Ok(Some(delta)) => {
                    let _ = session.tx.send(AgentUpdate::GraphDelta { delta });
                }
                Ok(None) => {}
                Err(e) => warn!(session_id, error = %e, "redo failed"),
            }
        }
    }

    /// Cancel the turn in flight, if any. The bumped turn counter makes the
    /// cancelled turn's sink stale immediately; the closing `StreamComplete`
    /// comes from here instead.
    pub fn cancel_request(&self, session_id: &str) {
        if let Some(session) = self.get(session_id) {
            info!(session_id, "cancel requested");
            session
                .cancel
                .lock()
                .expect("cancel lock poisoned")
                .cancel();
            session.turn.fetch_add(1, Ordering::SeqCst);
            let _ = session.tx.send(AgentUpdate::StreamComplete);
        }
    }

    fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions
            .lock()
            .expect("sessions lock poisoned")
            .get(session_id)
            .cloned()
    }
}
