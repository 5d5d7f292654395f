/// Session data, attempts and prizes.
pub mod session;
/// Phase transitions.
pub mod state_machine;
/// Terminal lines.
pub mod transcript;

use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use dashmap::DashMap;
use tokio::{sync::watch, time::sleep};
use tracing::debug;

use crate::{
    config::AppConfig,
    dao::quiz_service::QuizService,
    services::session_flow::SharedFlow,
    state::{
        session::{EvaluationResult, RouletteStage, Session},
        state_machine::{InvalidTransition, SessionEvent, SessionPhase},
        transcript::{LineId, LineKind, TerminalLine, TranscriptLog},
    },
};

/// Handle to the application state shared by routes and tasks.
pub type SharedState = Arc<AppState>;
/// Handle to one session's state.
pub type SharedSession = Arc<SessionState>;

/// Everything a rendering layer needs to draw one session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Session data.
    pub session: Session,
    /// Lines displayed so far.
    pub transcript: TranscriptLog,
    /// True while an input is being processed; the input surface is disabled meanwhile.
    pub awaiting_response: bool,
    /// Score, once the attempt has been evaluated.
    pub evaluation: Option<EvaluationResult>,
    /// Prize draw progress.
    pub roulette: Option<RouletteStage>,
}

impl SessionSnapshot {
    fn new(session: Session) -> Self {
        Self {
            session,
            transcript: TranscriptLog::new(),
            awaiting_response: false,
            evaluation: None,
            roulette: None,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.session.phase()
    }
}

/// Single owner of a session's mutable data.
///
/// Each mutation is applied in place under the channel lock, then published to
/// every subscriber, so readers only ever observe whole snapshots.
pub struct SessionState {
    id: String,
    store: watch::Sender<SessionSnapshot>,
}

impl SessionState {
    /// Create the state of a fresh session in the boot phase.
    pub fn new(id: impl Into<String>, total_seconds: u32) -> SharedSession {
        let id = id.into();
        let snapshot = SessionSnapshot::new(Session::new(id.clone(), total_seconds));
        Arc::new(Self {
            id,
            store: watch::Sender::new(snapshot),
        })
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.store.borrow().clone()
    }

    /// Register a new subscriber that is woken on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.store.subscribe()
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.store.borrow().phase()
    }

    /// Apply a mutation and publish the resulting snapshot.
    pub fn update(&self, modify: impl FnOnce(&mut SessionSnapshot)) {
        self.store.send_modify(modify);
    }

    /// Apply a mutation that reports whether it changed anything; only changes are published.
    pub fn update_if(&self, modify: impl FnOnce(&mut SessionSnapshot) -> bool) -> bool {
        self.store.send_if_modified(modify)
    }

    /// Apply a state machine event atomically, publishing only when it is accepted.
    pub fn transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let mut outcome = None;
        self.store.send_if_modified(|snapshot| {
            let result = snapshot.session.machine.apply(event);
            let accepted = result.is_ok();
            outcome = Some(result);
            accepted
        });
        outcome.unwrap_or_else(|| {
            Err(InvalidTransition {
                from: self.phase(),
                event,
            })
        })
    }

    /// Append a line and schedule the end of its typing effect.
    pub fn append_line(self: &Arc<Self>, kind: LineKind, content: impl Into<String>) -> LineId {
        let (line, typing) = TerminalLine::new(kind, content);
        let id = line.id;
        self.update(|snapshot| snapshot.transcript.push(line));

        if !typing.is_zero() {
            let weak: Weak<Self> = Arc::downgrade(self);
            tokio::spawn(async move {
                sleep(typing).await;
                if let Some(state) = weak.upgrade() {
                    state
                        .store
                        .send_if_modified(|snapshot| snapshot.transcript.finish_rendering(id));
                }
            });
        }

        id
    }

    /// Drop every line of the transcript.
    pub fn clear_transcript(&self) {
        self.update(|snapshot| snapshot.transcript.clear());
    }

    /// Toggle the awaiting flag, publishing only when it changes.
    pub fn set_awaiting(&self, awaiting: bool) {
        self.update_if(|snapshot| {
            let changed = snapshot.awaiting_response != awaiting;
            snapshot.awaiting_response = awaiting;
            changed
        });
    }
}

/// Central application state: configuration, the quiz service and live sessions.
pub struct AppState {
    config: AppConfig,
    service: Arc<dyn QuizService>,
    sessions: DashMap<String, SharedFlow>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, service: Arc<dyn QuizService>) -> SharedState {
        Arc::new(Self {
            config,
            service,
            sessions: DashMap::new(),
        })
    }

    /// Configuration the server was started with.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the quiz service shared by every session.
    pub fn service(&self) -> Arc<dyn QuizService> {
        self.service.clone()
    }

    /// Register a session so routes can reach it by id.
    pub fn insert_session(&self, flow: SharedFlow) {
        let id = flow.session().id().to_string();
        debug!(session_id = %id, "session registered");
        self.sessions.insert(id, flow);
    }

    /// Look a live session up by id.
    pub fn session(&self, id: &str) -> Option<SharedFlow> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Remove a session from the registry, returning it when it existed.
    pub fn remove_session(&self, id: &str) -> Option<SharedFlow> {
        self.sessions.remove(id).map(|(_, flow)| flow)
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Remove every session idle for at least `ttl` and return them.
    pub fn reap_idle(&self, ttl: Duration) -> Vec<SharedFlow> {
        let stale: Vec<String> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().idle_for() >= ttl)
            .map(|entry| entry.key().clone())
            .collect();
        stale
            .iter()
            .filter_map(|id| {
                self.sessions
                    .remove_if(id, |_, flow| flow.idle_for() >= ttl)
                    .map(|(_, flow)| flow)
            })
            .collect()
    }

    /// Empty the registry and return every session that was live.
    pub fn drain_sessions(&self) -> Vec<SharedFlow> {
        let ids: Vec<String> = self.sessions.iter().map(|entry| entry.key().clone()).collect();
        ids.iter()
            .filter_map(|id| self.remove_session(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn typing_flag_flips_after_its_duration() {
        let state = SessionState::new("s-1", 60);
        let id = state.append_line(LineKind::Prompt, "0123456789");
        assert!(state.snapshot().transcript.lines()[0].still_rendering);

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(state.snapshot().transcript.lines()[0].still_rendering);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let snapshot = state.snapshot();
        assert_eq!(snapshot.transcript.lines()[0].id, id);
        assert!(!snapshot.transcript.lines()[0].still_rendering);
    }

    #[tokio::test(start_paused = true)]
    async fn clearing_before_the_flip_is_safe() {
        let state = SessionState::new("s-2", 60);
        state.append_line(LineKind::Output, "typing...");
        state.clear_transcript();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(state.snapshot().transcript.is_empty());
    }

    #[tokio::test]
    async fn rejected_transitions_publish_nothing() {
        let state = SessionState::new("s-3", 60);
        let mut rx = state.subscribe();
        rx.borrow_and_update();

        let err = state.transition(SessionEvent::ProfileSelected).unwrap_err();
        assert_eq!(err.from, SessionPhase::Boot);
        assert!(!rx.has_changed().unwrap());

        assert_eq!(
            state.transition(SessionEvent::BootCompleted),
            Ok(SessionPhase::CollectingEmail)
        );
        assert!(rx.has_changed().unwrap());
    }
}
