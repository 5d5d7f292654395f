use tracing::info;
use uuid::Uuid;

use crate::{
    dto::session::SessionView,
    error::ServiceError,
    services::session_flow::{SessionFlow, SharedFlow},
    state::SharedState,
};

/// Create a session, start its boot sequence in the background and return the first snapshot.
pub fn create_session(state: &SharedState) -> SessionView {
    let id = Uuid::new_v4().simple().to_string();
    let flow = SessionFlow::new(id.clone(), state.service(), state.config().flow.clone());
    state.insert_session(flow.clone());
    info!(session_id = %id, "session created");

    let view = SessionView::from(&flow.session().snapshot());
    tokio::spawn(async move { flow.start().await });
    view
}

/// Current snapshot of a session.
pub fn get_session(state: &SharedState, id: &str) -> Result<SessionView, ServiceError> {
    let flow = find(state, id)?;
    Ok(SessionView::from(&flow.session().snapshot()))
}

/// Route one submission and return the snapshot once it has been processed.
pub async fn submit_input(
    state: &SharedState,
    id: &str,
    text: &str,
) -> Result<SessionView, ServiceError> {
    if text.contains(['\n', '\r']) {
        return Err(ServiceError::InvalidInput(
            "input must be a single line".into(),
        ));
    }
    let flow = find(state, id)?;
    flow.submit(text).await;
    Ok(SessionView::from(&flow.session().snapshot()))
}

/// Tear a session down: its countdown stops and it leaves the registry.
pub fn close_session(state: &SharedState, id: &str) -> Result<(), ServiceError> {
    let flow = state
        .remove_session(id)
        .ok_or_else(|| not_found(id))?;
    flow.shutdown();
    Ok(())
}

fn find(state: &SharedState, id: &str) -> Result<SharedFlow, ServiceError> {
    state.session(id).ok_or_else(|| not_found(id))
}

fn not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("session `{id}`"))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        dto::phase::VisibleSessionPhase,
        state::AppState,
        testing::{FakeQuizService, instant_config},
    };

    fn state() -> SharedState {
        AppState::new(instant_config(), FakeQuizService::new())
    }

    #[tokio::test(start_paused = true)]
    async fn created_sessions_boot_in_the_background() {
        let state = state();
        let view = create_session(&state);
        assert_eq!(view.phase, VisibleSessionPhase::Boot);
        assert_eq!(state.session_count(), 1);

        tokio::time::sleep(Duration::from_millis(1)).await;
        let view = get_session(&state, &view.session_id).unwrap();
        assert_eq!(view.phase, VisibleSessionPhase::CollectingEmail);
        assert!(view.connected);
    }

    #[tokio::test(start_paused = true)]
    async fn multi_line_input_is_rejected() {
        let state = state();
        let view = create_session(&state);
        let err = submit_input(&state, &view.session_id, "a\nb")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn closed_sessions_are_gone() {
        let state = state();
        let view = create_session(&state);
        close_session(&state, &view.session_id).unwrap();

        assert_eq!(state.session_count(), 0);
        assert!(matches!(
            get_session(&state, &view.session_id),
            Err(ServiceError::NotFound(_))
        ));
        assert!(close_session(&state, &view.session_id).is_err());
    }
}
