use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Check the quiz service; sessions keep running degraded when it is down.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let sessions = state.session_count();
    match state.service().health_check().await {
        Ok(()) => HealthResponse::ok(sessions),
        Err(err) => {
            warn!(error = %err, "quiz service health check failed");
            HealthResponse::degraded(sessions)
        }
    }
}
