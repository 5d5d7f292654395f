use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::SessionPhase;

/// Session phase exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleSessionPhase {
    /// Boot messages are being printed.
    Boot,
    /// Waiting for the user's email.
    CollectingEmail,
    /// Waiting for a profile choice.
    ProfileMenu,
    /// Questions are being answered against the clock.
    Quizzing,
    /// The attempt is being scored.
    Evaluating,
    /// The countdown ran out.
    TimedOut,
    /// The score stayed below the threshold.
    Failed,
    /// The score reached the threshold; Enter spins the roulette.
    Passed,
    /// The prize draw is running or settled.
    Roulette,
}

impl From<SessionPhase> for VisibleSessionPhase {
    fn from(value: SessionPhase) -> Self {
        match value {
            SessionPhase::Boot => VisibleSessionPhase::Boot,
            SessionPhase::CollectingEmail => VisibleSessionPhase::CollectingEmail,
            SessionPhase::ProfileMenu => VisibleSessionPhase::ProfileMenu,
            SessionPhase::Quizzing => VisibleSessionPhase::Quizzing,
            SessionPhase::Evaluating => VisibleSessionPhase::Evaluating,
            SessionPhase::TimedOut => VisibleSessionPhase::TimedOut,
            SessionPhase::Failed => VisibleSessionPhase::Failed,
            SessionPhase::Passed => VisibleSessionPhase::Passed,
            SessionPhase::Roulette => VisibleSessionPhase::Roulette,
        }
    }
}
