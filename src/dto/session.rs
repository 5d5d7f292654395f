use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{format_rfc3339, phase::VisibleSessionPhase},
    state::{
        SessionSnapshot,
        session::{EvaluationResult, Prize, RouletteStage},
        transcript::{LineKind, TerminalLine},
    },
};

/// One submission typed into the terminal.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmitInputRequest {
    /// Raw text; trimmed before routing. Empty means "press Enter".
    #[serde(default)]
    #[validate(length(max = 512))]
    pub text: String,
}

/// Immutable view of a session as rendered by clients.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    /// Opaque session identifier.
    pub session_id: String,
    /// Current phase of the flow.
    pub phase: VisibleSessionPhase,
    /// Boot has completed and the user service was reachable.
    pub connected: bool,
    /// Email accepted in the collecting phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    /// True while an input is processed; the input surface should be disabled.
    pub awaiting_response: bool,
    /// Seconds left on the countdown.
    pub remaining_seconds: u32,
    /// Countdown budget of the attempt.
    pub total_seconds: u32,
    /// Less than a fifth of the countdown is left.
    pub critical: bool,
    /// Remaining time as `MM:SS`.
    pub clock: String,
    /// Displayed lines in append order.
    pub transcript: Vec<LineView>,
    /// Present once the attempt has been scored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation: Option<EvaluationView>,
    /// Present once the prize draw has started.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roulette: Option<RouletteView>,
}

/// Category of a transcript line.
#[derive(Debug, Serialize, ToSchema, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum LineKindView {
    /// Status messages, rendered instantly.
    System,
    /// Questions to the user, typed slowly.
    Prompt,
    /// Echo of what the user submitted.
    Input,
    /// Responses of the terminal.
    Output,
}

/// A transcript line.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineView {
    /// Stable line identifier.
    pub id: Uuid,
    /// Text of the line.
    pub content: String,
    /// Visual category.
    pub kind: LineKindView,
    /// RFC 3339 timestamp.
    pub created_at: String,
    /// The typing effect of this line is still running.
    pub still_rendering: bool,
}

/// Score of the attempt once produced.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationView {
    /// Questions in the attempt.
    pub total_questions: u32,
    /// Answers judged correct.
    pub correct_answers: u32,
    /// Answers judged wrong or skipped.
    pub incorrect_answers: u32,
    /// Score in `[0, 100]`.
    pub score_percentage: f64,
    /// Computed locally because the scoring service was unavailable.
    pub degraded: bool,
}

/// Prize handed out by the roulette.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PrizeView {
    /// Recognition without a physical prize.
    HonorOnly,
    /// A physical prize.
    Physical {
        /// Winner number, when the counter could be updated.
        #[serde(skip_serializing_if = "Option::is_none")]
        ordinal: Option<u32>,
    },
}

/// Progress of the prize draw.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum RouletteView {
    /// The wheel is still turning.
    Spinning,
    /// The draw is over.
    Settled {
        /// Prize that came out.
        prize: PrizeView,
        /// Text shown to the user.
        announcement: String,
    },
}

impl From<&SessionSnapshot> for SessionView {
    fn from(snapshot: &SessionSnapshot) -> Self {
        let session = &snapshot.session;
        Self {
            session_id: session.id.clone(),
            phase: session.phase().into(),
            connected: session.connected,
            user_email: session.user_email.clone(),
            awaiting_response: snapshot.awaiting_response,
            remaining_seconds: session.remaining_seconds,
            total_seconds: session.total_seconds,
            critical: session.is_critical(),
            clock: session.clock(),
            transcript: snapshot
                .transcript
                .lines()
                .iter()
                .map(LineView::from)
                .collect(),
            evaluation: snapshot.evaluation.as_ref().map(EvaluationView::from),
            roulette: snapshot.roulette.as_ref().map(RouletteView::from),
        }
    }
}

impl From<LineKind> for LineKindView {
    fn from(kind: LineKind) -> Self {
        match kind {
            LineKind::System => LineKindView::System,
            LineKind::Prompt => LineKindView::Prompt,
            LineKind::Input => LineKindView::Input,
            LineKind::Output => LineKindView::Output,
        }
    }
}

impl From<&TerminalLine> for LineView {
    fn from(line: &TerminalLine) -> Self {
        Self {
            id: line.id,
            content: line.content.clone(),
            kind: line.kind.into(),
            created_at: format_rfc3339(line.created_at),
            still_rendering: line.still_rendering,
        }
    }
}

impl From<&EvaluationResult> for EvaluationView {
    fn from(result: &EvaluationResult) -> Self {
        Self {
            total_questions: result.total_questions,
            correct_answers: result.correct_answers,
            incorrect_answers: result.incorrect_answers,
            score_percentage: result.score_percentage,
            degraded: result.degraded,
        }
    }
}

impl From<&Prize> for PrizeView {
    fn from(prize: &Prize) -> Self {
        match prize {
            Prize::HonorOnly => PrizeView::HonorOnly,
            Prize::Physical { ordinal } => PrizeView::Physical { ordinal: *ordinal },
        }
    }
}

impl From<&RouletteStage> for RouletteView {
    fn from(stage: &RouletteStage) -> Self {
        match stage {
            RouletteStage::Spinning => RouletteView::Spinning,
            RouletteStage::Settled(prize) => RouletteView::Settled {
                prize: prize.into(),
                announcement: prize.announcement(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::state::{SessionState, state_machine::SessionEvent};

    #[tokio::test]
    async fn snapshot_serializes_in_camel_case() {
        let state = SessionState::new("view-1", 300);
        state.transition(SessionEvent::BootCompleted).unwrap();
        state.append_line(LineKind::System, "ready");
        state.update(|snapshot| {
            snapshot.session.remaining_seconds = 42;
            snapshot.roulette = Some(RouletteStage::Settled(Prize::Physical { ordinal: Some(7) }));
        });

        let value = serde_json::to_value(SessionView::from(&state.snapshot())).unwrap();
        assert_eq!(value["sessionId"], "view-1");
        assert_eq!(value["phase"], "collecting_email");
        assert_eq!(value["remainingSeconds"], 42);
        assert_eq!(value["critical"], true);
        assert_eq!(value["clock"], "00:42");
        assert_eq!(value["transcript"][0]["kind"], "system");
        assert_eq!(value["transcript"][0]["stillRendering"], false);
        assert_eq!(
            value["roulette"]["prize"],
            json!({ "kind": "physical", "ordinal": 7 })
        );
        assert_eq!(value["roulette"]["stage"], "settled");
        assert!(value.get("evaluation").is_none());
    }

    #[test]
    fn overlong_input_is_rejected() {
        let request = SubmitInputRequest {
            text: "x".repeat(513),
        };
        assert!(request.validate().is_err());
        let request = SubmitInputRequest { text: String::new() };
        assert!(request.validate().is_ok());
    }
}
