use thiserror::Error;

/// High-level phases a terminal session can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionPhase {
    /// Boot messages are being printed; input is ignored.
    Boot,
    /// Waiting for the user to type an email address.
    CollectingEmail,
    /// Waiting for the user to pick a profile from the menu.
    ProfileMenu,
    /// A quiz attempt is running and the countdown is live.
    Quizzing,
    /// All answers are collected and the score is being computed.
    Evaluating,
    /// The countdown reached zero before a result was latched.
    TimedOut,
    /// The attempt scored below the pass threshold.
    Failed,
    /// The attempt scored at or above the pass threshold.
    Passed,
    /// The prize draw is running or has settled.
    Roulette,
}

impl SessionPhase {
    /// Phases after which no timeout can occur and the countdown stays stopped.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionPhase::TimedOut | SessionPhase::Failed | SessionPhase::Passed
        )
    }

    /// Phases during which the countdown is allowed to run.
    pub fn counts_down(self) -> bool {
        matches!(self, SessionPhase::Quizzing | SessionPhase::Evaluating)
    }

    /// Phases that accept typed input from the terminal.
    pub fn is_interactive(self) -> bool {
        matches!(
            self,
            SessionPhase::CollectingEmail | SessionPhase::ProfileMenu | SessionPhase::Quizzing
        )
    }
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The boot message sequence finished.
    BootCompleted,
    /// A well-formed email address was submitted.
    EmailAccepted,
    /// A profile was chosen and a question set allocated.
    ProfileSelected,
    /// The question loop collected an answer for every question.
    AnswersCollected,
    /// The evaluation reached the pass threshold.
    EvaluationPassed,
    /// The evaluation stayed below the pass threshold.
    EvaluationFailed,
    /// The countdown reached zero.
    CountdownExpired,
    /// A blank submission on the result screen asked for the prize draw.
    RouletteRequested,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// State machine implementing the terminal session flow.
///
/// Every accepted event bumps `version`, which lets observers discard work that
/// was started against an older phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: usize,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Boot,
            version: 0,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the boot phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Number of transitions applied so far.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Apply an event, moving to the next phase when the transition is valid.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        self.version += 1;
        Ok(next)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Boot, SessionEvent::BootCompleted) => SessionPhase::CollectingEmail,
            (SessionPhase::CollectingEmail, SessionEvent::EmailAccepted) => {
                SessionPhase::ProfileMenu
            }
            (SessionPhase::ProfileMenu, SessionEvent::ProfileSelected) => SessionPhase::Quizzing,
            (SessionPhase::Quizzing, SessionEvent::AnswersCollected) => SessionPhase::Evaluating,
            (SessionPhase::Evaluating, SessionEvent::EvaluationPassed) => SessionPhase::Passed,
            (SessionPhase::Evaluating, SessionEvent::EvaluationFailed) => SessionPhase::Failed,
            (SessionPhase::Quizzing | SessionPhase::Evaluating, SessionEvent::CountdownExpired) => {
                SessionPhase::TimedOut
            }
            (SessionPhase::Passed, SessionEvent::RouletteRequested) => SessionPhase::Roulette,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
