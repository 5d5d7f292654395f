use thiserror::Error;

use crate::state::state_machine::{SessionPhase, SessionStateMachine};

/// Question category a user is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Profile {
    /// Credit analytics questions (`CRD` ids).
    Credit,
    /// Customer service analytics questions (`SRV` ids).
    Service,
    /// Expansion market analytics questions (`EXP` ids).
    Expansion,
}

impl Profile {
    /// All profiles in menu order.
    pub const ALL: [Profile; 3] = [Profile::Credit, Profile::Service, Profile::Expansion];

    /// Map a menu entry (`"1"`, `"2"`, `"3"`) to its profile.
    pub fn from_menu_choice(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Profile::Credit),
            "2" => Some(Profile::Service),
            "3" => Some(Profile::Expansion),
            _ => None,
        }
    }

    /// Menu digit, also used as the profile parameter of the question service.
    pub fn menu_digit(self) -> &'static str {
        match self {
            Profile::Credit => "1",
            Profile::Service => "2",
            Profile::Expansion => "3",
        }
    }

    /// Human readable label shown in the menu.
    pub fn label(self) -> &'static str {
        match self {
            Profile::Credit => "Credit",
            Profile::Service => "Service",
            Profile::Expansion => "Expansion",
        }
    }
}

/// Id prefix used by the question service for a profile.
pub fn prefix_for(profile: Profile) -> &'static str {
    match profile {
        Profile::Credit => "CRD",
        Profile::Service => "SRV",
        Profile::Expansion => "EXP",
    }
}

/// Build the service-side id of a question, e.g. `CRD0007`.
///
/// Every call site that talks to the question service goes through here so the
/// fetch, persistence and evaluation requests always agree on ids.
pub fn prefixed_id(profile: Profile, question_id: u32) -> String {
    format!("{}{:04}", prefix_for(profile), question_id)
}

/// A single multiple-choice letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerChoice {
    /// First option.
    A,
    /// Second option.
    B,
    /// Third option.
    C,
    /// Fourth option.
    D,
}

impl AnswerChoice {
    /// Parse a typed answer, accepting `a`-`d` in either case.
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "a" => Some(AnswerChoice::A),
            "b" => Some(AnswerChoice::B),
            "c" => Some(AnswerChoice::C),
            "d" => Some(AnswerChoice::D),
            _ => None,
        }
    }

    /// Letter for the option at `index`, if there is one.
    pub fn from_index(index: usize) -> Option<Self> {
        [AnswerChoice::A, AnswerChoice::B, AnswerChoice::C, AnswerChoice::D]
            .get(index)
            .copied()
    }

    /// Lowercase letter sent to the service.
    pub fn letter(self) -> &'static str {
        match self {
            AnswerChoice::A => "a",
            AnswerChoice::B => "b",
            AnswerChoice::C => "c",
            AnswerChoice::D => "d",
        }
    }
}

/// Answer slot recorded for one question of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordedAnswer {
    /// The user picked a letter.
    Chosen(AnswerChoice),
    /// The question could not be fetched and was skipped.
    Skipped,
}

impl RecordedAnswer {
    /// Wire representation; skipped questions are sent as an empty answer.
    pub fn as_wire(self) -> &'static str {
        match self {
            RecordedAnswer::Chosen(choice) => choice.letter(),
            RecordedAnswer::Skipped => "",
        }
    }
}

/// Error raised when an attempt would grow past its question set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("attempt already holds an answer for all {total} questions")]
pub struct AttemptFull {
    /// Number of questions in the attempt.
    pub total: usize,
}

/// One run of question-id assignment through collected answers.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizAttempt {
    profile: Profile,
    question_ids: Vec<u32>,
    answers: Vec<RecordedAnswer>,
}

impl QuizAttempt {
    /// Start an attempt over a server-chosen question set.
    pub fn new(profile: Profile, question_ids: Vec<u32>) -> Self {
        let answers = Vec::with_capacity(question_ids.len());
        Self {
            profile,
            question_ids,
            answers,
        }
    }

    /// Profile the questions were drawn for.
    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Unprefixed question ids in display order.
    pub fn question_ids(&self) -> &[u32] {
        &self.question_ids
    }

    /// Answers recorded so far.
    pub fn answers(&self) -> &[RecordedAnswer] {
        &self.answers
    }

    /// Index of the question awaiting an answer; equals the question count once frozen.
    pub fn current_index(&self) -> usize {
        self.answers.len()
    }

    /// Id of the question awaiting an answer.
    pub fn current_question(&self) -> Option<u32> {
        self.question_ids.get(self.current_index()).copied()
    }

    /// Number of questions in the attempt.
    pub fn total(&self) -> usize {
        self.question_ids.len()
    }

    /// True once every question holds an answer slot.
    pub fn is_complete(&self) -> bool {
        self.answers.len() == self.question_ids.len()
    }

    /// Record the answer for the current question and advance.
    pub fn record(&mut self, answer: RecordedAnswer) -> Result<(), AttemptFull> {
        if self.is_complete() {
            return Err(AttemptFull {
                total: self.question_ids.len(),
            });
        }
        self.answers.push(answer);
        Ok(())
    }

    /// Number of questions the user actually answered.
    pub fn answered_count(&self) -> usize {
        self.answers
            .iter()
            .filter(|answer| matches!(answer, RecordedAnswer::Chosen(_)))
            .count()
    }

    /// Prefixed ids in question order, as expected by the service.
    pub fn prefixed_ids(&self) -> Vec<String> {
        self.question_ids
            .iter()
            .map(|id| prefixed_id(self.profile, *id))
            .collect()
    }

    /// Answers in question order, as expected by the service.
    pub fn wire_answers(&self) -> Vec<String> {
        self.answers
            .iter()
            .map(|answer| answer.as_wire().to_string())
            .collect()
    }
}

/// Outcome of scoring one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationResult {
    /// Questions in the attempt.
    pub total_questions: u32,
    /// Answers judged correct.
    pub correct_answers: u32,
    /// Answers judged wrong or skipped.
    pub incorrect_answers: u32,
    /// Score in `[0, 100]`.
    pub score_percentage: f64,
    /// True when the score was computed locally because the service was unavailable.
    pub degraded: bool,
}

impl EvaluationResult {
    /// Whether the score reaches `threshold` (inclusive).
    pub fn passed(&self, threshold: f64) -> bool {
        self.score_percentage >= threshold
    }
}

/// Prize awarded by the roulette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prize {
    /// Recognition only, nothing physical is handed out.
    HonorOnly,
    /// A physical prize; `ordinal` is the winner number when the counter could be updated.
    Physical {
        /// Position of this winner in the global counter.
        ordinal: Option<u32>,
    },
}

/// Progress of the prize draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouletteStage {
    /// The wheel is turning.
    Spinning,
    /// The draw is over.
    Settled(Prize),
}

/// Data owned by a single terminal session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    /// Opaque identifier, immutable for the lifetime of the session.
    pub id: String,
    /// Email accepted in the collecting phase.
    pub user_email: Option<String>,
    /// False until boot completes, and again when the user service cannot be reached.
    pub connected: bool,
    /// Seconds left; never negative.
    pub remaining_seconds: u32,
    /// Countdown budget.
    pub total_seconds: u32,
    /// Phase machine guarding every transition.
    pub machine: SessionStateMachine,
}

impl Session {
    /// Create a session in the boot phase with a full countdown budget.
    pub fn new(id: impl Into<String>, total_seconds: u32) -> Self {
        Self {
            id: id.into(),
            user_email: None,
            connected: false,
            remaining_seconds: total_seconds,
            total_seconds,
            machine: SessionStateMachine::new(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    /// Presentation hint: less than a fifth of the budget is left.
    pub fn is_critical(&self) -> bool {
        u64::from(self.remaining_seconds) * 5 < u64::from(self.total_seconds)
    }

    /// Remaining time formatted as `MM:SS`.
    pub fn clock(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.remaining_seconds / 60,
            self.remaining_seconds % 60
        )
    }
}
