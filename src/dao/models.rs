use crate::state::session::Profile;

/// Question ids allocated by the service for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionSet {
    /// Profile the set was drawn for.
    pub profile: Profile,
    /// Unprefixed ids in display order.
    pub question_ids: Vec<u32>,
}

/// Displayable content of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionBody {
    /// Prefixed id, e.g. `CRD0001`.
    pub id: String,
    /// Question text.
    pub question: String,
    /// Options in display order; the first maps to `a`.
    pub options: Vec<String>,
}

/// Full attempt sent for persistence. Question ids stay unprefixed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    /// Email of the user.
    pub user_email: String,
    /// Session that produced the attempt.
    pub session_id: String,
    /// Unprefixed ids in display order.
    pub question_ids: Vec<u32>,
    /// Wire answers, one per question.
    pub answers: Vec<String>,
}

/// Scoring returned by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationReport {
    /// False when the service reported a non-success status.
    pub success: bool,
    /// Free-form message from the service.
    pub message: Option<String>,
    /// Questions scored.
    pub total_questions: u32,
    /// Correct answers.
    pub correct_answers: u32,
    /// Wrong or skipped answers.
    pub incorrect_answers: u32,
    /// Score in `[0, 100]`.
    pub score_percentage: f64,
}

/// Who claims a physical prize; both fields are optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WinnerClaim {
    /// Email of the winner, when known.
    pub user_email: Option<String>,
    /// Session of the winner, when known.
    pub session_id: Option<String>,
}
