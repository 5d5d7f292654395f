use std::error::Error;

use futures::future::BoxFuture;
use thiserror::Error;

use crate::{
    dao::models::{AttemptRecord, EvaluationReport, QuestionBody, QuestionSet, WinnerClaim},
    state::session::Profile,
};

/// Result alias for quiz service operations.
pub type QuizResult<T> = Result<T, QuizServiceError>;

/// Error raised by quiz service backends regardless of the transport.
#[derive(Debug, Error)]
pub enum QuizServiceError {
    /// The request never produced a response.
    #[error("quiz service unreachable during `{operation}`")]
    Unavailable {
        /// Operation that was attempted.
        operation: &'static str,
        /// Underlying transport failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The request did not complete within the configured timeout.
    #[error("quiz service timed out during `{operation}`")]
    Timeout {
        /// Operation that was attempted.
        operation: &'static str,
    },
    /// The service answered with an error status.
    #[error("quiz service rejected `{operation}` with status {status}")]
    Rejected {
        /// Operation that was attempted.
        operation: &'static str,
        /// HTTP status returned by the service.
        status: u16,
    },
    /// The response body could not be understood.
    #[error("quiz service sent an unreadable response to `{operation}`")]
    Malformed {
        /// Operation that was attempted.
        operation: &'static str,
        /// Decoding failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl QuizServiceError {
    /// Construct an unavailable error from any transport failure.
    pub fn unavailable(operation: &'static str, source: impl Error + Send + Sync + 'static) -> Self {
        QuizServiceError::Unavailable {
            operation,
            source: Box::new(source),
        }
    }

    /// Construct a malformed-response error from any decoding failure.
    pub fn malformed(operation: &'static str, source: impl Error + Send + Sync + 'static) -> Self {
        QuizServiceError::Malformed {
            operation,
            source: Box::new(source),
        }
    }
}

/// Capabilities the session flow needs from the question/evaluation service.
///
/// Every future is `'static` so callers can race it against the countdown
/// without borrowing the service.
pub trait QuizService: Send + Sync {
    /// Register the user behind a session. Best-effort from the caller's side.
    fn create_user(&self, email: String, session_id: String) -> BoxFuture<'static, QuizResult<()>>;
    /// Draw a random question set for a profile.
    fn choose_questions(&self, profile: Profile) -> BoxFuture<'static, QuizResult<QuestionSet>>;
    /// Fetch a question body by prefixed id; `None` when the id is unknown.
    fn get_question(&self, prefixed_id: String)
    -> BoxFuture<'static, QuizResult<Option<QuestionBody>>>;
    /// Persist a finished attempt; returns whether the service acknowledged it.
    fn update_user_answers(&self, record: AttemptRecord) -> BoxFuture<'static, QuizResult<bool>>;
    /// Score answers against prefixed ids, in question order.
    fn evaluate(
        &self,
        prefixed_ids: Vec<String>,
        answers: Vec<String>,
    ) -> BoxFuture<'static, QuizResult<EvaluationReport>>;
    /// Number of physical prizes handed out so far.
    fn get_winner_count(&self) -> BoxFuture<'static, QuizResult<u32>>;
    /// Atomically bump the winner counter, returning the new count.
    fn increment_winner_count(&self, claim: WinnerClaim) -> BoxFuture<'static, QuizResult<u32>>;
    /// Cheap reachability check used by the healthcheck.
    fn health_check(&self) -> BoxFuture<'static, QuizResult<()>>;
}
