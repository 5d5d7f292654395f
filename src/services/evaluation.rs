use std::sync::Arc;

use tracing::{info, warn};

use crate::{
    dao::{models::AttemptRecord, quiz_service::QuizService},
    state::session::{EvaluationResult, QuizAttempt},
};

/// Turns a frozen attempt into a score, degrading locally when the service fails.
pub struct EvaluationCoordinator {
    service: Arc<dyn QuizService>,
}

impl EvaluationCoordinator {
    /// Coordinator scoring through `service`.
    pub fn new(service: Arc<dyn QuizService>) -> Self {
        Self { service }
    }

    /// Persist the attempt for the user. Best-effort: failures are only logged.
    pub async fn record_attempt(&self, user_email: &str, session_id: &str, attempt: &QuizAttempt) {
        let record = AttemptRecord {
            user_email: user_email.to_string(),
            session_id: session_id.to_string(),
            question_ids: attempt.question_ids().to_vec(),
            answers: attempt.wire_answers(),
        };
        match self.service.update_user_answers(record).await {
            Ok(true) => info!(session_id, "attempt persisted"),
            Ok(false) => warn!(session_id, "quiz service did not acknowledge the attempt"),
            Err(err) => warn!(session_id, error = %err, "failed to persist attempt"),
        }
    }

    /// Score the attempt. Never fails: an unusable answer from the service
    /// produces a degraded result computed from the answered count.
    pub async fn evaluate(&self, attempt: &QuizAttempt) -> EvaluationResult {
        match self
            .service
            .evaluate(attempt.prefixed_ids(), attempt.wire_answers())
            .await
        {
            Ok(report) if report.success => EvaluationResult {
                total_questions: report.total_questions,
                correct_answers: report.correct_answers,
                incorrect_answers: report.incorrect_answers,
                score_percentage: report.score_percentage.clamp(0.0, 100.0),
                degraded: false,
            },
            Ok(report) => {
                warn!(
                    detail = report.message.as_deref().unwrap_or_default(),
                    "evaluation reported a non-success status; using local summary"
                );
                local_summary(attempt)
            }
            Err(err) => {
                warn!(error = %err, "evaluation failed; using local summary");
                local_summary(attempt)
            }
        }
    }
}

/// Fallback statistic: share of questions that received an answer.
fn local_summary(attempt: &QuizAttempt) -> EvaluationResult {
    let total = attempt.total();
    let answered = attempt.answered_count();
    let score_percentage = if total == 0 {
        0.0
    } else {
        answered as f64 / total as f64 * 100.0
    };

    EvaluationResult {
        total_questions: u32::try_from(total).unwrap_or(u32::MAX),
        correct_answers: 0,
        incorrect_answers: 0,
        score_percentage,
        degraded: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        state::session::{AnswerChoice, Profile, RecordedAnswer},
        testing::{Call, FakeQuizService, Op},
    };

    fn attempt(answers: &[RecordedAnswer]) -> QuizAttempt {
        let ids = (1..=u32::try_from(answers.len()).unwrap()).collect();
        let mut attempt = QuizAttempt::new(Profile::Credit, ids);
        for answer in answers {
            attempt.record(*answer).unwrap();
        }
        attempt
    }

    #[tokio::test]
    async fn sends_prefixed_ids_and_exact_answers() {
        let fake = FakeQuizService::new().with_correct_answers(1);
        let coordinator = EvaluationCoordinator::new(fake.clone());
        let attempt = attempt(&[
            RecordedAnswer::Chosen(AnswerChoice::A),
            RecordedAnswer::Chosen(AnswerChoice::B),
        ]);

        let result = coordinator.evaluate(&attempt).await;

        assert_eq!(
            fake.calls(),
            vec![Call::Evaluate {
                ids: vec!["CRD0001".into(), "CRD0002".into()],
                answers: vec!["a".into(), "b".into()],
            }]
        );
        assert!(!result.degraded);
        assert_eq!(result.correct_answers, 1);
        assert_eq!(result.score_percentage, 50.0);
    }

    #[tokio::test]
    async fn service_failure_degrades_to_answered_share() {
        let fake = FakeQuizService::new().failing(Op::Evaluate);
        let coordinator = EvaluationCoordinator::new(fake);
        let attempt = attempt(&[
            RecordedAnswer::Chosen(AnswerChoice::C),
            RecordedAnswer::Skipped,
            RecordedAnswer::Chosen(AnswerChoice::D),
            RecordedAnswer::Chosen(AnswerChoice::A),
        ]);

        let result = coordinator.evaluate(&attempt).await;
        assert!(result.degraded);
        assert_eq!(result.total_questions, 4);
        assert_eq!(result.score_percentage, 75.0);
    }

    #[tokio::test]
    async fn persistence_uses_raw_ids_and_tolerates_failure() {
        let fake = FakeQuizService::new().failing(Op::UpdateUserAnswers);
        let coordinator = EvaluationCoordinator::new(fake.clone());
        let attempt = attempt(&[RecordedAnswer::Chosen(AnswerChoice::B)]);

        coordinator
            .record_attempt("ada@delfos.io", "s-9", &attempt)
            .await;

        assert_eq!(
            fake.calls(),
            vec![Call::UpdateUserAnswers(AttemptRecord {
                user_email: "ada@delfos.io".into(),
                session_id: "s-9".into(),
                question_ids: vec![1],
                answers: vec!["b".into()],
            })]
        );
    }
}
