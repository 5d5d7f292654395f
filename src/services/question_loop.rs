use std::sync::Arc;

use tracing::{debug, warn};

use crate::{
    dao::{models::QuestionBody, quiz_service::QuizService},
    state::{
        SharedSession,
        session::{AnswerChoice, QuizAttempt, RecordedAnswer, prefixed_id},
        state_machine::SessionPhase,
        transcript::LineKind,
    },
};

/// Where the loop stands after consuming an event.
pub enum LoopStep {
    /// A question is displayed and the loop waits for its answer.
    Awaiting(QuestionLoop),
    /// Every question holds an answer slot; the frozen attempt is handed over.
    Completed(QuizAttempt),
    /// The session left the quiz phase (timeout) while the loop was working.
    Abandoned,
}

/// Prompt/collect/validate cycle over the questions of one attempt.
///
/// The loop is consumed by every step, so a finished attempt can only be
/// handed over once.
pub struct QuestionLoop {
    attempt: QuizAttempt,
    service: Arc<dyn QuizService>,
    session: SharedSession,
    current: Option<QuestionBody>,
}

impl QuestionLoop {
    /// Start the loop on a fresh attempt and display its first reachable question.
    pub async fn begin(
        attempt: QuizAttempt,
        service: Arc<dyn QuizService>,
        session: SharedSession,
    ) -> LoopStep {
        Self {
            attempt,
            service,
            session,
            current: None,
        }
        .advance()
        .await
    }

    /// Validate and record the answer to the displayed question.
    ///
    /// Anything other than `a`-`d` re-prompts and leaves the attempt untouched.
    pub async fn submit_answer(mut self, input: &str) -> LoopStep {
        let Some(choice) = AnswerChoice::parse(input) else {
            self.session.append_line(
                LineKind::Output,
                "Invalid answer. Type a, b, c or d to choose an option.",
            );
            return LoopStep::Awaiting(self);
        };

        if let Err(err) = self.attempt.record(RecordedAnswer::Chosen(choice)) {
            debug!(session_id = %self.session.id(), error = %err, "answer past the end of the attempt");
            return LoopStep::Completed(self.attempt);
        }
        self.current = None;
        self.advance().await
    }

    /// Show the pending question again, e.g. after the terminal was cleared.
    pub fn redisplay(&self) {
        if let Some(body) = &self.current {
            self.display(body);
        }
    }

    #[cfg(test)]
    fn attempt(&self) -> &QuizAttempt {
        &self.attempt
    }

    /// Fetch and display the next question, skipping the ones that cannot be loaded.
    async fn advance(mut self) -> LoopStep {
        loop {
            let Some(question_id) = self.attempt.current_question() else {
                return LoopStep::Completed(self.attempt);
            };
            let index = self.attempt.current_index();
            let id = prefixed_id(self.attempt.profile(), question_id);

            let fetched = self.service.get_question(id.clone()).await;
            if self.session.phase() != SessionPhase::Quizzing {
                debug!(session_id = %self.session.id(), question = %id, "question arrived after the quiz ended");
                return LoopStep::Abandoned;
            }

            match fetched {
                Ok(Some(body)) => {
                    self.display(&body);
                    self.current = Some(body);
                    return LoopStep::Awaiting(self);
                }
                Ok(None) => {
                    warn!(session_id = %self.session.id(), question = %id, "question not found; skipping");
                }
                Err(err) => {
                    warn!(session_id = %self.session.id(), question = %id, error = %err, "question fetch failed; skipping");
                }
            }

            self.session.append_line(
                LineKind::System,
                format!("Question {} is unavailable. Skipping to the next one.", index + 1),
            );
            if let Err(err) = self.attempt.record(RecordedAnswer::Skipped) {
                debug!(session_id = %self.session.id(), error = %err, "skip past the end of the attempt");
                return LoopStep::Completed(self.attempt);
            }
        }
    }

    fn display(&self, body: &QuestionBody) {
        self.session.append_line(
            LineKind::Output,
            format!(
                "Question {} of {}: {}",
                self.attempt.current_index() + 1,
                self.attempt.total(),
                body.question
            ),
        );
        for (index, option) in body.options.iter().enumerate() {
            if let Some(choice) = AnswerChoice::from_index(index) {
                self.session
                    .append_line(LineKind::Output, format!("[{}] {}", choice.letter(), option));
            }
        }
        self.session
            .append_line(LineKind::Prompt, "Type your answer (a, b, c or d):");
    }
}
