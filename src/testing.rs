//! Scripted in-memory [`QuizService`] shared by unit tests.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::future::BoxFuture;

use crate::{
    config::{AppConfig, FlowSettings, Pacing},
    dao::{
        models::{AttemptRecord, EvaluationReport, QuestionBody, QuestionSet, WinnerClaim},
        quiz_service::{QuizResult, QuizService, QuizServiceError},
    },
    state::session::Profile,
};

/// Operations of the quiz service, used to script failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    CreateUser,
    ChooseQuestions,
    GetQuestion,
    UpdateUserAnswers,
    Evaluate,
    GetWinnerCount,
    IncrementWinnerCount,
    HealthCheck,
}

/// A recorded call and its arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateUser { email: String, session_id: String },
    ChooseQuestions(Profile),
    GetQuestion(String),
    UpdateUserAnswers(AttemptRecord),
    Evaluate { ids: Vec<String>, answers: Vec<String> },
    GetWinnerCount,
    IncrementWinnerCount(WinnerClaim),
    HealthCheck,
}

impl Call {
    fn op(&self) -> Op {
        match self {
            Call::CreateUser { .. } => Op::CreateUser,
            Call::ChooseQuestions(_) => Op::ChooseQuestions,
            Call::GetQuestion(_) => Op::GetQuestion,
            Call::UpdateUserAnswers(_) => Op::UpdateUserAnswers,
            Call::Evaluate { .. } => Op::Evaluate,
            Call::GetWinnerCount => Op::GetWinnerCount,
            Call::IncrementWinnerCount(_) => Op::IncrementWinnerCount,
            Call::HealthCheck => Op::HealthCheck,
        }
    }
}

struct Script {
    calls: Vec<Call>,
    question_ids: Vec<u32>,
    failures: HashSet<Op>,
    broken_questions: HashSet<String>,
    correct_answers: u32,
    winner_count: u32,
    evaluation_delay: Duration,
}

/// Fake quiz service recording every call.
pub struct FakeQuizService {
    script: Mutex<Script>,
}

impl Default for FakeQuizService {
    fn default() -> Self {
        Self {
            script: Mutex::new(Script {
                calls: Vec::new(),
                question_ids: vec![1, 2],
                failures: HashSet::new(),
                broken_questions: HashSet::new(),
                correct_answers: 2,
                winner_count: 0,
                evaluation_delay: Duration::ZERO,
            }),
        }
    }
}

impl FakeQuizService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn with_questions(self: Arc<Self>, ids: Vec<u32>) -> Arc<Self> {
        self.script().question_ids = ids;
        self
    }

    /// Every call of `op` fails with a 503.
    pub fn failing(self: Arc<Self>, op: Op) -> Arc<Self> {
        self.script().failures.insert(op);
        self
    }

    /// Fetching this prefixed id fails.
    pub fn with_broken_question(self: Arc<Self>, prefixed_id: &str) -> Arc<Self> {
        self.script().broken_questions.insert(prefixed_id.to_string());
        self
    }

    /// Number of answers the evaluation reports as correct.
    pub fn with_correct_answers(self: Arc<Self>, correct: u32) -> Arc<Self> {
        self.script().correct_answers = correct;
        self
    }

    pub fn with_winner_count(self: Arc<Self>, count: u32) -> Arc<Self> {
        self.script().winner_count = count;
        self
    }

    /// Delay every evaluation response.
    pub fn with_evaluation_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        self.script().evaluation_delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script().calls.clone()
    }

    pub fn count(&self, op: Op) -> usize {
        self.script().calls.iter().filter(|call| call.op() == op).count()
    }

    pub fn winner_count(&self) -> u32 {
        self.script().winner_count
    }

    /// Record `call` and report whether its operation is scripted to fail.
    fn record(&self, call: Call) -> QuizResult<()> {
        let op = call.op();
        let mut script = self.script();
        script.calls.push(call);
        if script.failures.contains(&op) {
            Err(QuizServiceError::Rejected {
                operation: "scripted",
                status: 503,
            })
        } else {
            Ok(())
        }
    }
}

impl QuizService for FakeQuizService {
    fn create_user(&self, email: String, session_id: String) -> BoxFuture<'static, QuizResult<()>> {
        let result = self.record(Call::CreateUser { email, session_id });
        Box::pin(async move { result })
    }

    fn choose_questions(&self, profile: Profile) -> BoxFuture<'static, QuizResult<QuestionSet>> {
        let result = self
            .record(Call::ChooseQuestions(profile))
            .map(|()| QuestionSet {
                profile,
                question_ids: self.script().question_ids.clone(),
            });
        Box::pin(async move { result })
    }

    fn get_question(
        &self,
        prefixed_id: String,
    ) -> BoxFuture<'static, QuizResult<Option<QuestionBody>>> {
        let broken = self.script().broken_questions.contains(&prefixed_id);
        let result = self
            .record(Call::GetQuestion(prefixed_id.clone()))
            .and_then(|()| {
                if broken {
                    Err(QuizServiceError::Timeout {
                        operation: "get_question",
                    })
                } else {
                    Ok(Some(QuestionBody {
                        question: format!("What does {prefixed_id} measure?"),
                        options: vec![
                            "Churn".into(),
                            "Margin".into(),
                            "Reach".into(),
                            "Latency".into(),
                        ],
                        id: prefixed_id,
                    }))
                }
            });
        Box::pin(async move { result })
    }

    fn update_user_answers(&self, record: AttemptRecord) -> BoxFuture<'static, QuizResult<bool>> {
        let result = self.record(Call::UpdateUserAnswers(record)).map(|()| true);
        Box::pin(async move { result })
    }

    fn evaluate(
        &self,
        prefixed_ids: Vec<String>,
        answers: Vec<String>,
    ) -> BoxFuture<'static, QuizResult<EvaluationReport>> {
        let total = u32::try_from(prefixed_ids.len()).unwrap_or(u32::MAX);
        let (correct, delay) = {
            let script = self.script();
            (script.correct_answers.min(total), script.evaluation_delay)
        };
        let result = self
            .record(Call::Evaluate {
                ids: prefixed_ids,
                answers,
            })
            .map(|()| EvaluationReport {
                success: true,
                message: None,
                total_questions: total,
                correct_answers: correct,
                incorrect_answers: total - correct,
                score_percentage: if total == 0 {
                    0.0
                } else {
                    f64::from(correct) / f64::from(total) * 100.0
                },
            });
        Box::pin(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            result
        })
    }

    fn get_winner_count(&self) -> BoxFuture<'static, QuizResult<u32>> {
        let result = self
            .record(Call::GetWinnerCount)
            .map(|()| self.script().winner_count);
        Box::pin(async move { result })
    }

    fn increment_winner_count(&self, claim: WinnerClaim) -> BoxFuture<'static, QuizResult<u32>> {
        let result = self.record(Call::IncrementWinnerCount(claim)).map(|()| {
            let mut script = self.script();
            script.winner_count += 1;
            script.winner_count
        });
        Box::pin(async move { result })
    }

    fn health_check(&self) -> BoxFuture<'static, QuizResult<()>> {
        let result = self.record(Call::HealthCheck);
        Box::pin(async move { result })
    }
}

/// Settings with every pacing pause removed.
pub fn instant_settings() -> FlowSettings {
    FlowSettings {
        pacing: Pacing::instant(),
        ..FlowSettings::default()
    }
}

/// Application configuration with instant pacing.
pub fn instant_config() -> AppConfig {
    AppConfig {
        flow: instant_settings(),
        ..AppConfig::default()
    }
}
