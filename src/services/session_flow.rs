use std::{
    sync::{
        Arc, Mutex as StdMutex, PoisonError, Weak,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use tokio::{
    sync::Mutex,
    time::{Instant, sleep},
};
use tracing::{debug, info, warn};

use crate::{
    config::FlowSettings,
    dao::{models::WinnerClaim, quiz_service::QuizService},
    dto::validation::is_email,
    services::{
        countdown::{Countdown, CountdownListener},
        evaluation::EvaluationCoordinator,
        question_loop::{LoopStep, QuestionLoop},
        roulette::RouletteEngine,
    },
    state::{
        SessionState, SharedSession,
        session::{Profile, QuizAttempt, RouletteStage},
        state_machine::{SessionEvent, SessionPhase},
        transcript::LineKind,
    },
};

/// Handle to a session flow shared by routes and background tasks.
pub type SharedFlow = Arc<SessionFlow>;

const BOOT_SEQUENCE: [&str; 4] = [
    "Initializing Delfos analytics core...",
    "Loading question matrix...",
    "Establishing secure channel...",
    "Calibrating countdown module...",
];
const EMAIL_PROMPT: &str = "Enter your email address to begin:";
const MENU_PROMPT: &str = "Select your profile (1, 2 or 3):";
const CLEAR_COMMAND: &str = "clear";

/// Orchestrates one terminal session: owns the phase, the countdown and the
/// running quiz, and routes every submission.
///
/// Submissions are serialized by the quiz slot lock. Countdown callbacks never
/// take that lock; they race the submission path through the state machine,
/// which rejects whichever of expiry or result comes second.
pub struct SessionFlow {
    session: SharedSession,
    settings: FlowSettings,
    service: Arc<dyn QuizService>,
    countdown: Countdown,
    evaluator: EvaluationCoordinator,
    roulette: RouletteEngine,
    quiz: Mutex<Option<QuestionLoop>>,
    started: AtomicBool,
    last_activity: StdMutex<Instant>,
}

impl SessionFlow {
    /// Create a session in the boot phase. Nothing runs until [`Self::start`].
    pub fn new(
        id: impl Into<String>,
        service: Arc<dyn QuizService>,
        settings: FlowSettings,
    ) -> SharedFlow {
        Arc::new(Self {
            session: SessionState::new(id, settings.countdown_seconds),
            evaluator: EvaluationCoordinator::new(service.clone()),
            roulette: RouletteEngine::new(service.clone(), &settings),
            countdown: Countdown::new(),
            quiz: Mutex::new(None),
            started: AtomicBool::new(false),
            last_activity: StdMutex::new(Instant::now()),
            service,
            settings,
        })
    }

    /// State of the session driven by this flow.
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Time since the session was created or last received a submission.
    pub fn idle_for(&self) -> Duration {
        self.lock_activity().elapsed()
    }

    /// True while the countdown has a live run.
    pub fn countdown_running(&self) -> bool {
        self.countdown.is_running()
    }

    /// Print the boot sequence and open the terminal. Runs at most once.
    pub async fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(session_id = %self.session.id(), "session booting");

        let pacing = &self.settings.pacing;
        for message in BOOT_SEQUENCE {
            self.session.append_line(LineKind::System, message);
            pause(pacing.boot_step).await;
        }
        pause(pacing.boot_settle).await;

        if let Err(err) = self.session.transition(SessionEvent::BootCompleted) {
            debug!(session_id = %self.session.id(), error = %err, "boot completed out of order");
            return;
        }
        self.session.update(|snapshot| snapshot.session.connected = true);
        self.session
            .append_line(LineKind::System, "System initialized.");
        self.session
            .append_line(LineKind::System, "Terminal ready.");
        self.session.append_line(LineKind::Prompt, EMAIL_PROMPT);
    }

    /// Single entry point for typed input, routed by the current phase.
    pub async fn submit(self: &Arc<Self>, text: &str) {
        self.touch();
        let text = text.trim();
        let mut quiz = self.quiz.lock().await;
        let phase = self.session.phase();

        if text.is_empty() {
            if phase == SessionPhase::Passed {
                self.session.set_awaiting(true);
                self.spin_roulette().await;
                self.session.set_awaiting(false);
            }
            return;
        }

        self.session
            .append_line(LineKind::Input, format!("> {text}"));
        if !phase.is_interactive() {
            debug!(session_id = %self.session.id(), ?phase, "input ignored");
            if phase == SessionPhase::Passed {
                self.session.append_line(
                    LineKind::System,
                    "Press Enter on an empty line to spin the roulette.",
                );
            }
            return;
        }

        self.session.set_awaiting(true);

        if text.eq_ignore_ascii_case(CLEAR_COMMAND) {
            self.clear_terminal(phase, quiz.as_ref());
        } else {
            match phase {
                SessionPhase::CollectingEmail => self.handle_email(text).await,
                SessionPhase::ProfileMenu => self.handle_profile(text, &mut quiz).await,
                SessionPhase::Quizzing => self.handle_answer(text, &mut quiz).await,
                _ => {}
            }
        }

        self.session.set_awaiting(false);
    }

    /// Stop the countdown for good; called when the hosting view goes away.
    pub fn shutdown(&self) {
        self.countdown.stop();
        info!(session_id = %self.session.id(), "session closed");
    }

    fn touch(&self) {
        *self.lock_activity() = Instant::now();
    }

    fn lock_activity(&self) -> std::sync::MutexGuard<'_, Instant> {
        self.last_activity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn tick(&self, remaining: u32) {
        self.session.update_if(|snapshot| {
            if !snapshot.phase().counts_down() {
                return false;
            }
            snapshot.session.remaining_seconds = remaining;
            true
        });
    }

    /// Preempt the quiz with a timeout unless a result was already latched.
    fn expire(&self) {
        match self.session.transition(SessionEvent::CountdownExpired) {
            Ok(_) => {
                self.countdown.stop();
                self.session.update(|snapshot| {
                    snapshot.session.remaining_seconds = 0;
                    snapshot.awaiting_response = false;
                });
                self.session
                    .append_line(LineKind::System, "TIME UP. Session locked.");
                self.session.append_line(
                    LineKind::Output,
                    "The countdown reached zero before your answers were scored.",
                );
                info!(session_id = %self.session.id(), "session timed out");
            }
            Err(err) => {
                debug!(session_id = %self.session.id(), error = %err, "late countdown expiry ignored");
            }
        }
    }

    async fn handle_email(&self, text: &str) {
        if !is_email(text) {
            self.session.append_line(
                LineKind::Prompt,
                "Invalid email format. Please enter a valid email address:",
            );
            return;
        }

        let email = text.to_string();
        self.session
            .update(|snapshot| snapshot.session.user_email = Some(email.clone()));
        if let Err(err) = self.session.transition(SessionEvent::EmailAccepted) {
            debug!(session_id = %self.session.id(), error = %err, "email accepted out of order");
            return;
        }

        self.session
            .append_line(LineKind::System, "Registering operator...");
        match self
            .service
            .create_user(email, self.session.id().to_string())
            .await
        {
            Ok(()) => {
                self.session
                    .append_line(LineKind::System, "Operator registered.");
            }
            Err(err) => {
                warn!(session_id = %self.session.id(), error = %err, "user registration failed; offline mode");
                self.session
                    .update(|snapshot| snapshot.session.connected = false);
                self.session.append_line(
                    LineKind::System,
                    "Warning: user service unreachable. Continuing in offline mode.",
                );
            }
        }

        self.show_menu();
    }

    async fn handle_profile(self: &Arc<Self>, text: &str, quiz: &mut Option<QuestionLoop>) {
        let Some(profile) = Profile::from_menu_choice(text) else {
            self.session
                .append_line(LineKind::Output, "Invalid option.");
            self.session.append_line(LineKind::Prompt, MENU_PROMPT);
            return;
        };

        self.session.append_line(
            LineKind::System,
            format!("Loading {} questions...", profile.label()),
        );
        let question_ids = match self.service.choose_questions(profile).await {
            Ok(set) if !set.question_ids.is_empty() => set.question_ids,
            Ok(_) => {
                warn!(session_id = %self.session.id(), ?profile, "empty question set");
                self.session.append_line(
                    LineKind::System,
                    "No questions are available for this profile right now.",
                );
                self.session.append_line(LineKind::Prompt, MENU_PROMPT);
                return;
            }
            Err(err) => {
                warn!(session_id = %self.session.id(), ?profile, error = %err, "failed to choose questions");
                self.session.append_line(
                    LineKind::System,
                    "Question service unavailable. Please try again.",
                );
                self.session.append_line(LineKind::Prompt, MENU_PROMPT);
                return;
            }
        };

        if let Err(err) = self.session.transition(SessionEvent::ProfileSelected) {
            debug!(session_id = %self.session.id(), error = %err, "profile selected out of order");
            return;
        }

        let total = self.settings.countdown_seconds;
        self.session
            .update(|snapshot| snapshot.session.remaining_seconds = total);
        self.countdown.start(total, self.listener());
        info!(session_id = %self.session.id(), ?profile, questions = question_ids.len(), "quiz started");

        let clock = self.session.snapshot().session.clock();
        self.session.append_line(
            LineKind::System,
            format!(
                "Countdown started: {clock} to answer {} questions.",
                question_ids.len()
            ),
        );

        let attempt = QuizAttempt::new(profile, question_ids);
        let step = QuestionLoop::begin(attempt, self.service.clone(), self.session.clone()).await;
        self.settle(step, quiz).await;
    }

    async fn handle_answer(&self, text: &str, quiz: &mut Option<QuestionLoop>) {
        let Some(question_loop) = quiz.take() else {
            debug!(session_id = %self.session.id(), "answer without a running quiz");
            return;
        };
        let step = question_loop.submit_answer(text).await;
        self.settle(step, quiz).await;
    }

    async fn settle(&self, step: LoopStep, quiz: &mut Option<QuestionLoop>) {
        match step {
            LoopStep::Awaiting(question_loop) => *quiz = Some(question_loop),
            LoopStep::Completed(attempt) => self.evaluate(attempt).await,
            LoopStep::Abandoned => {
                debug!(session_id = %self.session.id(), "quiz abandoned");
            }
        }
    }

    async fn evaluate(&self, attempt: QuizAttempt) {
        if let Err(err) = self.session.transition(SessionEvent::AnswersCollected) {
            debug!(session_id = %self.session.id(), error = %err, "answers collected after the quiz ended");
            return;
        }
        self.session.append_line(
            LineKind::System,
            "All answers collected. Analysing your responses...",
        );

        let email = self.session.snapshot().session.user_email;
        if let Some(email) = email {
            self.evaluator
                .record_attempt(&email, self.session.id(), &attempt)
                .await;
        }
        pause(self.settings.pacing.thinking).await;

        let result = self.evaluator.evaluate(&attempt).await;
        let threshold = self.settings.pass_threshold;
        let passed = result.passed(threshold);
        let event = if passed {
            SessionEvent::EvaluationPassed
        } else {
            SessionEvent::EvaluationFailed
        };
        match self.session.transition(event) {
            Ok(phase) => {
                info!(session_id = %self.session.id(), ?phase, score = result.score_percentage, degraded = result.degraded, "attempt scored");
            }
            Err(err) => {
                debug!(session_id = %self.session.id(), error = %err, "evaluation arrived after the session ended");
                return;
            }
        }
        self.countdown.stop();
        pause(self.settings.pacing.result_reveal).await;

        let score_line = if result.degraded {
            format!(
                "Estimated score: {:.1}% ({} questions)",
                result.score_percentage, result.total_questions
            )
        } else {
            format!(
                "Score: {:.1}% ({} of {} correct)",
                result.score_percentage, result.correct_answers, result.total_questions
            )
        };
        let degraded = result.degraded;
        self.session
            .update(|snapshot| snapshot.evaluation = Some(result));
        self.session.append_line(LineKind::Output, score_line);
        if degraded {
            self.session.append_line(
                LineKind::System,
                "Scoring service unavailable: this result is a local estimate.",
            );
        }

        if passed {
            self.session
                .append_line(LineKind::Output, "ACCESS GRANTED. Challenge passed.");
            self.session.append_line(
                LineKind::Prompt,
                "Press Enter to spin the prize roulette.",
            );
        } else {
            self.session.append_line(
                LineKind::Output,
                format!("ACCESS DENIED. A score of {threshold:.1}% is required."),
            );
        }
    }

    async fn spin_roulette(&self) {
        if let Err(err) = self.session.transition(SessionEvent::RouletteRequested) {
            debug!(session_id = %self.session.id(), error = %err, "roulette requested out of order");
            return;
        }
        self.session
            .update(|snapshot| snapshot.roulette = Some(RouletteStage::Spinning));
        self.session
            .append_line(LineKind::System, "Spinning the roulette...");

        let winner_count = self.roulette.current_winner_count().await;
        pause(self.settings.pacing.spin).await;

        let claim = WinnerClaim {
            user_email: self.session.snapshot().session.user_email,
            session_id: Some(self.session.id().to_string()),
        };
        let prize = self.roulette.draw(winner_count, claim).await;
        pause(self.settings.pacing.settle).await;

        let announcement = prize.announcement();
        info!(session_id = %self.session.id(), ?prize, "roulette settled");
        self.session
            .update(|snapshot| snapshot.roulette = Some(RouletteStage::Settled(prize)));
        self.session.append_line(LineKind::Output, announcement);
    }

    /// Empty the transcript and show the prompt of the current phase again.
    fn clear_terminal(&self, phase: SessionPhase, quiz: Option<&QuestionLoop>) {
        self.session.clear_transcript();
        self.session
            .append_line(LineKind::Prompt, "Terminal cleared.");
        match phase {
            SessionPhase::CollectingEmail => {
                self.session.append_line(LineKind::Prompt, EMAIL_PROMPT);
            }
            SessionPhase::ProfileMenu => self.show_menu(),
            SessionPhase::Quizzing => {
                if let Some(question_loop) = quiz {
                    question_loop.redisplay();
                }
            }
            _ => {}
        }
    }

    fn show_menu(&self) {
        self.session
            .append_line(LineKind::Output, "Available profiles:");
        for profile in Profile::ALL {
            self.session.append_line(
                LineKind::Output,
                format!("[{}] {}", profile.menu_digit(), profile.label()),
            );
        }
        self.session.append_line(LineKind::Prompt, MENU_PROMPT);
    }

    fn listener(self: &Arc<Self>) -> Weak<dyn CountdownListener> {
        let weak: Weak<Self> = Arc::downgrade(self);
        weak
    }
}

impl CountdownListener for SessionFlow {
    fn on_tick(&self, remaining: u32) -> BoxFuture<'_, ()> {
        self.tick(remaining);
        Box::pin(async {})
    }

    fn on_expire(&self) -> BoxFuture<'_, ()> {
        self.expire();
        Box::pin(async {})
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}
