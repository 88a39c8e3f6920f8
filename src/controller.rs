use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use uuid::Uuid;

use crate::errors::{DefinitionError, SessionError};
use crate::models::{
    ConfidenceLevel, PresentationMode, QuestionReview, QuizDefinition, SessionResult,
    SessionSnapshot, SessionStatus,
};
use crate::session::{QuizSession, TickOutcome};
use crate::timer::{CountdownTimer, TickControl};

use crate::log_session_event;

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the controller and its countdown task.
#[derive(Debug)]
struct SessionCell {
    session: Mutex<QuizSession>,
    outcome: watch::Sender<Option<SessionResult>>,
    completed_at: Mutex<Option<Instant>>,
}

impl SessionCell {
    fn publish(&self, result: SessionResult) {
        *lock(&self.completed_at) = Some(Instant::now());
        self.outcome.send_replace(Some(result));
    }
}

/// Drives one quiz attempt: owns the session state and its countdown.
///
/// Dropping the controller (or calling [`SessionController::close`]) aborts the
/// countdown, so no tick can reach a discarded session.
#[derive(Debug)]
pub struct SessionController {
    id: Uuid,
    cell: Arc<SessionCell>,
    timer: Mutex<Option<CountdownTimer>>,
    tick_period: Duration,
    created_at: Instant,
}

impl SessionController {
    pub fn new(
        definition: Arc<QuizDefinition>,
        mode: PresentationMode,
    ) -> Result<Self, DefinitionError> {
        Self::with_tick_period(definition, mode, DEFAULT_TICK_PERIOD)
    }

    /// Like [`SessionController::new`] with a custom countdown period (one "second").
    pub fn with_tick_period(
        definition: Arc<QuizDefinition>,
        mode: PresentationMode,
        tick_period: Duration,
    ) -> Result<Self, DefinitionError> {
        let session = QuizSession::new(definition, mode)?;
        let (outcome, _) = watch::channel(None);
        let id = Uuid::new_v4();

        log_session_event!("created", session_id = id, quiz_id = session.definition().id, mode = mode);

        Ok(Self {
            id,
            cell: Arc::new(SessionCell {
                session: Mutex::new(session),
                outcome,
                completed_at: Mutex::new(None),
            }),
            timer: Mutex::new(None),
            tick_period,
            created_at: Instant::now(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> SessionStatus {
        lock(&self.cell.session).status()
    }

    /// Start the attempt and its countdown. Must be called inside a tokio runtime.
    pub fn start(&self) -> Result<(), SessionError> {
        let mut session = lock(&self.cell.session);
        session.start()?;

        if let Some(result) = session.result() {
            log_session_event!("expired", session_id = self.id, "zero-length budget");
            self.cell.publish(result.clone());
            return Ok(());
        }

        let weak = Arc::downgrade(&self.cell);
        let session_id = self.id;
        let timer = CountdownTimer::spawn(self.tick_period, move || countdown_tick(&weak, session_id));
        *lock(&self.timer) = Some(timer);

        log_session_event!("started", session_id = self.id, remaining_seconds = session.remaining_seconds());
        Ok(())
    }

    pub fn answer(&self, question_index: usize, option: &str) -> Result<(), SessionError> {
        lock(&self.cell.session).answer(question_index, option)
    }

    pub fn advance(&self) -> Result<usize, SessionError> {
        lock(&self.cell.session).advance()
    }

    pub fn go_to(&self, question_index: usize) -> Result<(), SessionError> {
        lock(&self.cell.session).go_to(question_index)
    }

    /// Reveal the current question's correct answer.
    pub fn reveal_answer(&self) -> Result<String, SessionError> {
        lock(&self.cell.session)
            .reveal_answer()
            .map(str::to_string)
    }

    pub fn select_confidence(&self, level: u8) -> Result<(), SessionError> {
        let level = ConfidenceLevel::try_from(level)?;
        lock(&self.cell.session).select_confidence(level)
    }

    /// Complete the attempt by hand and stop the countdown.
    pub fn finish(&self) -> Result<SessionResult, SessionError> {
        let result = lock(&self.cell.session).finish()?;
        self.stop_timer();
        self.cell.publish(result.clone());

        log_session_event!("finished", session_id = self.id);
        Ok(result)
    }

    pub fn result(&self) -> Option<SessionResult> {
        lock(&self.cell.session).result().cloned()
    }

    pub fn review(&self) -> Option<Vec<QuestionReview>> {
        lock(&self.cell.session).review()
    }

    /// Receive the result once the session completes, by hand or by expiry.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionResult>> {
        self.cell.outcome.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let session = lock(&self.cell.session);
        SessionSnapshot {
            session_id: self.id,
            quiz_id: session.definition().id.clone(),
            mode: session.mode(),
            status: session.status(),
            duration_seconds: session.definition().duration_seconds,
            remaining_seconds: session.remaining_seconds(),
            current_question_index: session.current_question_index(),
            answer_revealed: session.answer_revealed(),
            answers: session.answers().clone(),
            confidence: session.confidence().clone(),
            questions: session.question_views(),
            started_at: session.started_at(),
            completed_at: session.completed_at(),
            completion: session.completion(),
            result: session.result().cloned(),
        }
    }

    pub fn countdown_active(&self) -> bool {
        lock(&self.timer)
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }

    /// True once an idle or completed session has sat untouched for `retention`.
    /// Running sessions are never stale; they end by expiry.
    pub fn is_stale(&self, retention: Duration) -> bool {
        let since = match self.status() {
            SessionStatus::Running => return false,
            SessionStatus::Idle => self.created_at,
            SessionStatus::Completed => (*lock(&self.cell.completed_at)).unwrap_or(self.created_at),
        };
        since.elapsed() >= retention
    }

    fn stop_timer(&self) {
        if let Some(timer) = lock(&self.timer).take() {
            timer.cancel();
        }
    }

    /// Discard the session from any state, returning its result if it completed.
    pub fn close(self) -> Option<SessionResult> {
        self.stop_timer();
        log_session_event!("closed", session_id = self.id);
        self.result()
    }
}

fn countdown_tick(cell: &Weak<SessionCell>, session_id: Uuid) -> TickControl {
    let Some(cell) = cell.upgrade() else {
        return TickControl::Stop;
    };

    let outcome = lock(&cell.session).tick();
    match outcome {
        TickOutcome::Running(_) => TickControl::Continue,
        TickOutcome::Expired(result) => {
            log_session_event!("expired", session_id = session_id, "time budget exhausted");
            cell.publish(result);
            TickControl::Stop
        }
        TickOutcome::Inactive => TickControl::Stop,
    }
}
