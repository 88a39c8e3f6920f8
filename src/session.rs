use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::errors::{DefinitionError, SessionError};
use crate::models::{
    CompletionReason, ConfidenceLevel, PresentationMode, QuestionReview, QuestionView,
    QuizDefinition, SessionResult, SessionStatus,
};
use crate::scoring::{aggregate_confidence, review_answers, score_answers};

/// What a countdown tick did to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Still running with this many seconds left.
    Running(u32),
    /// The tick consumed the last second and completed the session.
    Expired(SessionResult),
    /// The session is not running; the tick changed nothing.
    Inactive,
}

/// One attempt at a quiz. Pure state: time only moves when `tick` is called.
#[derive(Debug, Clone)]
pub struct QuizSession {
    definition: Arc<QuizDefinition>,
    mode: PresentationMode,
    status: SessionStatus,
    remaining_seconds: u32,
    answers: BTreeMap<usize, String>,
    confidence: BTreeMap<usize, ConfidenceLevel>,
    current_question_index: usize,
    answer_revealed: bool,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    completion: Option<CompletionReason>,
    result: Option<SessionResult>,
}

impl QuizSession {
    pub fn new(
        definition: Arc<QuizDefinition>,
        mode: PresentationMode,
    ) -> Result<Self, DefinitionError> {
        if definition.questions.is_empty() {
            return Err(DefinitionError::EmptyQuiz {
                quiz_id: definition.id.clone(),
            });
        }

        Ok(Self {
            remaining_seconds: definition.duration_seconds,
            definition,
            mode,
            status: SessionStatus::Idle,
            answers: BTreeMap::new(),
            confidence: BTreeMap::new(),
            current_question_index: 0,
            answer_revealed: false,
            started_at: None,
            completed_at: None,
            completion: None,
            result: None,
        })
    }

    pub fn definition(&self) -> &Arc<QuizDefinition> {
        &self.definition
    }

    pub fn mode(&self) -> PresentationMode {
        self.mode
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    pub fn answers(&self) -> &BTreeMap<usize, String> {
        &self.answers
    }

    pub fn confidence(&self) -> &BTreeMap<usize, ConfidenceLevel> {
        &self.confidence
    }

    pub fn current_question_index(&self) -> usize {
        self.current_question_index
    }

    pub fn answer_revealed(&self) -> bool {
        self.answer_revealed
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn completion(&self) -> Option<CompletionReason> {
        self.completion
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    fn question_count(&self) -> usize {
        self.definition.questions.len()
    }

    fn last_index(&self) -> usize {
        self.question_count() - 1
    }

    fn require_status(&self, action: &'static str, expected: SessionStatus) -> Result<(), SessionError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                action,
                status: self.status,
            })
        }
    }

    fn require_sequential(&self, action: &'static str) -> Result<(), SessionError> {
        if self.mode == PresentationMode::Sequential {
            Ok(())
        } else {
            Err(SessionError::ModeMismatch {
                action,
                required: PresentationMode::Sequential,
            })
        }
    }

    fn require_index(&self, index: usize) -> Result<(), SessionError> {
        if index < self.question_count() {
            Ok(())
        } else {
            Err(SessionError::QuestionOutOfRange {
                index,
                len: self.question_count(),
            })
        }
    }

    /// Begin the attempt. A zero-second budget completes the session immediately.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.require_status("start", SessionStatus::Idle)?;

        self.status = SessionStatus::Running;
        self.started_at = Some(Utc::now());
        debug!(
            quiz_id = %self.definition.id,
            mode = %self.mode,
            remaining_seconds = self.remaining_seconds,
            "Quiz session started"
        );

        if self.remaining_seconds == 0 {
            self.complete(CompletionReason::Expired);
        }
        Ok(())
    }

    /// Record `option` for question `index`, replacing any earlier answer.
    pub fn answer(&mut self, index: usize, option: &str) -> Result<(), SessionError> {
        self.require_status("answer", SessionStatus::Running)?;
        self.require_index(index)?;

        if !self.definition.questions[index].offers(option) {
            return Err(SessionError::OptionNotOffered {
                index,
                option: option.to_string(),
            });
        }

        self.answers.insert(index, option.to_string());
        Ok(())
    }

    /// Move to the next question. Earlier questions may be left unrated.
    pub fn advance(&mut self) -> Result<usize, SessionError> {
        self.require_sequential("advance")?;
        self.require_status("advance", SessionStatus::Running)?;

        if self.current_question_index >= self.last_index() {
            return Err(SessionError::NoNextQuestion);
        }

        self.current_question_index += 1;
        self.answer_revealed = false;
        Ok(self.current_question_index)
    }

    /// Jump straight to question `index`.
    pub fn go_to(&mut self, index: usize) -> Result<(), SessionError> {
        self.require_sequential("go_to")?;
        self.require_status("go_to", SessionStatus::Running)?;
        self.require_index(index)?;

        self.current_question_index = index;
        self.answer_revealed = false;
        Ok(())
    }

    /// Reveal the current question's correct answer.
    pub fn reveal_answer(&mut self) -> Result<&str, SessionError> {
        self.require_sequential("reveal_answer")?;
        self.require_status("reveal_answer", SessionStatus::Running)?;

        self.answer_revealed = true;
        Ok(&self.definition.questions[self.current_question_index].correct_answer)
    }

    /// Rate how well the current (revealed) question was known.
    pub fn select_confidence(&mut self, level: ConfidenceLevel) -> Result<(), SessionError> {
        self.require_sequential("select_confidence")?;
        self.require_status("select_confidence", SessionStatus::Running)?;

        if !self.answer_revealed {
            return Err(SessionError::AnswerNotRevealed);
        }

        self.confidence.insert(self.current_question_index, level);
        Ok(())
    }

    /// Consume one second of the budget.
    pub fn tick(&mut self) -> TickOutcome {
        if self.status != SessionStatus::Running {
            return TickOutcome::Inactive;
        }

        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.remaining_seconds > 0 {
            return TickOutcome::Running(self.remaining_seconds);
        }

        TickOutcome::Expired(self.complete(CompletionReason::Expired))
    }

    /// Complete the attempt by hand.
    ///
    /// In sequential mode the last question must carry a confidence rating first.
    pub fn finish(&mut self) -> Result<SessionResult, SessionError> {
        self.require_status("finish", SessionStatus::Running)?;

        if self.mode == PresentationMode::Sequential && !self.confidence.contains_key(&self.last_index()) {
            return Err(SessionError::ConfidenceRequired {
                question_index: self.last_index(),
            });
        }

        Ok(self.complete(CompletionReason::Finished))
    }

    fn complete(&mut self, reason: CompletionReason) -> SessionResult {
        let time_taken_seconds = self.definition.duration_seconds - self.remaining_seconds;
        let result = match self.mode {
            PresentationMode::Timed => SessionResult::Correctness(score_answers(
                &self.definition,
                &self.answers,
                time_taken_seconds,
            )),
            PresentationMode::Sequential => {
                SessionResult::Confidence(aggregate_confidence(self.confidence.values().copied()))
            }
        };

        self.status = SessionStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.completion = Some(reason);
        self.result = Some(result.clone());
        debug!(
            quiz_id = %self.definition.id,
            reason = ?reason,
            time_taken_seconds,
            "Quiz session completed"
        );
        result
    }

    /// Per-question breakdown, available once the session has completed.
    pub fn review(&self) -> Option<Vec<QuestionReview>> {
        (self.status == SessionStatus::Completed)
            .then(|| review_answers(&self.definition, &self.answers))
    }

    /// Questions as the taker may see them right now.
    pub fn question_views(&self) -> Vec<QuestionView> {
        let completed = self.status == SessionStatus::Completed;
        self.definition
            .questions
            .iter()
            .enumerate()
            .map(|(index, question)| {
                let revealed = completed
                    || (self.answer_revealed && index == self.current_question_index);
                QuestionView {
                    prompt: question.prompt.clone(),
                    options: question.options.clone(),
                    correct_answer: revealed.then(|| question.correct_answer.clone()),
                }
            })
            .collect()
    }

    /// Discard the attempt, handing back the result if it had one.
    pub fn close(self) -> Option<SessionResult> {
        self.result
    }
}
