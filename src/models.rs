use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{DefinitionError, SessionError};

/// Duration presets offered when a quiz is authored, in seconds.
pub const DURATION_PRESETS: [(u32, &str); 9] = [
    (120, "2 min"),
    (180, "3 min"),
    (240, "4 min"),
    (300, "5 min"),
    (600, "10 min"),
    (900, "15 min"),
    (1200, "20 min"),
    (1800, "30 min"),
    (2700, "45 min"),
];

/// Question counts offered by the quiz generator.
pub const QUESTION_COUNT_PRESETS: [u32; 8] = [10, 15, 20, 25, 30, 35, 40, 45];

pub const DEFAULT_QUESTION_COUNT: u32 = 10;

/// Human readable label for a quiz duration, e.g. `"5 min"`.
pub fn duration_label(seconds: u32) -> &'static str {
    DURATION_PRESETS
        .iter()
        .find(|(time, _)| *time == seconds)
        .map(|(_, text)| *text)
        .unwrap_or("Unknown Duration")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "LevelRepr", into = "u8")]
pub enum DifficultyLevel {
    Basic,
    Intermediate,
    Advanced,
}

/// Levels arrive either as an ordinal (`1`, `"1"`) or by name (`"Intermediate"`).
#[derive(Deserialize)]
#[serde(untagged)]
enum LevelRepr {
    Index(u8),
    Text(String),
}

impl DifficultyLevel {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Basic),
            1 => Some(Self::Intermediate),
            2 => Some(Self::Advanced),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Self::Basic => 0,
            Self::Intermediate => 1,
            Self::Advanced => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Basic => "Basic",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }
}

impl TryFrom<LevelRepr> for DifficultyLevel {
    type Error = String;

    fn try_from(repr: LevelRepr) -> Result<Self, Self::Error> {
        match repr {
            LevelRepr::Index(index) => {
                Self::from_index(index).ok_or_else(|| format!("unknown difficulty level {}", index))
            }
            LevelRepr::Text(text) => {
                let trimmed = text.trim();
                if let Ok(index) = trimmed.parse::<u8>() {
                    return Self::from_index(index)
                        .ok_or_else(|| format!("unknown difficulty level {}", index));
                }
                match trimmed.to_lowercase().as_str() {
                    "basic" => Ok(Self::Basic),
                    "intermediate" => Ok(Self::Intermediate),
                    "advanced" => Ok(Self::Advanced),
                    _ => Err(format!("unknown difficulty level '{}'", text)),
                }
            }
        }
    }
}

impl From<DifficultyLevel> for u8 {
    fn from(level: DifficultyLevel) -> Self {
        level.index()
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The kind of answers a generated quiz offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerType {
    #[serde(rename = "Yes/No", alias = "True/False", alias = "yes_no")]
    YesNo,
    #[serde(rename = "Multiple choice", alias = "multiple_choice")]
    MultipleChoice,
}

impl AnswerType {
    pub fn label(self) -> &'static str {
        match self {
            Self::YesNo => "Yes/No",
            Self::MultipleChoice => "Multiple choice",
        }
    }

    pub fn option_count(self) -> usize {
        match self {
            Self::YesNo => 2,
            Self::MultipleChoice => 4,
        }
    }

    /// Whether a question's options fit this answer type. Yes/No questions
    /// offer exactly "Yes" and "No".
    pub fn accepts(self, options: &[String]) -> bool {
        if options.len() != self.option_count() {
            return false;
        }
        match self {
            Self::YesNo => ["Yes", "No"].iter().all(|label| options.iter().any(|o| o == label)),
            Self::MultipleChoice => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionItem {
    #[serde(rename = "question")]
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

impl QuestionItem {
    pub fn offers(&self, option: &str) -> bool {
        self.options.iter().any(|o| o == option)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizDefinition {
    pub id: String,
    #[serde(rename = "duration", alias = "duration_seconds")]
    pub duration_seconds: u32,
    pub level: DifficultyLevel,
    #[serde(rename = "content", alias = "questions", default)]
    pub questions: Vec<QuestionItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lesson: Option<String>,
}

impl QuizDefinition {
    /// Check the definition can back a session: at least one question, and every
    /// question offers two or more options containing its correct answer exactly once.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.questions.is_empty() {
            return Err(DefinitionError::EmptyQuiz {
                quiz_id: self.id.clone(),
            });
        }

        for (index, question) in self.questions.iter().enumerate() {
            let malformed = |reason: &str| DefinitionError::MalformedQuestion {
                quiz_id: self.id.clone(),
                index,
                reason: reason.to_string(),
            };

            if question.options.len() < 2 {
                return Err(malformed("fewer than two options"));
            }
            match question
                .options
                .iter()
                .filter(|o| **o == question.correct_answer)
                .count()
            {
                0 => return Err(malformed("correct answer is not among the options")),
                1 => {}
                _ => return Err(malformed("correct answer appears more than once")),
            }
        }

        Ok(())
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

/// Listing entry shown on quiz cards. Never carries questions or answers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: String,
    pub topic: Option<String>,
    pub lesson: Option<String>,
    pub level: DifficultyLevel,
    pub level_label: String,
    pub duration_seconds: u32,
    pub duration_label: String,
    pub question_count: usize,
}

impl From<&QuizDefinition> for QuizSummary {
    fn from(quiz: &QuizDefinition) -> Self {
        Self {
            id: quiz.id.clone(),
            topic: quiz.topic.clone(),
            lesson: quiz.lesson.clone(),
            level: quiz.level,
            level_label: quiz.level.label().to_string(),
            duration_seconds: quiz.duration_seconds,
            duration_label: duration_label(quiz.duration_seconds).to_string(),
            question_count: quiz.questions.len(),
        }
    }
}

/// Self-reported rating of how well the user knew a revealed answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct ConfidenceLevel(u8);

impl ConfidenceLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Not at all",
            2 => "Slightly",
            3 => "Moderately",
            4 => "Very well",
            _ => "Perfectly",
        }
    }

    pub fn all() -> impl Iterator<Item = ConfidenceLevel> {
        (Self::MIN..=Self::MAX).map(ConfidenceLevel)
    }
}

impl TryFrom<u8> for ConfidenceLevel {
    type Error = SessionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(ConfidenceLevel(value))
        } else {
            Err(SessionError::InvalidConfidence(value))
        }
    }
}

impl From<ConfidenceLevel> for u8 {
    fn from(level: ConfidenceLevel) -> Self {
        level.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Running,
    Completed,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// How a session presents its questions and what result it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationMode {
    /// All questions at once, scored against the correct answers.
    #[default]
    Timed,
    /// One question at a time, answer revealed, confidence self-reported.
    Sequential,
}

impl fmt::Display for PresentationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timed => f.write_str("timed"),
            Self::Sequential => f.write_str("sequential"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    Finished,
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub correct_count: usize,
    pub wrong_count: usize,
    pub time_taken_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceSummary {
    pub average: f64,
    /// Keyed by level 1..=5; every level is present, unused ones are zero.
    pub counts: BTreeMap<u8, usize>,
    pub total: usize,
}

impl ConfidenceSummary {
    /// Average confidence on a 0-100 scale.
    pub fn average_percent(&self) -> f64 {
        self.average * 20.0
    }

    /// Share of ratings at `level`, 0-100.
    pub fn share_percent(&self, level: ConfidenceLevel) -> f64 {
        let count = self.counts.get(&level.value()).copied().unwrap_or(0);
        count as f64 / self.total.max(1) as f64 * 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionResult {
    Correctness(ScoreResult),
    Confidence(ConfidenceSummary),
}

impl SessionResult {
    pub fn score(&self) -> Option<&ScoreResult> {
        match self {
            Self::Correctness(score) => Some(score),
            Self::Confidence(_) => None,
        }
    }

    pub fn confidence(&self) -> Option<&ConfidenceSummary> {
        match self {
            Self::Confidence(summary) => Some(summary),
            Self::Correctness(_) => None,
        }
    }
}

/// One row of the results screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionReview {
    pub prompt: String,
    pub your_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
}

/// A question as shown to the person taking the quiz.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_answer: Option<String>,
}

/// Read-only view of a session for the hosting page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: uuid::Uuid,
    pub quiz_id: String,
    pub mode: PresentationMode,
    pub status: SessionStatus,
    pub duration_seconds: u32,
    pub remaining_seconds: u32,
    pub current_question_index: usize,
    pub answer_revealed: bool,
    pub answers: BTreeMap<usize, String>,
    pub confidence: BTreeMap<usize, ConfidenceLevel>,
    pub questions: Vec<QuestionView>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completion: Option<CompletionReason>,
    pub result: Option<SessionResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: &[&str], correct: &str) -> QuestionItem {
        QuestionItem {
            prompt: "Pick one".to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct_answer: correct.to_string(),
        }
    }

    fn quiz(questions: Vec<QuestionItem>) -> QuizDefinition {
        QuizDefinition {
            id: "quiz-1".to_string(),
            duration_seconds: 120,
            level: DifficultyLevel::Basic,
            questions,
            topic: None,
            lesson: None,
        }
    }

    #[test]
    fn test_duration_labels() {
        assert_eq!(duration_label(120), "2 min");
        assert_eq!(duration_label(2700), "45 min");
        assert_eq!(duration_label(61), "Unknown Duration");
        assert!(QUESTION_COUNT_PRESETS.contains(&DEFAULT_QUESTION_COUNT));
    }

    #[test]
    fn test_level_parsing_accepts_ordinals_and_names() {
        let cases = vec![
            ("0", DifficultyLevel::Basic),
            ("\"1\"", DifficultyLevel::Intermediate),
            ("\"Advanced\"", DifficultyLevel::Advanced),
            ("\"basic\"", DifficultyLevel::Basic),
        ];
        for (json, expected) in cases {
            let level: DifficultyLevel = serde_json::from_str(json).unwrap();
            assert_eq!(level, expected, "input {}", json);
        }

        assert!(serde_json::from_str::<DifficultyLevel>("7").is_err());
        assert!(serde_json::from_str::<DifficultyLevel>("\"expert\"").is_err());
        assert_eq!(serde_json::to_string(&DifficultyLevel::Advanced).unwrap(), "2");
    }

    #[test]
    fn test_quiz_definition_wire_shape() {
        let json = r#"{
            "id": "q-42",
            "duration": 300,
            "level": "2",
            "topic": "Fractions",
            "content": [
                {"question": "Is 1/2 > 1/3?", "options": ["Yes", "No"], "correct_answer": "Yes"}
            ]
        }"#;
        let quiz: QuizDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(quiz.duration_seconds, 300);
        assert_eq!(quiz.level, DifficultyLevel::Advanced);
        assert_eq!(quiz.questions[0].prompt, "Is 1/2 > 1/3?");
        assert_eq!(quiz.topic.as_deref(), Some("Fractions"));
        assert!(quiz.lesson.is_none());
    }

    #[test]
    fn test_validate_rejects_malformed_definitions() {
        assert!(matches!(
            quiz(vec![]).validate(),
            Err(DefinitionError::EmptyQuiz { .. })
        ));
        assert!(matches!(
            quiz(vec![question(&["A", "B"], "C")]).validate(),
            Err(DefinitionError::MalformedQuestion { index: 0, .. })
        ));
        assert!(matches!(
            quiz(vec![question(&["A", "B"], "A"), question(&["A", "A"], "A")]).validate(),
            Err(DefinitionError::MalformedQuestion { index: 1, .. })
        ));
        assert!(matches!(
            quiz(vec![question(&["A"], "A")]).validate(),
            Err(DefinitionError::MalformedQuestion { .. })
        ));
        assert!(quiz(vec![question(&["Yes", "No"], "No")]).validate().is_ok());
    }

    #[test]
    fn test_answer_type_accepts_matching_options() {
        let options = |labels: &[&str]| labels.iter().map(|l| l.to_string()).collect::<Vec<_>>();

        assert!(AnswerType::YesNo.accepts(&options(&["Yes", "No"])));
        assert!(AnswerType::YesNo.accepts(&options(&["No", "Yes"])));
        assert!(!AnswerType::YesNo.accepts(&options(&["True", "False"])));
        assert!(!AnswerType::YesNo.accepts(&options(&["Yes", "No", "Maybe"])));
        assert!(!AnswerType::YesNo.accepts(&options(&["Yes", "Yes"])));

        assert!(AnswerType::MultipleChoice.accepts(&options(&["a", "b", "c", "d"])));
        assert!(!AnswerType::MultipleChoice.accepts(&options(&["a", "b"])));
        assert!(!AnswerType::MultipleChoice.accepts(&options(&["a", "b", "c", "d", "e"])));
    }

    #[test]
    fn test_confidence_level_bounds() {
        assert!(ConfidenceLevel::try_from(0u8).is_err());
        assert!(ConfidenceLevel::try_from(6u8).is_err());
        let level = ConfidenceLevel::try_from(4u8).unwrap();
        assert_eq!(level.label(), "Very well");
        assert_eq!(ConfidenceLevel::all().count(), 5);
        assert!(serde_json::from_str::<ConfidenceLevel>("9").is_err());
    }

    #[test]
    fn test_summary_hides_questions() {
        let summary = QuizSummary::from(&quiz(vec![question(&["A", "B"], "A")]));
        assert_eq!(summary.duration_label, "2 min");
        assert_eq!(summary.level_label, "Basic");
        assert_eq!(summary.question_count, 1);
    }
}
