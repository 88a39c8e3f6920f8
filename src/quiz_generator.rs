use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use crate::config::LLMConfig;
use crate::llm_providers::{CompletionProvider, JsonResponseParser, OpenAIProvider};
use crate::models::{AnswerType, DifficultyLevel, QuestionItem, QuizDefinition, DEFAULT_QUESTION_COUNT};

use crate::log_llm_operation;

const SYSTEM_MESSAGE: &str = "You are a helpful assistant for generating quizzes.";

const MAX_QUESTION_COUNT: u32 = 50;

fn default_question_count() -> u32 {
    DEFAULT_QUESTION_COUNT
}

/// Everything the generate form collects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizGenerationRequest {
    pub lesson: String,
    pub topic: String,
    /// Lesson material the questions are drawn from.
    pub source_text: String,
    #[serde(default = "default_question_count")]
    pub question_count: u32,
    pub answer_type: AnswerType,
    pub level: DifficultyLevel,
    pub duration_seconds: u32,
}

impl QuizGenerationRequest {
    pub fn validate(&self) -> Result<()> {
        if self.source_text.trim().is_empty() {
            return Err(anyhow!("source_text must not be empty"));
        }
        if self.question_count == 0 || self.question_count > MAX_QUESTION_COUNT {
            return Err(anyhow!(
                "question_count must be between 1 and {}",
                MAX_QUESTION_COUNT
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub question: String,
    pub options: Vec<String>,
    #[serde(alias = "answer")]
    pub correct_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedQuiz {
    pub questions: Vec<GeneratedQuestion>,
}

/// Builds quiz definitions from lesson material with a chat-completions model.
#[derive(Clone)]
pub struct QuizGenerator {
    provider: Arc<dyn CompletionProvider>,
    json_parser: JsonResponseParser,
}

impl QuizGenerator {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self {
            provider,
            json_parser: JsonResponseParser,
        }
    }

    pub fn from_config(config: &LLMConfig) -> Self {
        Self::new(Arc::new(OpenAIProvider::from_config(config)))
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub fn model_name(&self) -> &str {
        self.provider.model_name()
    }

    pub fn build_prompt(request: &QuizGenerationRequest) -> String {
        let options_line = match request.answer_type {
            AnswerType::YesNo => "2 options: \"Yes\" and \"No\"".to_string(),
            AnswerType::MultipleChoice => format!("{} options", AnswerType::MultipleChoice.option_count()),
        };
        let minutes = (request.duration_seconds / 60).max(1);

        format!(
            r#"Generate a quiz based on the following content. Requirements:
- The answer type of every question is {answer_type}
- Create {count} questions
- Each question should have {options_line}
- Clearly mark the correct answer by repeating the exact option text
- Ensure questions test comprehensive understanding
- The quiz should be of difficulty ({level}).
- The quiz is related to the lesson and topic: {lesson} - {topic}
- The quiz duration should be around {minutes} minutes.
- Respond in JSON format with a 'questions' array of objects with "question", "options" and "correct_answer".

Content:
{content}"#,
            answer_type = request.answer_type.label(),
            count = request.question_count,
            options_line = options_line,
            level = request.level.label(),
            lesson = request.lesson,
            topic = request.topic,
            minutes = minutes,
            content = request.source_text.trim(),
        )
    }

    /// Turn a model reply into a selectable quiz definition.
    pub fn parse_reply(&self, reply: &str, request: &QuizGenerationRequest) -> Result<QuizDefinition> {
        let generated: GeneratedQuiz = self.json_parser.parse_json_response(reply)?;

        let questions: Vec<QuestionItem> = generated
            .questions
            .into_iter()
            .map(|question| {
                let correct_answer = resolve_correct_answer(&question.options, &question.correct_answer);
                QuestionItem {
                    prompt: question.question.trim().to_string(),
                    options: question.options,
                    correct_answer,
                }
            })
            .collect();

        for (index, question) in questions.iter().enumerate() {
            if !request.answer_type.accepts(&question.options) {
                return Err(anyhow!(
                    "question {} does not fit answer type {}: options {:?}",
                    index,
                    request.answer_type.label(),
                    question.options
                ));
            }
        }

        let quiz = QuizDefinition {
            id: Uuid::new_v4().to_string(),
            duration_seconds: request.duration_seconds,
            level: request.level,
            questions,
            topic: Some(request.topic.clone()),
            lesson: Some(request.lesson.clone()),
        };
        quiz.validate()?;
        Ok(quiz)
    }

    pub async fn generate(&self, request: &QuizGenerationRequest) -> Result<QuizDefinition> {
        request.validate()?;
        log_llm_operation!(
            start,
            "generate_quiz",
            model = self.model_name(),
            question_count = request.question_count
        );

        let started = Instant::now();
        let prompt = Self::build_prompt(request);
        let reply = match self.provider.complete(Some(SYSTEM_MESSAGE), &prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                log_llm_operation!(error, "generate_quiz", model = self.model_name(), error = e);
                return Err(e);
            }
        };

        let quiz = self.parse_reply(&reply, request).inspect_err(|e| {
            log_llm_operation!(error, "generate_quiz", model = self.model_name(), error = e);
        })?;

        if quiz.questions.len() != request.question_count as usize {
            log_llm_operation!(
                warn,
                "generate_quiz",
                format!(
                    "requested {} questions, model returned {}",
                    request.question_count,
                    quiz.questions.len()
                )
            );
        }

        log_llm_operation!(
            success,
            "generate_quiz",
            model = self.model_name(),
            duration_ms = started.elapsed().as_millis() as u64
        );
        Ok(quiz)
    }
}

/// Models sometimes answer with the option letter ("B") instead of its text.
fn resolve_correct_answer(options: &[String], answer: &str) -> String {
    let answer = answer.trim();
    if options.iter().any(|o| o == answer) {
        return answer.to_string();
    }

    let letter = answer.trim_end_matches(['.', ')']);
    if letter.len() == 1 {
        if let Some(c) = letter.chars().next().map(|c| c.to_ascii_uppercase()) {
            if c.is_ascii_uppercase() {
                let index = (c as u8 - b'A') as usize;
                if let Some(option) = options.get(index) {
                    return option.clone();
                }
            }
        }
    }

    answer.to_string()
}
