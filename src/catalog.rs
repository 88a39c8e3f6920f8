use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::{CatalogError, DefinitionError};
use crate::models::{QuizDefinition, QuizSummary};

use crate::log_validation;

/// The pre-fetched quiz list sessions are created from.
///
/// Entries are kept in load order. Malformed entries are listed but can't be
/// selected.
#[derive(Debug, Clone, Default)]
pub struct QuizCatalog {
    quizzes: Arc<RwLock<Vec<Arc<QuizDefinition>>>>,
}

impl QuizCatalog {
    pub fn new(quizzes: Vec<QuizDefinition>) -> Self {
        for quiz in &quizzes {
            if let Err(e) = quiz.validate() {
                log_validation!(failure, "catalog", error = e);
            }
        }

        Self {
            quizzes: Arc::new(RwLock::new(quizzes.into_iter().map(Arc::new).collect())),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let quizzes: Vec<QuizDefinition> = serde_json::from_str(json)?;
        Ok(Self::new(quizzes))
    }

    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_json_str(&content)?;
        let quiz_count = catalog.len().await;

        info!(
            path = %path.display(),
            quiz_count,
            "Quiz catalog loaded"
        );
        Ok(catalog)
    }

    pub async fn len(&self) -> usize {
        self.quizzes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.quizzes.read().await.is_empty()
    }

    /// Summaries in load order, optionally limited to one topic title.
    pub async fn list(&self, topic: Option<&str>) -> Vec<QuizSummary> {
        let quizzes = self.quizzes.read().await;
        quizzes
            .iter()
            .filter(|quiz| topic.is_none_or(|t| quiz.topic.as_deref() == Some(t)))
            .map(|quiz| QuizSummary::from(quiz.as_ref()))
            .collect()
    }

    pub async fn get(&self, id: &str) -> Option<Arc<QuizDefinition>> {
        let quizzes = self.quizzes.read().await;
        quizzes.iter().find(|quiz| quiz.id == id).cloned()
    }

    /// Validation outcome of every entry, in load order.
    pub async fn check(&self) -> Vec<(QuizSummary, Result<(), DefinitionError>)> {
        let quizzes = self.quizzes.read().await;
        quizzes
            .iter()
            .map(|quiz| (QuizSummary::from(quiz.as_ref()), quiz.validate()))
            .collect()
    }

    /// Resolve a quiz for a new session, rejecting definitions that cannot be taken.
    pub async fn select_quiz(&self, id: &str) -> Result<Arc<QuizDefinition>, CatalogError> {
        let quiz = self
            .get(id)
            .await
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;

        quiz.validate()?;
        debug!(quiz_id = %id, question_count = quiz.question_count(), "Quiz selected");
        Ok(quiz)
    }

    /// Add a validated quiz, e.g. one produced by the generator.
    pub async fn insert(&self, quiz: QuizDefinition) -> Result<Arc<QuizDefinition>, CatalogError> {
        quiz.validate()?;

        let mut quizzes = self.quizzes.write().await;
        if quizzes.iter().any(|existing| existing.id == quiz.id) {
            return Err(CatalogError::Duplicate(quiz.id));
        }

        let quiz = Arc::new(quiz);
        quizzes.push(quiz.clone());
        debug!(quiz_id = %quiz.id, catalog_size = quizzes.len(), "Quiz added to catalog");
        Ok(quiz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG_JSON: &str = r#"[
        {
            "id": "fractions-1",
            "duration": 120,
            "level": "0",
            "topic": "Fractions",
            "lesson": "Math",
            "content": [
                {"question": "Is 1/2 bigger than 1/3?", "options": ["Yes", "No"], "correct_answer": "Yes"}
            ]
        },
        {
            "id": "empty",
            "duration": 60,
            "level": 1,
            "topic": "Fractions",
            "content": []
        },
        {
            "id": "verbs-1",
            "duration": 300,
            "level": "Advanced",
            "topic": "Verbs",
            "content": [
                {"question": "Past tense of go?", "options": ["goed", "went", "gone", "going"], "correct_answer": "went"}
            ]
        }
    ]"#;

    #[tokio::test]
    async fn test_list_keeps_order_and_filters_by_topic() {
        let catalog = QuizCatalog::from_json_str(CATALOG_JSON).unwrap();

        let all = catalog.list(None).await;
        let ids: Vec<_> = all.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["fractions-1", "empty", "verbs-1"]);

        let verbs = catalog.list(Some("Verbs")).await;
        assert_eq!(verbs.len(), 1);
        assert_eq!(verbs[0].duration_label, "5 min");

        assert!(catalog.list(Some("Chemistry")).await.is_empty());
    }

    #[tokio::test]
    async fn test_select_quiz() {
        let catalog = QuizCatalog::from_json_str(CATALOG_JSON).unwrap();

        let quiz = catalog.select_quiz("fractions-1").await.unwrap();
        assert_eq!(quiz.questions.len(), 1);

        assert!(matches!(
            catalog.select_quiz("missing").await,
            Err(CatalogError::NotFound(_))
        ));
        assert!(matches!(
            catalog.select_quiz("empty").await,
            Err(CatalogError::InvalidDefinition(DefinitionError::EmptyQuiz { .. }))
        ));
    }

    #[tokio::test]
    async fn test_check_reports_each_entry() {
        let catalog = QuizCatalog::from_json_str(CATALOG_JSON).unwrap();
        let report = catalog.check().await;

        assert_eq!(report.len(), 3);
        assert!(report[0].1.is_ok());
        assert_eq!(report[1].0.id, "empty");
        assert!(matches!(report[1].1, Err(DefinitionError::EmptyQuiz { .. })));
        assert!(report[2].1.is_ok());
    }

    #[tokio::test]
    async fn test_insert_validates_and_rejects_duplicates() {
        let catalog = QuizCatalog::from_json_str(CATALOG_JSON).unwrap();
        let mut quiz = catalog.get("verbs-1").await.unwrap().as_ref().clone();

        assert!(matches!(
            catalog.insert(quiz.clone()).await,
            Err(CatalogError::Duplicate(_))
        ));

        quiz.id = "verbs-2".to_string();
        catalog.insert(quiz.clone()).await.unwrap();
        assert_eq!(catalog.len().await, 4);

        quiz.id = "verbs-3".to_string();
        quiz.questions.clear();
        assert!(catalog.insert(quiz).await.is_err());
        assert_eq!(catalog.len().await, 4);
    }

    #[tokio::test]
    async fn test_malformed_json_is_rejected() {
        assert!(matches!(
            QuizCatalog::from_json_str("{not json"),
            Err(CatalogError::Parse(_))
        ));
        assert!(matches!(
            QuizCatalog::load_from_file("/definitely/not/here.json").await,
            Err(CatalogError::Io(_))
        ));
    }
}
