use std::collections::BTreeMap;

use crate::models::{ConfidenceLevel, ConfidenceSummary, QuestionReview, QuizDefinition, ScoreResult};

/// Compare every question's answer to its correct answer. Unanswered counts as wrong.
pub fn score_answers(
    definition: &QuizDefinition,
    answers: &BTreeMap<usize, String>,
    time_taken_seconds: u32,
) -> ScoreResult {
    let correct_count = definition
        .questions
        .iter()
        .enumerate()
        .filter(|(index, question)| answers.get(index) == Some(&question.correct_answer))
        .count();

    ScoreResult {
        correct_count,
        wrong_count: definition.questions.len() - correct_count,
        time_taken_seconds,
    }
}

/// Tally confidence ratings into a 1..=5 histogram.
pub fn aggregate_confidence<I>(levels: I) -> ConfidenceSummary
where
    I: IntoIterator<Item = ConfidenceLevel>,
{
    let mut counts: BTreeMap<u8, usize> = ConfidenceLevel::all().map(|l| (l.value(), 0)).collect();
    let mut total = 0usize;
    let mut sum = 0u64;

    for level in levels {
        *counts.entry(level.value()).or_insert(0) += 1;
        total += 1;
        sum += u64::from(level.value());
    }

    let average = if total == 0 {
        0.0
    } else {
        sum as f64 / total as f64
    };

    ConfidenceSummary {
        average,
        counts,
        total,
    }
}

pub fn review_answers(
    definition: &QuizDefinition,
    answers: &BTreeMap<usize, String>,
) -> Vec<QuestionReview> {
    definition
        .questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let your_answer = answers.get(&index).cloned();
            QuestionReview {
                prompt: question.prompt.clone(),
                is_correct: your_answer.as_deref() == Some(question.correct_answer.as_str()),
                your_answer,
                correct_answer: question.correct_answer.clone(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DifficultyLevel, QuestionItem};

    fn two_question_quiz() -> QuizDefinition {
        QuizDefinition {
            id: "scenario".to_string(),
            duration_seconds: 120,
            level: DifficultyLevel::Basic,
            questions: vec![
                QuestionItem {
                    prompt: "First".to_string(),
                    options: vec!["A".to_string(), "B".to_string()],
                    correct_answer: "A".to_string(),
                },
                QuestionItem {
                    prompt: "Second".to_string(),
                    options: vec!["Yes".to_string(), "No".to_string()],
                    correct_answer: "No".to_string(),
                },
            ],
            topic: None,
            lesson: None,
        }
    }

    fn levels(values: &[u8]) -> Vec<ConfidenceLevel> {
        values
            .iter()
            .map(|v| ConfidenceLevel::try_from(*v).unwrap())
            .collect()
    }

    #[test]
    fn test_score_counts_unanswered_as_wrong() {
        let quiz = two_question_quiz();
        let answers = BTreeMap::from([(0, "A".to_string())]);

        let score = score_answers(&quiz, &answers, 12);
        assert_eq!(score.correct_count, 1);
        assert_eq!(score.wrong_count, 1);
        assert_eq!(score.time_taken_seconds, 12);
    }

    #[test]
    fn test_score_uses_exact_string_equality() {
        let quiz = two_question_quiz();
        let answers = BTreeMap::from([(0, "a".to_string()), (1, "No ".to_string())]);

        let score = score_answers(&quiz, &answers, 0);
        assert_eq!(score.correct_count, 0);
        assert_eq!(score.wrong_count, 2);
    }

    #[test]
    fn test_confidence_histogram_keeps_zero_levels() {
        let summary = aggregate_confidence(levels(&[3, 3, 5]));

        assert_eq!(summary.total, 3);
        assert!((summary.average - 11.0 / 3.0).abs() < 1e-9);
        assert_eq!(summary.counts.get(&1), Some(&0));
        assert_eq!(summary.counts.get(&3), Some(&2));
        assert_eq!(summary.counts.get(&5), Some(&1));
        assert_eq!(summary.counts.len(), 5);
    }

    #[test]
    fn test_confidence_percentages() {
        let summary = aggregate_confidence(levels(&[5, 5, 1, 1]));
        assert!((summary.average_percent() - 60.0).abs() < 1e-9);
        assert!((summary.share_percent(ConfidenceLevel::try_from(5u8).unwrap()) - 50.0).abs() < 1e-9);
        assert_eq!(summary.share_percent(ConfidenceLevel::try_from(3u8).unwrap()), 0.0);
    }

    #[test]
    fn test_empty_confidence_summary() {
        let summary = aggregate_confidence(Vec::new());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.average, 0.0);
        assert!(summary.counts.values().all(|c| *c == 0));
        assert_eq!(summary.share_percent(ConfidenceLevel::try_from(2u8).unwrap()), 0.0);
    }

    #[test]
    fn test_review_lists_every_question() {
        let quiz = two_question_quiz();
        let answers = BTreeMap::from([(1, "No".to_string())]);

        let review = review_answers(&quiz, &answers);
        assert_eq!(review.len(), 2);
        assert_eq!(review[0].your_answer, None);
        assert!(!review[0].is_correct);
        assert_eq!(review[1].your_answer.as_deref(), Some("No"));
        assert!(review[1].is_correct);
    }
}
