// src/services/scoring.rs

use std::collections::HashMap;

use crate::{
    models::{attempt::AnswerSubmission, quiz::Quiz},
    services::error::EmptyQuizError,
};

/// Outcome of grading one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub correct_count: usize,

    /// Questions in the quiz, answered or not.
    pub total_questions: usize,

    /// 0-100.
    pub percentage: f64,
    pub passed: bool,
}

/// Grades accepted answers against the quiz's canonical answers.
///
/// Matching is exact (case-sensitive, untrimmed). If a question is answered
/// more than once only the first answer counts.
pub fn score(quiz: &Quiz, accepted: &[&AnswerSubmission]) -> Result<ScoreResult, EmptyQuizError> {
    let total_questions = quiz.questions.len();
    if total_questions == 0 {
        return Err(EmptyQuizError { quiz_id: quiz.id });
    }

    let mut submitted: HashMap<i64, &str> = HashMap::with_capacity(accepted.len());
    for answer in accepted {
        submitted
            .entry(answer.question_id)
            .or_insert(answer.answer.as_str());
    }

    let correct_count = quiz
        .questions
        .iter()
        .filter(|q| submitted.get(&q.id) == Some(&q.answer.as_str()))
        .count();

    let percentage = (correct_count as f64 / total_questions as f64) * 100.0;

    Ok(ScoreResult {
        correct_count,
        total_questions,
        percentage,
        passed: percentage >= quiz.passing_score,
    })
}
