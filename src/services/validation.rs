// src/services/validation.rs

use std::collections::HashSet;

use crate::{
    models::{attempt::AnswerSubmission, quiz::Quiz},
    services::error::ValidationError,
};

/// Checks that every answer refers to a question of `quiz`.
///
/// The whole submission is rejected on the first unknown question id;
/// there is no partial acceptance.
pub fn validate<'a>(
    quiz: &Quiz,
    answers: &'a [AnswerSubmission],
) -> Result<Vec<&'a AnswerSubmission>, ValidationError> {
    if answers.is_empty() {
        return Err(ValidationError::EmptySubmission);
    }

    let known: HashSet<i64> = quiz.questions.iter().map(|q| q.id).collect();

    if let Some(unknown) = answers.iter().find(|a| !known.contains(&a.question_id)) {
        return Err(ValidationError::UnknownQuestion(unknown.question_id));
    }

    Ok(answers.iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::{Category, Difficulty, Question};

    fn quiz_with(ids: &[i64]) -> Quiz {
        Quiz {
            id: 1,
            title: "Quiz".to_string(),
            category: Category::General,
            difficulty: Difficulty::Easy,
            passing_score: 50.0,
            questions: ids
                .iter()
                .map(|&id| Question {
                    id,
                    content: format!("Question {}", id),
                    options: vec![],
                    answer: "A".to_string(),
                })
                .collect(),
        }
    }

    fn answer(question_id: i64) -> AnswerSubmission {
        AnswerSubmission {
            question_id,
            answer: "A".to_string(),
        }
    }

    #[test]
    fn test_validate_accepts_known_questions() {
        let quiz = quiz_with(&[1, 2, 3]);
        let answers = vec![answer(3), answer(1)];

        let accepted = validate(&quiz, &answers).unwrap();
        assert_eq!(accepted.len(), 2);
    }

    #[test]
    fn test_validate_rejects_empty() {
        let quiz = quiz_with(&[1]);
        assert_eq!(validate(&quiz, &[]), Err(ValidationError::EmptySubmission));
    }

    #[test]
    fn test_validate_names_first_unknown_question() {
        let quiz = quiz_with(&[1, 2]);
        let answers = vec![answer(1), answer(99), answer(42)];

        assert_eq!(
            validate(&quiz, &answers),
            Err(ValidationError::UnknownQuestion(99))
        );
    }

    #[test]
    fn test_validate_accepts_partial_answers() {
        // Answering a subset is valid; unanswered questions are scored as wrong.
        let quiz = quiz_with(&[1, 2, 3, 4]);
        let answers = vec![answer(2)];
        assert!(validate(&quiz, &answers).is_ok());
    }
}
