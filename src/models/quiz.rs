// src/models/quiz.rs

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Subject area of a quiz. Cross-quiz progress is aggregated per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    General,
    Science,
    History,
    Technology,
    Math,
    Language,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::General,
        Category::Science,
        Category::History,
        Category::Technology,
        Category::Math,
        Category::Language,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Science => "science",
            Category::History => "history",
            Category::Technology => "technology",
            Category::Math => "math",
            Category::Language => "language",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Invalid category '{}'", s))
    }
}

/// How hard a quiz is meant to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str() == s)
            .ok_or_else(|| format!("Invalid difficulty '{}'", s))
    }
}

/// A quiz together with its ordered question set.
/// Loaded as a read-only snapshot for the duration of a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub title: String,
    pub category: Category,
    pub difficulty: Difficulty,

    /// Percentage (0-100) needed to pass. Boundary is inclusive.
    pub passing_score: f64,

    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn question(&self, question_id: i64) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }
}

/// Optional constraints for listing quizzes. `None` matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuizFilter {
    pub category: Option<Category>,
    pub difficulty: Option<Difficulty>,
}

impl QuizFilter {
    pub fn matches(&self, quiz: &Quiz) -> bool {
        self.category.is_none_or(|c| c == quiz.category)
            && self.difficulty.is_none_or(|d| d == quiz.difficulty)
    }
}

/// A single question. `answer` is the canonical correct answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub content: String,
    pub options: Vec<String>,
    pub answer: String,
}

/// DTO for sending a question to the client (excludes answer).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub content: String,
    pub options: Vec<String>,
}

/// DTO for sending a quiz to the client.
#[derive(Debug, Serialize)]
pub struct PublicQuiz {
    pub id: i64,
    pub title: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub passing_score: f64,
    pub questions: Vec<PublicQuestion>,
}

/// Catalogue entry for quiz listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: i64,
    pub title: String,
    pub category: Category,
    pub difficulty: Difficulty,
    pub passing_score: f64,
    pub question_count: i64,
}

impl From<&Quiz> for QuizSummary {
    fn from(quiz: &Quiz) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title.clone(),
            category: quiz.category,
            difficulty: quiz.difficulty,
            passing_score: quiz.passing_score,
            question_count: quiz.questions.len() as i64,
        }
    }
}

impl From<Quiz> for PublicQuiz {
    fn from(quiz: Quiz) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title,
            category: quiz.category,
            difficulty: quiz.difficulty,
            passing_score: quiz.passing_score,
            questions: quiz
                .questions
                .into_iter()
                .map(|q| PublicQuestion {
                    id: q.id,
                    content: q.content,
                    options: q.options,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trips_through_str() {
        for category in Category::ALL {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
    }

    #[test]
    fn test_category_rejects_unknown() {
        assert!("astrology".parse::<Category>().is_err());
        assert!("Math".parse::<Category>().is_err());
    }

    #[test]
    fn test_public_quiz_hides_answers() {
        let quiz = Quiz {
            id: 1,
            title: "Rust basics".to_string(),
            category: Category::Technology,
            difficulty: Difficulty::Easy,
            passing_score: 70.0,
            questions: vec![Question {
                id: 10,
                content: "Which keyword declares a binding?".to_string(),
                options: vec!["let".to_string(), "var".to_string()],
                answer: "let".to_string(),
            }],
        };

        let json = serde_json::to_value(PublicQuiz::from(quiz)).unwrap();
        assert_eq!(json["questions"][0]["id"], 10);
        assert!(json["questions"][0].get("answer").is_none());
        assert_eq!(json["category"], "technology");
        assert_eq!(json["difficulty"], "easy");
    }

    #[test]
    fn test_difficulty_parses_lowercase_only() {
        for difficulty in Difficulty::ALL {
            assert_eq!(difficulty.as_str().parse::<Difficulty>().unwrap(), difficulty);
        }
        assert!("Hard".parse::<Difficulty>().is_err());
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_filter_combines_category_and_difficulty() {
        let quiz = Quiz {
            id: 3,
            title: "Fractions".to_string(),
            category: Category::Math,
            difficulty: Difficulty::Hard,
            passing_score: 60.0,
            questions: vec![],
        };

        assert!(QuizFilter::default().matches(&quiz));
        assert!(
            QuizFilter {
                category: Some(Category::Math),
                difficulty: Some(Difficulty::Hard),
            }
            .matches(&quiz)
        );
        assert!(
            !QuizFilter {
                category: Some(Category::Math),
                difficulty: Some(Difficulty::Easy),
            }
            .matches(&quiz)
        );
        assert!(
            !QuizFilter {
                category: Some(Category::History),
                difficulty: None,
            }
            .matches(&quiz)
        );
    }
}
