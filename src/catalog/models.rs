//! Catalog records and request/response bodies.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Question difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Advanced];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Advanced => "advanced",
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

    /// Case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str() == lower)
            .ok_or_else(|| s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Category {
    pub id: i64,
    #[schema(example = "B")]
    pub category_name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    #[schema(example = "B")]
    pub category_name: String,
}

// ---------------------------------------------------------------------------
// Videos
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
pub struct Video {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub url: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VideoInput {
    #[validate(length(min = 1, max = 255, message = "must be 1-255 characters"))]
    #[schema(example = "Right of way at roundabouts")]
    pub title: String,
    pub description: Option<String>,
    #[validate(url(message = "must be a valid URL"))]
    #[schema(example = "https://videos.example.com/roundabouts.mp4")]
    pub url: String,
}

// ---------------------------------------------------------------------------
// Questions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnswerOptionInput {
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

/// Body of question create and replace
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct QuestionInput {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub text: String,
    pub difficulty: Difficulty,
    pub category_id: i64,
    #[serde(default)]
    pub explanation: Option<String>,
    #[validate(length(min = 1, message = "at least one answer option is required"))]
    pub answer_options: Vec<AnswerOptionInput>,
}

/// Filters for the question list. Difficulty stays a string so an unknown
/// value can be answered with 400 instead of a query rejection.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct QuestionFilter {
    /// Category name, e.g. `A` or `B`
    pub category: Option<String>,
    /// `easy`, `medium` or `advanced`
    pub difficulty: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AnswerOptionOut {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionListItem {
    pub id: String,
    pub text: String,
    /// Always null; images are not stored yet
    pub image: Option<String>,
    pub options: Vec<AnswerOptionOut>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionListResponse {
    pub items: Vec<QuestionListItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionDetail {
    pub id: String,
    pub text: String,
    pub explanation: Option<String>,
    pub correct_option_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionCreated {
    #[schema(example = "Question created")]
    pub message: String,
    pub question_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difficulty_parse_is_case_insensitive() {
        assert_eq!("easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!("MEDIUM".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert_eq!("Advanced".parse::<Difficulty>().unwrap(), Difficulty::Advanced);
        assert_eq!("hard".parse::<Difficulty>().unwrap_err(), "hard");
    }

    #[test]
    fn test_question_input_from_json() {
        let input: QuestionInput = serde_json::from_str(
            r#"{
                "text": "Who goes first?",
                "difficulty": "medium",
                "category_id": 2,
                "answer_options": [
                    {"text": "Tram", "is_correct": true},
                    {"text": "Car"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(input.difficulty, Difficulty::Medium);
        assert!(input.explanation.is_none());
        assert!(!input.answer_options[1].is_correct);
        assert!(input.validate().is_ok());
    }

    #[test]
    fn test_question_without_options_is_invalid() {
        let input = QuestionInput {
            text: "Q".to_string(),
            difficulty: Difficulty::Easy,
            category_id: 1,
            explanation: None,
            answer_options: vec![],
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("answer_options"));
    }

    #[test]
    fn test_list_item_serializes_null_image() {
        let item = QuestionListItem {
            id: "3".to_string(),
            text: "Q".to_string(),
            image: None,
            options: vec![AnswerOptionOut {
                id: "9".to_string(),
                text: "A".to_string(),
            }],
        };
        let json = serde_json::to_value(&item).unwrap();
        assert!(json["image"].is_null());
        assert_eq!(json["options"][0]["id"], "9");
    }
}
