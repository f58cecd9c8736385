// src/models/quiz.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Department assigned to quizzes that carry none.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// A quiz file as stored on disk.
///
/// Older files use `category` instead of `department` and `topic` instead of
/// `subcategory`. Both spellings are accepted here and folded into the
/// canonical fields by [`Quiz::from_record`]; records are always written back
/// in canonical form.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QuizRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,

    #[serde(default, skip_serializing)]
    pub category: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,

    #[serde(default, skip_serializing)]
    pub topic: Option<String>,

    pub questions: Vec<Question>,
}

/// A single multiple-choice question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Question {
    /// The text of the question.
    #[serde(rename = "question")]
    pub prompt: String,

    /// Answer choices in authoring order.
    pub options: Vec<String>,

    /// Must equal exactly one element of `options`.
    pub correct: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl Question {
    /// A question is usable only when its correct answer is one of its options.
    pub fn is_valid(&self) -> bool {
        self.options.iter().any(|o| o == &self.correct)
    }
}

/// A loaded quiz with legacy fields normalized.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Quiz {
    pub title: String,
    pub department: Option<String>,
    pub subcategory: Option<String>,
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn from_record(title: impl Into<String>, record: QuizRecord) -> Self {
        Self {
            title: title.into(),
            department: non_blank(record.department).or_else(|| non_blank(record.category)),
            subcategory: non_blank(record.subcategory).or_else(|| non_blank(record.topic)),
            questions: record.questions,
        }
    }

    /// Canonical on-disk form of this quiz.
    pub fn to_record(&self) -> QuizRecord {
        QuizRecord {
            quiz_title: Some(self.title.clone()),
            department: self.department.clone(),
            category: None,
            subcategory: self.subcategory.clone(),
            topic: None,
            questions: self.questions.clone(),
        }
    }

    /// Department used for filtering; quizzes without one are `Uncategorized`.
    pub fn department_or_default(&self) -> &str {
        self.department.as_deref().unwrap_or(UNCATEGORIZED)
    }
}

/// Treats empty and whitespace-only strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Catalog entry returned by the quiz list.
#[derive(Debug, Serialize)]
pub struct QuizSummary {
    pub title: String,
    pub label: String,
    pub department: String,
    pub subcategory: Option<String>,
    pub question_count: usize,
}

/// DTO for creating a quiz from pasted JSON.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1, message = "Paste JSON content"))]
    pub quiz_json: String,
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[validate(length(max = 100))]
    pub subcategory: Option<String>,
}

/// DTO for editing an existing quiz. A changed `title` renames the quiz.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuizRequest {
    #[validate(length(max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 100))]
    pub department: Option<String>,
    #[validate(length(max = 100))]
    pub subcategory: Option<String>,
    #[validate(length(min = 1, message = "Paste JSON content"))]
    pub quiz_json: String,
}

/// Query parameters of the raw file upload.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_aliases_are_normalized() {
        let record: QuizRecord = serde_json::from_str(
            r#"{"quiz_title":"Old","category":"Math","topic":"Algebra","questions":[]}"#,
        )
        .unwrap();
        let quiz = Quiz::from_record("Old", record);
        assert_eq!(quiz.department.as_deref(), Some("Math"));
        assert_eq!(quiz.subcategory.as_deref(), Some("Algebra"));

        let json = serde_json::to_value(quiz.to_record()).unwrap();
        assert_eq!(json["department"], "Math");
        assert_eq!(json["subcategory"], "Algebra");
        assert!(json.get("category").is_none());
        assert!(json.get("topic").is_none());
    }

    #[test]
    fn test_department_wins_over_category() {
        let record: QuizRecord = serde_json::from_str(
            r#"{"department":"Physics","category":"Math","questions":[]}"#,
        )
        .unwrap();
        let quiz = Quiz::from_record("Q", record);
        assert_eq!(quiz.department.as_deref(), Some("Physics"));
    }

    #[test]
    fn test_blank_department_falls_back() {
        let record: QuizRecord =
            serde_json::from_str(r#"{"department":"  ","category":"Math","questions":[]}"#)
                .unwrap();
        let quiz = Quiz::from_record("Q", record);
        assert_eq!(quiz.department_or_default(), "Math");

        let bare = Quiz::from_record("Q", QuizRecord::default());
        assert_eq!(bare.department_or_default(), UNCATEGORIZED);
    }

    #[test]
    fn test_question_validity() {
        let q = Question {
            prompt: "Q".into(),
            options: vec!["A".into(), "B".into()],
            correct: "B".into(),
            explanation: None,
        };
        assert!(q.is_valid());

        let bad = Question {
            correct: "C".into(),
            ..q
        };
        assert!(!bad.is_valid());
    }

    #[test]
    fn test_missing_questions_is_malformed() {
        let parsed = serde_json::from_str::<QuizRecord>(r#"{"quiz_title":"x"}"#);
        assert!(parsed.is_err());
    }
}
