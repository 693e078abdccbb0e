use serde::{Deserialize, Serialize};

use crate::error::{QuizError, QuizResult};

/// Every question offers exactly this many options.
pub const OPTION_COUNT: usize = 4;

/// A multiple-choice trivia question.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
}

impl Question {
    /// Build and validate a question.
    pub fn new(
        text: impl Into<String>,
        options: impl IntoIterator<Item = impl Into<String>>,
        correct_answer_index: usize,
    ) -> QuizResult<Self> {
        let question = Self {
            text: text.into(),
            options: options.into_iter().map(Into::into).collect(),
            correct_answer_index,
        };
        question.validate()?;
        Ok(question)
    }

    /// Check the shape: non-empty text, four options, index in `0..4`.
    pub fn validate(&self) -> QuizResult<()> {
        let reason = if self.text.trim().is_empty() {
            Some("empty text".to_string())
        } else if self.options.len() != OPTION_COUNT {
            Some(format!(
                "expected {OPTION_COUNT} options, found {}",
                self.options.len()
            ))
        } else if self.correct_answer_index >= OPTION_COUNT {
            Some(format!(
                "correct answer index {} out of range",
                self.correct_answer_index
            ))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(QuizError::InvalidQuestion {
                text: self.text.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }

    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.correct_answer_index
    }

    pub fn correct_option(&self) -> Option<&str> {
        self.options
            .get(self.correct_answer_index)
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stored_shape() {
        let json = r#"{"text":"Who directed the movie 'Inception'?","options":["Steven Spielberg","Christopher Nolan","James Cameron","Quentin Tarantino"],"correctAnswerIndex":1}"#;
        let q: Question = serde_json::from_str(json).unwrap();
        q.validate().unwrap();
        assert_eq!(q.correct_option(), Some("Christopher Nolan"));
        assert!(q.is_correct(1));
        assert!(!q.is_correct(0));
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(Question::new("Q?", ["a", "b", "c"], 0).is_err());
        assert!(Question::new("Q?", ["a", "b", "c", "d"], 4).is_err());
        assert!(Question::new("  ", ["a", "b", "c", "d"], 0).is_err());
        assert!(Question::new("Q?", ["a", "b", "c", "d"], 3).is_ok());
    }
}
