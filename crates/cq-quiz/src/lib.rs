//! Quiz question pool for CineQuiz.
//!
//! Questions live in one JSON array at `questions/cinema_questions.json`.
//! The pool is fetched once per quiz session; when it cannot be read a small
//! built-in set keeps the quiz playable.

pub mod bank;
pub mod error;
pub mod question;
pub mod select;
pub mod session;

pub use bank::{
    fallback_questions, parse_questions, questions_exist, sample_questions, seed_questions,
    QuestionBank, QuestionSource, QUESTIONS_KEY,
};
pub use error::{QuizError, QuizResult};
pub use question::{Question, OPTION_COUNT};
pub use select::{pick_random_questions, pick_random_questions_with};
pub use session::{QuizSession, DEFAULT_POINTS_PER_CORRECT};
