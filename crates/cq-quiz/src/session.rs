use crate::error::{QuizError, QuizResult};
use crate::question::Question;

/// Points awarded per correct answer unless configured otherwise.
pub const DEFAULT_POINTS_PER_CORRECT: u64 = 100;

/// One play-through: the selected questions and the answers given so far.
///
/// Each question can be answered once. The session only scores; crediting
/// the earned points is the caller's job, and [`mark_settled`](Self::mark_settled)
/// records that it happened so the points are paid out once.
#[derive(Clone, Debug)]
pub struct QuizSession {
    questions: Vec<Question>,
    answers: Vec<Option<usize>>,
    points_per_correct: u64,
    settled: bool,
}

impl QuizSession {
    pub fn new(questions: Vec<Question>, points_per_correct: u64) -> Self {
        let answers = vec![None; questions.len()];
        Self {
            questions,
            answers,
            points_per_correct,
            settled: false,
        }
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// The first unanswered question and its index.
    pub fn current(&self) -> Option<(usize, &Question)> {
        self.answers
            .iter()
            .position(Option::is_none)
            .map(|i| (i, &self.questions[i]))
    }

    /// Record `choice` for question `index`. Returns whether it was correct.
    pub fn answer(&mut self, index: usize, choice: usize) -> QuizResult<bool> {
        let len = self.questions.len();
        let question = self
            .questions
            .get(index)
            .ok_or(QuizError::QuestionOutOfRange { index, len })?;
        if choice >= question.options.len() {
            return Err(QuizError::InvalidChoice { index, choice });
        }
        let slot = &mut self.answers[index];
        if slot.is_some() {
            return Err(QuizError::AlreadyAnswered(index));
        }
        *slot = Some(choice);
        Ok(question.is_correct(choice))
    }

    pub fn is_complete(&self) -> bool {
        self.answers.iter().all(Option::is_some)
    }

    /// Number of correct answers so far.
    pub fn score(&self) -> usize {
        self.questions
            .iter()
            .zip(&self.answers)
            .filter(|(q, a)| a.is_some_and(|choice| q.is_correct(choice)))
            .count()
    }

    pub fn points_earned(&self) -> u64 {
        (self.score() as u64).saturating_mul(self.points_per_correct)
    }

    /// Whether the earned points have already been paid out.
    pub fn is_settled(&self) -> bool {
        self.settled
    }

    /// Record that the earned points were paid out.
    pub fn mark_settled(&mut self) {
        self.settled = true;
    }
}
