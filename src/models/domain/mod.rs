pub mod question;
pub mod question_set;

pub use question::{AnswerLetter, Difficulty, ExamQuestion, RequestedDifficulty, Section};
pub use question_set::QuestionSet;
