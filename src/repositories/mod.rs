pub mod question_set_repository;

pub use question_set_repository::{MongoQuestionSetRepository, QuestionSetRepository};
