pub mod question_set_handler;

pub use question_set_handler::{generate_question_set, get_question_set};
