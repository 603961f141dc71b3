pub mod request;
pub mod response;
pub mod upstream;

pub use request::GenerateQuestionSetRequest;
pub use response::QuestionSetResponse;
