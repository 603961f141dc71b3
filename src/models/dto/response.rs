use serde::Serialize;

use crate::models::domain::question::{ExamQuestion, Section};
use crate::services::set_orchestrator::{GenerationOutcome, GenerationResult};

/// Outbound shape of a generated or fetched question set.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionSetResponse {
    pub id: String,
    pub section: Section,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
    pub questions: Vec<ExamQuestion>,
    pub outcome: GenerationOutcome,
}

impl From<GenerationResult> for QuestionSetResponse {
    fn from(result: GenerationResult) -> Self {
        QuestionSetResponse {
            id: result.set.id,
            section: result.set.section,
            passage: result.set.passage,
            questions: result.set.questions,
            outcome: result.outcome,
        }
    }
}
