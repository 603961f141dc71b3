use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::domain::question::{ExamQuestion, Section};

/// A persisted, ordered list of validated questions. Extension requests
/// append to an existing set, continuing its 1-based question ids.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuestionSet {
    pub id: String,
    pub section: Section,
    /// Shared passage when the whole set reads from a single context.
    /// Multi-block reading sets carry per-question passages instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
    pub questions: Vec<ExamQuestion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl QuestionSet {
    pub fn new(section: Section, passage: Option<String>, questions: Vec<ExamQuestion>) -> Self {
        QuestionSet {
            id: Uuid::new_v4().to_string(),
            section,
            passage,
            questions,
            created_at: Some(Utc::now()),
            modified_at: Some(Utc::now()),
        }
    }

    /// Next free sequential question id for an extension append.
    pub fn next_question_id(&self) -> u32 {
        self.questions
            .iter()
            .map(|q| q.id)
            .max()
            .unwrap_or(0)
            + 1
    }
}
