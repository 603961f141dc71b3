use serde::Deserialize;
use sha2::{Digest, Sha256};
use validator::Validate;

use crate::models::domain::question::{RequestedDifficulty, Section};

/// Inbound generation request. `extend_target_id` turns the request into an
/// extension of a previously persisted question set.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateQuestionSetRequest {
    pub section: Section,

    #[validate(range(min = 1, max = 50))]
    pub question_count: u8,

    #[validate(length(max = 200))]
    pub topic: Option<String>,

    pub difficulty: Option<RequestedDifficulty>,

    pub extend_target_id: Option<String>,
}

impl GenerateQuestionSetRequest {
    pub fn is_extension(&self) -> bool {
        self.extend_target_id.is_some()
    }

    /// Deterministic cache key over `(section, count, topic, difficulty)`.
    /// Extension requests never consult the cache, so the target id is not
    /// part of the signature.
    pub fn cache_signature(&self) -> String {
        let topic = self
            .topic
            .as_deref()
            .map(|t| t.trim().to_lowercase())
            .unwrap_or_default();
        let difficulty = self
            .difficulty
            .map(|d| d.as_str())
            .unwrap_or("none");

        let mut hasher = Sha256::new();
        hasher.update(self.section.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(self.question_count.to_string().as_bytes());
        hasher.update(b"|");
        hasher.update(topic.as_bytes());
        hasher.update(b"|");
        hasher.update(difficulty.as_bytes());

        format!("{:x}", hasher.finalize())
    }
}
