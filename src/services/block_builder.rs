//! Drives one block of questions to completion: calls the generation
//! client, validates and deduplicates each candidate, and retries on
//! shortfall, keeping the attempt that yields the most valid unique items.

use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    constants::prompts,
    errors::{AppError, AppResult},
    models::domain::question::{Difficulty, Section},
    models::dto::upstream::CandidateQuestion,
    services::{
        block_planner::{Block, BlockStatus},
        deduplicator,
        generation_client::{GenerationCall, GenerationClient},
        question_validator, text_normalizer,
    },
};

/// Attempt ceiling for a single block.
pub const MAX_BLOCK_ATTEMPTS: u32 = 3;

/// Outcome of building one block. `questions` may be short of
/// `target_size`, in which case the status is `Failed` and the set
/// orchestrator decides what to do.
#[derive(Debug, Clone)]
pub struct BuiltBlock {
    pub index: usize,
    pub target_size: usize,
    pub questions: Vec<CandidateQuestion>,
    pub passage: Option<String>,
    pub signature: Option<String>,
    pub status: BlockStatus,
}

impl BuiltBlock {
    pub fn is_complete(&self) -> bool {
        self.status == BlockStatus::Complete
    }
}

struct Attempt {
    questions: Vec<CandidateQuestion>,
    passage: Option<String>,
    signature: Option<String>,
    distinct_signature: bool,
}

pub struct BlockBuilder {
    client: Arc<dyn GenerationClient>,
}

impl BlockBuilder {
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }

    /// Builds one block. `prev_signature`/`avoid_passage` carry the
    /// preceding block's accepted context so reading/writing blocks rotate;
    /// `existing_keys` holds deduplication keys already claimed by earlier
    /// blocks or a persisted set.
    #[allow(clippy::too_many_arguments)]
    pub async fn build_block(
        &self,
        section: Section,
        block: &Block,
        topic: Option<&str>,
        difficulties: &[Difficulty],
        prev_signature: Option<&str>,
        avoid_passage: Option<&str>,
        existing_keys: &HashSet<String>,
    ) -> AppResult<BuiltBlock> {
        let mut best: Option<Attempt> = None;
        let mut last_error: Option<AppError> = None;

        for attempt_number in 1..=MAX_BLOCK_ATTEMPTS {
            let call = GenerationCall {
                section,
                item_count: block.size,
                instructions: prompts::block_instructions(
                    section,
                    block.size,
                    topic,
                    difficulties,
                    section == Section::Math,
                    avoid_passage,
                ),
            };

            let payload = match self.client.generate(&call).await {
                Ok(payload) => payload,
                Err(err) => {
                    log::warn!(
                        "block {} attempt {} failed: {}",
                        block.index,
                        attempt_number,
                        err
                    );
                    last_error = Some(err);
                    continue;
                }
            };

            // A reading block is unusable when items have no passage at all.
            if section == Section::Reading
                && payload.passage.is_none()
                && payload.questions.iter().any(|c| c.passage.is_none())
            {
                log::warn!(
                    "block {} attempt {} rejected: reading items without a passage",
                    block.index,
                    attempt_number
                );
                continue;
            }

            let attempt = self.screen_attempt(section, block, payload, prev_signature, existing_keys);

            let full = attempt.questions.len() == block.size;
            if full && (!section.uses_passages() || attempt.distinct_signature) {
                return Ok(BuiltBlock {
                    index: block.index,
                    target_size: block.size,
                    questions: attempt.questions,
                    passage: attempt.passage,
                    signature: attempt.signature,
                    status: BlockStatus::Complete,
                });
            }

            let better = match &best {
                None => true,
                Some(current) => {
                    (attempt.questions.len(), attempt.distinct_signature)
                        > (current.questions.len(), current.distinct_signature)
                }
            };
            if better {
                best = Some(attempt);
            }
        }

        match best {
            Some(attempt) => {
                let status = if attempt.questions.len() == block.size {
                    BlockStatus::Complete
                } else {
                    BlockStatus::Failed
                };
                Ok(BuiltBlock {
                    index: block.index,
                    target_size: block.size,
                    questions: attempt.questions,
                    passage: attempt.passage,
                    signature: attempt.signature,
                    status,
                })
            }
            None => match last_error {
                Some(err) => Err(err),
                None => Ok(BuiltBlock {
                    index: block.index,
                    target_size: block.size,
                    questions: Vec::new(),
                    passage: None,
                    signature: None,
                    status: BlockStatus::Failed,
                }),
            },
        }
    }

    /// Validates, deduplicates and caps one attempt's candidates.
    fn screen_attempt(
        &self,
        section: Section,
        block: &Block,
        payload: crate::models::dto::upstream::GenerationPayload,
        prev_signature: Option<&str>,
        existing_keys: &HashSet<String>,
    ) -> Attempt {
        let shared_passage = payload.passage;
        let mut claimed_keys = existing_keys.clone();
        let mut accepted = Vec::new();

        for mut candidate in payload.questions {
            if section.uses_passages() && candidate.passage.is_none() {
                candidate.passage = shared_passage.clone();
            }

            let outcome = question_validator::validate_candidate(&candidate);
            if !outcome.is_valid() {
                log::debug!(
                    "dropping candidate in block {}: {:?}",
                    block.index,
                    outcome.violations
                );
                continue;
            }

            let key = deduplicator::question_key(section, &candidate.question);
            if !claimed_keys.insert(key) {
                continue;
            }

            accepted.push(candidate);
            if accepted.len() == block.size {
                break;
            }
        }

        let passage = shared_passage
            .or_else(|| accepted.iter().find_map(|c| c.passage.clone()));
        let signature = block_signature(section, passage.as_deref(), &accepted);
        let distinct_signature = match (prev_signature, signature.as_deref()) {
            (Some(prev), Some(sig)) => prev != sig,
            _ => true,
        };

        Attempt {
            questions: accepted,
            passage,
            signature,
            distinct_signature,
        }
    }
}

/// Context signature of a built block: the shared passage for reading, the
/// first item's target sentence for writing, nothing for math.
pub fn block_signature(
    section: Section,
    passage: Option<&str>,
    questions: &[CandidateQuestion],
) -> Option<String> {
    match section {
        Section::Reading => passage.map(text_normalizer::signature),
        Section::Writing => questions
            .first()
            .map(|q| {
                text_normalizer::signature(q.passage.as_deref().unwrap_or(q.question.as_str()))
            })
            .or_else(|| passage.map(text_normalizer::signature)),
        Section::Math => None,
    }
}
