//! Assembles complete question sets from planned blocks: plans the work,
//! drives the block builder, enforces whole-set constraints, and handles
//! caching, persistence and extension of existing sets.

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use validator::Validate;

use crate::{
    errors::{AppError, AppResult},
    models::domain::question::{Difficulty, ExamQuestion, RequestedDifficulty, Section},
    models::domain::question_set::QuestionSet,
    models::dto::request::GenerateQuestionSetRequest,
    repositories::QuestionSetRepository,
    services::{
        block_builder::{BlockBuilder, BuiltBlock},
        block_planner::{self, Block},
        constraint_checker::{ConstraintChecker, ConstraintReport, ConstraintViolation},
        deduplicator,
        generation_cache::GenerationCache,
        text_normalizer,
    },
};

/// How many times a whole set is rebuilt before settling for best effort.
pub const MAX_SET_ATTEMPTS: u32 = 3;

/// Ceiling on targeted block rebuilds within one set attempt.
pub const MAX_REPAIR_ROUNDS: u32 = 4;

const DEFAULT_SKILL_CATEGORY: &str = "General";

/// Whether the delivered set met every whole-set constraint or shipped
/// with known violations after retries ran out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Strict,
    BestEffort { violations: Vec<ConstraintViolation> },
}

#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub set: QuestionSet,
    pub outcome: GenerationOutcome,
}

pub struct SetOrchestrator {
    builder: BlockBuilder,
    checker: ConstraintChecker,
    cache: Arc<GenerationCache>,
    repository: Arc<dyn QuestionSetRepository>,
}

impl SetOrchestrator {
    pub fn new(
        builder: BlockBuilder,
        checker: ConstraintChecker,
        cache: Arc<GenerationCache>,
        repository: Arc<dyn QuestionSetRepository>,
    ) -> Self {
        Self {
            builder,
            checker,
            cache,
            repository,
        }
    }

    /// Entry point for both fresh generation and extension requests.
    pub async fn generate(
        &self,
        request: &GenerateQuestionSetRequest,
    ) -> AppResult<GenerationResult> {
        request.validate()?;

        if request.is_extension() {
            return self.extend(request).await;
        }

        let cache_key = request.cache_signature();
        if let Some(cached) = self.cache.get(&cache_key).await {
            if cached.questions.len() >= request.question_count as usize {
                log::info!(
                    "cache hit for {} {} questions, returning set {}",
                    request.section,
                    request.question_count,
                    cached.id
                );
                return Ok(GenerationResult {
                    set: cached,
                    outcome: GenerationOutcome::Strict,
                });
            }
        }

        let count = request.question_count as usize;
        let mut best: Option<(Vec<ExamQuestion>, ConstraintReport)> = None;
        let mut last_error: Option<AppError> = None;

        for attempt in 1..=MAX_SET_ATTEMPTS {
            let questions = match self
                .build_questions(
                    request.section,
                    count,
                    request.topic.as_deref(),
                    request.difficulty,
                    &HashSet::new(),
                    1,
                    None,
                )
                .await
            {
                Ok(questions) => questions,
                Err(err) => {
                    log::warn!("set attempt {} failed: {}", attempt, err);
                    last_error = Some(err);
                    continue;
                }
            };

            let report = self.checker.check(request.section, &questions);
            if questions.len() == count && report.is_satisfied() {
                return self.accept(request, &cache_key, questions, GenerationOutcome::Strict)
                    .await;
            }

            log::info!(
                "set attempt {} short or constrained: {}/{} questions, {} violations",
                attempt,
                questions.len(),
                count,
                report.violations.len()
            );

            let better = match &best {
                None => true,
                Some((current, current_report)) => {
                    questions.len() > current.len()
                        || (questions.len() == current.len()
                            && report.violations.len() < current_report.violations.len())
                }
            };
            if better {
                best = Some((questions, report));
            }
        }

        match best {
            Some((questions, report)) if questions.len() == count => {
                self.accept(
                    request,
                    &cache_key,
                    questions,
                    GenerationOutcome::BestEffort {
                        violations: report.violations,
                    },
                )
                .await
            }
            _ => Err(last_error.unwrap_or_else(|| {
                AppError::GenerationFailed(format!(
                    "could not assemble {} {} questions after {} attempts",
                    count, request.section, MAX_SET_ATTEMPTS
                ))
            })),
        }
    }

    /// Appends freshly generated questions to a persisted set, continuing
    /// its id sequence and deduplicating against what it already holds.
    async fn extend(&self, request: &GenerateQuestionSetRequest) -> AppResult<GenerationResult> {
        let target_id = request
            .extend_target_id
            .as_deref()
            .ok_or_else(|| AppError::InternalError("extension without a target id".to_string()))?;

        let set = self
            .repository
            .find_by_id(target_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("question set {} not found", target_id)))?;

        if set.section != request.section {
            return Err(AppError::ValidationError(format!(
                "cannot extend a {} set with {} questions",
                set.section, request.section
            )));
        }

        let existing_keys: HashSet<String> = set
            .questions
            .iter()
            .map(|q| deduplicator::question_key(set.section, &q.question))
            .collect();
        let seed_passage = set
            .questions
            .last()
            .and_then(|q| q.passage.clone())
            .or_else(|| set.passage.clone());

        let count = request.question_count as usize;
        let mut best: Option<(Vec<ExamQuestion>, ConstraintReport)> = None;
        let mut last_error: Option<AppError> = None;

        for attempt in 1..=MAX_SET_ATTEMPTS {
            let appended = match self
                .build_questions(
                    set.section,
                    count,
                    request.topic.as_deref(),
                    request.difficulty,
                    &existing_keys,
                    set.next_question_id(),
                    seed_passage.as_deref(),
                )
                .await
            {
                Ok(appended) => appended,
                Err(err) => {
                    log::warn!("extension attempt {} failed: {}", attempt, err);
                    last_error = Some(err);
                    continue;
                }
            };

            let mut combined = set.questions.clone();
            combined.extend(appended.iter().cloned());
            let report = self.checker.check(set.section, &combined);

            if appended.len() == count && report.is_satisfied() {
                return self.persist_extension(set, appended, GenerationOutcome::Strict).await;
            }

            let better = match &best {
                None => true,
                Some((current, current_report)) => {
                    appended.len() > current.len()
                        || (appended.len() == current.len()
                            && report.violations.len() < current_report.violations.len())
                }
            };
            if better {
                best = Some((appended, report));
            }
        }

        match best {
            Some((appended, report)) if appended.len() == count => {
                self.persist_extension(
                    set,
                    appended,
                    GenerationOutcome::BestEffort {
                        violations: report.violations,
                    },
                )
                .await
            }
            _ => Err(last_error.unwrap_or_else(|| {
                AppError::GenerationFailed(format!(
                    "could not extend set {} by {} questions",
                    target_id, count
                ))
            })),
        }
    }

    async fn persist_extension(
        &self,
        mut set: QuestionSet,
        appended: Vec<ExamQuestion>,
        outcome: GenerationOutcome,
    ) -> AppResult<GenerationResult> {
        set.questions.extend(appended);
        set.passage = shared_passage(&set.questions);
        set.modified_at = Some(Utc::now());

        let set = self.repository.update(set).await?;
        Ok(GenerationResult { set, outcome })
    }

    /// Persists an accepted fresh set and caches it so an identical request
    /// replays byte for byte. Best-effort sets are persisted but not
    /// cached, keeping every cache hit a strict one.
    async fn accept(
        &self,
        request: &GenerateQuestionSetRequest,
        cache_key: &str,
        questions: Vec<ExamQuestion>,
        outcome: GenerationOutcome,
    ) -> AppResult<GenerationResult> {
        let passage = shared_passage(&questions);
        let set = QuestionSet::new(request.section, passage, questions);
        let set = self.repository.insert(set).await?;

        if outcome == GenerationOutcome::Strict {
            self.cache.insert_if_absent(cache_key, set.clone()).await;
        }

        log::info!(
            "accepted {} set {} with {} questions",
            request.section,
            set.id,
            set.questions.len()
        );
        Ok(GenerationResult { set, outcome })
    }

    /// One whole-set build pass: plan blocks, build them (concurrently for
    /// math, sequentially with context rotation otherwise), then number and
    /// deduplicate the assembled questions.
    #[allow(clippy::too_many_arguments)]
    async fn build_questions(
        &self,
        section: Section,
        count: usize,
        topic: Option<&str>,
        requested: Option<RequestedDifficulty>,
        existing_keys: &HashSet<String>,
        start_id: u32,
        seed_passage: Option<&str>,
    ) -> AppResult<Vec<ExamQuestion>> {
        let blocks = block_planner::plan_blocks(count);
        let plan = difficulty_plan(requested, count);

        let built = if section == Section::Math {
            self.build_math_blocks(&blocks, topic, &plan, existing_keys)
                .await?
        } else {
            self.build_passage_blocks(section, &blocks, topic, &plan, existing_keys, seed_passage)
                .await?
        };

        let mut questions = Vec::with_capacity(count);
        let mut position = 0usize;
        for block in &built {
            for candidate in &block.questions {
                let fallback = plan.get(position).copied().unwrap_or(Difficulty::Medium);
                questions.push(candidate.clone().into_question(
                    start_id + position as u32,
                    section,
                    fallback,
                    DEFAULT_SKILL_CATEGORY,
                ));
                position += 1;
            }
        }

        let before = questions.len();
        let mut questions = deduplicator::dedup_by_key(questions, |q| {
            deduplicator::question_key(section, &q.question)
        });
        if questions.len() < before {
            log::debug!(
                "cross-block dedup removed {} questions",
                before - questions.len()
            );
            for (offset, question) in questions.iter_mut().enumerate() {
                question.id = start_id + offset as u32;
            }
        }

        Ok(questions)
    }

    async fn build_math_blocks(
        &self,
        blocks: &[Block],
        topic: Option<&str>,
        plan: &[Difficulty],
        existing_keys: &HashSet<String>,
    ) -> AppResult<Vec<BuiltBlock>> {
        let futures = blocks.iter().map(|block| {
            let difficulties = plan_slice(plan, block);
            self.builder.build_block(
                Section::Math,
                block,
                topic,
                difficulties,
                None,
                None,
                existing_keys,
            )
        });

        let mut built = Vec::with_capacity(blocks.len());
        for result in join_all(futures).await {
            built.push(result?);
        }
        Ok(built)
    }

    /// Sequential build for passage sections. Each block sees the previous
    /// block's context so the builder can steer away from it; a bounded
    /// repair pass then rebuilds any block that came up short or collided
    /// with its neighbor.
    async fn build_passage_blocks(
        &self,
        section: Section,
        blocks: &[Block],
        topic: Option<&str>,
        plan: &[Difficulty],
        base_keys: &HashSet<String>,
        seed_passage: Option<&str>,
    ) -> AppResult<Vec<BuiltBlock>> {
        let seed_signature = seed_passage.map(text_normalizer::signature);
        let mut built: Vec<BuiltBlock> = Vec::with_capacity(blocks.len());
        let mut claimed = base_keys.clone();

        for block in blocks {
            let prev_signature = built
                .last()
                .and_then(|b| b.signature.clone())
                .or_else(|| seed_signature.clone());
            let avoid_passage = built
                .last()
                .and_then(|b| b.passage.clone())
                .or_else(|| seed_passage.map(str::to_string));

            let result = self
                .builder
                .build_block(
                    section,
                    block,
                    topic,
                    plan_slice(plan, block),
                    prev_signature.as_deref(),
                    avoid_passage.as_deref(),
                    &claimed,
                )
                .await?;

            for candidate in &result.questions {
                claimed.insert(deduplicator::question_key(section, &candidate.question));
            }
            built.push(result);
        }

        for round in 0..MAX_REPAIR_ROUNDS {
            let Some(index) = first_defect(&built, seed_signature.as_deref()) else {
                break;
            };
            log::debug!("repair round {}: rebuilding block {}", round, index);

            let prev_signature = if index > 0 {
                built[index - 1].signature.clone()
            } else {
                seed_signature.clone()
            };
            let avoid_passage = if index > 0 {
                built[index - 1].passage.clone()
            } else {
                seed_passage.map(str::to_string)
            };

            let mut keys = base_keys.clone();
            for (i, other) in built.iter().enumerate() {
                if i == index {
                    continue;
                }
                for candidate in &other.questions {
                    keys.insert(deduplicator::question_key(section, &candidate.question));
                }
            }

            let rebuilt = self
                .builder
                .build_block(
                    section,
                    &blocks[index],
                    topic,
                    plan_slice(plan, &blocks[index]),
                    prev_signature.as_deref(),
                    avoid_passage.as_deref(),
                    &keys,
                )
                .await?;
            built[index] = rebuilt;
        }

        Ok(built)
    }
}

/// Expands the requested difficulty into a per-question plan. `None` yields
/// an empty plan and leaves difficulty to the generator.
fn difficulty_plan(requested: Option<RequestedDifficulty>, count: usize) -> Vec<Difficulty> {
    match requested {
        None => Vec::new(),
        Some(RequestedDifficulty::Mixed) => block_planner::mixed_difficulty_plan(count),
        Some(fixed) => match fixed.fixed() {
            Some(level) => vec![level; count],
            None => Vec::new(),
        },
    }
}

/// The slice of the difficulty plan covering one block, empty when no plan
/// was requested.
fn plan_slice<'a>(plan: &'a [Difficulty], block: &Block) -> &'a [Difficulty] {
    let start = block.index * block_planner::BLOCK_SIZE;
    if start >= plan.len() {
        return &[];
    }
    let end = (start + block.size).min(plan.len());
    &plan[start..end]
}

/// Index of the first block needing a rebuild: an incomplete block, or a
/// block whose context signature collides with its predecessor.
fn first_defect(built: &[BuiltBlock], seed_signature: Option<&str>) -> Option<usize> {
    if let Some(index) = built.iter().position(|b| !b.is_complete()) {
        return Some(index);
    }

    for (index, block) in built.iter().enumerate() {
        let previous = if index > 0 {
            built[index - 1].signature.as_deref()
        } else {
            seed_signature
        };
        if let (Some(prev), Some(current)) = (previous, block.signature.as_deref()) {
            if prev == current {
                return Some(index);
            }
        }
    }

    None
}

/// The single passage shared by every question, if there is one. Mixed or
/// absent passages yield `None`.
fn shared_passage(questions: &[ExamQuestion]) -> Option<String> {
    let mut passages = questions.iter().map(|q| q.passage.as_deref());
    let first = passages.next()??;
    if passages.all(|p| p == Some(first)) {
        Some(first.to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use crate::models::domain::question::AnswerLetter;
    use crate::services::block_planner::BlockStatus;

    fn question(id: u32, passage: Option<&str>) -> ExamQuestion {
        ExamQuestion {
            id,
            section: Section::Reading,
            question: format!("Question {}", id),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: AnswerLetter::A,
            explanation: String::new(),
            explanation_incorrect: BTreeMap::new(),
            strategy_tip: None,
            difficulty: Difficulty::Medium,
            skill_category: "Reading".into(),
            passage: passage.map(str::to_string),
        }
    }

    fn built(index: usize, signature: Option<&str>, complete: bool) -> BuiltBlock {
        BuiltBlock {
            index,
            target_size: 5,
            questions: Vec::new(),
            passage: None,
            signature: signature.map(str::to_string),
            status: if complete {
                BlockStatus::Complete
            } else {
                BlockStatus::Failed
            },
        }
    }

    #[test]
    fn difficulty_plan_expands_fixed_levels() {
        assert!(difficulty_plan(None, 10).is_empty());
        assert_eq!(
            difficulty_plan(Some(RequestedDifficulty::Hard), 3),
            vec![Difficulty::Hard; 3]
        );
        assert_eq!(difficulty_plan(Some(RequestedDifficulty::Mixed), 10).len(), 10);
    }

    #[test]
    fn plan_slice_tracks_block_offsets() {
        let plan = difficulty_plan(Some(RequestedDifficulty::Mixed), 12);
        let blocks = block_planner::plan_blocks(12);

        assert_eq!(plan_slice(&plan, &blocks[0]).len(), 5);
        assert_eq!(plan_slice(&plan, &blocks[1]).len(), 5);
        assert_eq!(plan_slice(&plan, &blocks[2]).len(), 2);
        assert!(plan_slice(&[], &blocks[0]).is_empty());
    }

    #[test]
    fn first_defect_prefers_incomplete_blocks() {
        let blocks = vec![
            built(0, Some("sig-a"), true),
            built(1, Some("sig-a"), false),
            built(2, Some("sig-b"), true),
        ];
        assert_eq!(first_defect(&blocks, None), Some(1));
    }

    #[test]
    fn first_defect_flags_signature_collisions() {
        let blocks = vec![
            built(0, Some("sig-a"), true),
            built(1, Some("sig-a"), true),
        ];
        assert_eq!(first_defect(&blocks, None), Some(1));

        let rotated = vec![
            built(0, Some("sig-a"), true),
            built(1, Some("sig-b"), true),
        ];
        assert_eq!(first_defect(&rotated, None), None);
        assert_eq!(first_defect(&rotated, Some("sig-a")), Some(0));
    }

    #[test]
    fn shared_passage_requires_unanimity() {
        let same = vec![question(1, Some("p")), question(2, Some("p"))];
        assert_eq!(shared_passage(&same).as_deref(), Some("p"));

        let mixed = vec![question(1, Some("p")), question(2, Some("q"))];
        assert_eq!(shared_passage(&mixed), None);

        let absent = vec![question(1, None), question(2, Some("p"))];
        assert_eq!(shared_passage(&absent), None);
        assert_eq!(shared_passage(&[]), None);
    }

    #[test]
    fn outcome_serialization_is_tagged() {
        let strict = serde_json::to_value(GenerationOutcome::Strict).unwrap();
        assert_eq!(strict["kind"], "strict");

        let best = serde_json::to_value(GenerationOutcome::BestEffort {
            violations: vec![ConstraintViolation::PassageRepeat { run_index: 1 }],
        })
        .unwrap();
        assert_eq!(best["kind"], "best_effort");
        assert_eq!(best["violations"][0]["rule"], "passage_repeat");
    }
}
