//! Canonicalization boundary for upstream generation payloads.
//!
//! The generative service returns loosely structured JSON: options may be an
//! array or a lettered map, field names drift between camelCase and
//! snake_case, and any field may hold a non-string value. Everything
//! tolerant lives here; the rest of the pipeline only sees
//! [`CandidateQuestion`] and [`GenerationPayload`].

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::models::domain::question::{AnswerLetter, Difficulty, ExamQuestion, Section};
use crate::services::text_normalizer;

/// Raw top-level payload as deserialized from the upstream response body.
#[derive(Debug, Clone, Deserialize)]
pub struct RawGenerationPayload {
    #[serde(default)]
    pub passage: Option<serde_json::Value>,
    #[serde(default, alias = "items")]
    pub questions: Vec<RawCandidate>,
}

/// Options arrive either as a plain array or as a map keyed by letter.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawOptions {
    List(Vec<serde_json::Value>),
    Lettered(BTreeMap<String, serde_json::Value>),
}

/// An as-received question item, before validation. Ephemeral: converted to
/// a [`CandidateQuestion`] and discarded.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCandidate {
    #[serde(default, alias = "text", alias = "stem")]
    pub question: Option<serde_json::Value>,
    #[serde(default, alias = "choices")]
    pub options: Option<RawOptions>,
    #[serde(default, alias = "correct_answer", alias = "answer")]
    pub correct_answer: Option<serde_json::Value>,
    #[serde(default)]
    pub explanation: Option<serde_json::Value>,
    #[serde(default, alias = "explanation_incorrect")]
    pub explanation_incorrect: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default, alias = "strategy_tip", alias = "tip")]
    pub strategy_tip: Option<serde_json::Value>,
    #[serde(default)]
    pub difficulty: Option<serde_json::Value>,
    #[serde(default, alias = "skill_category", alias = "skill", alias = "category")]
    pub skill_category: Option<serde_json::Value>,
    #[serde(default, alias = "context")]
    pub passage: Option<serde_json::Value>,
}

/// The one canonical internal shape of an unvalidated question.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: Option<AnswerLetter>,
    pub explanation: String,
    pub explanation_incorrect: BTreeMap<String, String>,
    pub strategy_tip: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub skill_category: Option<String>,
    pub passage: Option<String>,
}

/// Canonical upstream payload: a cleaned shared passage plus candidates.
#[derive(Debug, Clone)]
pub struct GenerationPayload {
    pub passage: Option<String>,
    pub questions: Vec<CandidateQuestion>,
}

impl From<RawGenerationPayload> for GenerationPayload {
    fn from(raw: RawGenerationPayload) -> Self {
        let passage = non_empty(text_normalizer::normalize_text(
            &text_normalizer::coerce_text(raw.passage.as_ref()),
        ));
        let questions = raw
            .questions
            .into_iter()
            .map(CandidateQuestion::from)
            .collect();

        GenerationPayload { passage, questions }
    }
}

impl From<RawCandidate> for CandidateQuestion {
    fn from(raw: RawCandidate) -> Self {
        let question = text_normalizer::normalize_text(&text_normalizer::coerce_text(
            raw.question.as_ref(),
        ));

        let options = coerce_options(raw.options);
        let correct_answer = coerce_correct_answer(raw.correct_answer.as_ref(), &options);

        let explanation = text_normalizer::normalize_text(&text_normalizer::coerce_text(
            raw.explanation.as_ref(),
        ));

        // Wrong-answer reasons only: an entry for the correct letter is a
        // modeling mistake upstream and gets dropped.
        let explanation_incorrect = raw
            .explanation_incorrect
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| {
                let letter = AnswerLetter::parse_loose(&key)?;
                if Some(letter) == correct_answer {
                    return None;
                }
                let reason = text_normalizer::clean_text(&text_normalizer::coerce_text(Some(
                    &value,
                )));
                if reason.is_empty() {
                    None
                } else {
                    Some((letter.as_str().to_string(), reason))
                }
            })
            .collect();

        let strategy_tip = non_empty(text_normalizer::clean_text(
            &text_normalizer::coerce_text(raw.strategy_tip.as_ref()),
        ));

        let difficulty =
            Difficulty::parse_loose(&text_normalizer::coerce_text(raw.difficulty.as_ref()));

        let skill_category = non_empty(text_normalizer::clean_text(
            &text_normalizer::coerce_text(raw.skill_category.as_ref()),
        ));

        let passage = non_empty(text_normalizer::normalize_text(
            &text_normalizer::coerce_text(raw.passage.as_ref()),
        ));

        CandidateQuestion {
            question,
            options,
            correct_answer,
            explanation,
            explanation_incorrect,
            strategy_tip,
            difficulty,
            skill_category,
            passage,
        }
    }
}

impl CandidateQuestion {
    /// Builds the validated question once the shape checks have passed.
    /// Missing difficulty and skill labels fall back to the supplied
    /// defaults.
    pub fn into_question(
        self,
        id: u32,
        section: Section,
        fallback_difficulty: Difficulty,
        fallback_skill: &str,
    ) -> ExamQuestion {
        ExamQuestion {
            id,
            section,
            question: self.question,
            options: self.options,
            correct_answer: self.correct_answer.unwrap_or(AnswerLetter::A),
            explanation: self.explanation,
            explanation_incorrect: self.explanation_incorrect,
            strategy_tip: self.strategy_tip,
            difficulty: self.difficulty.unwrap_or(fallback_difficulty),
            skill_category: self
                .skill_category
                .unwrap_or_else(|| fallback_skill.to_string()),
            passage: self.passage,
        }
    }
}

fn coerce_options(raw: Option<RawOptions>) -> Vec<String> {
    match raw {
        Some(RawOptions::List(values)) => values
            .iter()
            .map(|v| text_normalizer::clean_text(&text_normalizer::coerce_text(Some(v))))
            .collect(),
        Some(RawOptions::Lettered(map)) => {
            // Keep only keys that parse as a letter and emit them in A-D
            // order, whatever order the map arrived in.
            let mut lettered: Vec<(AnswerLetter, String)> = map
                .iter()
                .filter_map(|(key, value)| {
                    let letter = AnswerLetter::parse_loose(key)?;
                    let text =
                        text_normalizer::clean_text(&text_normalizer::coerce_text(Some(value)));
                    Some((letter, text))
                })
                .collect();
            lettered.sort_by_key(|(letter, _)| letter.index());
            lettered.into_iter().map(|(_, text)| text).collect()
        }
        None => Vec::new(),
    }
}

fn coerce_correct_answer(
    raw: Option<&serde_json::Value>,
    options: &[String],
) -> Option<AnswerLetter> {
    let text = text_normalizer::coerce_text(raw);
    if text.is_empty() {
        return None;
    }

    if let Some(letter) = AnswerLetter::parse_loose(&text) {
        return Some(letter);
    }

    // Some models echo the full option text instead of a letter.
    let wanted = text.trim().to_lowercase();
    options
        .iter()
        .position(|option| option.trim().to_lowercase() == wanted)
        .and_then(AnswerLetter::from_index)
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
