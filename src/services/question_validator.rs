//! Shape checks for a single candidate question. A failing candidate is
//! dropped by the caller, never repaired, and validation itself never fails.

use crate::models::dto::upstream::CandidateQuestion;

pub const MAX_QUESTION_LEN: usize = 500;
pub const MAX_OPTION_LEN: usize = 200;
pub const MAX_EXPLANATION_LEN: usize = 500;
pub const OPTION_COUNT: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeRule {
    QuestionEmpty,
    QuestionTooLong,
    OptionCount,
    OptionEmpty,
    OptionTooLong,
    CorrectAnswerMissing,
    ExplanationTooLong,
}

impl std::fmt::Display for ShapeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ShapeRule::QuestionEmpty => "question text is empty",
            ShapeRule::QuestionTooLong => "question text exceeds 500 characters",
            ShapeRule::OptionCount => "options must contain exactly 4 entries",
            ShapeRule::OptionEmpty => "an option is empty",
            ShapeRule::OptionTooLong => "an option exceeds 200 characters",
            ShapeRule::CorrectAnswerMissing => "correct answer is not one of A-D",
            ShapeRule::ExplanationTooLong => "explanation exceeds 500 characters",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationOutcome {
    pub violations: Vec<ShapeRule>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Checks a candidate against the shape rules, in order. Never panics and
/// never errors; the result lists every violated rule.
pub fn validate_candidate(candidate: &CandidateQuestion) -> ValidationOutcome {
    let mut violations = Vec::new();

    let question_len = candidate.question.chars().count();
    if question_len == 0 {
        violations.push(ShapeRule::QuestionEmpty);
    } else if question_len > MAX_QUESTION_LEN {
        violations.push(ShapeRule::QuestionTooLong);
    }

    if candidate.options.len() != OPTION_COUNT {
        violations.push(ShapeRule::OptionCount);
    }
    if candidate.options.iter().any(|o| o.trim().is_empty()) {
        violations.push(ShapeRule::OptionEmpty);
    }
    if candidate
        .options
        .iter()
        .any(|o| o.chars().count() > MAX_OPTION_LEN)
    {
        violations.push(ShapeRule::OptionTooLong);
    }

    if candidate.correct_answer.is_none() {
        violations.push(ShapeRule::CorrectAnswerMissing);
    }

    if candidate.explanation.chars().count() > MAX_EXPLANATION_LEN {
        violations.push(ShapeRule::ExplanationTooLong);
    }

    ValidationOutcome { violations }
}
