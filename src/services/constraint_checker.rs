//! Whole-set policy checks run after all blocks are assembled: passage
//! rotation, per-run word-problem quota, and per-domain word-problem
//! coverage. Returns a report, never an error.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::sync::Arc;

use crate::models::domain::question::{ExamQuestion, Section};
use crate::services::block_planner::BLOCK_SIZE;
use crate::services::text_normalizer;

/// Math skill domains recognized by the coverage check.
pub const MATH_DOMAINS: [&str; 4] = [
    "Heart of Algebra",
    "Problem Solving and Data Analysis",
    "Passport to Advanced Math",
    "Additional Topics",
];

/// Decides whether a question stem reads as a real-world word problem.
/// A coarse keyword proxy is the given policy; the trait keeps it
/// swappable.
pub trait WordProblemClassifier: Send + Sync {
    fn is_word_problem(&self, question: &str) -> bool;
}

static WORD_PROBLEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(percent|percentage|rate|speed|distance|cost|price|dollar|cent|profit|discount|total|average|per\s+(hour|day|week|month|minute|mile|gallon|unit)|miles?|hours?|minutes?|gallons?|meters?|kilometers?|pounds?|tickets?|students?|workers?|items?|sold|bought|spent|earns?|saves?)\b",
    )
    .expect("WORD_PROBLEM_RE is a valid regex pattern")
});

/// Default keyword-regex classifier.
pub struct KeywordWordProblemClassifier;

impl WordProblemClassifier for KeywordWordProblemClassifier {
    fn is_word_problem(&self, question: &str) -> bool {
        WORD_PROBLEM_RE.is_match(question)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ConstraintViolation {
    /// Adjacent runs of questions share the same context signature.
    PassageRepeat { run_index: usize },
    /// A run of math questions contains no word problem.
    MissingWordProblem { run_index: usize },
    /// A math skill domain present in the set has no word problem.
    DomainWithoutWordProblem { domain: String },
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstraintViolation::PassageRepeat { run_index } => {
                write!(f, "run {} repeats the previous run's context", run_index)
            }
            ConstraintViolation::MissingWordProblem { run_index } => {
                write!(f, "run {} has no word problem", run_index)
            }
            ConstraintViolation::DomainWithoutWordProblem { domain } => {
                write!(f, "domain '{}' has no word problem", domain)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConstraintReport {
    pub passage_rotation_ok: bool,
    pub word_problem_quota_ok: bool,
    pub domain_coverage_ok: bool,
    pub violations: Vec<ConstraintViolation>,
}

impl ConstraintReport {
    pub fn is_satisfied(&self) -> bool {
        self.passage_rotation_ok && self.word_problem_quota_ok && self.domain_coverage_ok
    }
}

pub struct ConstraintChecker {
    classifier: Arc<dyn WordProblemClassifier>,
}

impl ConstraintChecker {
    pub fn new(classifier: Arc<dyn WordProblemClassifier>) -> Self {
        Self { classifier }
    }

    /// Runs the three independent checks over an assembled, ordered
    /// question list.
    pub fn check(&self, section: Section, questions: &[ExamQuestion]) -> ConstraintReport {
        let mut violations = Vec::new();

        let passage_rotation_ok = if section.uses_passages() {
            self.check_passage_rotation(section, questions, &mut violations)
        } else {
            true
        };

        let (word_problem_quota_ok, domain_coverage_ok) = if section == Section::Math {
            (
                self.check_word_problem_quota(questions, &mut violations),
                self.check_domain_coverage(questions, &mut violations),
            )
        } else {
            (true, true)
        };

        ConstraintReport {
            passage_rotation_ok,
            word_problem_quota_ok,
            domain_coverage_ok,
            violations,
        }
    }

    fn check_passage_rotation(
        &self,
        section: Section,
        questions: &[ExamQuestion],
        violations: &mut Vec<ConstraintViolation>,
    ) -> bool {
        let mut previous: Option<String> = None;
        let mut ok = true;

        for (run_index, run) in questions.chunks(BLOCK_SIZE).enumerate() {
            let signature = run_signature(section, run);
            if let Some(prev) = &previous {
                if *prev == signature {
                    violations.push(ConstraintViolation::PassageRepeat { run_index });
                    ok = false;
                }
            }
            previous = Some(signature);
        }

        ok
    }

    fn check_word_problem_quota(
        &self,
        questions: &[ExamQuestion],
        violations: &mut Vec<ConstraintViolation>,
    ) -> bool {
        let mut ok = true;

        for (run_index, run) in questions.chunks(BLOCK_SIZE).enumerate() {
            let has_word_problem = run
                .iter()
                .any(|q| self.classifier.is_word_problem(&q.question));
            if !has_word_problem {
                violations.push(ConstraintViolation::MissingWordProblem { run_index });
                ok = false;
            }
        }

        ok
    }

    fn check_domain_coverage(
        &self,
        questions: &[ExamQuestion],
        violations: &mut Vec<ConstraintViolation>,
    ) -> bool {
        let mut ok = true;

        for domain in MATH_DOMAINS {
            let in_domain: Vec<&ExamQuestion> = questions
                .iter()
                .filter(|q| domain_matches(&q.skill_category, domain))
                .collect();

            if in_domain.is_empty() {
                continue;
            }

            let covered = in_domain
                .iter()
                .any(|q| self.classifier.is_word_problem(&q.question));
            if !covered {
                violations.push(ConstraintViolation::DomainWithoutWordProblem {
                    domain: domain.to_string(),
                });
                ok = false;
            }
        }

        ok
    }
}

/// Representative context of a run: the shared passage for reading, the
/// underlined-target sentence for writing. Missing context collapses to an
/// empty signature, which collides with other missing context.
fn run_signature(section: Section, run: &[ExamQuestion]) -> String {
    let representative = match section {
        Section::Reading => run
            .iter()
            .find_map(|q| q.passage.as_deref())
            .unwrap_or(""),
        Section::Writing => run
            .first()
            .map(|q| q.passage.as_deref().unwrap_or(q.question.as_str()))
            .unwrap_or(""),
        Section::Math => "",
    };
    text_normalizer::signature(representative)
}

fn domain_matches(skill_category: &str, domain: &str) -> bool {
    normalize_domain(skill_category) == normalize_domain(domain)
}

fn normalize_domain(label: &str) -> String {
    label.to_lowercase().replace('&', "and").split_whitespace().collect::<Vec<_>>().join(" ")
}
