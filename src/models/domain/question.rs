use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Exam section a question belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Section {
    Math,
    Reading,
    Writing,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Math => "math",
            Section::Reading => "reading",
            Section::Writing => "writing",
        }
    }

    /// Reading and writing questions are grouped under a shared context
    /// passage; math questions stand alone.
    pub fn uses_passages(&self) -> bool {
        matches!(self, Section::Reading | Section::Writing)
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        }
    }

    /// Loose parse for upstream free-text difficulty labels.
    pub fn parse_loose(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

/// Difficulty as requested by the caller. `Mixed` asks for a blended set
/// rather than a single level.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum RequestedDifficulty {
    Easy,
    Medium,
    Hard,
    Mixed,
}

impl RequestedDifficulty {
    pub fn fixed(&self) -> Option<Difficulty> {
        match self {
            RequestedDifficulty::Easy => Some(Difficulty::Easy),
            RequestedDifficulty::Medium => Some(Difficulty::Medium),
            RequestedDifficulty::Hard => Some(Difficulty::Hard),
            RequestedDifficulty::Mixed => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestedDifficulty::Easy => "Easy",
            RequestedDifficulty::Medium => "Medium",
            RequestedDifficulty::Hard => "Hard",
            RequestedDifficulty::Mixed => "Mixed",
        }
    }
}

/// Lettered answer choice. Every question has exactly four options, A-D.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
}

impl AnswerLetter {
    pub const ALL: [AnswerLetter; 4] = [
        AnswerLetter::A,
        AnswerLetter::B,
        AnswerLetter::C,
        AnswerLetter::D,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerLetter::A => "A",
            AnswerLetter::B => "B",
            AnswerLetter::C => "C",
            AnswerLetter::D => "D",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            AnswerLetter::A => 0,
            AnswerLetter::B => 1,
            AnswerLetter::C => 2,
            AnswerLetter::D => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Tolerant parse for upstream answers like "a", " B ", "C)" or "(d)".
    pub fn parse_loose(value: &str) -> Option<Self> {
        let cleaned: String = value
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match cleaned.to_ascii_uppercase().as_str() {
            "A" => Some(AnswerLetter::A),
            "B" => Some(AnswerLetter::B),
            "C" => Some(AnswerLetter::C),
            "D" => Some(AnswerLetter::D),
            _ => None,
        }
    }
}

impl std::fmt::Display for AnswerLetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully validated practice question. Invariants: exactly four options in
/// A-D order and `correct_answer` indexes into them; enforced by the
/// validator before any `ExamQuestion` is constructed.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ExamQuestion {
    /// 1-based position within the owning question set.
    pub id: u32,
    pub section: Section,
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: AnswerLetter,
    pub explanation: String,
    /// Reason each wrong letter is wrong, keyed by letter.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub explanation_incorrect: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_tip: Option<String>,
    pub difficulty: Difficulty,
    pub skill_category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
}

impl ExamQuestion {
    pub fn correct_option_text(&self) -> Option<&str> {
        self.options
            .get(self.correct_answer.index())
            .map(String::as_str)
    }
}
