use std::collections::BTreeMap;

use crate::models::domain::{AnswerLetter, Difficulty, ExamQuestion, QuestionSet, Section};

#[cfg(test)]
pub mod fixtures {
    use super::*;

    /// Creates a valid math question with the given id and stem.
    pub fn math_question(id: u32, stem: &str) -> ExamQuestion {
        ExamQuestion {
            id,
            section: Section::Math,
            question: stem.to_string(),
            options: vec![
                "Option A".to_string(),
                "Option B".to_string(),
                "Option C".to_string(),
                "Option D".to_string(),
            ],
            correct_answer: AnswerLetter::B,
            explanation: "B follows from the given values.".to_string(),
            explanation_incorrect: BTreeMap::new(),
            strategy_tip: None,
            difficulty: Difficulty::Medium,
            skill_category: "Heart of Algebra".to_string(),
            passage: None,
        }
    }

    /// Creates a valid reading question tied to a passage.
    pub fn reading_question(id: u32, stem: &str, passage: &str) -> ExamQuestion {
        let mut question = math_question(id, stem);
        question.section = Section::Reading;
        question.skill_category = "Command of Evidence".to_string();
        question.passage = Some(passage.to_string());
        question
    }

    /// A small persisted math set with sequential question ids.
    pub fn math_set(question_count: u32) -> QuestionSet {
        let questions = (1..=question_count)
            .map(|id| math_question(id, &format!("Solve {}x + 1 = {}", id, id + 3)))
            .collect();
        QuestionSet::new(Section::Math, None, questions)
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_fixtures_build_valid_questions() {
        let question = math_question(3, "Solve 2x + 3 = 7");
        assert_eq!(question.id, 3);
        assert_eq!(question.options.len(), 4);
        assert_eq!(question.section, Section::Math);

        let reading = reading_question(1, "What does the author imply?", "A passage.");
        assert_eq!(reading.section, Section::Reading);
        assert!(reading.passage.is_some());
    }

    #[test]
    fn test_fixtures_math_set_is_sequential() {
        let set = math_set(4);
        assert_eq!(set.questions.len(), 4);
        assert_eq!(set.next_question_id(), 5);
    }
}
