use crate::models::domain::question::{Difficulty, Section};
use crate::services::text_normalizer;

pub const QUESTION_GENERATOR_SYSTEM_PROMPT: &str = "You are a practice exam question writer producing structured output for an automated pipeline.

### Core Objectives:

1. **Exact Count:** Produce exactly the number of questions requested, never more, never fewer.
2. **Structured Output:** Respond with a single JSON object and nothing else. No prose, no markdown fences, no commentary.
3. **Four Options:** Every question has exactly 4 answer options in A-D order, exactly one of which is correct.
4. **Explanations:** Provide an explanation for the correct answer and, where useful, per-letter reasons the other options are wrong.
5. **Originality:** Questions within a response must not repeat or trivially rephrase each other.

### Output Shape:

{
  \"passage\": \"optional shared passage for reading/writing sections\",
  \"questions\": [
    {
      \"question\": \"the question stem\",
      \"options\": [\"first\", \"second\", \"third\", \"fourth\"],
      \"correctAnswer\": \"A\",
      \"explanation\": \"why the correct answer is correct\",
      \"explanationIncorrect\": { \"B\": \"why B is wrong\" },
      \"strategyTip\": \"optional test-taking tip\",
      \"difficulty\": \"Easy|Medium|Hard\",
      \"skillCategory\": \"the skill domain this question tests\",
      \"passage\": \"optional per-question context\"
    }
  ]
}

### Accuracy:

- Keep question stems under 500 characters and options under 200 characters.
- The correctAnswer letter must index into the options array.
- For reading sections, every question must relate to the provided passage.";

/// Length of the passage excerpt quoted back to the model when asking it to
/// avoid repeating the previous block's context.
const AVOID_PASSAGE_EXCERPT_LEN: usize = 160;

/// Builds the per-block steering instructions sent as the user message.
pub fn block_instructions(
    section: Section,
    item_count: usize,
    topic: Option<&str>,
    difficulties: &[Difficulty],
    require_word_problem: bool,
    avoid_passage: Option<&str>,
) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "Generate exactly {} multiple-choice {} questions.",
        item_count,
        section.as_str()
    ));

    if let Some(topic) = topic {
        lines.push(format!("Focus on the topic: {}.", topic));
    }

    if !difficulties.is_empty() {
        let labels: Vec<&str> = difficulties.iter().map(|d| d.as_str()).collect();
        lines.push(format!(
            "Target difficulties, one per question in order: {}.",
            labels.join(", ")
        ));
    }

    if require_word_problem {
        lines.push(
            "Include at least one word problem grounded in a real-world quantity \
             (cost, rate, distance, percentage, or similar)."
                .to_string(),
        );
    }

    match section {
        Section::Reading => {
            lines.push(
                "Write one fresh passage of 120-200 words and base every question on it. \
                 Return the passage in the top-level passage field."
                    .to_string(),
            );
        }
        Section::Writing => {
            lines.push(
                "Each question must present a sentence with an underlined portion to revise. \
                 Return the sentence in the question's passage field."
                    .to_string(),
            );
        }
        Section::Math => {}
    }

    if let Some(previous) = avoid_passage {
        lines.push(format!(
            "Do not reuse or paraphrase this previously used context: \"{}\"",
            text_normalizer::truncate_with_ellipsis(previous, AVOID_PASSAGE_EXCERPT_LEN)
        ));
    }

    lines.push("Respond with the JSON object only.".to_string());

    lines.join("\n")
}
