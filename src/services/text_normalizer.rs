//! Pure text cleanup helpers shared by the generation pipeline. No I/O and
//! no errors: every input, including non-string JSON values, comes out as a
//! plain string.

use once_cell::sync::Lazy;
use regex::Regex;

static CONTROL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\x00-\x08\x0B\x0C\x0E-\x1F\x7F]").expect("CONTROL_RE is a valid regex pattern")
});

static SPACE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+").expect("SPACE_RUN_RE is a valid regex pattern"));

static BLANK_LINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("BLANK_LINE_RE is a valid regex pattern"));

static CARET_EXPONENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\^(\d+)").expect("CARET_EXPONENT_RE is a valid regex pattern"));

static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("WHITESPACE_RE is a valid regex pattern"));

/// Maximum length of a passage signature fingerprint.
pub const SIGNATURE_LEN: usize = 120;

/// Coerces an arbitrary upstream JSON value to text. Strings pass through,
/// numbers and booleans are stringified, everything else becomes empty.
pub fn coerce_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Strips control characters, collapses runs of spaces/tabs, and caps blank
/// lines at one.
pub fn clean_text(input: &str) -> String {
    let no_control = CONTROL_RE.replace_all(input, "");
    let collapsed = SPACE_RUN_RE.replace_all(&no_control, " ");
    let trimmed_lines: Vec<&str> = collapsed.split('\n').map(str::trim).collect();
    let rejoined = trimmed_lines.join("\n");
    BLANK_LINE_RE.replace_all(&rejoined, "\n\n").trim().to_string()
}

/// Converts caret-exponent notation to unicode superscripts, e.g. `x^2`
/// becomes `x²`.
pub fn superscript_exponents(input: &str) -> String {
    CARET_EXPONENT_RE
        .replace_all(input, |caps: &regex::Captures| {
            caps[1].chars().map(superscript_digit).collect::<String>()
        })
        .to_string()
}

fn superscript_digit(digit: char) -> char {
    match digit {
        '0' => '⁰',
        '1' => '¹',
        '2' => '²',
        '3' => '³',
        '4' => '⁴',
        '5' => '⁵',
        '6' => '⁶',
        '7' => '⁷',
        '8' => '⁸',
        '9' => '⁹',
        other => other,
    }
}

/// Full cleanup applied to question and passage text.
pub fn normalize_text(input: &str) -> String {
    superscript_exponents(&clean_text(input))
}

/// Truncates to `max` characters, appending an ellipsis when anything was
/// cut. Char-based, so multi-byte text is safe.
pub fn truncate_with_ellipsis(input: &str, max: usize) -> String {
    if input.chars().count() <= max {
        return input.to_string();
    }
    let mut truncated: String = input.chars().take(max).collect();
    truncated.push('…');
    truncated
}

/// Normalized, truncated fingerprint of a passage or context sentence, used
/// to detect repeated context across blocks.
pub fn signature(text: &str) -> String {
    let lowered = text.to_lowercase();
    let collapsed = WHITESPACE_RE.replace_all(lowered.trim(), " ");
    collapsed.chars().take(SIGNATURE_LEN).collect()
}
