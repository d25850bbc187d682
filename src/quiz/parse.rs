//! Model output parsing and quiz schema validation.
//!
//! Epistemic foundation:
//! - B_i: The response contains one JSON object (might be wrapped in prose)
//! - B_i: The object has the requested shape (might be off by one)
//! - K_i: Anything that passes validation is a well-formed [`Quiz`]
//!
//! Validation is all-or-nothing: the first violation rejects the whole
//! response.

use crate::models::{Letter, Question, Quiz, QuizError, Result, Tier};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;

const REQUIRED_FIELDS: [&str; 4] = ["question", "options", "correct", "explanation"];

fn trailing_object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{[\s\S]*\}\s*$").expect("trailing object regex"))
}

/// Locate the JSON object inside a model response.
///
/// Prefers a `{...}` block that runs to the end of the (trimmed)
/// response; falls back to the span from the first `{` to the last `}`.
pub fn extract_json_block(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if let Some(m) = trailing_object_re().find(trimmed) {
        return Ok(m.as_str());
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => Ok(&text[start..=end]),
        _ => Err(QuizError::Parse(
            "No JSON object found in model output.".to_string(),
        )),
    }
}

/// Extract, parse and validate a quiz from raw model output.
pub fn parse_quiz(raw: &str, per_level: usize) -> Result<Quiz> {
    let block = extract_json_block(raw)?;
    let value: Value = serde_json::from_str(block)
        .map_err(|e| QuizError::Parse(format!("Invalid JSON in model output: {e}")))?;
    validate_quiz(&value, per_level)
}

/// Validate a parsed JSON value against the quiz schema.
///
/// Errors name the offending tier, index and field.
pub fn validate_quiz(value: &Value, per_level: usize) -> Result<Quiz> {
    let root = value
        .as_object()
        .ok_or_else(|| QuizError::schema("root", "Quiz JSON must be an object."))?;

    // Field order fixes the check order: basic, intermediate, hard.
    Ok(Quiz {
        basic: validate_tier(root, Tier::Basic, per_level)?,
        intermediate: validate_tier(root, Tier::Intermediate, per_level)?,
        hard: validate_tier(root, Tier::Hard, per_level)?,
    })
}

fn validate_tier(root: &Map<String, Value>, tier: Tier, per_level: usize) -> Result<Vec<Question>> {
    let items = root
        .get(tier.as_str())
        .and_then(Value::as_array)
        .ok_or_else(|| {
            QuizError::schema(
                tier.as_str(),
                format!("Missing or invalid \"{tier}\" list in quiz JSON."),
            )
        })?;

    if items.len() != per_level {
        return Err(QuizError::schema(
            tier.as_str(),
            format!(
                "\"{tier}\" must have exactly {per_level} questions; got {}.",
                items.len()
            ),
        ));
    }

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| validate_question(item, &format!("{tier}[{idx}]")))
        .collect()
}

fn validate_question(item: &Value, location: &str) -> Result<Question> {
    let obj = item
        .as_object()
        .ok_or_else(|| QuizError::schema(location, format!("{location} is not an object.")))?;

    for key in REQUIRED_FIELDS {
        if !obj.contains_key(key) {
            return Err(QuizError::schema(
                location,
                format!("Missing key \"{key}\" in {location}."),
            ));
        }
    }

    let raw_options = obj["options"].as_object().ok_or_else(|| {
        QuizError::schema(
            format!("{location}.options"),
            format!("{location}.options must be an object."),
        )
    })?;

    let mut options = BTreeMap::new();
    for letter in Letter::ALL {
        let field = format!("{location}.options.{letter}");
        let text = raw_options.get(letter.as_str()).ok_or_else(|| {
            QuizError::schema(
                format!("{location}.options"),
                format!("Missing option \"{letter}\" in {location}.options."),
            )
        })?;
        options.insert(letter, string_field(text, &field)?);
    }

    let correct = obj["correct"]
        .as_str()
        .and_then(Letter::from_exact)
        .ok_or_else(|| {
            QuizError::schema(
                format!("{location}.correct"),
                format!("Invalid correct value in {location}."),
            )
        })?;

    Ok(Question {
        question: string_field(&obj["question"], &format!("{location}.question"))?,
        options,
        correct,
        explanation: string_field(&obj["explanation"], &format!("{location}.explanation"))?,
    })
}

fn string_field(value: &Value, location: &str) -> Result<String> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| QuizError::schema(location, format!("{location} must be a string.")))
}
