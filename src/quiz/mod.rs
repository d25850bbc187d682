//! Quiz module - prompt, generation, validation and scoring.
//!
//! Generation: build_quiz_prompt → ChatModel → extract_json_block → validate_quiz
//! Scoring: check_answer per question → evaluate_answers

mod evaluate;
pub(crate) mod generator;
pub(crate) mod parse;
mod prompt;

pub use evaluate::*;
pub use generator::*;
pub use parse::*;
pub use prompt::*;
