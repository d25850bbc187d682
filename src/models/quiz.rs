//! Quiz, answer and feedback types for quizforge.
//!
//! K_i: These types represent the data flowing from the generator
//! through the session into the evaluator.

use super::QuizError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Difficulty tier partitioning a quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Basic,
    Intermediate,
    Hard,
}

impl Tier {
    /// Fixed evaluation and rendering order.
    pub const ALL: [Tier; 3] = [Tier::Basic, Tier::Intermediate, Tier::Hard];

    /// JSON key for this tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Basic => "basic",
            Tier::Intermediate => "intermediate",
            Tier::Hard => "hard",
        }
    }

    /// Capitalised name for headings.
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Basic => "Basic",
            Tier::Intermediate => "Intermediate",
            Tier::Hard => "Hard",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Tier::Basic),
            "intermediate" => Ok(Tier::Intermediate),
            "hard" => Ok(Tier::Hard),
            other => Err(QuizError::InvalidInput(format!("unknown tier: {other:?}"))),
        }
    }
}

/// Choice letter of a multiple-choice option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Letter {
    A,
    B,
    C,
    D,
}

impl Letter {
    pub const ALL: [Letter; 4] = [Letter::A, Letter::B, Letter::C, Letter::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            Letter::A => "A",
            Letter::B => "B",
            Letter::C => "C",
            Letter::D => "D",
        }
    }

    /// Strict parse: exactly one of "A".."D", no normalisation.
    pub fn from_exact(s: &str) -> Option<Self> {
        match s {
            "A" => Some(Letter::A),
            "B" => Some(Letter::B),
            "C" => Some(Letter::C),
            "D" => Some(Letter::D),
            _ => None,
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Letter {
    type Err = QuizError;

    /// Lenient parse: trims whitespace and ignores case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Letter::from_exact(&s.trim().to_ascii_uppercase())
            .ok_or_else(|| QuizError::InvalidInput(format!("invalid choice letter: {s:?}")))
    }
}

/// A single multiple-choice question.
///
/// K_i: validated questions carry all four options, and `correct`
/// is one of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: BTreeMap<Letter, String>,
    pub correct: Letter,
    pub explanation: String,
}

impl Question {
    /// Option text for a letter (empty if absent).
    pub fn option_text(&self, letter: Letter) -> &str {
        self.options.get(&letter).map(String::as_str).unwrap_or("")
    }
}

/// A generated quiz: one ordered question list per tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub basic: Vec<Question>,
    pub intermediate: Vec<Question>,
    pub hard: Vec<Question>,
}

impl Quiz {
    /// Questions of one tier.
    pub fn tier(&self, tier: Tier) -> &[Question] {
        match tier {
            Tier::Basic => &self.basic,
            Tier::Intermediate => &self.intermediate,
            Tier::Hard => &self.hard,
        }
    }

    /// Look up a question by its composite key.
    pub fn get(&self, key: QuestionKey) -> Option<&Question> {
        self.tier(key.tier).get(key.index)
    }

    /// All questions in evaluation order (basic → intermediate → hard).
    pub fn iter(&self) -> impl Iterator<Item = (QuestionKey, &Question)> + '_ {
        Tier::ALL.into_iter().flat_map(move |tier| {
            self.tier(tier)
                .iter()
                .enumerate()
                .map(move |(index, q)| (QuestionKey::new(tier, index), q))
        })
    }

    pub fn total_questions(&self) -> usize {
        Tier::ALL.iter().map(|t| self.tier(*t).len()).sum()
    }
}

/// Composite key of an answer: tier plus ordinal index.
///
/// Renders as `basic_0`, `intermediate_3`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QuestionKey {
    pub tier: Tier,
    pub index: usize,
}

impl QuestionKey {
    pub fn new(tier: Tier, index: usize) -> Self {
        Self { tier, index }
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.tier, self.index)
    }
}

impl FromStr for QuestionKey {
    type Err = QuizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tier, index) = s
            .rsplit_once('_')
            .ok_or_else(|| QuizError::InvalidInput(format!("malformed question key: {s:?}")))?;
        let index = index
            .parse::<usize>()
            .map_err(|_| QuizError::InvalidInput(format!("malformed question key: {s:?}")))?;
        Ok(Self::new(tier.parse()?, index))
    }
}

/// Locked answers, keyed by question.
///
/// Raw strings are kept as recorded; normalisation happens at
/// evaluation time. `None` records a submission without a choice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnswerRecord(BTreeMap<QuestionKey, Option<String>>);

impl AnswerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: QuestionKey, answer: Option<String>) {
        self.0.insert(key, answer);
    }

    /// The recorded choice, if the question was answered with one.
    pub fn get(&self, key: QuestionKey) -> Option<&str> {
        self.0.get(&key).and_then(|a| a.as_deref())
    }

    pub fn contains(&self, key: QuestionKey) -> bool {
        self.0.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionKey, Option<&str>)> {
        self.0.iter().map(|(k, v)| (*k, v.as_deref()))
    }
}

impl FromIterator<(QuestionKey, Option<String>)> for AnswerRecord {
    fn from_iter<I: IntoIterator<Item = (QuestionKey, Option<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Result of comparing one answer with ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum Outcome {
    Correct,
    Wrong { correct: Letter },
}

impl Outcome {
    pub fn is_correct(&self) -> bool {
        matches!(self, Outcome::Correct)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Correct => f.write_str("Correct"),
            Outcome::Wrong { correct } => write!(f, "Wrong (Correct: {correct})"),
        }
    }
}

/// Per-question feedback produced by an evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub question: String,
    pub result: Outcome,
    pub explanation: String,
}

/// Score plus ordered feedback for a whole quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: usize,
    pub total: usize,
    pub feedback: Vec<FeedbackEntry>,
}

impl Evaluation {
    /// Fraction of questions answered correctly (0.0 - 1.0).
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.score as f64 / self.total as f64
        }
    }

    pub fn suggestion(&self) -> Suggestion {
        Suggestion::for_percentage(self.percentage())
    }
}

/// Improvement banner shown under the results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suggestion {
    /// Below 50%
    ReviewBasics,
    /// Below 80%
    Reinforce,
    /// 80% and above
    Excellent,
}

impl Suggestion {
    pub fn for_percentage(pct: f64) -> Self {
        if pct < 0.5 {
            Suggestion::ReviewBasics
        } else if pct < 0.8 {
            Suggestion::Reinforce
        } else {
            Suggestion::Excellent
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Suggestion::ReviewBasics => {
                "Suggestion: Review the basics section and try smaller chunk size for clearer questions."
            }
            Suggestion::Reinforce => {
                "Good job! Re-try Intermediate/Hard levels to reinforce understanding."
            }
            Suggestion::Excellent => {
                "Excellent! Consider increasing questions per level for a greater challenge."
            }
        }
    }
}
