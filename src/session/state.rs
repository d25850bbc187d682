//! Per-session quiz state.
//!
//! Epistemic foundation:
//! - K_i: A question moves unanswered → locked exactly once
//! - K_i: A new quiz replaces everything derived from the previous one
//! - K_i: A generation started before a retry or reset never lands
//! - B_i: Keys arriving from the browser may not name a real question → no-op
//!
//! Every action is a plain method on [`SessionState`]. Handlers never
//! poke at individual fields.

use crate::models::{
    AnswerRecord, Evaluation, Letter, Outcome, QuestionKey, Quiz, QuizError, Settings,
};
use crate::quiz::{check_answer, evaluate_answers};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// An uploaded PDF, kept until "start over".
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Arc<[u8]>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Lifecycle of a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionStatus {
    /// Choice can still change
    Unanswered,
    /// Submitted, irreversible until reset
    Locked,
}

/// Error shown above the quiz area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    /// Blocking message shown as-is
    Message(String),
    /// "Quiz generation failed", detail behind an expandable panel
    GenerationFailed(String),
}

impl Alert {
    pub fn text(&self) -> &str {
        match self {
            Alert::Message(text) | Alert::GenerationFailed(text) => text,
        }
    }
}

/// Progress tracker numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
    /// Locked questions
    pub answered: usize,
    /// Questions in the quiz
    pub total: usize,
    /// Locked answers matching ground truth
    pub provisional_score: usize,
    /// Questions not yet locked
    pub remaining: usize,
}

impl Progress {
    /// Fraction answered (0.0 - 1.0).
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.answered as f64 / self.total as f64
        }
    }
}

/// Everything one browser session knows.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Uploaded document
    upload: Option<Upload>,
    /// Generation knobs
    settings: Settings,
    /// Current quiz
    quiz: Option<Quiz>,
    /// Info banner for the current quiz
    material_info: Option<String>,
    /// Choices not yet submitted
    pending: BTreeMap<QuestionKey, Letter>,
    /// Submitted questions
    locked: BTreeSet<QuestionKey>,
    /// Submitted choices
    answers: AnswerRecord,
    /// Cached result of the last finish
    results: Option<Evaluation>,
    /// Last error, cleared by the next successful action
    alert: Option<Alert>,
    /// Bumped by every generation start, retry and reset
    generation: u64,
    /// Last interaction
    touched_at: DateTime<Utc>,
}

impl SessionState {
    /// Fresh session with the given settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            upload: None,
            settings,
            quiz: None,
            material_info: None,
            pending: BTreeMap::new(),
            locked: BTreeSet::new(),
            answers: AnswerRecord::new(),
            results: None,
            alert: None,
            generation: 0,
            touched_at: Utc::now(),
        }
    }

    pub fn upload(&self) -> Option<&Upload> {
        self.upload.as_ref()
    }

    pub fn settings(&self) -> Settings {
        self.settings
    }

    pub fn quiz(&self) -> Option<&Quiz> {
        self.quiz.as_ref()
    }

    pub fn material_info(&self) -> Option<&str> {
        self.material_info.as_deref()
    }

    pub fn answers(&self) -> &AnswerRecord {
        &self.answers
    }

    pub fn results(&self) -> Option<&Evaluation> {
        self.results.as_ref()
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn touched_at(&self) -> DateTime<Utc> {
        self.touched_at
    }

    pub fn touch(&mut self) {
        self.touched_at = Utc::now();
    }

    /// Pending (unsubmitted) choice for a question.
    pub fn pending(&self, key: QuestionKey) -> Option<Letter> {
        self.pending.get(&key).copied()
    }

    pub fn status(&self, key: QuestionKey) -> QuestionStatus {
        if self.locked.contains(&key) {
            QuestionStatus::Locked
        } else {
            QuestionStatus::Unanswered
        }
    }

    pub fn is_locked(&self, key: QuestionKey) -> bool {
        self.status(key) == QuestionStatus::Locked
    }

    /// Immediate feedback for a locked question.
    pub fn outcome(&self, key: QuestionKey) -> Option<Outcome> {
        if !self.is_locked(key) {
            return None;
        }
        let question = self.quiz.as_ref()?.get(key)?;
        Some(check_answer(question, self.answers.get(key)))
    }

    /// Store a new upload. The current quiz is kept until the next generation.
    pub fn set_upload(&mut self, upload: Upload) {
        debug!(file = %upload.file_name, bytes = upload.len(), "Upload stored");
        self.upload = Some(upload);
        self.alert = None;
    }

    /// Replace settings. Callers clamp beforehand.
    pub fn set_settings(&mut self, settings: Settings) -> bool {
        let changed = self.settings != settings;
        self.settings = settings;
        changed
    }

    fn has_question(&self, key: QuestionKey) -> bool {
        self.quiz.as_ref().is_some_and(|q| q.get(key).is_some())
    }

    /// Set the pending choice. No-op once locked.
    pub fn select(&mut self, key: QuestionKey, letter: Letter) -> bool {
        if !self.has_question(key) || self.is_locked(key) {
            return false;
        }
        self.pending.insert(key, letter) != Some(letter)
    }

    /// Reset the pending choice to none. No-op once locked.
    pub fn clear(&mut self, key: QuestionKey) -> bool {
        if self.is_locked(key) {
            return false;
        }
        self.pending.remove(&key).is_some()
    }

    /// Lock a question with its pending choice (possibly none).
    ///
    /// Returns the immediate outcome, or `None` when nothing changed
    /// (unknown key or already locked).
    pub fn submit(&mut self, key: QuestionKey) -> Option<Outcome> {
        if !self.has_question(key) || self.is_locked(key) {
            return None;
        }
        let choice = self.pending.remove(&key);
        self.answers.record(key, choice.map(|l| l.as_str().to_string()));
        self.locked.insert(key);

        let outcome = self.outcome(key);
        debug!(question = %key, choice = ?choice, outcome = ?outcome, "Question locked");
        outcome
    }

    /// Evaluate whatever is locked and cache the result.
    pub fn finish(&mut self) -> Option<&Evaluation> {
        let quiz = self.quiz.as_ref()?;
        let evaluation = evaluate_answers(&self.answers, quiz);
        debug!(score = evaluation.score, total = evaluation.total, "Quiz finished");
        self.results = Some(evaluation);
        self.results.as_ref()
    }

    /// Progress over the current quiz.
    pub fn progress(&self) -> Progress {
        let Some(quiz) = self.quiz.as_ref() else {
            return Progress::default();
        };
        let total = quiz.total_questions();
        let answered = self.locked.len();
        let provisional_score = quiz
            .iter()
            .filter(|(key, question)| {
                self.locked.contains(key)
                    && check_answer(question, self.answers.get(*key)).is_correct()
            })
            .count();

        Progress {
            answered,
            total,
            provisional_score,
            remaining: total.saturating_sub(answered),
        }
    }

    fn clear_quiz(&mut self) {
        self.quiz = None;
        self.material_info = None;
        self.pending.clear();
        self.locked.clear();
        self.answers = AnswerRecord::new();
        self.results = None;
    }

    /// Start a generation and return its ticket.
    ///
    /// Only the latest ticket may install a result. A later generation,
    /// retry or reset makes every earlier ticket stale.
    pub fn begin_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub fn is_current_generation(&self, ticket: u64) -> bool {
        self.generation == ticket
    }

    /// Replace the quiz wholesale. Answers, locks and results start empty.
    pub fn install_quiz(&mut self, quiz: Quiz, material_info: impl Into<String>) {
        self.clear_quiz();
        self.quiz = Some(quiz);
        self.material_info = Some(material_info.into());
        self.alert = None;
    }

    /// Record a failed generation. The upload and settings survive.
    ///
    /// Extraction and input problems become a plain message; everything
    /// else is grouped under "quiz generation failed".
    pub fn fail_generation(&mut self, error: &QuizError) {
        self.clear_quiz();
        self.alert = Some(if error.is_generation_failure() {
            Alert::GenerationFailed(error.to_string())
        } else {
            Alert::Message(error.to_string())
        });
    }

    /// Show a message without touching the quiz.
    pub fn notify(&mut self, message: impl Into<String>) {
        self.alert = Some(Alert::Message(message.into()));
    }

    /// Discard quiz, answers and results. Keep upload and settings.
    pub fn retry(&mut self) {
        self.generation += 1;
        self.clear_quiz();
        self.alert = None;
    }

    /// Discard everything, including the upload.
    pub fn start_over(&mut self) {
        let settings = self.settings;
        let generation = self.generation + 1;
        *self = Self::new(settings);
        self.generation = generation;
    }
}
