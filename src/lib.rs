//! quizforge - PDF study material to a three-level multiple-choice quiz.
//!
//! ## Architecture
//!
//! - **Document**: PDF text extraction and overlapping, boundary-aware chunking
//! - **Quiz**: prompt → LLM → JSON extraction → strict schema validation, plus scoring
//! - **Session**: per-browser state machine (select, submit/lock, finish, resets)
//! - **Web**: axum routes rendering the session with maud
//!
//! ## Pipeline
//!
//! PDF → extract → chunk → first chunks → generate (bounded retry on malformed output) → Quiz
//!
//! ## Epistemic Design
//!
//! - K_i (Knowledge): Compile-time enforced invariants (tiers, letters, keys)
//! - B_i (Beliefs): Model output and uploads are untrusted (Result, Option)
//! - I^R (Resolvable): Per-session settings and config parameters
//! - I^B (Bounded): Network/API uncertainties (retry, backoff)

pub mod client;
pub mod document;
pub mod models;
pub mod pipeline;
pub mod quiz;
pub mod session;
pub mod web;

// Re-exports for convenience
pub use client::{ChatModel, HealthStatus, LLMClient};
pub use models::{Config, Evaluation, Quiz, QuizError, Result, Settings};
pub use pipeline::{GeneratedQuiz, QuizPipeline};
pub use quiz::{evaluate_answers, QuizGenerator};
pub use session::{SessionState, SessionStore};
pub use web::AppState;
