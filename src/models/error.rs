//! Error types for quizforge.
//!
//! Epistemic taxonomy:
//! - B_i falsified: Expected failures (unreadable PDF, malformed model output)
//! - I^B materialized: Infrastructure failures (network, timeout, provider)
//! - K_i violated: Internal invariant violations (bugs)

use thiserror::Error;

/// Top-level error type for quizforge.
#[derive(Debug, Error)]
pub enum QuizError {
    // ═══════════════════════════════════════════════════════════════════
    // B_i FALSIFIED — Belief proven wrong (expected failures)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Configuration error: {0}")]
    Config(#[from] super::ConfigError),

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Schema error at {location}: {message}")]
    Schema { location: String, message: String },

    // ═══════════════════════════════════════════════════════════════════
    // I^B MATERIALIZED — Bounded ignorance became known-bad
    // ═══════════════════════════════════════════════════════════════════

    #[error("LLM provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: f64 },

    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // ═══════════════════════════════════════════════════════════════════
    // K_i VIOLATED — Invariant broken (bug, should not happen)
    // ═══════════════════════════════════════════════════════════════════

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Chat completion provider errors.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Authentication failed: invalid API key")]
    AuthenticationFailed,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Rate limited by provider: {message}")]
    RateLimited {
        message: String,
        retry_after_secs: Option<f64>,
    },

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Request failed after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

impl QuizError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a schema error naming the offending tier/index/field.
    pub fn schema(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Schema {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Check if the model answered but its output was unusable.
    ///
    /// These are the only failures worth a fresh generation attempt.
    pub fn is_malformed_output(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Schema { .. })
    }

    /// Check if this error belongs to the "quiz generation failed" group.
    pub fn is_generation_failure(&self) -> bool {
        !matches!(
            self,
            Self::Extraction(_) | Self::InvalidInput(_) | Self::Config(_) | Self::Io { .. }
        )
    }
}

/// Result type alias for quizforge.
pub type Result<T> = std::result::Result<T, QuizError>;
