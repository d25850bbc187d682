//! Quiz generator.
//!
//! Epistemic foundation:
//! - K_i: One generation = one prompt, one model call, one validation
//! - B_i: The model follows the JSON contract (it often almost does)
//! - I^R: Attempts on malformed output are configurable
//! - I^B: Provider failures are surfaced, not retried here

use crate::client::{ChatModel, ChatRequest, Message};
use crate::models::{Config, ModelSpec, Quiz, QuizError, Result};
use crate::quiz::{build_quiz_prompt, parse_quiz};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Turns study material into a validated three-tier quiz.
pub struct QuizGenerator {
    /// Chat model (shared)
    model: Arc<dyn ChatModel>,
    /// Model used for generation
    spec: ModelSpec,
    /// Request a JSON object response
    json_mode: bool,
    /// Model calls allowed when output fails parsing/validation
    max_attempts: u32,
}

impl QuizGenerator {
    /// Create a new generator.
    pub fn new(model: Arc<dyn ChatModel>, spec: ModelSpec, json_mode: bool, max_attempts: u32) -> Self {
        Self {
            model,
            spec,
            json_mode,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Create a generator from the `[llm]` and `[quiz]` config sections.
    pub fn from_config(model: Arc<dyn ChatModel>, config: &Config) -> Self {
        Self::new(
            model,
            config.llm.model.clone(),
            config.llm.json_mode,
            config.quiz.generation_attempts,
        )
    }

    /// Model ID used for generation.
    pub fn model_id(&self) -> &str {
        &self.spec.id
    }

    /// Generate a quiz with exactly `per_level` questions per tier.
    ///
    /// B_i(model output is a valid quiz) → Result<Quiz>
    pub async fn generate(&self, content: &str, per_level: usize) -> Result<Quiz> {
        if per_level == 0 {
            return Err(QuizError::InvalidInput(
                "questions per level must be positive".to_string(),
            ));
        }

        let request = ChatRequest {
            model: self.spec.clone(),
            messages: vec![Message::user(build_quiz_prompt(content, per_level))],
            json_mode: self.json_mode,
        };

        let mut attempt = 1;
        loop {
            let start = Instant::now();
            let response = self.model.chat(&request).await?;

            debug!(
                attempt = attempt,
                model = %response.model,
                output_tokens = response.output_tokens,
                "Model responded"
            );

            match parse_quiz(&response.content, per_level) {
                Ok(quiz) => {
                    info!(
                        attempt = attempt,
                        per_level = per_level,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Quiz generated"
                    );
                    return Ok(quiz);
                }
                Err(e) if e.is_malformed_output() && attempt < self.max_attempts => {
                    warn!(
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "Model output rejected, regenerating"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::client::CompletionResponse;
    use crate::models::{Letter, ProviderError, Tier};
    use crate::quiz::parse::tests::quiz_json;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays canned responses in order and records every request.
    pub(crate) struct FakeChatModel {
        replies: Mutex<VecDeque<Result<String>>>,
        pub(crate) requests: Mutex<Vec<ChatRequest>>,
        delay: Option<Duration>,
    }

    impl FakeChatModel {
        pub(crate) fn new(replies: Vec<Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
                delay: None,
            }
        }

        /// Hold every reply for `delay` before returning it.
        pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub(crate) fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ChatModel for FakeChatModel {
        async fn chat(&self, request: &ChatRequest) -> Result<CompletionResponse> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(QuizError::Internal("no scripted reply".to_string())))?;
            Ok(CompletionResponse {
                content: reply,
                model: request.model.id.clone(),
                input_tokens: 0,
                output_tokens: 0,
                total_tokens: 0,
                duration: Duration::ZERO,
            })
        }
    }

    fn generator(fake: Arc<FakeChatModel>, attempts: u32) -> QuizGenerator {
        QuizGenerator::new(fake, ModelSpec::default(), true, attempts)
    }

    #[tokio::test]
    async fn test_generate_exact_counts() {
        let fake = Arc::new(FakeChatModel::new(vec![Ok(quiz_json(3, 3, 3).to_string())]));
        let quiz = generator(fake.clone(), 1)
            .generate("Cells divide by mitosis.", 3)
            .await
            .unwrap();

        for tier in Tier::ALL {
            assert_eq!(quiz.tier(tier).len(), 3);
            for q in quiz.tier(tier) {
                assert_eq!(q.options.len(), 4);
                assert!(Letter::ALL.contains(&q.correct));
            }
        }

        let requests = fake.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].json_mode);
        assert_eq!(requests[0].model.id, "gpt-4o-mini");
        assert!(requests[0].messages[0].content.contains("Cells divide by mitosis."));
    }

    #[tokio::test]
    async fn test_retries_once_on_schema_error() {
        let fake = Arc::new(FakeChatModel::new(vec![
            Ok(quiz_json(3, 2, 3).to_string()),
            Ok(format!("Here it is: {}", quiz_json(3, 3, 3))),
        ]));
        let quiz = generator(fake.clone(), 2).generate("text", 3).await.unwrap();

        assert_eq!(quiz.intermediate.len(), 3);
        assert_eq!(fake.calls(), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let fake = Arc::new(FakeChatModel::new(vec![
            Ok("I cannot help with that.".to_string()),
            Ok(quiz_json(3, 3, 2).to_string()),
        ]));
        let err = generator(fake.clone(), 2).generate("text", 3).await.unwrap_err();

        assert!(matches!(err, QuizError::Schema { ref location, .. } if location == "hard"));
        assert_eq!(fake.calls(), 2);
    }

    #[tokio::test]
    async fn test_single_attempt_is_strict() {
        let fake = Arc::new(FakeChatModel::new(vec![
            Ok(quiz_json(2, 3, 3).to_string()),
            Ok(quiz_json(3, 3, 3).to_string()),
        ]));
        let err = generator(fake.clone(), 1).generate("text", 3).await.unwrap_err();

        assert!(err.is_malformed_output());
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn test_provider_error_not_retried() {
        let fake = Arc::new(FakeChatModel::new(vec![
            Err(QuizError::Provider(ProviderError::AuthenticationFailed)),
            Ok(quiz_json(3, 3, 3).to_string()),
        ]));
        let err = generator(fake.clone(), 3).generate("text", 3).await.unwrap_err();

        assert!(matches!(
            err,
            QuizError::Provider(ProviderError::AuthenticationFailed)
        ));
        assert_eq!(fake.calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_per_level_rejected() {
        let fake = Arc::new(FakeChatModel::new(vec![]));
        let err = generator(fake.clone(), 1).generate("text", 0).await.unwrap_err();

        assert!(matches!(err, QuizError::InvalidInput(_)));
        assert_eq!(fake.calls(), 0);
    }
}
